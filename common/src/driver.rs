//! Fixed-timestep simulation driver.
//!
//! The driver owns the stepping side of a [`SimContext`]: every iteration it
//! takes the data lock, lets its [`Controller`] write control inputs, steps
//! once, and releases the lock before pacing to real time.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use physics::{Data, Model, ObjectKind, State};

use crate::context::SimContext;
use crate::debug::{lookup, LookupError};

/// Writes control inputs into the data right before each step.
///
/// Called with the data lock held, so implementations must not block.
pub trait Controller: Send {
    fn apply(&mut self, model: &Model, data: &mut Data);
}

impl<F> Controller for F
where
    F: FnMut(&Model, &mut Data) + Send,
{
    fn apply(&mut self, model: &Model, data: &mut Data) {
        self(model, data)
    }
}

/// Controller that leaves the data untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoControl;

impl Controller for NoControl {
    fn apply(&mut self, _model: &Model, _data: &mut Data) {}
}

#[derive(Debug, Clone)]
struct Channel {
    name: String,
    actuator: usize,
    value: f64,
}

/// Named actuator channels, written into `ctrl` every tick.
#[derive(Debug, Clone, Default)]
pub struct ControlInputs {
    channels: Vec<Channel>,
}

impl ControlInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of the actuator called `name`.
    ///
    /// The name is resolved against the model the first time it is set; an
    /// unknown name is reported and the channel is not created.
    pub fn set(&mut self, model: &Model, name: &str, value: f64) -> Result<(), LookupError> {
        if let Some(channel) = self.channels.iter_mut().find(|c| c.name == name) {
            channel.value = value;
            return Ok(());
        }
        let actuator = lookup(model, ObjectKind::Actuator, name).inspect_err(|err| {
            log::error!("{err}");
        })?;
        self.channels.push(Channel {
            name: name.to_string(),
            actuator,
            value,
        });
        Ok(())
    }

    /// Builder form of [`ControlInputs::set`] that skips unknown names.
    pub fn with(mut self, model: &Model, name: &str, value: f64) -> Self {
        let _ = self.set(model, name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.channels.iter().find(|c| c.name == name).map(|c| c.value)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Controller for ControlInputs {
    fn apply(&mut self, _model: &Model, data: &mut Data) {
        let ctrl = data.ctrl_mut();
        for channel in &self.channels {
            ctrl[channel.actuator] = channel.value;
        }
    }
}

/// Driver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    /// Stop (and request shutdown of the context) after this much simulated time.
    pub duration: Option<f64>,
    /// Call the observer every this many simulated seconds.
    pub report_every: Option<f64>,
    /// Sleep after each step so simulated time tracks wall time.
    pub realtime: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            duration: None,
            report_every: None,
            realtime: true,
        }
    }
}

/// Counters collected over one driver run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriverStats {
    pub steps: u64,
    pub wall_time: Duration,
    /// Total time spent holding the data lock.
    pub lock_held: Duration,
    /// Longest single lock hold.
    pub max_lock_hold: Duration,
}

impl DriverStats {
    fn record_lock(&mut self, held: Duration) {
        self.lock_held += held;
        self.max_lock_hold = self.max_lock_hold.max(held);
    }

    /// Fraction of the run spent holding the lock.
    pub fn lock_fraction(&self) -> f64 {
        if self.wall_time.is_zero() {
            return 0.0;
        }
        self.lock_held.as_secs_f64() / self.wall_time.as_secs_f64()
    }
}

type Observer = Box<dyn FnMut(&State) + Send>;

/// Steps a shared simulation at a fixed cadence until the context stops running.
pub struct SimulationDriver {
    context: SimContext,
    controller: Box<dyn Controller>,
    observer: Option<Observer>,
    config: DriverConfig,
}

impl SimulationDriver {
    pub fn new(context: SimContext) -> Self {
        Self {
            context,
            controller: Box::new(NoControl),
            observer: None,
            config: DriverConfig::default(),
        }
    }

    pub fn with_controller(mut self, controller: impl Controller + 'static) -> Self {
        self.controller = Box::new(controller);
        self
    }

    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    /// Receive a copy of the state every `report_every` simulated seconds.
    ///
    /// The observer runs after the lock is released.
    pub fn with_observer(mut self, observer: impl FnMut(&State) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Run on the current thread until shutdown is requested or the duration elapses.
    pub fn run(mut self) -> DriverStats {
        let model = std::sync::Arc::clone(self.context.model());
        let timestep = model.timestep();
        let period = Duration::from_secs_f64(timestep);
        log::info!("Simulation timestep: {timestep} sec");

        let mut stats = DriverStats::default();
        let mut next_report = 0.0;
        let started = Instant::now();

        while self.context.is_running() {
            let tick = Instant::now();

            let (time, report) = {
                let mut data = self.context.lock();
                let locked = Instant::now();
                self.controller.apply(&model, &mut data);
                data.step(&model);
                let time = data.time();
                let report = match (self.config.report_every, self.observer.is_some()) {
                    (Some(every), true) if time + 0.5 * timestep >= next_report => {
                        next_report += every.max(timestep);
                        Some(data.snapshot())
                    }
                    _ => None,
                };
                stats.record_lock(locked.elapsed());
                (time, report)
            };
            stats.steps += 1;

            if let (Some(state), Some(observer)) = (report, self.observer.as_mut()) {
                observer(&state);
            }

            if let Some(duration) = self.config.duration {
                if time + 0.5 * timestep >= duration {
                    log::info!("Reached simulated duration of {duration} s");
                    self.context.request_shutdown();
                    break;
                }
            }

            if self.config.realtime {
                if let Some(rest) = period.checked_sub(tick.elapsed()) {
                    thread::sleep(rest);
                }
            }
        }

        stats.wall_time = started.elapsed();
        log::info!(
            "Simulation stopped after {} steps ({:.2} s wall, lock held {:.1}%)",
            stats.steps,
            stats.wall_time.as_secs_f64(),
            stats.lock_fraction() * 100.0
        );
        stats
    }

    /// Run on a dedicated OS thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<DriverStats>> {
        thread::Builder::new()
            .name("simulation".into())
            .spawn(move || self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPINNER: &str = r#"<mujoco model="spinner"><option gravity="0 0 0"/><worldbody>
        <body name="rotor"><joint name="spin" type="hinge"/><geom type="sphere" size="0.1"/></body>
    </worldbody><actuator><motor name="m" joint="spin"/></actuator></mujoco>"#;

    fn context() -> SimContext {
        SimContext::new(Model::from_xml_str(SPINNER).unwrap())
    }

    #[test]
    fn test_control_inputs_resolve_once() {
        let ctx = context();
        let model = ctx.model();
        let mut inputs = ControlInputs::new();
        inputs.set(model, "m", 0.5).unwrap();
        inputs.set(model, "m", 0.75).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs.get("m"), Some(0.75));

        let err = inputs.set(model, "missing", 1.0).unwrap_err();
        assert!(matches!(err, LookupError::NotFound { kind: ObjectKind::Actuator, .. }));
        assert_eq!(inputs.len(), 1);

        let mut data = ctx.lock();
        inputs.apply(model, &mut data);
        assert_eq!(data.state().ctrl(), &[0.75]);
    }

    #[test]
    fn test_duration_stops_and_shuts_down() {
        let ctx = context();
        let stats = SimulationDriver::new(ctx.clone())
            .with_config(DriverConfig {
                duration: Some(0.1),
                realtime: false,
                ..DriverConfig::default()
            })
            .run();
        assert_eq!(stats.steps, 50);
        assert!(!ctx.is_running());
        assert!((ctx.snapshot().time() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_observer_period() {
        let ctx = context();
        let (tx, rx) = std::sync::mpsc::channel();
        SimulationDriver::new(ctx)
            .with_config(DriverConfig {
                duration: Some(0.1),
                report_every: Some(0.02),
                realtime: false,
            })
            .with_observer(move |state| {
                let _ = tx.send(state.time());
            })
            .run();
        let times: Vec<f64> = rx.try_iter().collect();
        assert_eq!(times.len(), 6);
        assert!((times[0] - 0.002).abs() < 1e-9);
    }

    #[test]
    fn test_closure_controller_runs_every_step() {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::sync::Arc;

        let ctx = context();
        let calls = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&calls);
        let stats = SimulationDriver::new(ctx.clone())
            .with_controller(move |_: &Model, data: &mut Data| {
                seen.fetch_add(1, Ordering::Relaxed);
                data.ctrl_mut()[0] = 1.0;
            })
            .with_config(DriverConfig {
                duration: Some(0.02),
                realtime: false,
                ..DriverConfig::default()
            })
            .run();
        assert_eq!(calls.load(Ordering::Relaxed), stats.steps);
        assert_eq!(ctx.snapshot().ctrl(), &[1.0]);
    }
}
