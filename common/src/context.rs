//! Shared simulation context passed to the driver and the viewer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use physics::{Data, Model, State};

/// Everything one run shares between threads.
///
/// Cloning is cheap: the model, the data lock and the running flag are all
/// reference counted, so every clone observes the same simulation.
#[derive(Clone)]
pub struct SimContext {
    model: Arc<Model>,
    data: Arc<Mutex<Data>>,
    running: Arc<AtomicBool>,
}

impl SimContext {
    /// Create data for `model` and bring derived quantities up to date.
    pub fn new(model: Model) -> Self {
        let mut data = model.make_data();
        data.forward(&model);
        Self {
            model: Arc::new(model),
            data: Arc::new(Mutex::new(data)),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Lock the simulation data.
    ///
    /// A panic on another thread while holding the lock leaves plain numeric
    /// state behind, so a poisoned lock is taken over rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, Data> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy the current state, holding the lock only for the copy.
    pub fn snapshot(&self) -> State {
        self.lock().snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask every loop sharing this context to stop at its next iteration.
    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for SimContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimContext")
            .field("model", &self.model.name())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX: &str = r#"<mujoco model="box"><worldbody>
        <body name="b" pos="0 0 1"><freejoint/><geom type="box" size="0.1 0.1 0.1"/></body>
    </worldbody></mujoco>"#;

    #[test]
    fn test_clones_share_state_and_flag() {
        let ctx = SimContext::new(Model::from_xml_str(BOX).unwrap());
        let other = ctx.clone();
        {
            let model = Arc::clone(ctx.model());
            ctx.lock().step(&model);
        }
        assert!(other.snapshot().time() > 0.0);

        assert!(other.is_running());
        ctx.request_shutdown();
        assert!(!other.is_running());
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let ctx = SimContext::new(Model::from_xml_str(BOX).unwrap());
        let poisoner = ctx.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("poison the lock");
        })
        .join();
        assert_eq!(ctx.snapshot().time(), 0.0);
    }
}
