//! Differential drive robot
//!
//! Drives both wheel motors at constant commands on the simulation thread
//! and dumps every joint, body and actuator at a fixed simulated interval.
//!
//! Controls:
//! - Left mouse drag: Orbit camera
//! - Right mouse drag: Pan
//! - Scroll: Zoom
//! - Backspace: Reset view
//! - Escape: Quit

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use common::{
    debug, run_viewer, ControlInputs, DriverConfig, SimContext, SimulationDriver, ViewerConfig,
    ViewerError,
};
use physics::Model;

const MODEL_PATH: &str = "models/tb3.xml";
const WINDOW_TITLE: &str = "Rover Simulation Viewer";
const LEFT_MOTOR: &str = "left_motor";
const RIGHT_MOTOR: &str = "right_motor";

#[derive(Parser, Debug)]
#[command(about = "Two-wheel robot driven by constant motor commands")]
struct Args {
    /// Model file to load
    #[arg(long, default_value = MODEL_PATH)]
    model: PathBuf,

    /// Run without opening a window
    #[arg(long)]
    headless: bool,

    /// Stop after this many simulated seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Print the full state every this many simulated seconds
    #[arg(long, default_value_t = 1.0)]
    report_every: f64,

    /// Left wheel motor command
    #[arg(long, default_value_t = 0.6, allow_negative_numbers = true)]
    left: f64,

    /// Right wheel motor command
    #[arg(long, default_value_t = 0.4, allow_negative_numbers = true)]
    right: f64,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    log::info!("Loading model: {}", args.model.display());
    let model = match Model::from_xml_path(&args.model) {
        Ok(model) => model,
        Err(err) => {
            log::error!("Failed to load model: {}: {err}", args.model.display());
            std::process::exit(1);
        }
    };
    log::info!("Model loaded successfully");

    let context = SimContext::new(model);
    debug::print_joint_type(context.model(), "left_wheel_hinge");
    debug::print_body_inertia(context.model(), "tb3_base");
    debug::print_actuator_range(context.model(), LEFT_MOTOR);
    debug::print_actuator_range(context.model(), RIGHT_MOTOR);

    let inputs = ControlInputs::new()
        .with(context.model(), LEFT_MOTOR, args.left)
        .with(context.model(), RIGHT_MOTOR, args.right);

    let observer_model = Arc::clone(context.model());
    let driver = SimulationDriver::new(context.clone())
        .with_controller(inputs)
        .with_config(DriverConfig {
            duration: args.duration,
            report_every: Some(args.report_every),
            ..DriverConfig::default()
        })
        .with_observer(move |state| debug::print_all_states(&observer_model, state));

    log::info!("Starting simulation");
    let simulation = match driver.spawn() {
        Ok(handle) => handle,
        Err(err) => {
            log::error!("Failed to start simulation thread: {err}");
            std::process::exit(1);
        }
    };

    if args.headless {
        if args.duration.is_none() {
            log::warn!("Running headless without --duration, stop with Ctrl+C");
        }
    } else {
        let config = ViewerConfig {
            title: WINDOW_TITLE.to_string(),
            ..ViewerConfig::default()
        };
        match run_viewer(context.clone(), config) {
            Err(ViewerError::Init(_)) => {
                log::warn!("No viewer available, simulation continues without it");
            }
            Err(err) => {
                log::error!("{err}");
                context.request_shutdown();
            }
            Ok(()) => context.request_shutdown(),
        }
    }

    match simulation.join() {
        Ok(stats) => log::info!("Simulated {} steps", stats.steps),
        Err(_) => log::error!("Simulation thread panicked"),
    }

    log::info!("Cleaning up resources");
    log::info!("Simulation completed successfully");
}
