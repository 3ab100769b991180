//! Quadrotor demo
//!
//! Loads a drone model, spins up the simulation on a background thread with
//! constant propeller thrust, and shows it in the viewer on the main thread.
//!
//! Controls:
//! - Left mouse drag: Orbit camera
//! - Right mouse drag: Pan
//! - Scroll: Zoom
//! - Backspace: Reset view
//! - Escape: Quit

mod propellers;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use common::{debug, run_viewer, DriverConfig, SimContext, SimulationDriver, ViewerConfig, ViewerError};
use physics::Model;

use crate::propellers::PropellerController;

const MODEL_PATH: &str = "models/drone.xml";
const WINDOW_TITLE: &str = "Drone Simulation Viewer";
const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 600;

#[derive(Parser, Debug)]
#[command(about = "Quadrotor with constant propeller thrust")]
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

    /// Print the airframe state every this many simulated seconds
    #[arg(long)]
    report_every: Option<f64>,
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

    log::info!("Creating simulation data");
    let context = SimContext::new(model);

    let mut driver = SimulationDriver::new(context.clone())
        .with_controller(PropellerController::new(context.model()))
        .with_config(DriverConfig {
            duration: args.duration,
            report_every: args.report_every,
            ..DriverConfig::default()
        });
    if args.report_every.is_some() {
        let model = Arc::clone(context.model());
        driver = driver.with_observer(move |state| {
            debug::print_body_state(&model, state, "drone");
            debug::print_body_orientation_deg(&model, state, "drone");
        });
    }

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
            width: WINDOW_WIDTH,
            height: WINDOW_HEIGHT,
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
    drop(context);
    log::info!("Simulation completed successfully");
}
