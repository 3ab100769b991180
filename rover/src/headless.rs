//! Step the rover model a fixed number of times on the main thread and print
//! the raw state vectors after every step.

use std::path::PathBuf;

use clap::Parser;
use common::debug;
use physics::Model;

const MODEL_PATH: &str = "models/tb3.xml";
const DEFAULT_STEPS: u32 = 1000;

#[derive(Parser, Debug)]
#[command(about = "Headless stepping with per-step state dump")]
struct Args {
    /// Model file to load
    #[arg(long, default_value = MODEL_PATH)]
    model: PathBuf,

    /// Number of steps to run
    #[arg(long, default_value_t = DEFAULT_STEPS)]
    steps: u32,
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

    let mut data = model.make_data();
    for _ in 0..args.steps {
        data.step(&model);
        debug::print_state_vectors(data.state());
    }
}
