//! Shared runtime for physics simulations
//!
//! This crate pairs a [`physics::Model`] with the pieces needed to drive and
//! watch it: a shared [`SimContext`], a fixed-step [`SimulationDriver`] meant
//! to run on its own thread, an interactive viewer, and text reports for
//! inspecting joints, bodies and actuators by name.

pub mod camera;
pub mod context;
pub mod debug;
pub mod driver;
pub mod graphics;
pub mod mesh;
pub mod renderer;
pub mod scene;
pub mod viewer;

pub use camera::ViewerCamera;
pub use context::SimContext;
pub use debug::{quat_to_euler, EulerAngles, LookupError};
pub use driver::{ControlInputs, Controller, DriverConfig, DriverStats, NoControl, SimulationDriver};
pub use graphics::{GraphicsContext, GraphicsError};
pub use scene::{GeomInstance, MeshKind, Scene};
pub use viewer::{run_viewer, ViewerConfig, ViewerError, ViewerPhase};
