//! MJCF-style model loading and rigid-body stepping.
//!
//! A [`Model`] is compiled once from a `<mujoco>` document and never changes.
//! [`Data`] holds everything that evolves: the generalized coordinates, the
//! per-body poses and applied wrenches, and the `rapier3d` world that
//! integrates them.
//!
//! ```no_run
//! use physics::{Model, ObjectKind};
//!
//! let model = Model::from_xml_path("models/tb3.xml")?;
//! let mut data = model.make_data();
//! if let Some(motor) = model.name_to_id(ObjectKind::Actuator, "left_motor") {
//!     data.ctrl_mut()[motor] = 1.0;
//! }
//! for _ in 0..100 {
//!     data.step(&model);
//! }
//! println!("t = {:.3}", data.time());
//! # Ok::<(), physics::ModelError>(())
//! ```

mod colliders;
mod data;
mod error;
mod joints;
mod mjcf;
mod model;

pub use data::{Data, State};
pub use error::ModelError;
pub use model::{
    Actuator, ActuatorKind, Body, Geom, GeomType, Joint, JointType, Model, ObjectKind, Options,
    DEFAULT_DENSITY, DEFAULT_TIMESTEP, WORLD_BODY_NAME,
};
