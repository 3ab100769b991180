//! Error types for model loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or compiling a model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The model file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document is not well-formed or does not match the expected layout.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// An attribute value could not be parsed.
    #[error("Invalid value '{value}' for attribute '{attribute}' of <{element}>")]
    InvalidAttribute {
        /// Element the attribute belongs to.
        element: &'static str,
        /// Attribute name.
        attribute: &'static str,
        /// Raw value found in the document.
        value: String,
    },

    /// An element type or kind that this loader does not handle.
    #[error("Unsupported {element} type '{kind}'")]
    Unsupported {
        /// Element name.
        element: &'static str,
        /// The offending `type` value.
        kind: String,
    },

    /// Two objects of the same category share a name.
    #[error("Repeated {kind} name '{name}'")]
    DuplicateName {
        /// Object category.
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// A body declares more than one joint.
    #[error("Body '{0}' has more than one joint")]
    MultipleJoints(String),

    /// A moving body has no mass.
    #[error("Mass and inertia of moving body '{0}' must be positive")]
    MasslessBody(String),

    /// A plane geom was attached to a body that can move.
    #[error("Plane geom '{0}' must belong to a static body")]
    MovingPlane(String),

    /// An actuator references a joint that does not exist or cannot be driven.
    #[error("Actuator '{actuator}' cannot drive joint '{joint}'")]
    ActuatorTarget {
        /// Actuator name (or index when unnamed).
        actuator: String,
        /// Referenced joint name.
        joint: String,
    },
}
