use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy for the cube core
// ---------------------------------------------------------------------------

/// Everything that can go wrong while loading or querying a [`DataCube`].
///
/// Errors are raised at the point of detection and never retried; a method
/// that returns one has not mutated the cube.
///
/// [`DataCube`]: crate::DataCube
#[derive(Error, Debug)]
pub enum CubeError {
    /// Malformed or unsupported input: missing required header fields,
    /// wrong axis count, unreadable pixel data.
    #[error("not a valid data cube: {}", .0.join("; "))]
    Format(Vec<String>),

    /// A caller-supplied auxiliary array has an incompatible shape.
    #[error("input shape mismatch: expected {expected}, got {actual}")]
    InputShape { expected: String, actual: String },

    /// An invalid option was passed to a query or formatting method.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// A feature that exists in the interface but has no implementation.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),

    /// WCS metadata is present but cannot be used (axis roles or types).
    #[error("unusable WCS configuration: {0}")]
    Configuration(String),

    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CubeError {
    /// Shorthand for a single-problem [`CubeError::Format`].
    pub fn format(msg: impl Into<String>) -> Self {
        CubeError::Format(vec![msg.into()])
    }

    pub fn input_shape(expected: impl std::fmt::Debug, actual: impl std::fmt::Debug) -> Self {
        CubeError::InputShape {
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }
}

pub type Result<T, E = CubeError> = std::result::Result<T, E>;
