//! Typed engine errors.
//!
//! Structural graph errors (lookup, wiring, construction) are returned as
//! `Err` and leave the simulation unmodified. Transient conditions such as a
//! duplicate element name or a missing weight file are logged and degrade
//! gracefully instead of erroring — see the individual operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FieldError {
    /// Invalid simulation construction parameter (non-positive delta-t,
    /// t-zero past t).
    #[error("invalid simulation parameter: {0}")]
    InvalidSimulationParameter(String),

    /// Requested run duration was not positive.
    #[error("run duration must be positive, got {0}")]
    NonPositiveRunTime(f64),

    /// No element with this name exists in the simulation.
    #[error("element '{0}' not found")]
    ElementNotFound(String),

    /// Element index past the end of the container.
    #[error("element index {index} out of range (have {len})")]
    ElementIndexOutOfRange { index: usize, len: usize },

    /// The element exists but has no component with this name.
    #[error("component '{component}' not found on element '{element}'")]
    ComponentNotFound { element: String, component: String },

    /// Element constructed with a non-positive spatial size.
    #[error("element '{0}' has an invalid size")]
    InvalidElementSize(String),

    /// The source component's length does not match the receiver's input
    /// length.
    #[error(
        "input '{source_name}' ({found} samples) does not match '{target}' input size ({expected})"
    )]
    InputSizeMismatch {
        source_name: String,
        target: String,
        expected: usize,
        found: usize,
    },

    /// Gauss stimulus centre outside the field's spatial extent.
    #[error("stimulus position {position} outside [0, {x_max})")]
    StimulusPositionOutOfRange { position: f64, x_max: f64 },
}
