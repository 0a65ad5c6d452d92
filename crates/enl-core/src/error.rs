//! Error types for the object-access layer

use thiserror::Error;

use crate::{ClassEoj, Eoj, Epc};

/// Core ENL errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnlError {
    // Allocation errors
    #[error("Instance codes exhausted for class {class}")]
    CapacityExhausted { class: ClassEoj },

    #[error("Invalid instance code: {0:#04x}")]
    InvalidInstanceCode(u8),

    #[error("Object already registered: {0}")]
    DuplicateObject(Eoj),

    // Property errors
    #[error("Unknown property {epc} on object {eoj}")]
    UnknownProperty { eoj: Eoj, epc: Epc },

    #[error("Invalid property map: {0}")]
    InvalidPropertyMap(String),

    #[error("Invalid instance list: {0}")]
    InvalidInstanceList(String),

    // Batch errors
    #[error("Batch operation already completed")]
    BatchCompleted,

    // Remote errors
    #[error("Timeout must be positive")]
    InvalidTimeout,

    #[error("Remote access failed: {0}")]
    RemoteAccess(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type for ENL operations
pub type EnlResult<T> = Result<T, EnlError>;
