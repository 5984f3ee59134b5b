//! The module contains the errors the engine can throw.
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Enrollment failed: {0}")]
    EnrollFailed(String),
    #[error("Operation timed out: {0}")]
    OperationTimeout(String),
    #[error("Fingerprint device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Label store error: {0}")]
    LabelStore(String),
    #[error(transparent)]
    Bus(#[from] zbus::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
}
