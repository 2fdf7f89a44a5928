//! Error handling for the application

use thiserror::Error;

/// Errors produced by a single upstream data source
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("Transient upstream failure: {0}")]
    Transient(String),

    #[error("Permanent upstream failure: {0}")]
    Permanent(String),

    #[error("Identifier not known to this source: {0}")]
    NotFound(String),
}

impl SourceError {
    /// Transient failures and unknown identifiers may be retried on another
    /// adapter or on the next tick; permanent failures may not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Transient(_) | SourceError::NotFound(_))
    }
}

/// Errors produced by the adapter dispatcher
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    #[error("No data available for identifier: {0}")]
    NoDataAvailable(String),

    #[error("Dispatcher misconfiguration: {0}")]
    Internal(String),
}

/// Alert sink delivery errors
#[derive(Error, Debug, Clone)]
pub enum DeliveryError {
    #[error("Alert delivery failed: {0}")]
    SendFailed(String),

    #[error("Alert sink rejected payload: {0}")]
    Rejected(String),
}

/// Admission-related errors
#[derive(Error, Debug, Clone)]
pub enum AdmissionError {
    #[error("Admission controller is shut down")]
    ShutDown,
}

/// General application error
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Dispatch error: {0}")]
    DispatchError(String),

    #[error("Delivery error: {0}")]
    DeliveryError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SourceError> for WatchError {
    fn from(err: SourceError) -> Self {
        WatchError::SourceError(err.to_string())
    }
}

impl From<DispatchError> for WatchError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Internal(msg) => WatchError::Internal(msg),
            other => WatchError::DispatchError(other.to_string()),
        }
    }
}

impl From<DeliveryError> for WatchError {
    fn from(err: DeliveryError) -> Self {
        WatchError::DeliveryError(err.to_string())
    }
}

impl From<AdmissionError> for WatchError {
    fn from(err: AdmissionError) -> Self {
        WatchError::Internal(err.to_string())
    }
}
