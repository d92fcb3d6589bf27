use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Object has no {0}")]
    MissingObjectKey(String),

    #[error("Reconciliation timed out after {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, OperatorError>;

impl OperatorError {
    /// Whether the error is an optimistic-concurrency rejection.
    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(409)
    }

    fn api_code(&self) -> Option<u16> {
        match self {
            OperatorError::Kube(kube::Error::Api(resp)) => Some(resp.code),
            _ => None,
        }
    }
}

/// Build an API-server style error response, as returned for failed requests.
pub fn api_error(code: u16, reason: &str, message: impl Into<String>) -> OperatorError {
    OperatorError::Kube(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".into(),
        message: message.into(),
        reason: reason.into(),
        code,
    }))
}
