use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::rpc::error::{ErrorCode, ResponseError};

/// Failure raised by a request or notification handler
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A failure carrying its own wire code
    #[error("{0}")]
    Response(ResponseError),

    #[error("Request cancelled")]
    Cancelled,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        HandlerError::Response(ResponseError::new(code).with_message(message))
    }

    pub fn to_response_error(&self) -> ResponseError {
        match self {
            HandlerError::Response(error) => error.clone(),
            HandlerError::Cancelled => ResponseError::new(ErrorCode::RequestCancelled),
            HandlerError::Internal(error) => {
                ResponseError::new(ErrorCode::InternalError).with_message(error.to_string())
            }
        }
    }
}

impl From<ResponseError> for HandlerError {
    fn from(error: ResponseError) -> Self {
        HandlerError::Response(error)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> Self {
        HandlerError::Internal(error.into())
    }
}

impl From<AnalysisError> for HandlerError {
    fn from(error: AnalysisError) -> Self {
        match error {
            AnalysisError::Cancelled => HandlerError::Cancelled,
            other => HandlerError::with_code(ErrorCode::RequestFailed, other.to_string()),
        }
    }
}
