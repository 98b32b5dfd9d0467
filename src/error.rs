use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstapaperError {
    #[error("ConfigurationError: {0}")]
    Configuration(String),
    #[error("TokenAcquisitionError: {0}")]
    TokenAcquisition(String),
    #[error("SignatureRequestError: {0}")]
    SignatureRequest(String),
    #[error("ProviderRejected: {endpoint} returned {status}: {body}")]
    ProviderRejected {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
}

impl InstapaperError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            InstapaperError::ProviderRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("ConfigurationError: {0}")]
    Configuration(String),
    #[error("RequestError")]
    Request(#[from] reqwest::Error),
    #[error("ProviderRejected: {endpoint} returned {status}: {body}")]
    Provider {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("InvalidResponse: {0}")]
    InvalidResponse(String),
}

#[derive(Debug)]
pub enum HandlerError {
    Instapaper(InstapaperError),
    Feed(FeedError),
    ValidationError(String),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use HandlerError::*;
        match self {
            Instapaper(e) => write!(f, "InstapaperError: {}", crate::unpack_error(e)),
            Feed(e) => write!(f, "FeedError: {}", crate::unpack_error(e)),
            ValidationError(s) => write!(f, "ValidationError: {}", s),
        }
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use HandlerError::*;
        match self {
            Instapaper(e) => Some(e),
            Feed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InstapaperError> for HandlerError {
    fn from(error: InstapaperError) -> Self {
        HandlerError::Instapaper(error)
    }
}

impl From<FeedError> for HandlerError {
    fn from(error: FeedError) -> Self {
        HandlerError::Feed(error)
    }
}
