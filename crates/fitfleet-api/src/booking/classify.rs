//! Failure classification for diagnostic logging.

use std::any::Any;
use std::collections::BTreeMap;

use super::transport::{RequestSummary, TransportError};

/// Failure category of a booking operation.
///
/// Produced for logging only; callers always see the original error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifiedError {
    /// The server answered with a non-2xx status.
    #[error("server rejected the request with status {status_code}")]
    ServerRejected {
        /// HTTP status code.
        status_code: u16,
        /// Raw response body.
        body: String,
        /// Response headers.
        headers: BTreeMap<String, String>,
    },
    /// The request was sent but no response arrived.
    #[error("no response received for {request}")]
    NetworkUnreachable {
        /// The request that went unanswered.
        request: RequestSummary,
    },
    /// The request failed before it was sent.
    #[error("request setup failed: {message}")]
    RequestSetupFailed {
        /// Failure message.
        message: String,
    },
    /// A non-error failure, such as a panic payload.
    #[error("unexpected failure: {raw}")]
    Unexpected {
        /// Text of the raw value.
        raw: String,
    },
}

impl ClassifiedError {
    /// Short machine-readable name of the category.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ServerRejected { .. } => "server_rejected",
            Self::NetworkUnreachable { .. } => "network_unreachable",
            Self::RequestSetupFailed { .. } => "request_setup_failed",
            Self::Unexpected { .. } => "unexpected",
        }
    }

    /// HTTP status code, for server rejections.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::ServerRejected { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

/// Classifies an operation failure.
///
/// Checked in priority order: a transport error with a response, a
/// transport error with only a request, a transport error with neither,
/// then any other error. A `TransportError` is found under any number of
/// context layers.
#[must_use]
pub fn classify(raw: &anyhow::Error) -> ClassifiedError {
    let transport = raw
        .chain()
        .find_map(|cause| cause.downcast_ref::<TransportError>());

    let Some(transport) = transport else {
        return ClassifiedError::RequestSetupFailed {
            message: raw.to_string(),
        };
    };

    if let Some(response) = transport.response() {
        ClassifiedError::ServerRejected {
            status_code: response.status,
            body: response.body.clone(),
            headers: response.headers.clone(),
        }
    } else if let Some(request) = transport.request() {
        ClassifiedError::NetworkUnreachable {
            request: request.clone(),
        }
    } else {
        ClassifiedError::RequestSetupFailed {
            message: transport.to_string(),
        }
    }
}

/// Classifies a panic payload caught at an operation boundary.
#[must_use]
pub fn classify_panic(payload: &(dyn Any + Send)) -> ClassifiedError {
    let raw = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| String::from("<non-string panic payload>"));
    ClassifiedError::Unexpected { raw }
}
