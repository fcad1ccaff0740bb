//! Logging sink for booking operation outcomes.

use std::sync::Arc;

use super::classify::ClassifiedError;

/// Sink for booking operation outcomes.
///
/// Implementations must not fail. `detail` is passed through unmodified.
#[allow(clippy::module_name_repetitions)]
pub trait BookingLogger {
    /// Records a successful operation.
    fn info(&self, message: &str);

    /// Records a failed operation.
    fn error(&self, message: &str, detail: Option<&ClassifiedError>);
}

impl<L: BookingLogger + ?Sized> BookingLogger for Arc<L> {
    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn error(&self, message: &str, detail: Option<&ClassifiedError>) {
        (**self).error(message, detail);
    }
}

/// Default sink: forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct TracingLogger;

impl BookingLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn error(&self, message: &str, detail: Option<&ClassifiedError>) {
        match detail {
            Some(detail) => tracing::error!(
                kind = detail.kind(),
                status = detail.status_code(),
                ?detail,
                "{message}"
            ),
            None => tracing::error!("{message}"),
        }
    }
}
