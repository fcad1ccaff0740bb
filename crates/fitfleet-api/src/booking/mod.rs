//! Class booking API client module.
//!
//! Issues the three scheduling API round trips, classifies failures for
//! diagnostics and hands the original failure back to the caller.

mod api;
mod classify;
mod client;
mod logger;
mod transport;
mod types;

#[allow(clippy::module_name_repetitions)]
pub use api::{BookingApi, LocalBookingApi};
pub use classify::{ClassifiedError, classify, classify_panic};
#[allow(clippy::module_name_repetitions)]
pub use client::{BookingClient, BookingClientBuilder};
#[allow(clippy::module_name_repetitions)]
pub use logger::{BookingLogger, TracingLogger};
pub use transport::{
    ErrorResponse, HttpTransport, LocalTransport, RequestSummary, Transport, TransportError,
    TransportRequest, TransportResponse,
};
pub use types::{BookingRequest, ClassSchedule};
