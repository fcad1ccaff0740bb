//! `BookingClient` - scheduling API client implementation.
#![allow(clippy::future_not_send)]

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::FutureExt;
use tracing::instrument;

use super::api::LocalBookingApi;
use super::classify::{ClassifiedError, classify, classify_panic};
use super::logger::{BookingLogger, TracingLogger};
use super::transport::{HttpTransport, LocalTransport, TransportRequest};
use super::types::{BookingRequest, ClassSchedule};

/// Path of the schedule listing endpoint.
const SCHEDULES_PATH: &str = "/classes/schedules";

/// Path of the booking endpoint.
const BOOK_PATH: &str = "/classes/book";

/// Path of the cancellation endpoint (DELETE with a JSON body).
const CANCEL_PATH: &str = "/classes/cancel";

/// Default User-Agent.
const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Booking operation, used to pick log messages.
#[derive(Debug, Clone, Copy)]
enum Operation {
    FetchSchedules,
    BookClass,
    CancelReservation,
}

impl Operation {
    const fn success_message(self) -> &'static str {
        match self {
            Self::FetchSchedules => "Fetched class schedules",
            Self::BookClass => "Class booked successfully",
            Self::CancelReservation => "Reservation cancelled successfully",
        }
    }

    const fn failure_message(self) -> &'static str {
        match self {
            Self::FetchSchedules => "Error fetching class schedules",
            Self::BookClass => "Error booking class",
            Self::CancelReservation => "Error cancelling reservation",
        }
    }
}

/// Scheduling API client.
///
/// Each operation is one round trip with no retry, caching or timeout of
/// its own. Every failure is logged once with its classification and then
/// returned to the caller unchanged.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct BookingClient<T = HttpTransport, L = TracingLogger> {
    /// Transport used for every round trip.
    transport: T,
    /// Outcome sink.
    logger: L,
    /// Base URL without a trailing slash. May be empty.
    base_url: String,
}

/// Builder for a `BookingClient` over `HttpTransport` and `TracingLogger`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct BookingClientBuilder {
    base_url: Option<String>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
}

impl BookingClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            base_url: None,
            user_agent: None,
            timeout: None,
        }
    }

    /// Sets the base URL (default: empty string).
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the User-Agent (default: `fitfleet-api/<version>`).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets a transport-level request timeout (default: none).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the `reqwest::Client` build fails.
    pub fn build(self) -> Result<BookingClient> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| String::from(DEFAULT_USER_AGENT));
        let transport = HttpTransport::new(&user_agent, self.timeout)?;

        Ok(BookingClient::new(
            self.base_url.unwrap_or_default(),
            transport,
            TracingLogger,
        ))
    }
}

impl BookingClient {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> BookingClientBuilder {
        BookingClientBuilder::new()
    }
}

impl<T, L> BookingClient<T, L> {
    /// Creates a client from explicit dependencies.
    #[must_use]
    pub fn new(base_url: impl Into<String>, transport: T, logger: L) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            transport,
            logger,
            base_url,
        }
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins an endpoint path onto the base URL.
    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl<T: LocalTransport, L: BookingLogger> BookingClient<T, L> {
    /// Runs one operation, logging its outcome exactly once.
    ///
    /// Errors are classified for the log entry and returned unchanged.
    /// Panics are classified as `Unexpected`, logged, then resumed.
    async fn settle<R>(
        &self,
        operation: Operation,
        work: impl Future<Output = Result<R>>,
    ) -> Result<R> {
        match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(value)) => {
                self.log_info(operation.success_message());
                Ok(value)
            }
            Ok(Err(err)) => {
                let classified = classify(&err);
                self.log_error(operation.failure_message(), &classified);
                Err(err)
            }
            Err(payload) => {
                let classified = classify_panic(payload.as_ref());
                self.log_error(operation.failure_message(), &classified);
                std::panic::resume_unwind(payload)
            }
        }
    }

    fn log_info(&self, message: &str) {
        let logged = std::panic::catch_unwind(AssertUnwindSafe(|| self.logger.info(message)));
        if logged.is_err() {
            tracing::warn!("Booking logger panicked while recording success");
        }
    }

    fn log_error(&self, message: &str, detail: &ClassifiedError) {
        let logged = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.logger.error(message, Some(detail));
        }));
        if logged.is_err() {
            tracing::warn!("Booking logger panicked while recording failure");
        }
    }

    async fn request_schedules(&self) -> Result<Vec<ClassSchedule>> {
        let request = TransportRequest::get(self.endpoint(SCHEDULES_PATH));
        let response = self.transport.send(request).await?;
        serde_json::from_str(&response.body).context("failed to decode class schedules")
    }

    async fn request_booking(&self, request: &BookingRequest) -> Result<()> {
        let body = serde_json::to_value(request).context("failed to serialize booking request")?;
        self.transport
            .send(TransportRequest::post(self.endpoint(BOOK_PATH), body))
            .await?;
        Ok(())
    }

    async fn request_cancellation(&self, class_id: u64, user_id: &str) -> Result<()> {
        let body = serde_json::to_value(BookingRequest::new(class_id, user_id))
            .context("failed to serialize cancellation request")?;
        self.transport
            .send(TransportRequest::delete(self.endpoint(CANCEL_PATH), body))
            .await?;
        Ok(())
    }
}

impl<T: LocalTransport, L: BookingLogger> LocalBookingApi for BookingClient<T, L> {
    #[instrument(skip_all)]
    async fn fetch_schedules(&self) -> Result<Vec<ClassSchedule>> {
        self.settle(Operation::FetchSchedules, self.request_schedules())
            .await
    }

    #[instrument(skip_all, fields(class_id = request.class_id))]
    async fn book_class(&self, request: &BookingRequest) -> Result<()> {
        self.settle(Operation::BookClass, self.request_booking(request))
            .await
    }

    #[instrument(skip_all, fields(class_id = class_id))]
    async fn cancel_reservation(&self, class_id: u64, user_id: &str) -> Result<()> {
        self.settle(
            Operation::CancelReservation,
            self.request_cancellation(class_id, user_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]
    #![allow(clippy::panic)]

    use std::sync::Arc;

    use super::*;
    use crate::booking::logger::recording::{Entry, RecordingLogger};
    use crate::booking::transport::{TransportError, TransportResponse};

    type TestClient = BookingClient<HttpTransport, Arc<RecordingLogger>>;

    fn make_client(
        base_url: &str,
        timeout: Option<Duration>,
    ) -> (TestClient, Arc<RecordingLogger>) {
        let logger = Arc::new(RecordingLogger::default());
        let transport = HttpTransport::new("test/0.0.0", timeout).unwrap();
        let client = BookingClient::new(base_url, transport, Arc::clone(&logger));
        (client, logger)
    }

    /// Transport that panics on every call.
    #[derive(Debug)]
    struct PanickingTransport;

    impl LocalTransport for PanickingTransport {
        async fn send(
            &self,
            _request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            panic!("transport exploded")
        }
    }

    /// Logger that panics on every call.
    #[derive(Debug)]
    struct PanickingLogger;

    impl BookingLogger for PanickingLogger {
        fn info(&self, _message: &str) {
            panic!("logger exploded");
        }

        fn error(&self, _message: &str, _detail: Option<&ClassifiedError>) {
            panic!("logger exploded");
        }
    }

    #[test]
    fn test_builder_defaults_to_empty_base_url() {
        // Arrange & Act
        let client = BookingClient::builder().build().unwrap();

        // Assert
        assert_eq!(client.base_url(), "");
    }

    #[test]
    fn test_builder_with_custom_base_url() {
        // Arrange & Act
        let client = BookingClient::builder()
            .base_url("http://localhost:8080/api")
            .user_agent("test/0.0.0")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        // Assert
        assert_eq!(client.base_url(), "http://localhost:8080/api");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        // Arrange
        let (client, _) = make_client("http://localhost:8080/api/", None);

        // Act
        let url = client.endpoint(SCHEDULES_PATH);

        // Assert
        assert_eq!(url, "http://localhost:8080/api/classes/schedules");
    }

    #[tokio::test]
    async fn test_fetch_schedules_returns_backend_order() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        let json_body = r#"[
            {"id": 9, "name": "Boxing", "date": "2024-05-03", "time": "19:00"},
            {"id": 1, "name": "Yoga", "date": "2024-05-01", "time": "18:30"},
            {"id": 4, "name": "Spin", "date": "2024-05-02", "time": "07:00"}
        ]"#;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/classes/schedules"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(json_body))
            .expect(1)
            .mount(&mock_server)
            .await;
        let (client, logger) = make_client(&mock_server.uri(), None);
        let expected: Vec<ClassSchedule> = serde_json::from_str(json_body).unwrap();

        // Act
        let schedules = client.fetch_schedules().await.unwrap();

        // Assert
        assert_eq!(schedules, expected);
        assert_eq!(
            logger.entries(),
            vec![Entry::Info(String::from("Fetched class schedules"))]
        );
    }

    #[tokio::test]
    async fn test_book_class_posts_request() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/classes/book"))
            .and(wiremock::matchers::body_json(
                serde_json::json!({ "classId": 5, "userId": "u1" }),
            ))
            .respond_with(wiremock::ResponseTemplate::new(201).set_body_string("ignored"))
            .expect(1)
            .mount(&mock_server)
            .await;
        let (client, logger) = make_client(&mock_server.uri(), None);

        // Act
        client
            .book_class(&BookingRequest::new(5, "u1"))
            .await
            .unwrap();

        // Assert
        assert_eq!(
            logger.entries(),
            vec![Entry::Info(String::from("Class booked successfully"))]
        );
    }

    #[tokio::test]
    async fn test_book_class_conflict_is_logged_and_returned() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/classes/book"))
            .respond_with(
                wiremock::ResponseTemplate::new(409).set_body_string(r#"{"error":"full"}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        let (client, logger) = make_client(&mock_server.uri(), None);

        // Act
        let err = client
            .book_class(&BookingRequest::new(5, "u1"))
            .await
            .unwrap_err();

        // Assert: caller sees the original transport error
        let transport = err.downcast_ref::<TransportError>().unwrap();
        assert_eq!(transport.status(), Some(409));
        assert_eq!(transport.response().unwrap().body, r#"{"error":"full"}"#);

        // Assert: exactly one log entry, classified as a rejection
        let entries = logger.entries();
        assert_eq!(entries.len(), 1);
        let errors = logger.errors();
        assert_eq!(errors[0].0, "Error booking class");
        let detail = errors[0].1.as_ref().unwrap();
        assert_eq!(detail.kind(), "server_rejected");
        assert_eq!(detail.status_code(), Some(409));
    }

    #[tokio::test]
    async fn test_cancel_reservation_sends_delete_with_body() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("DELETE"))
            .and(wiremock::matchers::path("/classes/cancel"))
            .and(wiremock::matchers::body_json(
                serde_json::json!({ "classId": 5, "userId": "u1" }),
            ))
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;
        let (client, logger) = make_client(&mock_server.uri(), None);

        // Act
        client.cancel_reservation(5, "u1").await.unwrap();

        // Assert
        assert_eq!(
            logger.entries(),
            vec![Entry::Info(String::from(
                "Reservation cancelled successfully"
            ))]
        );
    }

    #[tokio::test]
    async fn test_cancel_reservation_without_reply_is_network_unreachable() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("DELETE"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;
        let (client, logger) = make_client(&mock_server.uri(), Some(Duration::from_millis(100)));

        // Act
        let result = client.cancel_reservation(5, "u1").await;

        // Assert
        assert!(result.is_err());
        let errors = logger.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "Error cancelling reservation");
        assert_eq!(errors[0].1.as_ref().unwrap().kind(), "network_unreachable");
    }

    #[tokio::test]
    async fn test_fetch_schedules_with_empty_base_url_is_setup_failure() {
        // Arrange
        let (client, logger) = make_client("", None);

        // Act
        let err = client.fetch_schedules().await.unwrap_err();

        // Assert
        let transport = err.downcast_ref::<TransportError>().unwrap();
        assert!(transport.request().is_none());
        let errors = logger.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1.as_ref().unwrap().kind(), "request_setup_failed");
    }

    #[tokio::test]
    async fn test_fetch_schedules_connection_refused_is_not_empty_success() {
        // Arrange
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let (client, logger) = make_client(&format!("http://127.0.0.1:{port}"), None);

        // Act
        let result = client.fetch_schedules().await;

        // Assert
        assert!(result.is_err());
        let errors = logger.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1.as_ref().unwrap().kind(), "network_unreachable");
    }

    #[tokio::test]
    async fn test_fetch_schedules_malformed_body_is_logged() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;
        let (client, logger) = make_client(&mock_server.uri(), None);

        // Act
        let err = client.fetch_schedules().await.unwrap_err();

        // Assert
        assert!(err.to_string().contains("failed to decode class schedules"));
        let errors = logger.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].1,
            Some(ClassifiedError::RequestSetupFailed {
                message: String::from("failed to decode class schedules"),
            })
        );
    }

    #[tokio::test]
    async fn test_transport_panic_is_logged_and_resumed() {
        // Arrange
        let logger = Arc::new(RecordingLogger::default());
        let client = BookingClient::new(
            "http://localhost",
            PanickingTransport,
            Arc::clone(&logger),
        );

        // Act
        let outcome = AssertUnwindSafe(client.fetch_schedules())
            .catch_unwind()
            .await;

        // Assert
        assert!(outcome.is_err());
        assert_eq!(
            logger.errors(),
            vec![(
                String::from("Error fetching class schedules"),
                Some(ClassifiedError::Unexpected {
                    raw: String::from("transport exploded"),
                }),
            )]
        );
    }

    #[tokio::test]
    async fn test_logger_panic_does_not_mask_success() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&mock_server)
            .await;
        let transport = HttpTransport::new("test/0.0.0", None).unwrap();
        let client = BookingClient::new(mock_server.uri(), transport, PanickingLogger);

        // Act
        let schedules = client.fetch_schedules().await.unwrap();

        // Assert
        assert!(schedules.is_empty());
    }

    #[tokio::test]
    async fn test_logger_panic_does_not_mask_failure() {
        // Arrange
        let mock_server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .respond_with(wiremock::ResponseTemplate::new(409))
            .mount(&mock_server)
            .await;
        let transport = HttpTransport::new("test/0.0.0", None).unwrap();
        let client = BookingClient::new(mock_server.uri(), transport, PanickingLogger);

        // Act
        let err = client
            .book_class(&BookingRequest::new(5, "u1"))
            .await
            .unwrap_err();

        // Assert
        assert_eq!(
            err.downcast_ref::<TransportError>().unwrap().status(),
            Some(409)
        );
    }

    #[tokio::test]
    async fn test_independent_clients_do_not_share_base_url() {
        // Arrange
        let server_a = wiremock::MockServer::start().await;
        let server_b = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                r#"[{"id": 1, "name": "Yoga", "date": "2024-05-01", "time": "18:30"}]"#,
            ))
            .expect(1)
            .mount(&server_a)
            .await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                r#"[{"id": 2, "name": "Spin", "date": "2024-05-02", "time": "07:00"}]"#,
            ))
            .expect(1)
            .mount(&server_b)
            .await;
        let (client_a, _) = make_client(&server_a.uri(), None);
        let (client_b, _) = make_client(&server_b.uri(), None);

        // Act
        let (a, b) = tokio::join!(client_a.fetch_schedules(), client_b.fetch_schedules());

        // Assert
        assert_eq!(a.unwrap()[0].name, "Yoga");
        assert_eq!(b.unwrap()[0].name, "Spin");
    }
}
