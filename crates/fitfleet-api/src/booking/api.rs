//! `BookingApi` trait definition.
#![allow(clippy::future_not_send)]

use anyhow::Result;

use super::types::{BookingRequest, ClassSchedule};

/// Class booking API trait.
///
/// Abstracts the booking operations for mock substitution in UI code.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(BookingApi: Send)]
pub trait LocalBookingApi {
    /// Lists class schedules in backend order.
    ///
    /// # Errors
    ///
    /// Returns the original transport or decoding error.
    async fn fetch_schedules(&self) -> Result<Vec<ClassSchedule>>;

    /// Books a class.
    ///
    /// # Errors
    ///
    /// Returns the original transport or serialization error.
    async fn book_class(&self, request: &BookingRequest) -> Result<()>;

    /// Cancels a reservation.
    ///
    /// # Errors
    ///
    /// Returns the original transport or serialization error.
    async fn cancel_reservation(&self, class_id: u64, user_id: &str) -> Result<()>;
}
