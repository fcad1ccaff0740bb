//! Scheduling API request and response types.

use serde::{Deserialize, Serialize};

/// A scheduled class as returned by `classes/schedules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSchedule {
    /// Class ID.
    pub id: u64,
    /// Class name.
    pub name: String,
    /// Calendar date, as sent by the backend.
    pub date: String,
    /// Time of day, as sent by the backend.
    pub time: String,
}

/// Body of `classes/book` and `classes/cancel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Class to book or cancel.
    pub class_id: u64,
    /// User making the reservation.
    pub user_id: String,
}

impl BookingRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(class_id: u64, user_id: impl Into<String>) -> Self {
        Self {
            class_id,
            user_id: user_id.into(),
        }
    }
}
