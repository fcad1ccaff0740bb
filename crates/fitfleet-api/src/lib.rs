//! API client library for FitFleet.
//!
//! Provides the booking client used to list class schedules, book classes
//! and cancel reservations against the FitFleet scheduling API.

/// Class booking API client.
pub mod booking;
