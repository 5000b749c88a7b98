use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::booking::slots::SlotTime;
use crate::models::ServiceKind;

mod client;
mod signing;

pub use client::HttpCalendarClient;
pub use signing::{
    CALENDAR_AUTH_NONCE_HEADER, CALENDAR_AUTH_SIGNATURE_HEADER, CALENDAR_AUTH_TIMESTAMP_HEADER,
    sign_calendar_request, verify_calendar_signature,
};

pub type CalendarFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, CalendarError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("calendar slot is already reserved")]
    Conflict,
    #[error("calendar request timed out")]
    Timeout,
    #[error("calendar service unavailable: {message}")]
    Unavailable { message: String },
    #[error("calendar service rejected request: status={status}")]
    Rejected { status: u16 },
    #[error("calendar response invalid: {message}")]
    ResponseInvalid { message: String },
}

/// Booking details sent to the external calendar when reserving a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub service: ServiceKind,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlotsResponse {
    pub slots: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub reservation_id: String,
}

/// External calendar that owns the authoritative schedule when reachable.
pub trait CalendarService: Send + Sync {
    /// Free start times for `date`, as `HH:MM` strings. An empty list means
    /// the service has no opinion and local records should be used.
    fn available_slots(
        &self,
        date: NaiveDate,
        service: ServiceKind,
    ) -> CalendarFuture<'_, Vec<String>>;

    /// Reserves a slot and returns the service's reservation id. A slot that
    /// is already taken yields [`CalendarError::Conflict`].
    fn book_appointment<'a>(
        &'a self,
        request: &'a ReservationRequest,
    ) -> CalendarFuture<'a, String>;
}
