use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::calendar::{CalendarError, CalendarService, ReservationRequest};
use crate::models::{Appointment, AppointmentStatus, NewAppointment};
use crate::repos::{AppointmentStore, StoreError};

use super::availability::AvailabilityResolver;
use super::session::{BookingStep, ChatSession, CompleteBooking};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitFailure {
    /// The external calendar could not be reached or refused the request.
    CalendarUnavailable,
    /// The local insert failed and no external reservation is held.
    Persistence,
    /// The external reservation exists but the local insert failed; the
    /// reservation id stays on the session so a retry only repeats the insert.
    PersistenceAfterReservation,
}

#[derive(Debug)]
pub enum CommitOutcome {
    /// Appointment stored and the session cleared.
    Committed(Appointment),
    /// The slot was taken between selection and confirmation. The session
    /// has been moved back to time selection with the time cleared.
    Conflict,
    /// A mandatory field is missing; the session is left untouched.
    Incomplete(BookingStep),
    /// Nothing user-visible changed; the session stays at confirmation.
    Failed(CommitFailure),
}

/// Turns a confirmed conversation into a persisted appointment.
#[derive(Clone)]
pub struct ConfirmationCommitter {
    resolver: AvailabilityResolver,
    appointments: Arc<dyn AppointmentStore>,
    calendar: Option<Arc<dyn CalendarService>>,
    calendar_timeout: Duration,
}

impl ConfirmationCommitter {
    pub fn new(
        resolver: AvailabilityResolver,
        appointments: Arc<dyn AppointmentStore>,
        calendar: Option<Arc<dyn CalendarService>>,
        calendar_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            appointments,
            calendar,
            calendar_timeout,
        }
    }

    pub async fn commit(&self, session: &mut ChatSession, now: DateTime<Utc>) -> CommitOutcome {
        let Some(booking) = session.booking_data.complete() else {
            return CommitOutcome::Incomplete(first_missing_step(session));
        };
        let request = reservation_request(&booking);
        let held_reservation = session.flow.reservation_id.clone();

        // A held reservation already proved the slot free externally.
        if held_reservation.is_none() {
            let availability = self
                .resolver
                .available_slots(request.date, request.service)
                .await;
            if !availability.contains(request.time) {
                info!(
                    session_id = %session.session_id,
                    date = %request.date,
                    time = %request.time,
                    source = availability.source.as_str(),
                    "slot no longer available at confirmation"
                );
                rewind_to_time_selection(session);
                return CommitOutcome::Conflict;
            }
        }

        let reservation_id = match (held_reservation, self.calendar.as_ref()) {
            (Some(reservation_id), _) => Some(reservation_id),
            (None, None) => None,
            (None, Some(calendar)) => match self.reserve(calendar.as_ref(), &request).await {
                Ok(reservation_id) => {
                    session.flow.reservation_id = Some(reservation_id.clone());
                    Some(reservation_id)
                }
                Err(CalendarError::Conflict) => {
                    info!(
                        session_id = %session.session_id,
                        date = %request.date,
                        time = %request.time,
                        "calendar reported slot conflict"
                    );
                    rewind_to_time_selection(session);
                    return CommitOutcome::Conflict;
                }
                Err(err) => {
                    warn!(
                        session_id = %session.session_id,
                        "calendar reservation failed: {err}"
                    );
                    return CommitOutcome::Failed(CommitFailure::CalendarUnavailable);
                }
            },
        };

        let new_appointment = NewAppointment {
            service: request.service,
            date: request.date,
            time: request.time,
            name: request.name,
            email: request.email,
            phone: request.phone,
            message: request.message,
            status: AppointmentStatus::Confirmed,
            priority: false,
        };

        match self.appointments.insert_appointment(&new_appointment, now).await {
            Ok(appointment) => {
                info!(
                    session_id = %session.session_id,
                    appointment_id = %appointment.id,
                    service = appointment.service.slug(),
                    date = %appointment.date,
                    time = %appointment.time,
                    reservation_id = reservation_id.as_deref().unwrap_or(""),
                    "appointment confirmed"
                );
                session.clear();
                CommitOutcome::Committed(appointment)
            }
            Err(StoreError::SlotTaken { date, time }) => {
                if let Some(reservation_id) = reservation_id.as_deref() {
                    error!(
                        session_id = %session.session_id,
                        reservation_id,
                        date = %date,
                        time = %time,
                        "slot taken locally after external reservation succeeded"
                    );
                }
                rewind_to_time_selection(session);
                CommitOutcome::Conflict
            }
            Err(err) => {
                error!(
                    session_id = %session.session_id,
                    has_reservation = reservation_id.is_some(),
                    "failed to persist appointment: {err}"
                );
                let failure = if reservation_id.is_some() {
                    CommitFailure::PersistenceAfterReservation
                } else {
                    CommitFailure::Persistence
                };
                CommitOutcome::Failed(failure)
            }
        }
    }

    async fn reserve(
        &self,
        calendar: &dyn CalendarService,
        request: &ReservationRequest,
    ) -> Result<String, CalendarError> {
        timeout(self.calendar_timeout, calendar.book_appointment(request))
            .await
            .unwrap_or(Err(CalendarError::Timeout))
    }
}

fn reservation_request(booking: &CompleteBooking<'_>) -> ReservationRequest {
    ReservationRequest {
        service: booking.service,
        date: booking.date,
        time: booking.time,
        name: booking.name.to_string(),
        email: booking.email.to_string(),
        phone: booking.phone.to_string(),
        message: booking.message.map(str::to_string),
    }
}

/// Clears the chosen time and asks for a new one; once picked, the flow
/// returns straight to confirmation.
pub(crate) fn rewind_to_time_selection(session: &mut ChatSession) {
    session.booking_data.time = None;
    session.flow.reservation_id = None;
    session.flow.offered_slots.clear();
    session.flow.modifying = true;
    session.step = Some(BookingStep::TimeSelection);
}

fn first_missing_step(session: &ChatSession) -> BookingStep {
    let data = &session.booking_data;
    let blank = |value: &Option<String>| value.as_deref().is_none_or(|value| value.trim().is_empty());

    if data.service.is_none() {
        BookingStep::ServiceSelection
    } else if data.date.is_none() {
        BookingStep::DateSelection
    } else if data.time.is_none() {
        BookingStep::TimeSelection
    } else if blank(&data.name) {
        BookingStep::NameInput
    } else if blank(&data.email) {
        BookingStep::EmailInput
    } else {
        BookingStep::PhoneInput
    }
}
