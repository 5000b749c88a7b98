use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calendar::CalendarService;
use crate::models::{ChatResponse, Language};
use crate::repos::{AppointmentStore, SessionRepository, StoreError};
use crate::timezone::business_local_date;

use super::availability::AvailabilityResolver;
use super::commit::{CommitFailure, CommitOutcome, ConfirmationCommitter};
use super::date_parser::parse_date;
use super::fallback::{ChatFallback, StaticFallback};
use super::intent::{
    ConfirmationReply, detect_booking_intent, is_cancel_command, is_skip, match_confirmation,
    match_modify_target, match_service, menu_number,
};
use super::prompts::{self, Notice};
use super::session::{BookingStep, ChatSession, resolve_session_id};
use super::slots::{SlotTime, menu_order};
use super::validation::{FieldError, validate_email, validate_name, validate_phone};


pub const DEFAULT_CALENDAR_TIMEOUT: Duration = Duration::from_millis(3_000);

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub session_ttl_seconds: u64,
    pub business_time_zone: String,
    pub calendar_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("session store error: {0}")]
    SessionStore(#[from] StoreError),
}

/// One inbound chat message.
#[derive(Debug, Clone, Copy)]
pub struct ChatTurn<'a> {
    pub message: &'a str,
    pub session_id: Option<&'a str>,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub response: String,
    pub session_id: String,
    pub booking_flow: bool,
    pub step: Option<BookingStep>,
    pub booking_complete: bool,
}

impl From<TurnReply> for ChatResponse {
    fn from(reply: TurnReply) -> Self {
        Self {
            response: reply.response,
            session_id: reply.session_id,
            booking_flow: reply.booking_flow,
            step: reply.step.map(|step| step.as_str().to_string()),
            booking_complete: reply.booking_complete.then_some(true),
        }
    }
}

struct StepReply {
    response: String,
    booking_complete: bool,
}

impl StepReply {
    fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            booking_complete: false,
        }
    }
}

/// Drives the booking conversation: one call per chat turn, session state
/// loaded before and saved after.
#[derive(Clone)]
pub struct BookingEngine {
    sessions: Arc<dyn SessionRepository>,
    resolver: AvailabilityResolver,
    committer: ConfirmationCommitter,
    fallback: Arc<dyn ChatFallback>,
    settings: EngineSettings,
}

impl BookingEngine {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        appointments: Arc<dyn AppointmentStore>,
        calendar: Option<Arc<dyn CalendarService>>,
        settings: EngineSettings,
    ) -> Self {
        let resolver = AvailabilityResolver::new(
            appointments.clone(),
            calendar.clone(),
            settings.calendar_timeout,
        );
        let committer = ConfirmationCommitter::new(
            resolver.clone(),
            appointments,
            calendar,
            settings.calendar_timeout,
        );

        Self {
            sessions,
            resolver,
            committer,
            fallback: Arc::new(StaticFallback),
            settings,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn ChatFallback>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn sessions(&self) -> &Arc<dyn SessionRepository> {
        &self.sessions
    }

    pub async fn handle_turn(
        &self,
        turn: ChatTurn<'_>,
        now: DateTime<Utc>,
    ) -> Result<TurnReply, EngineError> {
        let message = turn.message.trim();
        if message.is_empty() {
            return Err(EngineError::EmptyMessage);
        }
        let session_id = resolve_session_id(turn.session_id);
        let language = turn.language;

        let stored = match self.sessions.get_session(&session_id).await? {
            Some(session) if session.is_expired(now, self.settings.session_ttl_seconds) => {
                debug!(session_id = %session_id, "session expired, starting fresh");
                None
            }
            other => other,
        };

        let mut session = match stored {
            Some(session) if session.booking_mode => session,
            stored => {
                if !detect_booking_intent(message) {
                    let response = self.fallback.reply(message, language).await;
                    if let Some(mut session) = stored {
                        session.last_activity = now;
                        self.sessions.put_session(&session).await?;
                    }
                    return Ok(TurnReply {
                        response,
                        session_id,
                        booking_flow: false,
                        step: None,
                        booking_complete: false,
                    });
                }

                let mut session =
                    stored.unwrap_or_else(|| ChatSession::new(session_id.clone(), now));
                session.start_booking();
                session.last_activity = now;
                self.sessions.put_session(&session).await?;
                info!(
                    session_id = %session_id,
                    language = language.as_str(),
                    "booking flow started"
                );

                let response = with_notice(
                    Notice::BookingStarted,
                    language,
                    &prompts::service_menu(language),
                );
                return Ok(reply_for(&session, response, false));
            }
        };

        let step_reply = self.advance(&mut session, message, language, now).await;
        session.last_activity = now;
        self.sessions.put_session(&session).await?;

        Ok(reply_for(
            &session,
            step_reply.response,
            step_reply.booking_complete,
        ))
    }

    async fn advance(
        &self,
        session: &mut ChatSession,
        message: &str,
        language: Language,
        now: DateTime<Utc>,
    ) -> StepReply {
        if is_cancel_command(message) {
            info!(
                session_id = %session.session_id,
                step = session.step.map(BookingStep::as_str).unwrap_or("none"),
                "booking cancelled by user"
            );
            session.clear();
            return StepReply::text(prompts::notice(Notice::Cancelled, language));
        }

        let Some(step) = session.step else {
            session.start_booking();
            return StepReply::text(prompts::service_menu(language));
        };

        match step {
            BookingStep::ServiceSelection => self.on_service(session, message, language),
            BookingStep::DateSelection => {
                let today = business_local_date(now, &self.settings.business_time_zone);
                self.on_date(session, message, language, today).await
            }
            BookingStep::TimeSelection => self.on_time(session, message, language).await,
            BookingStep::NameInput => match validate_name(message) {
                Ok(name) => {
                    session.booking_data.name = Some(name);
                    field_accepted(session, step, language)
                }
                Err(err) => field_rejected(step, err, language),
            },
            BookingStep::EmailInput => match validate_email(message) {
                Ok(email) => {
                    session.booking_data.email = Some(email);
                    field_accepted(session, step, language)
                }
                Err(err) => field_rejected(step, err, language),
            },
            BookingStep::PhoneInput => match validate_phone(message) {
                Ok(phone) => {
                    session.booking_data.phone = Some(phone);
                    field_accepted(session, step, language)
                }
                Err(err) => field_rejected(step, err, language),
            },
            BookingStep::MessageInput => {
                session.booking_data.message = (!is_skip(message)).then(|| message.to_string());
                field_accepted(session, step, language)
            }
            BookingStep::Confirmation => {
                self.on_confirmation(session, message, language, now).await
            }
            BookingStep::Modify => match match_modify_target(message) {
                Some(target) => self.begin_modify(session, target, language).await,
                None => StepReply::text(with_notice(
                    Notice::UnknownModifyChoice,
                    language,
                    &prompts::modify_menu(language),
                )),
            },
        }
    }

    fn on_service(&self, session: &mut ChatSession, message: &str, language: Language) -> StepReply {
        match match_service(message) {
            Some(service) => {
                if session.booking_data.service != Some(service) {
                    release_reservation(session);
                }
                session.booking_data.service = Some(service);
                field_accepted(session, BookingStep::ServiceSelection, language)
            }
            None => StepReply::text(with_notice(
                Notice::UnknownService,
                language,
                &prompts::service_menu(language),
            )),
        }
    }

    async fn on_date(
        &self,
        session: &mut ChatSession,
        message: &str,
        language: Language,
        today: NaiveDate,
    ) -> StepReply {
        let Ok(date) = parse_date(message, today) else {
            return StepReply::text(prompts::notice(Notice::DateNotRecognized, language));
        };
        if date < today {
            return StepReply::text(prompts::notice(Notice::DateInPast, language));
        }
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return StepReply::text(prompts::notice(Notice::WeekendDate, language));
        }
        let Some(service) = session.booking_data.service else {
            return restart_at_service(session, language);
        };

        let availability = self.resolver.available_slots(date, service).await;
        if availability.slots.is_empty() {
            return StepReply::text(prompts::notice(Notice::NoSlotsOnDate, language));
        }

        debug!(
            session_id = %session.session_id,
            date = %date,
            slots = availability.slots.len(),
            source = availability.source.as_str(),
            "date accepted"
        );
        if session.booking_data.date != Some(date) {
            release_reservation(session);
            session.booking_data.date = Some(date);
            session.booking_data.time = None;
        }
        StepReply::text(offer_slots(session, date, &availability.slots, language))
    }

    async fn on_time(&self, session: &mut ChatSession, message: &str, language: Language) -> StepReply {
        let (Some(date), Some(service)) = (session.booking_data.date, session.booking_data.service)
        else {
            return restart_at_service(session, language);
        };

        let Some(choice) = parse_time_choice(message, &session.flow.offered_slots) else {
            let menu = if session.flow.offered_slots.is_empty() {
                prompts::step_prompt(BookingStep::TimeSelection, language)
            } else {
                prompts::slot_menu(date, &session.flow.offered_slots, language)
            };
            return StepReply::text(with_notice(Notice::TimeNotRecognized, language, &menu));
        };

        let availability = self.resolver.available_slots(date, service).await;
        if availability.slots.is_empty() {
            return StepReply::text(back_to_date_selection(session, Notice::NoSlotsLeft, language));
        }
        if !availability.contains(choice) {
            let menu = offer_slots(session, date, &availability.slots, language);
            return StepReply::text(with_notice(Notice::SlotUnavailable, language, &menu));
        }

        if session.booking_data.time != Some(choice) {
            release_reservation(session);
        }
        session.booking_data.time = Some(choice);
        session.flow.offered_slots.clear();
        field_accepted(session, BookingStep::TimeSelection, language)
    }

    async fn on_confirmation(
        &self,
        session: &mut ChatSession,
        message: &str,
        language: Language,
        now: DateTime<Utc>,
    ) -> StepReply {
        match match_confirmation(message) {
            Some(ConfirmationReply::Confirm) => self.confirm(session, language, now).await,
            Some(ConfirmationReply::Decline) => {
                info!(session_id = %session.session_id, "booking declined at confirmation");
                session.clear();
                StepReply::text(prompts::notice(Notice::Cancelled, language))
            }
            Some(ConfirmationReply::Modify) => match match_modify_target(message) {
                Some(target) => self.begin_modify(session, target, language).await,
                None => {
                    session.step = Some(BookingStep::Modify);
                    StepReply::text(prompts::modify_menu(language))
                }
            },
            None => StepReply::text(with_notice(
                Notice::ConfirmationExpected,
                language,
                &prompts::step_prompt(BookingStep::Confirmation, language),
            )),
        }
    }

    async fn confirm(
        &self,
        session: &mut ChatSession,
        language: Language,
        now: DateTime<Utc>,
    ) -> StepReply {
        match self.committer.commit(session, now).await {
            CommitOutcome::Committed(appointment) => StepReply {
                response: prompts::booking_confirmed(&appointment, language),
                booking_complete: true,
            },
            CommitOutcome::Conflict => {
                let menu = self.reoffer_slots(session, language).await;
                StepReply::text(with_notice(Notice::SlotJustTaken, language, &menu))
            }
            CommitOutcome::Incomplete(step) => {
                let reply = self.begin_modify(session, step, language).await;
                StepReply::text(with_notice(
                    Notice::BookingIncomplete,
                    language,
                    &reply.response,
                ))
            }
            CommitOutcome::Failed(failure) => {
                debug!(
                    session_id = %session.session_id,
                    retry_skips_reservation = failure == CommitFailure::PersistenceAfterReservation,
                    "commit failed, session kept at confirmation"
                );
                StepReply::text(prompts::notice(Notice::CommitFailed, language))
            }
        }
    }

    /// Re-enters a single field; once it is accepted the flow goes back to
    /// confirmation.
    async fn begin_modify(
        &self,
        session: &mut ChatSession,
        target: BookingStep,
        language: Language,
    ) -> StepReply {
        session.flow.modifying = true;
        if target == BookingStep::TimeSelection {
            return StepReply::text(self.reoffer_slots(session, language).await);
        }

        session.step = Some(target);
        StepReply::text(prompts::step_prompt(target, language))
    }

    /// Shows fresh slots for the chosen date, or sends the user back to date
    /// selection when none are left.
    async fn reoffer_slots(&self, session: &mut ChatSession, language: Language) -> String {
        let (Some(date), Some(service)) = (session.booking_data.date, session.booking_data.service)
        else {
            session.step = Some(BookingStep::DateSelection);
            return prompts::step_prompt(BookingStep::DateSelection, language);
        };

        let availability = self.resolver.available_slots(date, service).await;
        if availability.slots.is_empty() {
            return back_to_date_selection(session, Notice::NoSlotsLeft, language);
        }
        offer_slots(session, date, &availability.slots, language)
    }
}

fn reply_for(session: &ChatSession, response: String, booking_complete: bool) -> TurnReply {
    TurnReply {
        response,
        session_id: session.session_id.clone(),
        booking_flow: session.booking_mode,
        step: session.step,
        booking_complete,
    }
}

/// Forgets an external reservation held from a failed commit once the slot
/// it covers is no longer the one being booked. The next commit reserves
/// again; the stale reservation is not cancelled upstream.
fn release_reservation(session: &mut ChatSession) {
    if let Some(reservation_id) = session.flow.reservation_id.take() {
        warn!(
            session_id = %session.session_id,
            reservation_id = %reservation_id,
            "booking changed after external reservation, reservation released"
        );
    }
}

fn field_accepted(session: &mut ChatSession, step: BookingStep, language: Language) -> StepReply {
    if session.flow.modifying {
        session.flow.modifying = false;
        session.step = Some(BookingStep::Confirmation);
        return StepReply::text(prompts::summary(&session.booking_data, language));
    }

    let next = step.next();
    session.step = Some(next);
    if next == BookingStep::Confirmation {
        StepReply::text(prompts::summary(&session.booking_data, language))
    } else {
        StepReply::text(prompts::step_prompt(next, language))
    }
}

fn field_rejected(step: BookingStep, err: FieldError, language: Language) -> StepReply {
    let notice = match err {
        FieldError::NameTooShort => Notice::NameTooShort,
        FieldError::InvalidEmail => Notice::InvalidEmail,
        FieldError::InvalidPhone => Notice::InvalidPhone,
    };
    StepReply::text(with_notice(
        notice,
        language,
        &prompts::step_prompt(step, language),
    ))
}

fn restart_at_service(session: &mut ChatSession, language: Language) -> StepReply {
    session.start_booking();
    StepReply::text(prompts::service_menu(language))
}

fn back_to_date_selection(session: &mut ChatSession, notice: Notice, language: Language) -> String {
    session.flow.offered_slots.clear();
    session.step = Some(BookingStep::DateSelection);
    with_notice(
        notice,
        language,
        &prompts::step_prompt(BookingStep::DateSelection, language),
    )
}

fn offer_slots(
    session: &mut ChatSession,
    date: NaiveDate,
    slots: &[SlotTime],
    language: Language,
) -> String {
    let ordered = menu_order(slots);
    let menu = prompts::slot_menu(date, &ordered, language);
    session.flow.offered_slots = ordered;
    session.step = Some(BookingStep::TimeSelection);
    menu
}

/// A menu number indexes the last offered list; anything else must be a
/// clock time.
fn parse_time_choice(message: &str, offered: &[SlotTime]) -> Option<SlotTime> {
    if let Some(choice) = menu_number(message) {
        return choice
            .checked_sub(1)
            .and_then(|index| offered.get(index))
            .copied();
    }
    message.trim().parse().ok()
}

fn with_notice(notice: Notice, language: Language, rest: &str) -> String {
    format!("{}\n\n{rest}", prompts::notice(notice, language))
}
