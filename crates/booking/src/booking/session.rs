use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ServiceKind;

use super::slots::SlotTime;

const MAX_CLIENT_ID_LEN: usize = 128;

/// Position of a conversation inside the booking flow. `None` on the session
/// means the step machine does not own the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    ServiceSelection,
    DateSelection,
    TimeSelection,
    NameInput,
    EmailInput,
    PhoneInput,
    MessageInput,
    Confirmation,
    Modify,
}

impl BookingStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServiceSelection => "service_selection",
            Self::DateSelection => "date_selection",
            Self::TimeSelection => "time_selection",
            Self::NameInput => "name_input",
            Self::EmailInput => "email_input",
            Self::PhoneInput => "phone_input",
            Self::MessageInput => "message_input",
            Self::Confirmation => "confirmation",
            Self::Modify => "modify",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "service_selection" => Some(Self::ServiceSelection),
            "date_selection" => Some(Self::DateSelection),
            "time_selection" => Some(Self::TimeSelection),
            "name_input" => Some(Self::NameInput),
            "email_input" => Some(Self::EmailInput),
            "phone_input" => Some(Self::PhoneInput),
            "message_input" => Some(Self::MessageInput),
            "confirmation" => Some(Self::Confirmation),
            "modify" => Some(Self::Modify),
            _ => None,
        }
    }

    /// Step that follows this one on the linear path.
    pub fn next(self) -> Self {
        match self {
            Self::ServiceSelection => Self::DateSelection,
            Self::DateSelection => Self::TimeSelection,
            Self::TimeSelection => Self::NameInput,
            Self::NameInput => Self::EmailInput,
            Self::EmailInput => Self::PhoneInput,
            Self::PhoneInput => Self::MessageInput,
            Self::MessageInput | Self::Confirmation | Self::Modify => Self::Confirmation,
        }
    }
}

/// Booking fields collected so far, filled strictly in step order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<SlotTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Every mandatory field of a booking, available once the data is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteBooking<'a> {
    pub service: ServiceKind,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub message: Option<&'a str>,
}

impl BookingData {
    pub fn complete(&self) -> Option<CompleteBooking<'_>> {
        fn non_empty(value: &Option<String>) -> Option<&str> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
        }

        Some(CompleteBooking {
            service: self.service?,
            date: self.date?,
            time: self.time?,
            name: non_empty(&self.name)?,
            email: non_empty(&self.email)?,
            phone: non_empty(&self.phone)?,
            message: non_empty(&self.message),
        })
    }
}

/// Bookkeeping the step machine needs between turns that is not part of the
/// booking itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowContext {
    /// Slot list last shown to the user; numeric answers index into it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offered_slots: Vec<SlotTime>,
    /// Set while a single field is being re-entered from the confirmation
    /// step; the flow returns to confirmation once the field is accepted.
    #[serde(default)]
    pub modifying: bool,
    /// External reservation obtained by a commit whose local insert failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub session_id: String,
    pub booking_mode: bool,
    pub step: Option<BookingStep>,
    pub booking_data: BookingData,
    pub flow: FlowContext,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            booking_mode: false,
            step: None,
            booking_data: BookingData::default(),
            flow: FlowContext::default(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn start_booking(&mut self) {
        self.booking_mode = true;
        self.step = Some(BookingStep::ServiceSelection);
        self.booking_data = BookingData::default();
        self.flow = FlowContext::default();
    }

    /// Leaves booking mode and drops everything collected so far.
    pub fn clear(&mut self) {
        self.booking_mode = false;
        self.step = None;
        self.booking_data = BookingData::default();
        self.flow = FlowContext::default();
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl_seconds: u64) -> bool {
        let Ok(ttl_seconds) = i64::try_from(ttl_seconds) else {
            return false;
        };
        chrono::Duration::try_seconds(ttl_seconds)
            .and_then(|ttl| self.last_activity.checked_add_signed(ttl))
            .is_some_and(|expires_at| expires_at <= now)
    }
}

/// Returns the client-supplied id when it is usable, otherwise a fresh one.
pub fn resolve_session_id(requested: Option<&str>) -> String {
    requested
        .and_then(normalize_client_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Trims a client-chosen identifier and accepts it only when it is 1-128
/// characters of `[A-Za-z0-9-_.]`. Also used for `x-request-id`.
pub fn normalize_client_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_CLIENT_ID_LEN {
        return None;
    }

    let valid = trimmed
        .bytes()
        .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.'));
    valid.then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::{BookingData, BookingStep, ChatSession, normalize_client_id, resolve_session_id};
    use crate::models::ServiceKind;

    #[test]
    fn steps_round_trip_through_db_names() {
        let steps = [
            BookingStep::ServiceSelection,
            BookingStep::DateSelection,
            BookingStep::TimeSelection,
            BookingStep::NameInput,
            BookingStep::EmailInput,
            BookingStep::PhoneInput,
            BookingStep::MessageInput,
            BookingStep::Confirmation,
            BookingStep::Modify,
        ];
        for step in steps {
            assert_eq!(BookingStep::from_db(step.as_str()), Some(step));
        }
        assert_eq!(BookingStep::from_db("idle"), None);
    }

    #[test]
    fn linear_path_ends_at_confirmation() {
        let mut step = BookingStep::ServiceSelection;
        let mut visited = vec![step];
        while step != BookingStep::Confirmation {
            step = step.next();
            visited.push(step);
        }
        assert_eq!(visited.len(), 8);
    }

    #[test]
    fn completeness_requires_every_mandatory_field() {
        let mut data = BookingData {
            service: Some(ServiceKind::Chatbot),
            date: NaiveDate::from_ymd_opt(2025, 3, 10),
            time: "10:00".parse().ok(),
            name: Some("Mario Rossi".to_string()),
            email: Some("mario@example.it".to_string()),
            phone: Some("   ".to_string()),
            message: None,
        };
        assert!(data.complete().is_none());

        data.phone = Some("+39 333 1234567".to_string());
        let complete = data.complete().expect("booking should be complete");
        assert_eq!(complete.message, None);

        data.name = Some("  Mario Rossi ".to_string());
        data.message = Some(" Sito nuovo ".to_string());
        let complete = data.complete().expect("booking should be complete");
        assert_eq!(complete.name, "Mario Rossi");
        assert_eq!(complete.message, Some("Sito nuovo"));
    }

    #[test]
    fn booking_data_json_uses_iso_date_and_slot_time() {
        let data = BookingData {
            service: Some(ServiceKind::WebDevelopment),
            date: NaiveDate::from_ymd_opt(2025, 3, 10),
            time: "09:30".parse().ok(),
            ..BookingData::default()
        };
        let value = serde_json::to_value(&data).expect("data should serialize");
        assert_eq!(value["service"], "web-development");
        assert_eq!(value["date"], "2025-03-10");
        assert_eq!(value["time"], "09:30");
        assert!(value.get("name").is_none());
    }

    #[test]
    fn clear_leaves_booking_mode() {
        let now = Utc::now();
        let mut session = ChatSession::new("s-1", now);
        session.start_booking();
        session.booking_data.name = Some("Anna".to_string());
        session.clear();

        assert!(!session.booking_mode);
        assert_eq!(session.step, None);
        assert_eq!(session.booking_data, BookingData::default());
    }

    #[test]
    fn expiry_is_measured_from_last_activity() {
        let start = Utc
            .with_ymd_and_hms(2025, 3, 10, 9, 0, 0)
            .single()
            .expect("valid datetime");
        let session = ChatSession::new("s-1", start);
        assert!(!session.is_expired(start + Duration::seconds(3599), 3600));
        assert!(session.is_expired(start + Duration::seconds(3600), 3600));
    }

    #[test]
    fn session_ids_are_kept_when_safe_and_generated_otherwise() {
        assert_eq!(resolve_session_id(Some(" web-abc_1.2 ")), "web-abc_1.2");
        assert_ne!(resolve_session_id(Some("bad id!")), "bad id!");
        assert_eq!(resolve_session_id(None).len(), 36);
        assert_eq!(resolve_session_id(Some(&"x".repeat(129))).len(), 36);
    }

    #[test]
    fn client_ids_reject_blank_and_unsafe_values() {
        assert_eq!(normalize_client_id(" chat-42._x "), Some("chat-42._x".to_string()));
        assert!(normalize_client_id("   ").is_none());
        assert!(normalize_client_id("id with spaces").is_none());
    }
}
