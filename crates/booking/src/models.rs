use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::slots::SlotTime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    It,
    En,
}

impl Language {
    /// Unknown or missing language tags fall back to Italian.
    pub fn from_tag(tag: Option<&str>) -> Self {
        let Some(tag) = tag else {
            return Self::default();
        };

        let normalized = tag.trim().to_ascii_lowercase();
        if normalized == "en" || normalized.starts_with("en-") {
            Self::En
        } else {
            Self::It
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::It => "it",
            Self::En => "en",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    AiAutomation,
    Chatbot,
    WebDevelopment,
    AiMarketing,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        Self::AiAutomation,
        Self::Chatbot,
        Self::WebDevelopment,
        Self::AiMarketing,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::AiAutomation => "ai-automation",
            Self::Chatbot => "chatbot",
            Self::WebDevelopment => "web-development",
            Self::AiMarketing => "ai-marketing",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|service| service.slug() == value)
    }

    pub fn label(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::AiAutomation, Language::It) => "Automazione AI",
            (Self::AiAutomation, Language::En) => "AI Automation",
            (Self::Chatbot, _) => "Chatbot",
            (Self::WebDevelopment, Language::It) => "Sviluppo Web",
            (Self::WebDevelopment, Language::En) => "Web Development",
            (Self::AiMarketing, Language::It) => "Marketing AI",
            (Self::AiMarketing, Language::En) => "AI Marketing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Statuses that keep a slot occupied.
    pub fn holds_slot(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub service: ServiceKind,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: Option<String>,
    pub status: AppointmentStatus,
    pub priority: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub service: ServiceKind,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: Option<String>,
    pub status: AppointmentStatus,
    pub priority: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub booking_flow: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_complete: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::{ChatResponse, Language, ServiceKind};

    #[test]
    fn language_tag_defaults_to_italian() {
        assert_eq!(Language::from_tag(None), Language::It);
        assert_eq!(Language::from_tag(Some("de")), Language::It);
        assert_eq!(Language::from_tag(Some(" EN-gb ")), Language::En);
    }

    #[test]
    fn service_slugs_round_trip_through_lookup() {
        for service in ServiceKind::ALL {
            assert_eq!(ServiceKind::from_slug(service.slug()), Some(service));
        }
        assert_eq!(ServiceKind::from_slug("plumbing"), None);
    }

    #[test]
    fn chat_response_serializes_camel_case_and_omits_empty_flags() {
        let response = ChatResponse {
            response: "ciao".to_string(),
            session_id: "abc".to_string(),
            booking_flow: false,
            step: None,
            booking_complete: None,
        };

        let value = serde_json::to_value(&response).expect("response should serialize");
        assert_eq!(value["sessionId"], "abc");
        assert_eq!(value["bookingFlow"], false);
        assert!(value.get("step").is_none());
        assert!(value.get("bookingComplete").is_none());
    }
}
