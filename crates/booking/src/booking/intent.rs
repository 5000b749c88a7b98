//! Keyword matching for free-text chat turns. Matching is done on a folded
//! form of the input: lowercase, Italian accents stripped, punctuation turned
//! into word breaks.

use crate::models::ServiceKind;

use super::session::BookingStep;

const BOOKING_STEMS: &[&str] = &["prenot", "appuntament", "consulenz"];
const BOOKING_WORDS: &[&str] = &[
    "fissare",
    "book",
    "booking",
    "appointment",
    "appointments",
    "schedule",
    "meeting",
    "call",
    "consultation",
];

const CANCEL_WORDS: &[&str] = &["annulla", "annullare", "cancella", "cancel", "stop", "esci", "exit"];
const CONFIRM_WORDS: &[&str] = &[
    "si", "yes", "y", "ok", "okay", "conferma", "confermo", "confirm", "va", "bene",
];
const DECLINE_WORDS: &[&str] = &["no", "annulla", "annullare", "cancella", "cancel"];
const MODIFY_WORDS: &[&str] = &["modifica", "modificare", "cambia", "cambiare", "modify", "change", "edit"];
const SKIP_PHRASES: &[&str] = &[
    "skip",
    "salta",
    "nessuno",
    "nessun messaggio",
    "niente",
    "no",
    "none",
    "no message",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationReply {
    Confirm,
    Decline,
    Modify,
}

pub fn detect_booking_intent(text: &str) -> bool {
    words(text).iter().any(|word| {
        BOOKING_WORDS.contains(&word.as_str())
            || BOOKING_STEMS.iter().any(|stem| word.starts_with(stem))
    })
}

/// Global abort: only a message made entirely of cancel keywords counts, so
/// "stop" cancels while "the bus stop is near" does not.
pub fn is_cancel_command(text: &str) -> bool {
    all_words_in(text, CANCEL_WORDS)
}

pub fn match_confirmation(text: &str) -> Option<ConfirmationReply> {
    if all_words_in(text, CONFIRM_WORDS) {
        Some(ConfirmationReply::Confirm)
    } else if all_words_in(text, DECLINE_WORDS) {
        Some(ConfirmationReply::Decline)
    } else if words(text)
        .first()
        .is_some_and(|word| MODIFY_WORDS.contains(&word.as_str()))
    {
        Some(ConfirmationReply::Modify)
    } else {
        None
    }
}

pub fn is_skip(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed == "-" {
        return true;
    }
    let folded = words(trimmed).join(" ");
    SKIP_PHRASES.contains(&folded.as_str())
}

/// Menu number 1-4 or a recognizable fragment of the service name.
pub fn match_service(text: &str) -> Option<ServiceKind> {
    if let Some(choice) = menu_number(text) {
        return choice
            .checked_sub(1)
            .and_then(|index| ServiceKind::ALL.get(index))
            .copied();
    }

    let words = words(text);
    if has_word(&words, |word| word.starts_with("automa")) {
        Some(ServiceKind::AiAutomation)
    } else if has_word(&words, |word| {
        matches!(word, "chatbot" | "chatbots" | "bot" | "assistente" | "assistant")
    }) {
        Some(ServiceKind::Chatbot)
    } else if has_word(&words, |word| {
        matches!(word, "web" | "sito" | "siti" | "website" | "sviluppo" | "development")
    }) {
        Some(ServiceKind::WebDevelopment)
    } else if has_word(&words, |word| word == "marketing") {
        Some(ServiceKind::AiMarketing)
    } else {
        None
    }
}

/// Field picked from the modify menu, by number 1-7 or by name.
pub fn match_modify_target(text: &str) -> Option<BookingStep> {
    const TARGETS: [BookingStep; 7] = [
        BookingStep::ServiceSelection,
        BookingStep::DateSelection,
        BookingStep::TimeSelection,
        BookingStep::NameInput,
        BookingStep::EmailInput,
        BookingStep::PhoneInput,
        BookingStep::MessageInput,
    ];

    if let Some(choice) = menu_number(text) {
        return choice
            .checked_sub(1)
            .and_then(|index| TARGETS.get(index))
            .copied();
    }

    words(text).iter().find_map(|word| match word.as_str() {
        "servizio" | "service" => Some(BookingStep::ServiceSelection),
        "data" | "date" | "giorno" | "day" => Some(BookingStep::DateSelection),
        "orario" | "ora" | "time" | "hour" => Some(BookingStep::TimeSelection),
        "nome" | "name" => Some(BookingStep::NameInput),
        "email" | "mail" => Some(BookingStep::EmailInput),
        "telefono" | "phone" | "cellulare" => Some(BookingStep::PhoneInput),
        "messaggio" | "message" | "note" | "notes" => Some(BookingStep::MessageInput),
        _ => None,
    })
}

/// A bare menu number such as "2", "2." or "2)".
pub fn menu_number(text: &str) -> Option<usize> {
    let trimmed = text.trim().trim_end_matches(['.', ')']);
    if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

fn has_word(words: &[String], predicate: impl Fn(&str) -> bool) -> bool {
    words.iter().any(|word| predicate(word))
}

fn all_words_in(text: &str, vocabulary: &[&str]) -> bool {
    let words = words(text);
    !words.is_empty() && words.iter().all(|word| vocabulary.contains(&word.as_str()))
}

fn words(text: &str) -> Vec<String> {
    fold(text)
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'á' => 'a',
            'è' | 'é' => 'e',
            'ì' | 'í' => 'i',
            'ò' | 'ó' => 'o',
            'ù' | 'ú' => 'u',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        ConfirmationReply, detect_booking_intent, is_cancel_command, is_skip, match_confirmation,
        match_modify_target, match_service,
    };
    use crate::booking::session::BookingStep;
    use crate::models::ServiceKind;

    #[test]
    fn booking_intent_matches_keywords_in_both_languages() {
        assert!(detect_booking_intent("Vorrei prenotare una consulenza"));
        assert!(detect_booking_intent("Posso fissare un appuntamento?"));
        assert!(detect_booking_intent("I'd like to book a call"));
        assert!(detect_booking_intent("Can we schedule a meeting?"));
        assert!(!detect_booking_intent("Quanto costa un sito?"));
        assert!(!detect_booking_intent("I saw you on facebook"));
    }

    #[test]
    fn services_match_by_number_or_fragment() {
        assert_eq!(match_service("1"), Some(ServiceKind::AiAutomation));
        assert_eq!(match_service("4."), Some(ServiceKind::AiMarketing));
        assert_eq!(match_service("5"), None);
        assert_eq!(match_service("0"), None);
        assert_eq!(match_service("automazione"), Some(ServiceKind::AiAutomation));
        assert_eq!(match_service("Un chatbot"), Some(ServiceKind::Chatbot));
        assert_eq!(match_service("sviluppo web"), Some(ServiceKind::WebDevelopment));
        assert_eq!(match_service("AI marketing"), Some(ServiceKind::AiMarketing));
        assert_eq!(match_service("idraulica"), None);
    }

    #[test]
    fn confirmation_answers_are_classified() {
        assert_eq!(match_confirmation("Sì"), Some(ConfirmationReply::Confirm));
        assert_eq!(match_confirmation("si, confermo!"), Some(ConfirmationReply::Confirm));
        assert_eq!(match_confirmation("yes"), Some(ConfirmationReply::Confirm));
        assert_eq!(match_confirmation("no"), Some(ConfirmationReply::Decline));
        assert_eq!(match_confirmation("modifica"), Some(ConfirmationReply::Modify));
        assert_eq!(match_confirmation("change the date"), Some(ConfirmationReply::Modify));
        assert_eq!(match_confirmation("forse"), None);
    }

    #[test]
    fn cancel_requires_a_bare_keyword() {
        assert!(is_cancel_command("annulla"));
        assert!(is_cancel_command(" STOP "));
        assert!(is_cancel_command("cancel!"));
        assert!(!is_cancel_command("no"));
        assert!(!is_cancel_command("the bus stop is near"));
    }

    #[test]
    fn skip_phrases_are_recognized() {
        for phrase in ["skip", "Salta", "nessuno", "no", "none", "-"] {
            assert!(is_skip(phrase), "expected skip for {phrase}");
        }
        assert!(!is_skip("vorrei un preventivo"));
    }

    #[test]
    fn modify_targets_match_by_number_or_name() {
        assert_eq!(match_modify_target("2"), Some(BookingStep::DateSelection));
        assert_eq!(match_modify_target("7"), Some(BookingStep::MessageInput));
        assert_eq!(match_modify_target("8"), None);
        assert_eq!(match_modify_target("l'orario"), Some(BookingStep::TimeSelection));
        assert_eq!(match_modify_target("email"), Some(BookingStep::EmailInput));
        assert_eq!(match_modify_target("phone number"), Some(BookingStep::PhoneInput));
    }
}
