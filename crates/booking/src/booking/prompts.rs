//! User-facing text for every step and notice, in Italian and English.
//! Each table is an exhaustive match so a new step or notice cannot ship
//! without both translations.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::models::{Appointment, Language, ServiceKind};

use super::session::{BookingData, BookingStep};
use super::slots::SlotTime;

/// One-off messages that accompany or replace a step prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    BookingStarted,
    UnknownService,
    DateNotRecognized,
    DateInPast,
    WeekendDate,
    NoSlotsOnDate,
    NoSlotsLeft,
    TimeNotRecognized,
    SlotUnavailable,
    NameTooShort,
    InvalidEmail,
    InvalidPhone,
    ConfirmationExpected,
    UnknownModifyChoice,
    SlotJustTaken,
    Cancelled,
    CommitFailed,
    BookingIncomplete,
    Fallback,
}

pub fn notice(notice: Notice, language: Language) -> &'static str {
    use Language::{En, It};

    match (notice, language) {
        (Notice::BookingStarted, It) => "Perfetto, fissiamo una consulenza gratuita con il nostro team.",
        (Notice::BookingStarted, En) => "Great, let's book a free consultation with our team.",
        (Notice::UnknownService, It) => "Non ho riconosciuto il servizio.",
        (Notice::UnknownService, En) => "I didn't recognize that service.",
        (Notice::DateNotRecognized, It) => {
            "Non ho capito la data. Prova con un formato come 15/3, 15/3/2025 o 15 marzo."
        }
        (Notice::DateNotRecognized, En) => {
            "I couldn't read that date. Try a format like 15/3, 15/3/2025 or 15 March."
        }
        (Notice::DateInPast, It) => "Questa data è già passata. Scegli un giorno da oggi in poi.",
        (Notice::DateInPast, En) => "That date is in the past. Please pick today or a later day.",
        (Notice::WeekendDate, It) => {
            "Nel fine settimana non fissiamo appuntamenti. Scegli un giorno dal lunedì al venerdì."
        }
        (Notice::WeekendDate, En) => {
            "We don't book appointments at weekends. Please pick a day from Monday to Friday."
        }
        (Notice::NoSlotsOnDate, It) => {
            "Purtroppo non ci sono orari liberi in quella data. Prova con un altro giorno."
        }
        (Notice::NoSlotsOnDate, En) => {
            "Sorry, there are no free times on that date. Please try another day."
        }
        (Notice::NoSlotsLeft, It) => {
            "Nel frattempo gli orari di quella data sono stati tutti prenotati. Scegli un altro giorno."
        }
        (Notice::NoSlotsLeft, En) => {
            "Every time on that date has been booked in the meantime. Please choose another day."
        }
        (Notice::TimeNotRecognized, It) => {
            "Non ho riconosciuto l'orario. Indica il numero dell'elenco o l'ora (es. 10:30)."
        }
        (Notice::TimeNotRecognized, En) => {
            "I didn't recognize that time. Reply with the list number or the time (e.g. 10:30)."
        }
        (Notice::SlotUnavailable, It) => "Questo orario non è disponibile.",
        (Notice::SlotUnavailable, En) => "That time is not available.",
        (Notice::NameTooShort, It) => "Il nome deve avere almeno 3 caratteri.",
        (Notice::NameTooShort, En) => "The name must be at least 3 characters long.",
        (Notice::InvalidEmail, It) => "L'indirizzo email non sembra valido (es. nome@dominio.it).",
        (Notice::InvalidEmail, En) => "That email address doesn't look valid (e.g. name@domain.com).",
        (Notice::InvalidPhone, It) => {
            "Il numero di telefono non sembra valido. Usa solo cifre, +, -, spazi o parentesi."
        }
        (Notice::InvalidPhone, En) => {
            "That phone number doesn't look valid. Use digits, +, -, spaces or parentheses only."
        }
        (Notice::ConfirmationExpected, It) => "Non ho capito la risposta.",
        (Notice::ConfirmationExpected, En) => "I didn't understand that answer.",
        (Notice::UnknownModifyChoice, It) => "Non ho capito quale dato vuoi modificare.",
        (Notice::UnknownModifyChoice, En) => "I didn't catch which detail you want to change.",
        (Notice::SlotJustTaken, It) => {
            "Mi dispiace, l'orario scelto è stato appena prenotato da un altro cliente."
        }
        (Notice::SlotJustTaken, En) => "Sorry, that time has just been booked by someone else.",
        (Notice::Cancelled, It) => {
            "Prenotazione annullata. Se ti serve altro, scrivimi pure quando vuoi."
        }
        (Notice::Cancelled, En) => "Booking cancelled. Feel free to write again whenever you need.",
        (Notice::CommitFailed, It) => {
            "Si è verificato un problema durante la registrazione della prenotazione. Riprova tra qualche istante rispondendo \"conferma\"."
        }
        (Notice::CommitFailed, En) => {
            "Something went wrong while saving your booking. Please try again in a moment by replying \"confirm\"."
        }
        (Notice::BookingIncomplete, It) => "Manca ancora un dato per completare la prenotazione.",
        (Notice::BookingIncomplete, En) => "One detail is still missing to complete the booking.",
        (Notice::Fallback, It) => {
            "Ciao! Posso aiutarti a prenotare una consulenza gratuita sui nostri servizi: automazione AI, chatbot, sviluppo web e marketing AI. Scrivi \"prenota\" per iniziare."
        }
        (Notice::Fallback, En) => {
            "Hi! I can help you book a free consultation about our services: AI automation, chatbots, web development and AI marketing. Type \"book\" to get started."
        }
    }
}

/// Prompt asking for the input of `step`. Time selection and confirmation
/// have richer renderings in [`slot_menu`] and [`summary`]; this is their
/// short instruction line.
pub fn step_prompt(step: BookingStep, language: Language) -> String {
    use Language::{En, It};

    match (step, language) {
        (BookingStep::ServiceSelection, _) => service_menu(language),
        (BookingStep::DateSelection, It) => {
            "Per quale giorno vuoi fissare l'appuntamento? Scrivi la data come 15/3, 15/3/2025 o 15 marzo (dal lunedì al venerdì).".to_string()
        }
        (BookingStep::DateSelection, En) => {
            "Which day would you like? Write the date as 15/3, 15/3/2025 or 15 March (Monday to Friday).".to_string()
        }
        (BookingStep::TimeSelection, It) => {
            "Scegli un orario indicando il numero o l'ora (es. 10:30).".to_string()
        }
        (BookingStep::TimeSelection, En) => {
            "Pick a time by replying with its number or the time itself (e.g. 10:30).".to_string()
        }
        (BookingStep::NameInput, It) => "Come ti chiami? Scrivi nome e cognome.".to_string(),
        (BookingStep::NameInput, En) => "What's your full name?".to_string(),
        (BookingStep::EmailInput, It) => "Qual è il tuo indirizzo email?".to_string(),
        (BookingStep::EmailInput, En) => "What's your email address?".to_string(),
        (BookingStep::PhoneInput, It) => "Qual è il tuo numero di telefono?".to_string(),
        (BookingStep::PhoneInput, En) => "What's your phone number?".to_string(),
        (BookingStep::MessageInput, It) => {
            "Vuoi aggiungere un messaggio o qualche dettaglio sul progetto? Scrivi \"salta\" per proseguire senza.".to_string()
        }
        (BookingStep::MessageInput, En) => {
            "Would you like to add a message or some details about your project? Type \"skip\" to continue without one.".to_string()
        }
        (BookingStep::Confirmation, It) => {
            "Rispondi \"sì\" per confermare, \"modifica\" per cambiare un dato o \"no\" per annullare.".to_string()
        }
        (BookingStep::Confirmation, En) => {
            "Reply \"yes\" to confirm, \"change\" to edit a detail or \"no\" to cancel.".to_string()
        }
        (BookingStep::Modify, _) => modify_menu(language),
    }
}

pub fn service_menu(language: Language) -> String {
    let heading = match language {
        Language::It => "Quale servizio ti interessa?",
        Language::En => "Which service are you interested in?",
    };
    let footer = match language {
        Language::It => "Rispondi con il numero o il nome del servizio.",
        Language::En => "Reply with the number or the name of the service.",
    };

    let mut text = heading.to_string();
    for (index, service) in ServiceKind::ALL.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", index + 1, service.label(language)));
    }
    text.push('\n');
    text.push_str(footer);
    text
}

pub fn modify_menu(language: Language) -> String {
    let (heading, fields) = match language {
        Language::It => (
            "Quale dato vuoi modificare?",
            ["Servizio", "Data", "Orario", "Nome", "Email", "Telefono", "Messaggio"],
        ),
        Language::En => (
            "Which detail would you like to change?",
            ["Service", "Date", "Time", "Name", "Email", "Phone", "Message"],
        ),
    };

    let mut text = heading.to_string();
    for (index, field) in fields.iter().enumerate() {
        text.push_str(&format!("\n{}. {field}", index + 1));
    }
    text
}

/// Slot list for `date` with morning and afternoon groups. `slots` must
/// already be in menu order; numbering runs across both groups.
pub fn slot_menu(date: NaiveDate, slots: &[SlotTime], language: Language) -> String {
    let (heading, morning, afternoon) = match language {
        Language::It => ("Ecco gli orari disponibili per", "Mattina", "Pomeriggio"),
        Language::En => ("Here are the available times for", "Morning", "Afternoon"),
    };

    let mut text = format!("{heading} {}:", format_date(date, language));
    let mut current_group = None;
    for (index, slot) in slots.iter().enumerate() {
        let group = if slot.is_morning() { morning } else { afternoon };
        if current_group != Some(group) {
            text.push_str(&format!("\n{group}:"));
            current_group = Some(group);
        }
        text.push_str(&format!("\n{}. {slot}", index + 1));
    }
    text.push('\n');
    text.push_str(&step_prompt(BookingStep::TimeSelection, language));
    text
}

/// Booking recap shown at the confirmation step.
pub fn summary(data: &BookingData, language: Language) -> String {
    let heading = match language {
        Language::It => "Ecco il riepilogo della prenotazione:",
        Language::En => "Here is a summary of your booking:",
    };

    let mut text = heading.to_string();
    text.push_str(&detail_lines(
        data.service,
        data.date,
        data.time,
        [data.name.as_deref(), data.email.as_deref(), data.phone.as_deref()],
        data.message.as_deref(),
        language,
    ));
    text.push_str("\n\n");
    text.push_str(&step_prompt(BookingStep::Confirmation, language));
    text
}

pub fn booking_confirmed(appointment: &Appointment, language: Language) -> String {
    let (heading, footer) = match language {
        Language::It => (
            "Prenotazione confermata! Ecco i dettagli:",
            "Ti contatteremo all'indirizzo email indicato. A presto!",
        ),
        Language::En => (
            "Your booking is confirmed! Here are the details:",
            "We'll be in touch at the email address you gave us. Talk soon!",
        ),
    };

    let mut text = heading.to_string();
    text.push_str(&detail_lines(
        Some(appointment.service),
        Some(appointment.date),
        Some(appointment.time),
        [
            Some(appointment.name.as_str()),
            Some(appointment.email.as_str()),
            Some(appointment.phone.as_str()),
        ],
        appointment.message.as_deref(),
        language,
    ));
    text.push_str("\n\n");
    text.push_str(footer);
    text
}

fn detail_lines(
    service: Option<ServiceKind>,
    date: Option<NaiveDate>,
    time: Option<SlotTime>,
    [name, email, phone]: [Option<&str>; 3],
    message: Option<&str>,
    language: Language,
) -> String {
    let labels = match language {
        Language::It => ["Servizio", "Data", "Orario", "Nome", "Email", "Telefono", "Messaggio"],
        Language::En => ["Service", "Date", "Time", "Name", "Email", "Phone", "Message"],
    };
    let missing = "-";
    let no_message = match language {
        Language::It => "nessuno",
        Language::En => "none",
    };

    let values = [
        service.map(|service| service.label(language).to_string()),
        date.map(|date| format_date(date, language)),
        time.map(|time| time.to_string()),
        name.map(str::to_string),
        email.map(str::to_string),
        phone.map(str::to_string),
        Some(message.unwrap_or(no_message).to_string()),
    ];

    labels
        .iter()
        .zip(values)
        .map(|(label, value)| format!("\n- {label}: {}", value.as_deref().unwrap_or(missing)))
        .collect()
}

/// Long-form date, e.g. "lunedì 10 marzo 2025" or "Monday 10 March 2025".
pub fn format_date(date: NaiveDate, language: Language) -> String {
    format!(
        "{} {} {} {}",
        weekday_name(date.weekday(), language),
        date.day(),
        month_name(date.month(), language),
        date.year()
    )
}

fn weekday_name(weekday: Weekday, language: Language) -> &'static str {
    match (weekday, language) {
        (Weekday::Mon, Language::It) => "lunedì",
        (Weekday::Tue, Language::It) => "martedì",
        (Weekday::Wed, Language::It) => "mercoledì",
        (Weekday::Thu, Language::It) => "giovedì",
        (Weekday::Fri, Language::It) => "venerdì",
        (Weekday::Sat, Language::It) => "sabato",
        (Weekday::Sun, Language::It) => "domenica",
        (Weekday::Mon, Language::En) => "Monday",
        (Weekday::Tue, Language::En) => "Tuesday",
        (Weekday::Wed, Language::En) => "Wednesday",
        (Weekday::Thu, Language::En) => "Thursday",
        (Weekday::Fri, Language::En) => "Friday",
        (Weekday::Sat, Language::En) => "Saturday",
        (Weekday::Sun, Language::En) => "Sunday",
    }
}

fn month_name(month: u32, language: Language) -> &'static str {
    const IT: [&str; 12] = [
        "gennaio", "febbraio", "marzo", "aprile", "maggio", "giugno", "luglio", "agosto",
        "settembre", "ottobre", "novembre", "dicembre",
    ];
    const EN: [&str; 12] = [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ];

    let names = match language {
        Language::It => &IT,
        Language::En => &EN,
    };
    month
        .checked_sub(1)
        .and_then(|index| names.get(index as usize))
        .copied()
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{format_date, service_menu, slot_menu, summary};
    use crate::booking::session::BookingData;
    use crate::booking::slots::SlotTime;
    use crate::models::{Language, ServiceKind};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date")
    }

    #[test]
    fn dates_render_in_both_languages() {
        assert_eq!(format_date(date(), Language::It), "lunedì 10 marzo 2025");
        assert_eq!(format_date(date(), Language::En), "Monday 10 March 2025");
    }

    #[test]
    fn service_menu_lists_all_services_in_order() {
        let menu = service_menu(Language::En);
        assert!(menu.contains("1. AI Automation"));
        assert!(menu.contains("2. Chatbot"));
        assert!(menu.contains("3. Web Development"));
        assert!(menu.contains("4. AI Marketing"));
    }

    #[test]
    fn slot_menu_numbers_continuously_across_groups() {
        let slots = [SlotTime::at(11, 30), SlotTime::at(12, 0), SlotTime::at(14, 0)];
        let menu = slot_menu(date(), &slots, Language::It);

        assert!(menu.contains("Mattina:\n1. 11:30\n2. 12:00\nPomeriggio:\n3. 14:00"));
    }

    #[test]
    fn slot_menu_omits_empty_groups() {
        let menu = slot_menu(date(), &[SlotTime::at(16, 30)], Language::En);
        assert!(!menu.contains("Morning"));
        assert!(menu.contains("Afternoon:\n1. 16:30"));
    }

    #[test]
    fn summary_shows_placeholder_for_missing_message() {
        let data = BookingData {
            service: Some(ServiceKind::Chatbot),
            date: Some(date()),
            time: Some(SlotTime::at(10, 0)),
            name: Some("Mario Rossi".to_string()),
            email: Some("mario@example.it".to_string()),
            phone: Some("3331234567".to_string()),
            message: None,
        };

        let text = summary(&data, Language::It);
        assert!(text.contains("- Servizio: Chatbot"));
        assert!(text.contains("- Data: lunedì 10 marzo 2025"));
        assert!(text.contains("- Orario: 10:00"));
        assert!(text.contains("- Messaggio: nessuno"));
    }
}
