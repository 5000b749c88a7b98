//! Free-text date recognition for the booking conversation.
//!
//! Numeric dates are read day-first (European order): `3/10` is the 3rd of
//! October, never March 10th. A missing year is taken from the reference
//! date; rejecting past dates and weekends is the caller's job.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("date expression not recognized")]
pub struct DateNotRecognized;

const MONTH_NAMES: &[(&str, u32)] = &[
    ("gennaio", 1),
    ("january", 1),
    ("gen", 1),
    ("jan", 1),
    ("febbraio", 2),
    ("february", 2),
    ("feb", 2),
    ("marzo", 3),
    ("march", 3),
    ("mar", 3),
    ("aprile", 4),
    ("april", 4),
    ("apr", 4),
    ("maggio", 5),
    ("may", 5),
    ("mag", 5),
    ("giugno", 6),
    ("june", 6),
    ("giu", 6),
    ("jun", 6),
    ("luglio", 7),
    ("july", 7),
    ("lug", 7),
    ("jul", 7),
    ("agosto", 8),
    ("august", 8),
    ("ago", 8),
    ("aug", 8),
    ("settembre", 9),
    ("september", 9),
    ("set", 9),
    ("sep", 9),
    ("sept", 9),
    ("ottobre", 10),
    ("october", 10),
    ("ott", 10),
    ("oct", 10),
    ("novembre", 11),
    ("november", 11),
    ("nov", 11),
    ("dicembre", 12),
    ("december", 12),
    ("dic", 12),
    ("dec", 12),
];

/// Parses `D/M`, `D/M/YYYY` or `D <month name> [YYYY]` (Italian or English
/// month names, full or abbreviated). `-` and `.` are accepted in place of `/`.
pub fn parse_date(text: &str, reference: NaiveDate) -> Result<NaiveDate, DateNotRecognized> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Err(DateNotRecognized);
    }

    parse_numeric(&normalized, reference)
        .or_else(|| parse_month_name(&normalized, reference))
        .ok_or(DateNotRecognized)
}

pub fn month_index(name: &str) -> Option<u32> {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    MONTH_NAMES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, index)| *index)
}

fn parse_numeric(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let parts = text.split(['/', '-', '.']).collect::<Vec<_>>();

    match parts.as_slice() {
        [day, month] => {
            let day = parse_component(day, 2)?;
            let month = parse_component(month, 2)?;
            NaiveDate::from_ymd_opt(reference.year(), month, day)
        }
        [day, month, year] => {
            let day = parse_component(day, 2)?;
            let month = parse_component(month, 2)?;
            if year.len() != 4 {
                return None;
            }
            let year = i32::try_from(parse_component(year, 4)?).ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
        _ => None,
    }
}

fn parse_month_name(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let tokens = text.split_whitespace().collect::<Vec<_>>();

    let (day, month, year) = match tokens.as_slice() {
        [day, month] => (*day, *month, None),
        [day, month, year] => (*day, *month, Some(*year)),
        _ => return None,
    };

    let day = parse_component(day, 2)?;
    let month = month_index(month)?;
    let year = match year {
        Some(raw) if raw.len() == 4 => i32::try_from(parse_component(raw, 4)?).ok()?,
        Some(_) => return None,
        None => reference.year(),
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_component(raw: &str, max_len: usize) -> Option<u32> {
    if raw.is_empty() || raw.len() > max_len || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>().ok()
}

fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '!', '?'])
        .to_lowercase()
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
