use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

pub fn normalize_time_zone(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    trimmed.parse::<Tz>().ok().map(|tz| tz.name().to_string())
}

pub fn parse_time_zone_or_default(value: &str) -> Tz {
    normalize_time_zone(value)
        .and_then(|normalized| normalized.parse::<Tz>().ok())
        .unwrap_or(chrono_tz::Europe::Rome)
}

/// Calendar date at the business location, used as "today" for past-date
/// checks and as the parser's reference year.
pub fn business_local_date(now_utc: DateTime<Utc>, time_zone: &str) -> NaiveDate {
    let tz = parse_time_zone_or_default(time_zone);
    now_utc.with_timezone(&tz).date_naive()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{business_local_date, normalize_time_zone};
    use crate::config::DEFAULT_BUSINESS_TIME_ZONE;

    #[test]
    fn normalize_time_zone_accepts_valid_iana_name() {
        assert_eq!(
            normalize_time_zone("Europe/Rome"),
            Some("Europe/Rome".to_string())
        );
    }

    #[test]
    fn normalize_time_zone_rejects_invalid_values() {
        assert_eq!(normalize_time_zone(""), None);
        assert_eq!(normalize_time_zone("Mars/Olympus"), None);
    }

    #[test]
    fn business_local_date_rolls_over_before_utc_midnight() {
        let now = Utc
            .with_ymd_and_hms(2025, 3, 9, 23, 30, 0)
            .single()
            .expect("valid utc datetime");
        let local_date = business_local_date(now, "Europe/Rome");
        assert_eq!(local_date.to_string(), "2025-03-10");
    }

    #[test]
    fn business_local_date_uses_default_when_time_zone_is_invalid() {
        let now = Utc
            .with_ymd_and_hms(2025, 3, 9, 23, 30, 0)
            .single()
            .expect("valid utc datetime");
        assert_eq!(
            business_local_date(now, "not-a-time-zone"),
            business_local_date(now, DEFAULT_BUSINESS_TIME_ZONE)
        );
    }
}
