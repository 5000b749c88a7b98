use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const SLOT_STEP_MINUTES: u16 = 30;
const MORNING_START: SlotTime = SlotTime::at(9, 0);
const MORNING_END: SlotTime = SlotTime::at(12, 0);
const AFTERNOON_START: SlotTime = SlotTime::at(14, 0);
const AFTERNOON_END: SlotTime = SlotTime::at(18, 0);

/// Time of day a booking starts at, rendered and persisted as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime {
    hour: u8,
    minute: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTimeParseError;

impl fmt::Display for SlotTimeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected a time formatted as HH:MM")
    }
}

impl std::error::Error for SlotTimeParseError {}

impl SlotTime {
    pub(crate) const fn at(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }

    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    fn minutes_of_day(self) -> u16 {
        u16::from(self.hour) * 60 + u16::from(self.minute)
    }

    fn from_minutes_of_day(minutes: u16) -> Option<Self> {
        let hour = u8::try_from(minutes / 60).ok()?;
        let minute = u8::try_from(minutes % 60).ok()?;
        Self::new(hour, minute)
    }

    pub fn is_morning(self) -> bool {
        self <= MORNING_END
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for SlotTime {
    type Err = SlotTimeParseError;

    /// Accepts `H:MM`, `HH:MM` and the `HH.MM` variant common in Italian text.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (hour, minute) = trimmed
            .split_once(':')
            .or_else(|| trimmed.split_once('.'))
            .ok_or(SlotTimeParseError)?;

        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
            return Err(SlotTimeParseError);
        }
        if !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(SlotTimeParseError);
        }

        let hour = hour.parse::<u8>().map_err(|_| SlotTimeParseError)?;
        let minute = minute.parse::<u8>().map_err(|_| SlotTimeParseError)?;
        Self::new(hour, minute).ok_or(SlotTimeParseError)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Every bookable start time of a business day, in order: the morning block
/// 09:00-12:00 and the afternoon block 14:00-18:00, both ends included.
pub fn full_catalog() -> Vec<SlotTime> {
    let mut slots = block(MORNING_START, MORNING_END);
    slots.extend(block(AFTERNOON_START, AFTERNOON_END));
    slots
}

/// Orders slots the way the menu shows them: morning group first, then the
/// afternoon, each keeping its incoming order.
pub fn menu_order(slots: &[SlotTime]) -> Vec<SlotTime> {
    let (morning, afternoon): (Vec<SlotTime>, Vec<SlotTime>) =
        slots.iter().copied().partition(|slot| slot.is_morning());
    morning.into_iter().chain(afternoon).collect()
}

fn block(start: SlotTime, end: SlotTime) -> Vec<SlotTime> {
    (start.minutes_of_day()..=end.minutes_of_day())
        .step_by(usize::from(SLOT_STEP_MINUTES))
        .filter_map(SlotTime::from_minutes_of_day)
        .collect()
}
