use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::calendar::CalendarService;
use crate::models::ServiceKind;
use crate::repos::AppointmentStore;

use super::slots::{SlotTime, full_catalog};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilitySource {
    /// Returned verbatim by the external calendar service.
    Calendar,
    /// Catalog minus pending and confirmed local appointments.
    LocalStore,
    /// Both sources failed; the unfiltered catalog is offered and the
    /// commit-time re-check decides.
    Catalog,
}

impl AvailabilitySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::LocalStore => "local_store",
            Self::Catalog => "catalog",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAvailability {
    pub slots: Vec<SlotTime>,
    pub source: AvailabilitySource,
}

impl SlotAvailability {
    pub fn contains(&self, time: SlotTime) -> bool {
        self.slots.contains(&time)
    }
}

#[derive(Clone)]
pub struct AvailabilityResolver {
    appointments: Arc<dyn AppointmentStore>,
    calendar: Option<Arc<dyn CalendarService>>,
    calendar_timeout: Duration,
}

impl AvailabilityResolver {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        calendar: Option<Arc<dyn CalendarService>>,
        calendar_timeout: Duration,
    ) -> Self {
        Self {
            appointments,
            calendar,
            calendar_timeout,
        }
    }

    /// Never fails: the external calendar wins when it answers with slots,
    /// local records are the fallback, and the full catalog is the last
    /// resort.
    pub async fn available_slots(&self, date: NaiveDate, service: ServiceKind) -> SlotAvailability {
        if let Some(slots) = self.calendar_slots(date, service).await {
            return SlotAvailability {
                slots,
                source: AvailabilitySource::Calendar,
            };
        }

        match self.appointments.booked_times(date).await {
            Ok(booked) => SlotAvailability {
                slots: full_catalog()
                    .into_iter()
                    .filter(|slot| !booked.contains(slot))
                    .collect(),
                source: AvailabilitySource::LocalStore,
            },
            Err(err) => {
                warn!(
                    date = %date,
                    service = service.slug(),
                    "local availability lookup failed, offering full catalog: {err}"
                );
                SlotAvailability {
                    slots: full_catalog(),
                    source: AvailabilitySource::Catalog,
                }
            }
        }
    }

    async fn calendar_slots(&self, date: NaiveDate, service: ServiceKind) -> Option<Vec<SlotTime>> {
        let calendar = self.calendar.as_ref()?;

        let raw = match timeout(self.calendar_timeout, calendar.available_slots(date, service)).await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                warn!(
                    date = %date,
                    service = service.slug(),
                    "calendar availability unavailable, using local records: {err}"
                );
                return None;
            }
            Err(_) => {
                warn!(
                    date = %date,
                    service = service.slug(),
                    timeout_ms = self.calendar_timeout.as_millis() as u64,
                    "calendar availability timed out, using local records"
                );
                return None;
            }
        };

        let slots = raw
            .iter()
            .filter_map(|value| match value.parse::<SlotTime>() {
                Ok(slot) => Some(slot),
                Err(_) => {
                    warn!(value = %value, "ignoring malformed slot from calendar service");
                    None
                }
            })
            .collect::<Vec<_>>();

        if slots.is_empty() {
            debug!(date = %date, "calendar returned no slots, using local records");
            return None;
        }

        Some(slots)
    }
}
