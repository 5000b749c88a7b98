use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::booking::session::ChatSession;
use crate::booking::slots::SlotTime;
use crate::models::{Appointment, NewAppointment};

use super::{AppointmentStore, SessionRepository, StoreError, StoreFuture};

/// In-process store with the same slot-uniqueness rule as the postgres
/// schema. Used by tests and local demos; state is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    sessions: Mutex<HashMap<String, ChatSession>>,
    appointments: Mutex<Vec<Appointment>>,
    fail_reads: AtomicBool,
    fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn appointments(&self) -> Vec<Appointment> {
        self.inner
            .appointments
            .lock()
            .expect("appointment mutex should not be poisoned")
            .clone()
    }

    pub fn session(&self, session_id: &str) -> Option<ChatSession> {
        self.inner
            .sessions
            .lock()
            .expect("session mutex should not be poisoned")
            .get(session_id)
            .cloned()
    }

    /// Makes occupancy reads fail, simulating an unreachable database.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes appointment inserts fail with a non-conflict error.
    pub fn set_fail_inserts(&self, fail: bool) {
        self.inner.fail_inserts.store(fail, Ordering::SeqCst);
    }

    fn unavailable(operation: &str) -> StoreError {
        StoreError::InvalidData(format!("memory store {operation} disabled"))
    }
}

impl SessionRepository for MemoryStore {
    fn get_session<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Option<ChatSession>> {
        Box::pin(async move { Ok(self.session(session_id)) })
    }

    fn put_session<'a>(&'a self, session: &'a ChatSession) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.inner
                .sessions
                .lock()
                .expect("session mutex should not be poisoned")
                .insert(session.session_id.clone(), session.clone());
            Ok(())
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

impl AppointmentStore for MemoryStore {
    fn booked_times(&self, date: NaiveDate) -> StoreFuture<'_, Vec<SlotTime>> {
        Box::pin(async move {
            if self.inner.fail_reads.load(Ordering::SeqCst) {
                return Err(Self::unavailable("reads"));
            }

            let mut times = self
                .inner
                .appointments
                .lock()
                .expect("appointment mutex should not be poisoned")
                .iter()
                .filter(|appointment| appointment.date == date && appointment.status.holds_slot())
                .map(|appointment| appointment.time)
                .collect::<Vec<_>>();
            times.sort();
            Ok(times)
        })
    }

    fn insert_appointment<'a>(
        &'a self,
        appointment: &'a NewAppointment,
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, Appointment> {
        Box::pin(async move {
            if self.inner.fail_inserts.load(Ordering::SeqCst) {
                return Err(Self::unavailable("inserts"));
            }

            let mut appointments = self
                .inner
                .appointments
                .lock()
                .expect("appointment mutex should not be poisoned");

            let taken = appointment.status.holds_slot()
                && appointments.iter().any(|existing| {
                    existing.date == appointment.date
                        && existing.time == appointment.time
                        && existing.status.holds_slot()
                });
            if taken {
                return Err(StoreError::SlotTaken {
                    date: appointment.date,
                    time: appointment.time,
                });
            }

            let created = Appointment {
                id: Uuid::new_v4(),
                service: appointment.service,
                date: appointment.date,
                time: appointment.time,
                name: appointment.name.clone(),
                email: appointment.email.clone(),
                phone: appointment.phone.clone(),
                message: appointment.message.clone(),
                status: appointment.status,
                priority: appointment.priority,
                created_at: now,
            };
            appointments.push(created.clone());
            Ok(created)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::MemoryStore;
    use crate::models::{AppointmentStatus, NewAppointment, ServiceKind};
    use crate::repos::{AppointmentStore, StoreError};

    fn new_appointment(time: &str, status: AppointmentStatus) -> NewAppointment {
        NewAppointment {
            service: ServiceKind::Chatbot,
            date: NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"),
            time: time.parse().expect("valid time"),
            name: "Mario Rossi".to_string(),
            email: "mario@example.it".to_string(),
            phone: "+39 333 1234567".to_string(),
            message: None,
            status,
            priority: false,
        }
    }

    #[tokio::test]
    async fn second_active_booking_for_same_slot_is_rejected() {
        let store = MemoryStore::new();
        let first = new_appointment("10:00", AppointmentStatus::Confirmed);
        store
            .insert_appointment(&first, Utc::now())
            .await
            .expect("first insert should succeed");

        let err = store
            .insert_appointment(&first, Utc::now())
            .await
            .expect_err("second insert should conflict");
        assert!(matches!(err, StoreError::SlotTaken { .. }));
        assert_eq!(store.appointments().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_appointments_do_not_hold_slots() {
        let store = MemoryStore::new();
        store
            .insert_appointment(
                &new_appointment("10:00", AppointmentStatus::Cancelled),
                Utc::now(),
            )
            .await
            .expect("cancelled insert should succeed");
        store
            .insert_appointment(
                &new_appointment("11:00", AppointmentStatus::Pending),
                Utc::now(),
            )
            .await
            .expect("pending insert should succeed");

        let booked = store
            .booked_times(NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date"))
            .await
            .expect("read should succeed");
        assert_eq!(
            booked.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["11:00".to_string()]
        );
    }
}
