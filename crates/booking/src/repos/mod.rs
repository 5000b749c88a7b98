use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::booking::session::ChatSession;
use crate::booking::slots::SlotTime;
use crate::models::{Appointment, NewAppointment};

mod appointments;
mod chat_sessions;
mod memory;

pub use memory::MemoryStore;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("slot {date} {time} is already booked")]
    SlotTaken { date: NaiveDate, time: SlotTime },
}

/// Durable per-conversation state, read and written once per chat turn.
pub trait SessionRepository: Send + Sync {
    fn get_session<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Option<ChatSession>>;

    fn put_session<'a>(&'a self, session: &'a ChatSession) -> StoreFuture<'a, ()>;

    /// Cheap round trip used by readiness probes.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

/// Local appointment records. The booking engine only reads occupancy and
/// inserts; status changes happen elsewhere.
pub trait AppointmentStore: Send + Sync {
    /// Start times on `date` held by a pending or confirmed appointment.
    fn booked_times(&self, date: NaiveDate) -> StoreFuture<'_, Vec<SlotTime>>;

    /// Fails with [`StoreError::SlotTaken`] when another active appointment
    /// already holds the same date and time.
    fn insert_appointment<'a>(
        &'a self,
        appointment: &'a NewAppointment,
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, Appointment>;
}

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let _: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
