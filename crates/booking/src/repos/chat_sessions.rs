use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::Row;

use crate::booking::session::{BookingData, BookingStep, ChatSession, FlowContext};

use super::{SessionRepository, Store, StoreError, StoreFuture};

impl Store {
    pub async fn load_chat_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ChatSession>, StoreError> {
        let row = sqlx::query(
            "SELECT session_id, booking_mode, flow_step, booking_data, flow_context,
                    created_at, last_activity
             FROM chat_sessions
             WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<ChatSession, StoreError> {
            let flow_step: Option<String> = row.try_get("flow_step")?;
            let step = flow_step
                .as_deref()
                .map(|raw| {
                    BookingStep::from_db(raw).ok_or_else(|| {
                        StoreError::InvalidData(format!("unknown flow step persisted: {raw}"))
                    })
                })
                .transpose()?;

            let booking_data_json: Value = row.try_get("booking_data")?;
            let booking_data =
                serde_json::from_value::<BookingData>(booking_data_json).map_err(|err| {
                    StoreError::InvalidData(format!("booking data invalid: {err}"))
                })?;
            let flow_context_json: Value = row.try_get("flow_context")?;
            let flow = serde_json::from_value::<FlowContext>(flow_context_json)
                .map_err(|err| StoreError::InvalidData(format!("flow context invalid: {err}")))?;

            Ok(ChatSession {
                session_id: row.try_get("session_id")?,
                booking_mode: row.try_get("booking_mode")?,
                step,
                booking_data,
                flow,
                created_at: row.try_get("created_at")?,
                last_activity: row.try_get("last_activity")?,
            })
        })
        .transpose()
    }

    pub async fn upsert_chat_session(&self, session: &ChatSession) -> Result<(), StoreError> {
        let booking_data = serde_json::to_value(&session.booking_data)
            .map_err(|err| StoreError::InvalidData(format!("booking data invalid: {err}")))?;
        let flow_context = serde_json::to_value(&session.flow)
            .map_err(|err| StoreError::InvalidData(format!("flow context invalid: {err}")))?;

        sqlx::query(
            "INSERT INTO chat_sessions (
                session_id,
                booking_mode,
                flow_step,
                booking_data,
                flow_context,
                created_at,
                last_activity
             ) VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (session_id)
             DO UPDATE SET
               booking_mode = EXCLUDED.booking_mode,
               flow_step = EXCLUDED.flow_step,
               booking_data = EXCLUDED.booking_data,
               flow_context = EXCLUDED.flow_context,
               last_activity = EXCLUDED.last_activity",
        )
        .bind(&session.session_id)
        .bind(session.booking_mode)
        .bind(session.step.map(BookingStep::as_str))
        .bind(booking_data)
        .bind(flow_context)
        .bind(session.created_at)
        .bind(session.last_activity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes up to `batch_size` sessions idle since before `cutoff`.
    pub async fn purge_idle_chat_sessions_batch(
        &self,
        cutoff: DateTime<Utc>,
        batch_size: i64,
    ) -> Result<u64, StoreError> {
        if batch_size <= 0 {
            return Err(StoreError::InvalidData(
                "chat session purge batch_size must be > 0".to_string(),
            ));
        }

        let result = sqlx::query(
            "DELETE FROM chat_sessions
             WHERE session_id IN (
                SELECT session_id
                FROM chat_sessions
                WHERE last_activity <= $1
                ORDER BY last_activity ASC
                LIMIT $2
             )",
        )
        .bind(cutoff)
        .bind(batch_size)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

impl SessionRepository for Store {
    fn get_session<'a>(&'a self, session_id: &'a str) -> StoreFuture<'a, Option<ChatSession>> {
        Box::pin(self.load_chat_session(session_id))
    }

    fn put_session<'a>(&'a self, session: &'a ChatSession) -> StoreFuture<'a, ()> {
        Box::pin(self.upsert_chat_session(session))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(Store::ping(self))
    }
}
