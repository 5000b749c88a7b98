use chrono::{DateTime, NaiveDate, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::booking::slots::SlotTime;
use crate::models::{Appointment, AppointmentStatus, NewAppointment, ServiceKind};

use super::{AppointmentStore, Store, StoreError, StoreFuture, is_unique_violation};

impl Store {
    pub async fn list_booked_times(&self, date: NaiveDate) -> Result<Vec<SlotTime>, StoreError> {
        let rows = sqlx::query(
            "SELECT time
             FROM appointments
             WHERE date = $1
               AND status IN ('pending', 'confirmed')
             ORDER BY time ASC",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let raw: String = row.try_get("time")?;
                raw.parse::<SlotTime>().map_err(|_| {
                    StoreError::InvalidData(format!("appointment time invalid: {raw}"))
                })
            })
            .collect()
    }

    pub async fn create_appointment(
        &self,
        appointment: &NewAppointment,
        now: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let id = Uuid::new_v4();

        let result = sqlx::query(
            "INSERT INTO appointments (
                id, service, date, time, name, email, phone, message, status, priority, created_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(id)
        .bind(appointment.service.slug())
        .bind(appointment.date)
        .bind(appointment.time.to_string())
        .bind(&appointment.name)
        .bind(&appointment.email)
        .bind(&appointment.phone)
        .bind(appointment.message.as_deref())
        .bind(appointment.status.as_str())
        .bind(appointment.priority)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Appointment {
                id,
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
            }),
            Err(err) if is_unique_violation(&err) => Err(StoreError::SlotTaken {
                date: appointment.date,
                time: appointment.time,
            }),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let row = sqlx::query(
            "SELECT id, service, date, time, name, email, phone, message, status, priority,
                    created_at
             FROM appointments
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row_to_appointment(&row)).transpose()
    }
}

impl AppointmentStore for Store {
    fn booked_times(&self, date: NaiveDate) -> StoreFuture<'_, Vec<SlotTime>> {
        Box::pin(self.list_booked_times(date))
    }

    fn insert_appointment<'a>(
        &'a self,
        appointment: &'a NewAppointment,
        now: DateTime<Utc>,
    ) -> StoreFuture<'a, Appointment> {
        Box::pin(self.create_appointment(appointment, now))
    }
}

fn row_to_appointment(row: &sqlx::postgres::PgRow) -> Result<Appointment, StoreError> {
    let service: String = row.try_get("service")?;
    let time: String = row.try_get("time")?;
    let status: String = row.try_get("status")?;

    Ok(Appointment {
        id: row.try_get("id")?,
        service: ServiceKind::from_slug(&service).ok_or_else(|| {
            StoreError::InvalidData(format!("unknown service persisted: {service}"))
        })?,
        date: row.try_get("date")?,
        time: time
            .parse()
            .map_err(|_| StoreError::InvalidData(format!("appointment time invalid: {time}")))?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        message: row.try_get("message")?,
        status: AppointmentStatus::from_db(&status).ok_or_else(|| {
            StoreError::InvalidData(format!("unknown appointment status persisted: {status}"))
        })?,
        priority: row.try_get("priority")?,
        created_at: row.try_get("created_at")?,
    })
}
