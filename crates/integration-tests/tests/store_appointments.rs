mod support;

use booking::booking::SlotTime;
use booking::models::{AppointmentStatus, NewAppointment, ServiceKind};
use booking::repos::{AppointmentStore, StoreError};
use chrono::{NaiveDate, Utc};
use serial_test::serial;

use support::test_store;

fn new_appointment(time: &str, status: AppointmentStatus) -> NewAppointment {
    NewAppointment {
        service: ServiceKind::WebDevelopment,
        date: NaiveDate::from_ymd_opt(2030, 3, 11).expect("valid date"),
        time: time.parse().expect("valid time"),
        name: "Giulia Verdi".to_string(),
        email: "giulia@example.it".to_string(),
        phone: "+39 02 1234567".to_string(),
        message: Some("Nuovo sito e-commerce".to_string()),
        status,
        priority: false,
    }
}

#[tokio::test]
#[serial]
async fn active_appointments_hold_their_slot() {
    let Some(store) = test_store().await else {
        return;
    };

    let first = store
        .insert_appointment(&new_appointment("10:00", AppointmentStatus::Confirmed), Utc::now())
        .await
        .expect("first insert should succeed");

    let second = store
        .insert_appointment(&new_appointment("10:00", AppointmentStatus::Pending), Utc::now())
        .await;
    assert!(matches!(second, Err(StoreError::SlotTaken { .. })));

    let loaded = store
        .get_appointment(first.id)
        .await
        .expect("lookup should succeed")
        .expect("appointment should exist");
    assert_eq!(loaded.time, "10:00".parse::<SlotTime>().expect("valid time"));
    assert_eq!(loaded.status, AppointmentStatus::Confirmed);
    assert_eq!(loaded.message.as_deref(), Some("Nuovo sito e-commerce"));
}

#[tokio::test]
#[serial]
async fn cancelled_appointments_free_their_slot() {
    let Some(store) = test_store().await else {
        return;
    };

    store
        .insert_appointment(&new_appointment("15:30", AppointmentStatus::Cancelled), Utc::now())
        .await
        .expect("cancelled insert should succeed");
    store
        .insert_appointment(&new_appointment("15:30", AppointmentStatus::Confirmed), Utc::now())
        .await
        .expect("slot freed by cancellation should be bookable");
    store
        .insert_appointment(&new_appointment("09:00", AppointmentStatus::Pending), Utc::now())
        .await
        .expect("pending insert should succeed");

    let booked = store
        .booked_times(NaiveDate::from_ymd_opt(2030, 3, 11).expect("valid date"))
        .await
        .expect("booked times should load");
    let rendered = booked.iter().map(ToString::to_string).collect::<Vec<_>>();
    assert_eq!(rendered, vec!["09:00", "15:30"]);
}
