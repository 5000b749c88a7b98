use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

/// Minimal external calendar: serves a fixed slot list and either accepts
/// or rejects reservations.
#[derive(Clone)]
pub struct CalendarMock {
    pub slots: Vec<&'static str>,
    pub reject_with_conflict: bool,
    pub reservations: Arc<Mutex<Vec<Value>>>,
}

impl CalendarMock {
    pub fn new(slots: Vec<&'static str>, reject_with_conflict: bool) -> Self {
        Self {
            slots,
            reject_with_conflict,
            reservations: Arc::default(),
        }
    }
}

pub struct RunningCalendar {
    pub base_url: String,
    shutdown_tx: oneshot::Sender<()>,
    server_task: tokio::task::JoinHandle<()>,
}

impl RunningCalendar {
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        self.server_task.await.expect("calendar mock should join");
    }
}

async fn slots(State(state): State<CalendarMock>) -> Json<Value> {
    Json(json!({ "slots": state.slots }))
}

async fn reservations(State(state): State<CalendarMock>, Json(body): Json<Value>) -> Response {
    state.reservations.lock().await.push(body);
    if state.reject_with_conflict {
        return StatusCode::CONFLICT.into_response();
    }
    let id = format!("cal-{}", state.reservations.lock().await.len());
    Json(json!({ "reservation_id": id })).into_response()
}

pub async fn spawn_calendar_mock(state: CalendarMock) -> RunningCalendar {
    let app = Router::new()
        .route("/slots", get(slots))
        .route("/reservations", post(reservations))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("calendar mock should run");
    });

    RunningCalendar {
        base_url: format!("http://{local_addr}"),
        shutdown_tx,
        server_task,
    }
}
