use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::{Method, StatusCode};
use url::Url;
use uuid::Uuid;

use crate::config::CalendarServiceConfig;
use crate::models::ServiceKind;

use super::signing::{
    CALENDAR_AUTH_NONCE_HEADER, CALENDAR_AUTH_SIGNATURE_HEADER, CALENDAR_AUTH_TIMESTAMP_HEADER,
    sign_calendar_request,
};
use super::{
    AvailableSlotsResponse, CalendarError, CalendarFuture, CalendarService, ReservationRequest,
    ReservationResponse,
};

const SLOTS_PATH: &str = "slots";
const RESERVATIONS_PATH: &str = "reservations";

#[derive(Clone)]
pub struct HttpCalendarClient {
    base_url: String,
    signing_secret: Option<String>,
    http_client: reqwest::Client,
}

impl HttpCalendarClient {
    pub fn new(config: &CalendarServiceConfig) -> Result<Self, CalendarError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| CalendarError::Unavailable {
                message: format!("failed to build calendar http client: {err}"),
            })?;

        Ok(Self {
            base_url: config.base_url.clone(),
            signing_secret: config.signing_secret.clone(),
            http_client,
        })
    }

    pub async fn fetch_available_slots(
        &self,
        date: NaiveDate,
        service: ServiceKind,
    ) -> Result<Vec<String>, CalendarError> {
        let mut url = self.endpoint(SLOTS_PATH)?;
        url.query_pairs_mut()
            .append_pair("date", &date.format("%Y-%m-%d").to_string())
            .append_pair("service", service.slug());

        let (status, bytes) = self.send(Method::GET, url, Vec::new()).await?;
        if !status.is_success() {
            return Err(CalendarError::Rejected {
                status: status.as_u16(),
            });
        }

        let parsed = serde_json::from_slice::<AvailableSlotsResponse>(&bytes).map_err(|err| {
            CalendarError::ResponseInvalid {
                message: format!("failed to parse slots response: {err}"),
            }
        })?;
        Ok(parsed.slots)
    }

    pub async fn reserve(&self, request: &ReservationRequest) -> Result<String, CalendarError> {
        let url = self.endpoint(RESERVATIONS_PATH)?;
        let body = serde_json::to_vec(request).map_err(|err| CalendarError::ResponseInvalid {
            message: format!("failed to serialize reservation payload: {err}"),
        })?;

        let (status, bytes) = self.send(Method::POST, url, body).await?;
        if status == StatusCode::CONFLICT {
            return Err(CalendarError::Conflict);
        }
        if !status.is_success() {
            return Err(CalendarError::Rejected {
                status: status.as_u16(),
            });
        }

        let parsed = serde_json::from_slice::<ReservationResponse>(&bytes).map_err(|err| {
            CalendarError::ResponseInvalid {
                message: format!("failed to parse reservation response: {err}"),
            }
        })?;
        if parsed.reservation_id.trim().is_empty() {
            return Err(CalendarError::ResponseInvalid {
                message: "missing reservation_id in reservation response".to_string(),
            });
        }

        Ok(parsed.reservation_id)
    }

    fn endpoint(&self, path: &str) -> Result<Url, CalendarError> {
        let raw = format!("{}/{path}", self.base_url.trim_end_matches('/'));
        Url::parse(&raw).map_err(|err| CalendarError::Unavailable {
            message: format!("invalid calendar endpoint {raw}: {err}"),
        })
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Vec<u8>,
    ) -> Result<(StatusCode, Vec<u8>), CalendarError> {
        let mut request = self.http_client.request(method.clone(), url.clone());

        if let Some(secret) = self.signing_secret.as_deref() {
            let timestamp = Utc::now().timestamp();
            let nonce = Uuid::new_v4().simple().to_string();
            let signature =
                sign_calendar_request(secret, method.as_str(), url.path(), timestamp, &nonce, &body);
            request = request
                .header(CALENDAR_AUTH_TIMESTAMP_HEADER, timestamp.to_string())
                .header(CALENDAR_AUTH_NONCE_HEADER, nonce)
                .header(CALENDAR_AUTH_SIGNATURE_HEADER, signature);
        }

        if method == Method::POST {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                CalendarError::Timeout
            } else {
                CalendarError::Unavailable {
                    message: err.to_string(),
                }
            }
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| CalendarError::ResponseInvalid {
                message: format!("failed to read calendar response body: {err}"),
            })?;

        Ok((status, bytes.to_vec()))
    }
}

impl CalendarService for HttpCalendarClient {
    fn available_slots(
        &self,
        date: NaiveDate,
        service: ServiceKind,
    ) -> CalendarFuture<'_, Vec<String>> {
        Box::pin(self.fetch_available_slots(date, service))
    }

    fn book_appointment<'a>(
        &'a self,
        request: &'a ReservationRequest,
    ) -> CalendarFuture<'a, String> {
        Box::pin(self.reserve(request))
    }
}
