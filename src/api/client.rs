use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;

use super::error::ApiError;
use super::types::{FinishRequest, StartRequest, error_message};
use super::CheckInService;
use crate::checkin::{
    CheckInId, CheckInRecord, Groomer, GroomerId, normalize_checkin, normalize_checkins,
    normalize_groomers,
};

/// `CheckInService` backed by the check-in HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCheckInService {
    client: Client,
    base_url: String,
}

impl HttpCheckInService {
    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeouts(base_url, Duration::from_secs(10), Duration::from_secs(30))
    }

    /// Create a client with explicit transport timeouts.
    pub fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turns a non-2xx response into `Rejected`, otherwise parses the JSON body.
    async fn read_json(response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        debug!(path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .header("accept", "application/json")
            .query(query)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn post_json<B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        debug!(path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .header("accept", "application/json")
            .json(body)
            .send()
            .await?;
        Self::read_json(response).await
    }

    fn confirmed_record(value: &Value) -> Result<CheckInRecord, ApiError> {
        normalize_checkin(value)
            .ok_or_else(|| ApiError::Malformed("response carries no check-in id".to_string()))
    }
}

#[async_trait]
impl CheckInService for HttpCheckInService {
    async fn list_today(&self) -> Result<Vec<CheckInRecord>, ApiError> {
        let body = self.get_json("checkins/hoje", &[]).await?;
        Ok(normalize_checkins(&body))
    }

    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<CheckInRecord>, ApiError> {
        let query = [("data", date.format("%d/%m/%Y").to_string())];
        let body = self.get_json("checkins/buscar", &query).await?;
        Ok(normalize_checkins(&body))
    }

    async fn list_groomers(&self) -> Result<Vec<Groomer>, ApiError> {
        let body = self.get_json("api/groomers", &[]).await?;
        Ok(normalize_groomers(&body))
    }

    async fn start_check_in(
        &self,
        id: CheckInId,
        groomer_id: GroomerId,
    ) -> Result<CheckInRecord, ApiError> {
        let req = StartRequest {
            id_check_in: id,
            id_groomer: groomer_id,
        };
        let body = self.post_json("checkins/start", &req).await?;
        Self::confirmed_record(&body)
    }

    async fn finish_check_in(&self, id: CheckInId) -> Result<CheckInRecord, ApiError> {
        let body = self
            .post_json("checkins/end", &FinishRequest { id_check_in: id })
            .await?;
        Self::confirmed_record(&body)
    }
}
