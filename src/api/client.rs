use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{MedalsResponse, PresetsResponse, RecordsResponse};
use super::{MedalCounts, MissionRecordView, MissionReporter};
use crate::models::{CompletionReport, FailureReport, MissionSpec, Tier};

const ENABLE_LOGS: bool = true;

use crate::log_info;

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Clone)]
pub struct MissionApi {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl MissionApi {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|token| !token.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn presets(&self) -> Result<Vec<MissionSpec>> {
        let response: PresetsResponse = self.get_json("/missions/presets").await?;
        Ok(response.into_missions())
    }

    pub async fn medals(&self) -> Result<MedalCounts> {
        let response: MedalsResponse = self.get_json("/missions/medals").await?;
        Ok(response.medals)
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<MissionRecordView>> {
        let response: RecordsResponse = self
            .get_json(&format!("/missions/recent?limit={limit}"))
            .await?;
        Ok(response.missions)
    }

    pub async fn by_tier(&self, tier: Tier) -> Result<Vec<MissionRecordView>> {
        let response: RecordsResponse = self
            .get_json(&format!("/missions/by-tier/{}", tier.as_str()))
            .await?;
        Ok(response.missions)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let request = self.authorized(self.http.get(self.url(endpoint)));
        self.send(request, endpoint).await
    }

    async fn post_json<B: serde::Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value> {
        let request = self.authorized(self.http.post(self.url(endpoint)).json(body));
        self.send(request, endpoint).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("request to {endpoint} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(anyhow!(error_message(status, &body)));
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode response from {endpoint}"))
    }
}

/// Prefers the server's own `message`/`error` text over the bare status.
pub(crate) fn error_message(status: StatusCode, body: &Value) -> String {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .filter(|message| !message.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[async_trait]
impl MissionReporter for MissionApi {
    async fn report_complete(&self, report: &CompletionReport) -> Result<()> {
        self.post_json("/missions/presets/complete", report).await?;
        log_info!("recorded completion of preset mission {}", report.preset_mission_id);
        Ok(())
    }

    async fn report_failure(&self, report: &FailureReport) -> Result<()> {
        self.post_json("/missions/presets/fail", report).await?;
        log_info!("recorded failed attempt of preset mission {}", report.preset_mission_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_message_prefers_server_text() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            error_message(status, &json!({"message": "missing fields: preset_mission_id"})),
            "missing fields: preset_mission_id"
        );
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, &json!({"error": "no missions today"})),
            "no missions today"
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, &Value::Null),
            "HTTP 500"
        );
    }

    #[test]
    fn base_url_loses_trailing_slash_and_blank_token() {
        let api = MissionApi::new("http://localhost:5000/api/", Some(String::new())).unwrap();
        assert_eq!(api.base_url(), "http://localhost:5000/api");
        assert_eq!(api.url("/missions/presets"), "http://localhost:5000/api/missions/presets");
        assert!(api.token.is_none());
    }

    #[tokio::test]
    async fn unreachable_server_reports_an_error() {
        // Port 9 (discard) is closed on test machines.
        let api = MissionApi::new("http://127.0.0.1:9/api", None).unwrap();
        let report = CompletionReport::from_mission(&MissionSpec::new(1, 5));
        assert!(api.report_complete(&report).await.is_err());
    }
}
