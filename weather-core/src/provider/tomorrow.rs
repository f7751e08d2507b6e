use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    error::{UpstreamError, truncate_body},
    model::{Coordinates, Field, Units},
    provider::ProviderId,
};

use super::TimelineProvider;

const SERVICE: &str = "timelines";

/// Timelines endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelinesConfig {
    /// Base URL of the v4 API, without the `/timelines` suffix.
    pub base_url: String,
    /// IANA timezone the provider uses for interval start times.
    pub timezone: String,
    pub timeout_secs: u64,
}

impl Default for TimelinesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.tomorrow.io/v4".to_string(),
            timezone: "Asia/Jakarta".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Tomorrow.io v4 timelines client.
#[derive(Debug, Clone)]
pub struct TomorrowClient {
    api_key: Option<String>,
    config: TimelinesConfig,
    http: Client,
}

impl TomorrowClient {
    pub fn new(api_key: Option<String>, config: TimelinesConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for the timelines provider")?;

        Ok(Self {
            api_key,
            config,
            http,
        })
    }

    fn fields_param() -> String {
        Field::requested()
            .iter()
            .map(Field::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[async_trait]
impl TimelineProvider for TomorrowClient {
    #[instrument(skip(self))]
    async fn fetch_timelines(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<serde_json::Value, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingApiKey(ProviderId::Tomorrow))?;

        let url = format!("{}/timelines", self.config.base_url.trim_end_matches('/'));
        let location = coords.to_string();
        let fields = Self::fields_param();

        let res = self
            .http
            .get(&url)
            .query(&[
                ("location", location.as_str()),
                ("fields", fields.as_str()),
                ("timesteps", "current,1h,1d"),
                ("units", units.as_str()),
                ("timezone", self.config.timezone.as_str()),
                ("apikey", api_key),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::request(SERVICE, e))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| UpstreamError::request(SERVICE, e))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })?;

        debug!(
            timelines = parsed
                .pointer("/data/timelines")
                .and_then(serde_json::Value::as_array)
                .map_or(0, Vec::len),
            "fetched timelines for {location}"
        );

        Ok(parsed)
    }
}
