//! Forward geocoding of free-text place names via Nominatim (OpenStreetMap).

use std::{fmt::Debug, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    error::{UpstreamError, truncate_body},
    model::{Coordinates, Place},
};

const SERVICE: &str = "geocoder";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("weather-dashboard/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 10,
        }
    }
}

/// Resolves a place name to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// `Ok(None)` when the service knows no such place.
    async fn search(&self, query: &str) -> Result<Option<Place>, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    config: GeocoderConfig,
    http: Client,
}

impl NominatimGeocoder {
    pub fn new(config: GeocoderConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client for the geocoder")?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Option<Place>, UpstreamError> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "0"),
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

        let hits: Vec<NominatimHit> =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let Some(first) = hits.into_iter().next() else {
            debug!("no geocoding match");
            return Ok(None);
        };

        let parse = |raw: &str, axis: &str| {
            raw.trim().parse::<f64>().map_err(|e| UpstreamError::Decode {
                service: SERVICE,
                message: format!("invalid {axis} '{raw}': {e}"),
            })
        };
        let coords = Coordinates::new(parse(&first.lat, "lat")?, parse(&first.lon, "lon")?);
        let name = first
            .display_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| query.to_string());

        debug!(%name, %coords, "geocoded");
        Ok(Some(Place { name, coords }))
    }
}
