use crate::{
    Config,
    error::UpstreamError,
    model::{Coordinates, Units},
    provider::tomorrow::TomorrowClient,
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod tomorrow;

/// Upstream services that need an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Tomorrow,
    OpenAi,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Tomorrow => "tomorrow",
            ProviderId::OpenAi => "openai",
        }
    }

    /// Environment variable that overrides the configured key.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderId::Tomorrow => "TOMORROW_API_KEY",
            ProviderId::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Tomorrow, ProviderId::OpenAi]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "tomorrow" | "tomorrow.io" => Ok(ProviderId::Tomorrow),
            "openai" => Ok(ProviderId::OpenAi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: tomorrow, openai."
            )),
        }
    }
}

/// Source of current/hourly/daily timelines for a location.
///
/// The payload is returned as the provider sent it; readers decode it with
/// [`TimelineResponse::from_payload`](crate::model::TimelineResponse::from_payload).
#[async_trait]
pub trait TimelineProvider: Send + Sync + Debug {
    async fn fetch_timelines(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<serde_json::Value, UpstreamError>;
}

/// Construct the timelines provider from config.
///
/// A missing key is not an error here: the provider reports it per request, so the
/// server can still start and serve the frontend.
pub fn timeline_provider_from_config(
    config: &Config,
) -> anyhow::Result<Box<dyn TimelineProvider>> {
    let api_key = config
        .provider_api_key(ProviderId::Tomorrow)
        .map(str::to_owned);
    let client = TomorrowClient::new(api_key, config.timelines.clone())?;
    Ok(Box::new(client))
}
