//! Request-level orchestration: location resolution, cached timelines, alerts, chat.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    alerts,
    cache::{CacheConfig, TtlCache},
    chat::{ChatModel, WeatherContext},
    error::UpstreamError,
    geocode::Geocoder,
    model::{Alert, Coordinates, Place, TimelineResponse, Units},
    provider::TimelineProvider,
};

/// Answer from the chat assistant together with the data it was given.
#[derive(Debug, Clone)]
pub struct ChatAnswer {
    pub answer: String,
    pub context: WeatherContext,
}

/// Shared, cache-backed access to the upstream services.
#[derive(Debug)]
pub struct Dashboard {
    timelines: Arc<dyn TimelineProvider>,
    geocoder: Arc<dyn Geocoder>,
    chat: Option<Arc<dyn ChatModel>>,
    timeline_cache: TtlCache<Arc<serde_json::Value>>,
    place_cache: TtlCache<Option<Place>>,
    cache_config: CacheConfig,
}

impl Dashboard {
    pub fn new(
        timelines: Arc<dyn TimelineProvider>,
        geocoder: Arc<dyn Geocoder>,
        chat: Option<Arc<dyn ChatModel>>,
        cache_config: CacheConfig,
    ) -> Self {
        Self {
            timelines,
            geocoder,
            chat,
            timeline_cache: TtlCache::new(cache_config.max_entries),
            place_cache: TtlCache::new(cache_config.max_entries),
            cache_config,
        }
    }

    pub fn chat_enabled(&self) -> bool {
        self.chat.is_some()
    }

    /// Resolve a place name. Lookup failures are logged and treated as "not found";
    /// both hits and misses are cached.
    pub async fn geocode(&self, query: &str) -> Option<Place> {
        let key = format!("geo:{query}");
        if let Some(cached) = self.place_cache.get(&key).await {
            return cached;
        }

        let place = match self.geocoder.search(query).await {
            Ok(place) => place,
            Err(e) => {
                warn!(error = %e, query, "geocoding failed");
                None
            }
        };

        let ttl = if place.is_some() {
            self.cache_config.geocode_ttl()
        } else {
            self.cache_config.geocode_miss_ttl()
        };
        self.place_cache.insert(key, place.clone(), ttl).await;

        place
    }

    /// Timelines payload for `coords`, exactly as the provider returned it.
    pub async fn timelines(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<Arc<serde_json::Value>, UpstreamError> {
        let key = format!("timelines:{coords}:{}", units.as_str());
        if let Some(cached) = self.timeline_cache.get(&key).await {
            debug!(%coords, "serving cached timelines");
            return Ok(cached);
        }

        let fetched = Arc::new(self.timelines.fetch_timelines(coords, units).await?);
        self.timeline_cache
            .insert(key, Arc::clone(&fetched), self.cache_config.timelines_ttl())
            .await;

        Ok(fetched)
    }

    pub async fn alerts(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<Vec<Alert>, UpstreamError> {
        let payload = self.timelines(coords, units).await?;
        let alerts = alerts::evaluate_json(&payload, units);
        info!(%coords, count = alerts.len(), "alerts evaluated");
        Ok(alerts)
    }

    /// Answer a question about the weather at `place`.
    ///
    /// Returns `Ok(None)` when no chat provider is configured.
    pub async fn ask(
        &self,
        question: &str,
        place: &Place,
        units: Units,
    ) -> Result<Option<ChatAnswer>, UpstreamError> {
        let Some(chat) = &self.chat else {
            return Ok(None);
        };

        let payload = self.timelines(place.coords, units).await?;
        let response = TimelineResponse::from_payload(&payload);
        let alerts = alerts::evaluate_with_units(&response, units);
        let context = WeatherContext::new(place.name.clone(), &response, alerts);

        let answer = chat.answer(question, &context).await?;
        Ok(Some(ChatAnswer { answer, context }))
    }
}
