//! Core library for the weather dashboard backend.
//!
//! This crate defines:
//! - The timelines model and the rule-based alert evaluator
//! - Clients for the timelines provider, the geocoder and the chat model
//! - A per-entry TTL cache and the request-level `Dashboard` service
//! - Configuration & credentials handling
//!
//! It is used by `weather-server`, but the evaluator has no I/O and can be reused anywhere.

pub mod alerts;
pub mod cache;
pub mod chat;
pub mod config;
pub mod error;
pub mod geocode;
pub mod model;
pub mod provider;
pub mod service;

pub use alerts::{evaluate, evaluate_json, evaluate_with_units};
pub use cache::{CacheConfig, TtlCache};
pub use chat::{ChatConfig, ChatModel, OpenAiChat, WeatherContext};
pub use config::{Config, ProviderConfig, RateLimitConfig, ServerConfig};
pub use error::UpstreamError;
pub use geocode::{Geocoder, GeocoderConfig, NominatimGeocoder};
pub use model::{
    Alert, AlertLevel, Coordinates, Field, Interval, Place, Timeline, TimelineResponse, Timestep,
    Units, Values,
};
pub use provider::{ProviderId, TimelineProvider, tomorrow::TimelinesConfig, tomorrow::TomorrowClient};
pub use service::{ChatAnswer, Dashboard};
