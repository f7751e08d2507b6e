//! JSON endpoints.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use weather_core::{Alert, Coordinates, Place, Units, WeatherContext};

use crate::{error::ApiError, state::AppState};

/// Location part of every request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationRequest {
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub units: Option<String>,
}

impl LocationRequest {
    /// Explicit coordinates win over a city name.
    fn coords(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }

    fn city(&self) -> Option<&str> {
        self.city.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }

    fn units(&self) -> Units {
        Units::from_param(self.units.as_deref())
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: Option<String>,
    #[serde(flatten)]
    pub location: LocationRequest,
}

#[derive(Debug, Serialize)]
pub struct TimelinesResponse {
    pub location: String,
    pub coords: Coordinates,
    /// Provider payload, passed through unchanged.
    pub timelines: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub answer: String,
    pub weather_context: WeatherContext,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

const MISSING_LOCATION: &str = "Provide city or lat/lon";

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /api/timelines`
pub async fn timelines(
    State(state): State<AppState>,
    Json(req): Json<LocationRequest>,
) -> Result<Json<TimelinesResponse>, ApiError> {
    let place = if let Some(coords) = req.coords() {
        Place::from_coords(coords)
    } else if let Some(city) = req.city() {
        state
            .dashboard
            .geocode(city)
            .await
            .ok_or_else(|| ApiError::NotFound("Location not found".to_string()))?
    } else {
        return Err(ApiError::BadRequest(MISSING_LOCATION.to_string()));
    };

    let timelines = state
        .dashboard
        .timelines(place.coords, req.units())
        .await
        .map_err(|e| {
            error!(error = %e, "timelines request failed");
            ApiError::with_detail("Failed to fetch timelines", &e)
        })?;

    Ok(Json(TimelinesResponse {
        location: place.name,
        coords: place.coords,
        timelines: serde_json::Value::clone(&timelines),
    }))
}

/// `POST /api/alerts`
///
/// An unknown city is not an error: it simply has no alerts.
pub async fn alerts(
    State(state): State<AppState>,
    Json(req): Json<LocationRequest>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let coords = if let Some(coords) = req.coords() {
        coords
    } else if let Some(city) = req.city() {
        match state.dashboard.geocode(city).await {
            Some(place) => place.coords,
            None => {
                info!(city, "unknown city, no alerts");
                return Ok(Json(AlertsResponse { alerts: Vec::new() }));
            }
        }
    } else {
        return Err(ApiError::BadRequest(MISSING_LOCATION.to_string()));
    };

    let alerts = state
        .dashboard
        .alerts(coords, req.units())
        .await
        .map_err(|e| {
            error!(error = %e, "alerts request failed");
            ApiError::server_error()
        })?;

    Ok(Json(AlertsResponse { alerts }))
}

/// `POST /api/ai/chat`
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let question = req
        .question
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing question".to_string()))?;

    if !state.dashboard.chat_enabled() {
        return Err(ApiError::Misconfigured("OPENAI_API_KEY missing".to_string()));
    }

    let place = match (req.location.coords(), req.location.city()) {
        (Some(coords), _) => Some(Place::from_coords(coords)),
        (None, Some(city)) => state.dashboard.geocode(city).await,
        (None, None) => None,
    }
    .ok_or_else(|| ApiError::BadRequest("Missing location (city or lat/lon)".to_string()))?;

    let reply = state
        .dashboard
        .ask(question, &place, req.location.units())
        .await
        .map_err(|e| {
            error!(error = %e, "chat request failed");
            ApiError::from_chat(e)
        })?
        .ok_or_else(|| ApiError::Misconfigured("OPENAI_API_KEY missing".to_string()))?;

    Ok(Json(ChatResponse {
        answer: reply.answer,
        weather_context: reply.context,
    }))
}
