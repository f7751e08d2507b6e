use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Granularity of a timeline series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timestep {
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "1d")]
    Daily,
    /// Any timestep the dashboard never asks for (e.g. "1m", "5m").
    #[serde(rename = "other", other)]
    Other,
}

impl Timestep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timestep::Current => "current",
            Timestep::Hourly => "1h",
            Timestep::Daily => "1d",
            Timestep::Other => "other",
        }
    }
}

/// Interval value names as the timelines provider spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Temperature,
    TemperatureApparent,
    TemperatureMin,
    TemperatureMax,
    Humidity,
    WindSpeed,
    CloudCover,
    PressureSurfaceLevel,
    PrecipitationProbability,
    PrecipitationIntensity,
    UvIndex,
    WeatherCode,
    SunriseTime,
    SunsetTime,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::TemperatureApparent => "temperatureApparent",
            Field::TemperatureMin => "temperatureMin",
            Field::TemperatureMax => "temperatureMax",
            Field::Humidity => "humidity",
            Field::WindSpeed => "windSpeed",
            Field::CloudCover => "cloudCover",
            Field::PressureSurfaceLevel => "pressureSurfaceLevel",
            Field::PrecipitationProbability => "precipitationProbability",
            Field::PrecipitationIntensity => "precipitationIntensity",
            Field::UvIndex => "uvIndex",
            Field::WeatherCode => "weatherCode",
            Field::SunriseTime => "sunriseTime",
            Field::SunsetTime => "sunsetTime",
        }
    }

    /// Fields requested from the timelines provider on every fetch.
    pub const fn requested() -> &'static [Field] {
        &[
            Field::Temperature,
            Field::TemperatureApparent,
            Field::Humidity,
            Field::WindSpeed,
            Field::WeatherCode,
            Field::PrecipitationProbability,
            Field::PrecipitationIntensity,
            Field::UvIndex,
            Field::CloudCover,
            Field::PressureSurfaceLevel,
            Field::SunriseTime,
            Field::SunsetTime,
        ]
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weather values of one interval, keyed by provider field name.
///
/// Values are kept verbatim so they can be echoed back to clients. Numeric lookups treat
/// a missing or non-numeric entry as unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(BTreeMap<String, serde_json::Value>);

impl Values {
    pub fn get(&self, field: Field) -> Option<f64> {
        self.0.get(field.as_str()).and_then(serde_json::Value::as_f64)
    }

    /// Numeric lookup where an unknown value counts as zero.
    pub fn get_or_zero(&self, field: Field) -> f64 {
        self.get(field).unwrap_or(0.0)
    }

    pub fn set(&mut self, field: Field, value: impl Into<serde_json::Value>) {
        self.0.insert(field.as_str().to_string(), value.into());
    }

    pub fn with(mut self, field: Field, value: impl Into<serde_json::Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn as_map(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub start_time: DateTime<FixedOffset>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Values,
}

impl Interval {
    pub fn new(start_time: DateTime<FixedOffset>, values: Values) -> Self {
        Self { start_time, values }
    }

    /// RFC 3339 start time, `Z` for UTC.
    pub fn timestamp(&self) -> String {
        self.start_time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub timestep: Timestep,
    #[serde(default, deserialize_with = "null_as_default")]
    pub intervals: Vec<Interval>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub timelines: Vec<Timeline>,
}

/// Decoded timelines payload: `{ data: { timelines: [...] } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: TimelineData,
}

/// Explicit `null` decodes like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl TimelineResponse {
    pub fn new(timelines: Vec<Timeline>) -> Self {
        Self {
            data: TimelineData { timelines },
        }
    }

    /// Decode a raw provider payload. A payload without the timelines shape decodes as
    /// an empty response.
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        Self::deserialize(payload).unwrap_or_else(|e| {
            warn!(error = %e, "timelines payload has an unexpected shape");
            Self::default()
        })
    }

    /// Intervals of the first timeline with the given timestep, or an empty slice.
    pub fn intervals(&self, timestep: Timestep) -> &[Interval] {
        self.data
            .timelines
            .iter()
            .find(|t| t.timestep == timestep)
            .map(|t| t.intervals.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Anything other than "metric" selects imperial units.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            None | Some("metric") => Units::Metric,
            Some(_) => Units::Imperial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }

    pub fn wind_speed(&self) -> &'static str {
        match self {
            Units::Metric => "m/s",
            Units::Imperial => "mph",
        }
    }

    pub fn precipitation_rate(&self) -> &'static str {
        match self {
            Units::Metric => "mm/hr",
            Units::Imperial => "in/hr",
        }
    }

    pub fn temperature(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// A resolved location with a display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub coords: Coordinates,
}

impl Place {
    /// A place named after its own coordinates.
    pub fn from_coords(coords: Coordinates) -> Self {
        Self {
            name: coords.to_string(),
            coords,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Notice,
    Warning,
    Danger,
}

/// A hazard derived from a timeline snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub code: String,
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn intervals_of_missing_timestep_is_empty() {
        let response = TimelineResponse::default();
        assert!(response.intervals(Timestep::Hourly).is_empty());
        assert!(response.intervals(Timestep::Current).is_empty());
    }

    #[test]
    fn decodes_provider_payload() {
        let payload = json!({
            "data": {
                "timelines": [
                    {
                        "timestep": "1h",
                        "endTime": "2024-01-16T00:00:00+07:00",
                        "intervals": [
                            {
                                "startTime": "2024-01-15T05:00:00+07:00",
                                "values": { "windSpeed": 4.2, "precipitationProbability": 30 }
                            }
                        ]
                    },
                    { "timestep": "5m", "intervals": [] }
                ]
            },
            "warnings": []
        });

        let response: TimelineResponse =
            serde_json::from_value(payload).expect("payload should decode");
        let hourly = response.intervals(Timestep::Hourly);
        assert_eq!(hourly.len(), 1);
        assert_eq!(hourly[0].values.get(Field::WindSpeed), Some(4.2));
        assert_eq!(hourly[0].values.get(Field::PrecipitationProbability), Some(30.0));
        assert_eq!(hourly[0].values.get(Field::UvIndex), None);
        assert_eq!(hourly[0].timestamp(), "2024-01-15T05:00:00+07:00");
        assert_eq!(response.data.timelines[1].timestep, Timestep::Other);
    }

    #[test]
    fn missing_sections_decode_as_empty() {
        let response: TimelineResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.data.timelines.is_empty());

        let response: TimelineResponse =
            serde_json::from_value(json!({ "data": { "timelines": [{ "timestep": "1d" }] } }))
                .unwrap();
        assert!(response.intervals(Timestep::Daily).is_empty());
    }

    #[test]
    fn null_sections_decode_as_empty() {
        let payload = json!({
            "data": { "timelines": [
                { "timestep": "1m", "intervals": null },
                { "timestep": "1h", "intervals": [
                    { "startTime": "2024-01-15T05:00:00+07:00", "values": { "windSpeed": 20 } },
                    { "startTime": "2024-01-15T06:00:00+07:00", "values": null }
                ]}
            ]}
        });
        let response = TimelineResponse::from_payload(&payload);
        let hourly = response.intervals(Timestep::Hourly);
        assert_eq!(hourly.len(), 2);
        assert!(hourly[1].values.is_empty());

        let response = TimelineResponse::from_payload(&json!({ "data": { "timelines": null } }));
        assert!(response.data.timelines.is_empty());
        let response = TimelineResponse::from_payload(&json!({ "data": null }));
        assert!(response.data.timelines.is_empty());
    }

    #[test]
    fn malformed_payload_decodes_as_empty() {
        let payload = json!({ "data": { "timelines": [{ "timestep": "1h", "intervals": 7 }] } });
        assert_eq!(
            TimelineResponse::from_payload(&payload),
            TimelineResponse::default()
        );
        assert_eq!(
            TimelineResponse::from_payload(&json!("not a payload")),
            TimelineResponse::default()
        );
    }

    #[test]
    fn unknown_timestep_serializes_as_other() {
        let value = serde_json::to_value(Timestep::Other).unwrap();
        assert_eq!(value, "other");
    }

    #[test]
    fn first_timeline_wins_for_repeated_timestep() {
        let payload = json!({
            "data": { "timelines": [
                { "timestep": "current", "intervals": [
                    { "startTime": "2024-01-15T05:00:00Z", "values": { "uvIndex": 3 } }
                ]},
                { "timestep": "current", "intervals": [] }
            ]}
        });
        let response: TimelineResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(response.intervals(Timestep::Current).len(), 1);
    }

    #[test]
    fn non_numeric_value_is_unknown_but_preserved() {
        let values: Values = serde_json::from_value(json!({
            "sunriseTime": "2024-01-15T05:41:00Z",
            "temperature": 28.5
        }))
        .unwrap();

        assert_eq!(values.get(Field::SunriseTime), None);
        assert_eq!(values.get(Field::Temperature), Some(28.5));
        assert_eq!(
            serde_json::to_value(&values).unwrap()["sunriseTime"],
            "2024-01-15T05:41:00Z"
        );
    }

    #[test]
    fn utc_timestamp_uses_z_suffix() {
        let start = DateTime::parse_from_rfc3339("2024-01-15T05:00:00+00:00").unwrap();
        let interval = Interval::new(start, Values::default());
        assert_eq!(interval.timestamp(), "2024-01-15T05:00:00Z");
    }

    #[test]
    fn units_from_param() {
        assert_eq!(Units::from_param(None), Units::Metric);
        assert_eq!(Units::from_param(Some("metric")), Units::Metric);
        assert_eq!(Units::from_param(Some("imperial")), Units::Imperial);
        assert_eq!(Units::from_param(Some("kelvin")), Units::Imperial);
    }

    #[test]
    fn alert_serializes_lowercase_level() {
        let alert = Alert {
            code: "heat".into(),
            level: AlertLevel::Warning,
            title: "Heat".into(),
            message: "Max 36°C today.".into(),
        };
        let value = serde_json::to_value(&alert).unwrap();
        assert_eq!(value["level"], "warning");
        assert_eq!(value["code"], "heat");
    }
}
