//! Rule-based hazard detection over a timelines snapshot.
//!
//! Evaluation is pure: the same snapshot always yields the same alerts, in the order
//! `strong_wind`, `heat`, `freeze`, one rain summary (`heavy_rain` or `possible_rain`),
//! `high_uv`.

use crate::model::{Alert, AlertLevel, Field, Interval, TimelineResponse, Timestep, Units, Values};

/// Number of hourly intervals scanned for short-term hazards.
pub const WINDOW_HOURS: usize = 12;

pub const STRONG_WIND: f64 = 15.0;
pub const HEAVY_RAIN_INTENSITY: f64 = 6.0;
pub const HIGH_PRECIPITATION_PROBABILITY: f64 = 70.0;
pub const HEAT_MAX_TEMPERATURE: f64 = 35.0;
pub const FREEZE_MIN_TEMPERATURE: f64 = 2.0;
pub const HIGH_UV_INDEX: f64 = 8.0;

pub const STRONG_WIND_CODE: &str = "strong_wind";
pub const HEAVY_RAIN_CODE: &str = "heavy_rain";
pub const POSSIBLE_RAIN_CODE: &str = "possible_rain";
pub const HEAT_CODE: &str = "heat";
pub const FREEZE_CODE: &str = "freeze";
pub const HIGH_UV_CODE: &str = "high_uv";

/// Evaluate with metric unit labels.
pub fn evaluate(response: &TimelineResponse) -> Vec<Alert> {
    evaluate_with_units(response, Units::Metric)
}

/// Evaluate a snapshot. `units` only picks the labels used in messages; thresholds are
/// compared against whatever unit system the snapshot was fetched in.
pub fn evaluate_with_units(response: &TimelineResponse, units: Units) -> Vec<Alert> {
    let hourly = response.intervals(Timestep::Hourly);
    let current = response.intervals(Timestep::Current).first();
    let today = response.intervals(Timestep::Daily).first().map(|iv| &iv.values);

    let window = &hourly[..hourly.len().min(WINDOW_HOURS)];
    let scan = window.iter().fold(WindowScan::default(), WindowScan::observe);

    let mut alerts = Vec::new();

    if let Some(iv) = scan.strong_wind {
        alerts.push(strong_wind(iv, units));
    }

    if let Some(today) = today {
        alerts.extend(heat(today, units));
        alerts.extend(freeze(today, units));
    }

    if let Some(iv) = scan.heavy_rain {
        alerts.push(heavy_rain(iv, units));
    } else if let Some(iv) = scan.high_pop {
        alerts.push(possible_rain(iv));
    }

    if let Some(current) = current {
        alerts.extend(high_uv(&current.values));
    }

    alerts
}

/// Evaluate a raw provider payload. Parts that do not have the timelines shape
/// contribute no alerts.
pub fn evaluate_json(payload: &serde_json::Value, units: Units) -> Vec<Alert> {
    evaluate_with_units(&TimelineResponse::from_payload(payload), units)
}

/// First-match accumulators over the hourly window.
#[derive(Debug, Default, Clone, Copy)]
struct WindowScan<'a> {
    strong_wind: Option<&'a Interval>,
    heavy_rain: Option<&'a Interval>,
    high_pop: Option<&'a Interval>,
}

impl<'a> WindowScan<'a> {
    fn observe(self, iv: &'a Interval) -> Self {
        let v = &iv.values;
        Self {
            strong_wind: self
                .strong_wind
                .or_else(|| (v.get_or_zero(Field::WindSpeed) >= STRONG_WIND).then_some(iv)),
            heavy_rain: self.heavy_rain.or_else(|| {
                (v.get_or_zero(Field::PrecipitationIntensity) >= HEAVY_RAIN_INTENSITY)
                    .then_some(iv)
            }),
            high_pop: self.high_pop.or_else(|| {
                (v.get_or_zero(Field::PrecipitationProbability)
                    >= HIGH_PRECIPITATION_PROBABILITY)
                    .then_some(iv)
            }),
        }
    }
}

fn strong_wind(iv: &Interval, units: Units) -> Alert {
    let speed = round_half_up(iv.values.get_or_zero(Field::WindSpeed));
    Alert {
        code: STRONG_WIND_CODE.to_string(),
        level: AlertLevel::Warning,
        title: "Strong Wind".to_string(),
        message: format!(
            "Wind around {speed} {} at {}.",
            units.wind_speed(),
            iv.timestamp()
        ),
    }
}

fn heavy_rain(iv: &Interval, units: Units) -> Alert {
    let intensity = iv.values.get_or_zero(Field::PrecipitationIntensity);
    let pop = round_half_up(iv.values.get_or_zero(Field::PrecipitationProbability));
    Alert {
        code: HEAVY_RAIN_CODE.to_string(),
        level: AlertLevel::Danger,
        title: "Heavy Rain".to_string(),
        message: format!(
            "Heavy rain around {intensity} {} (POP {pop}%) at {}.",
            units.precipitation_rate(),
            iv.timestamp()
        ),
    }
}

fn possible_rain(iv: &Interval) -> Alert {
    let pop = round_half_up(iv.values.get_or_zero(Field::PrecipitationProbability));
    Alert {
        code: POSSIBLE_RAIN_CODE.to_string(),
        level: AlertLevel::Notice,
        title: "High Chance of Rain".to_string(),
        message: format!("{pop}% chance of rain within {WINDOW_HOURS} hours."),
    }
}

fn heat(today: &Values, units: Units) -> Option<Alert> {
    let max = today
        .get(Field::TemperatureMax)
        .filter(|t| *t >= HEAT_MAX_TEMPERATURE)?;
    Some(Alert {
        code: HEAT_CODE.to_string(),
        level: AlertLevel::Warning,
        title: "Heat".to_string(),
        message: format!(
            "Maximum temperature {}{} today.",
            round_half_up(max),
            units.temperature()
        ),
    })
}

fn freeze(today: &Values, units: Units) -> Option<Alert> {
    let min = today
        .get(Field::TemperatureMin)
        .filter(|t| *t <= FREEZE_MIN_TEMPERATURE)?;
    Some(Alert {
        code: FREEZE_CODE.to_string(),
        level: AlertLevel::Warning,
        title: "Low Temperature".to_string(),
        message: format!(
            "Minimum temperature {}{} today.",
            round_half_up(min),
            units.temperature()
        ),
    })
}

fn high_uv(current: &Values) -> Option<Alert> {
    let uv = current.get(Field::UvIndex).filter(|uv| *uv >= HIGH_UV_INDEX)?;
    Some(Alert {
        code: HIGH_UV_CODE.to_string(),
        level: AlertLevel::Notice,
        title: "High UV".to_string(),
        message: format!("UV index {uv}. Use sunscreen."),
    })
}

/// Rounds halves toward positive infinity, so 2.5 -> 3 and -2.5 -> -2.
fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}
