//! Weather-grounded chat answers from an OpenAI-compatible completion endpoint.

use std::{fmt::Debug, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    error::{UpstreamError, truncate_body},
    model::{Alert, Interval, TimelineResponse, Timestep, Values},
};

/// Service name carried by chat upstream errors.
pub const SERVICE: &str = "chat";

/// Hourly intervals handed to the model.
pub const CONTEXT_HOURS: usize = 8;
/// Daily intervals handed to the model.
pub const CONTEXT_DAYS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Language the assistant answers in.
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 300,
            language: "Indonesian".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Snapshot summary the model answers from, also returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherContext {
    pub location: String,
    pub current: Values,
    pub hourly: Vec<HourSummary>,
    pub daily: Vec<DaySummary>,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourSummary {
    pub time: String,
    #[serde(flatten)]
    pub values: Values,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: String,
    #[serde(flatten)]
    pub values: Values,
}

impl WeatherContext {
    pub fn new(location: String, response: &TimelineResponse, alerts: Vec<Alert>) -> Self {
        let current = response
            .intervals(Timestep::Current)
            .first()
            .map(|iv| iv.values.clone())
            .unwrap_or_default();

        let hourly = head(response.intervals(Timestep::Hourly), CONTEXT_HOURS)
            .iter()
            .map(|iv| HourSummary {
                time: iv.timestamp(),
                values: iv.values.clone(),
            })
            .collect();

        let daily = head(response.intervals(Timestep::Daily), CONTEXT_DAYS)
            .iter()
            .map(|iv| DaySummary {
                date: iv.timestamp(),
                values: iv.values.clone(),
            })
            .collect();

        Self {
            location,
            current,
            hourly,
            daily,
            alerts,
        }
    }
}

fn head(intervals: &[Interval], n: usize) -> &[Interval] {
    &intervals[..intervals.len().min(n)]
}

pub fn system_prompt(language: &str) -> String {
    format!(
        "You are a brief, practical weather assistant. Answer in {language}. \
         Give concrete recommendations (for example: bring an umbrella, postpone a morning run) \
         with a short reason based on the weather data provided. \
         Do not make claims beyond the data."
    )
}

pub fn user_prompt(question: &str, context: &WeatherContext) -> Result<String, serde_json::Error> {
    let data = serde_json::to_string(context)?;
    Ok(format!("{question}\n\nWeather data summary (JSON):\n{data}"))
}

/// Generates an answer for a question given a weather context.
#[async_trait]
pub trait ChatModel: Send + Sync + Debug {
    async fn answer(
        &self,
        question: &str,
        context: &WeatherContext,
    ) -> Result<String, UpstreamError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiChat {
    api_key: String,
    config: ChatConfig,
    http: Client,
}

impl OpenAiChat {
    pub fn new(api_key: String, config: ChatConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client for the chat provider")?;
        Ok(Self {
            api_key,
            config,
            http,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    #[instrument(skip(self, context))]
    async fn answer(
        &self,
        question: &str,
        context: &WeatherContext,
    ) -> Result<String, UpstreamError> {
        let system = system_prompt(&self.config.language);
        let user = user_prompt(question, context).map_err(|e| UpstreamError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
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

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Decode {
                service: SERVICE,
                message: e.to_string(),
            })?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        debug!(model = %self.config.model, chars = answer.len(), "chat answer received");
        Ok(answer)
    }
}
