use thiserror::Error;

use crate::provider::ProviderId;

/// Failures talking to one of the upstream services.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} request failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} responded with status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("no API key configured for provider '{0}'")]
    MissingApiKey(ProviderId),
}

impl UpstreamError {
    pub(crate) fn request(service: &'static str, source: reqwest::Error) -> Self {
        Self::Request { service, source }
    }

    /// Upstream HTTP status, when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Keep upstream error bodies short enough for logs and error responses.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_bodies() {
        let body = "x".repeat(300);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let body = format!("{}°C", "a".repeat(199));
        let truncated = truncate_body(&body);
        assert!(truncated.starts_with(&"a".repeat(199)));
    }

    #[test]
    fn status_error_message_and_code() {
        let err = UpstreamError::Status {
            service: "timelines",
            status: 429,
            body: "too many calls".into(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(
            err.to_string(),
            "timelines responded with status 429: too many calls"
        );
    }

    #[test]
    fn missing_key_names_provider() {
        let err = UpstreamError::MissingApiKey(ProviderId::OpenAi);
        assert_eq!(err.to_string(), "no API key configured for provider 'openai'");
        assert_eq!(err.status(), None);
    }
}
