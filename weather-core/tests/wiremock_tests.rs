//! Upstream client behaviour against mock HTTP servers.

use weather_core::{
    ChatConfig, ChatModel, Coordinates, Field, Geocoder, GeocoderConfig, NominatimGeocoder,
    OpenAiChat, TimelineProvider, TimelineResponse, TimelinesConfig, Timestep, TomorrowClient,
    Units, UpstreamError, WeatherContext,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path, query_param},
};

fn sample_timelines() -> serde_json::Value {
    serde_json::json!({
        "data": {
            "timelines": [
                {
                    "timestep": "current",
                    "startTime": "2024-01-15T12:00:00+07:00",
                    "endTime": "2024-01-15T12:00:00+07:00",
                    "intervals": [
                        {
                            "startTime": "2024-01-15T12:00:00+07:00",
                            "values": { "temperature": 31.2, "uvIndex": 9, "windSpeed": 3.1 }
                        }
                    ]
                },
                {
                    "timestep": "1h",
                    "intervals": [
                        {
                            "startTime": "2024-01-15T12:00:00+07:00",
                            "values": { "precipitationProbability": 85, "precipitationIntensity": 1.2 }
                        },
                        {
                            "startTime": "2024-01-15T13:00:00+07:00",
                            "values": { "precipitationProbability": 90, "precipitationIntensity": 8.4 }
                        }
                    ]
                },
                {
                    "timestep": "1d",
                    "intervals": [
                        {
                            "startTime": "2024-01-15T06:00:00+07:00",
                            "values": {
                                "temperatureMax": 33.0,
                                "temperatureMin": 24.0,
                                "sunriseTime": "2024-01-14T22:51:00Z"
                            }
                        }
                    ]
                }
            ]
        }
    })
}

fn timelines_client(server: &MockServer, key: Option<&str>) -> TomorrowClient {
    let config = TimelinesConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        ..Default::default()
    };
    #[allow(clippy::expect_used)]
    TomorrowClient::new(key.map(str::to_owned), config).expect("Failed to create client")
}

// ============================================================================
// Timelines
// ============================================================================

#[tokio::test]
async fn timelines_request_carries_location_units_and_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/timelines"))
        .and(query_param("location", "-6.2,106.8"))
        .and(query_param("timesteps", "current,1h,1d"))
        .and(query_param("units", "imperial"))
        .and(query_param("timezone", "Asia/Jakarta"))
        .and(query_param("apikey", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_timelines()))
        .expect(1)
        .mount(&server)
        .await;

    let client = timelines_client(&server, Some("secret"));
    let payload = client
        .fetch_timelines(Coordinates::new(-6.2, 106.8), Units::Imperial)
        .await
        .expect("timelines should decode");

    // Passed through untouched, timeline-level fields included.
    assert_eq!(payload, sample_timelines());

    let response = TimelineResponse::from_payload(&payload);
    assert_eq!(response.intervals(Timestep::Hourly).len(), 2);
    assert_eq!(
        response.intervals(Timestep::Current)[0]
            .values
            .get(Field::UvIndex),
        Some(9.0)
    );
}

#[tokio::test]
async fn timelines_feed_the_evaluator() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/timelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sample_timelines()))
        .mount(&server)
        .await;

    let payload = timelines_client(&server, Some("k"))
        .fetch_timelines(Coordinates::new(-6.2, 106.8), Units::Metric)
        .await
        .unwrap();

    let codes: Vec<String> = weather_core::evaluate_json(&payload, Units::Metric)
        .into_iter()
        .map(|a| a.code)
        .collect();
    assert_eq!(codes, vec!["heavy_rain", "high_uv"]);
}

#[tokio::test]
async fn timelines_with_null_parts_still_yield_alerts() {
    let server = MockServer::start().await;

    let payload = serde_json::json!({
        "data": { "timelines": [
            { "timestep": "current", "intervals": [
                { "startTime": "2024-01-15T12:00:00+07:00", "values": { "uvIndex": 9 } }
            ]},
            { "timestep": "1h", "intervals": [
                { "startTime": "2024-01-15T12:00:00+07:00", "values": { "windSpeed": 20 } },
                { "startTime": "2024-01-15T13:00:00+07:00", "values": null }
            ]},
            { "timestep": "1m", "intervals": null }
        ]}
    });
    Mock::given(method("GET"))
        .and(path("/timelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&payload))
        .mount(&server)
        .await;

    let fetched = timelines_client(&server, Some("k"))
        .fetch_timelines(Coordinates::new(-6.2, 106.8), Units::Metric)
        .await
        .expect("null parts are not a fetch failure");

    let codes: Vec<String> = weather_core::evaluate_json(&fetched, Units::Metric)
        .into_iter()
        .map(|a| a.code)
        .collect();
    assert_eq!(codes, vec!["strong_wind", "high_uv"]);
}

#[tokio::test]
async fn timelines_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/timelines"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Calls"))
        .mount(&server)
        .await;

    let err = timelines_client(&server, Some("k"))
        .fetch_timelines(Coordinates::new(0.0, 0.0), Units::Metric)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert!(err.to_string().contains("Too Many Calls"));
}

#[tokio::test]
async fn timelines_invalid_json_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/timelines"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = timelines_client(&server, Some("k"))
        .fetch_timelines(Coordinates::new(0.0, 0.0), Units::Metric)
        .await
        .unwrap_err();

    assert!(matches!(err, UpstreamError::Decode { .. }));
}

// ============================================================================
// Geocoder
// ============================================================================

fn geocoder(server: &MockServer) -> NominatimGeocoder {
    let config = GeocoderConfig {
        base_url: server.uri(),
        user_agent: "weather-dashboard-tests/1.0".into(),
        timeout_secs: 5,
    };
    #[allow(clippy::expect_used)]
    NominatimGeocoder::new(config).expect("Failed to create geocoder")
}

#[tokio::test]
async fn geocoder_returns_first_hit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Jakarta"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .and(header("user-agent", "weather-dashboard-tests/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "lat": "-6.1753942", "lon": "106.827183", "display_name": "Jakarta, Indonesia" },
            { "lat": "0", "lon": "0", "display_name": "Elsewhere" }
        ])))
        .mount(&server)
        .await;

    let place = geocoder(&server)
        .search("Jakarta")
        .await
        .unwrap()
        .expect("Jakarta should resolve");

    assert_eq!(place.name, "Jakarta, Indonesia");
    assert!((place.coords.lat - -6.175_394_2).abs() < 1e-9);
    assert!((place.coords.lon - 106.827_183).abs() < 1e-9);
}

#[tokio::test]
async fn geocoder_empty_result_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    assert!(geocoder(&server).search("Atlantis").await.unwrap().is_none());
}

#[tokio::test]
async fn geocoder_falls_back_to_query_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "lat": "1.5", "lon": "2.5" }
        ])))
        .mount(&server)
        .await;

    let place = geocoder(&server).search("Somewhere").await.unwrap().unwrap();
    assert_eq!(place.name, "Somewhere");
}

#[tokio::test]
async fn geocoder_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = geocoder(&server).search("Jakarta").await.unwrap_err();
    assert_eq!(err.status(), Some(503));
}

// ============================================================================
// Chat
// ============================================================================

fn chat(server: &MockServer) -> OpenAiChat {
    let config = ChatConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        ..Default::default()
    };
    #[allow(clippy::expect_used)]
    OpenAiChat::new("sk-test".into(), config).expect("Failed to create chat client")
}

fn context() -> WeatherContext {
    WeatherContext::new("Jakarta".into(), &TimelineResponse::default(), vec![])
}

#[tokio::test]
async fn chat_sends_prompt_and_returns_first_choice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "max_tokens": 300
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [ { "message": { "role": "assistant", "content": "Bring an umbrella." } } ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let answer = chat(&server)
        .answer("Will it rain?", &context())
        .await
        .unwrap();
    assert_eq!(answer, "Bring an umbrella.");
}

#[tokio::test]
async fn chat_without_choices_is_empty_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
        .mount(&server)
        .await;

    let answer = chat(&server).answer("?", &context()).await.unwrap();
    assert_eq!(answer, "");
}

#[tokio::test]
async fn chat_error_status_keeps_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = chat(&server).answer("?", &context()).await.unwrap_err();
    match err {
        UpstreamError::Status { status, body, .. } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("unexpected error: {other}"),
    }
}
