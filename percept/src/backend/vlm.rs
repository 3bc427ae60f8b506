//! Vision-language-model back end.
//!
//! The expensive recognition approach: frames are sent to a local
//! OpenAI-compatible inference server (SmolVLM behind llama-server or
//! similar) as base64-embedded images in a chat-completion request, and the
//! model's text reply is parsed into a [`GestureResult`]. `start` verifies
//! the server is reachable; the model itself lives in the server process.

use std::time::Instant;

use base64::Engine as _;
use serde_json::json;

use super::{
    Backend, BackendError, BackendLifecycle, Frame, Gesture, GestureResult, HandObservation,
    HandSide,
};
use crate::metrics::{MetricsSample, SysinfoProbe, SystemProbe};

/// Default model identifier requested from the server.
pub const DEFAULT_MODEL: &str = "HuggingFaceTB/SmolVLM-Instruct";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Prompt asking the model for the observations the engine reports.
const PROMPT: &str = "Look at this image. How many hands do you see? For each \
hand, say whether it is a left or right hand, how many fingers are up, and \
whether it shows a thumbs up or thumbs down gesture. If there are no hands, \
say 'no hands'.";

/// Trait for HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait HttpClient: Send {
    /// Performs an HTTP GET request, returning the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>, BackendError>;

    /// Performs an HTTP POST with a JSON body, returning the response body.
    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<Vec<u8>, BackendError>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new client with the default request timeout.
    pub fn new() -> Result<Self, BackendError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new client with a custom request timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BackendError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    fn check_status(url: &str, response: reqwest::blocking::Response) -> Result<Vec<u8>, BackendError> {
        if !response.status().is_success() {
            return Err(BackendError::Http(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| BackendError::Http(format!("failed to read response: {e}")))
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, BackendError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| BackendError::Http(format!("request failed: {e}")))?;
        Self::check_status(url, response)
    }

    fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<Vec<u8>, BackendError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|e| BackendError::Http(format!("request failed: {e}")))?;
        Self::check_status(url, response)
    }
}

/// Connection settings for the inference server.
#[derive(Debug, Clone)]
pub struct VlmConfig {
    /// Server base URL, e.g. `http://127.0.0.1:8080`.
    pub endpoint: String,

    /// Model identifier sent with each request.
    pub model: String,
}

impl VlmConfig {
    /// Config for the given endpoint with the default model.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// VLM inference back end over an HTTP client.
pub struct VlmBackend<C: HttpClient> {
    config: VlmConfig,
    client: C,
    probe: Box<dyn SystemProbe>,
    lifecycle: BackendLifecycle,
}

impl<C: HttpClient> VlmBackend<C> {
    /// Create a back end probing the real host.
    pub fn new(config: VlmConfig, client: C) -> Self {
        Self::with_probe(config, client, Box::new(SysinfoProbe::new()))
    }

    /// Create with an injected probe.
    pub fn with_probe(config: VlmConfig, client: C, probe: Box<dyn SystemProbe>) -> Self {
        Self {
            config,
            client,
            probe,
            lifecycle: BackendLifecycle::Uninitialized,
        }
    }

    fn chat_request(&self, frame: &Frame) -> serde_json::Value {
        let image = base64::engine::general_purpose::STANDARD.encode(&frame.payload);
        json!({
            "model": self.config.model,
            "max_tokens": 128,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": PROMPT },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/jpeg;base64,{image}") }
                    }
                ]
            }]
        })
    }

    fn extract_reply(body: &[u8]) -> Result<String, BackendError> {
        let response: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| BackendError::Process(format!("malformed server response: {e}")))?;
        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                BackendError::Process("server response has no message content".to_string())
            })
    }
}

impl<C: HttpClient> Backend for VlmBackend<C> {
    fn name(&self) -> &'static str {
        "vlm"
    }

    fn lifecycle(&self) -> BackendLifecycle {
        self.lifecycle
    }

    fn start(&mut self) -> Result<(), BackendError> {
        if self.lifecycle == BackendLifecycle::Running {
            return Err(BackendError::InvalidState {
                operation: "start",
                state: self.lifecycle,
            });
        }
        self.lifecycle = BackendLifecycle::Starting;
        tracing::info!(endpoint = %self.config.endpoint, "checking VLM server health");

        let health_url = format!("{}/health", self.config.endpoint);
        if let Err(e) = self.client.get(&health_url) {
            self.lifecycle = BackendLifecycle::Failed;
            return Err(BackendError::Start(format!(
                "VLM server not reachable at {}: {e}",
                self.config.endpoint
            )));
        }

        self.lifecycle = BackendLifecycle::Running;
        tracing::info!(model = %self.config.model, "VLM backend running");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.lifecycle = BackendLifecycle::Stopping;
        // The model lives in the server process; there is nothing local to
        // release beyond the connection pool dropped with the client.
        self.lifecycle = BackendLifecycle::Stopped;
        tracing::debug!("VLM backend stopped");
        Ok(())
    }

    fn process(&mut self, frame: &Frame) -> Result<(GestureResult, MetricsSample), BackendError> {
        if self.lifecycle != BackendLifecycle::Running {
            return Err(BackendError::InvalidState {
                operation: "process",
                state: self.lifecycle,
            });
        }

        let started = Instant::now();
        let url = format!("{}/v1/chat/completions", self.config.endpoint);
        let body = self.client.post_json(&url, &self.chat_request(frame))?;
        let reply = Self::extract_reply(&body)?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let result = parse_reply(&reply);
        let reading = self.probe.read();
        let sample = MetricsSample::derived(latency_ms, reading.cpu_percent, reading.memory_mb);
        Ok((result, sample))
    }
}

/// Parse the model's free-text reply into structured observations.
///
/// Keyword matching over the lowercased reply; a reply mentioning no hands
/// (or none of the expected vocabulary) yields an empty result with the raw
/// text preserved for logging.
fn parse_reply(reply: &str) -> GestureResult {
    let text = reply.to_lowercase();

    if text.contains("no hand") || !text.contains("hand") {
        return GestureResult {
            hands: Vec::new(),
            raw_response: Some(reply.to_string()),
        };
    }

    let side = if text.contains("left") {
        HandSide::Left
    } else {
        HandSide::Right
    };

    let gesture = if text.contains("thumbs up") || text.contains("thumbs-up") {
        Gesture::ThumbsUp
    } else if text.contains("thumbs down") || text.contains("thumbs-down") {
        Gesture::ThumbsDown
    } else {
        Gesture::None
    };

    GestureResult {
        hands: vec![HandObservation {
            side,
            fingers_up: parse_finger_count(&text),
            gesture,
        }],
        raw_response: Some(reply.to_string()),
    }
}

/// Pull a finger count (0-5) out of the reply text.
fn parse_finger_count(text: &str) -> u8 {
    const WORDS: [(&str, u8); 6] = [
        ("zero", 0),
        ("one", 1),
        ("two", 2),
        ("three", 3),
        ("four", 4),
        ("five", 5),
    ];

    if let Some(digit) = text
        .chars()
        .find(|c| c.is_ascii_digit())
        .and_then(|c| c.to_digit(10))
    {
        if digit <= 5 {
            return digit as u8;
        }
    }

    for (word, count) in WORDS {
        if text.contains(word) {
            return count;
        }
    }

    0
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::metrics::FixedProbe;

    /// Mock HTTP client for testing.
    pub struct MockHttpClient {
        pub get_response: Result<Vec<u8>, BackendError>,
        pub post_response: Result<Vec<u8>, BackendError>,
    }

    impl MockHttpClient {
        pub fn healthy_with_reply(reply: &str) -> Self {
            let body = json!({
                "choices": [{ "message": { "content": reply } }]
            });
            Self {
                get_response: Ok(b"ok".to_vec()),
                post_response: Ok(serde_json::to_vec(&body).unwrap()),
            }
        }

        pub fn unreachable() -> Self {
            Self {
                get_response: Err(BackendError::Http("connection refused".to_string())),
                post_response: Err(BackendError::Http("connection refused".to_string())),
            }
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, _url: &str) -> Result<Vec<u8>, BackendError> {
            self.get_response.clone()
        }

        fn post_json(
            &self,
            _url: &str,
            _body: &serde_json::Value,
        ) -> Result<Vec<u8>, BackendError> {
            self.post_response.clone()
        }
    }

    fn test_backend(client: MockHttpClient) -> VlmBackend<MockHttpClient> {
        VlmBackend::with_probe(
            VlmConfig::new("http://127.0.0.1:8080"),
            client,
            Box::new(FixedProbe::new(Some(75.0), Some(1500.0))),
        )
    }

    #[test]
    fn test_start_health_checks_server() {
        let mut backend = test_backend(MockHttpClient::healthy_with_reply("no hands"));
        backend.start().unwrap();
        assert_eq!(backend.lifecycle(), BackendLifecycle::Running);
    }

    #[test]
    fn test_start_fails_when_server_unreachable() {
        let mut backend = test_backend(MockHttpClient::unreachable());
        let err = backend.start().unwrap_err();
        assert!(matches!(err, BackendError::Start(_)));
        assert_eq!(backend.lifecycle(), BackendLifecycle::Failed);
    }

    #[test]
    fn test_stop_is_safe_after_failure() {
        let mut backend = test_backend(MockHttpClient::unreachable());
        let _ = backend.start();
        backend.stop().unwrap();
        assert_eq!(backend.lifecycle(), BackendLifecycle::Stopped);
    }

    #[test]
    fn test_process_parses_model_reply() {
        let mut backend = test_backend(MockHttpClient::healthy_with_reply(
            "I see one right hand with 1 finger up showing a thumbs up gesture.",
        ));
        backend.start().unwrap();

        let frame = Frame::new(0, vec![0xFF, 0xD8]);
        let (result, sample) = backend.process(&frame).unwrap();
        assert_eq!(result.hands_detected(), 1);
        assert_eq!(result.hands[0].side, HandSide::Right);
        assert_eq!(result.hands[0].gesture, Gesture::ThumbsUp);
        assert_eq!(result.hands[0].fingers_up, 1);
        assert!(result.raw_response.is_some());
        assert_eq!(sample.cpu_percent, Some(75.0));
    }

    #[test]
    fn test_process_http_failure_is_recoverable() {
        let mut backend = test_backend(MockHttpClient {
            get_response: Ok(b"ok".to_vec()),
            post_response: Err(BackendError::Http("timeout".to_string())),
        });
        backend.start().unwrap();

        let frame = Frame::new(0, vec![]);
        let err = backend.process(&frame).unwrap_err();
        assert!(matches!(err, BackendError::Http(_)));
        // Still running; the frame is simply skipped by the caller.
        assert_eq!(backend.lifecycle(), BackendLifecycle::Running);
    }

    #[test]
    fn test_process_malformed_server_response() {
        let mut backend = test_backend(MockHttpClient {
            get_response: Ok(b"ok".to_vec()),
            post_response: Ok(b"not json".to_vec()),
        });
        backend.start().unwrap();

        let frame = Frame::new(0, vec![]);
        let err = backend.process(&frame).unwrap_err();
        assert!(matches!(err, BackendError::Process(_)));
    }

    #[test]
    fn test_parse_reply_no_hands() {
        let result = parse_reply("There are no hands in this image.");
        assert_eq!(result.hands_detected(), 0);
    }

    #[test]
    fn test_parse_reply_left_hand_thumbs_down() {
        let result = parse_reply("A left hand showing a thumbs down.");
        assert_eq!(result.hands[0].side, HandSide::Left);
        assert_eq!(result.hands[0].gesture, Gesture::ThumbsDown);
    }

    #[test]
    fn test_parse_reply_word_number() {
        let result = parse_reply("A right hand with three fingers raised.");
        assert_eq!(result.hands[0].fingers_up, 3);
    }

    #[test]
    fn test_parse_reply_unrelated_text() {
        let result = parse_reply("The image shows a sunset over the ocean.");
        assert_eq!(result.hands_detected(), 0);
        assert!(result.raw_response.unwrap().contains("sunset"));
    }
}
