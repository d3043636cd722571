//! Remote speech-to-text client.
//!
//! Performs exactly one multipart HTTP call per segment against an
//! OpenAI-compatible `audio/transcriptions` endpoint. Retry and
//! continuation policy live in the orchestrator, never here.

use std::future::Future;

use serde::Deserialize;

// ── Options ────────────────────────────────────────────────────────────────────

/// Hard limit the endpoint imposes on the optional prompt text.
pub const MAX_PROMPT_CHARS: usize = 224;

/// Requested shape of the transcription response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Plain text body, no structure.
    Text,
    /// JSON object with a `text` field.
    Json,
    /// JSON object with `text` plus timing arrays, detected language and
    /// duration.
    VerboseJson,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::VerboseJson => "verbose_json",
        }
    }

    /// Parse the wire/env spelling. Returns `None` for anything unknown.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "verbose_json" => Some(Self::VerboseJson),
            _ => None,
        }
    }
}

/// Timing resolution requested alongside [`ResponseFormat::VerboseJson`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampGranularity {
    Segment,
    Word,
}

impl TimestampGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Word => "word",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "segment" => Some(Self::Segment),
            "word" => Some(Self::Word),
            _ => None,
        }
    }
}

/// Immutable configuration bag passed into every per-segment call.
#[derive(Debug, Clone)]
pub struct TranscriptionOptions {
    /// Remote model identifier, e.g. `whisper-1`.
    pub model: String,
    /// ISO 639-1 language hint. `None` means the endpoint auto-detects;
    /// in that case the field is omitted from the request entirely.
    pub language: Option<String>,
    /// Optional steering prompt, at most [`MAX_PROMPT_CHARS`] characters.
    pub prompt: Option<String>,
    pub response_format: ResponseFormat,
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f32,
    /// Only sent when `response_format` is [`ResponseFormat::VerboseJson`].
    pub timestamp_granularities: Vec<TimestampGranularity>,
    /// Segment size used when the orchestrator decides to chunk.
    pub chunk_size_bytes: u64,
    /// Informational only: recorded alongside the run but never subtracted
    /// from adjacent segment boundaries and never used to de-duplicate text
    /// across chunk edges.
    pub chunk_overlap_secs: f64,
    /// Force chunked dispatch even below the single-payload limit.
    pub force_chunking: bool,
}

impl TranscriptionOptions {
    /// Check the value-range invariants before any network activity.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if let Some(prompt) = &self.prompt {
            let chars = prompt.chars().count();
            if chars > MAX_PROMPT_CHARS {
                return Err(OptionsError::PromptTooLong { chars });
            }
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(OptionsError::TemperatureOutOfRange(self.temperature));
        }
        Ok(())
    }
}

/// A [`TranscriptionOptions`] value violated its range invariants.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsError {
    PromptTooLong { chars: usize },
    TemperatureOutOfRange(f32),
}

impl std::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PromptTooLong { chars } => {
                write!(f, "prompt is {chars} characters, limit is {MAX_PROMPT_CHARS}")
            }
            Self::TemperatureOutOfRange(t) => {
                write!(f, "temperature {t} outside [0, 1]")
            }
        }
    }
}

impl std::error::Error for OptionsError {}

// ── Request / response types ───────────────────────────────────────────────────

/// One binary segment handed to the remote endpoint. Bytes are borrowed from
/// the source file; the client copies them into the multipart body itself.
#[derive(Debug)]
pub struct SegmentPayload<'a> {
    pub bytes: &'a [u8],
    /// Upload file name; the endpoint uses its extension for container
    /// detection.
    pub file_name: String,
    pub media_type: String,
}

/// Normalized result of one transcription call. For structured formats the
/// timing arrays are surfaced as-is — pass-through, no further processing.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionOutput {
    pub text: String,
    pub language: Option<String>,
    pub duration: Option<f64>,
    pub segments: Option<serde_json::Value>,
    pub words: Option<serde_json::Value>,
}

/// Body shape of a successful structured response. Every field is optional
/// so one deserialization covers both `json` and `verbose_json`.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    text: Option<String>,
    language: Option<String>,
    duration: Option<f64>,
    segments: Option<serde_json::Value>,
    words: Option<serde_json::Value>,
}

/// Error envelope many OpenAI-compatible servers return on failure.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

// ── Error ──────────────────────────────────────────────────────────────────────

/// Typed failure of one transcription call.
#[derive(Debug)]
pub enum ClientError {
    /// The request never produced a usable response (connect, TLS, body
    /// read, or multipart construction failure).
    Transport(reqwest::Error),
    /// The endpoint answered with a non-success status.
    Remote { status: u16, message: String },
    /// The endpoint answered successfully but supplied no transcribed text.
    EmptyResult,
    /// A success response that was not valid JSON for a structured format.
    MalformedResponse(serde_json::Error),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Remote { status, message } => {
                write!(f, "remote error {status}: {message}")
            }
            Self::EmptyResult => write!(f, "endpoint returned no transcribable text"),
            Self::MalformedResponse(e) => write!(f, "malformed response body: {e}"),
        }
    }
}

impl std::error::Error for ClientError {}

// ── Transcriber seam ───────────────────────────────────────────────────────────

/// The one operation the orchestrator needs from a transcription backend.
/// Implemented by [`TranscriptionClient`] for the real endpoint and by
/// scripted fakes in tests.
pub trait Transcribe {
    fn transcribe(
        &self,
        payload: SegmentPayload<'_>,
        options: &TranscriptionOptions,
    ) -> impl Future<Output = Result<TranscriptionOutput, ClientError>> + Send;
}

// ── HTTP client ────────────────────────────────────────────────────────────────

/// Client for an OpenAI-compatible transcription endpoint.
///
/// Endpoint URL and credential are injected at construction — nothing is
/// read from ambient state, so tests and alternative deployments can point
/// it anywhere.
#[derive(Debug, Clone)]
pub struct TranscriptionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl TranscriptionClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

impl Transcribe for TranscriptionClient {
    /// Exactly one outbound call per invocation.
    ///
    /// The multipart form carries the binary segment, the model identifier,
    /// the optional language hint (omitted entirely for auto-detect), the
    /// optional prompt, the response format and temperature, and — only for
    /// the verbose format — the requested timestamp granularities.
    async fn transcribe(
        &self,
        payload: SegmentPayload<'_>,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionOutput, ClientError> {
        let part = reqwest::multipart::Part::bytes(payload.bytes.to_vec())
            .file_name(payload.file_name.clone())
            .mime_str(&payload.media_type)
            .map_err(ClientError::Transport)?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", options.model.clone())
            .text("response_format", options.response_format.as_str())
            .text("temperature", options.temperature.to_string());

        if let Some(language) = &options.language {
            form = form.text("language", language.clone());
        }
        if let Some(prompt) = &options.prompt {
            form = form.text("prompt", prompt.clone());
        }
        if options.response_format == ResponseFormat::VerboseJson {
            for granularity in &options.timestamp_granularities {
                form = form.text("timestamp_granularities[]", granularity.as_str());
            }
        }

        let mut request = self.http.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(ClientError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(ClientError::Transport)?;

        parse_response(options.response_format, status.as_u16(), status.is_success(), &body)
    }
}

/// Turn a raw status + body into a normalized output. Pure, so the mapping
/// rules are testable without a live endpoint.
fn parse_response(
    format: ResponseFormat,
    status: u16,
    success: bool,
    body: &str,
) -> Result<TranscriptionOutput, ClientError> {
    if !success {
        return Err(ClientError::Remote {
            status,
            message: extract_error_message(body),
        });
    }

    match format {
        ResponseFormat::Text => {
            let text = body.trim();
            if text.is_empty() {
                Err(ClientError::EmptyResult)
            } else {
                Ok(TranscriptionOutput {
                    text: text.to_string(),
                    ..TranscriptionOutput::default()
                })
            }
        }
        ResponseFormat::Json | ResponseFormat::VerboseJson => {
            let parsed: ApiResponse =
                serde_json::from_str(body).map_err(ClientError::MalformedResponse)?;
            let text = parsed.text.unwrap_or_default();
            if text.trim().is_empty() {
                return Err(ClientError::EmptyResult);
            }
            Ok(TranscriptionOutput {
                text,
                language: parsed.language,
                duration: parsed.duration,
                segments: parsed.segments,
                words: parsed.words,
            })
        }
    }
}

/// Pull a human-readable message out of an error body: the standard
/// `{"error":{"message":…}}` envelope when present, the raw body otherwise.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
