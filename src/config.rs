use std::env;

use crate::client::{ResponseFormat, TimestampGranularity, TranscriptionOptions};
use crate::continuation::ContinuationPolicy;
use crate::orchestrator::PayloadLimits;

// ── Error ──────────────────────────────────────────────────────────────────────

/// Errors that can occur while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An environment variable contained an unparseable value.
    Parse {
        var: &'static str,
        raw: String,
        expected: &'static str,
    },
    /// A value was parsed successfully but violated a business-rule constraint.
    InvalidValue {
        var: &'static str,
        message: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse { var, raw, expected } => {
                write!(f, "env {var}={raw:?} — expected {expected}")
            }
            Self::InvalidValue { var, message } => {
                write!(f, "env {var}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ── Config ─────────────────────────────────────────────────────────────────────

/// Centralised application configuration.
///
/// All fields are populated from environment variables with hardcoded
/// defaults. Call [`Config::load`] once at startup — it validates every
/// value eagerly so any misconfiguration is reported before any network
/// activity. Everything downstream (client, orchestrator) receives its
/// values through constructors; nothing reads the environment past this
/// point.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Remote endpoint ───────────────────────────────────────────────────────
    /// Full transcription endpoint URL.
    /// Env: `TRANSCRIBE_API_URL` · Default: OpenAI `audio/transcriptions`
    pub api_url: String,

    /// Bearer credential for the endpoint. Absent means unauthenticated
    /// (self-hosted OpenAI-compatible servers).
    /// Env: `TRANSCRIBE_API_KEY`
    pub api_key: Option<String>,

    // ── Model / request shape ─────────────────────────────────────────────────
    /// Remote model identifier.
    /// Env: `TRANSCRIBE_MODEL` · Default: `whisper-1`
    pub model: String,

    /// ISO 639-1 language hint. Absent means the endpoint auto-detects.
    /// Env: `TRANSCRIBE_LANGUAGE`
    pub language: Option<String>,

    /// Optional steering prompt, at most 224 characters.
    /// Env: `TRANSCRIBE_PROMPT`
    pub prompt: Option<String>,

    /// Response shape requested from the endpoint.
    /// Env: `RESPONSE_FORMAT` · Default: `json` · One of `text`, `json`,
    /// `verbose_json`
    pub response_format: ResponseFormat,

    /// Sampling temperature.
    /// Env: `TRANSCRIBE_TEMPERATURE` · Default: `0` · Constraint: `[0, 1]`
    pub temperature: f32,

    /// Timing resolutions for `verbose_json` responses.
    /// Env: `TIMESTAMP_GRANULARITIES` · Default: `segment` · Comma-separated
    /// subset of `segment`, `word`
    pub timestamp_granularities: Vec<TimestampGranularity>,

    // ── Chunking ──────────────────────────────────────────────────────────────
    /// Largest single request payload the endpoint accepts.
    /// Env: `MAX_PAYLOAD_MB` · Default: `25` · Constraint: ≥ 1
    pub max_payload_mb: u64,

    /// Segment size for chunked dispatch.
    /// Env: `CHUNK_SIZE_MB` · Default: `20` · Constraint: ≥ 1 and ≤ `MAX_PAYLOAD_MB`
    pub chunk_size_mb: u64,

    /// Informational overlap between adjacent chunks. Recorded but never
    /// subtracted from segment boundaries.
    /// Env: `CHUNK_OVERLAP_SEC` · Default: `0` · Constraint: ≥ 0
    pub chunk_overlap_sec: f64,

    /// Chunk even below the payload limit.
    /// Env: `FORCE_CHUNKING` · Default: `false`
    pub force_chunking: bool,

    // ── Failure policy ────────────────────────────────────────────────────────
    /// Abort the run on the first failed segment instead of continuing
    /// best-effort.
    /// Env: `FAIL_FAST` · Default: `false`
    pub fail_fast: bool,
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// Missing variables fall back to hardcoded defaults.
    /// Returns [`ConfigError`] on the first invalid value encountered.
    pub fn load() -> Result<Self, ConfigError> {
        // ── Remote endpoint ───────────────────────────────────────────────────
        let api_url = env_str(
            "TRANSCRIBE_API_URL",
            "https://api.openai.com/v1/audio/transcriptions",
        );
        validate("TRANSCRIBE_API_URL", !api_url.is_empty(), "must not be empty")?;
        let api_key = env_opt_str("TRANSCRIBE_API_KEY");

        // ── Model / request shape ─────────────────────────────────────────────
        let model = env_str("TRANSCRIBE_MODEL", "whisper-1");
        validate("TRANSCRIBE_MODEL", !model.is_empty(), "must not be empty")?;

        let language = env_opt_str("TRANSCRIBE_LANGUAGE");
        let prompt = env_opt_str("TRANSCRIBE_PROMPT");
        if let Some(p) = &prompt {
            validate(
                "TRANSCRIBE_PROMPT",
                p.chars().count() <= crate::client::MAX_PROMPT_CHARS,
                "must be at most 224 characters",
            )?;
        }

        let response_format = parse_with("RESPONSE_FORMAT", "json", ResponseFormat::parse, "one of text, json, verbose_json")?;

        let temperature = parse_f32("TRANSCRIBE_TEMPERATURE", 0.0)?;
        validate(
            "TRANSCRIBE_TEMPERATURE",
            (0.0..=1.0).contains(&temperature),
            "must be in [0, 1]",
        )?;

        let timestamp_granularities = parse_granularities("TIMESTAMP_GRANULARITIES", "segment")?;

        // ── Chunking ──────────────────────────────────────────────────────────
        let max_payload_mb = parse_u64("MAX_PAYLOAD_MB", 25)?;
        validate("MAX_PAYLOAD_MB", max_payload_mb >= 1, "must be ≥ 1")?;

        let chunk_size_mb = parse_u64("CHUNK_SIZE_MB", 20)?;
        validate("CHUNK_SIZE_MB", chunk_size_mb >= 1, "must be ≥ 1")?;
        validate(
            "CHUNK_SIZE_MB",
            chunk_size_mb <= max_payload_mb,
            "must not exceed MAX_PAYLOAD_MB — a chunk must itself fit in one request",
        )?;

        let chunk_overlap_sec = parse_f64("CHUNK_OVERLAP_SEC", 0.0)?;
        validate("CHUNK_OVERLAP_SEC", chunk_overlap_sec >= 0.0, "must be ≥ 0")?;

        let force_chunking = parse_bool("FORCE_CHUNKING", false)?;

        // ── Failure policy ────────────────────────────────────────────────────
        let fail_fast = parse_bool("FAIL_FAST", false)?;

        Ok(Self {
            api_url,
            api_key,
            model,
            language,
            prompt,
            response_format,
            temperature,
            timestamp_granularities,
            max_payload_mb,
            chunk_size_mb,
            chunk_overlap_sec,
            force_chunking,
            fail_fast,
        })
    }

    // ── Derived helpers ───────────────────────────────────────────────────────

    /// `max_payload_mb` converted to bytes, ready for [`PayloadLimits`].
    pub fn max_payload_bytes(&self) -> u64 {
        self.max_payload_mb * 1_024 * 1_024
    }

    /// `chunk_size_mb` converted to bytes.
    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_mb * 1_024 * 1_024
    }

    pub fn payload_limits(&self) -> PayloadLimits {
        PayloadLimits {
            max_single_payload_bytes: self.max_payload_bytes(),
        }
    }

    pub fn continuation_policy(&self) -> ContinuationPolicy {
        if self.fail_fast {
            ContinuationPolicy::FailFast
        } else {
            ContinuationPolicy::BestEffort
        }
    }

    /// The per-call options bag handed to every transcription request.
    pub fn transcription_options(&self) -> TranscriptionOptions {
        TranscriptionOptions {
            model: self.model.clone(),
            language: self.language.clone(),
            prompt: self.prompt.clone(),
            response_format: self.response_format,
            temperature: self.temperature,
            timestamp_granularities: self.timestamp_granularities.clone(),
            chunk_size_bytes: self.chunk_size_bytes(),
            chunk_overlap_secs: self.chunk_overlap_sec,
            force_chunking: self.force_chunking,
        }
    }

    /// Log a summary of the loaded configuration.
    /// Useful at startup to confirm values from env.
    pub fn log_summary(&self) {
        tracing::info!(
            api_url        = %self.api_url,
            authenticated  = self.api_key.is_some(),
            model          = %self.model,
            language       = self.language.as_deref().unwrap_or("auto"),
            format         = self.response_format.as_str(),
            max_payload_mb = self.max_payload_mb,
            chunk_size_mb  = self.chunk_size_mb,
            fail_fast      = self.fail_fast,
            "⚙️  configuration loaded"
        );
    }
}

// ── Private parse helpers ──────────────────────────────────────────────────────

/// Return the env var value as a `String`, or `default` if unset.
fn env_str(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

/// Return the env var value, treating unset and empty as absent.
fn env_opt_str(var: &str) -> Option<String> {
    env::var(var).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Emit a `ConfigError::InvalidValue` if `condition` is false.
fn validate(var: &'static str, condition: bool, message: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            var,
            message: message.to_string(),
        })
    }
}

fn parse_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::Parse {
            var,
            raw,
            expected: "unsigned integer",
        }),
    }
}

fn parse_f64(var: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse::<f64>().map_err(|_| ConfigError::Parse {
            var,
            raw,
            expected: "decimal number",
        }),
    }
}

fn parse_f32(var: &'static str, default: f32) -> Result<f32, ConfigError> {
    match env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse::<f32>().map_err(|_| ConfigError::Parse {
            var,
            raw,
            expected: "decimal number",
        }),
    }
}

fn parse_bool(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::Parse {
                var,
                raw,
                expected: "boolean (true/false)",
            }),
        },
    }
}

/// Parse an enum-like value with the given parser, falling back to `default`
/// when the variable is unset.
fn parse_with<T>(
    var: &'static str,
    default: &str,
    parser: impl Fn(&str) -> Option<T>,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let raw = env_str(var, default);
    parser(&raw).ok_or(ConfigError::Parse { var, raw, expected })
}

fn parse_granularities(
    var: &'static str,
    default: &str,
) -> Result<Vec<TimestampGranularity>, ConfigError> {
    let raw = env_str(var, default);
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            TimestampGranularity::parse(s).ok_or(ConfigError::Parse {
                var,
                raw: raw.clone(),
                expected: "comma-separated subset of segment, word",
            })
        })
        .collect()
}
