//! Application settings structs, validation and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//!
//! Loading is strict: a missing settings file, malformed TOML, an unknown
//! `whisper.model`, or a prompt template without the `{text}` placeholder are
//! all fatal at startup ([`ConfigError`]).  `AppConfig::default()` exists for
//! tests and first-run scaffolding.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::improve::prompt::TEXT_PLACEHOLDER;
use crate::stt::ModelSize;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Fatal configuration errors.  The process does not start when any of these
/// is returned by [`AppConfig::load`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `whisper.model` is not one of tiny/base/small/medium/large.
    #[error("invalid whisper model {0:?} — expected one of: tiny, base, small, medium, large")]
    InvalidModel(String),

    /// `ollama.prompt_template` does not contain the `{text}` placeholder.
    #[error("ollama.prompt_template must contain the {TEXT_PLACEHOLDER} placeholder")]
    InvalidPromptTemplate,

    /// The settings file does not exist.
    #[error("settings file not found: {0}")]
    MissingFile(PathBuf),

    /// The settings file exists but is not valid TOML.
    #[error("malformed settings file: {0}")]
    Malformed(String),

    /// The settings file could not be read.
    #[error("cannot read settings file: {0}")]
    Io(String),
}

// ---------------------------------------------------------------------------
// WhisperConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper transcriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperConfig {
    /// Model size: `"tiny"`, `"base"`, `"small"`, `"medium"` or `"large"`.
    pub model: String,
    /// Speech language as an ISO-639-1 code, or `None` for Whisper's
    /// built-in language detection.
    pub language: Option<String>,
    /// Compute device: `"cpu"` or `"gpu"`.
    pub device: String,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model: "base".into(),
            language: None,
            device: "cpu".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// OllamaConfig
// ---------------------------------------------------------------------------

/// Settings for the Ollama text-improvement step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server (e.g. `http://localhost:11434`).
    pub host: String,
    /// Model identifier sent to `/api/generate` (e.g. `"llama3.2"`).
    pub model: String,
    /// Prompt template; the `{text}` placeholder is replaced with the raw
    /// transcript.
    pub prompt_template: String,
    /// Maximum seconds to wait for one HTTP request before timing out.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".into(),
            model: "llama3.2".into(),
            prompt_template: "Improve the grammar, punctuation and readability of the \
                              following transcribed speech. Reply with only the improved \
                              text.\n\n{text}"
                .into(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture and level monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Capture sample rate in Hz.  16 000 matches Whisper's expected input.
    pub sample_rate: u32,
    /// Number of input channels.  1 (mono) keeps buffers small.
    pub channels: u16,
    /// RMS level below which a window counts as silence (0.0 – 1.0).
    pub silence_threshold: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            silence_threshold: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// ClipboardConfig
// ---------------------------------------------------------------------------

/// Settings for result delivery and notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipboardConfig {
    /// Whether to raise notifications on delivery outcomes.
    pub notifications: bool,
    /// Title used for every notification.
    pub title: String,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            notifications: true,
            title: "SpeakType".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use speaktype::config::AppConfig;
///
/// // Fatal error when the file is missing or invalid.
/// let config = AppConfig::load().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Whisper transcriber settings.
    pub whisper: WhisperConfig,
    /// Ollama improvement settings.
    pub ollama: OllamaConfig,
    /// Audio capture settings.
    pub audio: AudioConfig,
    /// Delivery / notification settings.
    pub clipboard: ClipboardConfig,
}

impl AppConfig {
    /// Load and validate configuration from the platform-appropriate
    /// `settings.toml`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the fields that are fatal when wrong.
    ///
    /// * `whisper.model` must name one of the five Whisper sizes.
    /// * `ollama.prompt_template` must contain the `{text}` placeholder.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.whisper.model.parse::<ModelSize>().is_err() {
            return Err(ConfigError::InvalidModel(self.whisper.model.clone()));
        }
        if !self.ollama.prompt_template.contains(TEXT_PLACEHOLDER) {
            return Err(ConfigError::InvalidPromptTemplate);
        }
        Ok(())
    }

    /// Parsed model size.  Call only after [`validate`](Self::validate).
    pub fn model_size(&self) -> Result<ModelSize, ConfigError> {
        self.whisper
            .model
            .parse()
            .map_err(|_| ConfigError::InvalidModel(self.whisper.model.clone()))
    }

    /// Save to an explicit path, creating parent directories as needed
    /// (useful for tests and first-run scaffolding).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
