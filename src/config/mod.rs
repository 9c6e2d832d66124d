//! Configuration module for SpeakType.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform data directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save_to`.
//!
//! `whisper.model` and `ollama.prompt_template` are validated at startup and
//! a bad value is fatal — see [`AppConfig::validate`].

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AudioConfig, ClipboardConfig, ConfigError, OllamaConfig, WhisperConfig,
};
