//! SpeakType — voice-capture-to-clipboard pipeline.
//!
//! Records microphone audio, transcribes it with a Whisper GGML model,
//! refines the transcript through a local Ollama endpoint, and delivers the
//! result to the system clipboard with a user notification.
//!
//! # Architecture
//!
//! ```text
//! UI action (start / stop / copy-last / quit)
//!        │  ControllerCommand (tokio mpsc)
//!        ▼
//! PipelineController  ── Idle ──start──▶ Recording ──stop──▶ Processing
//!        │                                                      │
//!        │  AudioCapture (cpal, dedicated thread)               │
//!        │                                                      ▼
//!        │                     background task: transcribe → improve → deliver
//!        │                                                      │
//!        └──────────────────────── Idle ◀──────────────────────┘
//! ```
//!
//! Module map:
//! * [`config`]   — settings, validation, TOML persistence, app paths.
//! * [`audio`]    — capture sessions, sample buffers, level monitoring.
//! * [`stt`]      — Whisper transcription and the model catalog.
//! * [`improve`]  — Ollama text improvement with retry and fallback.
//! * [`deliver`]  — clipboard delivery, last-result slot, notifications.
//! * [`pipeline`] — the three-state machine that sequences everything.

pub mod audio;
pub mod config;
pub mod deliver;
pub mod improve;
pub mod pipeline;
pub mod stt;
