//! Speech-to-text subsystem.
//!
//! [`SpeechToText`] is the object-safe seam the pipeline calls through;
//! [`WhisperTranscriber`] is the production implementation wrapping a
//! lazily-loaded `whisper_rs::WhisperContext`.  [`ModelSize`] and
//! [`ModelPaths`] cover the five-model Whisper catalog and its on-disk
//! layout.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use speaktype::stt::{ModelPaths, ModelSize, SpeechToText, WhisperTranscriber};
//!
//! let paths = ModelPaths::new("/var/lib/speaktype/models");
//! let transcriber = WhisperTranscriber::new(paths.model_path(ModelSize::Base), false);
//!
//! // audio: 16 kHz mono f32 PCM from the audio module
//! let audio = vec![0.0_f32; 32_000]; // 2 s
//! let text = transcriber.transcribe(&audio, Some("en")).unwrap();
//! println!("{text}");
//! ```

pub mod engine;
pub mod model;

pub use engine::{ModelError, SpeechToText, TranscribeError, WhisperTranscriber};
pub use model::{ModelPaths, ModelSize, ParseModelError};

// test-only re-export so the pipeline test module can import MockSpeech
// without `use speaktype::stt::engine::MockSpeech`.
#[cfg(test)]
pub use engine::MockSpeech;
