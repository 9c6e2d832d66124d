//! Whisper transcription engine.
//!
//! [`SpeechToText`] is the object-safe, thread-safe interface used by the
//! pipeline.  [`WhisperTranscriber`] wraps a `whisper_rs::WhisperContext`
//! loaded lazily on first use; the context slot is guarded by a mutex so
//! concurrent callers can never trigger a duplicate load, and inference
//! naturally serialises through the same lock.
//!
//! [`MockSpeech`] (under `#[cfg(test)]`) returns a pre-configured response
//! so the pipeline can be tested without a GGML model file.

use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Minimum audio length accepted by `transcribe`: 0.1 s at 16 kHz.
/// Anything shorter is treated as empty.
const MIN_AUDIO_SAMPLES: usize = 1_600;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Model lifecycle errors.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The GGML file is missing or whisper-rs failed to initialise from it.
    #[error("failed to load whisper model: {0}")]
    LoadFailed(String),
}

/// Transcription errors.
#[derive(Debug, Clone, Error)]
pub enum TranscribeError {
    /// The supplied buffer has near-zero duration.
    #[error("audio buffer is empty or too short to transcribe")]
    EmptyAudio,

    /// The inference pass failed.
    #[error("transcription failed: {0}")]
    InferenceFailure(String),

    /// The model could not be (auto-)loaded.
    #[error(transparent)]
    Model(#[from] ModelError),
}

// ---------------------------------------------------------------------------
// SpeechToText trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech-to-text engines.
///
/// # Contract
///
/// - `samples` must be 16 kHz mono `f32` PCM in `[-1.0, 1.0]`.
/// - Returns `Err(TranscribeError::EmptyAudio)` for near-zero-length input.
/// - Returns either a complete transcript or an error, never a partial one.
pub trait SpeechToText: Send + Sync {
    /// Transcribe `samples`, optionally forcing a language (`None` lets the
    /// model detect it).
    fn transcribe(&self, samples: &[f32], language: Option<&str>)
        -> Result<String, TranscribeError>;

    /// Release model memory.  Safe to call when nothing is loaded.
    fn unload(&self) {}
}

// Compile-time assertion: Box<dyn SpeechToText> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechToText>) {}
};

// ---------------------------------------------------------------------------
// WhisperTranscriber
// ---------------------------------------------------------------------------

/// Production engine wrapping a lazily-loaded `whisper_rs::WhisperContext`.
///
/// The context is loaded once by whichever call reaches it first
/// ([`ensure_loaded`](Self::ensure_loaded) or the auto-load inside
/// `transcribe`) and cached until [`unload`](SpeechToText::unload).
pub struct WhisperTranscriber {
    model_path: PathBuf,
    use_gpu: bool,
    n_threads: i32,
    ctx: Mutex<Option<WhisperContext>>,
}

impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("model_path", &self.model_path)
            .field("use_gpu", &self.use_gpu)
            .finish_non_exhaustive()
    }
}

impl WhisperTranscriber {
    /// Create a transcriber for the GGML file at `model_path`.
    ///
    /// Nothing is loaded yet; the model is read from disk on the first
    /// [`ensure_loaded`](Self::ensure_loaded) or `transcribe` call.
    pub fn new(model_path: impl Into<PathBuf>, use_gpu: bool) -> Self {
        Self {
            model_path: model_path.into(),
            use_gpu,
            n_threads: optimal_threads(),
            ctx: Mutex::new(None),
        }
    }

    /// Load the model if it is not resident yet.  Idempotent; concurrent
    /// callers serialise on the context lock so the file is read at most
    /// once per load/unload cycle.
    pub fn ensure_loaded(&self) -> Result<(), ModelError> {
        let mut guard = self.lock_ctx();
        if guard.is_none() {
            *guard = Some(self.load_context()?);
        }
        Ok(())
    }

    /// Returns `true` while a model is resident in memory.
    pub fn is_loaded(&self) -> bool {
        self.lock_ctx().is_some()
    }

    fn lock_ctx(&self) -> std::sync::MutexGuard<'_, Option<WhisperContext>> {
        self.ctx.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn load_context(&self) -> Result<WhisperContext, ModelError> {
        if !self.model_path.exists() {
            return Err(ModelError::LoadFailed(format!(
                "model file not found: {}",
                self.model_path.display()
            )));
        }
        let path = self.model_path.to_str().ok_or_else(|| {
            ModelError::LoadFailed(format!(
                "model path contains non-UTF-8 characters: {}",
                self.model_path.display()
            ))
        })?;

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(self.use_gpu);

        log::info!(
            "stt: loading whisper model {} (gpu={})",
            self.model_path.display(),
            self.use_gpu
        );
        WhisperContext::new_with_params(path, ctx_params)
            .map_err(|e| ModelError::LoadFailed(e.to_string()))
    }
}

impl SpeechToText for WhisperTranscriber {
    fn transcribe(
        &self,
        samples: &[f32],
        language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        if samples.len() < MIN_AUDIO_SAMPLES {
            return Err(TranscribeError::EmptyAudio);
        }

        // One lock covers load check and inference, so an unload between the
        // two is impossible and later calls serialise naturally.
        let mut guard = self.lock_ctx();
        if guard.is_none() {
            *guard = Some(self.load_context()?);
        }
        let Some(ctx) = guard.as_ref() else {
            return Err(ModelError::LoadFailed("model slot unexpectedly empty".into()).into());
        };

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(language);
        params.set_n_threads(self.n_threads);
        params.set_print_progress(false);
        params.set_print_realtime(false);

        let mut state = ctx
            .create_state()
            .map_err(|e| TranscribeError::InferenceFailure(e.to_string()))?;

        state
            .full(params, samples)
            .map_err(|e| TranscribeError::InferenceFailure(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| TranscribeError::InferenceFailure(e.to_string()))?;

        let mut text = String::new();
        for i in 0..n_segments {
            let segment = state
                .full_get_segment_text(i)
                .map_err(|e| TranscribeError::InferenceFailure(format!("segment {i}: {e}")))?;
            text.push_str(&segment);
        }

        Ok(text.trim().to_string())
    }

    fn unload(&self) {
        let mut guard = self.lock_ctx();
        if guard.take().is_some() {
            log::info!("stt: whisper model unloaded");
        }
    }
}

/// Number of CPU threads handed to Whisper, capped at 8 to avoid
/// diminishing returns.
fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// MockSpeech  (test-only)
// ---------------------------------------------------------------------------

/// Test double that returns a pre-configured response without loading a
/// model file.  Enforces the same `EmptyAudio` contract as the real engine
/// so callers are tested against it.
#[cfg(test)]
pub struct MockSpeech {
    response: Result<String, TranscribeError>,
}

#[cfg(test)]
impl MockSpeech {
    /// A mock that always transcribes to `text`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
        }
    }

    /// A mock that always fails with `error`.
    pub fn err(error: TranscribeError) -> Self {
        Self {
            response: Err(error),
        }
    }
}

#[cfg(test)]
impl SpeechToText for MockSpeech {
    fn transcribe(
        &self,
        samples: &[f32],
        _language: Option<&str>,
    ) -> Result<String, TranscribeError> {
        if samples.len() < MIN_AUDIO_SAMPLES {
            return Err(TranscribeError::EmptyAudio);
        }
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- WhisperTranscriber lifecycle (no model file needed) -------------

    #[test]
    fn starts_unloaded() {
        let t = WhisperTranscriber::new("/nonexistent/ggml-base.bin", false);
        assert!(!t.is_loaded());
    }

    #[test]
    fn ensure_loaded_missing_file_fails() {
        let t = WhisperTranscriber::new("/nonexistent/ggml-base.bin", false);
        let err = t.ensure_loaded().unwrap_err();
        assert!(matches!(err, ModelError::LoadFailed(_)));
        assert!(!t.is_loaded());
    }

    #[test]
    fn unload_when_not_loaded_is_a_noop() {
        let t = WhisperTranscriber::new("/nonexistent/ggml-base.bin", false);
        t.unload();
        t.unload();
        assert!(!t.is_loaded());
    }

    #[test]
    fn transcribe_rejects_empty_audio_before_loading() {
        let t = WhisperTranscriber::new("/nonexistent/ggml-base.bin", false);
        let err = t.transcribe(&[], None).unwrap_err();
        assert!(matches!(err, TranscribeError::EmptyAudio));
    }

    #[test]
    fn transcribe_auto_load_surfaces_model_error() {
        let t = WhisperTranscriber::new("/nonexistent/ggml-base.bin", false);
        let audio = vec![0.0_f32; MIN_AUDIO_SAMPLES];
        let err = t.transcribe(&audio, None).unwrap_err();
        assert!(matches!(err, TranscribeError::Model(_)));
    }

    // ---- MockSpeech -------------------------------------------------------

    #[test]
    fn mock_ok_returns_configured_text() {
        let engine = MockSpeech::ok("test recording");
        let audio = vec![0.0_f32; MIN_AUDIO_SAMPLES];
        assert_eq!(engine.transcribe(&audio, None).unwrap(), "test recording");
    }

    #[test]
    fn mock_err_returns_configured_error() {
        let engine = MockSpeech::err(TranscribeError::InferenceFailure("boom".into()));
        let audio = vec![0.0_f32; MIN_AUDIO_SAMPLES];
        let err = engine.transcribe(&audio, None).unwrap_err();
        assert!(matches!(err, TranscribeError::InferenceFailure(_)));
    }

    #[test]
    fn mock_short_audio_is_empty_audio() {
        let engine = MockSpeech::ok("text");
        let short = vec![0.0_f32; MIN_AUDIO_SAMPLES - 1];
        assert!(matches!(
            engine.transcribe(&short, None).unwrap_err(),
            TranscribeError::EmptyAudio
        ));
    }

    // ---- Object safety ----------------------------------------------------

    #[test]
    fn box_dyn_speech_to_text_compiles() {
        let engine: Box<dyn SpeechToText> = Box::new(MockSpeech::ok("ok"));
        let audio = vec![0.0_f32; MIN_AUDIO_SAMPLES];
        let _ = engine.transcribe(&audio, Some("en"));
        engine.unload();
    }

    // ---- optimal_threads ---------------------------------------------------

    #[test]
    fn optimal_threads_is_positive_and_at_most_8() {
        let t = optimal_threads();
        assert!((1..=8).contains(&t));
    }
}
