//! Audio subsystem — microphone capture, sample buffering, level monitoring.
//!
//! # Flow
//!
//! ```text
//! Microphone → cpal callback (i16/f32) → AudioBuffer (Arc<Mutex<…>>)
//!                                          │
//!                  SilenceMonitor ◀────────┤  current_level()
//!                                          │
//!                  AudioCapture::stop() ───┴─▶ frozen AudioBuffer (by value)
//! ```
//!
//! The cpal stream is `!Send`, so [`AudioCapture`] keeps it on a dedicated
//! `audio-capture` thread for the lifetime of one [`CaptureSession`]; the
//! controller only ever sees the thread-safe session handle.

pub mod buffer;
pub mod capture;
pub mod level;

pub use buffer::AudioBuffer;
pub use capture::{AudioCapture, CaptureDevice, CaptureError};
pub use level::SilenceMonitor;

// test-only re-export so the pipeline test module can import MockCapture
// without `use speaktype::audio::capture::MockCapture`.
#[cfg(test)]
pub use capture::MockCapture;
