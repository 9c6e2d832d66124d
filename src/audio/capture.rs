//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] owns at most one [`CaptureSession`] at a time.  Because
//! `cpal::Stream` is not `Send` on every platform, the stream lives on a
//! dedicated `audio-capture` thread spawned by [`AudioCapture::start`]; the
//! cpal callback appends into a shared [`AudioBuffer`] and the controller
//! side only ever touches thread-safe handles.  [`AudioCapture::stop`]
//! signals the thread, joins it (dropping the stream releases the device),
//! and returns the frozen buffer by value.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use crate::audio::{AudioBuffer, SilenceMonitor};
use crate::config::AudioConfig;

/// How long `start()` waits for the capture thread to report that the
/// device opened.
const DEVICE_OPEN_WAIT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while starting or stopping audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// `start` was called while a capture session is already active.
    #[error("recording is already in progress")]
    AlreadyRecording,

    /// `stop` was called with no active capture session.
    #[error("no recording in progress")]
    NotRecording,

    /// The input device could not be opened or configured.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),
}

// ---------------------------------------------------------------------------
// CaptureDevice trait
// ---------------------------------------------------------------------------

/// Seam between the pipeline controller and the audio hardware.
///
/// [`AudioCapture`] is the production implementation; tests substitute
/// `MockCapture`.  Implementations enforce the session invariants
/// themselves: double `start` yields [`CaptureError::AlreadyRecording`],
/// `stop` while idle yields [`CaptureError::NotRecording`].
pub trait CaptureDevice: Send {
    /// Open the device and begin buffering samples.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Halt the stream, release the device and return the frozen buffer.
    fn stop(&mut self) -> Result<AudioBuffer, CaptureError>;

    /// Normalized RMS level of the live recording, `0.0` when idle.
    fn current_level(&self) -> f32;

    /// Wall-clock time since the session started, zero when idle.
    fn duration(&self) -> Duration;
}

// ---------------------------------------------------------------------------
// CaptureSession
// ---------------------------------------------------------------------------

/// One recording attempt, from device open to buffer freeze.
struct CaptureSession {
    buffer: Arc<Mutex<AudioBuffer>>,
    /// Cleared by `stop()` before the stream halts; the callback drops (and
    /// counts) any chunk that arrives afterwards instead of appending it.
    active: Arc<AtomicBool>,
    dropped_chunks: Arc<AtomicU64>,
    started_at: Instant,
    stop_tx: mpsc::Sender<()>,
    worker: thread::JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture built on `cpal`, holding at most one active session.
///
/// # Example
///
/// ```rust,no_run
/// use speaktype::audio::{AudioCapture, CaptureDevice};
/// use speaktype::config::AudioConfig;
///
/// let mut capture = AudioCapture::new(AudioConfig::default());
/// capture.start().unwrap();
/// // … user speaks …
/// let buffer = capture.stop().unwrap();
/// println!("captured {:.1} s", buffer.duration_secs());
/// ```
pub struct AudioCapture {
    config: AudioConfig,
    monitor: SilenceMonitor,
    session: Option<CaptureSession>,
}

impl AudioCapture {
    /// Create an idle capture device for the given audio configuration.
    pub fn new(config: AudioConfig) -> Self {
        let monitor = SilenceMonitor::new(config.silence_threshold);
        Self {
            config,
            monitor,
            session: None,
        }
    }

    /// Returns `true` while a capture session is active.
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Number of callback chunks dropped because they arrived after a
    /// concurrent stop.  Zero when idle.
    pub fn dropped_chunks(&self) -> u64 {
        self.session
            .as_ref()
            .map(|s| s.dropped_chunks.load(Ordering::Relaxed))
            .unwrap_or(0)
    }
}

impl CaptureDevice for AudioCapture {
    /// Open the default input device and start buffering.
    ///
    /// Spawns the `audio-capture` thread, which opens the device at the
    /// configured rate/channels (preferring an `i16` stream, falling back
    /// to native `f32`) and keeps the stream alive until `stop()` signals.
    /// Waits up to two seconds for the thread to acknowledge the device
    /// open; on any failure the session stays idle.
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.session.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        let buffer = Arc::new(Mutex::new(AudioBuffer::new(
            self.config.sample_rate,
            self.config.channels,
        )));
        let active = Arc::new(AtomicBool::new(true));
        let dropped = Arc::new(AtomicU64::new(0));

        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let worker = {
            let config = self.config.clone();
            let buffer = Arc::clone(&buffer);
            let active = Arc::clone(&active);
            let dropped = Arc::clone(&dropped);

            thread::Builder::new()
                .name("audio-capture".into())
                .spawn(move || {
                    let stream = match open_stream(&config, buffer, active, dropped) {
                        Ok(stream) => stream,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(()));

                    // Park until stop() signals or the session is dropped;
                    // dropping the stream on the way out releases the device.
                    let _ = stop_rx.recv();
                })
                .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?
        };

        match ready_rx.recv_timeout(DEVICE_OPEN_WAIT) {
            Ok(Ok(())) => {
                log::debug!(
                    "audio: capture started ({} Hz, {} ch)",
                    self.config.sample_rate,
                    self.config.channels
                );
                self.session = Some(CaptureSession {
                    buffer,
                    active,
                    dropped_chunks: dropped,
                    started_at: Instant::now(),
                    stop_tx,
                    worker,
                });
                Ok(())
            }
            Ok(Err(msg)) => {
                let _ = worker.join();
                Err(CaptureError::DeviceUnavailable(msg))
            }
            Err(_) => {
                // stop_tx is dropped here, so the worker unparks and exits.
                Err(CaptureError::DeviceUnavailable(
                    "timed out waiting for the audio device to open".into(),
                ))
            }
        }
    }

    /// Halt the stream and return the frozen buffer.
    ///
    /// The device is released (stream dropped on the worker thread)
    /// regardless of whether buffer extraction succeeds cleanly.
    fn stop(&mut self) -> Result<AudioBuffer, CaptureError> {
        let session = self.session.take().ok_or(CaptureError::NotRecording)?;

        session.active.store(false, Ordering::SeqCst);
        let _ = session.stop_tx.send(());
        if session.worker.join().is_err() {
            log::warn!("audio: capture thread panicked during shutdown");
        }

        let dropped = session.dropped_chunks.load(Ordering::Relaxed);
        if dropped > 0 {
            log::debug!("audio: dropped {dropped} chunk(s) after stop");
        }

        let buffer = match Arc::try_unwrap(session.buffer) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(|p| p.into_inner()),
            Err(shared) => {
                // The callback is gone after join; clone-free extraction
                // failed only because an Arc clone outlived it somewhere.
                let mut guard = shared.lock().unwrap_or_else(|p| p.into_inner());
                let empty = AudioBuffer::new(guard.sample_rate(), guard.channels());
                std::mem::replace(&mut *guard, empty)
            }
        };

        log::debug!(
            "audio: capture stopped after {:.2} s ({} samples)",
            buffer.duration_secs(),
            buffer.len()
        );
        Ok(buffer)
    }

    fn current_level(&self) -> f32 {
        let Some(session) = &self.session else {
            return 0.0;
        };
        match session.buffer.lock() {
            Ok(buf) => self.monitor.level(&buf),
            Err(_) => 0.0,
        }
    }

    fn duration(&self) -> Duration {
        self.session
            .as_ref()
            .map(|s| s.started_at.elapsed())
            .unwrap_or(Duration::ZERO)
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        if self.session.is_some() {
            let _ = self.stop();
        }
    }
}

// ---------------------------------------------------------------------------
// Stream construction (runs on the audio-capture thread)
// ---------------------------------------------------------------------------

/// Open the default input device at the configured rate/channels and start
/// the stream.  Errors are returned as strings for the `ready` handshake.
fn open_stream(
    config: &AudioConfig,
    buffer: Arc<Mutex<AudioBuffer>>,
    active: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
) -> Result<cpal::Stream, String> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| "no input device found on the default audio host".to_string())?;

    let format = select_sample_format(&device, config)?;
    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let err_fn = |err: cpal::StreamError| {
        log::error!("cpal stream error: {err}");
    };

    let stream = match format {
        cpal::SampleFormat::I16 => device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if !active.load(Ordering::SeqCst) {
                        dropped.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                    if let Ok(mut buf) = buffer.lock() {
                        buf.push_slice_i16(data);
                    } else {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| e.to_string())?,
        _ => device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !active.load(Ordering::SeqCst) {
                        dropped.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                    if let Ok(mut buf) = buffer.lock() {
                        buf.push_slice(data);
                    } else {
                        dropped.fetch_add(1, Ordering::Relaxed);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| e.to_string())?,
    };

    stream.play().map_err(|e| e.to_string())?;
    Ok(stream)
}

/// Pick a sample format the device supports at the configured rate and
/// channel count, preferring `i16` (deterministic integer conversion) over
/// native `f32`.
fn select_sample_format(
    device: &cpal::Device,
    config: &AudioConfig,
) -> Result<cpal::SampleFormat, String> {
    let supported = device
        .supported_input_configs()
        .map_err(|e| format!("failed to query input configs: {e}"))?;

    let mut fallback = None;
    for range in supported {
        let rate_ok = range.min_sample_rate().0 <= config.sample_rate
            && config.sample_rate <= range.max_sample_rate().0;
        if range.channels() != config.channels || !rate_ok {
            continue;
        }
        match range.sample_format() {
            cpal::SampleFormat::I16 => return Ok(cpal::SampleFormat::I16),
            cpal::SampleFormat::F32 => fallback = Some(cpal::SampleFormat::F32),
            _ => {}
        }
    }

    fallback.ok_or_else(|| {
        format!(
            "device does not support {} Hz / {} channel capture",
            config.sample_rate, config.channels
        )
    })
}

// ---------------------------------------------------------------------------
// MockCapture  (test-only)
// ---------------------------------------------------------------------------

/// Test double for [`CaptureDevice`] that enforces the same session
/// invariants without touching any hardware.
#[cfg(test)]
pub struct MockCapture {
    samples: Vec<f32>,
    sample_rate: u32,
    fail_start: bool,
    recording: bool,
    started_at: Option<Instant>,
}

#[cfg(test)]
impl MockCapture {
    /// A capture device that records `samples` on every session.
    pub fn with_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            fail_start: false,
            recording: false,
            started_at: None,
        }
    }

    /// A capture device whose `start` always fails with `DeviceUnavailable`.
    pub fn failing() -> Self {
        Self {
            samples: Vec::new(),
            sample_rate: 16_000,
            fail_start: true,
            recording: false,
            started_at: None,
        }
    }
}

#[cfg(test)]
impl CaptureDevice for MockCapture {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.recording {
            return Err(CaptureError::AlreadyRecording);
        }
        if self.fail_start {
            return Err(CaptureError::DeviceUnavailable("mock device".into()));
        }
        self.recording = true;
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) -> Result<AudioBuffer, CaptureError> {
        if !self.recording {
            return Err(CaptureError::NotRecording);
        }
        self.recording = false;
        self.started_at = None;
        Ok(AudioBuffer::from_samples(
            self.samples.clone(),
            self.sample_rate,
            1,
        ))
    }

    fn current_level(&self) -> f32 {
        if self.recording {
            SilenceMonitor::rms(&self.samples)
        } else {
            0.0
        }
    }

    fn duration(&self) -> Duration {
        self.started_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // Hardware-free tests only; tests that require a real input device
    // (start/stop round trips) run against MockCapture in the pipeline
    // test module instead.

    #[test]
    fn stop_while_idle_is_not_recording() {
        let mut capture = AudioCapture::new(AudioConfig::default());
        let err = capture.stop().unwrap_err();
        assert!(matches!(err, CaptureError::NotRecording));
    }

    #[test]
    fn idle_level_is_zero() {
        let capture = AudioCapture::new(AudioConfig::default());
        assert_eq!(capture.current_level(), 0.0);
    }

    #[test]
    fn idle_duration_is_zero() {
        let capture = AudioCapture::new(AudioConfig::default());
        assert_eq!(capture.duration(), Duration::ZERO);
    }

    #[test]
    fn idle_drop_count_is_zero() {
        let capture = AudioCapture::new(AudioConfig::default());
        assert_eq!(capture.dropped_chunks(), 0);
        assert!(!capture.is_recording());
    }

    // ---- MockCapture contract --------------------------------------------

    #[test]
    fn mock_double_start_is_already_recording() {
        let mut mock = MockCapture::with_samples(vec![0.0; 16_000], 16_000);
        mock.start().unwrap();
        let err = mock.start().unwrap_err();
        assert!(matches!(err, CaptureError::AlreadyRecording));
    }

    #[test]
    fn mock_stop_returns_buffer_and_resets() {
        let mut mock = MockCapture::with_samples(vec![0.5; 32_000], 16_000);
        mock.start().unwrap();
        let buffer = mock.stop().unwrap();
        assert_eq!(buffer.len(), 32_000);
        assert!((buffer.duration_secs() - 2.0).abs() < 1e-6);

        // Session is retired; a second stop is NotRecording.
        assert!(matches!(
            mock.stop().unwrap_err(),
            CaptureError::NotRecording
        ));
    }

    #[test]
    fn mock_failing_start_leaves_session_idle() {
        let mut mock = MockCapture::failing();
        assert!(matches!(
            mock.start().unwrap_err(),
            CaptureError::DeviceUnavailable(_)
        ));
        assert!(matches!(
            mock.stop().unwrap_err(),
            CaptureError::NotRecording
        ));
    }
}
