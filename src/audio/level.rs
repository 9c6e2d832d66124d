//! RMS level monitoring over the tail of a live recording.
//!
//! [`SilenceMonitor`] derives a normalized loudness metric from the most
//! recent ~100 ms of samples.  The pipeline uses it for the live level
//! display; silence classification against the configured threshold is
//! exposed for callers that want it but never triggers an automatic stop.

use crate::audio::AudioBuffer;

// ---------------------------------------------------------------------------
// SilenceMonitor
// ---------------------------------------------------------------------------

/// Computes a normalized RMS level from recent samples.
///
/// # Example
///
/// ```rust
/// use speaktype::audio::{AudioBuffer, SilenceMonitor};
///
/// let monitor = SilenceMonitor::new(0.01);
/// let buf = AudioBuffer::from_samples(vec![0.0; 16_000], 16_000, 1);
/// assert_eq!(monitor.level(&buf), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct SilenceMonitor {
    /// RMS level below which a window counts as silence.
    threshold: f32,
}

impl SilenceMonitor {
    /// Length of the level window in milliseconds.
    pub const WINDOW_MS: u32 = 100;

    /// Create a monitor with the given silence threshold (0.0 – 1.0).
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Silence threshold currently in use.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// RMS amplitude of `samples`, clamped to `[0.0, 1.0]`.
    ///
    /// Samples are normalized to `[-1.0, 1.0]`, so full-scale input yields
    /// `1.0` and silence yields `0.0`.  Returns `0.0` for an empty slice.
    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let mean_sq: f32 =
            samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
        mean_sq.sqrt().clamp(0.0, 1.0)
    }

    /// Level of the most recent [`WINDOW_MS`](Self::WINDOW_MS) of `buffer`.
    ///
    /// Returns `0.0` when the buffer holds less than one full window, so a
    /// just-started recording reads as silent rather than noisy.  Pure:
    /// repeated calls on the same buffer return the same value.
    pub fn level(&self, buffer: &AudioBuffer) -> f32 {
        let window = Self::window_samples(buffer.sample_rate(), buffer.channels());
        if window == 0 {
            return 0.0;
        }

        let samples = buffer.samples();
        if samples.len() < window {
            return 0.0;
        }
        Self::rms(&samples[samples.len() - window..])
    }

    /// Returns `true` when the current level of `buffer` is below the
    /// silence threshold.
    pub fn is_silent(&self, buffer: &AudioBuffer) -> bool {
        self.level(buffer) < self.threshold
    }

    fn window_samples(sample_rate: u32, channels: u16) -> usize {
        (sample_rate as usize * channels as usize * Self::WINDOW_MS as usize) / 1_000
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn one_second(value: f32) -> AudioBuffer {
        AudioBuffer::from_samples(vec![value; 16_000], 16_000, 1)
    }

    #[test]
    fn silence_reads_zero() {
        let monitor = SilenceMonitor::new(0.01);
        assert_eq!(monitor.level(&one_second(0.0)), 0.0);
    }

    #[test]
    fn full_scale_reads_one() {
        let monitor = SilenceMonitor::new(0.01);
        let level = monitor.level(&one_second(1.0));
        assert!((level - 1.0).abs() < 1e-6);
    }

    #[test]
    fn full_scale_negative_reads_one() {
        let monitor = SilenceMonitor::new(0.01);
        let level = monitor.level(&one_second(-1.0));
        assert!((level - 1.0).abs() < 1e-6);
    }

    #[test]
    fn level_is_pure_under_repeated_calls() {
        let monitor = SilenceMonitor::new(0.01);
        let buf = one_second(0.25);
        let first = monitor.level(&buf);
        for _ in 0..5 {
            assert_eq!(monitor.level(&buf), first);
        }
    }

    #[test]
    fn short_buffer_reads_zero() {
        let monitor = SilenceMonitor::new(0.01);
        // 50 ms at 16 kHz — shorter than the 100 ms window.
        let buf = AudioBuffer::from_samples(vec![1.0; 800], 16_000, 1);
        assert_eq!(monitor.level(&buf), 0.0);
    }

    #[test]
    fn level_uses_recent_window_only() {
        let monitor = SilenceMonitor::new(0.01);
        // 1 s of full-scale followed by 100 ms of silence: the window covers
        // only the trailing silence.
        let mut samples = vec![1.0_f32; 16_000];
        samples.extend(vec![0.0_f32; 1_600]);
        let buf = AudioBuffer::from_samples(samples, 16_000, 1);
        assert_eq!(monitor.level(&buf), 0.0);
    }

    #[test]
    fn rms_of_empty_slice_is_zero() {
        assert_eq!(SilenceMonitor::rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_half_scale_square_wave() {
        let samples: Vec<f32> = (0..1_000)
            .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        assert!((SilenceMonitor::rms(&samples) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn silence_classification_respects_threshold() {
        let monitor = SilenceMonitor::new(0.1);
        assert!(monitor.is_silent(&one_second(0.01)));
        assert!(!monitor.is_silent(&one_second(0.5)));
    }
}
