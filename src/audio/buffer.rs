//! Append-only sample buffer for one capture session.
//!
//! [`AudioBuffer`] grows monotonically while recording and is frozen when
//! [`crate::audio::AudioCapture::stop`] transfers it by value to the
//! pipeline task.  Samples are normalized `f32` in `[-1.0, 1.0]`; integer
//! hardware formats are converted deterministically (`sample / i16::MAX`)
//! on the way in.

// ---------------------------------------------------------------------------
// AudioBuffer
// ---------------------------------------------------------------------------

/// An ordered, append-only sequence of normalized samples plus the stream
/// metadata needed to interpret them.
///
/// # Example
///
/// ```rust
/// use speaktype::audio::AudioBuffer;
///
/// let mut buf = AudioBuffer::new(16_000, 1);
/// buf.push_slice(&[0.0; 8_000]);
/// assert!((buf.duration_secs() - 0.5).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Create an empty buffer for a stream at `sample_rate` Hz with
    /// `channels` interleaved channels.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: Vec::new(),
            sample_rate,
            channels,
        }
    }

    /// Build a buffer directly from samples (useful in tests).
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Append normalized `f32` samples.
    pub fn push_slice(&mut self, data: &[f32]) {
        self.samples.extend_from_slice(data);
    }

    /// Append `i16` hardware samples, converting each to normalized `f32`
    /// via `sample / i16::MAX`.
    pub fn push_slice_i16(&mut self, data: &[i16]) {
        self.samples
            .extend(data.iter().map(|&s| f32::from(s) / f32::from(i16::MAX)));
    }

    /// All samples recorded so far, in arrival order.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Consume the buffer and return the raw sample vector.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Number of samples recorded so far.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` when no samples have been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample rate of the stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Recorded duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let buf = AudioBuffer::new(16_000, 1);
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.duration_secs(), 0.0);
    }

    #[test]
    fn push_slice_appends_in_order() {
        let mut buf = AudioBuffer::new(16_000, 1);
        buf.push_slice(&[0.1, 0.2]);
        buf.push_slice(&[0.3]);
        assert_eq!(buf.samples(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn length_is_non_decreasing() {
        let mut buf = AudioBuffer::new(16_000, 1);
        let mut last = 0;
        for _ in 0..10 {
            buf.push_slice(&[0.0; 160]);
            assert!(buf.len() >= last);
            last = buf.len();
        }
        assert_eq!(buf.len(), 1_600);
    }

    #[test]
    fn i16_conversion_is_deterministic() {
        let mut buf = AudioBuffer::new(16_000, 1);
        buf.push_slice_i16(&[0, i16::MAX, -i16::MAX]);

        let s = buf.samples();
        assert_eq!(s[0], 0.0);
        assert!((s[1] - 1.0).abs() < 1e-6);
        assert!((s[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn i16_min_stays_within_range() {
        let mut buf = AudioBuffer::new(16_000, 1);
        buf.push_slice_i16(&[i16::MIN]);
        // i16::MIN / i16::MAX is slightly below -1.0 in magnitude terms;
        // verify it stays close to the nominal range.
        assert!(buf.samples()[0] <= -1.0);
        assert!(buf.samples()[0] >= -1.001);
    }

    #[test]
    fn duration_accounts_for_rate_and_channels() {
        let mut mono = AudioBuffer::new(16_000, 1);
        mono.push_slice(&vec![0.0; 16_000]);
        assert!((mono.duration_secs() - 1.0).abs() < 1e-6);

        let mut stereo = AudioBuffer::new(16_000, 2);
        stereo.push_slice(&vec![0.0; 16_000]);
        assert!((stereo.duration_secs() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_rate_duration_is_zero() {
        let buf = AudioBuffer::new(0, 1);
        assert_eq!(buf.duration_secs(), 0.0);
    }

    #[test]
    fn into_samples_returns_everything() {
        let buf = AudioBuffer::from_samples(vec![0.5; 100], 16_000, 1);
        assert_eq!(buf.into_samples().len(), 100);
    }
}
