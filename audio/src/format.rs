//! 16-bit PCM format description.

use std::time::Duration;

/// Describes signed 16-bit little-endian PCM audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    /// Sample rate in Hz (e.g., 16000, 24000).
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl Format {
    /// Creates a mono format with the given sample rate.
    pub const fn mono(sample_rate: u32) -> Self {
        Self { sample_rate, channels: 1 }
    }

    /// Creates a stereo format with the given sample rate.
    pub const fn stereo(sample_rate: u32) -> Self {
        Self { sample_rate, channels: 2 }
    }

    /// Bit depth, always 16.
    pub const fn depth(&self) -> u16 {
        16
    }

    /// Bytes per sample frame (all channels).
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * 2
    }

    /// Bytes per second.
    pub fn bytes_rate(&self) -> u32 {
        self.sample_rate * self.bytes_per_frame() as u32
    }

    /// Number of bytes holding `duration` of audio, rounded down to whole frames.
    pub fn bytes_in_duration(&self, duration: Duration) -> usize {
        let frames = duration.as_nanos() * self.sample_rate as u128 / 1_000_000_000;
        frames as usize * self.bytes_per_frame()
    }

    /// Playback duration of `len` bytes.
    pub fn duration(&self, len: usize) -> Duration {
        let frames = (len / self.bytes_per_frame()) as u64;
        Duration::from_nanos(frames * 1_000_000_000 / self.sample_rate as u64)
    }

    /// Number of sample frames in `len` bytes. A trailing partial frame is ignored.
    pub fn samples(&self, len: usize) -> usize {
        len / self.bytes_per_frame()
    }
}

// Rates used by the speech services.
impl Format {
    /// 16kHz mono, the ASR / dialog upstream rate.
    pub const MONO_16K: Format = Format::mono(16000);
    /// 24kHz mono, the TTS downstream rate.
    pub const MONO_24K: Format = Format::mono(24000);
    /// 48kHz mono.
    pub const MONO_48K: Format = Format::mono(48000);
}

/// Converts little-endian PCM bytes to samples.
pub(crate) fn to_samples(data: &[u8]) -> Vec<i16> {
    data.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_properties() {
        let format = Format::MONO_16K;
        assert_eq!(format.sample_rate, 16000);
        assert_eq!(format.channels, 1);
        assert_eq!(format.depth(), 16);
        assert_eq!(format.bytes_rate(), 32000);
        assert_eq!(Format::stereo(48000).bytes_per_frame(), 4);
    }

    #[test]
    fn test_bytes_in_duration() {
        let format = Format::MONO_24K;
        assert_eq!(format.bytes_in_duration(Duration::from_secs(1)), 48000);
        assert_eq!(format.bytes_in_duration(Duration::from_millis(20)), 960);
    }

    #[test]
    fn test_duration_and_samples() {
        let format = Format::MONO_16K;
        assert_eq!(format.duration(3200), Duration::from_millis(100));
        assert_eq!(format.samples(3201), 1600);
    }

    #[test]
    fn test_to_samples_ignores_odd_byte() {
        let samples = to_samples(&[0x01, 0x00, 0xff, 0xff, 0x07]);
        assert_eq!(samples, vec![1, -1]);
    }
}
