//! RIFF/WAVE container for 16-bit PCM.

use crate::{Error, Format, Result};

const HEADER_LEN: usize = 44;
const WAVE_FORMAT_PCM: u16 = 1;

/// Wraps PCM bytes in a canonical 44-byte WAV header.
pub fn encode(format: Format, pcm: &[u8]) -> Vec<u8> {
    let data_len = pcm.len() as u32;
    let block_align = format.bytes_per_frame() as u16;

    let mut out = Vec::with_capacity(HEADER_LEN + pcm.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&format.channels.to_le_bytes());
    out.extend_from_slice(&format.sample_rate.to_le_bytes());
    out.extend_from_slice(&format.bytes_rate().to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&format.depth().to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(pcm);
    out
}

/// Parses a WAV file and returns its format and PCM payload.
///
/// Chunks other than `fmt ` and `data` are skipped. Only 16-bit PCM is
/// accepted. A `data` chunk whose declared size overruns the buffer is
/// truncated to what is present, which matches what streaming encoders emit.
pub fn decode(data: &[u8]) -> Result<(Format, Vec<u8>)> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(Error::InvalidWav("missing RIFF/WAVE header".into()));
    }

    let mut format: Option<Format> = None;
    let mut pos = 12;
    while pos + 8 <= data.len() {
        let id = &data[pos..pos + 4];
        let size = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
            as usize;
        let body = pos + 8;

        match id {
            b"fmt " => {
                if size < 16 || body + 16 > data.len() {
                    return Err(Error::InvalidWav("fmt chunk too short".into()));
                }
                let le16 = |o: usize| u16::from_le_bytes([data[body + o], data[body + o + 1]]);
                let audio_format = le16(0);
                let channels = le16(2);
                let sample_rate = u32::from_le_bytes([
                    data[body + 4],
                    data[body + 5],
                    data[body + 6],
                    data[body + 7],
                ]);
                let bits = le16(14);
                if audio_format != WAVE_FORMAT_PCM || bits != 16 {
                    return Err(Error::UnsupportedWav { format: audio_format, bits });
                }
                if channels == 0 || sample_rate == 0 {
                    return Err(Error::InvalidWav("zero channels or sample rate".into()));
                }
                format = Some(Format { sample_rate, channels });
            }
            b"data" => {
                let format =
                    format.ok_or_else(|| Error::InvalidWav("data chunk before fmt".into()))?;
                let end = (body + size).min(data.len());
                return Ok((format, data[body..end].to_vec()));
            }
            _ => {}
        }

        // Chunks are word aligned.
        pos = body + size + (size & 1);
    }

    Err(Error::InvalidWav("no data chunk".into()))
}

/// Decodes a WAV file into samples.
pub fn decode_samples(data: &[u8]) -> Result<(Format, Vec<i16>)> {
    let (format, pcm) = decode(data)?;
    Ok((format, crate::format::to_samples(&pcm)))
}
