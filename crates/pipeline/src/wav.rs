//! PCM16 WAV encoding

use std::io::Cursor;

use crate::CaptureError;

pub const WAV_MIME: &str = "audio/wav";

/// Encode interleaved PCM16 samples as a WAV file in memory
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>, CaptureError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| CaptureError::Encoding(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

/// Little-endian PCM16 bytes to samples; a trailing odd byte is ignored
pub fn pcm16_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Float samples in [-1, 1] to little-endian PCM16 bytes
pub fn f32_to_pcm16_le(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}
