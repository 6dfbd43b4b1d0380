//! WAV encoding for 16-bit mono PCM.

use std::io::{self, Write};

const BYTES_PER_SAMPLE: u32 = 2;
const HEADER_LEN: usize = 44;

/// Write `samples` as a canonical 44-byte-header mono WAV file.
///
/// Fails with `InvalidInput` if the data would not fit the format's
/// 32-bit chunk sizes.
pub fn write_wav(w: &mut impl Write, samples: &[f32], sample_rate: u32) -> io::Result<()> {
    let data_len = u32::try_from(samples.len())
        .ok()
        .and_then(|n| n.checked_mul(BYTES_PER_SAMPLE))
        .filter(|&n| n <= u32::MAX - 36)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "too many samples for WAV"))?;

    let mut header = [0u8; HEADER_LEN];
    let fields: [(usize, &[u8]); 12] = [
        (0, b"RIFF"),
        (4, &(36 + data_len).to_le_bytes()),
        (8, b"WAVEfmt "),
        (16, &16u32.to_le_bytes()),
        // PCM, one channel
        (20, &1u16.to_le_bytes()),
        (22, &1u16.to_le_bytes()),
        (24, &sample_rate.to_le_bytes()),
        (28, &sample_rate.saturating_mul(BYTES_PER_SAMPLE).to_le_bytes()),
        (32, &(BYTES_PER_SAMPLE as u16).to_le_bytes()),
        (34, &16u16.to_le_bytes()),
        (36, b"data"),
        (40, &data_len.to_le_bytes()),
    ];
    for (at, bytes) in fields {
        header[at..at + bytes.len()].copy_from_slice(bytes);
    }
    w.write_all(&header)?;

    for &sample in samples {
        w.write_all(&to_pcm16(sample).to_le_bytes())?;
    }
    Ok(())
}

pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(HEADER_LEN + samples.len() * BYTES_PER_SAMPLE as usize);
    write_wav(&mut buf, samples, sample_rate)?;
    Ok(buf)
}

/// Full-scale f32 to 16-bit PCM, clipping outside [-1, 1].
fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}
