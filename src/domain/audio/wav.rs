//! Streaming WAV container helpers
//!
//! Chunks hold raw 16-bit PCM only. The header is derived from the
//! session's `PcmFormat` when chunks are reassembled, so any subset of
//! chunks still forms a playable file.

use std::io::Cursor;
use std::time::Duration as StdDuration;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;

use super::PcmFormat;

/// Bit depth of recorded PCM
pub const BITS_PER_SAMPLE: u16 = 16;

/// WAV container errors
#[derive(Debug, Error)]
pub enum WavError {
    #[error("WAV encoding failed: {0}")]
    Encoding(#[from] hound::Error),

    #[error("Not a RIFF/WAVE stream")]
    NotWav,

    #[error("WAV stream has no data chunk")]
    MissingData,

    #[error("WAV stream exceeds 4 GiB")]
    TooLarge,
}

/// Build a header for a stream of 16-bit PCM in the given format.
pub fn stream_header(format: PcmFormat) -> Result<Vec<u8>, WavError> {
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    WavWriter::new(&mut cursor, spec)?.finalize()?;
    Ok(cursor.into_inner())
}

/// Encode interleaved samples as little-endian 16-bit PCM.
pub fn encode_samples(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Rewrite the RIFF and data chunk sizes to match the buffer length.
pub fn finalize_stream(bytes: &mut [u8]) -> Result<(), WavError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(WavError::NotWav);
    }

    let riff_size = u32::try_from(bytes.len() - 8).map_err(|_| WavError::TooLarge)?;

    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = u32::from_le_bytes([
            bytes[pos + 4],
            bytes[pos + 5],
            bytes[pos + 6],
            bytes[pos + 7],
        ]) as usize;

        if id == b"data" {
            let data_len = bytes.len() - (pos + 8);
            let data_size = u32::try_from(data_len).map_err(|_| WavError::TooLarge)?;
            bytes[pos + 4..pos + 8].copy_from_slice(&data_size.to_le_bytes());
            bytes[4..8].copy_from_slice(&riff_size.to_le_bytes());
            return Ok(());
        }

        // Chunks are word aligned
        pos += 8 + size + (size & 1);
    }

    Err(WavError::MissingData)
}

/// Wrap raw PCM in a header with sizes matching its length.
pub fn wrap_pcm(format: PcmFormat, pcm: &[u8]) -> Result<Vec<u8>, WavError> {
    let mut bytes = stream_header(format)?;
    bytes.reserve(pcm.len());
    bytes.extend_from_slice(pcm);
    finalize_stream(&mut bytes)?;
    Ok(bytes)
}

/// Playback duration of a finalized WAV buffer.
pub fn duration(bytes: &[u8]) -> Result<StdDuration, WavError> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Ok(StdDuration::ZERO);
    }
    let frames = reader.duration() as u64;
    Ok(StdDuration::from_micros(
        frames * 1_000_000 / spec.sample_rate as u64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(format: PcmFormat, parts: &[&[i16]]) -> Vec<u8> {
        let mut bytes = stream_header(format).unwrap();
        for part in parts {
            bytes.extend(encode_samples(part));
        }
        bytes
    }

    #[test]
    fn header_is_riff_wave() {
        let header = stream_header(PcmFormat::speech()).unwrap();
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
    }

    #[test]
    fn concatenated_chunks_decode_after_finalize() {
        let format = PcmFormat::speech();
        let mut bytes = assemble(format, &[&[1, 2, 3, 4], &[5, 6], &[7, 8, 9, 10]]);
        finalize_stream(&mut bytes).unwrap();

        let mut reader = WavReader::new(Cursor::new(&bytes)).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn duration_of_finalized_stream() {
        let format = PcmFormat::new(8_000, 2);
        let one_second = vec![0i16; 16_000];
        let mut bytes = assemble(format, &[&one_second, &one_second[..8_000]]);
        finalize_stream(&mut bytes).unwrap();

        assert_eq!(duration(&bytes).unwrap(), StdDuration::from_millis(1_500));
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut bytes = assemble(PcmFormat::speech(), &[&[1, 2, 3]]);
        finalize_stream(&mut bytes).unwrap();
        let once = bytes.clone();
        finalize_stream(&mut bytes).unwrap();
        assert_eq!(once, bytes);
    }

    #[test]
    fn wrapped_pcm_is_playable() {
        let pcm = encode_samples(&vec![7i16; 4_000]);
        let bytes = wrap_pcm(PcmFormat::new(8_000, 1), &pcm).unwrap();

        assert_eq!(duration(&bytes).unwrap(), StdDuration::from_millis(500));
    }

    #[test]
    fn wrapping_empty_pcm_gives_empty_file() {
        let bytes = wrap_pcm(PcmFormat::speech(), &[]).unwrap();
        assert_eq!(duration(&bytes).unwrap(), StdDuration::ZERO);
    }

    #[test]
    fn finalize_rejects_non_wav() {
        let mut bytes = b"OggS not a wav stream".to_vec();
        assert!(matches!(finalize_stream(&mut bytes), Err(WavError::NotWav)));
    }

    #[test]
    fn encode_samples_little_endian() {
        assert_eq!(encode_samples(&[1, -1]), vec![0x01, 0x00, 0xff, 0xff]);
    }
}
