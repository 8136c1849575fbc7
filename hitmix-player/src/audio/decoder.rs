//! Audio decoder using symphonia
//!
//! Decodes whole sample files (WAV, OGG/Vorbis, MP3, FLAC) to interleaved
//! stereo f32. Hit sounds are short, so everything is decoded up front.

use crate::error::{Error, Result};
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decoded PCM: interleaved stereo samples and their sample rate
pub type DecodedPcm = (Vec<f32>, u32);

/// Simple whole-file decoder
pub struct SimpleDecoder;

impl SimpleDecoder {
    /// Decode an audio file to interleaved stereo f32
    ///
    /// # Errors
    /// - Failed to open file
    /// - Unsupported audio format
    /// - No decodable audio track
    pub fn decode_file(path: &Path) -> Result<DecodedPcm> {
        debug!("Decoding file: {}", path.display());

        let file = std::fs::File::open(path)
            .map_err(|e| Error::Decode(format!("Failed to open file {}: {}", path.display(), e)))?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        Self::decode_source(Box::new(file), hint)
    }

    /// Decode in-memory encoded audio (e.g. samples embedded in a skin archive)
    pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedPcm> {
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }
        Self::decode_source(Box::new(Cursor::new(bytes)), hint)
    }

    fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<DecodedPcm> {
        let mss = MediaSourceStream::new(source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let mut sample_rate = codec_params.sample_rate.unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    let channels = spec.channels.count();
                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    push_stereo(buffer.samples(), channels, &mut samples);
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(Error::Decode(format!("Decode failed: {}", e))),
            }
        }

        if sample_rate == 0 {
            return Err(Error::Decode("Sample rate not found".to_string()));
        }

        debug!(
            "Decoded {} frames at {}Hz",
            samples.len() / 2,
            sample_rate
        );

        Ok((samples, sample_rate))
    }
}

/// Append interleaved `channels`-channel samples as stereo
///
/// Mono is duplicated to both sides; anything wider keeps the first two
/// channels.
fn push_stereo(interleaved: &[f32], channels: usize, output: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => output.extend(interleaved.iter().flat_map(|&s| [s, s])),
        2 => output.extend_from_slice(interleaved),
        n => {
            for frame in interleaved.chunks_exact(n) {
                output.push(frame[0]);
                output.push(frame[1]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_stereo_mono() {
        let mut out = Vec::new();
        push_stereo(&[0.1, 0.2], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_push_stereo_passthrough() {
        let mut out = Vec::new();
        push_stereo(&[0.1, 0.2, 0.3, 0.4], 2, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_push_stereo_downmix_keeps_front_pair() {
        let mut out = Vec::new();
        push_stereo(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, &mut out);
        assert_eq!(out, vec![1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_decode_missing_file_is_decode_error() {
        let result = SimpleDecoder::decode_file(Path::new("/nonexistent/hit.wav"));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_wav_bytes() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..2205 {
                writer.write_sample(((i % 100) as i16) * 100).unwrap();
            }
            writer.finalize().unwrap();
        }

        let (samples, rate) = SimpleDecoder::decode_bytes(cursor.into_inner(), Some("wav")).unwrap();
        assert_eq!(rate, 22050);
        assert_eq!(samples.len(), 2205 * 2);
    }
}
