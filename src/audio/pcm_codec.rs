//! WAV / raw PCM decoders with integrated resampling and channel conversion.
//!
//! - WavDecoder: RIFF parse → linear resample → channel convert
//! - RawPcmDecoder: headerless s16le payloads at a configured rate
//!
//! LINEAR16 synthesis payloads arrive as little WAV files; both decoders
//! emit interleaved i16 at the negotiated ALSA playback rate.

use super::stream_decoder::StreamDecoder;
use anyhow::Result;

/// Format read from a WAV header.
#[derive(Debug, Clone, PartialEq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u32,
}

/// Decoder for complete RIFF/WAVE payloads (16-bit PCM only).
pub struct WavDecoder {
    output_sample_rate: u32,
    output_channels: u32,
}

impl WavDecoder {
    /// * `output_sample_rate` - ALSA playback sample rate
    /// * `output_channels`    - ALSA playback channels
    pub fn new(output_sample_rate: u32, output_channels: u32) -> Self {
        Self {
            output_sample_rate,
            output_channels,
        }
    }
}

impl StreamDecoder for WavDecoder {
    fn decode(&mut self, data: &[u8]) -> Result<Vec<i16>> {
        let (format, samples) = parse_wav(data)?;
        let resampled = resample_linear(
            &samples,
            format.channels,
            format.sample_rate,
            self.output_sample_rate,
        );
        Ok(convert_channels(
            &resampled,
            format.channels,
            self.output_channels,
        ))
    }
}

/// Decoder for headerless s16le payloads at a configured rate/layout.
pub struct RawPcmDecoder {
    input_sample_rate: u32,
    input_channels: u32,
    output_sample_rate: u32,
    output_channels: u32,
}

impl RawPcmDecoder {
    pub fn new(
        input_sample_rate: u32,
        input_channels: u32,
        output_sample_rate: u32,
        output_channels: u32,
    ) -> Self {
        Self {
            input_sample_rate,
            input_channels,
            output_sample_rate,
            output_channels,
        }
    }
}

impl StreamDecoder for RawPcmDecoder {
    fn decode(&mut self, data: &[u8]) -> Result<Vec<i16>> {
        if data.len() % 2 != 0 {
            anyhow::bail!("Raw PCM payload has an odd byte length");
        }
        let samples: Vec<i16> = data
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        let resampled = resample_linear(
            &samples,
            self.input_channels,
            self.input_sample_rate,
            self.output_sample_rate,
        );
        Ok(convert_channels(
            &resampled,
            self.input_channels,
            self.output_channels,
        ))
    }
}

/// Parse a 16-bit PCM RIFF/WAVE payload into its format and samples.
pub fn parse_wav(data: &[u8]) -> Result<(WavFormat, Vec<i16>)> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        anyhow::bail!("Payload is not a RIFF/WAVE stream");
    }

    let mut format: Option<WavFormat> = None;
    let mut samples: Option<Vec<i16>> = None;

    // Walk the chunk list; chunks are word-aligned.
    let mut offset = 12;
    while offset + 8 <= data.len() {
        let id = &data[offset..offset + 4];
        let size = u32::from_le_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]) as usize;
        let body_start = offset + 8;
        let body_end = body_start.checked_add(size).filter(|&e| e <= data.len());
        let Some(body_end) = body_end else {
            anyhow::bail!("Truncated WAV chunk '{}'", String::from_utf8_lossy(id));
        };
        let body = &data[body_start..body_end];

        match id {
            b"fmt " => {
                if body.len() < 16 {
                    anyhow::bail!("WAV fmt chunk too short");
                }
                let audio_format = u16::from_le_bytes([body[0], body[1]]);
                let channels = u16::from_le_bytes([body[2], body[3]]) as u32;
                let sample_rate =
                    u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                let bits = u16::from_le_bytes([body[14], body[15]]);
                if audio_format != 1 || bits != 16 {
                    anyhow::bail!(
                        "Unsupported WAV encoding: format={}, bits={}",
                        audio_format,
                        bits
                    );
                }
                if channels == 0 || sample_rate == 0 {
                    anyhow::bail!("Invalid WAV format parameters");
                }
                format = Some(WavFormat {
                    sample_rate,
                    channels,
                });
            }
            b"data" => {
                samples = Some(
                    body.chunks_exact(2)
                        .map(|b| i16::from_le_bytes([b[0], b[1]]))
                        .collect(),
                );
            }
            _ => {}
        }

        offset = body_end + (size % 2);
    }

    match (format, samples) {
        (Some(format), Some(samples)) => {
            // A data chunk that is not a whole number of frames would make
            // every frame index downstream unreliable.
            if samples.len() % format.channels as usize != 0 {
                anyhow::bail!("WAV data chunk does not contain whole frames");
            }
            Ok((format, samples))
        }
        (None, _) => anyhow::bail!("WAV payload has no fmt chunk"),
        (_, None) => anyhow::bail!("WAV payload has no data chunk"),
    }
}

/// Linear-interpolation resampler over interleaved frames.
pub fn resample_linear(pcm: &[i16], channels: u32, in_rate: u32, out_rate: u32) -> Vec<i16> {
    let channels = channels as usize;
    if in_rate == out_rate || pcm.is_empty() || channels == 0 {
        return pcm.to_vec();
    }

    let in_frames = pcm.len() / channels;
    if in_frames == 0 {
        return Vec::new();
    }
    let out_frames =
        ((in_frames as u64 * out_rate as u64) / in_rate as u64).max(1) as usize;
    let step = in_rate as f64 / out_rate as f64;

    let mut out = vec![0i16; out_frames * channels];
    for frame in 0..out_frames {
        let pos = frame as f64 * step;
        let base = pos as usize;
        let frac = pos - base as f64;
        let next = (base + 1).min(in_frames - 1);
        for ch in 0..channels {
            let a = pcm[base * channels + ch] as f64;
            let b = pcm[next * channels + ch] as f64;
            out[frame * channels + ch] = (a + (b - a) * frac).round() as i16;
        }
    }
    out
}

/// Convert interleaved frames between channel layouts: downmix by
/// averaging, upmix by wrapping source channels.
pub fn convert_channels(pcm: &[i16], in_channels: u32, out_channels: u32) -> Vec<i16> {
    let in_channels = in_channels as usize;
    let out_channels = out_channels as usize;
    if in_channels == out_channels || in_channels == 0 {
        return pcm.to_vec();
    }

    let frames = pcm.len() / in_channels;
    if out_channels == 1 {
        let mut mono = vec![0i16; frames];
        for i in 0..frames {
            let mut sum: i32 = 0;
            for c in 0..in_channels {
                sum += pcm[i * in_channels + c] as i32;
            }
            mono[i] = (sum / in_channels as i32) as i16;
        }
        mono
    } else {
        let mut out = vec![0i16; frames * out_channels];
        for i in 0..frames {
            for c in 0..out_channels {
                out[i * out_channels + c] = pcm[i * in_channels + (c % in_channels)];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal 16-bit PCM WAV payload.
    fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let data_len = samples.len() * 2;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((36 + data_len) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        let byte_rate = sample_rate * channels as u32 * 2;
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&(channels * 2).to_le_bytes()); // block align
        out.extend_from_slice(&16u16.to_le_bytes()); // bits
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data_len as u32).to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn parses_wav_header_and_samples() {
        let bytes = wav_bytes(24000, 1, &[0, 100, -100, 32000]);
        let (format, samples) = parse_wav(&bytes).unwrap();
        assert_eq!(
            format,
            WavFormat {
                sample_rate: 24000,
                channels: 1
            }
        );
        assert_eq!(samples, vec![0, 100, -100, 32000]);
    }

    #[test]
    fn rejects_non_wav_payload() {
        assert!(parse_wav(b"not audio at all").is_err());
        assert!(parse_wav(b"RIFF\x00\x00\x00\x00MP3 ").is_err());
    }

    #[test]
    fn rejects_truncated_data_chunk() {
        let mut bytes = wav_bytes(24000, 1, &[1, 2, 3, 4]);
        bytes.truncate(bytes.len() - 3);
        assert!(parse_wav(&bytes).is_err());
    }

    #[test]
    fn decoder_passes_through_matching_format() {
        let bytes = wav_bytes(24000, 1, &[10, -10, 20]);
        let mut decoder = WavDecoder::new(24000, 1);
        assert_eq!(decoder.decode(&bytes).unwrap(), vec![10, -10, 20]);
    }

    #[test]
    fn decoder_upmixes_mono_to_stereo() {
        let bytes = wav_bytes(24000, 1, &[7, 9]);
        let mut decoder = WavDecoder::new(24000, 2);
        assert_eq!(decoder.decode(&bytes).unwrap(), vec![7, 7, 9, 9]);
    }

    #[test]
    fn resample_doubles_frame_count() {
        let out = resample_linear(&[0, 1000], 1, 12000, 24000);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 0);
        // Interpolated midpoint between 0 and 1000.
        assert_eq!(out[1], 500);
    }

    #[test]
    fn downmix_averages_channels() {
        let out = convert_channels(&[100, 200, -100, -200], 2, 1);
        assert_eq!(out, vec![150, -150]);
    }

    #[test]
    fn rejects_stereo_payload_with_partial_frame() {
        // One i16 of data in a stereo stream: not even one whole frame.
        let bytes = wav_bytes(48000, 2, &[5]);
        let mut decoder = WavDecoder::new(24000, 1);
        assert!(decoder.decode(&bytes).is_err());
    }

    #[test]
    fn resampling_less_than_one_frame_yields_no_output() {
        assert!(resample_linear(&[5], 2, 48000, 24000).is_empty());
        assert!(resample_linear(&[], 1, 48000, 24000).is_empty());
    }

    #[test]
    fn raw_pcm_rejects_odd_length() {
        let mut decoder = RawPcmDecoder::new(24000, 1, 24000, 1);
        assert!(decoder.decode(&[1, 2, 3]).is_err());
    }
}
