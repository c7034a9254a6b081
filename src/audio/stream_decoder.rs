//! Generic decoder trait for synthesized-speech payloads.

use anyhow::Result;

/// A trait for audio decoders that convert an encoded text-to-speech
/// payload into interleaved i16 PCM samples ready for ALSA playback.
///
/// Implementations handle format-specific parsing, resampling, and
/// channel conversion internally.
pub trait StreamDecoder: Send {
    /// Decode one complete synthesized payload into interleaved i16 PCM.
    fn decode(&mut self, data: &[u8]) -> Result<Vec<i16>>;
}
