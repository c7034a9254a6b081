//! audio - Microphone level metering and spoken-answer playback
//!
//! Uses ALSA for audio I/O on dedicated std::thread workers (NOT tokio
//! tasks) to keep real-time I/O off the async runtime. The capture side
//! feeds the level visualizer; the playback side renders synthesized
//! speech with preemptive stop.

mod alsa_device;
pub mod analyser;
pub mod level_meter;
pub mod level_monitor;
pub mod pcm_codec;
pub mod playback;
pub mod stream_decoder;

pub use stream_decoder::StreamDecoder;

use crate::config::Config;

/// Audio subsystem configuration.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// ALSA capture device name (e.g. "default", "plughw:0,0")
    pub capture_device: String,
    /// ALSA playback device name
    pub playback_device: String,
    /// Desired ALSA capture sample rate (may be negotiated by hardware)
    pub capture_sample_rate: u32,
    /// Desired ALSA capture channel count
    pub capture_channels: u32,
    /// Desired capture period size; one level-meter tick per period
    pub capture_period_size: usize,
    /// Desired ALSA playback sample rate
    pub playback_sample_rate: u32,
    /// Desired ALSA playback channel count
    pub playback_channels: u32,
    /// Desired ALSA playback period size (0 = let ALSA decide)
    pub playback_period_size: usize,
    /// Encoding of the synthesized-speech payload: "wav" or "pcm"
    pub stream_format: String,
    /// Sample rate of raw "pcm" payloads (WAV carries its own)
    pub stream_sample_rate: u32,
    /// Channel count of raw "pcm" payloads
    pub stream_channels: u32,
}

impl AudioConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            capture_device: config.capture_device.to_string(),
            playback_device: config.playback_device.to_string(),
            capture_sample_rate: config.capture_sample_rate,
            capture_channels: config.capture_channels,
            capture_period_size: config.capture_period_size,
            playback_sample_rate: config.playback_sample_rate,
            playback_channels: config.playback_channels,
            playback_period_size: config.playback_period_size,
            stream_format: config.stream_format.to_string(),
            stream_sample_rate: config.stream_sample_rate,
            stream_channels: config.stream_channels,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture_device: "default".to_string(),
            playback_device: "default".to_string(),
            capture_sample_rate: 16000,
            capture_channels: 1,
            capture_period_size: 256,
            playback_sample_rate: 24000,
            playback_channels: 1,
            playback_period_size: 1024,
            stream_format: "wav".to_string(),
            stream_sample_rate: 24000,
            stream_channels: 1,
        }
    }
}
