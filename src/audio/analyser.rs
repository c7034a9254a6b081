//! Frequency analyser over the microphone stream.
//!
//! Reproduces the byte-magnitude contract the level visualizer samples:
//! a 256-point window, per-bin magnitudes smoothed with a 0.85 time
//! constant, then mapped from the -90..-10 dB range onto 0..255.

use std::f32::consts::PI;

/// Analysis window length in samples.
pub const FFT_SIZE: usize = 256;
/// Number of frequency bins produced per tick.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

const SMOOTHING_TIME_CONSTANT: f32 = 0.85;
const MIN_DECIBELS: f32 = -90.0;
const MAX_DECIBELS: f32 = -10.0;

pub struct SpectrumAnalyser {
    /// Ring buffer of the most recent normalized samples.
    window: [f32; FFT_SIZE],
    pos: usize,
    /// Per-bin magnitudes carried across ticks for temporal smoothing.
    smoothed: [f32; BIN_COUNT],
}

impl SpectrumAnalyser {
    pub fn new() -> Self {
        Self {
            window: [0.0; FFT_SIZE],
            pos: 0,
            smoothed: [0.0; BIN_COUNT],
        }
    }

    /// Push captured samples into the analysis window, oldest dropped first.
    pub fn feed(&mut self, samples: &[i16]) {
        for &s in samples {
            self.window[self.pos] = s as f32 / 32768.0;
            self.pos = (self.pos + 1) % FFT_SIZE;
        }
    }

    /// Current byte-scaled magnitude per frequency bin.
    ///
    /// Bin `k` is centered at `k * sample_rate / FFT_SIZE` Hz. Silence maps
    /// to 0, a full-scale tone saturates toward 255.
    pub fn byte_frequency_data(&mut self) -> [u8; BIN_COUNT] {
        // Unroll the ring into time order and apply a Blackman window.
        let mut x = [0.0f32; FFT_SIZE];
        for (i, slot) in x.iter_mut().enumerate() {
            *slot = self.window[(self.pos + i) % FFT_SIZE];
        }
        for (n, sample) in x.iter_mut().enumerate() {
            let t = n as f32 / (FFT_SIZE - 1) as f32;
            let w = 0.42 - 0.5 * (2.0 * PI * t).cos() + 0.08 * (4.0 * PI * t).cos();
            *sample *= w;
        }

        let mut out = [0u8; BIN_COUNT];
        for (k, byte) in out.iter_mut().enumerate() {
            let mut re = 0.0f32;
            let mut im = 0.0f32;
            for (n, &sample) in x.iter().enumerate() {
                let phase = -2.0 * PI * (k * n) as f32 / FFT_SIZE as f32;
                re += sample * phase.cos();
                im += sample * phase.sin();
            }
            let magnitude = (re * re + im * im).sqrt() / FFT_SIZE as f32;

            self.smoothed[k] = SMOOTHING_TIME_CONSTANT * self.smoothed[k]
                + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;

            let db = if self.smoothed[k] > 0.0 {
                20.0 * self.smoothed[k].log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
            *byte = scaled.clamp(0.0, 255.0) as u8;
        }
        out
    }
}

impl Default for SpectrumAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(bin: usize, amplitude: f32) -> Vec<i16> {
        (0..FFT_SIZE)
            .map(|n| {
                let v = amplitude * (2.0 * PI * bin as f32 * n as f32 / FFT_SIZE as f32).sin();
                (v * 32767.0) as i16
            })
            .collect()
    }

    #[test]
    fn silence_produces_zero_bytes() {
        let mut analyser = SpectrumAnalyser::new();
        analyser.feed(&vec![0i16; FFT_SIZE]);
        let data = analyser.byte_frequency_data();
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_concentrates_energy_in_its_bin() {
        let mut analyser = SpectrumAnalyser::new();
        let samples = tone(10, 1.0);
        analyser.feed(&samples);
        // Run several ticks so the temporal smoothing converges.
        let mut data = [0u8; BIN_COUNT];
        for _ in 0..12 {
            data = analyser.byte_frequency_data();
        }
        assert!(data[10] > 200, "bin 10 was {}", data[10]);
        assert!(data[10] > data[40]);
        assert!(data[64] < 50);
    }

    #[test]
    fn quiet_tone_scores_lower_than_loud_tone() {
        let mut loud = SpectrumAnalyser::new();
        loud.feed(&tone(4, 1.0));
        let mut quiet = SpectrumAnalyser::new();
        quiet.feed(&tone(4, 0.01));
        let mut loud_data = [0u8; BIN_COUNT];
        let mut quiet_data = [0u8; BIN_COUNT];
        for _ in 0..12 {
            loud_data = loud.byte_frequency_data();
            quiet_data = quiet.byte_frequency_data();
        }
        assert!(loud_data[4] > quiet_data[4]);
        assert!(quiet_data[4] > 0);
    }
}
