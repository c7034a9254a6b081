//! Loudness meter feeding the bar-graph visualizer.
//!
//! Each tick averages the low vocal-range bins of the analyser, amplifies
//! and smooths the result, and pushes it into a fixed 20-slot buffer. The
//! newest value sits at the front; the buffer always holds exactly 20
//! values clamped to [20, 100] so resting bars never fully disappear.

use std::collections::VecDeque;

/// Number of bars in the visualizer.
pub const LEVEL_SLOTS: usize = 20;
/// Visual silence floor; also the resting value of every slot.
pub const LEVEL_FLOOR: f32 = 20.0;
/// Upper display bound.
pub const LEVEL_CEIL: f32 = 100.0;

/// Analyser bins approximating the fundamental vocal range.
const VOCAL_BINS: std::ops::Range<usize> = 2..6;
/// Byte magnitudes map to 0..150 so loud input can overshoot 100.
const SENSITIVITY_GAIN: f32 = 150.0;
/// EMA weights: previous value 0.6, new raw value 0.4.
const SMOOTH_PREV: f32 = 0.6;
const SMOOTH_NEW: f32 = 0.4;

pub struct LevelMeter {
    levels: VecDeque<f32>,
    /// Smoothing accumulator, kept unclamped between ticks.
    prev: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            levels: VecDeque::from(vec![LEVEL_FLOOR; LEVEL_SLOTS]),
            prev: LEVEL_FLOOR,
        }
    }

    /// Consume one analyser frame and advance the buffer by one slot.
    pub fn tick(&mut self, bins: &[u8]) {
        let band = &bins[VOCAL_BINS];
        let mean = band.iter().map(|&b| b as f32).sum::<f32>() / band.len() as f32;

        let raw = mean / 255.0 * SENSITIVITY_GAIN;
        let smoothed = self.prev * SMOOTH_PREV + raw * SMOOTH_NEW;
        self.prev = smoothed;

        let clamped = smoothed.clamp(LEVEL_FLOOR, LEVEL_CEIL);
        self.levels.pop_back();
        self.levels.push_front(clamped);
    }

    /// Restore the resting state (all slots at the floor).
    pub fn reset(&mut self) {
        self.levels.iter_mut().for_each(|v| *v = LEVEL_FLOOR);
        self.prev = LEVEL_FLOOR;
    }

    /// Snapshot of the buffer, newest value first.
    pub fn levels(&self) -> Vec<f32> {
        self.levels.iter().copied().collect()
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analyser::BIN_COUNT;

    fn frame(value: u8) -> Vec<u8> {
        vec![value; BIN_COUNT]
    }

    #[test]
    fn starts_at_resting_state() {
        let meter = LevelMeter::new();
        let levels = meter.levels();
        assert_eq!(levels.len(), LEVEL_SLOTS);
        assert!(levels.iter().all(|&v| v == LEVEL_FLOOR));
    }

    #[test]
    fn buffer_length_and_range_hold_for_any_input() {
        let mut meter = LevelMeter::new();
        for value in [0u8, 255, 1, 200, 0, 0, 128, 255, 255, 3] {
            meter.tick(&frame(value));
            let levels = meter.levels();
            assert_eq!(levels.len(), LEVEL_SLOTS);
            assert!(levels
                .iter()
                .all(|&v| (LEVEL_FLOOR..=LEVEL_CEIL).contains(&v)));
        }
    }

    #[test]
    fn silence_stays_at_floor() {
        let mut meter = LevelMeter::new();
        for _ in 0..LEVEL_SLOTS * 2 {
            meter.tick(&frame(0));
        }
        assert!(meter.levels().iter().all(|&v| v == LEVEL_FLOOR));
    }

    #[test]
    fn loud_input_saturates_at_ceiling() {
        let mut meter = LevelMeter::new();
        for _ in 0..30 {
            meter.tick(&frame(255));
        }
        // (255/255)*150 smoothed toward 150, clamped to 100.
        assert_eq!(meter.levels()[0], LEVEL_CEIL);
    }

    #[test]
    fn newest_value_is_pushed_to_front() {
        let mut meter = LevelMeter::new();
        meter.tick(&frame(255));
        let levels = meter.levels();
        assert!(levels[0] > LEVEL_FLOOR);
        assert_eq!(levels[1], LEVEL_FLOOR);
    }

    #[test]
    fn first_tick_matches_ema_of_floor_accumulator() {
        let mut meter = LevelMeter::new();
        meter.tick(&frame(255));
        // 20*0.6 + 150*0.4 = 72
        assert!((meter.levels()[0] - 72.0).abs() < 1e-3);
    }

    #[test]
    fn reset_restores_resting_state() {
        let mut meter = LevelMeter::new();
        for _ in 0..10 {
            meter.tick(&frame(255));
        }
        meter.reset();
        assert!(meter.levels().iter().all(|&v| v == LEVEL_FLOOR));
        // Accumulator is reset too: the next silent tick stays on the floor.
        meter.tick(&frame(0));
        assert_eq!(meter.levels()[0], LEVEL_FLOOR);
    }
}
