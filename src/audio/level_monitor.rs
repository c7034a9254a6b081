//! Capture-side worker: microphone -> analyser -> level meter.
//!
//! Runs on a dedicated OS thread for the duration of one capture session.
//! Each ALSA period produces one meter tick and one snapshot pushed to the
//! UI, which at a 256-frame period and 16 kHz lands near the display's
//! 60 Hz animation cadence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

use anyhow::Result;

use super::alsa_device;
use super::analyser::SpectrumAnalyser;
use super::level_meter::{LevelMeter, LEVEL_FLOOR, LEVEL_SLOTS};
use super::AudioConfig;

/// Controller commands for the metering worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeterCommand {
    Start,
    Stop,
}

/// Owns the capture thread for one session. The microphone is held
/// exclusively between `start` and `stop`; stop is idempotent and also
/// runs on drop so teardown always releases the device.
pub struct LevelMonitor {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LevelMonitor {
    pub fn start(config: &AudioConfig, level_tx: mpsc::Sender<Vec<f32>>) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let running = running.clone();
            let config = config.clone();
            thread::Builder::new()
                .name("level-monitor".into())
                .spawn(move || {
                    // Microphone acquisition failures are logged, never fatal:
                    // the buffer simply stays at its resting state.
                    if let Err(e) = capture_thread(&config, level_tx, &running) {
                        log::error!("Level monitor error: {:#}", e);
                    }
                })?
        };

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Signal the capture thread to stop and wait for it to release the
    /// microphone.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for LevelMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_thread(
    config: &AudioConfig,
    level_tx: mpsc::Sender<Vec<f32>>,
    running: &AtomicBool,
) -> Result<()> {
    let (pcm, params) = alsa_device::open_capture(
        &config.capture_device,
        config.capture_sample_rate,
        config.capture_channels,
        Some(config.capture_period_size),
    )?;

    let channels = params.channels as usize;
    let mut analyser = SpectrumAnalyser::new();
    let mut meter = LevelMeter::new();

    // ALSA read buffer (interleaved i16, one period)
    let mut read_buf = vec![0i16; params.period_size * channels];
    let mut mono_buf = vec![0i16; params.period_size];

    let io = pcm.io_i16()?;

    log::info!(
        "Level monitor started: rate={}, ch={}, period={}",
        params.sample_rate,
        channels,
        params.period_size,
    );

    while running.load(Ordering::Relaxed) {
        match io.readi(&mut read_buf) {
            Ok(frames) => {
                // Mix interleaved channels down to mono for analysis
                for i in 0..frames {
                    let mut sum: i32 = 0;
                    for ch in 0..channels {
                        sum += read_buf[i * channels + ch] as i32;
                    }
                    mono_buf[i] = (sum / channels as i32) as i16;
                }

                analyser.feed(&mono_buf[..frames]);
                let bins = analyser.byte_frequency_data();
                meter.tick(&bins);

                if level_tx.blocking_send(meter.levels()).is_err() {
                    log::warn!("Level receiver dropped, stopping monitor");
                    break;
                }
            }
            Err(e) => {
                log::warn!("ALSA capture error: {}, recovering...", e);
                if let Err(e2) = pcm.prepare() {
                    log::error!("Failed to recover PCM capture: {}", e2);
                    break;
                }
            }
        }
    }

    log::info!("Level monitor stopped");
    Ok(())
}

/// Supervises the capture thread for the event loop: `Start` acquires the
/// microphone (no-op when already running), `Stop` releases it and pushes
/// one resting frame so the UI bars settle back to the floor.
pub async fn meter_task(
    config: AudioConfig,
    mut rx: mpsc::Receiver<MeterCommand>,
    level_tx: mpsc::Sender<Vec<f32>>,
) {
    let mut monitor: Option<LevelMonitor> = None;
    while let Some(cmd) = rx.recv().await {
        match cmd {
            MeterCommand::Start => {
                if monitor.is_none() {
                    match LevelMonitor::start(&config, level_tx.clone()) {
                        Ok(m) => monitor = Some(m),
                        Err(e) => log::error!("Failed to start level monitor: {:#}", e),
                    }
                }
            }
            MeterCommand::Stop => {
                if let Some(mut m) = monitor.take() {
                    m.stop();
                    let _ = level_tx.send(vec![LEVEL_FLOOR; LEVEL_SLOTS]).await;
                }
            }
        }
    }
    // Command channel closed: shutdown. Drop releases the microphone.
    drop(monitor);
}
