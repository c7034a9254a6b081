//! Playback-side worker: synthesized speech bytes -> decode -> ALSA.
//!
//! A single dedicated thread owns the playback device, so at most one
//! playback is ever active. A new `Play` preempts the current one (stop
//! happens-before start) and `Stop` interrupts immediately; both are
//! polled between period-sized writes. The device is opened lazily on
//! first use and reused across playbacks.

use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use alsa::pcm::PCM;
use anyhow::Result;

use super::alsa_device;
use super::pcm_codec::{RawPcmDecoder, WavDecoder};
use super::stream_decoder::StreamDecoder;
use super::AudioConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    /// Decode and play one synthesized payload, stopping any active playback
    /// first.
    Play(Vec<u8>),
    /// Interrupt the active playback; no-op when nothing is playing.
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Playback ran to completion.
    Finished,
    /// Playback was interrupted or preempted.
    Stopped,
    /// Synthesis, decode, or device failure. The worker stays serviceable.
    Error(String),
}

/// Where one buffer playback ended up.
#[derive(Debug, PartialEq)]
enum PlayOutcome {
    Completed,
    Interrupted,
    Preempted(Vec<u8>),
    Failed(String),
}

/// Destination for decoded PCM, by period-sized chunk. Split out from ALSA
/// so the preemption logic is testable against a recording mock.
pub trait PcmSink {
    /// Write interleaved samples; returns frames consumed.
    fn write(&mut self, pcm: &[i16]) -> Result<usize>;
    /// Recover the device after an xrun.
    fn recover(&mut self) -> Result<()>;
    fn channels(&self) -> usize;
    fn period_size(&self) -> usize;
}

struct AlsaSink {
    pcm: PCM,
    sample_rate: u32,
    channels: usize,
    period_size: usize,
}

impl AlsaSink {
    fn open(config: &AudioConfig) -> Result<Self> {
        let period = if config.playback_period_size > 0 {
            Some(config.playback_period_size)
        } else {
            None
        };
        let (pcm, params) = alsa_device::open_playback(
            &config.playback_device,
            config.playback_sample_rate,
            config.playback_channels,
            period,
        )?;
        Ok(Self {
            pcm,
            sample_rate: params.sample_rate,
            channels: params.channels as usize,
            period_size: params.period_size,
        })
    }
}

impl PcmSink for AlsaSink {
    fn write(&mut self, pcm: &[i16]) -> Result<usize> {
        Ok(self.pcm.io_i16()?.writei(pcm)?)
    }

    fn recover(&mut self) -> Result<()> {
        Ok(self.pcm.prepare()?)
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn period_size(&self) -> usize {
        self.period_size
    }
}

/// Factory function: create a decoder based on the configured payload format.
fn create_decoder(
    config: &AudioConfig,
    alsa_rate: u32,
    alsa_channels: u32,
) -> Result<Box<dyn StreamDecoder>> {
    match config.stream_format.as_str() {
        "wav" => Ok(Box::new(WavDecoder::new(alsa_rate, alsa_channels))),
        "pcm" => Ok(Box::new(RawPcmDecoder::new(
            config.stream_sample_rate,
            config.stream_channels,
            alsa_rate,
            alsa_channels,
        ))),
        other => anyhow::bail!("Unsupported stream format: {}", other),
    }
}

/// The playback worker thread handle.
pub struct Playback {
    handle: Option<JoinHandle<()>>,
    done_rx: Option<std_mpsc::Receiver<()>>,
}

impl Playback {
    /// Spawn the playback thread. It exits when the command channel closes.
    pub fn start(
        config: AudioConfig,
        cmd_rx: mpsc::Receiver<PlaybackCommand>,
        event_tx: mpsc::Sender<PlaybackEvent>,
    ) -> Result<Self> {
        let (done_tx, done_rx) = std_mpsc::channel();
        let handle = thread::Builder::new()
            .name("audio-play".into())
            .spawn(move || {
                playback_thread(&config, cmd_rx, event_tx);
                let _ = done_tx.send(());
            })?;
        Ok(Self {
            handle: Some(handle),
            done_rx: Some(done_rx),
        })
    }

    /// Wait for the thread to finish after all command senders are dropped.
    pub fn stop(&mut self) {
        // Bounded wait so a wedged device cannot hang shutdown.
        if let Some(done_rx) = self.done_rx.take() {
            let _ = done_rx.recv_timeout(std::time::Duration::from_secs(2));
        }
        if let Some(h) = self.handle.take() {
            if h.is_finished() {
                let _ = h.join();
            } else {
                log::warn!("Playback thread still busy at shutdown, detaching");
            }
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop();
    }
}

fn playback_thread(
    config: &AudioConfig,
    mut cmd_rx: mpsc::Receiver<PlaybackCommand>,
    event_tx: mpsc::Sender<PlaybackEvent>,
) {
    // Opened on first Play and reused across playbacks.
    let mut sink: Option<AlsaSink> = None;
    let mut pending: Option<Vec<u8>> = None;

    loop {
        let payload = match pending.take() {
            Some(p) => p,
            None => match cmd_rx.blocking_recv() {
                Some(PlaybackCommand::Play(p)) => p,
                // Stop with nothing playing is a no-op.
                Some(PlaybackCommand::Stop) => continue,
                None => break,
            },
        };

        if sink.is_none() {
            match AlsaSink::open(config) {
                Ok(s) => sink = Some(s),
                Err(e) => {
                    log::error!("Failed to open playback device: {:#}", e);
                    let _ = event_tx
                        .blocking_send(PlaybackEvent::Error(format!("{:#}", e)));
                    continue;
                }
            }
        }
        let Some(sink_ref) = sink.as_mut() else {
            continue;
        };

        let event = match decode_payload(config, sink_ref, &payload) {
            Ok(pcm_data) => match play_buffer(sink_ref, &pcm_data, &mut cmd_rx) {
                PlayOutcome::Completed => PlaybackEvent::Finished,
                PlayOutcome::Interrupted => PlaybackEvent::Stopped,
                PlayOutcome::Preempted(next) => {
                    pending = Some(next);
                    PlaybackEvent::Stopped
                }
                PlayOutcome::Failed(e) => PlaybackEvent::Error(e),
            },
            Err(e) => {
                log::error!("Audio decode error: {:#}", e);
                PlaybackEvent::Error(format!("{:#}", e))
            }
        };

        if event_tx.blocking_send(event).is_err() {
            break;
        }
    }

    log::info!("Playback stopped");
}

fn decode_payload(
    config: &AudioConfig,
    sink: &AlsaSink,
    payload: &[u8],
) -> Result<Vec<i16>> {
    let rate = sink.sample_rate;
    let channels = sink.channels as u32;
    let mut decoder = create_decoder(config, rate, channels)?;
    decoder.decode(payload)
}

/// Write one decoded buffer to the sink, polling for interruption between
/// period-sized chunks. A `Play` arriving mid-buffer stops the current
/// playback and is returned for the caller to start next.
fn play_buffer(
    sink: &mut dyn PcmSink,
    pcm: &[i16],
    cmd_rx: &mut mpsc::Receiver<PlaybackCommand>,
) -> PlayOutcome {
    let channels = sink.channels().max(1);
    let chunk = sink.period_size().max(1) * channels;
    let mut offset = 0;
    let mut retry_count = 0u32;

    while offset < pcm.len() {
        match cmd_rx.try_recv() {
            Ok(PlaybackCommand::Stop) => return PlayOutcome::Interrupted,
            Ok(PlaybackCommand::Play(next)) => return PlayOutcome::Preempted(next),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return PlayOutcome::Interrupted,
        }

        let end = (offset + chunk).min(pcm.len());
        match sink.write(&pcm[offset..end]) {
            Ok(frames) => {
                offset += frames * channels;
                retry_count = 0;
            }
            Err(e) => {
                log::warn!("ALSA playback error: {}, recovering...", e);
                retry_count += 1;

                if let Err(e2) = sink.recover() {
                    log::error!("Failed to recover PCM playback: {}", e2);
                    return PlayOutcome::Failed(format!("{}", e2));
                }

                // 熔断器：底层持续跟不上写入速度时，丢弃剩余帧防止死循环
                if retry_count >= 3 {
                    log::error!(
                        "Max recovery retries ({}) reached. Dropping {} unwritten samples.",
                        retry_count,
                        pcm.len() - offset
                    );
                    return PlayOutcome::Failed(format!("{}", e));
                }
            }
        }
    }

    PlayOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that records every chunk and can fail on demand.
    struct MockSink {
        written: Vec<Vec<i16>>,
        fail_writes: u32,
        period: usize,
    }

    impl MockSink {
        fn new(period: usize) -> Self {
            Self {
                written: Vec::new(),
                fail_writes: 0,
                period,
            }
        }

        fn total_samples(&self) -> usize {
            self.written.iter().map(|c| c.len()).sum()
        }
    }

    impl PcmSink for MockSink {
        fn write(&mut self, pcm: &[i16]) -> Result<usize> {
            if self.fail_writes > 0 {
                self.fail_writes -= 1;
                anyhow::bail!("xrun");
            }
            self.written.push(pcm.to_vec());
            Ok(pcm.len())
        }

        fn recover(&mut self) -> Result<()> {
            Ok(())
        }

        fn channels(&self) -> usize {
            1
        }

        fn period_size(&self) -> usize {
            self.period
        }
    }

    fn cmd_channel() -> (
        mpsc::Sender<PlaybackCommand>,
        mpsc::Receiver<PlaybackCommand>,
    ) {
        mpsc::channel(8)
    }

    #[test]
    fn plays_whole_buffer_in_period_chunks() {
        let mut sink = MockSink::new(4);
        let (_tx, mut rx) = cmd_channel();
        let pcm: Vec<i16> = (0..10).collect();

        let outcome = play_buffer(&mut sink, &pcm, &mut rx);

        assert_eq!(outcome, PlayOutcome::Completed);
        assert_eq!(sink.total_samples(), 10);
        assert_eq!(sink.written[0].len(), 4);
        assert_eq!(sink.written[2].len(), 2);
    }

    #[test]
    fn stop_interrupts_before_next_chunk() {
        let mut sink = MockSink::new(4);
        let (tx, mut rx) = cmd_channel();
        tx.try_send(PlaybackCommand::Stop).unwrap();
        let pcm: Vec<i16> = (0..100).collect();

        let outcome = play_buffer(&mut sink, &pcm, &mut rx);

        assert_eq!(outcome, PlayOutcome::Interrupted);
        assert!(sink.written.is_empty());
    }

    #[test]
    fn new_play_preempts_current_buffer_before_any_of_its_samples() {
        let mut sink = MockSink::new(4);
        let (tx, mut rx) = cmd_channel();
        tx.try_send(PlaybackCommand::Play(vec![9, 9, 9])).unwrap();
        let pcm: Vec<i16> = (0..100).collect();

        let outcome = play_buffer(&mut sink, &pcm, &mut rx);

        // The old buffer stops (zero samples written) and the new payload is
        // handed back to start afterwards: stop happens-before start.
        assert_eq!(outcome, PlayOutcome::Preempted(vec![9, 9, 9]));
        assert!(sink.written.is_empty());
    }

    #[test]
    fn transient_write_failure_recovers() {
        let mut sink = MockSink::new(4);
        sink.fail_writes = 1;
        let (_tx, mut rx) = cmd_channel();
        let pcm: Vec<i16> = (0..8).collect();

        let outcome = play_buffer(&mut sink, &pcm, &mut rx);

        assert_eq!(outcome, PlayOutcome::Completed);
        assert_eq!(sink.total_samples(), 8);
    }

    #[test]
    fn repeated_write_failure_gives_up() {
        let mut sink = MockSink::new(4);
        sink.fail_writes = 10;
        let (_tx, mut rx) = cmd_channel();
        let pcm: Vec<i16> = (0..8).collect();

        match play_buffer(&mut sink, &pcm, &mut rx) {
            PlayOutcome::Failed(_) => {}
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn wav_decoder_is_selected_for_wav_format() {
        let config = AudioConfig::default();
        assert!(create_decoder(&config, 24000, 1).is_ok());
        let mut bad = AudioConfig::default();
        bad.stream_format = "mp3".to_string();
        assert!(create_decoder(&bad, 24000, 1).is_err());
    }
}
