//! Procedural key-click feedback.
//!
//! A click is a short burst of white noise shaped by a quadratic decay, so it
//! sounds like a mechanical switch rather than a tone. One waveform is
//! synthesized per [`ClickPlayer`] and replayed on every keystroke.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

pub const CLICK_DURATION_MS: u32 = 25;

/// Output level applied on top of the envelope to keep the burst from clipping.
pub const CLICK_LEVEL: f32 = 0.3;

/// Rate used when no output device is available to ask.
pub const FALLBACK_SAMPLE_RATE: u32 = 44_100;

pub const REOPEN_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no default audio output device")]
    NoDevice,
    #[error("unsupported sample format {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),
    #[error(transparent)]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error(transparent)]
    Build(#[from] cpal::BuildStreamError),
    #[error(transparent)]
    Play(#[from] cpal::PlayStreamError),
}

/// Immutable mono sample buffer for one click.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickWaveform {
    sample_rate: u32,
    samples: Arc<[f32]>,
}

impl ClickWaveform {
    /// `duration_ms` of decaying noise at `sample_rate`. Every call draws fresh
    /// noise, so two waveforms are never expected to be equal.
    pub fn synthesize(sample_rate: u32, duration_ms: u32) -> Self {
        Self::synthesize_with(sample_rate, duration_ms, &mut rand::thread_rng())
    }

    pub fn synthesize_with<R: Rng + ?Sized>(sample_rate: u32, duration_ms: u32, rng: &mut R) -> Self {
        let len = (u64::from(sample_rate) * u64::from(duration_ms) / 1000) as usize;

        let samples = (0..len)
            .map(|i| {
                let noise: f32 = rng.gen_range(-1.0..=1.0);
                let decay = 1.0 - (i as f32 / len as f32);
                noise * decay * decay * CLICK_LEVEL
            })
            .collect();

        Self {
            sample_rate,
            samples,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Keystroke feedback sink. Playing must never fail observably.
pub trait Click {
    fn play(&mut self);
}

/// Feedback sink for hosts without sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentClick;

impl Click for SilentClick {
    fn play(&mut self) {}
}

/// Plays the cached click on the default output device through cpal.
///
/// The stream is opened once and stays running; `play` only rewinds a shared
/// read cursor, which the audio callback consumes until the waveform ends.
pub struct ClickPlayer {
    waveform: ClickWaveform,
    output: Option<ClickOutput>,
    last_reopen: Option<Instant>,
}

struct ClickOutput {
    stream: cpal::Stream,
    cursor: Arc<AtomicUsize>,
    failed: Arc<AtomicBool>,
}

impl ClickPlayer {
    /// Never fails: without a usable device the player stays silent, and
    /// `play` tries to reopen one at most every [`REOPEN_BACKOFF`].
    pub fn new() -> Self {
        let device_rate = default_output_rate();
        let waveform = ClickWaveform::synthesize(
            device_rate.unwrap_or(FALLBACK_SAMPLE_RATE),
            CLICK_DURATION_MS,
        );

        let output = match ClickOutput::open(&waveform) {
            Ok(output) => Some(output),
            Err(e) => {
                warn!(error = %e, "click output unavailable, continuing without sound");
                None
            }
        };

        Self {
            waveform,
            output,
            last_reopen: None,
        }
    }

    pub fn waveform(&self) -> &ClickWaveform {
        &self.waveform
    }

    pub fn is_available(&self) -> bool {
        self.output
            .as_ref()
            .is_some_and(|o| !o.failed.load(Ordering::Acquire))
    }

    fn try_play(&mut self, now: Instant) -> Result<(), AudioError> {
        if !self.is_available() {
            self.output = None;
            if !reopen_due(self.last_reopen, now) {
                return Ok(());
            }
            self.last_reopen = Some(now);
            debug!("reopening click output");
            self.output = Some(ClickOutput::open(&self.waveform)?);
        }

        if let Some(output) = &self.output {
            // resumes a paused stream, no-op on a running one
            output.stream.play()?;
            output.cursor.store(0, Ordering::Release);
        }
        Ok(())
    }
}

/// A lost device is reopened at most once per `REOPEN_BACKOFF`.
fn reopen_due(last_reopen: Option<Instant>, now: Instant) -> bool {
    last_reopen.map_or(true, |last| now.saturating_duration_since(last) >= REOPEN_BACKOFF)
}

impl Default for ClickPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Click for ClickPlayer {
    fn play(&mut self) {
        if let Err(e) = self.try_play(Instant::now()) {
            debug!(error = %e, "click dropped");
            self.output = None;
        }
    }
}

impl ClickOutput {
    fn open(waveform: &ClickWaveform) -> Result<Self, AudioError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or(AudioError::NoDevice)?;
        let supported = device.default_output_config()?;
        let config = supported.config();

        // start parked at the end so nothing sounds before the first play
        let cursor = Arc::new(AtomicUsize::new(waveform.len()));
        let failed = Arc::new(AtomicBool::new(false));

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, waveform, &cursor, &failed)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, waveform, &cursor, &failed)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, waveform, &cursor, &failed)?,
            other => return Err(AudioError::UnsupportedFormat(other)),
        };
        stream.play()?;

        if config.sample_rate.0 != waveform.sample_rate() {
            warn!(
                device_rate = config.sample_rate.0,
                click_rate = waveform.sample_rate(),
                "output rate changed since the click was synthesized"
            );
        }
        debug!(
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "click output opened"
        );

        Ok(Self {
            stream,
            cursor,
            failed,
        })
    }
}

fn default_output_rate() -> Option<u32> {
    let device = cpal::default_host().default_output_device()?;
    let config = device.default_output_config().ok()?;
    Some(config.sample_rate().0)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    waveform: &ClickWaveform,
    cursor: &Arc<AtomicUsize>,
    failed: &Arc<AtomicBool>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = usize::from(config.channels).max(1);
    let samples = Arc::clone(&waveform.samples);
    let cursor = Arc::clone(cursor);
    let on_error = Arc::clone(failed);

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let start = cursor.load(Ordering::Acquire);
            let mut pos = start;
            for frame in data.chunks_mut(channels) {
                let value = match samples.get(pos) {
                    Some(s) => {
                        pos += 1;
                        *s
                    }
                    None => 0.0,
                };
                let value = T::from_sample(value);
                for out in frame.iter_mut() {
                    *out = value;
                }
            }
            // a play() that rewound the cursor mid-buffer wins
            let _ = cursor.compare_exchange(start, pos, Ordering::AcqRel, Ordering::Relaxed);
        },
        move |err| {
            warn!(error = %err, "click stream error");
            on_error.store(true, Ordering::Release);
        },
        None,
    )
}
