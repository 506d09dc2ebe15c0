// src/notify/sound.rs
//! Alert sound playback: decode the configured WAV file with `hound` and
//! stream it to the default output device with `cpal`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{AlertSink, JobAlert};
use crate::config::SharedConfig;

pub struct SoundPlayer {
    config: SharedConfig,
}

impl SoundPlayer {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl AlertSink for SoundPlayer {
    async fn deliver(&self, _alert: &JobAlert) -> Result<()> {
        let path = {
            let cfg = self.config.read().expect("config lock poisoned");
            cfg.paths.sound_file.clone()
        };
        if path.is_empty() || !Path::new(&path).is_file() {
            tracing::warn!(path = %path, "sound file not found, skipping alert sound");
            return Ok(());
        }

        tokio::task::spawn_blocking(move || play_wav_blocking(Path::new(&path)))
            .await
            .context("sound task join")?
    }

    fn name(&self) -> &'static str {
        "sound"
    }
}

/// Decode the whole file into f32 samples and play it through the default
/// output device. Blocks for the duration of the clip.
fn play_wav_blocking(path: &Path) -> Result<()> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("decoding float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("decoding int samples")?
        }
    };

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| anyhow!("no default audio output device"))?;

    let stream_config = cpal::StreamConfig {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let cursor = Arc::new(AtomicUsize::new(0));
    let samples = Arc::new(samples);
    let total = samples.len();

    let stream = {
        let cursor = cursor.clone();
        let samples = samples.clone();
        device
            .build_output_stream(
                &stream_config,
                move |out: &mut [f32], _| {
                    let mut i = cursor.load(Ordering::Relaxed);
                    for slot in out.iter_mut() {
                        *slot = samples.get(i).copied().unwrap_or(0.0);
                        i += 1;
                    }
                    cursor.store(i, Ordering::Relaxed);
                },
                |e| tracing::warn!(error = %e, "audio stream error"),
                None,
            )
            .context("building audio output stream")?
    };
    stream.play().context("starting audio playback")?;

    // Hold the stream open until the clip has drained.
    let secs = total as f64 / (spec.sample_rate as f64 * spec.channels.max(1) as f64);
    std::thread::sleep(Duration::from_secs_f64(secs + 0.2));
    Ok(())
}
