//! services/api/src/adapters/chime.rs
//!
//! This module contains the completion-cue adapter. It implements the `CompletionCue`
//! port from the `core` crate by rendering a short two-tone chime as a WAV file once,
//! and pushing it to every connected timer client as a binary WebSocket frame.

use async_trait::async_trait;
use bytes::Bytes;
use hound::{WavSpec, WavWriter};
use pomodoro_core::ports::{CompletionCue, PortError, PortResult};
use std::f32::consts::PI;
use tokio::sync::broadcast;
use tracing::debug;

const SAMPLE_RATE: u32 = 22_050;
const CHIME_SECONDS: f32 = 0.8;
const PARTIALS_HZ: [f32; 2] = [880.0, 1320.0];

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `CompletionCue` port by broadcasting a WAV chime.
pub struct ChimeCue {
    wav: Bytes,
    listeners: broadcast::Sender<Bytes>,
}

impl ChimeCue {
    /// Creates a new `ChimeCue`, rendering the chime up front.
    pub fn new() -> Result<Self, hound::Error> {
        let (listeners, _) = broadcast::channel(8);
        Ok(Self {
            wav: Bytes::from(render_chime()?),
            listeners,
        })
    }

    /// Receives every chime played from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        self.listeners.subscribe()
    }

    /// The rendered WAV file.
    pub fn wav(&self) -> &Bytes {
        &self.wav
    }
}

/// Renders a mono 16-bit chime: two decaying sine partials.
fn render_chime() -> Result<Vec<u8>, hound::Error> {
    let mut cursor = std::io::Cursor::new(Vec::new());

    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::new(&mut cursor, spec)?;
    let total = (SAMPLE_RATE as f32 * CHIME_SECONDS) as u32;
    for n in 0..total {
        let t = n as f32 / SAMPLE_RATE as f32;
        let envelope = (-5.0 * t).exp();
        let tone: f32 = PARTIALS_HZ
            .iter()
            .map(|hz| (2.0 * PI * hz * t).sin())
            .sum::<f32>()
            / PARTIALS_HZ.len() as f32;
        let sample = (tone * envelope * 0.6 * i16::MAX as f32) as i16;
        writer.write_sample(sample)?;
    }

    writer.finalize()?;
    Ok(cursor.into_inner())
}

//=========================================================================================
// `CompletionCue` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionCue for ChimeCue {
    async fn play(&self) -> PortResult<()> {
        let delivered = self
            .listeners
            .send(self.wav.clone())
            .map_err(|_| PortError::Unexpected("No timer clients to play the chime".to_string()))?;
        debug!(listeners = delivered, "Chime sent.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chime_is_a_valid_mono_wav() {
        let cue = ChimeCue::new().unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(cue.wav().to_vec())).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), (SAMPLE_RATE as f32 * CHIME_SECONDS) as u32);
    }

    #[tokio::test]
    async fn play_reaches_subscribers_and_fails_without_any() {
        let cue = ChimeCue::new().unwrap();
        assert!(cue.play().await.is_err());

        let mut rx = cue.subscribe();
        cue.play().await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), *cue.wav());
    }
}
