//! Asynchronous audio decode.
//!
//! Decodes run on background blocking tasks and report back over a
//! channel; the tick loop polls with `try_recv` and never waits. An item
//! whose media has not landed yet simply stays silent for another tick.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cutline_common::CutlineResult;
use cutline_project_model::AssetId;
use tokio::sync::mpsc;

/// Decoded PCM: interleaved f32 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples, shared cheaply between bindings.
    pub samples: Arc<Vec<f32>>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels,
            samples: Arc::new(samples),
        }
    }

    /// All-zero PCM of the given length.
    pub fn silence(sample_rate: u32, channels: u16, duration_secs: f64) -> Self {
        let frames = (duration_secs.max(0.0) * sample_rate as f64) as usize;
        Self::new(sample_rate, channels, vec![0.0; frames * channels as usize])
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.channels as f64 / self.sample_rate as f64
    }
}

/// Decode backend. Implementations run on a blocking task, so they may
/// do file I/O and heavy work freely.
pub trait AudioDecoder: Send + Sync + 'static {
    fn decode(&self, locator: &str) -> CutlineResult<AudioBuffer>;
}

/// Decoder that yields an empty buffer for any locator. Pairs with the
/// null voice in sessions that have no audio output wired up.
pub struct SilenceDecoder;

impl AudioDecoder for SilenceDecoder {
    fn decode(&self, _locator: &str) -> CutlineResult<AudioBuffer> {
        Ok(AudioBuffer::new(48_000, 2, Vec::new()))
    }
}

/// State of one asset's decode.
#[derive(Debug, Clone)]
pub enum DecodeState {
    /// Scheduled, result not yet received.
    Pending,
    Ready(AudioBuffer),
    Failed(String),
}

type DecodeResult = (AssetId, Result<AudioBuffer, String>);

/// Schedules decodes and caches results by asset.
pub struct DecodeCache {
    decoder: Arc<dyn AudioDecoder>,
    states: HashMap<AssetId, DecodeState>,
    results_tx: mpsc::UnboundedSender<DecodeResult>,
    results_rx: mpsc::UnboundedReceiver<DecodeResult>,
}

impl DecodeCache {
    pub fn new(decoder: Arc<dyn AudioDecoder>) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            decoder,
            states: HashMap::new(),
            results_tx,
            results_rx,
        }
    }

    /// Schedule a decode unless one is cached or in flight. Returns
    /// immediately; the result arrives through `poll`.
    pub fn request(&mut self, asset_id: AssetId, locator: &str) {
        if self.states.contains_key(&asset_id) {
            return;
        }
        self.states.insert(asset_id, DecodeState::Pending);
        tracing::debug!(%asset_id, locator, "Audio decode scheduled");

        let decoder = self.decoder.clone();
        let locator = locator.to_string();
        let tx = self.results_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = decoder.decode(&locator).map_err(|e| e.to_string());
            let _ = tx.send((asset_id, result));
        });
    }

    /// Insert an already-decoded buffer, bypassing the decoder.
    pub fn preload(&mut self, asset_id: AssetId, buffer: AudioBuffer) {
        self.states.insert(asset_id, DecodeState::Ready(buffer));
    }

    /// Drain finished decodes into the cache. Never blocks. A result
    /// whose asset was evicted while the decode was in flight is
    /// dropped rather than revived.
    pub fn poll(&mut self) {
        while let Ok((asset_id, result)) = self.results_rx.try_recv() {
            if !self.states.contains_key(&asset_id) {
                tracing::debug!(%asset_id, "Discarding decode result for evicted asset");
                continue;
            }
            let state = match result {
                Ok(buffer) => {
                    tracing::debug!(
                        %asset_id,
                        duration_secs = buffer.duration_secs(),
                        "Audio decode ready"
                    );
                    DecodeState::Ready(buffer)
                }
                Err(message) => {
                    tracing::warn!(%asset_id, %message, "Audio decode failed");
                    DecodeState::Failed(message)
                }
            };
            self.states.insert(asset_id, state);
        }
    }

    pub fn state(&self, asset_id: AssetId) -> Option<&DecodeState> {
        self.states.get(&asset_id)
    }

    /// Decoded buffer, if ready.
    pub fn buffer(&self, asset_id: AssetId) -> Option<&AudioBuffer> {
        match self.states.get(&asset_id) {
            Some(DecodeState::Ready(buffer)) => Some(buffer),
            _ => None,
        }
    }

    /// Forget one asset; a later request decodes it again.
    pub fn evict(&mut self, asset_id: AssetId) {
        self.states.remove(&asset_id);
    }

    /// Drop every cached asset outside `referenced`. A buffer lives as
    /// long as some timeline item still points at its asset, active or
    /// not.
    pub fn evict_unreferenced(&mut self, referenced: &HashSet<AssetId>) {
        let stale: Vec<AssetId> = self
            .states
            .keys()
            .filter(|id| !referenced.contains(*id))
            .copied()
            .collect();
        for asset_id in stale {
            tracing::debug!(%asset_id, "Audio buffer evicted");
            self.evict(asset_id);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| matches!(s, DecodeState::Pending))
            .count()
    }
}
