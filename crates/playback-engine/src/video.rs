//! Video decoder lockstep.
//!
//! The playhead leads; per-item video streams chase it under the same
//! drift rule audio uses. Image and text items are stateless and never
//! get a stream. A stream that cannot keep up is reseeked once the
//! divergence passes the tolerance, never nudged frame by frame.

use std::collections::{HashMap, HashSet};

use cutline_common::{CutlineResult, DriftMeasurement};
use cutline_project_model::{Asset, AssetKind, ItemId, Timeline};
use serde::Serialize;

/// One item's video decode position. Implementations own the demuxer
/// and decoder for a single media file.
pub trait VideoStream: Send {
    /// Open the media and position the decoder at `at_secs`.
    fn start(&mut self, locator: &str, at_secs: f64) -> CutlineResult<()>;

    /// Jump the decoder to `to_secs`.
    fn seek(&mut self, to_secs: f64) -> CutlineResult<()>;

    /// Source position the decoder has reached.
    fn position_secs(&self) -> f64;

    /// Release the decoder. Must take effect before returning.
    fn stop(&mut self);
}

pub trait VideoStreamFactory: Send {
    fn create(&mut self) -> Box<dyn VideoStream>;
}

/// Stream that tracks positions without decoding anything. Used by
/// headless sessions and tests.
#[derive(Debug, Default)]
pub struct NullVideoStream {
    position_secs: f64,
}

impl VideoStream for NullVideoStream {
    fn start(&mut self, _locator: &str, at_secs: f64) -> CutlineResult<()> {
        self.position_secs = at_secs;
        Ok(())
    }

    fn seek(&mut self, to_secs: f64) -> CutlineResult<()> {
        self.position_secs = to_secs;
        Ok(())
    }

    fn position_secs(&self) -> f64 {
        self.position_secs
    }

    fn stop(&mut self) {}
}

pub struct NullVideoStreamFactory;

impl VideoStreamFactory for NullVideoStreamFactory {
    fn create(&mut self) -> Box<dyn VideoStream> {
        Box::new(NullVideoStream::default())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LockstepStats {
    pub active_streams: usize,
    pub reseeks: u64,
}

struct StreamBinding {
    stream: Box<dyn VideoStream>,
    failed: bool,
}

/// Keeps per-item video streams within tolerance of the playhead.
pub struct VideoLockstep {
    tolerance_secs: f64,
    factory: Box<dyn VideoStreamFactory>,
    streams: HashMap<ItemId, StreamBinding>,
    stats: LockstepStats,
}

impl VideoLockstep {
    pub fn new(tolerance_secs: f64, factory: Box<dyn VideoStreamFactory>) -> Self {
        Self {
            tolerance_secs,
            factory,
            streams: HashMap::new(),
            stats: LockstepStats::default(),
        }
    }

    /// Reconcile streams against the video items under the playhead.
    pub fn tick(&mut self, timeline: &Timeline, assets: &[Asset], playhead_secs: f64) {
        let active: Vec<_> = timeline
            .visual_items_at(playhead_secs)
            .into_iter()
            .filter_map(|(_, item)| {
                let asset = assets.iter().find(|a| a.id == item.asset_id)?;
                matches!(asset.kind, AssetKind::Video).then_some((item, asset))
            })
            .collect();

        let active_ids: HashSet<ItemId> = active.iter().map(|(item, _)| item.id).collect();
        self.streams.retain(|item_id, binding| {
            if active_ids.contains(item_id) {
                return true;
            }
            binding.stream.stop();
            tracing::debug!(item = %item_id, "Video stream released");
            false
        });

        let streams = &mut self.streams;
        let factory = &mut self.factory;
        let stats = &mut self.stats;
        let tolerance_secs = self.tolerance_secs;

        for (item, asset) in active {
            let local = item.local_time(playhead_secs);

            let binding = streams.entry(item.id).or_insert_with(|| {
                let mut stream = factory.create();
                let failed = match stream.start(&asset.locator, local) {
                    Ok(()) => {
                        tracing::debug!(item = %item.id, at_secs = local, "Video stream started");
                        false
                    }
                    Err(e) => {
                        tracing::warn!(item = %item.id, error = %e, "Video stream failed to start");
                        true
                    }
                };
                StreamBinding { stream, failed }
            });
            if binding.failed {
                continue;
            }

            let measurement = DriftMeasurement {
                expected_secs: local,
                actual_secs: binding.stream.position_secs(),
            };
            if measurement.exceeds_tolerance(tolerance_secs) {
                tracing::debug!(
                    item = %item.id,
                    drift_ms = measurement.drift_ms(),
                    "Video drift beyond tolerance; reseeking stream"
                );
                match binding.stream.seek(local) {
                    Ok(()) => stats.reseeks += 1,
                    Err(e) => {
                        binding.stream.stop();
                        binding.failed = true;
                        tracing::warn!(item = %item.id, error = %e, "Video reseek failed");
                    }
                }
            }
        }

        stats.active_streams = streams.len();
    }

    /// Release every stream before returning.
    pub fn stop_all(&mut self) {
        for (item_id, mut binding) in self.streams.drain() {
            binding.stream.stop();
            tracing::debug!(item = %item_id, "Video stream released");
        }
        self.stats.active_streams = 0;
    }

    pub fn active_count(&self) -> usize {
        self.streams.len()
    }

    pub fn stats(&self) -> &LockstepStats {
        &self.stats
    }
}
