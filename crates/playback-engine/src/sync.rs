//! Audio synchronization: keep every active audio item aligned with the
//! playhead.
//!
//! Each audio item under the playhead owns a binding to one output voice.
//! Per tick the engine reconciles bindings against the active set, starts
//! voices whose media has decoded, measures drift between the position a
//! voice reports and the position the playhead implies, and reseeks only
//! when the drift passes the configured tolerance. Gain follows the
//! track/item/envelope target through bounded smoothing steps.

use std::collections::{HashMap, HashSet};

use cutline_common::{DriftMeasurement, PlaybackTuning};
use cutline_project_model::{Asset, AssetId, ItemId, Timeline};
use serde::Serialize;

use crate::decode::{DecodeCache, DecodeState};
use crate::envelope;
use crate::voice::{AudioVoice, VoiceFactory};

/// Lifecycle of one item's voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingState {
    /// Media not decoded yet; the item is silent for now.
    WaitingForMedia,
    Playing,
    /// Decode or voice failure; the item stays silent until it leaves
    /// the active set.
    Failed,
}

struct Binding {
    voice: Box<dyn AudioVoice>,
    state: BindingState,
    current_gain: f64,
}

/// Diagnostics the session surfaces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStats {
    pub active_bindings: usize,
    pub reseeks: u64,
    pub max_abs_drift_ms: f64,
}

/// Drives audio voices from the timeline and playhead.
pub struct AudioSyncEngine {
    tuning: PlaybackTuning,
    factory: Box<dyn VoiceFactory>,
    bindings: HashMap<ItemId, Binding>,
    stats: SyncStats,
}

impl AudioSyncEngine {
    pub fn new(tuning: PlaybackTuning, factory: Box<dyn VoiceFactory>) -> Self {
        Self {
            tuning,
            factory,
            bindings: HashMap::new(),
            stats: SyncStats::default(),
        }
    }

    /// Advance one tick at the given playhead.
    ///
    /// Never waits on decode: items whose media is still in flight stay
    /// silent and are picked up on a later tick.
    pub fn tick(
        &mut self,
        timeline: &Timeline,
        assets: &[Asset],
        playhead_secs: f64,
        decode: &mut DecodeCache,
    ) {
        decode.poll();
        let active = timeline.audio_items_at(playhead_secs);

        // Items that left the active set release their voice immediately.
        let active_ids: HashSet<ItemId> = active.iter().map(|(_, item)| item.id).collect();
        self.bindings.retain(|item_id, binding| {
            if active_ids.contains(item_id) {
                return true;
            }
            binding.voice.stop();
            tracing::debug!(item = %item_id, "Audio binding released");
            false
        });

        // Buffers follow the same rule one level up: once no item on any
        // track references an asset, its decoded audio goes too.
        let referenced: HashSet<AssetId> = timeline.all_items().map(|item| item.asset_id).collect();
        decode.evict_unreferenced(&referenced);

        let bindings = &mut self.bindings;
        let factory = &mut self.factory;
        let stats = &mut self.stats;
        let tuning = &self.tuning;

        for (track, item) in active {
            let Some(asset) = assets.iter().find(|a| a.id == item.asset_id) else {
                continue;
            };
            decode.request(asset.id, &asset.locator);

            let binding = bindings.entry(item.id).or_insert_with(|| Binding {
                voice: factory.create(),
                state: BindingState::WaitingForMedia,
                current_gain: 0.0,
            });

            let local = item.local_time(playhead_secs);

            match binding.state {
                BindingState::WaitingForMedia => match decode.state(asset.id) {
                    Some(DecodeState::Ready(buffer)) => {
                        match binding.voice.start(buffer, local) {
                            Ok(()) => {
                                binding.state = BindingState::Playing;
                                tracing::debug!(
                                    item = %item.id,
                                    at_secs = local,
                                    "Audio voice started"
                                );
                            }
                            Err(e) => {
                                binding.state = BindingState::Failed;
                                tracing::warn!(
                                    item = %item.id,
                                    error = %e,
                                    "Audio voice failed to start"
                                );
                            }
                        }
                    }
                    Some(DecodeState::Failed(_)) => {
                        binding.state = BindingState::Failed;
                    }
                    _ => {}
                },
                BindingState::Playing => {
                    let measurement = DriftMeasurement {
                        expected_secs: local,
                        actual_secs: binding.voice.position_secs(),
                    };
                    let abs_ms = measurement.drift_ms().abs();
                    if abs_ms > stats.max_abs_drift_ms {
                        stats.max_abs_drift_ms = abs_ms;
                    }
                    if measurement.exceeds_tolerance(tuning.drift_tolerance_secs) {
                        tracing::debug!(
                            item = %item.id,
                            drift_ms = measurement.drift_ms(),
                            "Drift beyond tolerance; reseeking voice"
                        );
                        match binding.voice.seek(local) {
                            Ok(()) => stats.reseeks += 1,
                            Err(e) => {
                                binding.voice.stop();
                                binding.state = BindingState::Failed;
                                tracing::warn!(
                                    item = %item.id,
                                    error = %e,
                                    "Voice reseek failed"
                                );
                            }
                        }
                    }
                }
                BindingState::Failed => {}
            }

            if binding.state == BindingState::Playing {
                let target = envelope::target_gain(
                    track.gain,
                    item.effective_gain(),
                    local,
                    item.duration_secs,
                    tuning.fade_window_secs(),
                );
                binding.current_gain = envelope::step_toward(
                    binding.current_gain,
                    target,
                    tuning.gain_step,
                    tuning.gain_epsilon,
                );
                binding.voice.set_gain(binding.current_gain);
            }
        }

        stats.active_bindings = bindings.len();
    }

    /// Silence every voice before returning and drop all bindings.
    pub fn stop_all(&mut self) {
        for (item_id, mut binding) in self.bindings.drain() {
            binding.voice.stop();
            tracing::debug!(item = %item_id, "Audio binding released");
        }
        self.stats.active_bindings = 0;
    }

    pub fn active_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{AudioBuffer, AudioDecoder};
    use cutline_common::{CutlineError, CutlineResult};
    use cutline_project_model::{Asset, Item, Track, TrackKind};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct VoiceProbe {
        started_at: Option<f64>,
        position: f64,
        gain: f64,
        gain_history: Vec<f64>,
        seeks: Vec<f64>,
        stopped: bool,
    }

    struct ProbeVoice(Arc<Mutex<VoiceProbe>>);

    impl AudioVoice for ProbeVoice {
        fn start(&mut self, _buffer: &AudioBuffer, at_secs: f64) -> CutlineResult<()> {
            let mut probe = self.0.lock().unwrap();
            probe.started_at = Some(at_secs);
            probe.position = at_secs;
            Ok(())
        }

        fn seek(&mut self, to_secs: f64) -> CutlineResult<()> {
            let mut probe = self.0.lock().unwrap();
            probe.seeks.push(to_secs);
            probe.position = to_secs;
            Ok(())
        }

        fn set_gain(&mut self, gain: f64) {
            let mut probe = self.0.lock().unwrap();
            probe.gain = gain;
            probe.gain_history.push(gain);
        }

        fn position_secs(&self) -> f64 {
            self.0.lock().unwrap().position
        }

        fn stop(&mut self) {
            let mut probe = self.0.lock().unwrap();
            probe.stopped = true;
            probe.gain = 0.0;
        }
    }

    #[derive(Default)]
    struct ProbeFactory {
        probes: Arc<Mutex<Vec<Arc<Mutex<VoiceProbe>>>>>,
    }

    impl ProbeFactory {
        fn handles(&self) -> Arc<Mutex<Vec<Arc<Mutex<VoiceProbe>>>>> {
            self.probes.clone()
        }
    }

    impl VoiceFactory for ProbeFactory {
        fn create(&mut self) -> Box<dyn AudioVoice> {
            let probe = Arc::new(Mutex::new(VoiceProbe::default()));
            self.probes.lock().unwrap().push(probe.clone());
            Box::new(ProbeVoice(probe))
        }
    }

    struct InstantDecoder;

    impl AudioDecoder for InstantDecoder {
        fn decode(&self, locator: &str) -> CutlineResult<AudioBuffer> {
            if locator.ends_with(".bad") {
                return Err(CutlineError::decode("no such file"));
            }
            Ok(AudioBuffer::silence(48_000, 2, 10.0))
        }
    }

    struct Scene {
        timeline: Timeline,
        assets: Vec<Asset>,
    }

    /// One audio track (gain 0.8) holding `items` over one shared asset
    /// with an item gain of 0.5.
    fn make_scene(items: &[(f64, f64)]) -> Scene {
        let asset = Asset::audio("music.wav", 60.0);
        let mut track = Track::new("Audio 1", TrackKind::Audio);
        track.gain = 0.8;
        for &(start, duration) in items {
            track
                .items
                .push(Item::new(asset.id, start, duration).with_gain(0.5));
        }
        Scene {
            timeline: Timeline {
                tracks: vec![track],
            },
            assets: vec![asset],
        }
    }

    /// Cache with the scene's assets already decoded, so tests stay
    /// synchronous.
    fn preloaded_cache(scene: &Scene) -> DecodeCache {
        let mut cache = DecodeCache::new(Arc::new(InstantDecoder));
        for asset in &scene.assets {
            cache.preload(asset.id, AudioBuffer::silence(48_000, 2, 60.0));
        }
        cache
    }

    fn make_engine(tuning: PlaybackTuning) -> (AudioSyncEngine, Arc<Mutex<Vec<Arc<Mutex<VoiceProbe>>>>>) {
        let factory = ProbeFactory::default();
        let handles = factory.handles();
        (AudioSyncEngine::new(tuning, Box::new(factory)), handles)
    }

    #[test]
    fn test_voice_starts_at_local_offset() {
        let scene = make_scene(&[(2.0, 6.0)]);
        let mut cache = preloaded_cache(&scene);
        let (mut engine, handles) = make_engine(PlaybackTuning::default());

        engine.tick(&scene.timeline, &scene.assets, 5.0, &mut cache);

        let probes = handles.lock().unwrap();
        assert_eq!(probes.len(), 1);
        assert_eq!(probes[0].lock().unwrap().started_at, Some(3.0));
    }

    #[tokio::test]
    async fn test_tick_never_waits_for_decode() {
        let scene = make_scene(&[(0.0, 6.0)]);
        let mut cache = DecodeCache::new(Arc::new(InstantDecoder));
        let (mut engine, handles) = make_engine(PlaybackTuning::default());

        // First tick schedules the decode and returns with no voice
        // started.
        engine.tick(&scene.timeline, &scene.assets, 1.0, &mut cache);
        assert_eq!(engine.active_count(), 1);
        assert!(handles.lock().unwrap()[0]
            .lock()
            .unwrap()
            .started_at
            .is_none());

        // Once the decode lands, a later tick starts the voice.
        let mut started = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            engine.tick(&scene.timeline, &scene.assets, 1.0, &mut cache);
            if handles.lock().unwrap()[0].lock().unwrap().started_at.is_some() {
                started = true;
                break;
            }
        }
        assert!(started, "voice never started after decode");
    }

    #[test]
    fn test_gain_smooths_toward_combined_target() {
        let scene = make_scene(&[(0.0, 10.0)]);
        let mut cache = preloaded_cache(&scene);
        let (mut engine, handles) = make_engine(PlaybackTuning::default());

        // Mid-item, outside the fade windows: target is 0.8 * 0.5 = 0.4.
        for _ in 0..30 {
            engine.tick(&scene.timeline, &scene.assets, 5.0, &mut cache);
        }
        let probe = handles.lock().unwrap()[0].clone();
        let probe = probe.lock().unwrap();
        assert!((probe.gain - 0.4).abs() < 1e-12);
        // The history climbs in bounded steps instead of jumping.
        assert!(probe.gain_history[0] <= 0.08 + 1e-12);
        assert!(probe
            .gain_history
            .windows(2)
            .all(|w| w[1] >= w[0] && w[1] - w[0] <= 0.08 + 1e-12));
    }

    #[test]
    fn test_gain_is_zero_at_cut_boundary() {
        let scene = make_scene(&[(2.0, 6.0)]);
        let mut cache = preloaded_cache(&scene);
        let (mut engine, handles) = make_engine(PlaybackTuning::default());

        for _ in 0..10 {
            engine.tick(&scene.timeline, &scene.assets, 2.0, &mut cache);
        }
        assert_eq!(handles.lock().unwrap()[0].lock().unwrap().gain, 0.0);
    }

    #[test]
    fn test_large_drift_forces_reseek() {
        let scene = make_scene(&[(0.0, 30.0)]);
        let mut cache = preloaded_cache(&scene);
        let (mut engine, handles) = make_engine(PlaybackTuning::default());

        engine.tick(&scene.timeline, &scene.assets, 1.0, &mut cache);
        // Playhead jumps 5s ahead; the probe's position stays at 1.0.
        engine.tick(&scene.timeline, &scene.assets, 6.0, &mut cache);

        let probe = handles.lock().unwrap()[0].clone();
        assert_eq!(probe.lock().unwrap().seeks, vec![6.0]);
        assert_eq!(engine.stats().reseeks, 1);

        // Aligned again: no further seeks.
        engine.tick(&scene.timeline, &scene.assets, 6.0, &mut cache);
        assert_eq!(probe.lock().unwrap().seeks.len(), 1);
    }

    #[test]
    fn test_small_drift_is_tolerated() {
        let scene = make_scene(&[(0.0, 30.0)]);
        let mut cache = preloaded_cache(&scene);
        let (mut engine, handles) = make_engine(PlaybackTuning::default());

        engine.tick(&scene.timeline, &scene.assets, 1.0, &mut cache);
        // 100ms behind: inside the default 250ms tolerance.
        engine.tick(&scene.timeline, &scene.assets, 1.1, &mut cache);

        let probe = handles.lock().unwrap()[0].clone();
        assert!(probe.lock().unwrap().seeks.is_empty());
        assert_eq!(engine.stats().reseeks, 0);
        assert!(engine.stats().max_abs_drift_ms > 99.0);
    }

    #[test]
    fn test_active_set_change_releases_voice() {
        let scene = make_scene(&[(0.0, 2.0), (2.0, 2.0)]);
        let mut cache = preloaded_cache(&scene);
        let (mut engine, handles) = make_engine(PlaybackTuning::default());

        engine.tick(&scene.timeline, &scene.assets, 1.0, &mut cache);
        assert_eq!(engine.active_count(), 1);

        engine.tick(&scene.timeline, &scene.assets, 2.5, &mut cache);
        assert_eq!(engine.active_count(), 1);

        let probes = handles.lock().unwrap();
        assert_eq!(probes.len(), 2);
        assert!(probes[0].lock().unwrap().stopped);
        assert!(!probes[1].lock().unwrap().stopped);
    }

    #[test]
    fn test_removed_item_releases_buffer() {
        let mut scene = make_scene(&[(0.0, 4.0)]);
        let asset_id = scene.assets[0].id;
        let mut cache = preloaded_cache(&scene);
        let (mut engine, handles) = make_engine(PlaybackTuning::default());

        engine.tick(&scene.timeline, &scene.assets, 1.0, &mut cache);
        assert!(cache.buffer(asset_id).is_some());

        // Deleting the only item that references the asset drops its
        // decoded audio along with the voice.
        scene.timeline.tracks[0].items.clear();
        engine.tick(&scene.timeline, &scene.assets, 1.0, &mut cache);

        assert_eq!(engine.active_count(), 0);
        assert!(handles.lock().unwrap()[0].lock().unwrap().stopped);
        assert!(cache.state(asset_id).is_none());
    }

    #[test]
    fn test_stop_all_is_synchronous() {
        let scene = make_scene(&[(0.0, 10.0)]);
        let mut cache = preloaded_cache(&scene);
        let (mut engine, handles) = make_engine(PlaybackTuning::default());

        engine.tick(&scene.timeline, &scene.assets, 1.0, &mut cache);
        engine.stop_all();

        assert_eq!(engine.active_count(), 0);
        let probe = handles.lock().unwrap()[0].clone();
        assert!(probe.lock().unwrap().stopped);
        assert_eq!(probe.lock().unwrap().gain, 0.0);
    }

    #[test]
    fn test_missing_asset_is_skipped() {
        let mut scene = make_scene(&[(0.0, 10.0)]);
        scene.assets.clear();
        let mut cache = DecodeCache::new(Arc::new(InstantDecoder));
        let (mut engine, handles) = make_engine(PlaybackTuning::default());

        engine.tick(&scene.timeline, &scene.assets, 1.0, &mut cache);
        assert_eq!(engine.active_count(), 0);
        assert!(handles.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_decode_keeps_item_silent() {
        let asset = Asset::audio("gone.bad", 10.0);
        let mut track = Track::new("Audio 1", TrackKind::Audio);
        track.items.push(Item::new(asset.id, 0.0, 10.0));
        let timeline = Timeline {
            tracks: vec![track],
        };
        let assets = vec![asset];

        let mut cache = DecodeCache::new(Arc::new(InstantDecoder));
        let (mut engine, handles) = make_engine(PlaybackTuning::default());

        for _ in 0..50 {
            engine.tick(&timeline, &assets, 1.0, &mut cache);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let probe = handles.lock().unwrap()[0].clone();
        assert!(probe.lock().unwrap().started_at.is_none());
        assert_eq!(probe.lock().unwrap().gain, 0.0);
    }
}
