//! Playback session: owns the transport, the synchronization engines,
//! and the decode cache, and turns ticks into frame plans.
//!
//! The session never renders pixels. Each tick yields a `FramePlan`;
//! the caller rasterizes it or hands it to a preview surface.

use std::sync::Arc;
use std::time::Instant;

use cutline_common::PlaybackTuning;
use cutline_compositor_core::{compose, FramePlan};
use cutline_project_model::{Asset, Timeline};
use serde::Serialize;

use crate::decode::{AudioDecoder, DecodeCache, SilenceDecoder};
use crate::sync::AudioSyncEngine;
use crate::transport::{Transport, TransportState};
use crate::video::{NullVideoStreamFactory, VideoLockstep, VideoStreamFactory};
use crate::voice::{NullVoiceFactory, VoiceFactory};

/// Counters refreshed on every tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaybackStats {
    pub ticks: u64,
    pub playhead_secs: f64,
    pub active_audio: usize,
    pub active_video: usize,
    pub audio_reseeks: u64,
    pub video_reseeks: u64,
    pub max_abs_drift_ms: f64,
}

pub struct PlaybackSession {
    transport: Transport,
    audio: AudioSyncEngine,
    video: VideoLockstep,
    decode: DecodeCache,
    stats: PlaybackStats,
}

impl PlaybackSession {
    pub fn new(
        tuning: PlaybackTuning,
        voices: Box<dyn VoiceFactory>,
        streams: Box<dyn VideoStreamFactory>,
        decoder: Arc<dyn AudioDecoder>,
    ) -> Self {
        Self {
            transport: Transport::new(),
            audio: AudioSyncEngine::new(tuning.clone(), voices),
            video: VideoLockstep::new(tuning.drift_tolerance_secs, streams),
            decode: DecodeCache::new(decoder),
            stats: PlaybackStats::default(),
        }
    }

    /// Session with no audio or video output attached. Timing, drift
    /// handling, and frame planning behave exactly as in a wired
    /// session.
    pub fn headless(tuning: PlaybackTuning) -> Self {
        Self::new(
            tuning,
            Box::new(NullVoiceFactory),
            Box::new(NullVideoStreamFactory),
            Arc::new(SilenceDecoder),
        )
    }

    pub fn play(&mut self) {
        self.transport.play();
        tracing::info!(playhead_secs = self.transport.position_secs(), "Playback started");
    }

    /// Stop the transport and silence every voice before returning.
    pub fn stop(&mut self) {
        self.transport.stop();
        self.audio.stop_all();
        self.video.stop_all();
        tracing::info!(playhead_secs = self.transport.position_secs(), "Playback stopped");
    }

    /// Move the playhead. Voices are not touched here; the next tick
    /// observes the drift and reseeks whatever exceeds tolerance.
    pub fn seek(&mut self, to_secs: f64) {
        self.transport.seek(to_secs);
    }

    pub fn state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn playhead_secs(&self) -> f64 {
        self.transport.position_secs()
    }

    pub fn stats(&self) -> &PlaybackStats {
        &self.stats
    }

    /// Advance one tick and plan the frame at the current playhead.
    pub fn tick(&mut self, timeline: &Timeline, assets: &[Asset]) -> FramePlan {
        self.tick_at(timeline, assets, Instant::now())
    }

    /// Tick against an explicit clock reading.
    pub fn tick_at(&mut self, timeline: &Timeline, assets: &[Asset], now: Instant) -> FramePlan {
        let playhead_secs = self.transport.position_at(now);

        // Voices and streams only run while the transport does. A
        // stopped session still plans frames so scrubbing stays live.
        if self.transport.state() == TransportState::Playing {
            self.audio.tick(timeline, assets, playhead_secs, &mut self.decode);
            self.video.tick(timeline, assets, playhead_secs);
        }

        let plan = compose(timeline, assets, playhead_secs);

        self.stats.ticks += 1;
        self.stats.playhead_secs = playhead_secs;
        self.stats.active_audio = self.audio.active_count();
        self.stats.active_video = self.video.active_count();
        self.stats.audio_reseeks = self.audio.stats().reseeks;
        self.stats.video_reseeks = self.video.stats().reseeks;
        self.stats.max_abs_drift_ms = self.audio.stats().max_abs_drift_ms;

        plan
    }
}
