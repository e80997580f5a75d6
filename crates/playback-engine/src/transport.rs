//! Playback transport: the clock that decides where the playhead is.
//!
//! While playing, the playhead is never stored; it is derived from a pair
//! of anchors captured when playback last started or sought:
//! `position = anchor_position + (now - anchor_wall)`. Stopping freezes
//! the derived position back into the anchor, and seeking rewrites both
//! anchors, so a seek during playback takes effect without a state change.

use std::time::Instant;

/// Transport state. Stopped doubles as pause: position is retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
}

/// Wall-clock anchored playhead.
#[derive(Debug, Clone)]
pub struct Transport {
    state: TransportState,
    /// Logical position captured at the last anchor rewrite.
    anchor_position_secs: f64,
    /// Wall-clock instant of the last anchor rewrite; None while stopped.
    anchor_wall: Option<Instant>,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    /// A stopped transport at position zero.
    pub fn new() -> Self {
        Self {
            state: TransportState::Stopped,
            anchor_position_secs: 0.0,
            anchor_wall: None,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// Current playhead position in seconds.
    pub fn position_secs(&self) -> f64 {
        self.position_at(Instant::now())
    }

    /// Playhead position at an explicit instant.
    pub fn position_at(&self, now: Instant) -> f64 {
        match (self.state, self.anchor_wall) {
            (TransportState::Playing, Some(anchor)) => {
                self.anchor_position_secs + now.duration_since(anchor).as_secs_f64()
            }
            _ => self.anchor_position_secs,
        }
    }

    /// Begin playback from the current position. No-op while playing.
    pub fn play(&mut self) {
        self.play_at(Instant::now());
    }

    pub fn play_at(&mut self, now: Instant) {
        if self.state == TransportState::Playing {
            return;
        }
        self.anchor_wall = Some(now);
        self.state = TransportState::Playing;
        tracing::debug!(
            position_secs = self.anchor_position_secs,
            "Transport playing"
        );
    }

    /// Freeze the playhead where it is. Idempotent.
    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    pub fn stop_at(&mut self, now: Instant) {
        if self.state == TransportState::Stopped {
            return;
        }
        self.anchor_position_secs = self.position_at(now);
        self.anchor_wall = None;
        self.state = TransportState::Stopped;
        tracing::debug!(
            position_secs = self.anchor_position_secs,
            "Transport stopped"
        );
    }

    /// Jump the playhead. Works in both states; negative targets clamp
    /// to zero.
    pub fn seek(&mut self, to_secs: f64) {
        self.seek_at(to_secs, Instant::now());
    }

    pub fn seek_at(&mut self, to_secs: f64, now: Instant) {
        self.anchor_position_secs = to_secs.max(0.0);
        if self.state == TransportState::Playing {
            self.anchor_wall = Some(now);
        }
        tracing::debug!(to_secs = self.anchor_position_secs, "Transport seek");
    }

    /// Seek relative to the current position.
    pub fn nudge(&mut self, delta_secs: f64) {
        self.nudge_at(delta_secs, Instant::now());
    }

    pub fn nudge_at(&mut self, delta_secs: f64, now: Instant) {
        let target = self.position_at(now) + delta_secs;
        self.seek_at(target, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_starts_stopped_at_zero() {
        let transport = Transport::new();
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.position_at(Instant::now()), 0.0);
    }

    #[test]
    fn test_position_derives_from_wall_clock() {
        let t0 = Instant::now();
        let mut transport = Transport::new();
        transport.play_at(t0);
        assert!((transport.position_at(t0 + secs(2.5)) - 2.5).abs() < 1e-9);
        assert!((transport.position_at(t0 + secs(10.0)) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_freezes_position() {
        let t0 = Instant::now();
        let mut transport = Transport::new();
        transport.play_at(t0);
        transport.stop_at(t0 + secs(3.0));
        assert_eq!(transport.state(), TransportState::Stopped);
        // Wall time keeps moving; the playhead does not.
        assert!((transport.position_at(t0 + secs(60.0)) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let t0 = Instant::now();
        let mut transport = Transport::new();
        transport.play_at(t0);
        transport.stop_at(t0 + secs(3.0));
        transport.stop_at(t0 + secs(9.0));
        assert!((transport.position_at(t0 + secs(9.0)) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_play_while_playing_keeps_anchors() {
        let t0 = Instant::now();
        let mut transport = Transport::new();
        transport.play_at(t0);
        transport.play_at(t0 + secs(5.0));
        assert!((transport.position_at(t0 + secs(6.0)) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_seek_while_playing_rewrites_anchors() {
        let t0 = Instant::now();
        let mut transport = Transport::new();
        transport.play_at(t0);
        transport.seek_at(42.0, t0 + secs(3.0));
        assert!(transport.is_playing());
        assert!((transport.position_at(t0 + secs(3.0)) - 42.0).abs() < 1e-9);
        assert!((transport.position_at(t0 + secs(4.0)) - 43.0).abs() < 1e-9);
    }

    #[test]
    fn test_seek_while_stopped_stays_stopped() {
        let mut transport = Transport::new();
        transport.seek_at(7.5, Instant::now());
        assert_eq!(transport.state(), TransportState::Stopped);
        assert_eq!(transport.position_at(Instant::now()), 7.5);
    }

    #[test]
    fn test_seek_clamps_negative_to_zero() {
        let mut transport = Transport::new();
        transport.seek_at(-4.0, Instant::now());
        assert_eq!(transport.position_at(Instant::now()), 0.0);
    }

    #[test]
    fn test_nudge_moves_relative() {
        let t0 = Instant::now();
        let mut transport = Transport::new();
        transport.seek_at(10.0, t0);
        transport.nudge_at(-3.5, t0);
        assert_eq!(transport.position_at(t0), 6.5);
        transport.nudge_at(-20.0, t0);
        assert_eq!(transport.position_at(t0), 0.0);
    }

    #[test]
    fn test_resume_after_stop_continues_from_frozen_position() {
        let t0 = Instant::now();
        let mut transport = Transport::new();
        transport.play_at(t0);
        transport.stop_at(t0 + secs(2.0));
        transport.play_at(t0 + secs(100.0));
        assert!((transport.position_at(t0 + secs(101.0)) - 3.0).abs() < 1e-9);
    }
}
