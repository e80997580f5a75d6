//! Timing utilities for playback synchronization.
//!
//! All playback positions are logical timeline seconds derived from a
//! wall-clock anchor. This module provides:
//! - Conversions between seconds and nanoseconds
//! - Drift measurement between expected and actual media positions
//! - Tick pacing for the preview loop

/// Convert a nanosecond value to seconds.
pub fn ns_to_secs(ns: u64) -> f64 {
    ns as f64 / 1_000_000_000.0
}

/// Convert seconds to nanoseconds.
pub fn secs_to_ns(secs: f64) -> u64 {
    (secs * 1_000_000_000.0) as u64
}

/// Format a timeline position as `mm:ss.mmm` for display.
pub fn format_timecode(secs: f64) -> String {
    let secs = secs.max(0.0);
    let minutes = (secs / 60.0) as u64;
    let remainder = secs - minutes as f64 * 60.0;
    format!("{:02}:{:06.3}", minutes, remainder)
}

/// Drift between a media source's expected and actual position.
///
/// Expected position is what the playhead implies (`playhead - item.start`);
/// actual is what the source last reported.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Position the playhead implies, in seconds.
    pub expected_secs: f64,
    /// Position the source reports, in seconds.
    pub actual_secs: f64,
}

impl DriftMeasurement {
    /// Drift in seconds (positive = source is ahead of the playhead).
    pub fn drift_secs(&self) -> f64 {
        self.actual_secs - self.expected_secs
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_secs() * 1000.0
    }

    /// Whether drift exceeds the given tolerance in seconds.
    pub fn exceeds_tolerance(&self, tolerance_secs: f64) -> bool {
        self.drift_secs().abs() > tolerance_secs
    }
}

/// Fixed-rate controller for the preview tick loop.
#[derive(Debug)]
pub struct TickRateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl TickRateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}
