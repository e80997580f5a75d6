//! Gain envelopes and smoothing.
//!
//! Audible clicks at cut points come from instantaneous gain changes, so
//! every audio item wears a short linear fade at both boundaries, and the
//! running gain of a voice moves toward its target in bounded steps
//! rather than jumping.

/// Linear fade envelope at item boundaries: 0 exactly at either cut,
/// 1 once inside the window. On items shorter than two windows the
/// ramps meet below full gain.
pub fn fade_envelope(local_secs: f64, duration_secs: f64, window_secs: f64) -> f64 {
    if duration_secs <= 0.0 {
        return 0.0;
    }
    if window_secs <= 0.0 {
        return 1.0;
    }
    let rise = (local_secs / window_secs).clamp(0.0, 1.0);
    let fall = ((duration_secs - local_secs) / window_secs).clamp(0.0, 1.0);
    rise.min(fall)
}

/// Target gain for an audio item at a local time: track gain times item
/// gain, shaped by the boundary fade.
pub fn target_gain(
    track_gain: f64,
    item_gain: f64,
    local_secs: f64,
    duration_secs: f64,
    fade_window_secs: f64,
) -> f64 {
    (track_gain * item_gain).clamp(0.0, 1.0)
        * fade_envelope(local_secs, duration_secs, fade_window_secs)
}

/// One smoothing step: move `current` toward `target` by at most
/// `max_step`, snapping once the remaining distance is within `epsilon`
/// so the value settles exactly instead of oscillating.
pub fn step_toward(current: f64, target: f64, max_step: f64, epsilon: f64) -> f64 {
    let delta = target - current;
    if delta.abs() <= epsilon.max(0.0) {
        return target;
    }
    let step = max_step.max(0.0);
    if delta.abs() <= step {
        target
    } else {
        current + step * delta.signum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_envelope_zero_at_boundaries() {
        assert_eq!(fade_envelope(0.0, 4.0, 0.05), 0.0);
        assert_eq!(fade_envelope(4.0, 4.0, 0.05), 0.0);
    }

    #[test]
    fn test_envelope_unity_inside_window() {
        assert_eq!(fade_envelope(2.0, 4.0, 0.05), 1.0);
        assert_eq!(fade_envelope(0.05, 4.0, 0.05), 1.0);
    }

    #[test]
    fn test_envelope_ramps_linearly() {
        assert_eq!(fade_envelope(0.025, 4.0, 0.05), 0.5);
        assert_eq!(fade_envelope(3.975, 4.0, 0.05), 0.5);
    }

    #[test]
    fn test_envelope_outside_item_is_zero() {
        assert_eq!(fade_envelope(-0.1, 4.0, 0.05), 0.0);
        assert_eq!(fade_envelope(4.1, 4.0, 0.05), 0.0);
    }

    #[test]
    fn test_short_item_ramps_meet_below_unity() {
        // 0.6s windows on a 1s item: the midpoint only reaches 5/6.
        let mid = fade_envelope(0.5, 1.0, 0.6);
        assert!((mid - 0.5 / 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_target_gain_combines_track_and_item() {
        // Track 0.8, item 0.5, well inside the fade window.
        let gain = target_gain(0.8, 0.5, 2.0, 4.0, 0.05);
        assert!((gain - 0.4).abs() < 1e-12);
        // At the cut itself the combined gain is silenced entirely.
        assert_eq!(target_gain(0.8, 0.5, 0.0, 4.0, 0.05), 0.0);
    }

    #[test]
    fn test_step_toward_is_bounded() {
        let next = step_toward(0.0, 1.0, 0.08, 0.001);
        assert!((next - 0.08).abs() < 1e-12);
        let next = step_toward(1.0, 0.0, 0.08, 0.001);
        assert!((next - 0.92).abs() < 1e-12);
    }

    #[test]
    fn test_step_toward_snaps_within_epsilon() {
        assert_eq!(step_toward(0.4995, 0.5, 0.08, 0.001), 0.5);
        assert_eq!(step_toward(0.5, 0.5, 0.08, 0.001), 0.5);
    }

    #[test]
    fn test_step_toward_settles() {
        let mut gain = 0.0;
        for _ in 0..20 {
            gain = step_toward(gain, 1.0, 0.08, 0.001);
        }
        assert_eq!(gain, 1.0);
    }

    proptest! {
        #[test]
        fn test_envelope_bounded(
            local in -10.0..70.0f64,
            duration in 0.1..60.0f64,
            window in 0.0..2.0f64,
        ) {
            let value = fade_envelope(local, duration, window);
            prop_assert!((0.0..=1.0).contains(&value));
        }

        #[test]
        fn test_smoothing_never_overshoots(
            current in 0.0..1.0f64,
            target in 0.0..1.0f64,
            step in 0.001..0.5f64,
        ) {
            let next = step_toward(current, target, step, 0.001);
            let before = (target - current).abs();
            let after = (target - next).abs();
            prop_assert!(after <= before + 1e-12);
        }
    }
}
