//! Per-instant transition shaping.
//!
//! Fade and dissolve scale the item's opacity linearly across the window.
//! Wipe and slide never touch opacity: wipe reveals the item from its left
//! edge, and slide offsets it horizontally, entering from the left and
//! leaving to the right. A cross-dissolve needs no dedicated machinery; it
//! falls out of two overlapping items with opposite fade windows.

use cutline_project_model::{Item, Transition, TransitionKind};
use serde::Serialize;

/// How transitions shape one item at one instant. Values are multipliers
/// and fractions, resolved against real pixels at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionEffect {
    /// Opacity multiplier in [0, 1].
    pub opacity: f64,

    /// Fraction of the item visible from its left edge, in [0, 1].
    pub reveal: f64,

    /// Horizontal offset as a fraction of canvas width.
    pub offset_x: f64,
}

impl TransitionEffect {
    pub const IDENTITY: Self = Self {
        opacity: 1.0,
        reveal: 1.0,
        offset_x: 0.0,
    };

    /// Merge two effects: opacities multiply, reveals take the smaller,
    /// offsets add. Entry and exit windows that overlap on a short item
    /// both apply.
    fn combine(self, other: Self) -> Self {
        Self {
            opacity: self.opacity * other.opacity,
            reveal: self.reveal.min(other.reveal),
            offset_x: self.offset_x + other.offset_x,
        }
    }
}

/// Progress through a window measured from an item boundary: 0 at the
/// boundary, 1 once the window has fully passed. Degenerate windows
/// resolve to 1 so a zero-length transition never hides the item.
fn window_progress(from_boundary_secs: f64, window_secs: f64) -> f64 {
    if window_secs <= 0.0 {
        return 1.0;
    }
    (from_boundary_secs / window_secs).clamp(0.0, 1.0)
}

fn effect_for(kind: TransitionKind, progress: f64, leaving: bool) -> TransitionEffect {
    match kind {
        TransitionKind::None => TransitionEffect::IDENTITY,
        TransitionKind::Fade | TransitionKind::Dissolve => TransitionEffect {
            opacity: progress,
            ..TransitionEffect::IDENTITY
        },
        TransitionKind::Wipe => TransitionEffect {
            reveal: progress,
            ..TransitionEffect::IDENTITY
        },
        TransitionKind::Slide => TransitionEffect {
            offset_x: if leaving {
                1.0 - progress
            } else {
                progress - 1.0
            },
            ..TransitionEffect::IDENTITY
        },
    }
}

/// Combined effect of an item's entry and exit windows at a local time
/// (seconds from the item start).
pub fn effect_at(item: &Item, local_secs: f64) -> TransitionEffect {
    let mut effect = TransitionEffect::IDENTITY;
    if let Some(Transition {
        kind,
        duration_secs,
    }) = item.transition_in
    {
        let progress = window_progress(local_secs, duration_secs);
        effect = effect.combine(effect_for(kind, progress, false));
    }
    if let Some(Transition {
        kind,
        duration_secs,
    }) = item.transition_out
    {
        let remaining = item.duration_secs - local_secs;
        let progress = window_progress(remaining, duration_secs);
        effect = effect.combine(effect_for(kind, progress, true));
    }
    effect
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_project_model::Item;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn item_with(
        duration: f64,
        transition_in: Option<Transition>,
        transition_out: Option<Transition>,
    ) -> Item {
        let mut item = Item::new(Uuid::new_v4(), 0.0, duration);
        item.transition_in = transition_in;
        item.transition_out = transition_out;
        item
    }

    #[test]
    fn test_no_transitions_is_identity() {
        let item = item_with(5.0, None, None);
        assert_eq!(effect_at(&item, 2.5), TransitionEffect::IDENTITY);
    }

    #[test]
    fn test_fade_in_ramps_opacity() {
        let item = item_with(5.0, Some(Transition::new(TransitionKind::Fade, 1.0)), None);
        assert_eq!(effect_at(&item, 0.0).opacity, 0.0);
        assert_eq!(effect_at(&item, 0.5).opacity, 0.5);
        assert_eq!(effect_at(&item, 1.0).opacity, 1.0);
        assert_eq!(effect_at(&item, 3.0).opacity, 1.0);
    }

    #[test]
    fn test_fade_out_reaches_zero_at_end() {
        let item = item_with(5.0, None, Some(Transition::new(TransitionKind::Fade, 1.0)));
        assert_eq!(effect_at(&item, 3.0).opacity, 1.0);
        assert_eq!(effect_at(&item, 4.5).opacity, 0.5);
        assert_eq!(effect_at(&item, 5.0).opacity, 0.0);
    }

    #[test]
    fn test_dissolve_matches_fade_shape() {
        let fade = item_with(4.0, Some(Transition::new(TransitionKind::Fade, 2.0)), None);
        let dissolve = item_with(
            4.0,
            Some(Transition::new(TransitionKind::Dissolve, 2.0)),
            None,
        );
        assert_eq!(effect_at(&fade, 1.0), effect_at(&dissolve, 1.0));
    }

    #[test]
    fn test_wipe_reveals_without_fading() {
        let item = item_with(5.0, Some(Transition::new(TransitionKind::Wipe, 2.0)), None);
        let effect = effect_at(&item, 1.0);
        assert_eq!(effect.reveal, 0.5);
        assert_eq!(effect.opacity, 1.0);
        assert_eq!(effect.offset_x, 0.0);
    }

    #[test]
    fn test_slide_enters_left_leaves_right() {
        let item = item_with(
            10.0,
            Some(Transition::new(TransitionKind::Slide, 2.0)),
            Some(Transition::new(TransitionKind::Slide, 2.0)),
        );
        // Entering: starts a full canvas to the left, settles at zero.
        assert_eq!(effect_at(&item, 0.0).offset_x, -1.0);
        assert_eq!(effect_at(&item, 1.0).offset_x, -0.5);
        assert_eq!(effect_at(&item, 2.0).offset_x, 0.0);
        // Leaving: departs a full canvas to the right.
        assert_eq!(effect_at(&item, 9.0).offset_x, 0.5);
        assert_eq!(effect_at(&item, 10.0).offset_x, 1.0);
    }

    #[test]
    fn test_overlapping_windows_multiply() {
        // A 1s item with 1s fades on both ends is never fully opaque.
        let item = item_with(
            1.0,
            Some(Transition::new(TransitionKind::Fade, 1.0)),
            Some(Transition::new(TransitionKind::Fade, 1.0)),
        );
        let effect = effect_at(&item, 0.5);
        assert_eq!(effect.opacity, 0.25);
    }

    #[test]
    fn test_zero_length_window_never_hides() {
        let item = item_with(5.0, Some(Transition::new(TransitionKind::Fade, 0.0)), None);
        assert_eq!(effect_at(&item, 0.0).opacity, 1.0);
    }

    proptest! {
        #[test]
        fn test_effect_stays_in_range(
            duration in 0.1..60.0f64,
            window_in in 0.0..5.0f64,
            window_out in 0.0..5.0f64,
            at in 0.0..1.0f64,
        ) {
            let item = item_with(
                duration,
                Some(Transition::new(TransitionKind::Fade, window_in)),
                Some(Transition::new(TransitionKind::Wipe, window_out)),
            );
            let effect = effect_at(&item, at * duration);
            prop_assert!((0.0..=1.0).contains(&effect.opacity));
            prop_assert!((0.0..=1.0).contains(&effect.reveal));
        }
    }
}
