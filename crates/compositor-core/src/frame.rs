//! Frame composition: resolve the visible scene at one playhead position.
//!
//! `compose` is a pure function of the playhead, the timeline, and the
//! asset table. It produces a draw plan ordered bottom-up by layer; turning
//! the plan into pixels is the rasterizer's job, so decode state never
//! leaks in here and the same plan drives both preview and export.

use cutline_project_model::{
    Asset, AssetId, AssetKind, FilterParams, ItemId, TextStyle, Timeline,
};
use serde::Serialize;

use crate::transition;

/// What a layer draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum LayerContent {
    /// A video frame sampled `source_secs` into the asset.
    Video { locator: String, source_secs: f64 },

    /// A still image.
    Image { locator: String },

    /// Styled text shaped by the rendering backend.
    Text { content: String, style: TextStyle },
}

/// One visual item resolved for a single output frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerPlan {
    pub item_id: ItemId,
    pub asset_id: AssetId,

    /// Compositing order; the plan is already sorted by this, ascending.
    pub layer: i32,

    pub content: LayerContent,

    /// Final opacity: item opacity times transition multipliers, in [0, 1].
    pub opacity: f64,

    /// Visible fraction from the item's left edge (wipe), in [0, 1].
    pub reveal: f64,

    /// Horizontal offset as a fraction of canvas width (slide).
    pub offset_x: f64,

    pub filters: FilterParams,
}

/// The resolved scene at one playhead position, layers bottom-up.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct FramePlan {
    pub playhead_secs: f64,
    pub layers: Vec<LayerPlan>,
}

impl FramePlan {
    /// True when nothing is visible; the canvas renders as background.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Resolve the scene at `playhead_secs`.
///
/// Items on non-visual tracks, items whose asset is missing, and audio
/// assets are skipped. Fully transparent layers are kept in the plan so
/// callers can still see what is active; the rasterizer skips them.
pub fn compose(timeline: &Timeline, assets: &[Asset], playhead_secs: f64) -> FramePlan {
    let mut layers: Vec<LayerPlan> = timeline
        .visual_items_at(playhead_secs)
        .into_iter()
        .filter_map(|(_, item)| {
            let asset = assets.iter().find(|a| a.id == item.asset_id)?;
            let local = item.local_time(playhead_secs);
            let effect = transition::effect_at(item, local);

            let content = match &asset.kind {
                AssetKind::Video => LayerContent::Video {
                    locator: asset.locator.clone(),
                    source_secs: source_time(local, asset.duration_secs),
                },
                AssetKind::Image => LayerContent::Image {
                    locator: asset.locator.clone(),
                },
                AssetKind::Text { content, style } => LayerContent::Text {
                    content: content.clone(),
                    style: style.clone(),
                },
                AssetKind::Audio => return None,
            };

            Some(LayerPlan {
                item_id: item.id,
                asset_id: asset.id,
                layer: item.layer,
                content,
                opacity: (item.effective_opacity() * effect.opacity).clamp(0.0, 1.0),
                reveal: effect.reveal,
                offset_x: effect.offset_x,
                filters: item.filters.unwrap_or_default(),
            })
        })
        .collect();

    // Stable sort: equal layers keep track order.
    layers.sort_by(|a, b| a.layer.cmp(&b.layer));
    tracing::trace!(
        playhead_secs,
        layer_count = layers.len(),
        "Composed frame plan"
    );

    FramePlan {
        playhead_secs,
        layers,
    }
}

/// Source sampling time for video. An item that outlives its media holds
/// the last frame rather than sampling past the end.
fn source_time(local_secs: f64, asset_duration: Option<f64>) -> f64 {
    match asset_duration {
        Some(duration) if duration > 0.0 => local_secs.min(duration),
        _ => local_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutline_project_model::{
        Item, TextStyle, Track, TrackKind, Transition, TransitionKind,
    };

    struct Scene {
        timeline: Timeline,
        assets: Vec<Asset>,
    }

    /// Video clip on [0, 5) at layer 0 and a text overlay on [2, 4) at
    /// layer 1, with an audio bed underneath.
    fn make_scene() -> Scene {
        let video = Asset::video("clips/main.mp4", 30.0);
        let audio = Asset::audio("audio/bed.wav", 30.0);
        let text = Asset::text("Hello", TextStyle::default());

        let mut video_track = Track::new("Video 1", TrackKind::Video);
        video_track.items.push(Item::new(video.id, 0.0, 5.0));
        let mut text_track = Track::new("Text 1", TrackKind::Text);
        text_track
            .items
            .push(Item::new(text.id, 2.0, 2.0).with_layer(1));
        let mut audio_track = Track::new("Audio 1", TrackKind::Audio);
        audio_track.items.push(Item::new(audio.id, 0.0, 5.0));

        Scene {
            timeline: Timeline {
                tracks: vec![video_track, text_track, audio_track],
            },
            assets: vec![video, audio, text],
        }
    }

    #[test]
    fn test_compose_blank_region_is_empty() {
        let scene = make_scene();
        let plan = compose(&scene.timeline, &scene.assets, 30.0);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_compose_resolves_video_and_overlay() {
        let scene = make_scene();
        let plan = compose(&scene.timeline, &scene.assets, 3.0);

        assert_eq!(plan.layers.len(), 2);
        assert!(matches!(
            plan.layers[0].content,
            LayerContent::Video { source_secs, .. } if source_secs == 3.0
        ));
        assert!(matches!(
            plan.layers[1].content,
            LayerContent::Text { ref content, .. } if content == "Hello"
        ));
        // Outside every transition window both layers draw fully opaque.
        assert_eq!(plan.layers[0].opacity, 1.0);
        assert_eq!(plan.layers[1].opacity, 1.0);
    }

    #[test]
    fn test_layers_sorted_ascending() {
        let asset = Asset::video("v.mp4", 30.0);
        let mut track = Track::new("Video 1", TrackKind::Video);
        track.items.push(Item::new(asset.id, 0.0, 5.0).with_layer(3));
        track.items.push(Item::new(asset.id, 0.0, 5.0).with_layer(-1));
        track.items.push(Item::new(asset.id, 0.0, 5.0).with_layer(1));
        let timeline = Timeline {
            tracks: vec![track],
        };

        let plan = compose(&timeline, std::slice::from_ref(&asset), 1.0);
        let order: Vec<i32> = plan.layers.iter().map(|l| l.layer).collect();
        assert_eq!(order, vec![-1, 1, 3]);
    }

    #[test]
    fn test_audio_items_never_appear() {
        let scene = make_scene();
        let plan = compose(&scene.timeline, &scene.assets, 1.0);
        assert_eq!(plan.layers.len(), 1);
        assert!(matches!(plan.layers[0].content, LayerContent::Video { .. }));
    }

    #[test]
    fn test_missing_asset_skipped() {
        let asset = Asset::video("v.mp4", 30.0);
        let mut track = Track::new("Video 1", TrackKind::Video);
        track.items.push(Item::new(asset.id, 0.0, 5.0));
        let timeline = Timeline {
            tracks: vec![track],
        };

        // Asset table does not contain the referenced asset.
        let plan = compose(&timeline, &[], 1.0);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_fade_boundary_yields_transparent_layer() {
        let asset = Asset::video("v.mp4", 30.0);
        let mut track = Track::new("Video 1", TrackKind::Video);
        track.items.push(
            Item::new(asset.id, 1.0, 4.0)
                .with_transition_in(Transition::new(TransitionKind::Fade, 1.0)),
        );
        let timeline = Timeline {
            tracks: vec![track],
        };

        let plan = compose(&timeline, std::slice::from_ref(&asset), 1.0);
        assert_eq!(plan.layers.len(), 1);
        assert_eq!(plan.layers[0].opacity, 0.0);

        let plan = compose(&timeline, std::slice::from_ref(&asset), 1.5);
        assert_eq!(plan.layers[0].opacity, 0.5);
    }

    #[test]
    fn test_item_opacity_multiplies_transition() {
        let asset = Asset::video("v.mp4", 30.0);
        let mut track = Track::new("Video 1", TrackKind::Video);
        track.items.push(
            Item::new(asset.id, 0.0, 4.0)
                .with_opacity(0.5)
                .with_transition_in(Transition::new(TransitionKind::Fade, 2.0)),
        );
        let timeline = Timeline {
            tracks: vec![track],
        };

        let plan = compose(&timeline, std::slice::from_ref(&asset), 1.0);
        assert_eq!(plan.layers[0].opacity, 0.25);
    }

    #[test]
    fn test_video_sampling_holds_last_frame() {
        // 2s of media stretched across a 10s item.
        let asset = Asset::video("v.mp4", 2.0);
        let mut track = Track::new("Video 1", TrackKind::Video);
        track.items.push(Item::new(asset.id, 0.0, 10.0));
        let timeline = Timeline {
            tracks: vec![track],
        };

        let plan = compose(&timeline, std::slice::from_ref(&asset), 7.0);
        assert!(matches!(
            plan.layers[0].content,
            LayerContent::Video { source_secs, .. } if source_secs == 2.0
        ));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let scene = make_scene();
        let a = compose(&scene.timeline, &scene.assets, 2.5);
        let b = compose(&scene.timeline, &scene.assets, 2.5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_plan_serializes_for_inspection() {
        let scene = make_scene();
        let plan = compose(&scene.timeline, &scene.assets, 3.0);
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["layers"][1]["content"]["source"], "text");
    }
}
