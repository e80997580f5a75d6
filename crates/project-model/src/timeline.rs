//! The editing timeline: tracks, items, transitions, and filters.
//!
//! Items place assets on tracks with a start time and duration, both in
//! timeline seconds. Items on one track may overlap in time; render order
//! among simultaneous visual items is decided by `layer` alone, lower first.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::asset::{Asset, AssetId, AssetKind};

/// Unique track identifier.
pub type TrackId = Uuid;

/// Unique item identifier.
pub type ItemId = Uuid;

/// Lane kind. The track set is fixed at project creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Video,
    Audio,
    Text,
}

impl TrackKind {
    /// Whether an asset of the given kind may be placed on this track.
    /// Video tracks hold video and image assets; audio and text tracks
    /// hold only their own kind.
    pub fn accepts(&self, kind: &AssetKind) -> bool {
        match self {
            TrackKind::Video => matches!(kind, AssetKind::Video | AssetKind::Image),
            TrackKind::Audio => matches!(kind, AssetKind::Audio),
            TrackKind::Text => matches!(kind, AssetKind::Text { .. }),
        }
    }

    /// Whether items on this track produce pixels.
    pub fn is_visual(&self) -> bool {
        matches!(self, TrackKind::Video | TrackKind::Text)
    }
}

/// An ordered lane holding items of a compatible kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique identifier.
    pub id: TrackId,

    /// Display name (for example "Video 1").
    pub name: String,

    /// Lane kind.
    pub kind: TrackKind,

    /// Track-level gain factor in [0, 1]. Applies to audio items.
    #[serde(default = "default_gain")]
    pub gain: f64,

    /// Items placed on this track.
    #[serde(default)]
    pub items: Vec<Item>,
}

fn default_gain() -> f64 {
    1.0
}

impl Track {
    /// Create an empty track.
    pub fn new(name: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            gain: 1.0,
            items: Vec::new(),
        }
    }

    /// Find an item by id.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Find an item by id, mutably.
    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    /// Remove an item by id, returning it if present.
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let idx = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(idx))
    }

    /// Items whose time range contains the given position.
    pub fn items_at(&self, position_secs: f64) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(move |i| i.contains(position_secs))
    }
}

/// Transition kind at an item boundary.
///
/// Fade and dissolve scale opacity linearly toward the boundary; wipe and
/// slide are rendering modes that crop or offset the drawn region instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    #[default]
    None,
    Fade,
    Dissolve,
    Wipe,
    Slide,
}

/// A transition window at an item's entry or exit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Transition kind.
    pub kind: TransitionKind,

    /// Window length in seconds, measured from the item boundary inward.
    pub duration_secs: f64,
}

impl Transition {
    pub fn new(kind: TransitionKind, duration_secs: f64) -> Self {
        Self {
            kind,
            duration_secs,
        }
    }
}

/// Per-item pixel adjustments, applied before drawing.
///
/// Semantics are shared verbatim between the preview rasterizer and the
/// export filter chain: `brightness` is additive on normalized values,
/// `contrast` and `saturation` are multipliers with 1.0 as identity, and
/// `blur` is a box blur radius in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Additive brightness in [-1, 1]; 0 is identity.
    pub brightness: f64,

    /// Contrast multiplier around mid-gray; 1 is identity.
    pub contrast: f64,

    /// Saturation multiplier; 1 is identity, 0 is grayscale.
    pub saturation: f64,

    /// Box blur radius in output pixels; 0 is identity.
    pub blur: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            blur: 0.0,
        }
    }
}

impl FilterParams {
    /// Whether these parameters change nothing.
    pub fn is_identity(&self) -> bool {
        self.brightness == 0.0
            && self.contrast == 1.0
            && self.saturation == 1.0
            && self.blur == 0.0
    }
}

/// A timed placement of one asset on one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier.
    pub id: ItemId,

    /// The asset this item draws from.
    pub asset_id: AssetId,

    /// Timeline start in seconds (>= 0).
    pub start_secs: f64,

    /// Duration in seconds (> 0).
    pub duration_secs: f64,

    /// Compositing order among simultaneous items; lower drawn first.
    #[serde(default)]
    pub layer: i32,

    /// Per-item gain override in [0, 1]. Audio items only.
    #[serde(default)]
    pub gain: Option<f64>,

    /// Opacity in [0, 1]. Visual items only.
    #[serde(default)]
    pub opacity: Option<f64>,

    /// Transition at item entry.
    #[serde(default)]
    pub transition_in: Option<Transition>,

    /// Transition at item exit.
    #[serde(default)]
    pub transition_out: Option<Transition>,

    /// Pixel adjustments.
    #[serde(default)]
    pub filters: Option<FilterParams>,
}

impl Item {
    /// Create an item at the given range with default attributes.
    pub fn new(asset_id: AssetId, start_secs: f64, duration_secs: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset_id,
            start_secs,
            duration_secs,
            layer: 0,
            gain: None,
            opacity: None,
            transition_in: None,
            transition_out: None,
            filters: None,
        }
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = Some(gain);
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_transition_in(mut self, transition: Transition) -> Self {
        self.transition_in = Some(transition);
        self
    }

    pub fn with_transition_out(mut self, transition: Transition) -> Self {
        self.transition_out = Some(transition);
        self
    }

    pub fn with_filters(mut self, filters: FilterParams) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Timeline end in seconds (exclusive).
    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// Whether `[start, end)` contains the given position.
    pub fn contains(&self, position_secs: f64) -> bool {
        position_secs >= self.start_secs && position_secs < self.end_secs()
    }

    /// Position relative to item start.
    pub fn local_time(&self, position_secs: f64) -> f64 {
        position_secs - self.start_secs
    }

    /// Gain override, defaulting to unity.
    pub fn effective_gain(&self) -> f64 {
        self.gain.unwrap_or(1.0)
    }

    /// Opacity, defaulting to fully opaque.
    pub fn effective_opacity(&self) -> f64 {
        self.opacity.unwrap_or(1.0)
    }
}

/// The ordered track list. This is the unit the undo history snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Timeline {
    /// Tracks in display order. The set is fixed at project creation.
    pub tracks: Vec<Track>,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a track by id.
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Find a track by id, mutably.
    pub fn track_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// First track of the given kind.
    pub fn first_track_of_kind(&self, kind: TrackKind) -> Option<&Track> {
        self.tracks.iter().find(|t| t.kind == kind)
    }

    /// Find an item anywhere on the timeline.
    pub fn find_item(&self, id: ItemId) -> Option<(&Track, &Item)> {
        self.tracks
            .iter()
            .find_map(|t| t.item(id).map(|i| (t, i)))
    }

    /// Find an item anywhere on the timeline, mutably.
    pub fn find_item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.tracks.iter_mut().find_map(|t| t.item_mut(id))
    }

    /// The track currently holding an item.
    pub fn holding_track(&self, id: ItemId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.item(id).is_some())
    }

    /// All items across all tracks.
    pub fn all_items(&self) -> impl Iterator<Item = &Item> {
        self.tracks.iter().flat_map(|t| t.items.iter())
    }

    /// Number of items across all tracks.
    pub fn item_count(&self) -> usize {
        self.tracks.iter().map(|t| t.items.len()).sum()
    }

    /// Active items on tracks of visual kinds at the given position,
    /// paired with their track.
    pub fn visual_items_at(&self, position_secs: f64) -> Vec<(&Track, &Item)> {
        self.tracks
            .iter()
            .filter(|t| t.kind.is_visual())
            .flat_map(|t| t.items_at(position_secs).map(move |i| (t, i)))
            .collect()
    }

    /// Active items on audio tracks at the given position, paired with
    /// their track.
    pub fn audio_items_at(&self, position_secs: f64) -> Vec<(&Track, &Item)> {
        self.tracks
            .iter()
            .filter(|t| t.kind == TrackKind::Audio)
            .flat_map(|t| t.items_at(position_secs).map(move |i| (t, i)))
            .collect()
    }

    /// Maximum `start + duration` across all items, or 0 when empty.
    pub fn total_duration(&self) -> f64 {
        self.all_items()
            .map(|i| i.end_secs())
            .fold(0.0, f64::max)
    }

    /// Check model invariants, returning human-readable violations.
    ///
    /// Verified: positive finite durations, non-negative finite starts,
    /// resolvable asset references, and track/asset kind compatibility.
    /// The duration and start checks are written so NaN fails them.
    pub fn validate(&self, assets: &[Asset]) -> Vec<String> {
        let mut errors = Vec::new();
        for track in &self.tracks {
            if !(0.0..=1.0).contains(&track.gain) {
                errors.push(format!("Track '{}' gain {} outside [0, 1]", track.name, track.gain));
            }
            for item in &track.items {
                if !(item.duration_secs.is_finite() && item.duration_secs > 0.0) {
                    errors.push(format!(
                        "Item {} on '{}' has invalid duration {}",
                        item.id, track.name, item.duration_secs
                    ));
                }
                if !(item.start_secs.is_finite() && item.start_secs >= 0.0) {
                    errors.push(format!(
                        "Item {} on '{}' has invalid start {}",
                        item.id, track.name, item.start_secs
                    ));
                }
                match assets.iter().find(|a| a.id == item.asset_id) {
                    None => errors.push(format!(
                        "Item {} on '{}' references missing asset {}",
                        item.id, track.name, item.asset_id
                    )),
                    Some(asset) => {
                        if !track.kind.accepts(&asset.kind) {
                            errors.push(format!(
                                "Item {} places a {:?}-incompatible asset on '{}'",
                                item.id, track.kind, track.name
                            ));
                        }
                    }
                }
            }
        }
        errors
    }
}
