//! Edit operations over the timeline.
//!
//! Every operation is a pure transformation of the timeline; invariant
//! violations (split outside range, resize below the minimum duration,
//! move to an incompatible track, non-finite positions) reject as silent
//! no-ops. `Editor` wraps the operations with undo history, snapshotting
//! the pre-mutation state only when an operation actually changed the
//! model.

use uuid::Uuid;

use crate::asset::Asset;
use crate::history::History;
use crate::project::Project;
use crate::timeline::{Item, ItemId, Timeline, TrackId};

/// Minimum item duration enforced by resize, in seconds.
pub const MIN_ITEM_DURATION_SECS: f64 = 0.1;

/// Which edge a resize adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    Start,
    End,
}

/// A single-item snapshot taken by copy and placed by paste.
#[derive(Debug, Clone, PartialEq)]
pub struct Clipboard {
    item: Item,
    source_track: TrackId,
}

/// A mutating operation on the timeline.
#[derive(Debug, Clone)]
pub enum EditOp {
    /// Replace an item with two items split at `at_secs`. Requires
    /// `at_secs` strictly inside the item's range.
    Split { item: ItemId, at_secs: f64 },

    /// Drag one edge of an item to a new timeline position. Resizing the
    /// start edge preserves the end boundary.
    Resize {
        item: ItemId,
        edge: ResizeEdge,
        to_secs: f64,
    },

    /// Move an item to a track at a new start time.
    Move {
        item: ItemId,
        to_track: TrackId,
        start_secs: f64,
    },

    /// Clone an item immediately after the original.
    Duplicate { item: ItemId },

    /// Remove an item from whichever track holds it.
    Delete { item: ItemId },

    /// Place a copied item at the given position.
    Paste { clip: Clipboard, at_secs: f64 },
}

impl EditOp {
    /// Short label for history entries.
    pub fn label(&self) -> &'static str {
        match self {
            EditOp::Split { .. } => "split",
            EditOp::Resize { .. } => "resize",
            EditOp::Move { .. } => "move",
            EditOp::Duplicate { .. } => "duplicate",
            EditOp::Delete { .. } => "delete",
            EditOp::Paste { .. } => "paste",
        }
    }
}

/// Snapshot one item by value for a later paste.
pub fn copy(timeline: &Timeline, item_id: ItemId) -> Option<Clipboard> {
    let track = timeline.holding_track(item_id)?;
    let item = track.item(item_id)?.clone();
    Some(Clipboard {
        item,
        source_track: track.id,
    })
}

/// Apply an operation to the timeline. Returns true if the model changed.
pub fn apply(timeline: &mut Timeline, assets: &[Asset], op: &EditOp) -> bool {
    match op {
        EditOp::Split { item, at_secs } => split(timeline, *item, *at_secs),
        EditOp::Resize {
            item,
            edge,
            to_secs,
        } => resize(timeline, *item, *edge, *to_secs),
        EditOp::Move {
            item,
            to_track,
            start_secs,
        } => move_item(timeline, assets, *item, *to_track, *start_secs),
        EditOp::Duplicate { item } => duplicate(timeline, *item),
        EditOp::Delete { item } => delete(timeline, *item),
        EditOp::Paste { clip, at_secs } => paste(timeline, assets, clip, *at_secs),
    }
}

fn split(timeline: &mut Timeline, item_id: ItemId, at_secs: f64) -> bool {
    // NaN slips through the range comparisons below; reject it up front.
    if !at_secs.is_finite() {
        return false;
    }
    let Some(track) = timeline
        .tracks
        .iter_mut()
        .find(|t| t.item(item_id).is_some())
    else {
        return false;
    };
    let Some(idx) = track.items.iter().position(|i| i.id == item_id) else {
        return false;
    };

    let original = track.items[idx].clone();
    if at_secs <= original.start_secs || at_secs >= original.end_secs() {
        return false;
    }

    let mut second = original.clone();
    second.id = Uuid::new_v4();
    second.start_secs = at_secs;
    second.duration_secs = original.end_secs() - at_secs;

    track.items[idx].duration_secs = at_secs - original.start_secs;
    track.items.insert(idx + 1, second);
    true
}

fn resize(timeline: &mut Timeline, item_id: ItemId, edge: ResizeEdge, to_secs: f64) -> bool {
    if !to_secs.is_finite() {
        return false;
    }
    let Some(item) = timeline.find_item_mut(item_id) else {
        return false;
    };
    match edge {
        ResizeEdge::Start => {
            let end = item.end_secs();
            let new_start = to_secs.max(0.0);
            let new_duration = end - new_start;
            if new_duration < MIN_ITEM_DURATION_SECS || new_start == item.start_secs {
                return false;
            }
            item.start_secs = new_start;
            item.duration_secs = new_duration;
            true
        }
        ResizeEdge::End => {
            let new_duration = to_secs - item.start_secs;
            if new_duration < MIN_ITEM_DURATION_SECS || new_duration == item.duration_secs {
                return false;
            }
            item.duration_secs = new_duration;
            true
        }
    }
}

fn move_item(
    timeline: &mut Timeline,
    assets: &[Asset],
    item_id: ItemId,
    to_track: TrackId,
    start_secs: f64,
) -> bool {
    if !start_secs.is_finite() {
        return false;
    }
    let Some((_, item)) = timeline.find_item(item_id) else {
        return false;
    };
    let Some(asset) = assets.iter().find(|a| a.id == item.asset_id) else {
        return false;
    };
    let Some(target_idx) = timeline.tracks.iter().position(|t| t.id == to_track) else {
        return false;
    };
    if !timeline.tracks[target_idx].kind.accepts(&asset.kind) {
        return false;
    }
    let Some(source_idx) = timeline
        .tracks
        .iter()
        .position(|t| t.item(item_id).is_some())
    else {
        return false;
    };
    let Some(mut item) = timeline.tracks[source_idx].remove_item(item_id) else {
        return false;
    };
    item.start_secs = start_secs.max(0.0);
    timeline.tracks[target_idx].items.push(item);
    true
}

fn duplicate(timeline: &mut Timeline, item_id: ItemId) -> bool {
    let Some(track) = timeline
        .tracks
        .iter_mut()
        .find(|t| t.item(item_id).is_some())
    else {
        return false;
    };
    let Some(original) = track.item(item_id).cloned() else {
        return false;
    };
    let mut copy = original.clone();
    copy.id = Uuid::new_v4();
    copy.start_secs = original.end_secs();
    track.items.push(copy);
    true
}

fn delete(timeline: &mut Timeline, item_id: ItemId) -> bool {
    timeline
        .tracks
        .iter_mut()
        .any(|t| t.remove_item(item_id).is_some())
}

fn paste(timeline: &mut Timeline, assets: &[Asset], clip: &Clipboard, at_secs: f64) -> bool {
    if !at_secs.is_finite() {
        return false;
    }
    let Some(asset) = assets.iter().find(|a| a.id == clip.item.asset_id) else {
        return false;
    };
    // Prefer the track the item was copied from; fall back to the first
    // track that accepts the asset kind.
    let target = timeline
        .track(clip.source_track)
        .filter(|t| t.kind.accepts(&asset.kind))
        .map(|t| t.id)
        .or_else(|| {
            timeline
                .tracks
                .iter()
                .find(|t| t.kind.accepts(&asset.kind))
                .map(|t| t.id)
        });
    let Some(target) = target else {
        return false;
    };

    let mut item = clip.item.clone();
    item.id = Uuid::new_v4();
    item.start_secs = at_secs.max(0.0);
    match timeline.track_mut(target) {
        Some(track) => {
            track.items.push(item);
            true
        }
        None => false,
    }
}

/// Applies edit operations against a project with undo history.
#[derive(Debug)]
pub struct Editor {
    history: History,
}

impl Default for Editor {
    fn default() -> Self {
        Self {
            history: History::default(),
        }
    }
}

impl Editor {
    /// Create an editor with a custom history bound.
    pub fn with_history_limit(limit: usize) -> Self {
        Self {
            history: History::new(limit),
        }
    }

    /// Apply an operation. The pre-mutation timeline is recorded for undo
    /// only when the operation changed the model; rejected operations
    /// leave history untouched.
    pub fn apply(&mut self, project: &mut Project, op: &EditOp) -> bool {
        let before = project.timeline.clone();
        let changed = apply(&mut project.timeline, &project.assets, op);
        if changed {
            self.history.record(op.label(), before);
        } else {
            tracing::debug!(op = op.label(), "Edit rejected as no-op");
        }
        changed
    }

    /// Undo the most recent operation. No-op at the oldest snapshot.
    pub fn undo(&mut self, project: &mut Project) -> bool {
        self.history.undo(&mut project.timeline)
    }

    /// Redo the most recently undone operation. No-op at the newest.
    pub fn redo(&mut self, project: &mut Project) -> bool {
        self.history.redo(&mut project.timeline)
    }

    /// The underlying history.
    pub fn history(&self) -> &History {
        &self.history
    }
}
