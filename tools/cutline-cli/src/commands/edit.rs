//! Apply one edit operation to a project's timeline and save it.

use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};
use cutline_project_model::{EditOp, Editor, LoadedProject, ResizeEdge, Timeline};
use uuid::Uuid;

/// One timeline mutation, addressed by item id (see `cutline info`).
#[derive(Subcommand)]
pub enum EditAction {
    /// Split an item in two at a timeline position
    Split {
        /// Item id
        #[arg(long)]
        item: Uuid,

        /// Split position in timeline seconds
        #[arg(long)]
        at: f64,
    },

    /// Drag one edge of an item to a new timeline position
    Resize {
        /// Item id
        #[arg(long)]
        item: Uuid,

        /// Which edge to drag
        #[arg(long, value_enum)]
        edge: EdgeArg,

        /// New edge position in timeline seconds
        #[arg(long)]
        to: f64,
    },

    /// Move an item to a new start time, optionally onto another track
    Move {
        /// Item id
        #[arg(long)]
        item: Uuid,

        /// New start in timeline seconds
        #[arg(long)]
        start: f64,

        /// Destination track id (defaults to the item's current track)
        #[arg(long)]
        track: Option<Uuid>,
    },

    /// Duplicate an item onto the same track
    Duplicate {
        /// Item id
        #[arg(long)]
        item: Uuid,
    },

    /// Delete an item
    Delete {
        /// Item id
        #[arg(long)]
        item: Uuid,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EdgeArg {
    Start,
    End,
}

pub fn run(path: PathBuf, action: EditAction) -> anyhow::Result<()> {
    let mut loaded = LoadedProject::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    let op = to_op(&loaded.project.timeline, action)?;
    let mut editor = Editor::default();

    if editor.apply(&mut loaded.project, &op) {
        loaded
            .save()
            .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))?;
        println!(
            "Applied {}; saved {}",
            op.label(),
            loaded.root.join("project.json").display()
        );
    } else {
        println!("Rejected {}: the timeline is unchanged", op.label());
    }

    Ok(())
}

fn to_op(timeline: &Timeline, action: EditAction) -> anyhow::Result<EditOp> {
    Ok(match action {
        EditAction::Split { item, at } => EditOp::Split { item, at_secs: at },
        EditAction::Resize { item, edge, to } => EditOp::Resize {
            item,
            edge: match edge {
                EdgeArg::Start => ResizeEdge::Start,
                EdgeArg::End => ResizeEdge::End,
            },
            to_secs: to,
        },
        EditAction::Move { item, start, track } => {
            let to_track = match track {
                Some(id) => id,
                None => {
                    timeline
                        .holding_track(item)
                        .ok_or_else(|| anyhow::anyhow!("No item {item} in the timeline"))?
                        .id
                }
            };
            EditOp::Move {
                item,
                to_track,
                start_secs: start,
            }
        }
        EditAction::Duplicate { item } => EditOp::Duplicate { item },
        EditAction::Delete { item } => EditOp::Delete { item },
    })
}
