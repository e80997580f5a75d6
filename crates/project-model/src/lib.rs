//! Cutline Project Model
//!
//! Defines the core data contracts for Cutline projects:
//! - **Assets:** Imported media (video, image, audio, text) with locators
//! - **Timeline:** Tracks and timed items with transitions and filters
//! - **Edits:** Split, resize, move, duplicate, copy/paste, and delete,
//!   with a bounded snapshot undo history
//! - **Project:** Top-level document, persistence, and asset validation
//!
//! All timeline positions are in seconds. Everything here is plain data
//! plus pure transformations; playback and rendering live elsewhere.

pub mod asset;
pub mod edit;
pub mod history;
pub mod project;
pub mod timeline;

pub use asset::*;
pub use edit::{apply, copy, Clipboard, EditOp, Editor, ResizeEdge, MIN_ITEM_DURATION_SECS};
pub use history::*;
pub use project::*;
pub use timeline::*;
