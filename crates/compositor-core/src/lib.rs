//! Cutline Compositor Core
//!
//! Resolves what the output frame looks like at any playhead position:
//! - **Compose:** gather active visual items into a layer-ordered plan
//! - **Transitions:** fade/dissolve as opacity, wipe as crop, slide as offset
//! - **Raster:** a software backend turning plans into RGBA pixels
//!
//! This crate is pure computation: no I/O, no decoder dependencies.
//! All inputs are data; all outputs are data. The same `FramePlan` drives
//! the live preview and the export filter graph.

pub mod frame;
pub mod geometry;
pub mod raster;
pub mod transition;

pub use frame::{compose, FramePlan, LayerContent, LayerPlan};
pub use geometry::{fit_rect, Rect, Size};
pub use raster::{render, NoMedia, PixelSource, Pixmap};
pub use transition::{effect_at, TransitionEffect};
