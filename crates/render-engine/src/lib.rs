//! Cutline Render Engine
//!
//! Offline export pipeline that lowers the project timeline into a
//! single ffmpeg filter graph and drives the encode to completion.
//!
//! # Pipeline Architecture
//!
//! ```text
//! project.json ──► build_graph ──► -filter_complex
//!                                        │
//! clip.mp4 ──► trim ► scale ► fade ──► overlay ──┐
//! logo.png ──► loop ► trim ► slide ──► overlay ──┼──► [vout]
//! title     ─────────────────────────► drawtext ─┘       │
//! music.wav ─► trim ► volume ► adelay ──► amix ──► [aout]│
//!                                                    │   │
//!                                                    ▼   ▼
//!                                            Encode (H.264/VP9/GIF)
//!                                                      │
//!                                                      ▼
//!                                                  output.mp4
//! ```

pub mod export;
pub mod graph;

pub use export::*;
pub use graph::{build_graph, ExportGraph, GraphInput, EMPTY_TIMELINE_DURATION_SECS};
