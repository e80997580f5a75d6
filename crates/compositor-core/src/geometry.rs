//! Output-space geometry: sizes, rectangles, and aspect-fit placement.

use serde::{Deserialize, Serialize};

/// A pixel dimension pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. Zero-height sizes report zero.
    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }
}

/// An axis-aligned rectangle in output pixel space. Coordinates stay
/// fractional until rasterization quantizes them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// Largest centered rectangle with the source's aspect ratio that fits
/// inside the canvas. Mismatched ratios leave symmetric bars on one axis.
pub fn fit_rect(source: Size, canvas: Size) -> Rect {
    if source.width == 0 || source.height == 0 || canvas.width == 0 || canvas.height == 0 {
        return Rect::new(0.0, 0.0, 0.0, 0.0);
    }
    let scale = (canvas.width as f64 / source.width as f64)
        .min(canvas.height as f64 / source.height as f64);
    let width = source.width as f64 * scale;
    let height = source.height as f64 * scale;
    Rect::new(
        (canvas.width as f64 - width) / 2.0,
        (canvas.height as f64 - height) / 2.0,
        width,
        height,
    )
}
