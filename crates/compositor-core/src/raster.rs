//! Software rasterizer for preview frames.
//!
//! Turns a `FramePlan` into RGBA pixels. Media lookups go through
//! `PixelSource`; a miss draws the loading placeholder instead of waiting,
//! so a slow decoder can never stall a frame. Text renders as a
//! placement-accurate styled block; glyph shaping is left to the export
//! backend.

use cutline_project_model::{AssetId, FilterParams, TextAlignment, TextStyle};

use crate::frame::{FramePlan, LayerContent, LayerPlan};
use crate::geometry::{fit_rect, Rect, Size};

/// Canvas background.
const BACKGROUND: [u8; 4] = [0, 0, 0, 255];

/// Fill for media that has not decoded yet.
const PLACEHOLDER: [u8; 4] = [38, 38, 38, 255];

/// Box blur radius cap; keeps preview latency bounded.
const MAX_BLUR_RADIUS: usize = 32;

/// An RGBA8 pixel buffer, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    /// A transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// A buffer filled with one color.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut pixmap = Self::new(width, height);
        for chunk in pixmap.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
        pixmap
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Raw RGBA bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&color);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

/// Supplies decoded pixels for media-backed layers.
///
/// Implementations must return immediately. `None` means the media is not
/// ready; the layer draws as a placeholder for this frame and the caller
/// tries again on the next one.
pub trait PixelSource {
    /// Decoded image for an asset. Video assets are sampled `source_secs`
    /// into the media.
    fn sample(&self, asset_id: AssetId, source_secs: f64) -> Option<Pixmap>;
}

/// A source with no media. Every media layer renders as a placeholder.
#[derive(Debug, Default)]
pub struct NoMedia;

impl PixelSource for NoMedia {
    fn sample(&self, _asset_id: AssetId, _source_secs: f64) -> Option<Pixmap> {
        None
    }
}

/// Rasterize a frame plan onto a black canvas, layers bottom-up.
pub fn render(plan: &FramePlan, canvas: Size, media: &dyn PixelSource) -> Pixmap {
    let mut out = Pixmap::solid(canvas.width, canvas.height, BACKGROUND);
    for layer in &plan.layers {
        if layer.opacity <= 0.0 || layer.reveal <= 0.0 {
            continue;
        }
        match &layer.content {
            LayerContent::Video { source_secs, .. } => {
                draw_media(&mut out, media, layer, *source_secs);
            }
            LayerContent::Image { .. } => draw_media(&mut out, media, layer, 0.0),
            LayerContent::Text { content, style } => {
                draw_text_block(&mut out, content, style, layer);
            }
        }
    }
    out
}

fn draw_media(out: &mut Pixmap, media: &dyn PixelSource, layer: &LayerPlan, source_secs: f64) {
    let canvas = out.size();
    match media.sample(layer.asset_id, source_secs) {
        Some(mut image) => {
            if !layer.filters.is_identity() {
                apply_filters(&mut image, &layer.filters);
            }
            let dest = fit_rect(image.size(), canvas)
                .translated(layer.offset_x * canvas.width as f64, 0.0);
            blit(out, &image, dest, layer.opacity, layer.reveal);
        }
        None => {
            let dest = Rect::new(0.0, 0.0, canvas.width as f64, canvas.height as f64)
                .translated(layer.offset_x * canvas.width as f64, 0.0);
            fill_rect(out, dest, PLACEHOLDER, layer.opacity, layer.reveal);
        }
    }
}

/// Scale `image` into `dest` with nearest-neighbor sampling and blend it
/// over the canvas. `reveal` limits drawing to the leftmost fraction.
fn blit(out: &mut Pixmap, image: &Pixmap, dest: Rect, opacity: f64, reveal: f64) {
    if dest.width <= 0.0 || dest.height <= 0.0 || image.width == 0 || image.height == 0 {
        return;
    }
    let visible_right = dest.x + dest.width * reveal.clamp(0.0, 1.0);
    let x0 = dest.x.round().max(0.0) as u32;
    let x1 = (visible_right.round().min(out.width as f64)).max(0.0) as u32;
    let y0 = dest.y.round().max(0.0) as u32;
    let y1 = (dest.bottom().round().min(out.height as f64)).max(0.0) as u32;

    for y in y0..y1 {
        let sy = (((y as f64 + 0.5) - dest.y) / dest.height * image.height as f64) as u32;
        let sy = sy.min(image.height - 1);
        for x in x0..x1 {
            let sx = (((x as f64 + 0.5) - dest.x) / dest.width * image.width as f64) as u32;
            let sx = sx.min(image.width - 1);
            let src = image.pixel(sx, sy);
            let alpha = src[3] as f64 / 255.0 * opacity;
            blend_pixel(out, x, y, src, alpha);
        }
    }
}

/// Fill `dest` with a constant color blended at the layer opacity.
fn fill_rect(out: &mut Pixmap, dest: Rect, color: [u8; 4], opacity: f64, reveal: f64) {
    if dest.width <= 0.0 || dest.height <= 0.0 {
        return;
    }
    let visible_right = dest.x + dest.width * reveal.clamp(0.0, 1.0);
    let x0 = dest.x.round().max(0.0) as u32;
    let x1 = (visible_right.round().min(out.width as f64)).max(0.0) as u32;
    let y0 = dest.y.round().max(0.0) as u32;
    let y1 = (dest.bottom().round().min(out.height as f64)).max(0.0) as u32;

    let alpha = color[3] as f64 / 255.0 * opacity;
    for y in y0..y1 {
        for x in x0..x1 {
            blend_pixel(out, x, y, color, alpha);
        }
    }
}

fn blend_pixel(out: &mut Pixmap, x: u32, y: u32, src: [u8; 4], alpha: f64) {
    if alpha <= 0.0 {
        return;
    }
    let a = alpha.min(1.0);
    let dst = out.pixel(x, y);
    let mix = |s: u8, d: u8| (s as f64 * a + d as f64 * (1.0 - a)).round() as u8;
    out.set_pixel(
        x,
        y,
        [
            mix(src[0], dst[0]),
            mix(src[1], dst[1]),
            mix(src[2], dst[2]),
            255,
        ],
    );
}

/// Stand-in for shaped text: a block sized from the font metrics and
/// placed by the style's alignment, vertically centered.
fn draw_text_block(out: &mut Pixmap, content: &str, style: &TextStyle, layer: &LayerPlan) {
    let canvas = out.size();
    // Type sizes are specified against a 1080p reference canvas.
    let scale = canvas.height as f64 / 1080.0;
    let line_height = (style.font_size * 1.5 * scale).max(1.0);
    let char_width = style.font_size * 0.6 * scale;
    let width = (content.chars().count() as f64 * char_width)
        .min(canvas.width as f64 * 0.9)
        .max(1.0);
    let margin = canvas.width as f64 * 0.05;

    let x = match style.alignment {
        TextAlignment::Left => margin,
        TextAlignment::Center => (canvas.width as f64 - width) / 2.0,
        TextAlignment::Right => canvas.width as f64 - margin - width,
    };
    let y = (canvas.height as f64 - line_height) / 2.0;
    let color = parse_color(&style.color).unwrap_or([255, 255, 255, 255]);

    let dest =
        Rect::new(x, y, width, line_height).translated(layer.offset_x * canvas.width as f64, 0.0);
    fill_rect(out, dest, color, layer.opacity, layer.reveal);
}

/// Parse "#rrggbb" or "#rrggbbaa".
pub fn parse_color(hex: &str) -> Option<[u8; 4]> {
    let hex = hex.strip_prefix('#')?;
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some([channel(0)?, channel(2)?, channel(4)?, 255]),
        8 => Some([channel(0)?, channel(2)?, channel(4)?, channel(6)?]),
        _ => None,
    }
}

/// Channel-wise adjustments, then blur. The arithmetic mirrors the export
/// filter chain so preview and export agree.
fn apply_filters(image: &mut Pixmap, filters: &FilterParams) {
    if filters.brightness != 0.0 || filters.contrast != 1.0 || filters.saturation != 1.0 {
        let brightness = filters.brightness * 255.0;
        for chunk in image.data.chunks_exact_mut(4) {
            let mut rgb = [chunk[0] as f64, chunk[1] as f64, chunk[2] as f64];
            for v in &mut rgb {
                *v = (*v - 128.0) * filters.contrast + 128.0 + brightness;
            }
            // Rec. 709 luma; saturation mixes toward it.
            let luma = 0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2];
            for v in &mut rgb {
                *v = luma + (*v - luma) * filters.saturation;
            }
            chunk[0] = rgb[0].clamp(0.0, 255.0) as u8;
            chunk[1] = rgb[1].clamp(0.0, 255.0) as u8;
            chunk[2] = rgb[2].clamp(0.0, 255.0) as u8;
        }
    }
    if filters.blur > 0.0 {
        box_blur(image, (filters.blur.round() as usize).min(MAX_BLUR_RADIUS));
    }
}

fn box_blur(image: &mut Pixmap, radius: usize) {
    if radius == 0 || image.width == 0 || image.height == 0 {
        return;
    }
    let (w, h) = (image.width as usize, image.height as usize);
    let mut temp = image.data.clone();

    // Horizontal pass into temp.
    for y in 0..h {
        for x in 0..w {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(w - 1);
            let mut acc = [0.0f64; 4];
            for sx in lo..=hi {
                let i = (y * w + sx) * 4;
                for (c, v) in acc.iter_mut().enumerate() {
                    *v += image.data[i + c] as f64;
                }
            }
            let n = (hi - lo + 1) as f64;
            let o = (y * w + x) * 4;
            for (c, v) in acc.iter().enumerate() {
                temp[o + c] = (v / n).round() as u8;
            }
        }
    }

    // Vertical pass back into the image.
    for y in 0..h {
        for x in 0..w {
            let lo = y.saturating_sub(radius);
            let hi = (y + radius).min(h - 1);
            let mut acc = [0.0f64; 4];
            for sy in lo..=hi {
                let i = (sy * w + x) * 4;
                for (c, v) in acc.iter_mut().enumerate() {
                    *v += temp[i + c] as f64;
                }
            }
            let n = (hi - lo + 1) as f64;
            let o = (y * w + x) * 4;
            for (c, v) in acc.iter().enumerate() {
                image.data[o + c] = (v / n).round() as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::compose;
    use cutline_project_model::{Asset, Item, TextStyle, Timeline, Track, TrackKind};
    use std::collections::HashMap;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    /// Serves a solid color per asset, all at one fixed size.
    struct SolidMedia {
        size: Size,
        colors: HashMap<AssetId, [u8; 4]>,
    }

    impl SolidMedia {
        fn new(size: Size) -> Self {
            Self {
                size,
                colors: HashMap::new(),
            }
        }

        fn with(mut self, asset_id: AssetId, color: [u8; 4]) -> Self {
            self.colors.insert(asset_id, color);
            self
        }
    }

    impl PixelSource for SolidMedia {
        fn sample(&self, asset_id: AssetId, _source_secs: f64) -> Option<Pixmap> {
            self.colors
                .get(&asset_id)
                .map(|c| Pixmap::solid(self.size.width, self.size.height, *c))
        }
    }

    fn single_item_scene(asset: Asset, item: Item) -> (Timeline, Vec<Asset>) {
        let mut track = Track::new("Video 1", TrackKind::Video);
        track.items.push(item);
        (
            Timeline {
                tracks: vec![track],
            },
            vec![asset],
        )
    }

    #[test]
    fn test_empty_plan_renders_background() {
        let frame = render(&FramePlan::default(), Size::new(8, 8), &NoMedia);
        assert_eq!(frame.pixel(4, 4), BACKGROUND);
    }

    #[test]
    fn test_missing_media_draws_placeholder() {
        let asset = Asset::video("v.mp4", 10.0);
        let item = Item::new(asset.id, 0.0, 5.0);
        let (timeline, assets) = single_item_scene(asset, item);

        let plan = compose(&timeline, &assets, 1.0);
        let frame = render(&plan, Size::new(8, 8), &NoMedia);
        assert_eq!(frame.pixel(4, 4), PLACEHOLDER);
    }

    #[test]
    fn test_upper_layer_covers_lower() {
        let red = Asset::video("red.mp4", 10.0);
        let blue = Asset::video("blue.mp4", 10.0);
        let mut track = Track::new("Video 1", TrackKind::Video);
        track.items.push(Item::new(red.id, 0.0, 5.0));
        track.items.push(Item::new(blue.id, 0.0, 5.0).with_layer(1));
        let timeline = Timeline {
            tracks: vec![track],
        };
        let assets = vec![red.clone(), blue.clone()];

        let media = SolidMedia::new(Size::new(16, 16))
            .with(red.id, RED)
            .with(blue.id, BLUE);
        let plan = compose(&timeline, &assets, 1.0);
        let frame = render(&plan, Size::new(16, 16), &media);
        assert_eq!(frame.pixel(8, 8), BLUE);
    }

    #[test]
    fn test_half_opacity_blends_toward_background() {
        let asset = Asset::video("v.mp4", 10.0);
        let item = Item::new(asset.id, 0.0, 5.0).with_opacity(0.5);
        let media = SolidMedia::new(Size::new(16, 16)).with(asset.id, RED);
        let (timeline, assets) = single_item_scene(asset, item);

        let plan = compose(&timeline, &assets, 1.0);
        let frame = render(&plan, Size::new(16, 16), &media);
        let [r, g, b, _] = frame.pixel(8, 8);
        assert!((127..=129).contains(&r), "r = {r}");
        assert_eq!((g, b), (0, 0));
    }

    #[test]
    fn test_letterbox_bars_stay_background() {
        // Square media on a wide canvas leaves pillars on both sides.
        let asset = Asset::image("still.png");
        let item = Item::new(asset.id, 0.0, 5.0);
        let media = SolidMedia::new(Size::new(10, 10)).with(asset.id, RED);
        let (timeline, assets) = single_item_scene(asset, item);

        let plan = compose(&timeline, &assets, 1.0);
        let frame = render(&plan, Size::new(20, 10), &media);
        assert_eq!(frame.pixel(0, 5), BACKGROUND);
        assert_eq!(frame.pixel(19, 5), BACKGROUND);
        assert_eq!(frame.pixel(10, 5), RED);
    }

    #[test]
    fn test_reveal_crops_right_side() {
        let asset = Asset::video("v.mp4", 10.0);
        let item = Item::new(asset.id, 0.0, 5.0);
        let media = SolidMedia::new(Size::new(16, 16)).with(asset.id, RED);
        let (timeline, assets) = single_item_scene(asset, item);

        let mut plan = compose(&timeline, &assets, 1.0);
        plan.layers[0].reveal = 0.5;
        let frame = render(&plan, Size::new(16, 16), &media);
        assert_eq!(frame.pixel(3, 8), RED);
        assert_eq!(frame.pixel(12, 8), BACKGROUND);
    }

    #[test]
    fn test_offset_shifts_content() {
        let asset = Asset::video("v.mp4", 10.0);
        let item = Item::new(asset.id, 0.0, 5.0);
        let media = SolidMedia::new(Size::new(16, 16)).with(asset.id, RED);
        let (timeline, assets) = single_item_scene(asset, item);

        let mut plan = compose(&timeline, &assets, 1.0);
        plan.layers[0].offset_x = -0.5;
        let frame = render(&plan, Size::new(16, 16), &media);
        assert_eq!(frame.pixel(3, 8), RED);
        assert_eq!(frame.pixel(12, 8), BACKGROUND);
    }

    #[test]
    fn test_zero_saturation_is_grayscale() {
        let mut image = Pixmap::solid(4, 4, RED);
        apply_filters(
            &mut image,
            &FilterParams {
                saturation: 0.0,
                ..FilterParams::default()
            },
        );
        let [r, g, b, _] = image.pixel(0, 0);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn test_brightness_shifts_channels() {
        let mut image = Pixmap::solid(4, 4, [100, 100, 100, 255]);
        apply_filters(
            &mut image,
            &FilterParams {
                brightness: 0.2,
                ..FilterParams::default()
            },
        );
        let [r, ..] = image.pixel(0, 0);
        assert_eq!(r, 151);
    }

    #[test]
    fn test_blur_averages_neighbors() {
        let mut image = Pixmap::solid(3, 1, [0, 0, 0, 255]);
        image.set_pixel(1, 0, [255, 255, 255, 255]);
        apply_filters(
            &mut image,
            &FilterParams {
                blur: 1.0,
                ..FilterParams::default()
            },
        );
        let [r, ..] = image.pixel(1, 0);
        assert!(r > 60 && r < 130, "r = {r}");
    }

    #[test]
    fn test_text_block_uses_style_color() {
        let style = TextStyle {
            color: "#00ff00".to_string(),
            ..TextStyle::default()
        };
        let asset = Asset::text("Title", style);
        let mut track = Track::new("Text 1", TrackKind::Text);
        track.items.push(Item::new(asset.id, 0.0, 5.0));
        let timeline = Timeline {
            tracks: vec![track],
        };
        let assets = vec![asset];

        let plan = compose(&timeline, &assets, 1.0);
        let frame = render(&plan, Size::new(64, 64), &NoMedia);
        assert_eq!(frame.pixel(32, 32), [0, 255, 0, 255]);
        assert_eq!(frame.pixel(0, 0), BACKGROUND);
    }

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color("#ffffff"), Some([255, 255, 255, 255]));
        assert_eq!(parse_color("#00ff0080"), Some([0, 255, 0, 128]));
        assert_eq!(parse_color("ffffff"), None);
        assert_eq!(parse_color("#fff"), None);
    }
}
