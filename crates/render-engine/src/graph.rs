//! Export graph builder: lowers the project model into one ffmpeg
//! filter graph.
//!
//! The graph is a pure function of the model and the export settings;
//! wall-clock never enters. Every visual item becomes a labeled filter
//! chain overlaid in ascending layer order, every audio item a trimmed,
//! gain-curved, delayed chain feeding one mix. Time-varying values are
//! expressed as piecewise-linear expressions in `t`, chosen so the
//! encoded output matches what the preview engines produce at any
//! instant.

use std::path::PathBuf;

use cutline_common::{CutlineError, CutlineResult};
use cutline_project_model::{
    AssetKind, Item, LoadedProject, TextAlignment, TextStyle, Track, Transition, TransitionKind,
};

use crate::export::ExportSettings;

/// Duration assigned to an export of a timeline with no items.
pub const EMPTY_TIMELINE_DURATION_SECS: f64 = 10.0;

/// One media input of the encoder invocation, in argument order.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphInput {
    /// Resolved filesystem path or URI.
    pub path: PathBuf,

    /// Still images loop so one frame covers the item's duration.
    pub loop_image: bool,
}

/// A deterministic encoder graph: ordered inputs plus one filter graph
/// ending in the `[vout]` pad, with `[aout]` alongside for formats that
/// carry audio.
#[derive(Debug, Clone)]
pub struct ExportGraph {
    pub inputs: Vec<GraphInput>,
    pub filter_complex: String,
    pub duration_secs: f64,
}

impl ExportGraph {
    pub const VIDEO_OUT: &'static str = "[vout]";
    pub const AUDIO_OUT: &'static str = "[aout]";
}

/// Lower the loaded project into an encoder graph.
///
/// Items are gathered track by track and visual items stably sorted by
/// layer, so equal layers keep track order exactly like the preview
/// compositor.
pub fn build_graph(
    loaded: &LoadedProject,
    settings: &ExportSettings,
) -> CutlineResult<ExportGraph> {
    let project = &loaded.project;
    let duration_secs = if project.timeline.item_count() == 0 {
        EMPTY_TIMELINE_DURATION_SECS
    } else {
        project.timeline.total_duration()
    };

    let mut visual: Vec<(&Track, &Item)> = Vec::new();
    let mut audio: Vec<(&Track, &Item)> = Vec::new();
    for track in &project.timeline.tracks {
        for item in &track.items {
            if track.kind.is_visual() {
                visual.push((track, item));
            } else {
                audio.push((track, item));
            }
        }
    }
    visual.sort_by_key(|(_, item)| item.layer);

    let mut inputs: Vec<GraphInput> = Vec::new();
    let mut chains: Vec<String> = Vec::new();

    // The base canvas and the silence bed are synthesized in-graph, so
    // an export needs no placeholder media files.
    chains.push(format!(
        "color=c=black:size={}x{}:rate={}:duration={:.6}[base]",
        settings.width, settings.height, settings.fps, duration_secs
    ));

    let mut composite = "[base]".to_string();
    for (n, (_, item)) in visual.iter().enumerate() {
        let asset = project.asset(item.asset_id).ok_or_else(|| {
            CutlineError::export(format!("Item {} references a missing asset", item.id))
        })?;

        match &asset.kind {
            AssetKind::Video | AssetKind::Image => {
                let input_index = inputs.len();
                inputs.push(GraphInput {
                    path: loaded.resolve_locator(&asset.locator),
                    loop_image: matches!(asset.kind, AssetKind::Image),
                });
                chains.push(media_chain(item, input_index, n, settings));
                chains.push(overlay_chain(item, &composite, n));
                composite = format!("[ov{n}]");
            }
            AssetKind::Text { content, style } => {
                chains.push(drawtext_chain(item, content, style, &composite, n, settings));
                composite = format!("[ov{n}]");
            }
            AssetKind::Audio => {
                tracing::warn!(item = %item.id, "Audio asset on a visual track skipped");
            }
        }
    }
    chains.push(format!("{composite}format=yuv420p[vout]"));

    // Silent formats take no audio inputs and no [aout] pad; a labeled
    // pad nothing consumes fails graph configuration.
    let mut audio_count = 0usize;
    if settings.format.has_audio() {
        let mut audio_labels = String::new();
        for (track, item) in &audio {
            let asset = project.asset(item.asset_id).ok_or_else(|| {
                CutlineError::export(format!("Item {} references a missing asset", item.id))
            })?;

            let input_index = inputs.len();
            inputs.push(GraphInput {
                path: loaded.resolve_locator(&asset.locator),
                loop_image: false,
            });
            chains.push(audio_chain(item, track, input_index, audio_count, settings));
            audio_labels.push_str(&format!("[a{audio_count}]"));
            audio_count += 1;
        }

        if audio_count == 0 {
            chains.push(format!(
                "anullsrc=channel_layout=stereo:sample_rate=48000,atrim=duration={duration_secs:.6}[aout]"
            ));
        } else {
            chains.push(format!(
                "anullsrc=channel_layout=stereo:sample_rate=48000,atrim=duration={duration_secs:.6}[abed]"
            ));
            chains.push(format!(
                "[abed]{audio_labels}amix=inputs={}:duration=first:normalize=0[aout]",
                audio_count + 1
            ));
        }
    } else if !audio.is_empty() {
        tracing::debug!(
            audio_items = audio.len(),
            format = ?settings.format,
            "Output format carries no audio; audio items skipped"
        );
    }

    let filter_complex = chains.join(";");
    tracing::info!(
        inputs = inputs.len(),
        visual_items = visual.len(),
        audio_items = audio_count,
        duration_secs,
        filter_len = filter_complex.len(),
        "Export graph built"
    );

    Ok(ExportGraph {
        inputs,
        filter_complex,
        duration_secs,
    })
}

/// Filter chain for one video or image item: trim to the item duration,
/// letterbox into the output frame, then per-item filters and
/// transition effects, and finally the shift onto the timeline.
fn media_chain(item: &Item, input_index: usize, n: usize, settings: &ExportSettings) -> String {
    let mut chain = format!(
        "[{input_index}:v]trim=duration={dur:.6},setpts=PTS-STARTPTS,\
         scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,format=rgba",
        dur = item.duration_secs,
        w = settings.width,
        h = settings.height,
    );

    let filters = item.filters.unwrap_or_default();
    if filters.brightness != 0.0 || filters.contrast != 1.0 || filters.saturation != 1.0 {
        chain.push_str(&format!(
            ",eq=brightness={:.4}:contrast={:.4}:saturation={:.4}",
            filters.brightness, filters.contrast, filters.saturation
        ));
    }
    if filters.blur > 0.0 {
        // Same rounding and radius cap as the preview rasterizer.
        let radius = (filters.blur.round() as u32).min(32);
        if radius > 0 {
            chain.push_str(&format!(",boxblur={radius}:1"));
        }
    }

    let opacity = item.effective_opacity();
    if opacity < 1.0 {
        chain.push_str(&format!(",colorchannelmixer=aa={opacity:.4}"));
    }

    // Fade and dissolve are linear alpha ramps in item-local time.
    if let Some(win) = opacity_window(&item.transition_in) {
        chain.push_str(&format!(",fade=t=in:st=0:d={win:.6}:alpha=1"));
    }
    if let Some(win) = opacity_window(&item.transition_out) {
        let st = (item.duration_secs - win).max(0.0);
        chain.push_str(&format!(",fade=t=out:st={st:.6}:d={win:.6}:alpha=1"));
    }

    // Wipe reveals the left fraction; pixels right of the boundary go
    // transparent.
    if let Some(reveal) = wipe_reveal_expr_local(item) {
        chain.push_str(&format!(
            ",geq=r='r(X,Y)':g='g(X,Y)':b='b(X,Y)':a='alpha(X,Y)*gte(W*({reveal}),X)'"
        ));
    }

    chain.push_str(&format!(
        ",setpts=PTS+{start:.6}/TB[v{n}]",
        start = item.start_secs
    ));
    chain
}

/// Overlay one prepared item stream onto the running composite, active
/// only inside the item's window. Slide becomes an animated x offset.
fn overlay_chain(item: &Item, composite: &str, n: usize) -> String {
    let enable = format!(
        "between(t,{start:.6},{end:.6})",
        start = item.start_secs,
        end = item.end_secs()
    );
    match slide_offset_expr(item) {
        Some(offset) => format!(
            "{composite}[v{n}]overlay=x='W*({offset})':y=0:enable='{enable}':eval=frame[ov{n}]"
        ),
        None => format!("{composite}[v{n}]overlay=enable='{enable}'[ov{n}]"),
    }
}

/// Text items draw straight onto the composite at their layer position.
///
/// Fade and slide lower exactly (alpha and x expressions); wipe has no
/// crop equivalent for drawn text, so it degrades to a visibility gate.
fn drawtext_chain(
    item: &Item,
    content: &str,
    style: &TextStyle,
    composite: &str,
    n: usize,
    settings: &ExportSettings,
) -> String {
    // Type sizes are specified against a 1080p reference canvas.
    let font_size = ((style.font_size * settings.height as f64 / 1080.0).round() as u32).max(1);

    let mut x = match style.alignment {
        TextAlignment::Left => "w*0.05".to_string(),
        TextAlignment::Center => "(w-text_w)/2".to_string(),
        TextAlignment::Right => "w*0.95-text_w".to_string(),
    };
    if let Some(offset) = slide_offset_expr(item) {
        x = format!("{x}+w*({offset})");
    }

    let mut chain = format!(
        "{composite}drawtext=text='{text}':fontsize={font_size}:fontcolor={color}",
        text = escape_drawtext(content),
        color = drawtext_color(&style.color),
    );
    if !style.font_family.is_empty() {
        chain.push_str(&format!(":font='{}'", escape_drawtext(&style.font_family)));
    }
    chain.push_str(&format!(":x='{x}':y=(h-text_h)/2"));

    if let Some(alpha) = text_alpha_expr(item) {
        chain.push_str(&format!(":alpha='{alpha}'"));
    }

    let mut enable = format!(
        "between(t,{start:.6},{end:.6})",
        start = item.start_secs,
        end = item.end_secs()
    );
    if let Some(reveal) = wipe_reveal_expr_global(item) {
        enable = format!("{enable}*gt({reveal},0)");
    }
    chain.push_str(&format!(":enable='{enable}'[ov{n}]"));
    chain
}

/// Filter chain for one audio item: trim, normalize the sample format,
/// apply the gain curve in item-local time, then delay onto the
/// timeline.
fn audio_chain(
    item: &Item,
    track: &Track,
    input_index: usize,
    n: usize,
    settings: &ExportSettings,
) -> String {
    let base_gain = (track.gain * item.effective_gain()).clamp(0.0, 1.0);
    let gain = piecewise_expr(gain_curve_points(
        base_gain,
        item.duration_secs,
        settings.fade_window_secs,
    ));

    let mut chain = format!(
        "[{input_index}:a]atrim=duration={dur:.6},asetpts=PTS-STARTPTS,\
         aformat=sample_rates=48000:channel_layouts=stereo,\
         volume='{gain}':eval=frame",
        dur = item.duration_secs,
    );

    let delay_ms = (item.start_secs * 1000.0).round() as u64;
    if delay_ms > 0 {
        chain.push_str(&format!(",adelay={delay_ms}|{delay_ms}"));
    }
    chain.push_str(&format!("[a{n}]"));
    chain
}

/// Breakpoints of `base_gain * fade_envelope(local)`. The envelope is
/// piecewise linear, so an expression through these points reproduces
/// it exactly.
fn gain_curve_points(base_gain: f64, duration_secs: f64, window_secs: f64) -> Vec<(f64, f64)> {
    let g = base_gain.clamp(0.0, 1.0);
    if window_secs <= 0.0 {
        return vec![(0.0, g), (duration_secs, g)];
    }
    if duration_secs >= 2.0 * window_secs {
        vec![
            (0.0, 0.0),
            (window_secs, g),
            (duration_secs - window_secs, g),
            (duration_secs, 0.0),
        ]
    } else {
        // Short item: the rise meets the fall at the midpoint.
        let mid = duration_secs / 2.0;
        let peak = g * (mid / window_secs).min(1.0);
        vec![(0.0, 0.0), (mid, peak), (duration_secs, 0.0)]
    }
}

/// Nested `if(lt(t,...))` linear interpolation through sorted points.
/// Evaluates to the last value past the final point.
fn piecewise_expr(mut points: Vec<(f64, f64)>) -> String {
    if points.is_empty() {
        return "0".to_string();
    }

    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points.dedup_by(|a, b| (a.0 - b.0).abs() < 1e-6);

    if points.len() == 1 {
        return format!("{:.6}", points[0].1);
    }

    let mut expr = format!("{:.6}", points.last().unwrap().1);
    for idx in (0..points.len() - 1).rev() {
        let (t0, v0) = points[idx];
        let (t1, v1) = points[idx + 1];
        if (t1 - t0).abs() < 1e-9 {
            continue;
        }

        let interp = format!(
            "{v0:.6}+({delta:.6})*(t-{t0:.6})/{dur:.6}",
            delta = v1 - v0,
            dur = (t1 - t0).max(1e-6)
        );
        expr = format!("if(lt(t,{t1:.6}),{interp},{tail})", tail = expr);
    }

    expr
}

fn transition_window(slot: &Option<Transition>, kinds: &[TransitionKind]) -> Option<f64> {
    slot.as_ref()
        .filter(|t| kinds.contains(&t.kind) && t.duration_secs > 0.0)
        .map(|t| t.duration_secs)
}

fn opacity_window(slot: &Option<Transition>) -> Option<f64> {
    transition_window(slot, &[TransitionKind::Fade, TransitionKind::Dissolve])
}

/// Slide offset as a fraction of the output width in global time:
/// enter from the left (-1 to 0), leave to the right (0 to +1).
fn slide_offset_expr(item: &Item) -> Option<String> {
    let slide_in = transition_window(&item.transition_in, &[TransitionKind::Slide]);
    let slide_out = transition_window(&item.transition_out, &[TransitionKind::Slide]);
    let start = item.start_secs;
    let end = item.end_secs();

    match (slide_in, slide_out) {
        (None, None) => None,
        (Some(wi), None) => Some(format!("clip((t-{start:.6})/{wi:.6},0,1)-1")),
        (None, Some(wo)) => Some(format!("1-clip(({end:.6}-t)/{wo:.6},0,1)")),
        (Some(wi), Some(wo)) => Some(format!(
            "(clip((t-{start:.6})/{wi:.6},0,1)-1)+(1-clip(({end:.6}-t)/{wo:.6},0,1))"
        )),
    }
}

/// Wipe reveal fraction in item-local time (`T` inside geq).
fn wipe_reveal_expr_local(item: &Item) -> Option<String> {
    let wipe_in = transition_window(&item.transition_in, &[TransitionKind::Wipe]);
    let wipe_out = transition_window(&item.transition_out, &[TransitionKind::Wipe]);
    let dur = item.duration_secs;

    match (wipe_in, wipe_out) {
        (None, None) => None,
        (Some(wi), None) => Some(format!("clip(T/{wi:.6},0,1)")),
        (None, Some(wo)) => Some(format!("clip(({dur:.6}-T)/{wo:.6},0,1)")),
        (Some(wi), Some(wo)) => Some(format!(
            "min(clip(T/{wi:.6},0,1),clip(({dur:.6}-T)/{wo:.6},0,1))"
        )),
    }
}

/// Wipe reveal fraction in global time (`t` inside enable expressions).
fn wipe_reveal_expr_global(item: &Item) -> Option<String> {
    let wipe_in = transition_window(&item.transition_in, &[TransitionKind::Wipe]);
    let wipe_out = transition_window(&item.transition_out, &[TransitionKind::Wipe]);
    let start = item.start_secs;
    let end = item.end_secs();

    match (wipe_in, wipe_out) {
        (None, None) => None,
        (Some(wi), None) => Some(format!("clip((t-{start:.6})/{wi:.6},0,1)")),
        (None, Some(wo)) => Some(format!("clip(({end:.6}-t)/{wo:.6},0,1)")),
        (Some(wi), Some(wo)) => Some(format!(
            "min(clip((t-{start:.6})/{wi:.6},0,1),clip(({end:.6}-t)/{wo:.6},0,1))"
        )),
    }
}

/// Opacity expression for drawn text: constant item opacity times the
/// fade/dissolve ramps, in global time.
fn text_alpha_expr(item: &Item) -> Option<String> {
    let fade_in = opacity_window(&item.transition_in);
    let fade_out = opacity_window(&item.transition_out);
    let opacity = item.effective_opacity();

    if fade_in.is_none() && fade_out.is_none() && opacity >= 1.0 {
        return None;
    }

    let mut parts = vec![format!("{opacity:.4}")];
    if let Some(wi) = fade_in {
        parts.push(format!(
            "clip((t-{start:.6})/{wi:.6},0,1)",
            start = item.start_secs
        ));
    }
    if let Some(wo) = fade_out {
        parts.push(format!(
            "clip(({end:.6}-t)/{wo:.6},0,1)",
            end = item.end_secs()
        ));
    }
    Some(parts.join("*"))
}

/// Escape text for a single-quoted drawtext value. A quote closes the
/// string, so a literal quote is emitted as close-escape-reopen.
fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\'' => out.push_str("'\\''"),
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\:"),
            '%' => out.push_str("\\%"),
            _ => out.push(ch),
        }
    }
    out
}

/// Map a `#rrggbb`/`#rrggbbaa` style color to ffmpeg syntax, falling
/// back to white for anything unparseable.
fn drawtext_color(color: &str) -> String {
    let hex = color.strip_prefix('#').unwrap_or("");
    if (hex.len() == 6 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("0x{hex}")
    } else {
        "white".to_string()
    }
}
