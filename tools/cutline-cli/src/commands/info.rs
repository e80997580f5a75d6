//! Show project information.

use std::path::PathBuf;

use cutline_common::time::format_timecode;
use cutline_project_model::{AssetKind, LoadedProject};
use cutline_render_engine::probe_media_duration;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let loaded = LoadedProject::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    let p = &loaded.project;

    println!("Project: {}", p.title);
    println!("  ID: {}", p.id);
    println!("  Created: {}", p.created_at);
    println!("  Modified: {}", p.modified_at);
    println!();

    println!("Assets: {}", p.assets.len());
    for asset in &p.assets {
        let name = asset.name.as_deref().unwrap_or("unnamed");
        let locator = if asset.locator.is_empty() {
            "inline"
        } else {
            asset.locator.as_str()
        };

        // Fall back to an ffprobe reading when the document has no
        // recorded duration and the media is local.
        let duration = asset.duration_secs.or_else(|| {
            if !asset.has_media_file() {
                return None;
            }
            let resolved = loaded.resolve_locator(&asset.locator);
            if resolved.exists() {
                probe_media_duration(&resolved)
            } else {
                None
            }
        });

        match duration {
            Some(d) => println!(
                "  {:<5} {} ({}, {:.1}s)",
                kind_label(&asset.kind),
                name,
                locator,
                d
            ),
            None => println!("  {:<5} {} ({})", kind_label(&asset.kind), name, locator),
        }
    }
    println!();

    println!("Timeline:");
    for track in &p.timeline.tracks {
        println!(
            "  {} [{:?}]: {} item(s), gain {:.2}",
            track.name,
            track.kind,
            track.items.len(),
            track.gain
        );
        for item in &track.items {
            println!(
                "    {} {} -> {}  layer {}",
                item.id,
                format_timecode(item.start_secs),
                format_timecode(item.end_secs()),
                item.layer
            );
        }
    }
    println!();
    println!("  Items: {}", p.timeline.item_count());
    println!("  Duration: {}", format_timecode(p.timeline.total_duration()));

    Ok(())
}

fn kind_label(kind: &AssetKind) -> &'static str {
    match kind {
        AssetKind::Video => "video",
        AssetKind::Image => "image",
        AssetKind::Audio => "audio",
        AssetKind::Text { .. } => "text",
    }
}
