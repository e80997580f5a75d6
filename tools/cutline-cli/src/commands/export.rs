//! Export a project to a media file.

use std::io::Write;
use std::path::PathBuf;

use cutline_common::config::AppConfig;
use cutline_render_engine::{export_project, ExportJob, ExportSettings, ProgressCallback};

pub async fn run(
    path: PathBuf,
    output: Option<PathBuf>,
    format: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
) -> anyhow::Result<()> {
    println!("Exporting project at: {}", path.display());

    // Config supplies defaults; flags override.
    let config = AppConfig::load();
    let mut settings = ExportSettings::from_config(&config)?;
    if let Some(format) = format {
        settings.format = format.parse()?;
    }
    if let Some(width) = width {
        settings.width = width;
    }
    if let Some(height) = height {
        settings.height = height;
    }
    if let Some(fps) = fps {
        settings.fps = fps;
    }

    let output_path = output.unwrap_or_else(|| {
        path.join("exports")
            .join(format!("output.{}", settings.format.extension()))
    });

    println!("  Output: {}", output_path.display());
    println!("  Format: {:?}", settings.format);
    println!(
        "  Resolution: {}x{} @ {}fps",
        settings.width, settings.height, settings.fps
    );

    let job = ExportJob {
        project_dir: path,
        output_path,
        settings,
    };

    let progress_cb: ProgressCallback = Box::new(|p| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
        let _ = std::io::stdout().flush();
    });

    match export_project(job, Some(progress_cb)).await {
        Ok(out) => {
            println!("\nExport complete: {}", out.display());
            Ok(())
        }
        Err(e) => {
            println!();
            Err(e.into())
        }
    }
}
