//! Headless playback: drive the session for a while and report stats.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use cutline_common::config::AppConfig;
use cutline_common::time::{format_timecode, TickRateController};
use cutline_playback_engine::PlaybackSession;
use cutline_project_model::LoadedProject;

pub async fn run(path: PathBuf, duration_secs: f64, from_secs: Option<f64>) -> anyhow::Result<()> {
    let loaded = LoadedProject::load(&path)
        .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    let config = AppConfig::load();
    let mut session = PlaybackSession::headless(config.playback.clone());
    let mut pacing = TickRateController::new(config.playback.tick_rate_hz);

    if let Some(from) = from_secs {
        session.seek(from);
    }

    println!(
        "Previewing '{}' for {:.1}s at {} Hz (timeline {})",
        loaded.project.title,
        duration_secs,
        config.playback.tick_rate_hz,
        format_timecode(loaded.project.timeline.total_duration()),
    );

    session.play();
    let started = Instant::now();
    let mut next_report_secs = 1u64;
    while started.elapsed().as_secs_f64() < duration_secs {
        if pacing.should_tick(started.elapsed().as_nanos() as u64) {
            let plan = session.tick(&loaded.project.timeline, &loaded.project.assets);
            if started.elapsed().as_secs() >= next_report_secs {
                let stats = session.stats();
                println!(
                    "  {}  layers {}  audio {}  video {}  max drift {:.1}ms",
                    format_timecode(plan.playhead_secs),
                    plan.layers.len(),
                    stats.active_audio,
                    stats.active_video,
                    stats.max_abs_drift_ms,
                );
                next_report_secs += 1;
            }
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    session.stop();

    let stats = session.stats();
    println!();
    println!(
        "Preview stopped at {}",
        format_timecode(session.playhead_secs())
    );
    println!("  Ticks: {}", stats.ticks);
    println!("  Audio reseeks: {}", stats.audio_reseeks);
    println!("  Video reseeks: {}", stats.video_reseeks);
    println!("  Max drift: {:.1}ms", stats.max_abs_drift_ms);

    Ok(())
}
