//! Export job management and the ffmpeg render backend.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

use cutline_common::{AppConfig, CutlineError, CutlineResult};
use cutline_project_model::LoadedProject;
use serde::{Deserialize, Serialize};

use crate::graph::{build_graph, ExportGraph};

/// Output container and codec family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    Mp4H264,
    Mp4H265,
    Gif,
    Webm,
}

impl ExportFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4H264 | Self::Mp4H265 => "mp4",
            Self::Gif => "gif",
            Self::Webm => "webm",
        }
    }

    /// Whether the container carries an audio stream.
    pub fn has_audio(&self) -> bool {
        !matches!(self, Self::Gif)
    }
}

impl FromStr for ExportFormat {
    type Err = CutlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4-h264" | "mp4" => Ok(Self::Mp4H264),
            "mp4-h265" | "hevc" => Ok(Self::Mp4H265),
            "gif" => Ok(Self::Gif),
            "webm" => Ok(Self::Webm),
            other => Err(CutlineError::config(format!(
                "Unknown export format '{other}' (expected mp4-h264, mp4-h265, gif, or webm)"
            ))),
        }
    }
}

/// Resolved encoder settings for one export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,

    /// Fade window applied to item audio edges, matching preview playback.
    pub fade_window_secs: f64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Mp4H264,
            width: 1920,
            height: 1080,
            fps: 30,
            video_bitrate_kbps: 8000,
            audio_bitrate_kbps: 192,
            fade_window_secs: 0.05,
        }
    }
}

impl ExportSettings {
    /// Build settings from the application config.
    pub fn from_config(config: &AppConfig) -> CutlineResult<Self> {
        Ok(Self {
            format: config.export.format.parse()?,
            width: config.export.width,
            height: config.export.height,
            fps: config.export.fps,
            video_bitrate_kbps: config.export.video_bitrate_kbps,
            audio_bitrate_kbps: config.export.audio_bitrate_kbps,
            fade_window_secs: config.playback.fade_window_secs(),
        })
    }
}

/// An export job ready to be rendered.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Project root directory.
    pub project_dir: PathBuf,

    /// Output file path.
    pub output_path: PathBuf,

    /// Encoder settings.
    pub settings: ExportSettings,
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone, Serialize)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Finalizing,
    Complete,
    Failed,
}

/// Trait for render backends.
pub trait RenderBackend: Send {
    /// Execute the export job.
    fn render(&mut self, job: &ExportJob, progress: Option<ProgressCallback>) -> CutlineResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Export the project to a media file.
///
/// This is the main entry point for rendering. Failures are terminal:
/// no partial output file is left behind.
pub async fn export_project(
    job: ExportJob,
    progress: Option<ProgressCallback>,
) -> CutlineResult<PathBuf> {
    tracing::info!(
        output = %job.output_path.display(),
        format = ?job.settings.format,
        "Starting export"
    );

    if !job.project_dir.exists() {
        return Err(CutlineError::export("Project directory does not exist"));
    }

    if let Some(parent) = job.output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if let Some(cb) = &progress {
        cb(ExportProgress {
            progress: 0.0,
            frames_rendered: 0,
            total_frames: 0,
            eta_secs: 0.0,
            stage: ExportStage::Preparing,
        });
    }

    let mut backend: Box<dyn RenderBackend> = Box::new(FfmpegBackend::new());
    if !backend.is_available() {
        return Err(CutlineError::unsupported(
            "No supported render backend found (expected ffmpeg in PATH)",
        ));
    }

    tracing::info!(backend = backend.name(), "Using render backend");
    backend.render(&job, progress)?;

    Ok(job.output_path)
}

struct FfmpegBackend;

impl FfmpegBackend {
    fn new() -> Self {
        Self
    }

    fn run_ffmpeg(
        &self,
        job: &ExportJob,
        graph: &ExportGraph,
        args: Vec<String>,
        progress: Option<ProgressCallback>,
    ) -> CutlineResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let total_frames = (graph.duration_secs * job.settings.fps as f64).ceil() as u64;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| CutlineError::export(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            duration_secs = graph.duration_secs,
            total_frames,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CutlineError::export("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CutlineError::export("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full
        // stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();

        let mut latest_progress = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = std::time::Instant::now();
        loop {
            line.clear();
            let bytes = reader.read_line(&mut line).map_err(|e| {
                CutlineError::export(format!("Failed reading ffmpeg progress: {e}"))
            })?;
            if bytes == 0 {
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some((key, value)) = trimmed.split_once('=') {
                latest_progress.update(key, value);
                if key == "progress" {
                    let advanced = latest_progress.out_time_secs > last_progress_secs + 0.001;
                    if advanced {
                        last_progress_secs = latest_progress.out_time_secs;
                        last_progress_wall = std::time::Instant::now();
                    }
                    if let Some(cb) = &progress {
                        cb(progress_report(
                            &latest_progress,
                            total_frames,
                            graph.duration_secs,
                            start.elapsed().as_secs_f64(),
                        ));
                    }
                    if last_progress_wall.elapsed().as_secs() >= 10 {
                        tracing::warn!(
                            out_time_secs = latest_progress.out_time_secs,
                            elapsed_secs = start.elapsed().as_secs_f64(),
                            "No ffmpeg progress advancement for 10s"
                        );
                        last_progress_wall = std::time::Instant::now();
                    }
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| CutlineError::export(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            remove_partial_output(&job.output_path);
            if let Some(cb) = &progress {
                cb(ExportProgress {
                    progress: 0.0,
                    frames_rendered: 0,
                    total_frames,
                    eta_secs: 0.0,
                    stage: ExportStage::Failed,
                });
            }
            return Err(CutlineError::export(format!(
                "ffmpeg export failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        if let Some(cb) = &progress {
            cb(ExportProgress {
                progress: 1.0,
                frames_rendered: total_frames,
                total_frames,
                eta_secs: 0.0,
                stage: ExportStage::Complete,
            });
        }

        Ok(())
    }
}

impl RenderBackend for FfmpegBackend {
    fn render(&mut self, job: &ExportJob, progress: Option<ProgressCallback>) -> CutlineResult<()> {
        let loaded = LoadedProject::load(&job.project_dir)
            .map_err(|e| CutlineError::export(format!("Failed to load project: {e}")))?;

        let problems = loaded.validate_assets();
        if !problems.is_empty() {
            return Err(CutlineError::export(format!(
                "Export inputs unavailable: {}",
                problems.join("; ")
            )));
        }

        let graph = build_graph(&loaded, &job.settings)?;
        let args = assemble_args(job, &graph);
        self.run_ffmpeg(job, &graph, args, progress)
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg")
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Full ffmpeg argument list for one job: inputs in graph order, the
/// filter graph, stream maps, and codec settings.
fn assemble_args(job: &ExportJob, graph: &ExportGraph) -> Vec<String> {
    let settings = &job.settings;
    let mut args: Vec<String> = [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-nostats",
        "-progress",
        "pipe:1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    for input in &graph.inputs {
        if input.loop_image {
            args.push("-loop".to_string());
            args.push("1".to_string());
        }
        args.push("-i".to_string());
        args.push(input.path.display().to_string());
    }

    // GIF needs a palette pass, appended onto the finished composite.
    let mut filter = graph.filter_complex.clone();
    let video_out = if settings.format == ExportFormat::Gif {
        filter.push_str(&format!(
            ";[vout]fps={},split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse[gif]",
            settings.fps
        ));
        "[gif]"
    } else {
        ExportGraph::VIDEO_OUT
    };

    args.push("-filter_complex".to_string());
    args.push(filter);

    args.push("-map".to_string());
    args.push(video_out.to_string());
    if settings.format.has_audio() {
        args.push("-map".to_string());
        args.push(ExportGraph::AUDIO_OUT.to_string());
    }

    // GIF frame rate comes from the fps filter in the palette pass.
    if settings.format != ExportFormat::Gif {
        args.push("-r".to_string());
        args.push(settings.fps.to_string());
    }

    args.push("-t".to_string());
    args.push(format!("{:.6}", graph.duration_secs));

    args.extend(codec_args_for_settings(settings));
    args.push(job.output_path.display().to_string());
    args
}

fn codec_args_for_settings(settings: &ExportSettings) -> Vec<String> {
    let video_bitrate = format!("{}k", settings.video_bitrate_kbps.max(1000));
    let audio_bitrate = format!("{}k", settings.audio_bitrate_kbps.max(64));

    match settings.format {
        ExportFormat::Mp4H264 => vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-profile:v".to_string(),
            "high".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-b:v".to_string(),
            video_bitrate,
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            audio_bitrate,
            "-movflags".to_string(),
            "+faststart".to_string(),
        ],
        ExportFormat::Mp4H265 => vec![
            "-c:v".to_string(),
            "libx265".to_string(),
            "-preset".to_string(),
            "medium".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-b:v".to_string(),
            video_bitrate,
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            audio_bitrate,
            "-movflags".to_string(),
            "+faststart".to_string(),
        ],
        ExportFormat::Gif => Vec::new(),
        ExportFormat::Webm => vec![
            "-c:v".to_string(),
            "libvpx-vp9".to_string(),
            "-b:v".to_string(),
            video_bitrate,
            "-c:a".to_string(),
            "libopus".to_string(),
            "-b:a".to_string(),
            audio_bitrate,
        ],
    }
}

fn remove_partial_output(path: &Path) {
    if !path.exists() {
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "Removed partial export output"),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "Could not remove partial export output")
        }
    }
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Media duration in seconds via ffprobe, if the file has one.
pub fn probe_media_duration(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    let duration = raw.lines().next()?.trim().parse::<f64>().ok()?;
    if duration.is_finite() && duration > 0.0 {
        Some(duration)
    } else {
        None
    }
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            "out_time_ms" => {
                if let Ok(ms) = value.parse::<f64>() {
                    self.out_time_secs = ms / 1_000_000.0;
                }
            }
            "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    total_frames: u64,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> ExportProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let frames_rendered = (progress * total_frames as f64).round() as u64;
    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ExportProgress {
        progress: if state.complete { 1.0 } else { progress },
        frames_rendered,
        total_frames,
        eta_secs,
        stage: if state.complete {
            ExportStage::Finalizing
        } else {
            ExportStage::Rendering
        },
    }
}
