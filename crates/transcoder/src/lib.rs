//! Lightweight Transcoder: produces the cropped, downscaled, low-framerate,
//! audio-stripped video the Funnel Analyzer actually streams through (§4.2).
//!
//! Invokes an external `ffmpeg` binary via subprocess, following the same
//! spawn/stream-stderr/parse-progress idiom used for scene detection and
//! keyframe extraction elsewhere in this workspace.
use slide_extract_common::{ProcessingError, ProgressReporter, Result, Roi};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use tracing::{info, warn};

/// Input to a lightweight transcode.
#[derive(Debug, Clone)]
pub struct TranscodeRequest<'a> {
    pub source_video_path: &'a Path,
    pub output_path: &'a Path,
    pub roi: Roi,
    pub target_width: u32,
    pub target_fps: f64,
    pub source_duration: f64,
}

/// Produces the lightweight video described by `req`, reporting progress at
/// most once per second. Tries the hardware H.264 encoder first; on any
/// nonzero exit it retries once with software encoding (§4.2).
///
/// # Errors
/// Returns [`ProcessingError::ToolMissing`] if `ffmpeg` cannot be found,
/// or a transient/fatal error if both the hardware and software attempts
/// fail.
pub fn transcode_lightweight(
    req: &TranscodeRequest<'_>,
    progress: &mut dyn ProgressReporter,
) -> Result<PathBuf> {
    ensure_ffmpeg_available()?;

    let roi = req.roi.aligned_even();
    let filter = filter_graph(&roi, req.target_width, req.target_fps);

    info!(?roi, req.target_width, req.target_fps, "starting lightweight transcode");

    match run_encode(req, &filter, EncodePath::Hardware, progress) {
        Ok(path) => Ok(path),
        Err(e) => {
            warn!(error = %e, "hardware transcode failed, retrying with software encoder");
            run_encode(req, &filter, EncodePath::Software, progress)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncodePath {
    Hardware,
    Software,
}

fn filter_graph(roi: &Roi, target_width: u32, target_fps: f64) -> String {
    format!(
        "crop={}:{}:{}:{},scale={}:-2,fps={}",
        roi.w, roi.h, roi.x, roi.y, target_width, target_fps
    )
}

fn run_encode(
    req: &TranscodeRequest<'_>,
    filter: &str,
    path: EncodePath,
    progress: &mut dyn ProgressReporter,
) -> Result<PathBuf> {
    if let Some(parent) = req.output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // A clean output path each attempt: the software retry must not see the
    // hardware attempt's partial output (§5 ordering guarantees).
    let _ = std::fs::remove_file(req.output_path);

    let (encoder, preset, quality_flag) = match path {
        EncodePath::Hardware => ("h264_videotoolbox", "fastest", "-q:v"),
        EncodePath::Software => ("libx264", "ultrafast", "-crf"),
    };

    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-i"])
        .arg(req.source_video_path)
        .args(["-vf", filter])
        .args(["-an"])
        .args(["-c:v", encoder])
        .args(["-preset", preset])
        .args([quality_flag, "28"])
        .args(["-pix_fmt", "yuv420p"])
        .arg(req.output_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .map_err(|e| ProcessingError::FFmpegError(format!("failed to spawn ffmpeg: {e}")))?;

    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ProcessingError::Other("ffmpeg stderr not captured".to_string()))?;

    stream_progress(stderr, req.source_duration, progress);

    let status = child
        .wait()
        .map_err(|e| ProcessingError::FFmpegError(format!("failed to wait on ffmpeg: {e}")))?;

    if !status.success() {
        return Err(ProcessingError::FFmpegError(format!(
            "ffmpeg ({path:?}) exited with {status}"
        )));
    }

    Ok(req.output_path.to_path_buf())
}

/// Reads ffmpeg's stderr, parsing `time=HH:MM:SS.SS` progress tokens and
/// invoking `progress` at most once per second (§4.2).
fn stream_progress(stderr: impl std::io::Read, total_duration: f64, progress: &mut dyn ProgressReporter) {
    let reader = BufReader::new(stderr);
    let mut last_report = Instant::now() - std::time::Duration::from_secs(2);

    for line in reader.lines().map_while(std::result::Result::ok) {
        if let Some(seconds) = parse_time_token(&line) {
            if last_report.elapsed().as_secs_f64() >= 1.0 {
                let fraction = if total_duration > 0.0 {
                    (seconds / total_duration).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let percent = (fraction * 100.0).round() as i32;
                progress.report(percent, "transcoding lightweight preview");
                last_report = Instant::now();
            }
        }
    }
}

/// Parses a `time=HH:MM:SS.SS` token out of an ffmpeg stderr progress line.
#[must_use]
pub fn parse_time_token(line: &str) -> Option<f64> {
    let idx = line.find("time=")?;
    let rest = &line[idx + "time=".len()..];
    let token: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ':' || *c == '.')
        .collect();
    let mut parts = token.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn ensure_ffmpeg_available() -> Result<()> {
    let found = Command::new("ffmpeg")
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);

    if found {
        Ok(())
    } else {
        Err(ProcessingError::ToolMissing("ffmpeg".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_graph_composes_crop_scale_fps() {
        let roi = Roi { x: 10, y: 20, w: 800, h: 600 };
        let graph = filter_graph(&roi, 640, 5.0);
        assert_eq!(graph, "crop=800:600:10:20,scale=640:-2,fps=5");
    }

    #[test]
    fn test_parse_time_token() {
        let line = "frame=  120 fps= 30 q=28.0 size=    512kB time=00:00:05.20 bitrate= 807.5kbits/s";
        assert_eq!(parse_time_token(line), Some(5.2));
    }

    #[test]
    fn test_parse_time_token_absent() {
        assert_eq!(parse_time_token("no progress token here"), None);
    }

    #[test]
    fn test_parse_time_token_hours_minutes() {
        let line = "time=01:02:03.00";
        assert_eq!(parse_time_token(line), Some(3600.0 + 120.0 + 3.0));
    }
}
