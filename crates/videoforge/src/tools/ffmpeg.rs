//! Video muxing and media probing with the ffmpeg command-line tools.
//!
//! Each timeline window is rendered to its own intermediate file: the clip
//! is looped with `-stream_loop -1` and cut with `-frames:v`, so long clips
//! are trimmed from their start and short clips repeat at normal speed.
//! Window boundaries are snapped to the output frame grid, so the rendered
//! windows add up to the narration's frame count without drift. The
//! rendered windows are concatenated and muxed with the narration, and the
//! output is cut to the narration's exact length.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;

use super::{MuxRequest, MuxedVideo, ToolError, VideoMuxer, MAX_ERROR_BODY_LENGTH};
use crate::config::MuxingConfig;
use crate::sanitize::{redact_path, truncate};

const TOOL: &str = "ffmpeg";

pub struct FfmpegMuxer {
    ffmpeg: PathBuf,
    width: u32,
    height: u32,
    fps: u32,
}

impl FfmpegMuxer {
    pub fn new(config: &MuxingConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg.clone(),
            width: config.width,
            height: config.height,
            fps: config.fps,
        }
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Frames between `start` and `end` on the output frame grid.
    fn window_frames(&self, start: f64, end: f64) -> u64 {
        let fps = f64::from(self.fps);
        let frame = |t: f64| (t.max(0.0) * fps).round() as u64;
        frame(end).saturating_sub(frame(start))
    }

    fn window_args(&self, clip: &Path, frames: u64, output: &Path) -> Vec<String> {
        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps}",
            w = self.width,
            h = self.height,
            fps = self.fps
        );
        vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-stream_loop".to_string(),
            "-1".to_string(),
            "-i".to_string(),
            clip.to_string_lossy().into_owned(),
            "-frames:v".to_string(),
            frames.to_string(),
            "-vf".to_string(),
            filter,
            "-an".to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }

    fn mux_args(&self, list: &Path, audio: &Path, total: f64, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            list.to_string_lossy().into_owned(),
            "-i".to_string(),
            audio.to_string_lossy().into_owned(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-map".to_string(),
            "1:a:0".to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-t".to_string(),
            format_seconds(total),
            output.to_string_lossy().into_owned(),
        ]
    }
}

/// Seconds with millisecond precision, as ffmpeg expects for `-t`.
fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds.max(0.0))
}

/// Contents of a concat demuxer list file.
fn concat_list(parts: &[PathBuf]) -> String {
    parts
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

async fn run(program: &Path, args: &[String]) -> Result<Output, ToolError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| ToolError::process(TOOL, format!("could not start {}: {}", redact_path(program), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::debug!("{} stderr: {}", redact_path(program), truncate(&stderr, MAX_ERROR_BODY_LENGTH));
        return Err(ToolError::process(
            TOOL,
            format!("{} exited with {}", redact_path(program), output.status),
        ));
    }
    Ok(output)
}

/// Reads a media file's duration in seconds with ffprobe.
pub async fn probe_duration(ffprobe: &Path, media: &Path) -> Result<f64, ToolError> {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        media.to_string_lossy().into_owned(),
    ];
    let output = run(ffprobe, &args).await?;
    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_output(stdout: &str) -> Result<f64, ToolError> {
    let duration: f64 = stdout
        .trim()
        .parse()
        .map_err(|_| ToolError::decode("ffprobe", format!("unexpected duration '{}'", stdout.trim())))?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ToolError::decode("ffprobe", format!("non-positive duration {}", duration)));
    }
    Ok(duration)
}

#[async_trait]
impl VideoMuxer for FfmpegMuxer {
    async fn assemble(&self, request: &MuxRequest) -> Result<MuxedVideo, ToolError> {
        let work_dir = request.output.with_extension("parts");
        tokio::fs::create_dir_all(&work_dir)
            .await
            .map_err(|e| ToolError::io(&work_dir, e))?;

        let mut parts = Vec::with_capacity(request.windows.len());
        for (i, window) in request.windows.iter().enumerate() {
            let frames = self.window_frames(window.start_time, window.end_time);
            if frames == 0 {
                continue;
            }
            let part = work_dir.join(format!("part-{:03}.mp4", i + 1));
            log::debug!(
                "Rendering window {} ({} frames) from {}",
                i + 1,
                frames,
                redact_path(&window.path)
            );
            run(&self.ffmpeg, &self.window_args(&window.path, frames, &part)).await?;
            parts.push(part);
        }
        if parts.is_empty() {
            return Err(ToolError::process(TOOL, "timeline has no non-empty windows"));
        }

        let list = work_dir.join("parts.txt");
        tokio::fs::write(&list, concat_list(&parts))
            .await
            .map_err(|e| ToolError::io(&list, e))?;

        run(
            &self.ffmpeg,
            &self.mux_args(&list, &request.audio, request.total_duration, &request.output),
        )
        .await?;

        let metadata = tokio::fs::metadata(&request.output)
            .await
            .map_err(|e| ToolError::io(&request.output, e))?;
        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            log::warn!("Could not remove {}: {}", redact_path(&work_dir), e);
        }

        Ok(MuxedVideo {
            path: request.output.clone(),
            file_size: metadata.len(),
            resolution: self.resolution(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn muxer() -> FfmpegMuxer {
        FfmpegMuxer {
            ffmpeg: PathBuf::from("ffmpeg"),
            width: 1280,
            height: 720,
            fps: 30,
        }
    }

    #[test]
    fn test_window_args_loop_and_trim() {
        let args = muxer().window_args(Path::new("/clips/a.mp4"), 218, Path::new("/out/p.mp4"));
        let joined = args.join(" ");
        assert!(joined.contains("-stream_loop -1 -i /clips/a.mp4 -frames:v 218"));
        assert!(!joined.contains("-t "));
        assert!(joined.contains("scale=1280:720"));
        assert!(joined.contains("fps=30"));
        assert!(!joined.contains("setpts"));
        assert_eq!(args.last().map(String::as_str), Some("/out/p.mp4"));
    }

    #[test]
    fn test_window_frames_do_not_drift() {
        let muxer = muxer();
        let window = 2.345;
        let total = 40.0 * window;

        let mut frames = Vec::new();
        for i in 0..40 {
            let start = f64::from(i) * window;
            let end = if i == 39 { total } else { f64::from(i + 1) * window };
            frames.push(muxer.window_frames(start, end));
        }
        assert!(frames.iter().all(|f| *f == 70 || *f == 71), "{:?}", frames);
        assert_eq!(frames.iter().sum::<u64>(), (total * 30.0).round() as u64);
        assert_eq!(frames.iter().sum::<u64>(), 2814);
    }

    #[test]
    fn test_window_frames_zero_length() {
        let muxer = muxer();
        assert_eq!(muxer.window_frames(12.0, 12.0), 0);
        assert_eq!(muxer.window_frames(12.0, 12.01), 0);
        assert_eq!(muxer.window_frames(0.0, 7.25), 218);
    }

    #[test]
    fn test_mux_args_cut_to_total() {
        let args = muxer().mux_args(
            Path::new("/w/parts.txt"),
            Path::new("/a/vo.mp3"),
            61.5,
            Path::new("/v/final.mp4"),
        );
        let joined = args.join(" ");
        assert!(joined.contains("-f concat -safe 0 -i /w/parts.txt -i /a/vo.mp3"));
        assert!(joined.contains("-t 61.500 /v/final.mp4"));
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/w/part-001.mp4"), PathBuf::from("/w/it's.mp4")]);
        assert_eq!(list, "file '/w/part-001.mp4'\nfile '/w/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_parse_probe_output() {
        assert_eq!(parse_probe_output("12.345000\n").unwrap(), 12.345);
        assert!(parse_probe_output("N/A").is_err());
        assert!(parse_probe_output("0.0").is_err());
    }

    #[test]
    fn test_resolution_string() {
        assert_eq!(muxer().resolution(), "1280x720");
    }
}
