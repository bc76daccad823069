use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{MatchError, Result};

/// Locations of the ffprobe and ffmpeg binaries.
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Default for FfmpegTools {
    fn default() -> Self {
        Self {
            ffprobe: PathBuf::from("ffprobe"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| MatchError::Tool(format!("Invalid path: {}", path.display())))
}

fn run(binary: &Path, args: &[&str]) -> Result<Output> {
    let tool = binary.display();
    let output = match Command::new(binary).args(args).output() {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(MatchError::Tool(format!(
                "{tool} not found. Please install ffmpeg and ensure it's in your PATH."
            )));
        }
        Err(e) => return Err(MatchError::Tool(format!("Failed to execute {tool}: {e}"))),
    };

    if !output.status.success() {
        return Err(MatchError::Tool(format!(
            "{tool} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(output)
}

impl FfmpegTools {
    pub fn new(ffprobe: Option<PathBuf>, ffmpeg: Option<PathBuf>) -> Self {
        let defaults = Self::default();
        Self {
            ffprobe: ffprobe.unwrap_or(defaults.ffprobe),
            ffmpeg: ffmpeg.unwrap_or(defaults.ffmpeg),
        }
    }

    /// Subtitle streams with their codec and language tag, as ffprobe JSON.
    pub fn get_streams_json(&self, path: &Path) -> Result<Vec<u8>> {
        let output = run(
            &self.ffprobe,
            &[
                "-v",
                "error",
                "-select_streams",
                "s",
                "-show_entries",
                "stream=index,codec_name:stream_tags=language",
                "-of",
                "json",
                path_arg(path)?,
            ],
        )?;
        Ok(output.stdout)
    }

    /// Raw `format=duration` value printed by ffprobe.
    pub fn get_duration_output(&self, path: &Path) -> Result<String> {
        let output = run(
            &self.ffprobe,
            &[
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
                path_arg(path)?,
            ],
        )?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Convert one text subtitle stream to SRT at `output_path`.
    pub fn extract_subtitle_track(
        &self,
        input_path: &Path,
        stream_index: u32,
        output_path: &Path,
    ) -> Result<()> {
        run(
            &self.ffmpeg,
            &[
                "-y",
                "-i",
                path_arg(input_path)?,
                "-map",
                &format!("0:{stream_index}"),
                "-c:s",
                "srt",
                path_arg(output_path)?,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_tool_error() {
        let tools = FfmpegTools::new(
            Some(PathBuf::from("/nonexistent/bin/ffprobe-missing")),
            None,
        );
        let err = tools.get_duration_output(Path::new("episode.mkv")).unwrap_err();
        assert!(matches!(err, MatchError::Tool(ref message) if message.contains("not found")));
    }

    #[test]
    fn test_new_keeps_defaults() {
        let tools = FfmpegTools::new(None, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));
        assert_eq!(tools.ffprobe, PathBuf::from("ffprobe"));
        assert_eq!(tools.ffmpeg, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    }
}
