use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::domain::ports::{DurationProbe, SampleExtractor, SubtitleExtraction};
use crate::error::{MatchError, Result};
use crate::matching::similarity::subtitle_text;
use crate::media::ffmpeg::FfmpegTools;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<Stream>,
}

#[derive(Debug, Deserialize)]
struct Stream {
    index: u32,
    codec_name: Option<String>,
    tags: Option<Tags>,
}

#[derive(Debug, Deserialize)]
struct Tags {
    language: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubtitleCodec {
    /// subrip, ass, ssa, mov_text, webvtt
    Text,
    /// hdmv_pgs_subtitle, dvd_subtitle
    Image,
    Unsupported,
}

impl SubtitleCodec {
    pub fn classify(codec_name: &str) -> Self {
        match codec_name.to_lowercase().as_str() {
            "subrip" | "ass" | "ssa" | "mov_text" | "webvtt" | "srt" => SubtitleCodec::Text,
            "hdmv_pgs_subtitle" | "pgssub" | "dvd_subtitle" | "dvdsub" => SubtitleCodec::Image,
            _ => SubtitleCodec::Unsupported,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub index: u32,
    pub codec_name: String,
}

fn is_english(stream: &Stream) -> bool {
    stream
        .tags
        .as_ref()
        .and_then(|t| t.language.as_deref())
        .map(|l| l.eq_ignore_ascii_case("eng") || l.eq_ignore_ascii_case("en"))
        .unwrap_or(false)
}

/// Prefer the first English track, otherwise the first subtitle stream.
pub fn find_best_subtitle_track(streams_json: &[u8]) -> Result<Option<SubtitleTrack>> {
    let info: FfprobeOutput = serde_json::from_slice(streams_json)?;
    let chosen = info
        .streams
        .iter()
        .find(|stream| is_english(stream))
        .or_else(|| info.streams.first());

    Ok(chosen.map(|stream| SubtitleTrack {
        index: stream.index,
        codec_name: stream.codec_name.clone().unwrap_or_default(),
    }))
}

/// Subtitle payloads from OpenSubtitles may arrive gzip-compressed. Bytes
/// that fail to inflate are returned unchanged.
pub fn decode_payload(bytes: &[u8]) -> Vec<u8> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return bytes.to_vec();
    }
    let mut inflated = Vec::new();
    match GzDecoder::new(bytes).read_to_end(&mut inflated) {
        Ok(_) => inflated,
        Err(e) => {
            warn!("Subtitle payload looked gzipped but failed to inflate: {e}");
            bytes.to_vec()
        }
    }
}

/// Parse ffprobe's `format=duration` output.
pub fn parse_duration(output: &str) -> Result<f64> {
    let trimmed = output.trim();
    match trimmed.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds > 0.0 => Ok(seconds),
        _ => Err(MatchError::Tool(format!(
            "ffprobe returned invalid output: '{trimmed}'"
        ))),
    }
}

impl FfmpegTools {
    fn extract_text(&self, path: &Path, track: &SubtitleTrack) -> Result<String> {
        let temp_dir = tempfile::Builder::new()
            .prefix("mkv-episode-matcher")
            .tempdir()?;
        let output_path = temp_dir.path().join(format!("track_{}.srt", track.index));
        self.extract_subtitle_track(path, track.index, &output_path)?;

        let bytes = fs::read(&output_path)?;
        subtitle_text(&bytes).ok_or_else(|| {
            MatchError::Tool(format!(
                "Subtitle track {} of {} is empty",
                track.index,
                path.display()
            ))
        })
    }
}

impl DurationProbe for FfmpegTools {
    fn probe_duration(&self, path: &Path) -> Result<f64> {
        parse_duration(&self.get_duration_output(path)?)
    }
}

impl SampleExtractor for FfmpegTools {
    fn extract_sample(&self, path: &Path) -> SubtitleExtraction {
        let track = match self
            .get_streams_json(path)
            .and_then(|json| find_best_subtitle_track(&json))
        {
            Ok(Some(track)) => track,
            Ok(None) => return SubtitleExtraction::failed("No subtitle streams found", None),
            Err(e) => return SubtitleExtraction::failed(e.to_string(), None),
        };

        let codec = Some(track.codec_name.clone());
        debug!(
            "Selected subtitle stream file='{}' index={} codec={}",
            path.display(),
            track.index,
            track.codec_name
        );

        match SubtitleCodec::classify(&track.codec_name) {
            SubtitleCodec::Text => match self.extract_text(path, &track) {
                Ok(text) => SubtitleExtraction::sample(text, codec),
                Err(e) => SubtitleExtraction::failed(e.to_string(), codec),
            },
            SubtitleCodec::Image => SubtitleExtraction::failed(
                format!(
                    "Subtitle codec {} is image-based and requires OCR",
                    track.codec_name
                ),
                codec,
            ),
            SubtitleCodec::Unsupported => SubtitleExtraction::failed(
                format!("Unsupported subtitle codec: {}", track.codec_name),
                codec,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_prefers_english_track() {
        let json = br#"{"streams": [
            {"index": 2, "codec_name": "subrip", "tags": {"language": "ger"}},
            {"index": 3, "codec_name": "hdmv_pgs_subtitle", "tags": {"language": "eng"}},
            {"index": 4, "codec_name": "subrip", "tags": {"language": "eng"}}
        ]}"#;
        let track = find_best_subtitle_track(json).unwrap().unwrap();
        assert_eq!(track.index, 3);
        assert_eq!(SubtitleCodec::classify(&track.codec_name), SubtitleCodec::Image);
    }

    #[test]
    fn test_falls_back_to_first_stream() {
        let json = br#"{"streams": [
            {"index": 5, "codec_name": "ass", "tags": {"language": "jpn"}},
            {"index": 6, "codec_name": "subrip"}
        ]}"#;
        let track = find_best_subtitle_track(json).unwrap().unwrap();
        assert_eq!(
            track,
            SubtitleTrack {
                index: 5,
                codec_name: "ass".to_string()
            }
        );
    }

    #[test]
    fn test_no_streams() {
        assert_eq!(find_best_subtitle_track(br#"{}"#).unwrap(), None);
        assert_eq!(find_best_subtitle_track(br#"{"streams": []}"#).unwrap(), None);
    }

    #[test]
    fn test_classify_codecs() {
        assert_eq!(SubtitleCodec::classify("subrip"), SubtitleCodec::Text);
        assert_eq!(SubtitleCodec::classify("WebVTT"), SubtitleCodec::Text);
        assert_eq!(SubtitleCodec::classify("dvd_subtitle"), SubtitleCodec::Image);
        assert_eq!(SubtitleCodec::classify("eia_608"), SubtitleCodec::Unsupported);
    }

    #[test]
    fn test_decode_payload_inflates_gzip() {
        let srt = b"1\n00:00:01,000 --> 00:00:02,000\nWinter is coming.\n";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(srt).unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(decode_payload(&compressed), srt.to_vec());
        assert_eq!(decode_payload(srt), srt.to_vec());
    }

    #[test]
    fn test_decode_payload_keeps_broken_gzip() {
        let broken = [0x1f, 0x8b, 0x00, 0x01, 0x02];
        assert_eq!(decode_payload(&broken), broken.to_vec());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1425.312000\n").unwrap(), 1425.312);
        assert!(matches!(parse_duration("N/A"), Err(MatchError::Tool(_))));
        assert!(matches!(parse_duration(""), Err(MatchError::Tool(_))));
    }
}
