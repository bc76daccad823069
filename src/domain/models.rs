use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::MatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u64);

/// A video file discovered on disk. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaFile {
    pub id: FileId,
    pub path: PathBuf,
    pub size: u64,
}

impl MediaFile {
    pub fn new(id: u64, path: PathBuf, size: u64) -> Self {
        Self {
            id: FileId(id),
            path,
            size,
        }
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Sort files by display name, case-insensitively, with the full path as a
/// tie-break so the order never depends on discovery order.
pub fn sort_by_display_name(files: &mut [&MediaFile]) {
    files.sort_by(|a, b| {
        a.name()
            .to_lowercase()
            .cmp(&b.name().to_lowercase())
            .then_with(|| a.path.cmp(&b.path))
    });
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CandidateEpisode {
    pub season_number: u32,
    pub episode_number: u32,
    pub name: String,
    pub runtime_minutes: Option<u32>,
    pub air_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ShowSummary {
    pub id: u64,
    pub name: String,
    pub original_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonListing {
    pub season_number: u32,
    pub episodes: Vec<CandidateEpisode>,
}

/// Largest episode number a range may name.
pub const MAX_EPISODE_NUMBER: u32 = 999;

/// Inclusive episode number range such as `13-24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EpisodeRange {
    pub start: u32,
    pub end: u32,
}

impl EpisodeRange {
    pub fn contains(&self, episode_number: u32) -> bool {
        (self.start..=self.end).contains(&episode_number)
    }

    pub fn len(&self) -> usize {
        if self.end < self.start {
            return 0;
        }
        (u64::from(self.end) - u64::from(self.start) + 1) as usize
    }

    /// Numbers inside the range that none of `episodes` carries.
    pub fn missing_from(&self, episodes: &[CandidateEpisode]) -> Vec<u32> {
        let listed: HashSet<u32> = episodes.iter().map(|ep| ep.episode_number).collect();
        (self.start..=self.end)
            .filter(|number| !listed.contains(number))
            .collect()
    }
}

impl FromStr for EpisodeRange {
    type Err = MatchError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || MatchError::Input(format!("Enter an episode range like 13-24 (got '{input}')"));
        let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let parts: Vec<&str> = cleaned.split('-').collect();
        match parts.as_slice() {
            [single] => {
                let value: u32 = single.parse().map_err(|_| invalid())?;
                if value > MAX_EPISODE_NUMBER {
                    return Err(invalid());
                }
                Ok(Self {
                    start: value,
                    end: value,
                })
            }
            [start, end] => {
                let start: u32 = start.parse().map_err(|_| invalid())?;
                let end: u32 = end.parse().map_err(|_| invalid())?;
                if start > end || end > MAX_EPISODE_NUMBER {
                    return Err(invalid());
                }
                Ok(Self { start, end })
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for EpisodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RankedEpisode {
    pub episode_number: u32,
    pub name: String,
    pub score: f64,
}

/// Why a file was left without a match. These are outcomes, not errors.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    NoSample { error: String },
    SubtitlesDisabled,
    NoReferenceSamples,
    Unassigned,
    MissingReference { episode: u32 },
    LowMargin { best_episode: u32, best: f64, delta: f64 },
    BelowThreshold { episode: u32, score: f64 },
    DurationMismatch {
        episode: u32,
        file_minutes: f64,
        episode_minutes: u32,
        delta: f64,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoSample { error } => write!(f, "No embedded subtitles: {error}"),
            Rejection::SubtitlesDisabled => write!(f, "Subtitle matching disabled"),
            Rejection::NoReferenceSamples => write!(f, "No reference subtitles downloaded"),
            Rejection::Unassigned => write!(f, "Left unmatched by assignment"),
            Rejection::MissingReference { episode } => {
                write!(f, "No reference subtitles for E{episode:02}")
            }
            Rejection::LowMargin {
                best_episode,
                best,
                delta,
            } => write!(
                f,
                "Ambiguous match (best E{best_episode:02} {best:.2}, margin {delta:.2})"
            ),
            Rejection::BelowThreshold { episode, score } => {
                write!(f, "Low subtitle similarity for E{episode:02} ({score:.2})")
            }
            Rejection::DurationMismatch {
                episode,
                file_minutes,
                episode_minutes,
                delta,
            } => write!(
                f,
                "Duration mismatch for E{episode:02} (file {file_minutes:.1} min, episode {episode_minutes} min, delta {delta:.2})"
            ),
        }
    }
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct MatchStatus {
    pub duration_checked: bool,
    pub duration_used: bool,
    pub subtitles_attempted: bool,
    pub subtitles_matched: bool,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MatchDecision {
    pub file: MediaFile,
    pub episode: Option<CandidateEpisode>,
    pub score: f64,
    pub reasons: Vec<String>,
    pub top_matches: Vec<RankedEpisode>,
    pub rejection: Option<Rejection>,
    pub proposed_name: Option<String>,
    pub status: MatchStatus,
}

impl MatchDecision {
    pub fn unmatched(file: &MediaFile, rejection: Rejection, status: MatchStatus) -> Self {
        let status = MatchStatus {
            last_error: Some(rejection.to_string()),
            ..status
        };
        Self {
            file: file.clone(),
            episode: None,
            score: 0.0,
            reasons: Vec::new(),
            top_matches: Vec::new(),
            rejection: Some(rejection),
            proposed_name: None,
            status,
        }
    }

    pub fn is_match(&self) -> bool {
        self.episode.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_episode_range() {
        assert_eq!(
            "13-24".parse::<EpisodeRange>().unwrap(),
            EpisodeRange { start: 13, end: 24 }
        );
        assert_eq!(
            " 13 - 24 ".parse::<EpisodeRange>().unwrap(),
            EpisodeRange { start: 13, end: 24 }
        );
        assert_eq!(
            "7".parse::<EpisodeRange>().unwrap(),
            EpisodeRange { start: 7, end: 7 }
        );
    }

    #[test]
    fn test_parse_episode_range_rejects_invalid() {
        for input in ["", "24-13", "a-b", "1-2-3", "-4"] {
            let err = input.parse::<EpisodeRange>().unwrap_err();
            assert!(matches!(err, MatchError::Input(_)), "input {input:?}");
        }
    }

    #[test]
    fn test_missing_episodes() {
        let range = EpisodeRange { start: 1, end: 4 };
        let episodes: Vec<CandidateEpisode> = [1, 3]
            .into_iter()
            .map(|number| CandidateEpisode {
                season_number: 1,
                episode_number: number,
                name: format!("Episode {number}"),
                runtime_minutes: None,
                air_date: None,
            })
            .collect();
        assert_eq!(range.missing_from(&episodes), vec![2, 4]);
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn test_oversized_ranges_rejected() {
        for input in ["0-4294967295", "1-1000", "1000", "4294967296"] {
            let err = input.parse::<EpisodeRange>().unwrap_err();
            assert!(matches!(err, MatchError::Input(_)), "input {input:?}");
        }
        let widest: EpisodeRange = "0-999".parse().unwrap();
        assert_eq!(widest.len(), 1000);

        let full = EpisodeRange {
            start: 0,
            end: u32::MAX,
        };
        assert_eq!(full.len() as u64, 1u64 << 32);
        assert_eq!(EpisodeRange { start: 5, end: 2 }.len(), 0);
    }

    #[test]
    fn test_sort_by_display_name_is_case_insensitive() {
        let a = MediaFile::new(0, PathBuf::from("/tmp/b.mkv"), 1);
        let b = MediaFile::new(1, PathBuf::from("/tmp/A.mkv"), 1);
        let c = MediaFile::new(2, PathBuf::from("/tmp/c.mkv"), 1);
        let mut files = vec![&c, &a, &b];
        sort_by_display_name(&mut files);
        let names: Vec<String> = files.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["A.mkv", "b.mkv", "c.mkv"]);
    }

    #[test]
    fn test_unmatched_records_rejection_text() {
        let file = MediaFile::new(0, PathBuf::from("/tmp/x.mkv"), 1);
        let decision = MatchDecision::unmatched(
            &file,
            Rejection::BelowThreshold {
                episode: 3,
                score: 0.41,
            },
            MatchStatus {
                subtitles_attempted: true,
                ..MatchStatus::default()
            },
        );
        assert!(!decision.is_match());
        assert_eq!(
            decision.status.last_error.as_deref(),
            Some("Low subtitle similarity for E03 (0.41)")
        );
    }
}
