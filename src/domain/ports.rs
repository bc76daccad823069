//! Collaborators a matching run depends on.
//!
//! The run only talks to these traits; the TMDB, OpenSubtitles, ffmpeg and
//! filesystem implementations live under `infra` and `media`.

use std::path::Path;

use crate::domain::models::{SeasonListing, ShowSummary};
use crate::error::Result;

pub trait DurationProbe: Send + Sync {
    /// Container duration in seconds.
    fn probe_duration(&self, path: &Path) -> Result<f64>;
}

/// Outcome of pulling a subtitle sample out of a local file. The codec is
/// reported even when extraction fails so the failure can be explained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtitleExtraction {
    pub text: Option<String>,
    pub codec: Option<String>,
    pub error: Option<String>,
}

impl SubtitleExtraction {
    pub fn sample(text: String, codec: Option<String>) -> Self {
        Self {
            text: Some(text),
            codec,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, codec: Option<String>) -> Self {
        Self {
            text: None,
            codec,
            error: Some(error.into()),
        }
    }
}

pub trait SampleExtractor: Send + Sync {
    fn extract_sample(&self, path: &Path) -> SubtitleExtraction;
}

pub trait EpisodeMetadataSource {
    fn find_show(&mut self, name: &str) -> Result<Option<ShowSummary>>;

    fn fetch_season(&mut self, show_id: u64, season_number: u32) -> Result<Option<SeasonListing>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCandidate {
    pub file_id: Option<u64>,
    pub file_name: Option<String>,
    pub language: Option<String>,
}

pub trait SubtitleCorpus {
    /// Candidates ordered best first.
    fn search_subtitles(
        &mut self,
        show_id: u64,
        season_number: u32,
        episode_number: u32,
        language: &str,
    ) -> Result<Vec<SubtitleCandidate>>;

    /// Raw payload bytes, possibly gzip-compressed.
    fn download(&mut self, file_id: u64) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub show_id: u64,
    pub season_number: u32,
    pub episode_number: u32,
    pub file_id: u64,
}

pub trait SubtitleCache {
    fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>>;

    /// Must be atomic: a later reader sees the whole entry or nothing.
    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<()>;
}
