//! Filename pattern matchers. These only pre-fill the show name and season
//! when the user leaves them out; the subtitle engine never consults them.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub mod cross;
pub mod season_episode;
pub mod words;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilename {
    pub show_name: Option<String>,
    pub season: u32,
    pub episodes: Vec<u32>,
}

pub trait FilenameMatcher: Send + Sync {
    /// `name` has dots and underscores already replaced with spaces.
    fn match_name(&self, name: &str) -> Option<ParsedFilename>;
}

/// Matchers in priority order; the first one that matches wins.
pub fn default_matchers() -> Vec<Box<dyn FilenameMatcher>> {
    vec![
        Box::new(season_episode::DoubleEpisodeMatcher::new()),
        Box::new(season_episode::EpisodeSpanMatcher::new()),
        Box::new(season_episode::SingleEpisodeMatcher::new()),
        Box::new(cross::CrossMatcher::new()),
        Box::new(words::SeasonEpisodeWordsMatcher::new()),
    ]
}

pub fn parse_filename(path: &Path) -> Option<ParsedFilename> {
    let stem = path.file_stem()?.to_string_lossy();
    let name = stem.replace(&['.', '_'][..], " ");
    default_matchers()
        .iter()
        .find_map(|matcher| matcher.match_name(&name))
}

pub(crate) fn number(text: &str) -> Option<u32> {
    text.parse().ok()
}

/// Show name from the text preceding the episode marker: separators become
/// spaces and a trailing year is dropped.
pub(crate) fn show_name_from_prefix(prefix: &str) -> Option<String> {
    static TRAILING_YEAR: OnceLock<Regex> = OnceLock::new();
    let trailing_year = TRAILING_YEAR.get_or_init(|| {
        Regex::new(r"(?i)\s*(?:\(|\[)?(19\d{2}|20\d{2})(?:\)|\])?\s*$").expect("valid regex")
    });

    let spaced = prefix.replace(&['.', '_', '-'][..], " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped = trailing_year.replace(&collapsed, "");
    let name = stripped.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
