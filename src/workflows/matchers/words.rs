use regex::Regex;

use super::{number, show_name_from_prefix, FilenameMatcher, ParsedFilename};

/// `Season 1 ... Episode 2`, also `Ep 2`.
pub struct SeasonEpisodeWordsMatcher {
    season: Regex,
    episode: Regex,
}

impl SeasonEpisodeWordsMatcher {
    pub fn new() -> Self {
        Self {
            season: Regex::new(r"(?i)\bseason[ ._-]*(\d{1,2})\b").expect("valid regex"),
            episode: Regex::new(r"(?i)\b(?:episode|ep)[ ._-]*(\d{1,2})\b").expect("valid regex"),
        }
    }
}

impl FilenameMatcher for SeasonEpisodeWordsMatcher {
    fn match_name(&self, name: &str) -> Option<ParsedFilename> {
        let season = self.season.captures(name)?;
        let episode = self.episode.captures(name)?;
        let start = season.get(0)?.start();
        Some(ParsedFilename {
            show_name: show_name_from_prefix(&name[..start]),
            season: number(&season[1])?,
            episodes: vec![number(&episode[1])?],
        })
    }
}
