use regex::Regex;

use super::{number, show_name_from_prefix, FilenameMatcher, ParsedFilename};

/// `S01E02E03`
pub struct DoubleEpisodeMatcher {
    pattern: Regex,
}

impl DoubleEpisodeMatcher {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)\bS(\d{1,2})[ ._-]*E(\d{1,2})[ ._-]*E(\d{1,2})\b")
                .expect("valid regex"),
        }
    }
}

impl FilenameMatcher for DoubleEpisodeMatcher {
    fn match_name(&self, name: &str) -> Option<ParsedFilename> {
        let caps = self.pattern.captures(name)?;
        let start = caps.get(0)?.start();
        Some(ParsedFilename {
            show_name: show_name_from_prefix(&name[..start]),
            season: number(&caps[1])?,
            episodes: vec![number(&caps[2])?, number(&caps[3])?],
        })
    }
}

/// `S01E02-03`, every episode in between included.
pub struct EpisodeSpanMatcher {
    pattern: Regex,
}

impl EpisodeSpanMatcher {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(
                r"(?i)\bS(\d{1,2})[ ._-]*E(\d{1,2})[ ._]*(?:-|\x{2013})[ ._]*(\d{1,2})\b",
            )
            .expect("valid regex"),
        }
    }
}

impl FilenameMatcher for EpisodeSpanMatcher {
    fn match_name(&self, name: &str) -> Option<ParsedFilename> {
        let caps = self.pattern.captures(name)?;
        let start = caps.get(0)?.start();
        let first = number(&caps[2])?;
        let last = number(&caps[3])?;
        let episodes = if last > first {
            (first..=last).collect()
        } else {
            vec![first]
        };
        Some(ParsedFilename {
            show_name: show_name_from_prefix(&name[..start]),
            season: number(&caps[1])?,
            episodes,
        })
    }
}

/// `S01E02`
pub struct SingleEpisodeMatcher {
    pattern: Regex,
}

impl SingleEpisodeMatcher {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"(?i)\bS(\d{1,2})[ ._-]*E(\d{1,2})\b").expect("valid regex"),
        }
    }
}

impl FilenameMatcher for SingleEpisodeMatcher {
    fn match_name(&self, name: &str) -> Option<ParsedFilename> {
        let caps = self.pattern.captures(name)?;
        let start = caps.get(0)?.start();
        Some(ParsedFilename {
            show_name: show_name_from_prefix(&name[..start]),
            season: number(&caps[1])?,
            episodes: vec![number(&caps[2])?],
        })
    }
}
