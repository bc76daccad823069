use regex::Regex;

use super::{number, show_name_from_prefix, FilenameMatcher, ParsedFilename};

/// `1x02` and `1x02x03`.
pub struct CrossMatcher {
    multi: Regex,
    single: Regex,
}

impl CrossMatcher {
    pub fn new() -> Self {
        Self {
            multi: Regex::new(r"(?i)\b(\d{1,2})x(\d{1,2})[ ._-]*x?(\d{1,2})?\b")
                .expect("valid regex"),
            single: Regex::new(r"(?i)\b(\d{1,2})x(\d{1,2})\b").expect("valid regex"),
        }
    }
}

impl FilenameMatcher for CrossMatcher {
    fn match_name(&self, name: &str) -> Option<ParsedFilename> {
        let caps = self
            .multi
            .captures(name)
            .or_else(|| self.single.captures(name))?;
        let start = caps.get(0)?.start();

        let mut episodes = vec![number(&caps[2])?];
        if let Some(second) = caps.get(3).and_then(|m| number(m.as_str())) {
            episodes.push(second);
        }
        Some(ParsedFilename {
            show_name: show_name_from_prefix(&name[..start]),
            season: number(&caps[1])?,
            episodes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_ignores_resolution() {
        let parsed = CrossMatcher::new().match_name("Show 3x07 720p").unwrap();
        assert_eq!(parsed.season, 3);
        assert_eq!(parsed.episodes, vec![7]);
    }

    #[test]
    fn test_cross_rejects_plain_numbers() {
        assert!(CrossMatcher::new().match_name("Show 1920 1080").is_none());
    }
}
