use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Samples with fewer qualifying tokens than this score 0 against anything.
pub const MIN_QUALIFYING_TOKENS: usize = 300;

/// The NLTK English stopword list. Entries with apostrophes never match a
/// normalized token; their fragments ("don", "t", "ve") are listed too.
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

fn is_timing_line(line: &str) -> bool {
    line.contains("-->")
}

fn is_index_line(line: &str) -> bool {
    !line.is_empty() && line.parse::<i64>().is_ok()
}

/// Lowercase, drop subtitle sequence numbers and timing lines, and reduce
/// everything else to alphanumeric words separated by single spaces.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let joined = lowered
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_timing_line(line) && !is_index_line(line))
        .collect::<Vec<_>>()
        .join(" ");

    let cleaned: String = joined
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode a subtitle payload (UTF-8, falling back to Latin-1) into a
/// normalized sample. Returns `None` when no text survives.
pub fn subtitle_text(bytes: &[u8]) -> Option<String> {
    let decoded = match std::str::from_utf8(bytes) {
        Ok(text) => normalize(text),
        Err(_) => {
            let latin1: String = bytes.iter().map(|&b| b as char).collect();
            normalize(&latin1)
        }
    };
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

pub fn token_frequencies(text: &str) -> HashMap<String, f64> {
    let stopwords = stopwords();
    let mut counts: HashMap<String, f64> = HashMap::new();
    for token in normalize(text).split_whitespace() {
        if token.chars().count() <= 1 || stopwords.contains(token) {
            continue;
        }
        *counts.entry(token.to_string()).or_default() += 1.0;
    }
    counts
}

fn total_tokens(frequencies: &HashMap<String, f64>) -> usize {
    frequencies.values().sum::<f64>() as usize
}

fn cosine_similarity(left: &HashMap<String, f64>, right: &HashMap<String, f64>) -> f64 {
    let left_norm = left.values().map(|v| v * v).sum::<f64>().sqrt();
    let right_norm = right.values().map(|v| v * v).sum::<f64>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    // Iterate the smaller map; the dot product is symmetric.
    let (small, large) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    let dot: f64 = small
        .iter()
        .filter_map(|(token, count)| large.get(token).map(|other| count * other))
        .sum();
    (dot / (left_norm * right_norm)).clamp(0.0, 1.0)
}

pub fn similarity(left: &str, right: &str) -> f64 {
    let left_tokens = token_frequencies(left);
    let right_tokens = token_frequencies(right);
    if total_tokens(&left_tokens) < MIN_QUALIFYING_TOKENS
        || total_tokens(&right_tokens) < MIN_QUALIFYING_TOKENS
    {
        return 0.0;
    }
    cosine_similarity(&left_tokens, &right_tokens)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// `count` distinct-ish words drawn from a vocabulary unique to `seed`.
    pub(crate) fn sample_text(seed: &str, count: usize) -> String {
        (0..count)
            .map(|i| format!("{seed}word{}", i % 40))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_normalize_strips_srt_markup() {
        let srt = "1\n00:00:01,000 --> 00:00:03,000\nHello, World!\n\n2\n00:00:04,000 --> 00:00:05,000\n<i>It's   ME</i>\n";
        assert_eq!(normalize(srt), "hello world i it s me i");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  Foo\t\tBAR -- baz  "), "foo bar baz");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_token_frequencies_filters_short_tokens_and_stopwords() {
        let counts = token_frequencies("The detective and the detective's x partner");
        assert_eq!(counts.get("detective"), Some(&2.0));
        assert_eq!(counts.get("partner"), Some(&1.0));
        assert!(!counts.contains_key("the"));
        assert!(!counts.contains_key("and"));
        assert!(!counts.contains_key("x"));
        assert!(!counts.contains_key("s"));
    }

    #[test]
    fn test_stopwords_are_the_standard_english_list() {
        assert_eq!(stopwords().len(), 179);
        let counts = token_frequencies("Yeah I know, you gonna tell him right now");
        for word in ["yeah", "know", "gonna", "tell", "right"] {
            assert_eq!(counts.get(word), Some(&1.0), "{word}");
        }
        assert!(!counts.contains_key("you"));
        assert!(!counts.contains_key("now"));
    }

    #[test]
    fn test_similarity_identical_text_is_one() {
        let text = sample_text("alpha", 320);
        let score = similarity(&text, &text);
        assert!((score - 1.0).abs() < 1e-9, "score was {score}");
    }

    #[test]
    fn test_similarity_is_symmetric() {
        let left = format!("{} {}", sample_text("alpha", 300), sample_text("shared", 120));
        let right = format!("{} {}", sample_text("beta", 310), sample_text("shared", 200));
        assert_eq!(similarity(&left, &right), similarity(&right, &left));
        assert!(similarity(&left, &right) > 0.0);
    }

    #[test]
    fn test_similarity_short_sample_is_zero() {
        let long = sample_text("alpha", 400);
        let short = sample_text("alpha", 299);
        assert_eq!(similarity(&long, &short), 0.0);
        assert_eq!(similarity(&short, &long), 0.0);
        assert_eq!(similarity(&short, &short), 0.0);
    }

    #[test]
    fn test_similarity_counts_only_qualifying_tokens() {
        // 400 words, but only 200 survive stopword filtering.
        let mixed: String = (0..200)
            .map(|i| format!("the alphaword{}", i % 10))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(similarity(&mixed, &mixed), 0.0);
    }

    #[test]
    fn test_similarity_disjoint_vocabularies_is_zero() {
        let left = sample_text("alpha", 350);
        let right = sample_text("beta", 350);
        assert_eq!(similarity(&left, &right), 0.0);
    }

    #[test]
    fn test_subtitle_text_falls_back_to_latin1() {
        let bytes = b"1\n00:00:01,000 --> 00:00:02,000\nCaf\xe9 ouvert\n";
        assert_eq!(subtitle_text(bytes).as_deref(), Some("café ouvert"));
        assert_eq!(subtitle_text(b"1\n00:00:01,000 --> 00:00:02,000\n"), None);
    }
}
