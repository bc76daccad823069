use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, error};

use crate::domain::models::{CandidateEpisode, SeasonListing, ShowSummary};
use crate::domain::ports::EpisodeMetadataSource;
use crate::error::{response_snippet, MatchError, Result};

const TMDB_API_BASE: &str = "https://api.themoviedb.org/3";
const SERVICE: &str = "TMDB";

#[derive(Debug, Clone)]
pub struct TmdbClient {
    access_token: String,
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<TmdbShow>,
}

#[derive(Debug, Deserialize, Clone)]
struct TmdbShow {
    id: u64,
    name: String,
    original_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeasonResponse {
    season_number: u32,
    episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Deserialize)]
struct TmdbEpisode {
    name: String,
    season_number: u32,
    episode_number: u32,
    air_date: Option<String>,
    runtime: Option<u32>,
}

impl From<TmdbShow> for ShowSummary {
    fn from(show: TmdbShow) -> Self {
        Self {
            id: show.id,
            name: show.name,
            original_name: show.original_name,
        }
    }
}

impl From<TmdbEpisode> for CandidateEpisode {
    fn from(episode: TmdbEpisode) -> Self {
        Self {
            season_number: episode.season_number,
            episode_number: episode.episode_number,
            name: episode.name,
            runtime_minutes: episode.runtime,
            air_date: episode.air_date.filter(|date| !date.is_empty()),
        }
    }
}

impl TmdbClient {
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            base_url: TMDB_API_BASE.to_string(),
            http: Client::new(),
        }
    }

    fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Accept", "application/json")
            .query(query)
            .send()?;
        Ok(response)
    }

    fn check_status(&self, url: &str, response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text()?;
        if status == StatusCode::UNAUTHORIZED {
            error!("TMDB unauthorized endpoint={url}");
            return Err(MatchError::Unauthorized {
                service: SERVICE,
                endpoint: url.to_string(),
            });
        }
        if !status.is_success() {
            error!("TMDB request failed endpoint={url} status={status}");
            return Err(MatchError::Upstream {
                service: SERVICE,
                endpoint: url.to_string(),
                status: status.as_u16(),
                message: response_snippet(&body),
            });
        }
        Ok(body)
    }

    /// All search results, best name match first.
    pub fn search_shows(&self, name: &str) -> Result<Vec<ShowSummary>> {
        let url = format!("{}/search/tv", self.base_url);
        let response = self.get(
            &url,
            &[
                ("query", name),
                ("include_adult", "false"),
                ("language", "en-US"),
            ],
        )?;
        let body = self.check_status(&url, response)?;
        let search: SearchResponse = serde_json::from_str(&body)?;
        debug!("TMDB search query='{name}' results={}", search.results.len());
        Ok(rank_shows(name, search.results))
    }
}

impl EpisodeMetadataSource for TmdbClient {
    fn find_show(&mut self, name: &str) -> Result<Option<ShowSummary>> {
        Ok(self.search_shows(name)?.into_iter().next())
    }

    fn fetch_season(&mut self, show_id: u64, season_number: u32) -> Result<Option<SeasonListing>> {
        let url = format!("{}/tv/{show_id}/season/{season_number}", self.base_url);
        let response = self.get(&url, &[("language", "en-US")])?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = self.check_status(&url, response)?;
        let season: SeasonResponse = serde_json::from_str(&body)?;
        Ok(Some(SeasonListing {
            season_number: season.season_number,
            episodes: season.episodes.into_iter().map(Into::into).collect(),
        }))
    }
}

/// Lowercased alphanumeric words joined by single spaces.
fn normalized_token_string(text: &str) -> String {
    tokenized_words(text).join(" ")
}

fn tokenized_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn token_overlap_score(left: &str, right: &str) -> u32 {
    let left: HashSet<String> = tokenized_words(left).into_iter().collect();
    let right: HashSet<String> = tokenized_words(right).into_iter().collect();
    if left.is_empty() || right.is_empty() {
        return 0;
    }
    let overlap = left.intersection(&right).count();
    let ratio = overlap as f64 / left.len().max(right.len()) as f64;
    (ratio * 25.0) as u32
}

fn match_score(name: &str, query: &str) -> u32 {
    let normalized = normalized_token_string(name);
    if normalized == query {
        return 100;
    }
    if normalized.starts_with(query) || query.starts_with(&normalized) {
        return 75;
    }
    if normalized.contains(query) || query.contains(&normalized) {
        return 50;
    }
    25 + token_overlap_score(&normalized, query)
}

fn show_score(show: &TmdbShow, query: &str) -> u32 {
    let name_score = match_score(&show.name, query);
    let original_score = match_score(show.original_name.as_deref().unwrap_or(""), query);
    name_score.max(original_score)
}

/// Stable sort by score so equally good results keep TMDB's own order.
fn rank_shows(query: &str, results: Vec<TmdbShow>) -> Vec<ShowSummary> {
    let query = normalized_token_string(query);
    let mut scored: Vec<(u32, TmdbShow)> = results
        .into_iter()
        .map(|show| (show_score(&show, &query), show))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, show)| show.into()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(id: u64, name: &str, original: Option<&str>) -> TmdbShow {
        TmdbShow {
            id,
            name: name.to_string(),
            original_name: original.map(str::to_string),
        }
    }

    #[test]
    fn test_rank_prefers_exact_name() {
        let ranked = rank_shows(
            "The Office",
            vec![
                show(1, "The Office Mixtape", None),
                show(2, "The Office", None),
                show(3, "Office Space", None),
            ],
        );
        let ids: Vec<u64> = ranked.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_rank_uses_original_name() {
        let ranked = rank_shows(
            "shingeki no kyojin",
            vec![
                show(1, "Attack on Titan: Junior High", None),
                show(2, "Attack on Titan", Some("Shingeki no Kyojin")),
            ],
        );
        assert_eq!(ranked[0].id, 2);
    }

    #[test]
    fn test_match_score_levels() {
        assert_eq!(match_score("Dark", "dark"), 100);
        assert_eq!(match_score("Dark Matter", "dark"), 75);
        assert_eq!(match_score("The Dark Crystal", "dark crystal"), 50);
        assert_eq!(match_score("Lost", "found"), 25);
    }

    #[test]
    fn test_season_response_decodes_optional_fields() {
        let json = r#"{
            "season_number": 1,
            "episodes": [
                {"name": "Pilot", "season_number": 1, "episode_number": 1, "air_date": "2008-01-20", "runtime": 58},
                {"name": "Cat's in the Bag...", "season_number": 1, "episode_number": 2, "air_date": null, "runtime": null},
                {"name": "Zero", "season_number": 1, "episode_number": 3, "air_date": "", "runtime": 0}
            ]
        }"#;
        let season: SeasonResponse = serde_json::from_str(json).unwrap();
        let episodes: Vec<CandidateEpisode> = season.episodes.into_iter().map(Into::into).collect();
        assert_eq!(episodes[0].runtime_minutes, Some(58));
        assert_eq!(episodes[0].air_date.as_deref(), Some("2008-01-20"));
        assert_eq!(episodes[1].runtime_minutes, None);
        assert_eq!(episodes[1].air_date, None);
        assert_eq!(episodes[2].runtime_minutes, Some(0));
        assert_eq!(episodes[2].air_date, None);
    }
}
