use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::domain::ports::{SubtitleCandidate, SubtitleCorpus};
use crate::error::{response_snippet, MatchError, Result};

const OPENSUBTITLES_API_BASE: &str = "https://api.opensubtitles.com/api/v1";
const SERVICE: &str = "OpenSubtitles";
const USER_AGENT: &str = concat!("mkv-episode-matcher ", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct OpenSubtitlesCredentials {
    pub api_key: String,
    pub username: String,
    pub password: String,
}

/// REST client for the OpenSubtitles v1 API. Logs in lazily on first use
/// and keeps the session token for the rest of the run.
#[derive(Debug)]
pub struct OpenSubtitlesClient {
    credentials: OpenSubtitlesCredentials,
    base_url: String,
    token: Option<String>,
    http: Client,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    attributes: SubtitleAttributes,
}

#[derive(Debug, Deserialize)]
struct SubtitleAttributes {
    language: Option<String>,
    files: Option<Vec<SubtitleFile>>,
}

#[derive(Debug, Deserialize)]
struct SubtitleFile {
    file_id: u64,
    file_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct DownloadRequest {
    file_id: u64,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    link: String,
    file_name: Option<String>,
}

impl OpenSubtitlesClient {
    pub fn new(credentials: OpenSubtitlesCredentials) -> Self {
        Self {
            credentials,
            base_url: OPENSUBTITLES_API_BASE.to_string(),
            token: None,
            http: Client::new(),
        }
    }

    fn with_headers(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header("Api-Key", &self.credentials.api_key)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn check_status(url: &str, response: Response) -> Result<String> {
        let status = response.status();
        let body = response.text()?;
        if status == StatusCode::UNAUTHORIZED {
            error!("OpenSubtitles unauthorized endpoint={url}");
            return Err(MatchError::Unauthorized {
                service: SERVICE,
                endpoint: url.to_string(),
            });
        }
        if !status.is_success() {
            error!("OpenSubtitles request failed endpoint={url} status={status}");
            return Err(MatchError::Upstream {
                service: SERVICE,
                endpoint: url.to_string(),
                status: status.as_u16(),
                message: response_snippet(&body),
            });
        }
        Ok(body)
    }

    fn ensure_logged_in(&mut self) -> Result<()> {
        if self.token.is_some() {
            return Ok(());
        }

        let url = format!("{}/login", self.base_url);
        let request = self.with_headers(self.http.post(&url)).json(&LoginRequest {
            username: &self.credentials.username,
            password: &self.credentials.password,
        });
        let body = Self::check_status(&url, request.send()?)?;
        let login: LoginResponse = serde_json::from_str(&body)?;

        if let Some(base_url) = login.base_url.as_deref().and_then(normalize_base_url) {
            debug!("OpenSubtitles switching base_url={base_url}");
            self.base_url = base_url;
        }
        self.token = Some(login.token);
        info!("Logged in to OpenSubtitles as {}", self.credentials.username);
        Ok(())
    }
}

impl SubtitleCorpus for OpenSubtitlesClient {
    fn search_subtitles(
        &mut self,
        show_id: u64,
        season_number: u32,
        episode_number: u32,
        language: &str,
    ) -> Result<Vec<SubtitleCandidate>> {
        self.ensure_logged_in()?;

        let url = format!("{}/subtitles", self.base_url);
        let request = self.with_headers(self.http.get(&url)).query(&[
            ("parent_tmdb_id", show_id.to_string()),
            ("season_number", season_number.to_string()),
            ("episode_number", episode_number.to_string()),
            ("languages", language.to_string()),
            ("order_by", "download_count".to_string()),
            ("order_direction", "desc".to_string()),
        ]);
        let body = Self::check_status(&url, request.send()?)?;
        let search: SearchResponse = serde_json::from_str(&body)?;
        let candidates = candidates_from(search);
        debug!(
            "OpenSubtitles search show={show_id} S{season_number:02}E{episode_number:02} candidates={}",
            candidates.len()
        );
        Ok(candidates)
    }

    fn download(&mut self, file_id: u64) -> Result<Vec<u8>> {
        self.ensure_logged_in()?;

        let url = format!("{}/download", self.base_url);
        let request = self
            .with_headers(self.http.post(&url))
            .json(&DownloadRequest { file_id });
        let body = Self::check_status(&url, request.send()?)?;
        let download: DownloadResponse = serde_json::from_str(&body)?;
        debug!(
            "OpenSubtitles download file_id={file_id} name={}",
            download.file_name.as_deref().unwrap_or("?")
        );

        let response = self.http.get(&download.link).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(MatchError::Upstream {
                service: SERVICE,
                endpoint: download.link,
                status: status.as_u16(),
                message: response_snippet(&body),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// One candidate per result, using the result's first file.
fn candidates_from(search: SearchResponse) -> Vec<SubtitleCandidate> {
    search
        .data
        .into_iter()
        .map(|result| {
            let attributes = result.attributes;
            let first = attributes.files.and_then(|files| files.into_iter().next());
            SubtitleCandidate {
                file_id: first.as_ref().map(|file| file.file_id),
                file_name: first.and_then(|file| file.file_name),
                language: attributes.language,
            }
        })
        .collect()
}

/// The login response may point at a per-user host. Only OpenSubtitles API
/// hosts are accepted, and the `/api/v1` prefix is appended when missing.
fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let host = with_scheme
        .split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("");
    if !host.contains("api.opensubtitles.com") {
        return None;
    }

    if with_scheme.ends_with("/api/v1") {
        Some(with_scheme)
    } else {
        Some(format!("{with_scheme}/api/v1"))
    }
}
