use thiserror::Error;

/// Errors raised by a matching run and its collaborators.
///
/// `Input` and the upstream variants abort a run. `Tool` and `Cache` are
/// per-file or per-entry and are logged by the caller instead of propagated.
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("{0}")]
    Input(String),

    #[error("{service} request failed: HTTP {status}. Endpoint: {endpoint}{}", snippet_suffix(.message))]
    Upstream {
        service: &'static str,
        endpoint: String,
        status: u16,
        message: Option<String>,
    },

    #[error("{service} unauthorized (check API key/credentials). Endpoint: {endpoint}")]
    Unauthorized {
        service: &'static str,
        endpoint: String,
    },

    #[error("{0}")]
    Tool(String),

    #[error("Subtitle cache error: {0}")]
    Cache(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MatchError>;

fn snippet_suffix(message: &Option<String>) -> String {
    match message {
        Some(text) if !text.is_empty() => format!(". Response: {text}"),
        _ => String::new(),
    }
}

/// Truncate a response body for error messages.
pub fn response_snippet(body: &str) -> Option<String> {
    let snippet: String = body.chars().take(500).collect();
    let snippet = snippet.trim();
    if snippet.is_empty() {
        None
    } else {
        Some(snippet.to_string())
    }
}
