use std::io;

use thiserror::Error;

use crate::logging::LoggingError;

/// Longest response body excerpt carried by [`TrendingError::RemoteRequest`].
pub const EXCERPT_MAX_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum TrendingError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("HTTP {status} for {url}: {excerpt}")]
    RemoteRequest {
        status: u16,
        url: String,
        excerpt: String,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
}

impl TrendingError {
    pub fn config<T: Into<String>>(message: T) -> Self {
        TrendingError::Config(message.into())
    }

    /// Builds a remote request error, cutting the body down to [`EXCERPT_MAX_CHARS`].
    pub fn remote(status: u16, url: impl Into<String>, body: &str) -> Self {
        TrendingError::RemoteRequest {
            status,
            url: url.into(),
            excerpt: truncate_chars(body, EXCERPT_MAX_CHARS).to_string(),
        }
    }

    /// Status code of a failed remote request, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TrendingError::RemoteRequest { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
