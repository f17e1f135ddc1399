//! Catalog Client: authenticated GETs against the TMDB v3 API.
//!
//! Every pipeline stage talks to the catalog through [`CatalogSource`], so the
//! blocking HTTP client can be swapped for canned responses in tests.

use std::fmt;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use serde_json::Value;
use tracing::debug;

use crate::config::{TimeWindow, TrendingScope, Tunables};
use crate::error::TrendingError;

const USER_AGENT: &str = "tmdb-trending/0.1";

/// Read-only access to the remote catalog.
pub trait CatalogSource {
    /// GET `{base}{path}` with the given query pairs and return the parsed body.
    ///
    /// Any status other than 200 is a [`TrendingError::RemoteRequest`].
    fn fetch_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, TrendingError>;
}

#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    api_base: String,
    token: String,
}

impl fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(tunables: &Tunables) -> Result<Self, TrendingError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(tunables.request_timeout)
            .build()?;

        Ok(Self {
            http,
            api_base: tunables.api_base.clone(),
            token: tunables.api_token.clone(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }
}

impl CatalogSource for CatalogClient {
    fn fetch_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, TrendingError> {
        let url = self.url_for(path);
        debug!(url = %url, "GET");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .query(query)
            .send()?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(TrendingError::remote(status.as_u16(), url, &body));
        }

        Ok(response.json::<Value>()?)
    }
}

/// Fetch the first page of `/trending/{scope}/{window}` as raw JSON.
pub fn fetch_trending<S: CatalogSource>(
    source: &S,
    scope: TrendingScope,
    window: TimeWindow,
) -> Result<Value, TrendingError> {
    let path = trending_path(scope, window);
    source.fetch_json(&path, &[("page", "1")])
}

pub fn trending_path(scope: TrendingScope, window: TimeWindow) -> String {
    format!("/trending/{}/{}", scope.as_str(), window.as_str())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn tunables(base: &str) -> Tunables {
        Tunables {
            api_base: base.to_string(),
            api_token: "token".to_string(),
            request_timeout: Duration::from_secs(1),
            cast_delay: Duration::ZERO,
        }
    }

    #[test]
    fn url_concatenates_base_and_path() {
        let client = CatalogClient::new(&tunables("https://api.example.test/3")).unwrap();
        assert_eq!(
            client.url_for("/genre/tv/list"),
            "https://api.example.test/3/genre/tv/list"
        );
    }

    #[test]
    fn trending_path_uses_scope_and_window() {
        assert_eq!(
            trending_path(TrendingScope::All, TimeWindow::Week),
            "/trending/all/week"
        );
        assert_eq!(
            trending_path(TrendingScope::Movie, TimeWindow::Day),
            "/trending/movie/day"
        );
    }
}
