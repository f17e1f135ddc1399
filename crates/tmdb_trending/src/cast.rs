//! Cast Sampler: credits for the top of the table, tallied by actor name.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::client::CatalogSource;
use crate::error::TrendingError;
use crate::normalize::{NormalizedRow, lenient, lenient_items};
use crate::output::TableRow;

/// Which credits endpoint a row's `media_type` maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Movie,
    Tv,
    Unsupported,
}

impl MediaType {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("movie") => MediaType::Movie,
            Some("tv") | Some("series") => MediaType::Tv,
            _ => MediaType::Unsupported,
        }
    }

    pub fn credits_path(self, id: i64) -> Option<String> {
        match self {
            MediaType::Movie => Some(format!("/movie/{id}/credits")),
            MediaType::Tv => Some(format!("/tv/{id}/credits")),
            MediaType::Unsupported => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default, deserialize_with = "lenient_items")]
    cast: Vec<CastMember>,
}

impl Credits {
    pub fn cast_names(&self) -> impl Iterator<Item = &str> {
        self.cast
            .iter()
            .filter_map(|member| member.name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CastMember {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
}

/// Credits for one title. Person rows and unknown categories get an empty
/// credit set without a request.
pub fn fetch_credits<S: CatalogSource>(
    source: &S,
    media: MediaType,
    id: i64,
) -> Result<Credits, TrendingError> {
    match media.credits_path(id) {
        Some(path) => {
            let payload = source.fetch_json(&path, &[])?;
            Ok(serde_json::from_value(payload)?)
        }
        None => Ok(Credits::default()),
    }
}

/// Appearance counts keyed by actor name.
#[derive(Debug, Clone, Default)]
pub struct CastTally {
    index: HashMap<String, usize>,
    entries: Vec<CastCount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastCount {
    pub name: String,
    pub count: u64,
}

impl TableRow for CastCount {
    fn headers() -> Vec<&'static str> {
        vec!["name", "count"]
    }

    fn fields(&self) -> Vec<String> {
        vec![self.name.clone(), self.count.to_string()]
    }
}

impl CastTally {
    pub fn record(&mut self, name: &str) {
        match self.index.get(name) {
            Some(&slot) => self.entries[slot].count += 1,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(CastCount {
                    name: name.to_string(),
                    count: 1,
                });
            }
        }
    }

    pub fn count(&self, name: &str) -> u64 {
        self.index
            .get(name)
            .map(|&slot| self.entries[slot].count)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest count first; equal counts stay in first-seen order.
    pub fn into_sorted(self) -> Vec<CastCount> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries
    }
}

/// Tally cast names across the first `sample_size` rows.
///
/// Consecutive credit requests are separated by a fixed `delay`; rows that
/// need no request (no id, unsupported media type) do not wait.
pub fn sample_cast<S: CatalogSource>(
    source: &S,
    rows: &[NormalizedRow],
    sample_size: usize,
    delay: Duration,
) -> Result<CastTally, TrendingError> {
    let mut tally = CastTally::default();
    let mut fetched = 0usize;

    for row in rows.iter().take(sample_size) {
        let media = MediaType::parse(row.media_type.as_deref());
        let id = match row.id {
            Some(id) if media != MediaType::Unsupported => id,
            _ => {
                debug!(id = ?row.id, media_type = ?row.media_type, "No credits for row");
                continue;
            }
        };

        if fetched > 0 && !delay.is_zero() {
            thread::sleep(delay);
        }

        let credits = fetch_credits(source, media, id)?;
        fetched += 1;
        for name in credits.cast_names() {
            tally.record(name);
        }
        debug!(id, distinct = tally.len(), "Tallied credits");
    }

    info!(requests = fetched, distinct = tally.len(), "Cast sample complete");
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Instant;

    use serde_json::{Value, json};

    use super::*;

    #[derive(Default)]
    struct CannedSource {
        responses: HashMap<String, Value>,
        calls: RefCell<Vec<(String, Instant)>>,
    }

    impl CannedSource {
        fn with(mut self, path: &str, body: Value) -> Self {
            self.responses.insert(path.to_string(), body);
            self
        }

        fn paths(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(p, _)| p.clone()).collect()
        }
    }

    impl CatalogSource for CannedSource {
        fn fetch_json(&self, path: &str, _query: &[(&str, &str)]) -> Result<Value, TrendingError> {
            self.calls
                .borrow_mut()
                .push((path.to_string(), Instant::now()));
            self.responses
                .get(path)
                .cloned()
                .ok_or_else(|| TrendingError::remote(404, path, "not found"))
        }
    }

    fn row(id: i64, media_type: &str) -> NormalizedRow {
        NormalizedRow {
            id: Some(id),
            media_type: Some(media_type.to_string()),
            title: None,
            date: None,
            popularity: None,
            vote_average: None,
            vote_count: None,
            original_language: None,
            genres: String::new(),
        }
    }

    fn cast(names: &[&str]) -> Value {
        let members: Vec<Value> = names.iter().map(|name| json!({ "name": name })).collect();
        json!({ "cast": members, "crew": [] })
    }

    #[test]
    fn media_type_dispatch() {
        assert_eq!(
            MediaType::parse(Some("movie")).credits_path(5).as_deref(),
            Some("/movie/5/credits")
        );
        assert_eq!(
            MediaType::parse(Some("tv")).credits_path(6).as_deref(),
            Some("/tv/6/credits")
        );
        assert_eq!(MediaType::parse(Some("series")), MediaType::Tv);
        assert_eq!(MediaType::parse(Some("person")).credits_path(7), None);
        assert_eq!(MediaType::parse(None), MediaType::Unsupported);
    }

    #[test]
    fn tallies_names_across_sampled_rows() {
        let source = CannedSource::default()
            .with("/movie/1/credits", cast(&["X", "Y"]))
            .with("/tv/2/credits", cast(&["X"]));
        let rows = vec![row(1, "movie"), row(2, "tv")];

        let tally = sample_cast(&source, &rows, 2, Duration::ZERO).unwrap();
        assert_eq!(tally.count("X"), 2);
        assert_eq!(tally.count("Y"), 1);

        let sorted = tally.into_sorted();
        assert_eq!(
            sorted,
            vec![
                CastCount {
                    name: "X".to_string(),
                    count: 2,
                },
                CastCount {
                    name: "Y".to_string(),
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn person_rows_are_skipped_without_a_request() {
        let source = CannedSource::default().with("/movie/3/credits", cast(&["Z"]));
        let rows = vec![row(10, "person"), row(3, "movie")];

        let tally = sample_cast(&source, &rows, 5, Duration::ZERO).unwrap();
        assert_eq!(source.paths(), vec!["/movie/3/credits".to_string()]);
        assert_eq!(tally.count("Z"), 1);
    }

    #[test]
    fn only_the_first_sample_size_rows_are_fetched() {
        let source = CannedSource::default()
            .with("/movie/1/credits", cast(&["A"]))
            .with("/movie/2/credits", cast(&["B"]));
        let rows = vec![row(1, "movie"), row(2, "movie")];

        let tally = sample_cast(&source, &rows, 1, Duration::ZERO).unwrap();
        assert_eq!(source.paths(), vec!["/movie/1/credits".to_string()]);
        assert_eq!(tally.count("B"), 0);
    }

    #[test]
    fn malformed_cast_members_do_not_drop_the_rest() {
        let source = CannedSource::default().with(
            "/movie/1/credits",
            json!({ "cast": [{ "name": "P" }, null, "stray", 7, { "name": "Q" }] }),
        );
        let tally = sample_cast(&source, &[row(1, "movie")], 1, Duration::ZERO).unwrap();
        assert_eq!(tally.len(), 2);
        assert_eq!(tally.count("P"), 1);
        assert_eq!(tally.count("Q"), 1);
    }

    #[test]
    fn empty_and_missing_names_are_ignored() {
        let source = CannedSource::default().with(
            "/movie/1/credits",
            json!({ "cast": [{ "name": "" }, { "character": "Extra" }, { "name": null }, { "name": "Q" }] }),
        );
        let tally = sample_cast(&source, &[row(1, "movie")], 1, Duration::ZERO).unwrap();
        assert_eq!(tally.len(), 1);
        assert_eq!(tally.count("Q"), 1);
    }

    #[test]
    fn no_names_gives_an_empty_tally() {
        let source = CannedSource::default().with("/tv/4/credits", json!({ "crew": [] }));
        let tally = sample_cast(&source, &[row(4, "tv")], 3, Duration::ZERO).unwrap();
        assert!(tally.is_empty());
        assert!(tally.into_sorted().is_empty());
    }

    #[test]
    fn remote_failure_propagates() {
        let source = CannedSource::default();
        let err = sample_cast(&source, &[row(8, "movie")], 1, Duration::ZERO).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn requests_are_spaced_by_the_delay() {
        let delay = Duration::from_millis(25);
        let source = CannedSource::default()
            .with("/movie/1/credits", cast(&["A"]))
            .with("/movie/2/credits", cast(&["A"]))
            .with("/movie/3/credits", cast(&["A"]));
        let rows = vec![row(1, "movie"), row(2, "movie"), row(3, "movie")];

        let tally = sample_cast(&source, &rows, 3, delay).unwrap();
        assert_eq!(tally.count("A"), 3);

        let calls = source.calls.borrow();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1].1.duration_since(pair[0].1) >= delay);
        }
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let mut tally = CastTally::default();
        for name in ["B", "A", "C", "A"] {
            tally.record(name);
        }
        let names: Vec<_> = tally
            .into_sorted()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}
