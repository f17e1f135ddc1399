//! Record Normalizer.
//!
//! Trending results mix movie rows (`title`, `release_date`) with TV rows
//! (`name`, `first_air_date`) and the occasional person. Everything is folded
//! into one [`NormalizedRow`] shape and ordered by popularity.

use std::cmp::Ordering;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::genres::GenreMap;
use crate::output::TableRow;

pub const GENRE_SEPARATOR: &str = "; ";

/// One raw entry of a trending `results` array.
///
/// Every field is optional and a value of the wrong JSON type reads as absent,
/// so a malformed entry still produces a row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TrendingRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub media_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub first_air_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub popularity: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub vote_average: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub vote_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub original_language: Option<String>,
    #[serde(default, deserialize_with = "lenient_items")]
    pub genre_ids: Vec<Value>,
}

pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Elements of a JSON array that parse as `T`; anything that is not an array
/// reads as empty.
pub(crate) fn lenient_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

impl TrendingRecord {
    pub fn from_value(value: &Value) -> Self {
        TrendingRecord::deserialize(value).unwrap_or_default()
    }

    /// Movies carry `title`, series carry `name`.
    pub fn display_title(&self) -> Option<&str> {
        first_present([self.title.as_deref(), self.name.as_deref()])
    }

    /// Movies carry `release_date`, series carry `first_air_date`.
    pub fn display_date(&self) -> Option<&str> {
        first_present([self.release_date.as_deref(), self.first_air_date.as_deref()])
    }
}

/// First candidate that is present and non-empty.
pub fn first_present<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
}

/// Pull the `results` array out of a raw trending response.
pub fn parse_trending_results(payload: &Value) -> Vec<TrendingRecord> {
    payload
        .get("results")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(TrendingRecord::from_value).collect())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub id: Option<i64>,
    pub media_type: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub original_language: Option<String>,
    pub genres: String,
}

pub const NORMALIZED_COLUMNS: [&str; 9] = [
    "id",
    "media_type",
    "title",
    "date",
    "popularity",
    "vote_average",
    "vote_count",
    "original_language",
    "genres",
];

impl NormalizedRow {
    pub fn from_record(record: &TrendingRecord, genres: &GenreMap) -> Self {
        NormalizedRow {
            id: record.id,
            media_type: record.media_type.clone(),
            title: record.display_title().map(str::to_string),
            date: record.display_date().map(str::to_string),
            popularity: record.popularity,
            vote_average: record.vote_average,
            vote_count: record.vote_count,
            original_language: record.original_language.clone(),
            genres: resolve_genre_names(&record.genre_ids, genres),
        }
    }

    /// Resolved genre names, in their original order.
    pub fn genre_list(&self) -> impl Iterator<Item = &str> {
        self.genres
            .split(';')
            .map(str::trim)
            .filter(|genre| !genre.is_empty())
    }
}

impl TableRow for NormalizedRow {
    fn headers() -> Vec<&'static str> {
        NORMALIZED_COLUMNS.to_vec()
    }

    fn fields(&self) -> Vec<String> {
        vec![
            opt_field(self.id),
            opt_field(self.media_type.as_deref()),
            opt_field(self.title.as_deref()),
            opt_field(self.date.as_deref()),
            opt_float(self.popularity),
            opt_float(self.vote_average),
            opt_field(self.vote_count),
            opt_field(self.original_language.as_deref()),
            self.genres.clone(),
        ]
    }
}

fn opt_field<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Floats always carry a fractional part (`20.0`, not `20`).
fn opt_float(value: Option<f64>) -> String {
    value.map(|v| format!("{v:?}")).unwrap_or_default()
}

/// Resolve each id on its own. Ids without a name, and entries that are not
/// ids at all, are kept as their own string form rather than dropped.
pub fn resolve_genre_names(ids: &[Value], genres: &GenreMap) -> String {
    ids.iter()
        .map(|raw| match genre_key(raw) {
            Some(key) => genres
                .name(key)
                .map(str::to_string)
                .unwrap_or_else(|| key.to_string()),
            None => match raw {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            },
        })
        .collect::<Vec<_>>()
        .join(GENRE_SEPARATOR)
}

/// Integer ids, including integral floats such as `12.0`.
fn genre_key(raw: &Value) -> Option<i64> {
    if let Some(key) = raw.as_i64() {
        return Some(key);
    }
    raw.as_f64()
        .filter(|value| value.fract() == 0.0 && value.abs() < i64::MAX as f64)
        .map(|value| value as i64)
}

/// Normalize every record and order the table by popularity, highest first.
///
/// No record is dropped. The sort is stable, so equal popularity keeps input
/// order; rows without a usable popularity sink to the bottom.
pub fn normalize(records: &[TrendingRecord], genres: &GenreMap) -> Vec<NormalizedRow> {
    let mut rows: Vec<NormalizedRow> = records
        .iter()
        .map(|record| NormalizedRow::from_record(record, genres))
        .collect();
    rows.sort_by(|a, b| compare_popularity_desc(a.popularity, b.popularity));
    rows
}

fn compare_popularity_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.filter(|value| !value.is_nan());
    let b = b.filter(|value| !value.is_nan());
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A normalized row repeated once per genre name.
#[derive(Debug, Clone, PartialEq)]
pub struct GenreExpandedRow<'a> {
    pub row: &'a NormalizedRow,
    pub genre: &'a str,
}

impl TableRow for GenreExpandedRow<'_> {
    fn headers() -> Vec<&'static str> {
        let mut headers = NORMALIZED_COLUMNS.to_vec();
        headers.push("genre");
        headers
    }

    fn fields(&self) -> Vec<String> {
        let mut fields = self.row.fields();
        fields.push(self.genre.to_string());
        fields
    }
}

/// One output row per genre; a row without genres is kept once with an empty
/// `genre`.
pub fn expand_by_genre(rows: &[NormalizedRow]) -> Vec<GenreExpandedRow<'_>> {
    let mut expanded = Vec::with_capacity(rows.len());
    for row in rows {
        let before = expanded.len();
        expanded.extend(row.genre_list().map(|genre| GenreExpandedRow { row, genre }));
        if expanded.len() == before {
            expanded.push(GenreExpandedRow { row, genre: "" });
        }
    }
    expanded
}
