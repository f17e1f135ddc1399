use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::client::CatalogSource;
use crate::error::TrendingError;

const MOVIE_GENRES_PATH: &str = "/genre/movie/list";
const TV_GENRES_PATH: &str = "/genre/tv/list";

/// Genre id to display name, merged across the movie and TV taxonomies.
///
/// Serializes as a JSON object keyed by the stringified id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GenreMap(BTreeMap<i64, String>);

impl GenreMap {
    /// Merge taxonomies in order; a later taxonomy overrides an earlier one on
    /// a shared id.
    pub fn merge<I>(taxonomies: I) -> Self
    where
        I: IntoIterator<Item = Vec<Genre>>,
    {
        let mut map = BTreeMap::new();
        for taxonomy in taxonomies {
            for genre in taxonomy {
                map.insert(genre.id, genre.name);
            }
        }
        GenreMap(map)
    }

    pub fn name(&self, id: i64) -> Option<&str> {
        self.0.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(i64, String)> for GenreMap {
    fn from_iter<T: IntoIterator<Item = (i64, String)>>(iter: T) -> Self {
        GenreMap(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct GenreListResponse {
    #[serde(default)]
    genres: Vec<Genre>,
}

/// Fetch the movie taxonomy, then the TV taxonomy, and merge them with TV
/// names winning on collisions.
pub fn resolve_genres<S: CatalogSource>(source: &S) -> Result<GenreMap, TrendingError> {
    let movie = fetch_taxonomy(source, MOVIE_GENRES_PATH)?;
    let tv = fetch_taxonomy(source, TV_GENRES_PATH)?;
    info!(movie = movie.len(), tv = tv.len(), "Fetched genre taxonomies");
    Ok(GenreMap::merge([movie, tv]))
}

fn fetch_taxonomy<S: CatalogSource>(source: &S, path: &str) -> Result<Vec<Genre>, TrendingError> {
    let payload: Value = source.fetch_json(path, &[])?;
    let response: GenreListResponse = serde_json::from_value(payload)?;
    Ok(response.genres)
}
