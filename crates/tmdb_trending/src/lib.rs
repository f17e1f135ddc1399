pub mod cast;
pub mod client;
pub mod config;
pub mod error;
pub mod genres;
pub mod logging;
pub mod normalize;
pub mod output;

use std::io::{self, Write};

use chrono::Utc;
use tracing::{info, warn};

use cast::{CastCount, sample_cast};
use client::{CatalogClient, CatalogSource, fetch_trending};
use config::{AppConfig, CliArgs};
use error::TrendingError;
use genres::resolve_genres;
use logging::{LoggingDestination, init_logging};
use normalize::{NormalizedRow, expand_by_genre, normalize, parse_trending_results};
use output::{
    ArtifactPaths, HistoryRow, append_table_csv, print_table, write_json_pretty, write_table_csv,
};

/// Everything one run produced.
#[derive(Debug)]
pub struct RunOutput {
    pub paths: ArtifactPaths,
    pub rows: Vec<NormalizedRow>,
    /// `None` when the cast stage was skipped.
    pub cast: Option<Vec<CastCount>>,
}

pub fn run(cli: CliArgs) -> Result<RunOutput, TrendingError> {
    let config = cli.resolve()?;
    init_logging(LoggingDestination::FileAndStderr, &config.paths.data_dir)?;

    let client = CatalogClient::new(&config.tunables)?;
    let stamp = Utc::now().format("%Y-%m-%d").to_string();
    let output = run_pipeline(&client, &config, &stamp)?;

    let mut stdout = io::stdout().lock();
    print_table(&mut stdout, "clean trending CSV", &output.paths.clean, &output.rows)?;
    if let Some(cast) = &output.cast {
        print_table(&mut stdout, "sample cast counts", &output.paths.cast, cast)?;
    }
    writeln!(stdout, "Raw trending JSON: {}", output.paths.raw_trending.display())?;
    writeln!(stdout, "By-genre CSV: {}", output.paths.by_genre.display())?;
    writeln!(stdout, "History CSV: {}", output.paths.history.display())?;

    Ok(output)
}

/// Fetch, normalize and persist one trending snapshot.
///
/// Each artifact is written only after the requests it depends on have
/// succeeded; the first remote error aborts the run.
pub fn run_pipeline<S: CatalogSource>(
    source: &S,
    config: &AppConfig,
    stamp: &str,
) -> Result<RunOutput, TrendingError> {
    let options = &config.options;
    let paths = ArtifactPaths::new(&config.paths.data_dir, options, stamp);

    let raw = fetch_trending(source, options.media, options.window)?;
    write_json_pretty(&paths.raw_trending, &raw)?;
    info!(path = %paths.raw_trending.display(), "Saved raw trending response");

    let genres = resolve_genres(source)?;
    match write_json_pretty(&paths.genres, &genres) {
        Ok(()) => info!(path = %paths.genres.display(), genres = genres.len(), "Saved genre map"),
        Err(err) => warn!(path = %paths.genres.display(), error = %err, "Could not save genre map"),
    }

    let records = parse_trending_results(&raw);
    let rows = normalize(&records, &genres);
    write_table_csv(&paths.clean, &rows)?;
    info!(rows = rows.len(), path = %paths.clean.display(), "Saved normalized trending table");

    let expanded = expand_by_genre(&rows);
    write_table_csv(&paths.by_genre, &expanded)?;

    let history: Vec<HistoryRow<'_>> = rows
        .iter()
        .map(|row| HistoryRow { row, week: stamp })
        .collect();
    append_table_csv(&paths.history, &history)?;
    info!(
        expanded = expanded.len(),
        history = %paths.history.display(),
        "Saved by-genre table and appended history"
    );

    let cast = if rows.is_empty() || options.cast_sample == 0 {
        info!("Skipping cast sample");
        None
    } else {
        let sample_size = options.cast_sample.min(rows.len());
        let tally = sample_cast(source, &rows, sample_size, config.tunables.cast_delay)?;
        let sorted = tally.into_sorted();
        write_table_csv(&paths.cast, &sorted)?;
        Some(sorted)
    };

    Ok(RunOutput { paths, rows, cast })
}
