use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::TrendingError;

pub const TOKEN_ENV: &str = "TMDB_V4_TOKEN";
pub const DEFAULT_API_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CAST_DELAY_MS: u64 = 200;

/// CLI surface for the trending snapshot tool.
#[derive(Debug, Parser, Clone)]
#[command(
    author,
    version,
    about = "Fetch trending TMDB titles and write normalized CSV snapshots"
)]
pub struct CliArgs {
    /// Trending category to fetch.
    #[arg(long = "media", value_enum, default_value_t = TrendingScope::All)]
    pub media: TrendingScope,

    /// Trending time window.
    #[arg(long = "window", value_enum, default_value_t = TimeWindow::Week)]
    pub window: TimeWindow,

    /// Number of top titles to pull credits for (0 disables cast sampling).
    #[arg(long = "cast-sample", value_name = "N", default_value_t = 8)]
    pub cast_sample: usize,

    /// Directory receiving raw JSON, CSV tables and logs.
    #[arg(long = "data-dir", value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,
}

/// Path segment of `/trending/{media_type}/{time_window}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TrendingScope {
    All,
    Movie,
    Tv,
}

impl TrendingScope {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendingScope::All => "all",
            TrendingScope::Movie => "movie",
            TrendingScope::Tv => "tv",
        }
    }
}

impl fmt::Display for TrendingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimeWindow {
    Day,
    Week,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct Tunables {
    pub api_base: String,
    pub api_token: String,
    pub request_timeout: Duration,
    pub cast_delay: Duration,
}

impl fmt::Debug for Tunables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tunables")
            .field("api_base", &self.api_base)
            .field("api_token", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("cast_delay", &self.cast_delay)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
}

/// What to fetch on this run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub media: TrendingScope,
    pub window: TimeWindow,
    pub cast_sample: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub paths: Paths,
    pub tunables: Tunables,
    pub options: RunOptions,
}

impl CliArgs {
    /// Resolves paths and tunables. The credential check happens here, before
    /// any directory is created or request is issued.
    pub fn resolve(self) -> Result<AppConfig, TrendingError> {
        let tunables = Tunables::from_env()?;

        let data_dir = resolve_path(&self.data_dir)?;
        ensure_directory(&data_dir)?;

        Ok(AppConfig {
            paths: Paths { data_dir },
            tunables,
            options: RunOptions {
                media: self.media,
                window: self.window,
                cast_sample: self.cast_sample,
            },
        })
    }
}

impl Tunables {
    pub fn from_env() -> Result<Self, TrendingError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, TrendingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_token = lookup(TOKEN_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                TrendingError::config(format!(
                    "set environment variable {TOKEN_ENV} to your TMDB v4 read access token"
                ))
            })?;

        let api_base = lookup("TMDB_API_BASE")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let timeout_secs = parse_u64(&lookup, "TMDB_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let cast_delay_ms = parse_u64(&lookup, "TMDB_CAST_DELAY_MS", DEFAULT_CAST_DELAY_MS)?;

        Ok(Self {
            api_base,
            api_token,
            request_timeout: Duration::from_secs(timeout_secs),
            cast_delay: Duration::from_millis(cast_delay_ms),
        })
    }
}

fn parse_u64<F>(lookup: &F, var: &str, default: u64) -> Result<u64, TrendingError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => value.trim().parse::<u64>().map_err(|err| {
            TrendingError::config(format!("invalid value for {}: {}", var, err))
        }),
        None => Ok(default),
    }
}

/// Relative paths are taken from the directory the tool was started in.
fn resolve_path(path: &Path) -> Result<PathBuf, TrendingError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

fn ensure_directory(path: &Path) -> Result<(), TrendingError> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
