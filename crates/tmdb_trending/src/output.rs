use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::RunOptions;
use crate::error::TrendingError;
use crate::normalize::NormalizedRow;

pub const PREVIEW_ROWS: usize = 10;
const PREVIEW_CELL_MAX_CHARS: usize = 32;

/// Where each artifact of one run lands inside the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub raw_trending: PathBuf,
    pub genres: PathBuf,
    pub clean: PathBuf,
    pub by_genre: PathBuf,
    pub history: PathBuf,
    pub cast: PathBuf,
}

impl ArtifactPaths {
    pub fn new(data_dir: &Path, options: &RunOptions, stamp: &str) -> Self {
        let prefix = format!("trending_{}_{}", options.media, options.window);
        ArtifactPaths {
            raw_trending: data_dir.join(format!("{prefix}_raw_{stamp}.json")),
            genres: data_dir.join("genres.json"),
            clean: data_dir.join(format!("{prefix}_clean_{stamp}.csv")),
            by_genre: data_dir.join(format!("{prefix}_by_genre_{stamp}.csv")),
            history: data_dir.join(format!("{prefix}_history.csv")),
            cast: data_dir.join(format!("sample_cast_counts_{stamp}.csv")),
        }
    }
}

/// A row that can be written as CSV and previewed on stdout.
pub trait TableRow {
    fn headers() -> Vec<&'static str>;
    fn fields(&self) -> Vec<String>;
}

/// A normalized row tagged with the run's date stamp.
#[derive(Debug, Clone)]
pub struct HistoryRow<'a> {
    pub row: &'a NormalizedRow,
    pub week: &'a str,
}

impl TableRow for HistoryRow<'_> {
    fn headers() -> Vec<&'static str> {
        let mut headers = NormalizedRow::headers();
        headers.push("week");
        headers
    }

    fn fields(&self) -> Vec<String> {
        let mut fields = self.row.fields();
        fields.push(self.week.to_string());
        fields
    }
}

/// Pretty-printed JSON, swapped into place once fully written.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), TrendingError> {
    let serialized = serde_json::to_string_pretty(value)?;
    let temp_path = build_temp_path(path);
    fs::write(&temp_path, format!("{serialized}\n"))?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Header plus one record per row; an empty slice still yields the header.
pub fn write_table_csv<R: TableRow>(path: &Path, rows: &[R]) -> Result<(), TrendingError> {
    let temp_path = build_temp_path(path);
    {
        let mut writer = csv::Writer::from_path(&temp_path)?;
        writer.write_record(R::headers())?;
        for row in rows {
            writer.write_record(row.fields())?;
        }
        writer.flush()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Append rows, writing the header only when the file is new or empty.
///
/// The existing contents are copied into a temp file together with the new
/// rows, so the live file is only ever replaced whole.
pub fn append_table_csv<R: TableRow>(path: &Path, rows: &[R]) -> Result<(), TrendingError> {
    let mut existing = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(err) => return Err(err.into()),
    };
    let needs_header = existing.is_empty();
    if !needs_header && !existing.ends_with(b"\n") {
        existing.push(b'\n');
    }

    let temp_path = build_temp_path(path);
    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(&existing)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(R::headers())?;
        }
        for row in rows {
            writer.write_record(row.fields())?;
        }
        writer.flush()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Render the first `limit` rows as a left-aligned text table.
pub fn render_preview<R: TableRow>(rows: &[R], limit: usize) -> String {
    let headers: Vec<String> = R::headers().into_iter().map(str::to_string).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .take(limit)
        .map(|row| row.fields().into_iter().map(|cell| clip(&cell)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for cells in &body {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &headers, &widths);
    if body.is_empty() {
        out.push_str("(no rows)\n");
    }
    for cells in &body {
        push_line(&mut out, cells, &widths);
    }
    if rows.len() > limit {
        out.push_str(&format!("... {} more rows\n", rows.len() - limit));
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn clip(cell: &str) -> String {
    if cell.chars().count() <= PREVIEW_CELL_MAX_CHARS {
        return cell.to_string();
    }
    let mut clipped: String = cell.chars().take(PREVIEW_CELL_MAX_CHARS - 1).collect();
    clipped.push('…');
    clipped
}

/// Write a saved table's location and its first rows.
pub fn print_table<W: Write, R: TableRow>(
    out: &mut W,
    label: &str,
    path: &Path,
    rows: &[R],
) -> io::Result<()> {
    writeln!(out, "Saved {label} to {}", display_path(path).display())?;
    write!(out, "{}", render_preview(rows, PREVIEW_ROWS))
}

fn display_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn build_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => {
            temp_path.set_extension(format!("{ext}.tmp"));
        }
        _ => {
            temp_path.set_extension("tmp");
        }
    }
    temp_path
}
