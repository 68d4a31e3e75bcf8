//! Output table: one row per screening, ordered by room, date and time.

use crate::{CrawlError, ScreeningRow};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DELIMITER: char = ';';

pub const HEADER: [&str; 12] = [
    "cinema",
    "room",
    "room_label",
    "film_id",
    "film_title",
    "date",
    "time",
    "version",
    "audio",
    "showtime_id",
    "ts",
    "reservation_url",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// Room, then date, then time; plain string order on each.
pub fn compare_rows(a: &ScreeningRow, b: &ScreeningRow) -> Ordering {
    a.room
        .cmp(&b.room)
        .then_with(|| a.date.cmp(&b.date))
        .then_with(|| a.time.cmp(&b.time))
}

pub fn sort_rows(rows: &mut [ScreeningRow]) {
    rows.sort_by(compare_rows);
}

/// Quote a field when it holds the delimiter, a quote or a line break.
pub fn escape_field(field: &str) -> String {
    if field.contains([DELIMITER, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn record(row: &ScreeningRow) -> [String; 12] {
    [
        row.cinema.clone(),
        row.room.clone(),
        row.room_label.clone(),
        row.film_id.clone(),
        row.film_title.clone(),
        row.date.clone(),
        row.time.clone(),
        row.version.clone(),
        row.audio.clone(),
        row.showtime_id.clone(),
        row.ts.map(|ts| ts.to_string()).unwrap_or_default(),
        row.reservation_url.clone(),
    ]
}

pub fn render_csv(rows: &[ScreeningRow]) -> String {
    let sep = DELIMITER.to_string();
    let mut out = HEADER.join(&sep);
    out.push('\n');
    for row in rows {
        let fields: Vec<String> = record(row).iter().map(|f| escape_field(f)).collect();
        out.push_str(&fields.join(&sep));
        out.push('\n');
    }
    out
}

pub fn render_json(rows: &[ScreeningRow]) -> Result<String, CrawlError> {
    Ok(serde_json::to_string_pretty(rows)?)
}

/// Write rows to `path`, creating missing parent directories.
pub fn write_report(
    path: &Path,
    rows: &[ScreeningRow],
    format: OutputFormat,
) -> Result<(), CrawlError> {
    let content = match format {
        OutputFormat::Csv => render_csv(rows),
        OutputFormat::Json => render_json(rows)?,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Screenings per room, rooms in report order.
pub fn room_summary(rows: &[ScreeningRow]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.room.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(room, n)| (room.to_string(), n))
        .collect()
}
