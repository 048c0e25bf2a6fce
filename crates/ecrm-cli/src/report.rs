//! Summary report rendering.

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use ecrm_core::RepositorySummary;
use owo_colors::OwoColorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format for the summary report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns.
    #[default]
    Table,
    /// Pretty-printed JSON array.
    Json,
}

/// Receives repository summaries once evaluation is done.
pub trait ReportSink {
    /// Renders the summaries, already sorted by repository.
    fn summaries(&mut self, summaries: &[RepositorySummary]) -> Result<()>;
}

/// Writes the report to any writer.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
    format: OutputFormat,
    color: bool,
}

impl<W: Write> WriterSink<W> {
    /// Creates a sink.
    pub const fn new(writer: W, format: OutputFormat, color: bool) -> Self {
        Self {
            writer,
            format,
            color,
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for WriterSink<W> {
    fn summaries(&mut self, summaries: &[RepositorySummary]) -> Result<()> {
        let rendered = match self.format {
            OutputFormat::Table => render_table(summaries, self.color),
            OutputFormat::Json => serde_json::to_string_pretty(summaries)?,
        };
        writeln!(self.writer, "{rendered}")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Tabled)]
struct SummaryRow {
    repository: String,
    total: String,
    expired: String,
    keep: String,
}

impl SummaryRow {
    fn new(summary: &RepositorySummary, color: bool) -> Self {
        let expired = if summary.expired_images == 0 {
            String::new()
        } else {
            let cell = format!(
                "-{} ({})",
                summary.expired_images,
                human_bytes(summary.expired_image_size)
            );
            if color {
                cell.blue().to_string()
            } else {
                cell
            }
        };

        let keep = format!(
            "{} ({})",
            summary.kept_images(),
            human_bytes(summary.kept_image_size())
        );
        let keep = if color && summary.kept_images() == 0 {
            keep.yellow().to_string()
        } else {
            keep
        };

        Self {
            repository: summary.repository.clone(),
            total: format!(
                "{} ({})",
                summary.total_images,
                human_bytes(summary.total_image_size)
            ),
            expired,
            keep,
        }
    }
}

/// Renders summaries as a borderless table.
pub fn render_table(summaries: &[RepositorySummary], color: bool) -> String {
    let rows = summaries.iter().map(|s| SummaryRow::new(s, color));
    Table::new(rows).with(Style::blank()).to_string()
}

const UNITS: [&str; 7] = ["B", "kB", "MB", "GB", "TB", "PB", "EB"];

/// Formats a byte count in SI units, e.g. `1.2 GB`.
///
/// Values under ten keep one decimal.
#[allow(clippy::cast_precision_loss)]
pub fn human_bytes(bytes: u64) -> String {
    if bytes < 10 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    let rounded = (value * 10.0 + 0.5).floor() / 10.0;
    if rounded < 10.0 {
        format!("{rounded:.1} {}", UNITS[unit])
    } else {
        format!("{rounded:.0} {}", UNITS[unit])
    }
}
