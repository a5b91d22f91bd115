//! Terminal output helpers

use chrono::{DateTime, Local};
use clap::ValueEnum;
use colored::*;
use jcli_core::domain::job::JobStatus;

/// Output format for list commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ListFormat {
    #[default]
    List,
    Table,
}

/// A grid table
///
/// ```text
/// +---+---------+
/// | # | Service |
/// +===+=========+
/// | 1 | api     |
/// +---+---------+
/// ```
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Add a row; missing cells render empty, extra cells are dropped
    pub fn row<I, S>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = cells.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
        self
    }

    pub fn render(&self) -> String {
        let widths: Vec<usize> = (0..self.headers.len())
            .map(|col| {
                self.rows
                    .iter()
                    .map(|row| row[col].chars().count())
                    .chain(std::iter::once(self.headers[col].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let border = |fill: char| {
            let mut line = String::from("+");
            for width in &widths {
                line.extend(std::iter::repeat_n(fill, width + 2));
                line.push('+');
            }
            line
        };
        let line = |cells: &[String]| {
            let mut line = String::from("|");
            for (cell, width) in cells.iter().zip(&widths) {
                line.push_str(&format!(" {:<width$} |", cell, width = width));
            }
            line
        };

        let mut out = vec![border('-'), line(&self.headers), border('=')];
        for row in &self.rows {
            out.push(line(row));
            out.push(border('-'));
        }
        if self.rows.is_empty() {
            out.pop();
            out.push(border('-'));
        }
        out.join("\n")
    }
}

/// Colorize job status for display
pub fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Queued => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Succeeded => status_str.green(),
        JobStatus::Failed => status_str.red(),
        JobStatus::Aborted => status_str.dimmed(),
        JobStatus::Unknown => status_str.magenta(),
    }
}

/// Format milliseconds as `1h 2m 3s`, `2m 3s` or `3.25s`
pub fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{:.2}s", ms as f64 / 1000.0)
    }
}

/// Format a Unix timestamp in milliseconds as local time
pub fn format_timestamp(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "unknown".to_string(),
    }
}

/// The last `n` lines of `text`
///
/// # Returns
/// The tail and whether anything was cut off
pub fn tail_lines(text: &str, n: usize) -> (&str, bool) {
    let trimmed = text.strip_suffix('\n').unwrap_or(text);
    if n == 0 {
        return ("", !trimmed.is_empty());
    }
    match trimmed.rmatch_indices('\n').nth(n - 1) {
        Some((idx, _)) => (&text[idx + 1..], true),
        None => (text, false),
    }
}

/// Print a horizontal rule
pub fn rule() {
    println!("{}", "=".repeat(80).dimmed());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_render() {
        let mut table = Table::new(["#", "Service Name"]);
        table.row(["1", "api"]).row(["2", "collateral-worker"]);

        let expected = "\
+---+-------------------+
| # | Service Name      |
+===+===================+
| 1 | api               |
+---+-------------------+
| 2 | collateral-worker |
+---+-------------------+";
        assert_eq!(table.render(), expected);
    }

    #[test]
    fn test_empty_table_render() {
        let table = Table::new(["Job Name", "Status"]);
        let expected = "\
+----------+--------+
| Job Name | Status |
+----------+--------+";
        assert_eq!(table.render(), expected);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut table = Table::new(["a", "b"]);
        table.row(["x"]);
        assert!(table.render().contains("| x |   |"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(3_250), "3.25s");
        assert_eq!(format_duration(125_000), "2m 5s");
        assert_eq!(format_duration(3_725_000), "1h 2m 5s");
    }

    #[test]
    fn test_tail_lines() {
        let text = "one\ntwo\nthree\n";
        assert_eq!(tail_lines(text, 2), ("two\nthree\n", true));
        assert_eq!(tail_lines(text, 3), (text, false));
        assert_eq!(tail_lines(text, 10), (text, false));
        assert_eq!(tail_lines("a\nb", 1), ("b", true));
        assert_eq!(tail_lines("", 5), ("", false));
    }
}
