use std::fmt::Write as _;

use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::column::{Column, Row};
use crate::table::Table;

const COLUMN_GAP: usize = 2;

/// Printable state of one column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSnapshot {
    pub title: String,
    pub headers: Vec<String>,
    pub collapsed: bool,
    pub rows: Vec<Row>,
}

impl ColumnSnapshot {
    pub fn new(column: &dyn Column, table: &Table) -> Self {
        Self {
            title: column.title().to_owned(),
            headers: column.headers().iter().map(|h| (*h).to_owned()).collect(),
            collapsed: table.is_collapsed(),
            rows: table.rows().to_vec(),
        }
    }
}

/// Render every column as an aligned plain-text table.
///
/// Collapsed columns are a single `▼ Title` line.
pub fn render_text(columns: &[ColumnSnapshot]) -> String {
    let mut out = String::new();
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_column(&mut out, column);
    }
    out
}

pub fn render_json(columns: &[ColumnSnapshot]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(columns)
}

fn render_column(out: &mut String, column: &ColumnSnapshot) {
    if column.collapsed || column.rows.is_empty() {
        let _ = writeln!(out, "▼ {}", column.title);
        return;
    }
    let _ = writeln!(out, "▶ {} ({})", column.title, column.rows.len());

    let lines: Vec<Vec<String>> = std::iter::once(column.headers.clone())
        .chain(
            column
                .rows
                .iter()
                .map(|row| row.cells.iter().map(ToString::to_string).collect()),
        )
        .collect();

    let n_cols = lines.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; n_cols];
    for line in &lines {
        for (idx, cell) in line.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(cell.as_str()));
        }
    }

    for (line_idx, line) in lines.iter().enumerate() {
        let marker = match line_idx.checked_sub(1).map(|r| &column.rows[r]) {
            Some(row) if row.selected => "* ",
            _ => "  ",
        };
        let mut text = String::from(marker);
        for (idx, cell) in line.iter().enumerate() {
            text.push_str(cell);
            if idx + 1 < line.len() {
                let pad = widths[idx] - UnicodeWidthStr::width(cell.as_str()) + COLUMN_GAP;
                text.extend(std::iter::repeat_n(' ', pad));
            }
        }
        let _ = writeln!(out, "{}", text.trim_end());
    }
}
