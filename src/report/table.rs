//! Results table: one row per saved result, columns sized to their widest
//! value, long headings wrapped over two lines.

use crate::models::{display_opt, Traceback, VerificationResult};

/// Leading column when no order is given
pub const DEFAULT_COLUMN_ORDER: &[&str] = &["Step"];

/// Legend printed under the table when the debug columns are shown
pub const EXTRA_LEGEND: &str = "Extra fields: type.raise_immediately.printed.raised";

pub type Row = Vec<(&'static str, String)>;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Y"
    } else {
        "N"
    }
}

/// Table cells of one result; `extra` adds the debug columns.
pub fn result_row(
    index: usize,
    result: &VerificationResult,
    tracebacks: &[Traceback],
    extra: bool,
) -> Row {
    let mut row = vec![
        ("Step", display_opt(&result.step)),
        ("Message", result.message.clone()),
        ("Status", result.status.to_string()),
    ];
    if !extra {
        return row;
    }

    let raised = match result.traceback.and_then(|i| tracebacks.get(i)) {
        Some(traceback) => yes_no(traceback.raised),
        None => "-",
    };
    row.extend([
        ("Class", display_opt(&result.class_name)),
        ("Module", display_opt(&result.module)),
        ("Phase", display_opt(&result.phase)),
        ("Scope", display_opt(&result.scope)),
        ("Fixture Name", display_opt(&result.fixture_name)),
        ("Test Function", display_opt(&result.test_function)),
        ("ID", index.to_string()),
        ("Tb ID", display_opt(&result.traceback)),
        (
            "Extra",
            format!(
                "{}.{}.{}.{}",
                result.type_code,
                yes_no(result.raise_immediately),
                yes_no(result.printed),
                raised
            ),
        ),
    ]);
    row
}

/// Two heading lines for `key` and the resulting column width.
///
/// A key longer than its widest value is split at the space or `/`
/// closest to its middle, when it has one.
pub fn heading(key: &str, value_width: usize) -> ([String; 2], usize) {
    let key_width = key.chars().count();
    if key_width <= value_width {
        return ([key.to_string(), String::new()], value_width);
    }

    let centre = key.len() / 2;
    let split = key
        .match_indices(' ')
        .chain(key.match_indices('/'))
        .map(|(i, _)| i)
        .min_by_key(|i| i.abs_diff(centre));

    match split {
        Some(split) => {
            let first = key[..=split].trim().to_string();
            let second = key[split + 1..].to_string();
            let width = first.chars().count().max(second.chars().count()).max(value_width);
            ([first, second], width)
        }
        None => ([key.to_string(), String::new()], key_width),
    }
}

/// Render rows as table lines, with the keys in `column_order` first.
pub fn render(rows: &[Row], column_order: &[&str]) -> Vec<String> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    let mut keys: Vec<&str> = column_order
        .iter()
        .copied()
        .filter(|key| first.iter().any(|(k, _)| k == key))
        .collect();
    keys.extend(
        first
            .iter()
            .map(|(k, _)| *k)
            .filter(|k| !column_order.contains(k)),
    );

    let columns: Vec<([String; 2], usize)> = keys
        .iter()
        .map(|key| {
            let value_width = rows
                .iter()
                .filter_map(|row| cell(row, key))
                .map(|value| value.chars().count())
                .max()
                .unwrap_or(0);
            heading(key, value_width)
        })
        .collect();

    for (key, (_, width)) in keys.iter().zip(&columns) {
        tracing::debug!(target: "soft_verify::print_saved", column = %key, width, "column width");
    }

    let line_length: usize = columns.iter().map(|(_, width)| width + 3).sum::<usize>() + 1;
    let mut lines = vec!["_".repeat(line_length)];

    for heading_line in 0..2 {
        let mut line = String::new();
        for (heading, width) in &columns {
            line.push_str(&format!("| {:^w$} ", heading[heading_line], w = *width));
        }
        line.push('|');
        lines.push(line);
    }

    let mut separator = String::new();
    for (_, width) in &columns {
        separator.push_str(&format!("|-{}-", "-".repeat(*width)));
    }
    separator.push('|');
    lines.push(separator);

    for (index, row) in rows.iter().enumerate() {
        let mut line = String::new();
        for (key, (_, width)) in keys.iter().zip(&columns) {
            line.push_str(&format!("| {:^w$} ", cell(row, key).unwrap_or(""), w = *width));
        }
        line.push('|');
        tracing::debug!(target: "soft_verify::print_saved", row = index, "{line}");
        lines.push(line);
    }

    lines
}

fn cell<'r>(row: &'r Row, key: &str) -> Option<&'r str> {
    row.iter()
        .find(|(k, _)| *k == key)
        .map(|(_, value)| value.as_str())
}
