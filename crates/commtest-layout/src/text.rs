//! Plain-text rendering for terminal inspection.

use crate::flat::{RenderedCell, RenderedInput, RenderedTable, PLACEHOLDER};
use crate::key::RawValue;
use crate::nested::{RenderedGrid, SlotBody};

/// Shown for a table-typed input whose layout is absent.
pub const MISSING_LAYOUT: &str = "configuration not found";

fn input_text(input: &RenderedInput) -> String {
    let value = match &input.value {
        Some(RawValue::Boolean(true)) => "Yes".to_string(),
        Some(RawValue::Boolean(false)) => "No".to_string(),
        Some(RawValue::Text(t)) if !t.trim().is_empty() => t.clone(),
        _ => "_".to_string(),
    };
    let mut out = match &input.unit {
        Some(unit) => format!("{value} {unit}"),
        None => value,
    };
    if let Some(err) = &input.error {
        out.push_str(&format!(" !{err}"));
    }
    out
}

#[must_use]
pub fn table_to_text(table: &RenderedTable) -> String {
    let mut grid: Vec<Vec<String>> = Vec::with_capacity(table.rows.len() + 1);
    let mut head = vec![String::new()];
    head.extend(table.columns.iter().cloned());
    grid.push(head);
    for row in &table.rows {
        let mut line = vec![row.name.clone()];
        line.extend(row.cells.iter().map(|cell| match cell {
            RenderedCell::Placeholder => PLACEHOLDER.to_string(),
            RenderedCell::Input(input) => input_text(input),
        }));
        grid.push(line);
    }
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..width)
        .map(|i| {
            grid.iter()
                .filter_map(|line| line.get(i))
                .map(|s| s.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();
    let mut out = String::new();
    for header in &table.header_rows {
        out.push_str(header);
        out.push('\n');
    }
    for line in grid {
        let padded: Vec<String> = line
            .iter()
            .zip(&widths)
            .map(|(s, w)| format!("{s:<w$}", w = *w))
            .collect();
        out.push_str(padded.join(" | ").trim_end());
        out.push('\n');
    }
    out
}

#[must_use]
pub fn grid_to_text(grid: &RenderedGrid) -> String {
    let mut out = String::new();
    write_grid(grid, 0, &mut out);
    out
}

fn write_grid(grid: &RenderedGrid, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    out.push_str(&format!("{pad}grid {}x{}\n", grid.rows, grid.columns));
    for header in &grid.header_rows {
        out.push_str(&format!("{pad}# {header}\n"));
    }
    for slot in &grid.slots {
        let span = if slot.row_span > 1 || slot.col_span > 1 {
            format!(" [{}x{}]", slot.row_span, slot.col_span)
        } else {
            String::new()
        };
        let head = format!("{pad}{}{span}", slot.position);
        match &slot.body {
            SlotBody::Empty => out.push_str(&format!("{head}\n")),
            SlotBody::Header { text } => out.push_str(&format!("{head} {text}\n")),
            SlotBody::Input(input) => {
                let label = input.label.as_deref().unwrap_or(&input.key);
                out.push_str(&format!("{head} {label}: {}\n", input_text(input)));
            }
            SlotBody::Nested(inner) => {
                out.push_str(&format!("{head}\n"));
                write_grid(inner, indent + 1, out);
            }
            SlotBody::DepthLimit => out.push_str(&format!("{head} (nesting limit)\n")),
        }
    }
}
