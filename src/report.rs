use crate::declare::{Column, StationRecord};

/// 主控台顯示的欄位
const DISPLAY_COLUMNS: [Column; 7] = [
    Column::City,
    Column::Name,
    Column::Brand,
    Column::Diesel,
    Column::E5,
    Column::E10,
    Column::Dist,
];

const TITLE: &str = "===== CURRENT PRICES =====";
const FOOTER: &str = "==========================";

/// Formats the snapshot as a plain text table.
///
/// Only display columns that are part of `layout` are shown. Text columns are
/// left aligned, numbers right aligned and missing values print as `-`.
pub fn render(snapshot: &[StationRecord], layout: &[Column]) -> String {
    let columns: Vec<Column> = DISPLAY_COLUMNS
        .into_iter()
        .filter(|column| layout.contains(column))
        .collect();

    let rows: Vec<Vec<String>> = snapshot
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| {
                    let cell = record.cell(*column);
                    if cell.is_empty() {
                        "-".to_string()
                    } else {
                        cell
                    }
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.as_ref().chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::with_capacity((rows.len() + 4) * 80);
    out.push('\n');
    out.push_str(TITLE);
    out.push('\n');

    let header: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
    out.push_str(&format_row(&columns, &header, &widths));
    for row in &rows {
        out.push_str(&format_row(&columns, row, &widths));
    }

    out.push_str(FOOTER);
    out.push('\n');
    out
}

fn format_row(columns: &[Column], cells: &[String], widths: &[usize]) -> String {
    let line = columns
        .iter()
        .zip(cells)
        .zip(widths)
        .map(|((column, cell), width)| {
            if is_numeric(*column) {
                format!("{:>width$}", cell, width = width)
            } else {
                format!("{:<width$}", cell, width = width)
            }
        })
        .collect::<Vec<String>>()
        .join("  ");

    format!("{}\n", line.trim_end())
}

fn is_numeric(column: Column) -> bool {
    matches!(
        column,
        Column::Diesel | Column::E5 | Column::E10 | Column::Dist
    )
}
