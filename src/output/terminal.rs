//! Box-drawn table output

use std::io::Write;

use anyhow::Result;

use crate::model::Table;

use super::PreviewFormatter;

/// Plain terminal output
pub struct TerminalOutput;

impl TerminalOutput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewFormatter for TerminalOutput {
    fn render(&self, title: &str, table: &Table, writer: &mut dyn Write) -> Result<()> {
        writeln!(writer, "{} ({} rows shown):", title, table.row_count())?;

        let mut data: Vec<Vec<String>> = Vec::with_capacity(table.row_count() + 1);
        data.push(table.columns.iter().map(|c| c.name.clone()).collect());
        for row in &table.rows {
            data.push(row.cells.iter().map(|c| c.display().into_owned()).collect());
        }

        write!(writer, "{}", build_table(&data))?;
        writeln!(writer)?;
        Ok(())
    }
}

/// Build a formatted table from data; the first row is the header
fn build_table(data: &[Vec<String>]) -> String {
    if data.is_empty() || data[0].is_empty() {
        return String::new();
    }

    let col_count = data[0].len();
    let mut col_widths: Vec<usize> = vec![0; col_count];
    for row in data {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            col_widths[i] = col_widths[i].max(cell.chars().count());
        }
    }

    let mut output = String::new();
    push_border(&mut output, &col_widths, '┌', '┬', '┐');
    push_row(&mut output, &data[0], &col_widths);
    push_border(&mut output, &col_widths, '├', '┼', '┤');
    for row in data.iter().skip(1) {
        push_row(&mut output, row, &col_widths);
    }
    push_border(&mut output, &col_widths, '└', '┴', '┘');

    output
}

fn push_border(output: &mut String, widths: &[usize], left: char, mid: char, right: char) {
    output.push(left);
    for (i, width) in widths.iter().enumerate() {
        output.push_str(&"─".repeat(*width + 2));
        if i < widths.len() - 1 {
            output.push(mid);
        }
    }
    output.push(right);
    output.push('\n');
}

fn push_row(output: &mut String, row: &[String], widths: &[usize]) {
    output.push('│');
    for (i, width) in widths.iter().enumerate() {
        let cell = row.get(i).map(String::as_str).unwrap_or("");
        output.push_str(&format!(" {:width$} │", cell, width = width));
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CellValue;

    #[test]
    fn test_render_preview() {
        let mut table = Table::with_column_names(["id", "name"]);
        table.add_row(vec!["1".into(), "Metallica".into()], 2);
        table.add_row(vec!["22".into(), CellValue::Null], 3);

        let mut out = Vec::new();
        TerminalOutput::new().render("artists", &table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "artists (2 rows shown):");
        assert_eq!(lines[1], "┌────┬───────────┐");
        assert_eq!(lines[2], "│ id │ name      │");
        assert_eq!(lines[4], "│ 1  │ Metallica │");
        assert_eq!(lines[5], "│ 22 │ NULL      │");
        assert_eq!(lines[6], "└────┴───────────┘");
    }
}
