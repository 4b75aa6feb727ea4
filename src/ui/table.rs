//! Column-aligned tables.

use console::{measure_text_width, pad_str, Alignment};

/// A box-drawn table.
///
/// Widths are measured on display width, so styled cells line up.
#[derive(Debug)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    widths: Vec<usize>,
}

impl Table {
    /// Create a new table with the given headers.
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            widths: headers.iter().map(|h| measure_text_width(h)).collect(),
        }
    }

    /// Add a row. Missing cells render empty; extra cells are dropped.
    pub fn add_row<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
        row.resize(self.headers.len(), String::new());
        for (width, cell) in self.widths.iter_mut().zip(&row) {
            *width = (*width).max(measure_text_width(cell));
        }
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the table as a string without a trailing newline.
    pub fn render(&self) -> String {
        let mut lines = vec![self.border('┌', '┬', '┐'), self.line(&self.headers)];
        lines.push(self.border('├', '┼', '┤'));
        lines.extend(self.rows.iter().map(|row| self.line(row)));
        lines.push(self.border('└', '┴', '┘'));
        lines.join("\n")
    }

    fn border(&self, left: char, mid: char, right: char) -> String {
        let segments: Vec<String> = self.widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}", left, segments.join(&mid.to_string()), right)
    }

    fn line(&self, cells: &[String]) -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&self.widths)
            .map(|(cell, width)| format!(" {} ", pad_str(cell, *width, Alignment::Left, None)))
            .collect();
        format!("│{}│", padded.join("│"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_renders_headers() {
        let table = Table::new(&["Name", "Version"]);
        assert!(table.is_empty());
        let output = table.render();
        assert!(output.contains("Name"));
        assert_eq!(output.lines().count(), 4);
    }

    #[test]
    fn rows_widen_columns() {
        let mut table = Table::new(&["Name", "Version"]);
        table.add_row(["ripgrep", "14.1.0"]);
        table.add_row(["fd", "v10.2.0-nightly"]);

        let output = table.render();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], "│ Name    │ Version         │");
        assert_eq!(lines[3], "│ ripgrep │ 14.1.0          │");
        assert!(lines.iter().all(|l| measure_text_width(l) == measure_text_width(lines[0])));
    }

    #[test]
    fn missing_and_extra_cells() {
        let mut table = Table::new(&["A", "B", "C"]);
        table.add_row(["only"]);
        table.add_row(["1", "2", "3", "4"]);
        assert_eq!(table.row_count(), 2);
        assert!(!table.render().contains('4'));
    }

    #[test]
    fn styled_cells_align() {
        let mut table = Table::new(&["Status"]);
        table.add_row([console::style("ok").green().force_styling(true).to_string()]);
        let output = table.render();
        let widths: Vec<_> = output.lines().map(measure_text_width).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }
}
