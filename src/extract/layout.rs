//! Geometry helpers: turning loose tokens into rows and rows into table cells.

use crate::extract::token::Token;
use crate::text::normalize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default vertical distance, in points, within which tokens share a row.
pub const DEFAULT_Y_TOLERANCE: f64 = 3.0;

/// A visual line of text: tokens sorted left to right.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    tokens: Vec<Token>,
}

impl Row {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The tokens joined by single spaces.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Clusters tokens into rows. Tokens are visited top to bottom, then left to right; a token joins
/// the current row when its vertical centre is within `y_tolerance` of the row's first token.
pub fn group_rows(tokens: &[Token], y_tolerance: f64) -> Vec<Row> {
    let mut sorted: Vec<&Token> = tokens.iter().collect();
    sorted.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0)));

    let mut rows = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut anchor_y = 0.0;
    for token in sorted {
        if current.is_empty() || (token.y_mid() - anchor_y).abs() <= y_tolerance {
            if current.is_empty() {
                anchor_y = token.y_mid();
            }
            current.push(token.clone());
        } else {
            rows.push(finish_row(std::mem::take(&mut current)));
            anchor_y = token.y_mid();
            current.push(token.clone());
        }
    }
    if !current.is_empty() {
        rows.push(finish_row(current));
    }
    rows
}

fn finish_row(mut tokens: Vec<Token>) -> Row {
    tokens.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    Row { tokens }
}

/// The columns of a payroll summary table.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Code,
    Event,
    Quantity,
    Value,
    Employees,
}

impl Column {
    fn from_header_word(normalized: &str) -> Option<Column> {
        if normalized.contains("codigo") {
            Some(Column::Code)
        } else if normalized.contains("evento") {
            Some(Column::Event)
        } else if normalized.contains("quantidade") {
            Some(Column::Quantity)
        } else if normalized.contains("valor") {
            Some(Column::Value)
        } else if normalized.contains("funcionarios") {
            Some(Column::Employees)
        } else {
            None
        }
    }
}

/// The x positions of the column titles of a table header row, sorted left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderAnchors {
    anchors: Vec<(Column, f64)>,
}

impl HeaderAnchors {
    /// Recognizes a table header row: it must name the code, event and value columns. Quantity and
    /// employee-count columns get anchors too when present so their tokens do not leak into the
    /// required columns.
    pub fn detect(row: &Row) -> Option<HeaderAnchors> {
        let mut found: BTreeMap<Column, f64> = BTreeMap::new();
        for token in row.tokens() {
            if let Some(column) = Column::from_header_word(&normalize(&token.text)) {
                found.entry(column).or_insert_with(|| token.x_mid());
            }
        }
        let required = [Column::Code, Column::Event, Column::Value];
        if !required.iter().all(|c| found.contains_key(c)) {
            return None;
        }
        let mut anchors: Vec<(Column, f64)> = found.into_iter().collect();
        anchors.sort_by(|a, b| a.1.total_cmp(&b.1));
        Some(HeaderAnchors { anchors })
    }

    #[cfg(test)]
    pub(crate) fn from_anchors(mut anchors: Vec<(Column, f64)>) -> Self {
        anchors.sort_by(|a, b| a.1.total_cmp(&b.1));
        Self { anchors }
    }

    /// The column whose anchor is closest to `x`. On an exact tie the left-most anchor wins.
    pub fn nearest(&self, x: f64) -> Option<Column> {
        let mut best: Option<(Column, f64)> = None;
        for &(column, anchor) in &self.anchors {
            let distance = (x - anchor).abs();
            match best {
                Some((_, d)) if distance >= d => {}
                _ => best = Some((column, distance)),
            }
        }
        best.map(|(column, _)| column)
    }

    /// Splits a row into cells. Each token goes to its nearest column; the tokens of a cell are
    /// joined left to right.
    pub fn assign(&self, row: &Row) -> Cells {
        let mut cells: BTreeMap<Column, Vec<&str>> = BTreeMap::new();
        for token in row.tokens() {
            if let Some(column) = self.nearest(token.x_mid()) {
                cells.entry(column).or_default().push(token.text.as_str());
            }
        }
        Cells(
            cells
                .into_iter()
                .map(|(column, words)| (column, words.join(" ").trim().to_string()))
                .collect(),
        )
    }
}

/// The text of a table row, by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cells(BTreeMap<Column, String>);

impl Cells {
    /// The cell text, or `""` when no token landed in the column.
    pub fn get(&self, column: Column) -> &str {
        self.0.get(&column).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, x0: f64, top: f64) -> Token {
        Token::new(text, x0, x0 + 20.0, top, top + 8.0)
    }

    #[test]
    fn test_group_rows_by_first_token() {
        let tokens = vec![
            tok("b", 50.0, 101.0),
            tok("a", 10.0, 100.0),
            tok("c", 90.0, 102.9),
            // within 3.0 of "c" but not of "a"
            tok("d", 10.0, 105.5),
            tok("e", 10.0, 120.0),
        ];
        let rows = group_rows(&tokens, DEFAULT_Y_TOLERANCE);
        let texts: Vec<String> = rows.iter().map(Row::text).collect();
        assert_eq!(texts, vec!["a b c", "d", "e"]);
    }

    #[test]
    fn test_group_rows_empty() {
        assert!(group_rows(&[], DEFAULT_Y_TOLERANCE).is_empty());
    }

    #[test]
    fn test_header_detection() {
        let row = Row {
            tokens: vec![
                tok("Código", 10.0, 50.0),
                tok("Evento", 60.0, 50.0),
                tok("Quantidade", 200.0, 50.0),
                tok("Valor", 300.0, 50.0),
            ],
        };
        let anchors = HeaderAnchors::detect(&row).unwrap();
        assert_eq!(anchors.nearest(15.0), Some(Column::Code));
        assert_eq!(anchors.nearest(215.0), Some(Column::Quantity));
        assert_eq!(anchors.nearest(400.0), Some(Column::Value));
    }

    #[test]
    fn test_header_requires_value_column() {
        let row = Row {
            tokens: vec![tok("Código", 10.0, 50.0), tok("Evento", 60.0, 50.0)],
        };
        assert!(HeaderAnchors::detect(&row).is_none());
    }

    #[test]
    fn test_tie_goes_left() {
        let anchors =
            HeaderAnchors::from_anchors(vec![(Column::Value, 100.0), (Column::Event, 50.0)]);
        assert_eq!(anchors.nearest(75.0), Some(Column::Event));
        assert_eq!(anchors.nearest(75.1), Some(Column::Value));
    }

    #[test]
    fn test_assign_cells() {
        let anchors = HeaderAnchors::from_anchors(vec![
            (Column::Code, 20.0),
            (Column::Event, 80.0),
            (Column::Value, 300.0),
        ]);
        let row = Row {
            tokens: vec![
                tok("+003", 10.0, 10.0),
                tok("Salário", 60.0, 10.0),
                tok("Base", 85.0, 10.0),
                tok("1.234,56", 290.0, 10.0),
            ],
        };
        let cells = anchors.assign(&row);
        assert_eq!(cells.get(Column::Code), "+003");
        assert_eq!(cells.get(Column::Event), "Salário Base");
        assert_eq!(cells.get(Column::Value), "1.234,56");
        assert_eq!(cells.get(Column::Quantity), "");
    }
}
