//! Reconstructs payroll summary tables from positioned tokens.
//!
//! A payroll summary is a sequence of sections. Each section starts with a short title line
//! ("Folha Complementar", "13ª Parcela") followed by a table whose header row names the columns
//! (Código, Evento, Quantidade, Valor, Funcionários). Data rows follow until a footer row
//! ("Totais", "Base INSS", "Líquidos") closes the table.
//!
//! Some layouts list, inside a table, a block of events that "não influenciam no líquido" or "não
//! aparecem em folha". Those rows are skipped up to the block's own total line or a separator
//! line, so they never reach the reconciliation.

use crate::extract::layout::{group_rows, Column, HeaderAnchors, Row, DEFAULT_Y_TOLERANCE};
use crate::extract::token::PageSource;
use crate::model::{Amount, CategoryId, EventCode, EventRow, Sign};
use crate::text::{contains_any, normalize};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use tracing::{debug, trace};

/// Rows whose normalized text contains one of these close the open table.
pub const DEFAULT_FOOTER_TERMS: &[&str] = &[
    "totais",
    "base inss",
    "base irrf",
    "base fgts",
    "liquidos",
    "liquido",
];

/// Rows containing one of these open a block of events outside the payroll totals.
const EXCLUDED_BLOCK_TERMS: &[&str] = &["nao influenciam", "nao aparecem em folha"];
const EXCLUDED_BLOCK_TOTAL_TERMS: &[&str] = &["nao influenciam", "nao aparecem"];
const SEPARATORS: &[&str] = &["_____", "-----"];

/// A row or section that could not be turned into events. Extraction carries on past these.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    /// A section title with no table header before the next section or the end of the document.
    EmptySection { page: usize, section: String },
    /// A table row whose code column does not hold a 3-digit event code.
    InvalidCode { page: usize, text: String },
    /// A table row whose value column does not hold a parseable amount.
    InvalidValue {
        page: usize,
        code: String,
        text: String,
    },
}

impl Display for ExtractionWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionWarning::EmptySection { page, section } => {
                write!(f, "page {page}: section '{section}' has no table")
            }
            ExtractionWarning::InvalidCode { page, text } => {
                write!(f, "page {page}: no event code in row '{text}'")
            }
            ExtractionWarning::InvalidValue { page, code, text } => {
                write!(f, "page {page}: event {code} has an unreadable value '{text}'")
            }
        }
    }
}

/// The outcome of extracting one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfExtraction {
    pub events: Vec<EventRow>,
    pub warnings: Vec<ExtractionWarning>,
    /// Table header rows seen. Zero means the document has no recognizable structure.
    pub tables_found: usize,
    pub pages: usize,
    /// Rows dropped inside blocks of events that do not affect the payroll.
    #[serde(default)]
    pub skipped_rows: usize,
}

/// Extracts `EventRow`s from pages of tokens.
#[derive(Debug, Clone)]
pub struct PdfEventExtractor {
    y_tolerance: f64,
    footer_terms: Vec<String>,
}

impl Default for PdfEventExtractor {
    fn default() -> Self {
        Self {
            y_tolerance: DEFAULT_Y_TOLERANCE,
            footer_terms: DEFAULT_FOOTER_TERMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The section currently being read.
struct Section {
    category: CategoryId,
    title: String,
    page: usize,
    has_table: bool,
}

impl PdfEventExtractor {
    pub fn new(y_tolerance: f64, footer_terms: Vec<String>) -> Self {
        Self {
            y_tolerance,
            footer_terms: footer_terms.iter().map(|t| normalize(t)).collect(),
        }
    }

    pub fn y_tolerance(&self) -> f64 {
        self.y_tolerance
    }

    pub fn extract(&self, source: &dyn PageSource) -> PdfExtraction {
        let mut out = PdfExtraction::default();
        let mut section: Option<Section> = None;
        let mut table: Option<HeaderAnchors> = None;
        let mut excluded = false;

        for page in source.pages() {
            out.pages += 1;
            for row in group_rows(&page.tokens, self.y_tolerance) {
                let line = row.text();
                let normalized = normalize(&line);
                if normalized.is_empty() {
                    continue;
                }

                if excluded {
                    if closes_excluded_block(&line, &normalized) {
                        trace!("Excluded block ends on page {}: '{line}'", page.number);
                        excluded = false;
                        out.skipped_rows += 1;
                        continue;
                    }
                    // a new section ends the block as well
                    if CategoryId::from_section_header(&line).is_none() {
                        out.skipped_rows += 1;
                        continue;
                    }
                    excluded = false;
                } else if contains_any(&normalized, EXCLUDED_BLOCK_TERMS) {
                    debug!("Skipping excluded block on page {}: '{line}'", page.number);
                    excluded = true;
                    out.skipped_rows += 1;
                    continue;
                }

                if let Some(anchors) = HeaderAnchors::detect(&row) {
                    trace!("Table header on page {}: '{line}'", page.number);
                    out.tables_found += 1;
                    if let Some(s) = section.as_mut() {
                        s.has_table = true;
                    }
                    table = Some(anchors);
                    continue;
                }

                if table.is_some() && contains_any(&normalized, &self.footer_terms) {
                    trace!("Footer on page {}: '{line}'", page.number);
                    table = None;
                    continue;
                }

                if let Some(category) = CategoryId::from_section_header(&line) {
                    debug!("Section '{line}' ({category}) on page {}", page.number);
                    if let Some(previous) = section.take() {
                        close_section(previous, &mut out.warnings);
                    }
                    section = Some(Section {
                        category,
                        title: line,
                        page: page.number,
                        has_table: false,
                    });
                    table = None;
                    continue;
                }

                if let Some(anchors) = table.as_ref() {
                    let (category, title) = section
                        .as_ref()
                        .map(|s| (s.category, s.title.as_str()))
                        .unwrap_or((CategoryId::Unrecognized, ""));
                    match parse_data_row(anchors, &row, category, title, page.number) {
                        Ok(Some(event)) => out.events.push(event),
                        Ok(None) => {}
                        Err(warning) => {
                            debug!("Skipping row: {warning}");
                            out.warnings.push(warning);
                        }
                    }
                }
            }
        }
        if let Some(last) = section.take() {
            close_section(last, &mut out.warnings);
        }

        debug!(
            "Extracted {} events from {} tables on {} pages ({} warnings, {} rows excluded)",
            out.events.len(),
            out.tables_found,
            out.pages,
            out.warnings.len(),
            out.skipped_rows
        );
        out
    }
}

/// The block's own total line, or a line of underscores or dashes.
fn closes_excluded_block(line: &str, normalized: &str) -> bool {
    let line = line.trim_start();
    (normalized.contains("total") && contains_any(normalized, EXCLUDED_BLOCK_TOTAL_TERMS))
        || SEPARATORS.iter().any(|s| line.starts_with(s))
}

fn close_section(section: Section, warnings: &mut Vec<ExtractionWarning>) {
    if !section.has_table {
        warnings.push(ExtractionWarning::EmptySection {
            page: section.page,
            section: section.title,
        });
    }
}

/// Converts one table row. `Ok(None)` is a row with an empty value column, which is layout noise
/// (wrapped event names, blank spacer rows) rather than a broken event.
fn parse_data_row(
    anchors: &HeaderAnchors,
    row: &Row,
    category: CategoryId,
    section: &str,
    page: usize,
) -> Result<Option<EventRow>, ExtractionWarning> {
    let cells = anchors.assign(row);
    let value_cell = cells.get(Column::Value);
    if value_cell.is_empty() {
        return Ok(None);
    }

    let (sign, code_text) = split_sign(cells.get(Column::Code));
    let event_cell = cells.get(Column::Event);
    let mut words = code_text.split_whitespace();
    let (sign, code, event_text) = match words.next() {
        Some(first) => {
            // words that drifted into the code column belong to the event name
            let rest: Vec<&str> = words.collect();
            let name = if rest.is_empty() {
                event_cell.to_string()
            } else {
                format!("{} {event_cell}", rest.join(" "))
            };
            (sign, first.to_string(), name)
        }
        None => {
            // no code column content: the code may lead the event column instead
            let (event_sign, event_rest) = split_sign(event_cell);
            match event_rest.split_once(char::is_whitespace) {
                Some((leading, name)) if EventCode::new(leading).is_ok() => {
                    // a marker left alone in the code column still signs the row
                    let sign = if event_sign == Sign::None {
                        sign
                    } else {
                        event_sign
                    };
                    (sign, leading.to_string(), name.trim().to_string())
                }
                _ => (sign, String::new(), event_cell.to_string()),
            }
        }
    };
    finish_row(sign, &code, &event_text, value_cell, category, section, page, row)
}

#[allow(clippy::too_many_arguments)]
fn finish_row(
    sign: Sign,
    code: &str,
    event_text: &str,
    value_cell: &str,
    category: CategoryId,
    section: &str,
    page: usize,
    row: &Row,
) -> Result<Option<EventRow>, ExtractionWarning> {
    let event_code = EventCode::new(code).map_err(|_| ExtractionWarning::InvalidCode {
        page,
        text: row.text(),
    })?;

    // the value is the last token with a decimal comma; counts and quantities may precede it
    let value_token = value_cell
        .split_whitespace()
        .filter(|t| t.contains(','))
        .last()
        .or_else(|| value_cell.split_whitespace().last())
        .unwrap_or("");
    let amount = Amount::from_str(value_token)
        .map_err(|_| ExtractionWarning::InvalidValue {
            page,
            code: event_code.to_string(),
            text: value_cell.to_string(),
        })?
        .value();

    Ok(Some(
        EventRow::new(
            category,
            event_code,
            strip_leading_code(event_text),
            sign.apply(amount),
        )
        .with_origin(sign, section, page),
    ))
}

/// Splits a leading `+` or `-` marker from a cell.
fn split_sign(cell: &str) -> (Sign, &str) {
    let cell = cell.trim();
    if let Some(rest) = cell.strip_prefix('+') {
        (Sign::Plus, rest.trim_start())
    } else if let Some(rest) = cell.strip_prefix('-') {
        (Sign::Minus, rest.trim_start())
    } else {
        (Sign::None, cell)
    }
}

/// Event names sometimes repeat the code ("003 Salário"); keeps only the name.
fn strip_leading_code(name: &str) -> String {
    let trimmed = name.trim_start_matches(|c: char| c == '+' || c == '-' || c.is_whitespace());
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    match (parts.next(), parts.next()) {
        (Some(first), Some(rest))
            if (1..=6).contains(&first.len()) && first.chars().all(|c| c.is_ascii_digit()) =>
        {
            rest.trim().to_string()
        }
        _ => name.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::token::{Page, Token};
    use crate::test::{header_row, sample_summary, TokenRows};
    use rust_decimal::Decimal;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_extracts_sample_summary() {
        let pages = sample_summary();
        let out = PdfEventExtractor::default().extract(&pages);
        assert_eq!(out.tables_found, 2);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        let got: Vec<(CategoryId, &str, Decimal)> = out
            .events
            .iter()
            .map(|e| (e.category(), e.event_code().as_str(), e.amount()))
            .collect();
        assert_eq!(
            got,
            vec![
                (CategoryId::Folha, "003", d("1234.56")),
                (CategoryId::Folha, "310", d("-200.00")),
                (CategoryId::Ferias, "005", d("1000.00")),
            ]
        );
        assert_eq!(out.events[0].event_name(), "Salário Base");
        assert_eq!(out.events[1].sign(), Sign::Minus);
        assert_eq!(out.events[2].page(), 2);
    }

    #[test]
    fn test_footer_terminates_table() {
        let mut rows = TokenRows::new();
        rows.line(&["Folha"]);
        header_row(&mut rows);
        rows.data("003", "Salário", "1.000,00");
        rows.cells(&[(10.0, "Totais"), (310.0, "50000,00")]);
        rows.data("004", "Depois do rodapé", "10,00");
        let pages = vec![rows.page(1)];

        let out = PdfEventExtractor::default().extract(&pages);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].amount(), d("1000.00"));
    }

    #[test]
    fn test_invalid_rows_become_warnings() {
        let mut rows = TokenRows::new();
        rows.line(&["Rescisão"]);
        header_row(&mut rows);
        rows.data("03", "Código curto", "10,00");
        rows.data("004", "Valor ruim", "abc,de");
        rows.data("005", "Ok", "1,50");
        let pages = vec![rows.page(1)];

        let out = PdfEventExtractor::default().extract(&pages);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].category(), CategoryId::Rescisao);
        assert!(matches!(
            out.warnings[0],
            ExtractionWarning::InvalidCode { page: 1, .. }
        ));
        assert!(matches!(
            &out.warnings[1],
            ExtractionWarning::InvalidValue { code, .. } if code == "004"
        ));
    }

    #[test]
    fn test_section_without_table() {
        let mut rows = TokenRows::new();
        rows.line(&["Adiantamento"]);
        rows.line(&["Folha"]);
        header_row(&mut rows);
        rows.data("003", "Salário", "10,00");
        let pages = vec![rows.page(1)];

        let out = PdfEventExtractor::default().extract(&pages);
        assert_eq!(out.events.len(), 1);
        assert_eq!(
            out.warnings,
            vec![ExtractionWarning::EmptySection {
                page: 1,
                section: String::from("Adiantamento")
            }]
        );
    }

    #[test]
    fn test_no_structure() {
        let pages = vec![Page::new(
            1,
            vec![Token::new("Relatório", 10.0, 60.0, 10.0, 18.0)],
        )];
        let out = PdfEventExtractor::default().extract(&pages);
        assert_eq!(out.tables_found, 0);
        assert!(out.events.is_empty());
        assert_eq!(out.pages, 1);
    }

    #[test]
    fn test_table_continues_across_pages() {
        let mut first = TokenRows::new();
        first.line(&["Pró-Labore"]);
        header_row(&mut first);
        first.data("001", "Retirada", "5.000,00");
        let mut second = TokenRows::new();
        second.data("-002", "INSS", "550,00");
        let pages = vec![first.page(1), second.page(2)];

        let out = PdfEventExtractor::default().extract(&pages);
        assert_eq!(out.events.len(), 2);
        assert_eq!(out.events[1].category(), CategoryId::ProLabore);
        assert_eq!(out.events[1].amount(), d("-550.00"));
    }

    #[test]
    fn test_code_in_event_column() {
        let mut rows = TokenRows::new();
        rows.line(&["Folha"]);
        header_row(&mut rows);
        rows.cells(&[(70.0, "+ 003 Salário"), (310.0, "10,00")]);
        let pages = vec![rows.page(1)];

        let out = PdfEventExtractor::default().extract(&pages);
        assert_eq!(out.events.len(), 1, "{:?}", out.warnings);
        assert_eq!(out.events[0].event_code().as_str(), "003");
        assert_eq!(out.events[0].event_name(), "Salário");
        assert_eq!(out.events[0].sign(), Sign::Plus);
    }

    #[test]
    fn test_lone_marker_in_code_column_signs_drifted_code() {
        let mut rows = TokenRows::new();
        rows.line(&["Folha"]);
        header_row(&mut rows);
        rows.cells(&[(10.0, "-"), (60.0, "310 INSS"), (300.0, "200,00")]);
        let pages = vec![rows.page(1)];

        let out = PdfEventExtractor::default().extract(&pages);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].event_code().as_str(), "310");
        assert_eq!(out.events[0].event_name(), "INSS");
        assert_eq!(out.events[0].sign(), Sign::Minus);
        assert_eq!(out.events[0].amount(), d("-200.00"));
    }

    #[test]
    fn test_excluded_block_is_skipped() {
        let mut rows = TokenRows::new();
        rows.line(&["Folha"]);
        header_row(&mut rows);
        rows.data("003", "Salário", "1.000,00");
        rows.line(&["Eventos", "que", "não", "influenciam", "no", "líquido"]);
        rows.data("900", "Base informativa", "50,00");
        rows.line(&["__________"]);
        rows.data("004", "Adicional noturno", "10,00");
        rows.line(&["Não", "aparecem", "em", "folha"]);
        rows.data("901", "Provisão", "70,00");
        rows.line(&["Total", "não", "aparecem", "em", "folha"]);
        rows.data("-310", "INSS", "100,00");
        let pages = vec![rows.page(1)];

        let out = PdfEventExtractor::default().extract(&pages);
        let codes: Vec<&str> = out.events.iter().map(|e| e.event_code().as_str()).collect();
        assert_eq!(codes, vec!["003", "004", "310"]);
        assert_eq!(out.skipped_rows, 6);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    }

    #[test]
    fn test_section_title_ends_excluded_block() {
        let mut rows = TokenRows::new();
        rows.line(&["Folha"]);
        header_row(&mut rows);
        rows.line(&["Eventos", "que", "não", "influenciam"]);
        rows.data("900", "Base", "50,00");
        rows.line(&["Férias"]);
        header_row(&mut rows);
        rows.data("005", "Férias", "300,00");
        let pages = vec![rows.page(1)];

        let out = PdfEventExtractor::default().extract(&pages);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].category(), CategoryId::Ferias);
        assert_eq!(out.skipped_rows, 2);
    }

    #[test]
    fn test_value_is_last_comma_token() {
        let mut rows = TokenRows::new();
        rows.line(&["Folha"]);
        header_row(&mut rows);
        rows.cells(&[(10.0, "003"), (70.0, "Horas"), (310.0, "30,00 1.500,00")]);
        let pages = vec![rows.page(1)];
        let out = PdfEventExtractor::default().extract(&pages);
        assert_eq!(out.events[0].amount(), d("1500.00"));
    }

    #[test]
    fn test_strip_leading_code() {
        assert_eq!(strip_leading_code("003 Salário"), "Salário");
        assert_eq!(strip_leading_code("+ 003 Salário"), "Salário");
        assert_eq!(strip_leading_code("Salário 13"), "Salário 13");
        assert_eq!(strip_leading_code("1234567 x"), "1234567 x");
    }
}
