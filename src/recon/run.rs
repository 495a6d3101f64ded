//! A full reconciliation run over one batch of payroll summaries and one ledger export.

use crate::extract::{
    extract_general, ExtractionWarning, GeneralSummary, LedgerExtraction, PdfEventExtractor,
    TokenDump,
};
use crate::model::{CategoryId, EventRow, LedgerCode, MappingTable};
use crate::recon::{
    by_category, by_event, by_ledger_code, enrich, general_report, pdf_summary, sign_ledger,
    tax_report, CategorySummary, EventKey, GeneralReport, LedgerKey, LedgerSign, Reconciliation,
    Status, StatusCounts, TaxCodes, TaxReport, Tolerance,
};
use crate::Result;
use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// One payroll summary of the batch. A document that could not be read or parsed is still part
/// of the batch so its failure shows up in the report.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    name: String,
    content: std::result::Result<TokenDump, String>,
}

impl PdfDocument {
    pub fn new(name: impl Into<String>, dump: TokenDump) -> Self {
        Self {
            name: name.into(),
            content: Ok(dump),
        }
    }

    /// Parses a token dump, recording a parse failure instead of returning it.
    pub fn parse(name: impl Into<String>, json: &str) -> Self {
        Self {
            name: name.into(),
            content: TokenDump::parse(json).map_err(|e| e.to_string()),
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: Err(error.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Tax and FGTS codes left out of the composition view.
const COMPOSITION_EXCLUDED: &[&str] = &["30051", "30059", "50026", "70015", "30072", "30073"];

pub fn default_composition_exclusions() -> Vec<LedgerCode> {
    COMPOSITION_EXCLUDED
        .iter()
        .filter_map(|c| LedgerCode::new(*c).ok())
        .collect()
}

/// Knobs of a run, usually filled from the settings file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub tolerance: Tolerance,
    pub ledger_sign: LedgerSign,
    pub tax_codes: TaxCodes,
    pub extractor: PdfEventExtractor,
    /// Ledger codes the composition view leaves out.
    pub composition_excluded: Vec<LedgerCode>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            ledger_sign: LedgerSign::default(),
            tax_codes: TaxCodes::default(),
            extractor: PdfEventExtractor::default(),
            composition_excluded: default_composition_exclusions(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: DateTime<Utc>,
    pub tolerance: Tolerance,
    pub ledger_sign: LedgerSign,
}

/// Extraction outcome of one document of the batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentReport {
    pub name: String,
    pub pages: usize,
    pub tables_found: usize,
    pub events: usize,
    /// Rows skipped in blocks of events outside the payroll totals.
    pub skipped_rows: usize,
    /// Whether the document carries general summary figures.
    pub general_summary: bool,
    pub warnings: Vec<ExtractionWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerStats {
    pub rows: usize,
    pub skipped: usize,
}

/// Entities one side has and the mapping cannot connect to the other.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Unmapped {
    /// Extracted events with no mapping entry.
    pub events: Vec<EventKey>,
    /// Ledger codes present in the export that the mapping never declares.
    pub ledger_codes: Vec<LedgerCode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassCounts {
    pub by_category: StatusCounts,
    pub by_event: StatusCounts,
    pub by_ledger_code: StatusCounts,
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub documents: Vec<DocumentReport>,
    pub ledger: LedgerStats,
    pub counts: PassCounts,
    pub unmapped: Unmapped,
    pub by_category: Vec<Reconciliation<CategoryId>>,
    pub by_event: Vec<Reconciliation<EventKey>>,
    pub by_ledger_code: Vec<Reconciliation<LedgerKey>>,
    /// `by_ledger_code` without the tax and FGTS codes.
    pub composition: Vec<Reconciliation<LedgerKey>>,
    pub pdf_summary: Vec<CategorySummary>,
    pub taxes: TaxReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralReport>,
}

impl RunReport {
    /// True when all three passes, and the general summary comparisons if any, found nothing but
    /// matches.
    pub fn is_clean(&self) -> bool {
        let general_clean = self.general.as_ref().map_or(true, |g| {
            g.taxes
                .iter()
                .map(|t| &t.reconciliation)
                .all(|r| r.status() == Status::Matched)
                && g.prolabore
                    .iter()
                    .all(|p| p.reconciliation.status() == Status::Matched)
        });
        self.by_category
            .iter()
            .all(|r| r.status() == Status::Matched)
            && self.by_event.iter().all(|r| r.status() == Status::Matched)
            && self
                .by_ledger_code
                .iter()
                .all(|r| r.status() == Status::Matched)
            && general_clean
    }
}

/// Extracts every document, then runs the three passes against `ledger` with a single mapping
/// snapshot. The first document carrying general summary figures is also compared tax by tax.
///
/// # Errors
/// Fails when no document of the batch contains a recognizable table, since every pass would then
/// compare the ledger against nothing.
pub fn run(
    documents: &[PdfDocument],
    ledger: &LedgerExtraction,
    table: &MappingTable,
    options: &RunOptions,
) -> Result<RunReport> {
    let mut reports = Vec::with_capacity(documents.len());
    let mut events: Vec<EventRow> = Vec::new();
    let mut general: Option<(String, GeneralSummary)> = None;
    for document in documents {
        let mut report = DocumentReport {
            name: document.name.clone(),
            ..DocumentReport::default()
        };
        match &document.content {
            Ok(dump) => {
                let extraction = options.extractor.extract(dump);
                if extraction.tables_found == 0 {
                    warn!("No payroll table found in '{}'", document.name);
                }
                report.pages = extraction.pages;
                report.tables_found = extraction.tables_found;
                report.events = extraction.events.len();
                report.skipped_rows = extraction.skipped_rows;
                report.warnings = extraction.warnings;
                events.extend(extraction.events);

                let summary = extract_general(dump, options.extractor.y_tolerance());
                if !summary.is_empty() {
                    report.general_summary = true;
                    match &general {
                        Some((first, _)) => warn!(
                            "'{}' also has general summary figures, keeping those of '{first}'",
                            document.name
                        ),
                        None => general = Some((document.name.clone(), summary)),
                    }
                }
            }
            Err(e) => {
                warn!("Unable to read '{}': {e}", document.name);
                report.error = Some(e.clone());
            }
        }
        reports.push(report);
    }

    if reports.iter().all(|r| r.tables_found == 0) {
        bail!(
            "None of the {} payroll document(s) contain a recognizable table",
            documents.len()
        );
    }

    let enriched = enrich(&events, table);
    let postings = sign_ledger(&ledger.rows, table, options.ledger_sign);

    let by_category = by_category(&enriched, &postings, table, options.tolerance);
    let by_event = by_event(&enriched, &postings, table, options.tolerance);
    let by_ledger_code = by_ledger_code(&enriched, &postings, options.tolerance);
    let taxes = tax_report(&by_ledger_code, &options.tax_codes);
    let composition: Vec<Reconciliation<LedgerKey>> = by_ledger_code
        .iter()
        .filter(|r| {
            r.key()
                .code
                .as_ref()
                .map_or(true, |c| !options.composition_excluded.contains(c))
        })
        .cloned()
        .collect();
    let general = general.map(|(name, summary)| {
        general_report(name, summary, &ledger.rows, table, options.tolerance)
    });

    let mut declared = table.declared_codes();
    declared.extend(table.tax_section_codes());
    let undeclared: BTreeSet<LedgerCode> = ledger
        .rows
        .iter()
        .map(|r| r.code().clone())
        .filter(|c| !declared.contains(c))
        .collect();
    let unmapped = Unmapped {
        events: by_event
            .iter()
            .filter(|r| r.status() == Status::PdfOnly)
            .map(|r| r.key().clone())
            .collect(),
        ledger_codes: undeclared.into_iter().collect(),
    };

    let counts = PassCounts {
        by_category: StatusCounts::of(&by_category),
        by_event: StatusCounts::of(&by_event),
        by_ledger_code: StatusCounts::of(&by_ledger_code),
    };
    info!("By category: {}", counts.by_category);
    info!("By event: {}", counts.by_event);
    info!("By ledger code: {}", counts.by_ledger_code);

    Ok(RunReport {
        meta: RunMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: Utc::now(),
            tolerance: options.tolerance,
            ledger_sign: options.ledger_sign,
        },
        documents: reports,
        ledger: LedgerStats {
            rows: ledger.rows.len(),
            skipped: ledger.skipped,
        },
        counts,
        unmapped,
        by_category,
        by_event,
        by_ledger_code,
        composition,
        pdf_summary: pdf_summary(&enriched),
        taxes,
        general,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ledger;
    use crate::test::{header_row, sample_summary_json, TokenRows, SAMPLE_LEDGER, SAMPLE_MAPPING};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn sample_run(documents: &[PdfDocument]) -> Result<RunReport> {
        let table = MappingTable::load(SAMPLE_MAPPING).unwrap();
        let ledger = ledger::extract(SAMPLE_LEDGER);
        run(documents, &ledger, &table, &RunOptions::default())
    }

    #[test]
    fn test_sample_run() {
        let docs = vec![PdfDocument::parse("resumo.json", &sample_summary_json())];
        let report = sample_run(&docs).unwrap();

        assert_eq!(report.documents[0].events, 3);
        assert_eq!(report.ledger.rows, 4);
        assert_eq!(report.counts.by_category.matched, 2);
        assert_eq!(report.counts.by_event.matched, 3);
        // 99999 is in the ledger but not in the mapping
        assert_eq!(report.counts.by_ledger_code.ledger_only, 1);
        assert_eq!(report.unmapped.ledger_codes[0].as_str(), "99999");
        assert!(report.unmapped.events.is_empty());
        assert!(!report.is_clean());

        let irrf = report
            .taxes
            .lines
            .iter()
            .find(|l| l.code.as_str() == "30058")
            .unwrap();
        assert_eq!(irrf.pdf_total, Decimal::from_str("200").unwrap());
        assert_eq!(irrf.difference, Decimal::ZERO);
    }

    #[test]
    fn test_failed_document_does_not_abort_batch() {
        let docs = vec![
            PdfDocument::parse("broken.json", "{"),
            PdfDocument::failed("missing.json", "file not found"),
            PdfDocument::parse("resumo.json", &sample_summary_json()),
        ];
        let report = sample_run(&docs).unwrap();
        assert_eq!(report.documents.len(), 3);
        assert!(report.documents[0].error.is_some());
        assert_eq!(report.documents[1].error.as_deref(), Some("file not found"));
        assert_eq!(report.documents[2].tables_found, 2);
    }

    #[test]
    fn test_batch_without_tables_is_an_error() {
        let docs = vec![
            PdfDocument::parse("vazio.json", r#"{"pages": []}"#),
            PdfDocument::failed("missing.json", "file not found"),
        ];
        assert!(sample_run(&docs).is_err());
        assert!(sample_run(&[]).is_err());
    }

    #[test]
    fn test_composition_leaves_out_tax_codes() {
        let docs = vec![PdfDocument::parse("resumo.json", &sample_summary_json())];
        let table = MappingTable::load(SAMPLE_MAPPING).unwrap();
        let ledger = ledger::extract(SAMPLE_LEDGER);
        let options = RunOptions {
            composition_excluded: vec![LedgerCode::new("30058").unwrap()],
            ..RunOptions::default()
        };
        let report = run(&docs, &ledger, &table, &options).unwrap();
        assert_eq!(report.composition.len() + 1, report.by_ledger_code.len());
        assert!(report
            .composition
            .iter()
            .all(|r| r.key().code.as_ref().map(|c| c.as_str()) != Some("30058")));
        // the sample has no general summary figures
        assert!(report.general.is_none());
        assert!(!report.documents[0].general_summary);
    }

    #[test]
    fn test_general_summary_in_batch() {
        let mut rows = TokenRows::new();
        rows.line(&["Folha"]);
        header_row(&mut rows);
        rows.data("003", "Salário", "1.000,00");
        rows.line(&["Totais", "1.000,00"]);
        rows.line(&["Total", "Líquido:", "80,00"]);
        let general = TokenDump::new(vec![rows.page(1)]);
        let docs = vec![
            PdfDocument::parse("resumo.json", &sample_summary_json()),
            PdfDocument::new("geral.json", general.clone()),
            PdfDocument::new("geral-2.json", general),
        ];
        let mapping = r#"{
            "Folha": [{ "evento": "003", "codigo_lancamento": "30055" }],
            "INSS": [{ "codigo_lancamento": "99999", "tipo": "Adicional" }]
        }"#;
        let table = MappingTable::load(mapping).unwrap();
        let ledger = ledger::extract(SAMPLE_LEDGER);
        let report = run(&docs, &ledger, &table, &RunOptions::default()).unwrap();

        let general = report.general.as_ref().unwrap();
        assert_eq!(general.document, "geral.json");
        let inss = &general.taxes[0].reconciliation;
        assert_eq!(inss.pdf_total(), Decimal::from_str("80").unwrap());
        assert_eq!(inss.ledger_total(), Decimal::from_str("50").unwrap());
        assert_eq!(inss.status(), Status::Divergent);
        // a code listed under a tax section is declared
        assert!(report
            .unmapped
            .ledger_codes
            .iter()
            .all(|c| c.as_str() != "99999"));
        assert!(report.documents[1].general_summary);
    }

    #[test]
    fn test_report_serializes() {
        let docs = vec![PdfDocument::parse("resumo.json", &sample_summary_json())];
        let report = sample_run(&docs).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["by_category"][0]["key"], "Folha");
        assert_eq!(json["by_category"][0]["status"], "matched");
        assert_eq!(json["meta"]["ledger_sign"], "by_kind");
        assert!(json["taxes"]["divergence"]["INSS"].is_string());
    }
}
