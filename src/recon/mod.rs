//! The reconciliation engine: compares PDF payroll events against ledger postings by category, by
//! event and by ledger code.
//!
//! Every pass produces `Reconciliation<K>` records where `difference = pdf_total - ledger_total`,
//! so a positive difference means the payroll summary shows more than the ledger. A general
//! summary in the batch is also compared tax by tax, see `general_report`.

mod category;
mod enrich;
mod event;
mod general;
mod ledger;
mod run;
mod summary;
mod taxes;

pub use category::by_category;
pub use enrich::{enrich, sign_ledger, EnrichedEvent, LedgerPosting, LedgerSign};
pub use event::{by_event, EventKey};
pub use general::{
    confront_prolabore, confront_taxes, fgts_loans, general_report, Confrontation, GeneralReport,
    LedgerBreakdown, Payee,
};
pub use ledger::{by_ledger_code, LedgerKey};
pub use run::{
    default_composition_exclusions, run, DocumentReport, LedgerStats, PassCounts, PdfDocument,
    RunMeta, RunOptions, RunReport, Unmapped,
};
pub use summary::{pdf_summary, CategorySummary};
pub use taxes::{tax_report, TaxCodes, TaxLine, TaxReport};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The outcome of comparing one key.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Both sides present and within tolerance.
    Matched,
    /// Both sides present and apart by more than the tolerance.
    Divergent,
    /// Only the payroll summary has it, usually an event the mapping does not cover.
    PdfOnly,
    /// Only the ledger has it.
    LedgerOnly,
}

serde_plain::derive_display_from_serialize!(Status);
serde_plain::derive_fromstr_from_deserialize!(Status);

/// The largest absolute difference that still counts as a match. Inclusive: with the default of
/// 0.01 a one-cent difference matches and a two-cent difference diverges.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Tolerance(Decimal);

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance(Decimal::new(1, 2))
    }
}

impl Tolerance {
    /// # Errors
    /// Negative tolerances are rejected.
    pub fn new(value: Decimal) -> Result<Self, String> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(format!("tolerance must not be negative, got {value}"));
        }
        Ok(Tolerance(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn classify(&self, difference: Decimal) -> Status {
        if difference.abs() <= self.0 {
            Status::Matched
        } else {
            Status::Divergent
        }
    }
}

impl TryFrom<Decimal> for Tolerance {
    type Error = String;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Tolerance::new(value)
    }
}

impl From<Tolerance> for Decimal {
    fn from(value: Tolerance) -> Self {
        value.0
    }
}

impl FromStr for Tolerance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| format!("'{s}': {e}"))?;
        Tolerance::new(value)
    }
}

impl Display for Tolerance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// One row of a discrepancy report.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation<K> {
    key: K,
    pdf_total: Decimal,
    ledger_total: Decimal,
    difference: Decimal,
    status: Status,
}

impl<K> Reconciliation<K> {
    /// Compares two totals that both sides have.
    pub fn compare(key: K, pdf_total: Decimal, ledger_total: Decimal, tolerance: Tolerance) -> Self {
        let difference = pdf_total - ledger_total;
        Self {
            key,
            pdf_total,
            ledger_total,
            difference,
            status: tolerance.classify(difference),
        }
    }

    pub fn pdf_only(key: K, pdf_total: Decimal) -> Self {
        Self {
            key,
            pdf_total,
            ledger_total: Decimal::ZERO,
            difference: pdf_total,
            status: Status::PdfOnly,
        }
    }

    pub fn ledger_only(key: K, ledger_total: Decimal) -> Self {
        Self {
            key,
            pdf_total: Decimal::ZERO,
            ledger_total,
            difference: -ledger_total,
            status: Status::LedgerOnly,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn pdf_total(&self) -> Decimal {
        self.pdf_total
    }

    pub fn ledger_total(&self) -> Decimal {
        self.ledger_total
    }

    pub fn difference(&self) -> Decimal {
        self.difference
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// True for records that compared two present sides.
    pub fn is_compared(&self) -> bool {
        matches!(self.status, Status::Matched | Status::Divergent)
    }
}

/// Record counts per status, for report headers and log lines.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub matched: usize,
    pub divergent: usize,
    pub pdf_only: usize,
    pub ledger_only: usize,
}

impl StatusCounts {
    pub fn of<K>(records: &[Reconciliation<K>]) -> Self {
        let mut counts = StatusCounts::default();
        for record in records {
            match record.status() {
                Status::Matched => counts.matched += 1,
                Status::Divergent => counts.divergent += 1,
                Status::PdfOnly => counts.pdf_only += 1,
                Status::LedgerOnly => counts.ledger_only += 1,
            }
        }
        counts
    }
}

impl Display for StatusCounts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} matched, {} divergent, {} only in PDF, {} only in ledger",
            self.matched, self.divergent, self.pdf_only, self.ledger_only
        )
    }
}
