//! Compares the consolidated figures of a general summary with the ledger.
//!
//! Ledger amounts are taken as magnitudes here and signed by the entry that lists their code:
//! the ledger side of a figure is its additions minus its deductions.

use crate::extract::GeneralSummary;
use crate::model::{EntryKind, LedgerCode, LedgerRow, MappingTable, Tax};
use crate::recon::{Reconciliation, Tolerance};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// FGTS loan codes. They are booked next to the FGTS codes but are not part of the assessed FGTS.
const FGTS_LOAN_ADDITIONS: &[&str] = &["30075", "40045", "50035", "70045"];
const FGTS_LOAN_DEDUCTIONS: &[&str] = &["30074", "70044"];

const PARTNER_ADDITIONS: &[&str] = &["30003", "30064"];
const PARTNER_DEDUCTIONS: &[&str] = &["30067", "30066"];
const SELF_EMPLOYED_ADDITIONS: &[&str] = &["30060", "30069"];
const SELF_EMPLOYED_DEDUCTIONS: &[&str] = &["30070", "30071"];

/// The ledger side of a figure.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LedgerBreakdown {
    pub additions: Decimal,
    pub deductions: Decimal,
    /// `additions - deductions`
    pub total: Decimal,
    /// Ledger rows that counted.
    pub postings: usize,
}

impl LedgerBreakdown {
    fn of(rows: &[LedgerRow], kind_of: impl Fn(&LedgerCode) -> Option<EntryKind>) -> Self {
        let mut out = LedgerBreakdown::default();
        for row in rows {
            match kind_of(row.code()) {
                Some(EntryKind::Addition) => out.additions += row.amount().abs(),
                Some(EntryKind::Deduction) => out.deductions += row.amount().abs(),
                _ => continue,
            }
            out.postings += 1;
        }
        out.total = out.additions - out.deductions;
        out
    }
}

fn listed(code: &LedgerCode, additions: &[&str], deductions: &[&str]) -> Option<EntryKind> {
    if additions.contains(&code.as_str()) {
        Some(EntryKind::Addition)
    } else if deductions.contains(&code.as_str()) {
        Some(EntryKind::Deduction)
    } else {
        None
    }
}

fn is_fgts_loan(code: &LedgerCode) -> bool {
    listed(code, FGTS_LOAN_ADDITIONS, FGTS_LOAN_DEDUCTIONS).is_some()
}

/// Who receives a pró-labore payment.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payee {
    Partners,
    SelfEmployed,
}

serde_plain::derive_display_from_serialize!(Payee);

impl Payee {
    fn codes(&self) -> (&'static [&'static str], &'static [&'static str]) {
        match self {
            Payee::Partners => (PARTNER_ADDITIONS, PARTNER_DEDUCTIONS),
            Payee::SelfEmployed => (SELF_EMPLOYED_ADDITIONS, SELF_EMPLOYED_DEDUCTIONS),
        }
    }

    fn net(&self, summary: &GeneralSummary) -> Option<Decimal> {
        match self {
            Payee::Partners => summary.partners_net,
            Payee::SelfEmployed => summary.self_employed_net,
        }
    }
}

/// A summary figure against its ledger breakdown. `pdf_total` is the summary figure.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Confrontation<K> {
    #[serde(flatten)]
    pub reconciliation: Reconciliation<K>,
    pub ledger: LedgerBreakdown,
}

impl<K> Confrontation<K> {
    /// Compares when both sides exist. `None` when neither does.
    fn of(
        key: K,
        summary: Option<Decimal>,
        ledger: LedgerBreakdown,
        tolerance: Tolerance,
    ) -> Option<Self> {
        let reconciliation = match summary {
            Some(total) => Reconciliation::compare(key, total, ledger.total, tolerance),
            None if ledger.postings == 0 => return None,
            None => Reconciliation::ledger_only(key, ledger.total),
        };
        Some(Self {
            reconciliation,
            ledger,
        })
    }
}

/// Compares each tax of the summary with the ledger codes of the mapping's tax section. FGTS loan
/// codes never count towards FGTS. A tax the mapping has no section for is reported as present
/// only in the summary.
pub fn confront_taxes(
    summary: &GeneralSummary,
    rows: &[LedgerRow],
    table: &MappingTable,
    tolerance: Tolerance,
) -> Vec<Confrontation<Tax>> {
    let mut out = Vec::new();
    for tax in Tax::ALL {
        let total = summary.tax_total(tax);
        if !table.has_tax_section(tax) {
            if let Some(total) = total {
                warn!("The mapping has no {tax} section, the general summary's {tax} is unmatched");
                out.push(Confrontation {
                    reconciliation: Reconciliation::pdf_only(tax, total),
                    ledger: LedgerBreakdown::default(),
                });
            }
            continue;
        }
        let section = table.tax_section(tax);
        let ledger = LedgerBreakdown::of(rows, |code| {
            if tax == Tax::Fgts && is_fgts_loan(code) {
                return None;
            }
            section
                .iter()
                .find(|e| e.ledger_code() == code)
                .map(|e| e.kind().clone())
        });
        out.extend(Confrontation::of(tax, total, ledger, tolerance));
    }
    out
}

/// The FGTS loan postings of the ledger.
pub fn fgts_loans(rows: &[LedgerRow]) -> LedgerBreakdown {
    LedgerBreakdown::of(rows, |code| {
        listed(code, FGTS_LOAN_ADDITIONS, FGTS_LOAN_DEDUCTIONS)
    })
}

/// Compares the net pró-labore per payee with its ledger codes.
pub fn confront_prolabore(
    summary: &GeneralSummary,
    rows: &[LedgerRow],
    tolerance: Tolerance,
) -> Vec<Confrontation<Payee>> {
    [Payee::Partners, Payee::SelfEmployed]
        .into_iter()
        .filter_map(|payee| {
            let (additions, deductions) = payee.codes();
            let ledger = LedgerBreakdown::of(rows, |code| listed(code, additions, deductions));
            Confrontation::of(payee, payee.net(summary), ledger, tolerance)
        })
        .collect()
}

/// Everything compared against a general summary.
#[derive(Debug, Clone, Serialize)]
pub struct GeneralReport {
    /// The document the figures were read from.
    pub document: String,
    pub summary: GeneralSummary,
    pub taxes: Vec<Confrontation<Tax>>,
    pub fgts_loans: LedgerBreakdown,
    pub prolabore: Vec<Confrontation<Payee>>,
}

pub fn general_report(
    document: impl Into<String>,
    summary: GeneralSummary,
    rows: &[LedgerRow],
    table: &MappingTable,
    tolerance: Tolerance,
) -> GeneralReport {
    let taxes = confront_taxes(&summary, rows, table, tolerance);
    for tax in &taxes {
        let r = &tax.reconciliation;
        info!(
            "{}: summary {}, ledger {}, difference {} ({})",
            r.key(),
            r.pdf_total(),
            r.ledger_total(),
            r.difference(),
            r.status()
        );
    }
    let prolabore = confront_prolabore(&summary, rows, tolerance);
    GeneralReport {
        document: document.into(),
        fgts_loans: fgts_loans(rows),
        taxes,
        prolabore,
        summary,
    }
}
