use crate::model::{CategoryId, MappingTable};
use crate::recon::{EnrichedEvent, LedgerPosting, Reconciliation, Tolerance};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Compares net totals per category.
///
/// The PDF side sums the events extracted under each category. The ledger side sums every posting
/// whose code the mapping associates with that category, so a code declared under two categories
/// counts in both. A category appears when either side has something for it.
pub fn by_category(
    events: &[EnrichedEvent],
    ledger: &[LedgerPosting<'_>],
    table: &MappingTable,
    tolerance: Tolerance,
) -> Vec<Reconciliation<CategoryId>> {
    let mut pdf: BTreeMap<CategoryId, Decimal> = BTreeMap::new();
    for event in events {
        *pdf.entry(event.category()).or_default() += event.amount();
    }

    let categories: BTreeSet<CategoryId> = pdf.keys().copied().chain(table.categories()).collect();
    let mut out = Vec::new();
    for category in categories {
        let codes = table.ledger_codes_for_category(category);
        let matching: Vec<&LedgerPosting<'_>> =
            ledger.iter().filter(|p| codes.contains(p.code())).collect();
        let pdf_total = pdf.get(&category).copied();
        if pdf_total.is_none() && matching.is_empty() {
            continue;
        }
        let ledger_total: Decimal = matching.iter().map(|p| p.amount()).sum();
        trace!(
            "{category}: pdf {:?}, ledger {ledger_total} from {} postings",
            pdf_total,
            matching.len()
        );
        out.push(Reconciliation::compare(
            category,
            pdf_total.unwrap_or_default(),
            ledger_total,
            tolerance,
        ));
    }
    out
}
