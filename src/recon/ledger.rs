use crate::model::{EventCode, LedgerCode};
use crate::recon::{EnrichedEvent, LedgerPosting, Reconciliation, Tolerance};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identifies a by-ledger-code record, with its composition: the event codes that post to it and
/// the ledger's own description of it.
///
/// `code` is `None` only for the single record that collects events the mapping does not cover.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LedgerKey {
    pub code: Option<LedgerCode>,
    pub event_codes: Vec<EventCode>,
    pub description: String,
}

/// Compares per ledger code. Each event's full amount is attributed to every code it maps to, so
/// with fan-out the PDF side of this view can exceed the extracted total. Records are ordered by
/// numeric code.
pub fn by_ledger_code(
    events: &[EnrichedEvent],
    ledger: &[LedgerPosting<'_>],
    tolerance: Tolerance,
) -> Vec<Reconciliation<LedgerKey>> {
    let mut pdf: BTreeMap<LedgerCode, Decimal> = BTreeMap::new();
    let mut composition: BTreeMap<LedgerCode, BTreeSet<EventCode>> = BTreeMap::new();
    let mut unmapped_total = Decimal::ZERO;
    let mut unmapped_events: BTreeSet<EventCode> = BTreeSet::new();
    for event in events {
        if !event.is_mapped() {
            unmapped_total += event.amount();
            unmapped_events.insert(event.event().event_code().clone());
            continue;
        }
        for code in event.ledger_codes() {
            *pdf.entry(code.clone()).or_default() += event.amount();
            composition
                .entry(code.clone())
                .or_default()
                .insert(event.event().event_code().clone());
        }
    }

    let mut books: BTreeMap<LedgerCode, Decimal> = BTreeMap::new();
    let mut descriptions: BTreeMap<LedgerCode, &str> = BTreeMap::new();
    for posting in ledger {
        *books.entry(posting.code().clone()).or_default() += posting.amount();
        let description = posting.row().description();
        if !description.is_empty() {
            descriptions.entry(posting.code().clone()).or_insert(description);
        }
    }

    let mut codes: Vec<&LedgerCode> = pdf.keys().chain(books.keys()).collect();
    codes.sort_by(|a, b| a.numeric().cmp(&b.numeric()).then(a.cmp(b)));
    codes.dedup();

    let mut out = Vec::with_capacity(codes.len() + 1);
    for code in codes {
        let key = LedgerKey {
            code: Some(code.clone()),
            event_codes: composition
                .get(code)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default(),
            description: descriptions.get(code).unwrap_or(&"").to_string(),
        };
        let record = match (pdf.get(code), books.get(code)) {
            (Some(p), Some(l)) => Reconciliation::compare(key, *p, *l, tolerance),
            (Some(p), None) => Reconciliation::pdf_only(key, *p),
            (None, Some(l)) => Reconciliation::ledger_only(key, *l),
            (None, None) => continue,
        };
        out.push(record);
    }

    if !unmapped_events.is_empty() {
        out.push(Reconciliation::pdf_only(
            LedgerKey {
                code: None,
                event_codes: unmapped_events.into_iter().collect(),
                description: String::new(),
            },
            unmapped_total,
        ));
    }
    out
}
