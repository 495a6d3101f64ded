use crate::model::{CategoryId, EventCode, LedgerCode, MappingTable};
use crate::recon::{EnrichedEvent, LedgerPosting, Reconciliation, Tolerance};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identifies a by-event record. `event_code` is `None` for ledger codes that no extracted event
/// resolved to.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EventKey {
    pub category: CategoryId,
    pub event_code: Option<EventCode>,
    pub event_name: String,
    pub ledger_codes: Vec<LedgerCode>,
}

struct EventGroup {
    name: String,
    amount: Decimal,
    codes: Vec<LedgerCode>,
}

/// Compares each `(category, event code)` pair against the ledger postings of the codes it maps
/// to.
///
/// - Events the mapping does not cover become `PdfOnly`.
/// - Ledger codes the mapping declares, that are present in the ledger, but that no extracted
///   event resolved to become `LedgerOnly`.
pub fn by_event(
    events: &[EnrichedEvent],
    ledger: &[LedgerPosting<'_>],
    table: &MappingTable,
    tolerance: Tolerance,
) -> Vec<Reconciliation<EventKey>> {
    let mut groups: BTreeMap<(CategoryId, EventCode), EventGroup> = BTreeMap::new();
    for event in events {
        let key = (event.category(), event.event().event_code().clone());
        let group = groups.entry(key).or_insert_with(|| EventGroup {
            name: String::new(),
            amount: Decimal::ZERO,
            codes: event.ledger_codes().to_vec(),
        });
        if group.name.is_empty() {
            group.name = event.event().event_name().to_string();
        }
        group.amount += event.amount();
    }

    let mut ledger_by_code: BTreeMap<&LedgerCode, Decimal> = BTreeMap::new();
    for posting in ledger {
        *ledger_by_code.entry(posting.code()).or_default() += posting.amount();
    }

    let mut resolved: BTreeSet<LedgerCode> = BTreeSet::new();
    let mut out = Vec::new();
    for ((category, code), group) in groups {
        let key = EventKey {
            category,
            event_code: Some(code),
            event_name: group.name,
            ledger_codes: group.codes.clone(),
        };
        if group.codes.is_empty() {
            out.push(Reconciliation::pdf_only(key, group.amount));
            continue;
        }
        let ledger_total: Decimal = group
            .codes
            .iter()
            .filter_map(|c| ledger_by_code.get(c))
            .copied()
            .sum();
        resolved.extend(group.codes);
        out.push(Reconciliation::compare(
            key,
            group.amount,
            ledger_total,
            tolerance,
        ));
    }

    for code in table.declared_codes() {
        if resolved.contains(&code) {
            continue;
        }
        if let Some(total) = ledger_by_code.get(&code) {
            let key = EventKey {
                category: table
                    .category_for_code(&code)
                    .unwrap_or(CategoryId::Unrecognized),
                event_code: None,
                event_name: String::new(),
                ledger_codes: vec![code.clone()],
            };
            out.push(Reconciliation::ledger_only(key, *total));
        }
    }
    out
}
