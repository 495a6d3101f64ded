use crate::model::CategoryId;
use crate::recon::EnrichedEvent;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Additions, deductions and net of one category as the payroll summary shows them.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: CategoryId,
    /// Sum of the positive amounts.
    pub additions: Decimal,
    /// Sum of the negative amounts, itself negative.
    pub deductions: Decimal,
    pub net: Decimal,
    pub events: usize,
}

pub fn pdf_summary(events: &[EnrichedEvent]) -> Vec<CategorySummary> {
    let mut by_category: BTreeMap<CategoryId, CategorySummary> = BTreeMap::new();
    for event in events {
        let summary = by_category
            .entry(event.category())
            .or_insert_with(|| CategorySummary {
                category: event.category(),
                ..CategorySummary::default()
            });
        let amount = event.amount();
        if amount.is_sign_negative() {
            summary.deductions += amount;
        } else {
            summary.additions += amount;
        }
        summary.net += amount;
        summary.events += 1;
    }
    by_category.into_values().collect()
}
