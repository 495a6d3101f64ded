use crate::model::{CategoryId, EntryKind, EventRow, LedgerCode, LedgerRow, MappingTable, Sign};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How ledger amounts are signed before they are compared.
///
/// Ledger exports usually carry magnitudes and put debit/credit in another column, while the
/// payroll summary prints deductions with a `-`. `ByKind` makes both sides agree by signing each
/// ledger amount from the kind its code is mapped with.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSign {
    /// Deduction codes contribute a negative magnitude, everything else a positive one.
    #[default]
    ByKind,
    /// Use the amount as written in the file.
    AsIs,
}

serde_plain::derive_display_from_serialize!(LedgerSign);
serde_plain::derive_fromstr_from_deserialize!(LedgerSign);

/// An extracted event with its mapping resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    event: EventRow,
    ledger_codes: Vec<LedgerCode>,
    kind: Option<EntryKind>,
    /// The amount used for comparison.
    signed_amount: Decimal,
}

impl EnrichedEvent {
    pub fn event(&self) -> &EventRow {
        &self.event
    }

    pub fn category(&self) -> CategoryId {
        self.event.category()
    }

    pub fn ledger_codes(&self) -> &[LedgerCode] {
        &self.ledger_codes
    }

    pub fn is_mapped(&self) -> bool {
        !self.ledger_codes.is_empty()
    }

    pub fn kind(&self) -> Option<&EntryKind> {
        self.kind.as_ref()
    }

    pub fn amount(&self) -> Decimal {
        self.signed_amount
    }
}

/// Resolves each event against the mapping. A printed `+`/`-` always wins; without one the mapped
/// kind signs a non-negative value. Negative values and unmapped events keep the value as
/// printed.
pub fn enrich(events: &[EventRow], table: &MappingTable) -> Vec<EnrichedEvent> {
    events
        .iter()
        .map(|event| {
            let ledger_codes = table.lookup(event.category(), event.event_code()).to_vec();
            let kind = table.kind_for(event.category(), event.event_code()).cloned();
            let signed_amount = match (event.sign(), kind.as_ref()) {
                (Sign::None, Some(kind)) if !event.amount().is_sign_negative() => {
                    kind.signed(event.amount())
                }
                _ => event.amount(),
            };
            EnrichedEvent {
                event: event.clone(),
                ledger_codes,
                kind,
                signed_amount,
            }
        })
        .collect()
}

/// A ledger row with the amount used for comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerPosting<'a> {
    row: &'a LedgerRow,
    amount: Decimal,
}

impl<'a> LedgerPosting<'a> {
    pub fn row(&self) -> &'a LedgerRow {
        self.row
    }

    pub fn code(&self) -> &'a LedgerCode {
        self.row.code()
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Signs ledger rows per `mode`. A code is signed by the first mapping entry that declares it,
/// categories taken in key order, so a code declared with different kinds takes the kind of its
/// first entry. Codes the mapping does not know are taken as positive magnitudes under `ByKind`.
pub fn sign_ledger<'a>(
    rows: &'a [LedgerRow],
    table: &MappingTable,
    mode: LedgerSign,
) -> Vec<LedgerPosting<'a>> {
    if mode == LedgerSign::ByKind {
        for code in table.conflicting_kinds() {
            if let Some(kind) = table.kind_for_code(None, &code) {
                warn!(
                    "Ledger code {code} is mapped with different kinds, signing it as {}",
                    kind.label()
                );
            }
        }
    }
    rows.iter()
        .map(|row| {
            let amount = match mode {
                LedgerSign::AsIs => row.amount(),
                LedgerSign::ByKind => table
                    .kind_for_code(None, row.code())
                    .unwrap_or(&EntryKind::Addition)
                    .signed(row.amount()),
            };
            LedgerPosting { row, amount }
        })
        .collect()
}
