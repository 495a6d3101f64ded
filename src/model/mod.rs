//! Types that represent the core data model, such as `EventRow`, `LedgerRow` and `MappingTable`.
mod amount;
mod category;
mod event;
mod ledger;
mod mapping;
mod tax;

pub use amount::{Amount, AmountError, AmountFormat};
pub use category::CategoryId;
pub use event::{EventCode, EventCodeError, EventRow, Sign};
pub use ledger::{LedgerCode, LedgerCodeError, LedgerRow, MIN_LEDGER_CODE_LEN};
pub use mapping::{EntryKind, MappingEntry, MappingStore, MappingTable, TaxEntry};
pub use tax::Tax;
