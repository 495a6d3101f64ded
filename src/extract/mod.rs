//! Turning raw inputs into rows: PDF token layouts into `EventRow`s and delimited ledger exports
//! into `LedgerRow`s. General summaries also yield their consolidated tax figures.

pub mod general;
pub mod layout;
pub mod ledger;
pub mod pdf;
pub mod token;

pub use general::{extract_general, GeneralSummary, IrrfSource};
pub use ledger::LedgerExtraction;
pub use pdf::{ExtractionWarning, PdfEventExtractor, PdfExtraction, DEFAULT_FOOTER_TERMS};
pub use token::{Page, PageSource, Token, TokenDump};
