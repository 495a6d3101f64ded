use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// An accounting posting code ("LA"): all ASCII digits, at least four of them.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LedgerCode(String);

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("'{0}' is not a ledger code (expected 4 or more digits)")]
pub struct LedgerCodeError(pub String);

pub const MIN_LEDGER_CODE_LEN: usize = 4;

impl LedgerCode {
    pub fn new(s: impl Into<String>) -> Result<Self, LedgerCodeError> {
        let s = s.into();
        if s.len() >= MIN_LEDGER_CODE_LEN && s.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(s))
        } else {
            Err(LedgerCodeError(s))
        }
    }

    /// Cleans up a code cell as it appears in exports and spreadsheets: surrounding quotes and
    /// whitespace, and a trailing `.0` left behind by float conversion (`"30055.0"`).
    pub fn parse_cell(cell: &str) -> Result<Self, LedgerCodeError> {
        let trimmed = cell.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        let cleaned = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        Self::new(cleaned)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value for ordering reports the way accountants read them (`897` before `30055`).
    pub fn numeric(&self) -> u128 {
        self.0.parse().unwrap_or(u128::MAX)
    }
}

impl FromStr for LedgerCode {
    type Err = LedgerCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LedgerCode {
    type Error = LedgerCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LedgerCode> for String {
    fn from(value: LedgerCode) -> Self {
        value.0
    }
}

impl Display for LedgerCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// One posting from the accounting batch export. Zero amounts never become a `LedgerRow`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    code: LedgerCode,
    amount: Decimal,
    description: String,
    /// 1-based record number in the source file.
    line: usize,
}

impl LedgerRow {
    pub fn new(code: LedgerCode, amount: Decimal) -> Self {
        Self {
            code,
            amount,
            description: String::new(),
            line: 0,
        }
    }

    pub(crate) fn with_source(mut self, description: impl Into<String>, line: usize) -> Self {
        self.description = description.into();
        self.line = line;
        self
    }

    pub fn code(&self) -> &LedgerCode {
        &self.code
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_code_rules() {
        assert!(LedgerCode::new("30055").is_ok());
        assert!(LedgerCode::new("1000").is_ok());
        assert!(LedgerCode::new("305").is_err());
        assert!(LedgerCode::new("30a55").is_err());
        assert!(LedgerCode::new("").is_err());
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(LedgerCode::parse_cell(" \"30055\" ").unwrap().as_str(), "30055");
        assert_eq!(LedgerCode::parse_cell("30055.0").unwrap().as_str(), "30055");
        assert!(LedgerCode::parse_cell("305.0").is_err());
        assert!(LedgerCode::parse_cell("3005.5").is_err());
    }

    #[test]
    fn test_numeric_ordering() {
        let a = LedgerCode::new("9000").unwrap();
        let b = LedgerCode::new("30055").unwrap();
        assert!(a.numeric() < b.numeric());
        assert!(a > b);
    }
}
