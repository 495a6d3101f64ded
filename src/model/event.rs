use crate::model::CategoryId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// A payroll event code: exactly three ASCII digits, leading zeros significant (`"003"`).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventCode(String);

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("'{0}' is not a 3-digit event code")]
pub struct EventCodeError(pub String);

impl EventCode {
    pub fn new(s: impl Into<String>) -> Result<Self, EventCodeError> {
        let s = s.into();
        if s.len() == 3 && s.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(s))
        } else {
            Err(EventCodeError(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for EventCode {
    type Err = EventCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EventCode {
    type Error = EventCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EventCode> for String {
    fn from(value: EventCode) -> Self {
        value.0
    }
}

impl Display for EventCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The `+`/`-` marker printed before an event code in the summary tables, if any.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    Plus,
    Minus,
    #[default]
    None,
}

impl Sign {
    /// Applies the printed marker to a parsed value. An explicit marker fixes the sign of the
    /// magnitude; without one the value keeps its own sign.
    pub fn apply(self, value: Decimal) -> Decimal {
        match self {
            Sign::Plus => value.abs(),
            Sign::Minus => -value.abs(),
            Sign::None => value,
        }
    }
}

/// One data row of a payroll summary table.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    category: CategoryId,
    event_code: EventCode,
    event_name: String,
    amount: Decimal,
    sign: Sign,
    /// The section title text the row was found under.
    section: String,
    /// 1-based page number.
    page: usize,
}

impl EventRow {
    pub fn new(
        category: CategoryId,
        event_code: EventCode,
        event_name: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            category,
            event_code,
            event_name: event_name.into(),
            amount,
            sign: Sign::None,
            section: String::new(),
            page: 1,
        }
    }

    pub(crate) fn with_origin(mut self, sign: Sign, section: impl Into<String>, page: usize) -> Self {
        self.sign = sign;
        self.section = section.into();
        self.page = page;
        self
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }

    pub fn event_code(&self) -> &EventCode {
        &self.event_code
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn page(&self) -> usize {
        self.page
    }
}
