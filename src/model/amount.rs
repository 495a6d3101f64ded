//! Amount type for handling monetary values written in the Brazilian convention.
//!
//! This module provides the `Amount` type which wraps `Decimal` and handles parsing values that
//! may or may not include a `R$` prefix and `.` thousands separators, with `,` as the decimal
//! separator. Plain decimals such as `1234.56` (as found in some ledger exports) are accepted too.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Represents how amounts were (or should be) formatted.
///
/// # Examples
///  - `AmountFormat{ currency: true, grouping: true }` -> `-R$ 60.000,00`
///  - `AmountFormat{ currency: false, grouping: true }` -> `-60.000,00`
///  - `AmountFormat{ currency: false, grouping: false }` -> `-60000,00`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AmountFormat {
    /// Whether a `R$ ` prefix is present in the formatting.
    currency: bool,
    /// Whether `.` is present as a thousands separator in the formatting.
    grouping: bool,
}

impl Default for AmountFormat {
    fn default() -> Self {
        DEFAULT_FORMAT
    }
}

/// The default format has thousands separators but no currency symbol: e.g. `-60.000,00`.
const DEFAULT_FORMAT: AmountFormat = AmountFormat {
    currency: false,
    grouping: true,
};

const MONEY_FORMAT: AmountFormat = AmountFormat {
    currency: true,
    grouping: true,
};

/// Represents a currency amount.
///
/// Formatting is considered significant for the purposes of equality, so for numeric comparisons,
/// you should access the `Decimal` value and use that.
///
/// # Examples
///
/// ```
/// # use payroll_recon::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("-1.234,56").unwrap();
/// assert_eq!(amount.to_string(), "-1.234,56");
/// assert_eq!(amount.value().to_string(), "-1234.56");
/// ```
///
/// Value equivalency, but not absolute equivalency
/// ```
/// # use payroll_recon::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("5000,00").unwrap();
/// let b = Amount::from_str("R$ 5.000,00").unwrap();
/// assert_ne!(a, b);
/// assert_eq!(a.value(), b.value());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    /// The parsed numerical value.
    value: Decimal,
    /// The way the numerical value was parsed from, or should be written to, a `String`.
    format: AmountFormat,
}

impl Amount {
    /// Creates a new Amount from a Decimal value with default `String` formatting.
    pub const fn new(value: Decimal) -> Self {
        Self {
            value,
            format: DEFAULT_FORMAT,
        }
    }

    /// Creates an Amount that displays like `R$ 1.234,56`.
    pub const fn money(value: Decimal) -> Self {
        Self {
            value,
            format: MONEY_FORMAT,
        }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value().is_zero()
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.value().is_sign_negative()
    }
}

/// An error that can occur when parsing strings into `Amount` values.
#[derive(Debug, Error)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,

    #[error("'{0}' is not a valid amount")]
    Invalid(String),

    #[error(transparent)]
    Decimal(#[from] rust_decimal::Error),
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }

        let (mut negative, rest) = strip_sign(trimmed);
        let (currency, rest) = match rest.strip_prefix("R$") {
            Some(after) => (true, after.trim_start()),
            None => (false, rest),
        };
        // The sign may also follow the currency symbol ("R$ -5,00") or trail the digits ("5,00-").
        let (after_currency_sign, rest) = strip_sign(rest);
        negative ^= after_currency_sign;
        let rest = match rest.strip_suffix('-') {
            Some(before) => {
                negative = !negative;
                before.trim_end()
            }
            None => rest,
        };

        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
            return Err(AmountError::Invalid(s.to_string()));
        }

        let (integer, fraction, grouping) = split_number(rest)
            .ok_or_else(|| AmountError::Invalid(s.to_string()))?;

        let canonical = if fraction.is_empty() {
            integer
        } else {
            format!("{integer}.{fraction}")
        };
        let mut value = Decimal::from_str(&canonical)?;
        if negative {
            value.set_sign_negative(true);
        }
        Ok(Amount {
            value,
            format: AmountFormat { currency, grouping },
        })
    }
}

/// Removes one leading `-` or `+`, returning whether the value was negative.
fn strip_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest.trim_start())
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest.trim_start())
    } else {
        (false, s)
    }
}

/// Splits an unsigned number into integer digits, fraction digits and whether `.` grouping was
/// used. Returns `None` when the separators do not form a recognizable number.
fn split_number(s: &str) -> Option<(String, String, bool)> {
    let commas = s.matches(',').count();
    match commas {
        // Brazilian: `.` groups thousands, `,` separates decimals.
        1 => {
            let (integer, fraction) = s.split_once(',')?;
            if fraction.contains('.') || !is_grouped_or_plain(integer) {
                return None;
            }
            let grouping = integer.contains('.');
            Some((integer.replace('.', ""), fraction.to_string(), grouping))
        }
        0 if s.contains('.') => {
            if is_thousands_grouped(s) {
                // `1.234` is one thousand two hundred thirty-four, not a fraction.
                Some((s.replace('.', ""), String::new(), true))
            } else if s.matches('.').count() == 1 {
                let (integer, fraction) = s.split_once('.')?;
                Some((integer.to_string(), fraction.to_string(), false))
            } else {
                None
            }
        }
        0 => Some((s.to_string(), String::new(), false)),
        _ => None,
    }
}

fn is_grouped_or_plain(integer: &str) -> bool {
    !integer.is_empty() && (!integer.contains('.') || is_thousands_grouped(integer))
}

/// True for `1.234`, `12.345.678`, but not for `1234.5`, `1.23` or `0.500`.
fn is_thousands_grouped(s: &str) -> bool {
    let mut groups = s.split('.');
    let first = match groups.next() {
        Some(first) => first,
        None => return false,
    };
    let mut saw_group = false;
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        saw_group = true;
    }
    saw_group
        && (1..=3).contains(&first.len())
        && !first.starts_with('0')
        && first.chars().all(|c| c.is_ascii_digit())
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.value().round_dp(2);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let num = rounded.abs();

        let cur = if self.format.currency { "R$ " } else { "" };

        let digits = if self.format.grouping {
            // format_num writes `1,234.56`; swap the separators into `1.234,56`.
            format_num::format_num!(",.2", num.to_f64().unwrap_or_default())
                .chars()
                .map(|c| match c {
                    ',' => '.',
                    '.' => ',',
                    other => other,
                })
                .collect::<String>()
        } else {
            format!("{num:.2}").replace('.', ",")
        };
        write!(f, "{sign}{cur}{digits}")
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
