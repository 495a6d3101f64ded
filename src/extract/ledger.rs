//! Reads the accounting batch export: a delimited text file with one posting per line.
//!
//! Only three columns matter: the ledger code (column 1, zero-based), the amount (column 3) and
//! the description (column 7). The delimiter and the text encoding vary between exports and are
//! both guessed.

use crate::model::{Amount, LedgerCode, LedgerRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, trace};

const CODE_COLUMN: usize = 1;
const AMOUNT_COLUMN: usize = 3;
const DESCRIPTION_COLUMN: usize = 7;

const DELIMITER_CANDIDATES: &[u8] = &[b';', b',', b'\t'];
const DEFAULT_DELIMITER: u8 = b';';
const SNIFF_LINES: usize = 10;

/// The outcome of extracting one ledger file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerExtraction {
    pub rows: Vec<LedgerRow>,
    /// Records dropped for an invalid code, an unreadable amount or a zero amount.
    pub skipped: usize,
    #[serde(with = "delimiter_char")]
    pub delimiter: u8,
}

/// Decodes file bytes as UTF-8, falling back to Windows-1252 (a superset of Latin-1) for exports
/// produced by older accounting systems.
pub fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            debug!("Ledger file is not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}

/// Picks the delimiter that splits the first lines into the most consistent number of columns.
/// Score is the number of lines sharing the most common column count times that count; lines a
/// candidate leaves whole (title lines, blank trailers) do not vote.
pub fn sniff_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    if sample.is_empty() {
        return DEFAULT_DELIMITER;
    }

    let mut best = DEFAULT_DELIMITER;
    let mut best_score = 0usize;
    for &delimiter in DELIMITER_CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delimiter)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();
        // the most common multi-column count, ties going to the wider one
        let mut frequency: BTreeMap<usize, usize> = BTreeMap::new();
        for &count in counts.iter().filter(|&&c| c > 1) {
            *frequency.entry(count).or_default() += 1;
        }
        let Some((target, consistent)) = frequency
            .into_iter()
            .max_by_key(|&(count, lines)| (lines, count))
        else {
            continue;
        };
        let score = consistent * target;
        if score > best_score {
            best_score = score;
            best = delimiter;
        }
    }
    best
}

/// Extracts ledger rows from decoded text, guessing the delimiter.
pub fn extract(text: &str) -> LedgerExtraction {
    extract_with_delimiter(text, sniff_delimiter(text))
}

/// Extracts ledger rows from decoded text. Rows keep file order and duplicate codes are not
/// merged.
pub fn extract_with_delimiter(text: &str, delimiter: u8) -> LedgerExtraction {
    let mut out = LedgerExtraction {
        delimiter,
        ..LedgerExtraction::default()
    };
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                trace!("Ledger record {}: unreadable: {e}", index + 1);
                out.skipped += 1;
                continue;
            }
        };
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 1);
        match parse_record(&record, line) {
            Some(row) => out.rows.push(row),
            None => out.skipped += 1,
        }
    }
    debug!(
        "Extracted {} ledger rows ({} skipped, delimiter '{}')",
        out.rows.len(),
        out.skipped,
        out.delimiter as char
    );
    out
}

fn parse_record(record: &csv::StringRecord, line: usize) -> Option<LedgerRow> {
    let code_cell = record.get(CODE_COLUMN).unwrap_or("");
    let code = match LedgerCode::parse_cell(code_cell) {
        Ok(code) => code,
        Err(e) => {
            trace!("Ledger line {line}: {e}");
            return None;
        }
    };

    let amount_cell: String = record
        .get(AMOUNT_COLUMN)
        .unwrap_or("")
        .chars()
        .filter(|c| *c != '"' && !c.is_whitespace())
        .collect();
    // BRL first ("1.234,56"), then a plain export with comma grouping ("1,234.56")
    let parsed = Amount::from_str(&amount_cell)
        .or_else(|_| Amount::from_str(&amount_cell.replace(',', "")));
    let amount = match parsed {
        Ok(amount) => amount.value(),
        Err(e) => {
            trace!("Ledger line {line}: {e}");
            return None;
        }
    };
    if amount.is_zero() {
        trace!("Ledger line {line}: zero amount for {code}");
        return None;
    }

    let description = record.get(DESCRIPTION_COLUMN).unwrap_or("").trim();
    Some(LedgerRow::new(code, amount).with_source(description, line))
}

mod delimiter_char {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &u8, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_char(*value as char)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<u8, D::Error>
    where
        D: Deserializer<'de>,
    {
        let c = char::deserialize(deserializer)?;
        u8::try_from(c).map_err(serde::de::Error::custom)
    }
}
