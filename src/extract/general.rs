//! Reads the consolidated figures of a "Resumo Geral": the net INSS, the assessed FGTS, the IRRF
//! withheld per source and the net pró-labore paid to partners and self-employed workers.
//!
//! These figures are printed as labelled values rather than in event tables. A label is matched
//! word by word against each row, ignoring case, accents and a trailing colon, and the amounts
//! printed right after it are read.

use crate::extract::layout::{group_rows, Row};
use crate::extract::token::PageSource;
use crate::model::{Amount, Tax};
use crate::text::normalize;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, trace};

const INSS_NET: &[&str] = &["total", "liquido"];
const FGTS_WITHOUT_CS: &[&str] = &["total", "fgts", "apurado", "recibos", "s/cs"];
const FGTS: &[&str] = &["total", "fgts", "apurado", "recibos"];
const PROLABORE: &[&str] = &["003", "pro", "labore"];
const PROLABORE_INSS: &[&str] = &["013", "inss"];

/// Where a withheld IRRF amount comes from, as listed in the DARF block.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrfSource {
    Folha,
    Ferias,
    Rescisao,
    Socio,
    Autonomo,
}

serde_plain::derive_display_from_serialize!(IrrfSource);

impl IrrfSource {
    const ALL: [IrrfSource; 5] = [
        IrrfSource::Folha,
        IrrfSource::Ferias,
        IrrfSource::Rescisao,
        IrrfSource::Socio,
        IrrfSource::Autonomo,
    ];

    fn label(&self) -> [&'static str; 2] {
        let source = match self {
            IrrfSource::Folha => "folha",
            IrrfSource::Ferias => "ferias",
            IrrfSource::Rescisao => "rescisao",
            IrrfSource::Socio => "socio",
            IrrfSource::Autonomo => "autonomo",
        };
        ["irrf", source]
    }
}

/// The figures found in a general summary. A figure the document does not print is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralSummary {
    pub inss_net: Option<Decimal>,
    pub fgts_assessed: Option<Decimal>,
    pub irrf: BTreeMap<IrrfSource, Decimal>,
    pub partners_net: Option<Decimal>,
    pub self_employed_net: Option<Decimal>,
}

impl GeneralSummary {
    /// The sum of the IRRF sources found.
    pub fn irrf_total(&self) -> Option<Decimal> {
        if self.irrf.is_empty() {
            None
        } else {
            Some(self.irrf.values().copied().sum())
        }
    }

    /// The figure the ledger's postings of `tax` are compared with.
    pub fn tax_total(&self, tax: Tax) -> Option<Decimal> {
        match tax {
            Tax::Inss => self.inss_net,
            Tax::Irrf => self.irrf_total(),
            Tax::Fgts => self.fgts_assessed,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inss_net.is_none()
            && self.fgts_assessed.is_none()
            && self.irrf.is_empty()
            && self.partners_net.is_none()
            && self.self_employed_net.is_none()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Region {
    Body,
    /// From "DARF IR" to "Outras informações".
    Darf,
    /// From "Valores pagos aos sócios" to "Total de sócios".
    Partners,
}

/// Scans every row of the document. The first occurrence of each figure wins.
pub fn extract_general(source: &dyn PageSource, y_tolerance: f64) -> GeneralSummary {
    let mut out = GeneralSummary::default();
    let mut region = Region::Body;
    let mut fgts_fallback = None;
    let mut partners_seen = false;
    let mut gross: Option<(Decimal, Decimal)> = None;
    let mut withheld: Option<(Decimal, Decimal)> = None;

    for page in source.pages() {
        for row in group_rows(&page.tokens, y_tolerance) {
            let words = row_words(&row);
            if words.is_empty() {
                continue;
            }
            let normalized = words.join(" ");

            if normalized.contains("darf ir") {
                trace!("DARF block on page {}", page.number);
                region = Region::Darf;
            } else if normalized.contains("valores pagos aos socios") {
                trace!("Partners block on page {}", page.number);
                partners_seen = true;
                region = Region::Partners;
            }

            if out.inss_net.is_none() {
                out.inss_net = first_amount_after(&words, INSS_NET);
            }
            if out.fgts_assessed.is_none() {
                out.fgts_assessed = first_amount_after(&words, FGTS_WITHOUT_CS);
            }
            if fgts_fallback.is_none() {
                fgts_fallback = first_amount_after(&words, FGTS);
            }

            match region {
                Region::Darf => {
                    for irrf in IrrfSource::ALL {
                        if out.irrf.contains_key(&irrf) {
                            continue;
                        }
                        if let Some(amount) = first_amount_after(&words, &irrf.label()) {
                            out.irrf.insert(irrf, amount);
                        }
                    }
                    if normalized.contains("outras informacoes") {
                        region = Region::Body;
                    }
                }
                Region::Partners => {
                    if gross.is_none() {
                        gross = amount_pair_after(&words, PROLABORE);
                    }
                    if withheld.is_none() {
                        withheld = amount_pair_after(&words, PROLABORE_INSS);
                    }
                    if normalized.contains("total de socios") {
                        region = Region::Body;
                    }
                }
                Region::Body => {}
            }
        }
    }

    if out.fgts_assessed.is_none() {
        out.fgts_assessed = fgts_fallback;
    }
    if partners_seen && (gross.is_some() || withheld.is_some()) {
        let (partners, self_employed) = gross.unwrap_or_default();
        let (partners_inss, self_employed_inss) = withheld.unwrap_or_default();
        out.partners_net = Some(partners - partners_inss);
        out.self_employed_net = Some(self_employed - self_employed_inss);
    }

    debug!(
        "General summary: INSS {:?}, FGTS {:?}, IRRF {:?}, pró-labore {:?}/{:?}",
        out.inss_net,
        out.fgts_assessed,
        out.irrf_total(),
        out.partners_net,
        out.self_employed_net
    );
    out
}

/// The normalized words of a row, with trailing colons dropped.
fn row_words(row: &Row) -> Vec<String> {
    row.tokens()
        .iter()
        .flat_map(|t| t.text.split_whitespace())
        .map(|w| normalize(w.trim_end_matches(':')))
        .filter(|w| !w.is_empty())
        .collect()
}

/// The amounts printed right after the first occurrence of `label`.
fn amounts_after(words: &[String], label: &[&str]) -> Vec<Decimal> {
    let Some(start) = words
        .windows(label.len())
        .position(|window| window.iter().zip(label).all(|(w, l)| w == l))
    else {
        return Vec::new();
    };
    words[start + label.len()..]
        .iter()
        .map_while(|w| parse_amount(w))
        .collect()
}

fn first_amount_after(words: &[String], label: &[&str]) -> Option<Decimal> {
    amounts_after(words, label).first().copied()
}

fn amount_pair_after(words: &[String], label: &[&str]) -> Option<(Decimal, Decimal)> {
    match amounts_after(words, label)[..] {
        [first, second, ..] => Some((first, second)),
        _ => None,
    }
}

fn parse_amount(word: &str) -> Option<Decimal> {
    if !word.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Amount::from_str(word).ok().map(|a| a.value())
}
