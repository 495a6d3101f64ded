use crate::model::{EventCode, LedgerCode, Tax};
use crate::recon::{LedgerKey, Reconciliation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const INSS_CODES: &[&str] = &[
    "30039", "30055", "30056", "30057", "30072", "30073", "40023", "60001", "70019", "80030",
];
const IRRF_CODES: &[&str] = &["30058", "40024", "40025", "50003", "60002", "80031"];
const FGTS_CODES: &[&str] = &["30051", "30059", "50026", "70015"];

/// The ledger codes that belong to each tax. A code listed under several taxes is classified
/// under the first of INSS, IRRF, FGTS.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxCodes {
    pub inss: Vec<LedgerCode>,
    pub irrf: Vec<LedgerCode>,
    pub fgts: Vec<LedgerCode>,
}

impl Default for TaxCodes {
    fn default() -> Self {
        fn codes(list: &[&str]) -> Vec<LedgerCode> {
            list.iter().filter_map(|c| LedgerCode::new(*c).ok()).collect()
        }
        Self {
            inss: codes(INSS_CODES),
            irrf: codes(IRRF_CODES),
            fgts: codes(FGTS_CODES),
        }
    }
}

impl TaxCodes {
    pub fn classify(&self, code: &LedgerCode) -> Option<Tax> {
        if self.inss.contains(code) {
            Some(Tax::Inss)
        } else if self.irrf.contains(code) {
            Some(Tax::Irrf)
        } else if self.fgts.contains(code) {
            Some(Tax::Fgts)
        } else {
            None
        }
    }
}

/// One tax ledger code. Totals are magnitudes: tax lines are compared regardless of which side
/// books them as credits.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaxLine {
    pub tax: Tax,
    pub code: LedgerCode,
    pub event_codes: Vec<EventCode>,
    pub description: String,
    pub pdf_total: Decimal,
    pub ledger_total: Decimal,
    pub difference: Decimal,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaxReport {
    pub lines: Vec<TaxLine>,
    /// Sum of absolute differences per tax.
    pub divergence: BTreeMap<Tax, Decimal>,
}

/// Picks the tax codes out of the by-ledger-code report.
pub fn tax_report(by_code: &[Reconciliation<LedgerKey>], codes: &TaxCodes) -> TaxReport {
    let mut report = TaxReport::default();
    for record in by_code {
        let key = record.key();
        let Some(code) = key.code.as_ref() else {
            continue;
        };
        let Some(tax) = codes.classify(code) else {
            continue;
        };
        let pdf_total = record.pdf_total().abs();
        let ledger_total = record.ledger_total().abs();
        let difference = pdf_total - ledger_total;
        *report.divergence.entry(tax).or_default() += difference.abs();
        report.lines.push(TaxLine {
            tax,
            code: code.clone(),
            event_codes: key.event_codes.clone(),
            description: key.description.clone(),
            pdf_total,
            ledger_total,
            difference,
        });
    }
    report
        .lines
        .sort_by(|a, b| a.tax.cmp(&b.tax).then(a.code.numeric().cmp(&b.code.numeric())));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recon::Tolerance;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record(code: &str, pdf: &str, ledger: &str) -> Reconciliation<LedgerKey> {
        Reconciliation::compare(
            LedgerKey {
                code: Some(LedgerCode::new(code).unwrap()),
                event_codes: Vec::new(),
                description: String::new(),
            },
            d(pdf),
            d(ledger),
            Tolerance::default(),
        )
    }

    #[test]
    fn test_default_codes() {
        let codes = TaxCodes::default();
        assert_eq!(codes.inss.len(), 10);
        assert_eq!(codes.classify(&LedgerCode::new("30058").unwrap()), Some(Tax::Irrf));
        assert_eq!(codes.classify(&LedgerCode::new("70015").unwrap()), Some(Tax::Fgts));
        assert_eq!(codes.classify(&LedgerCode::new("12345").unwrap()), None);
    }

    #[test]
    fn test_tax_report() {
        let by_code = vec![
            record("30058", "-200", "-190"),
            record("30055", "1234.56", "1234.55"),
            record("12345", "1", "2"),
            record("30051", "80", "80"),
        ];
        let report = tax_report(&by_code, &TaxCodes::default());
        let codes: Vec<&str> = report.lines.iter().map(|l| l.code.as_str()).collect();
        assert_eq!(codes, vec!["30055", "30058", "30051"]);
        assert_eq!(report.lines[1].pdf_total, d("200"));
        assert_eq!(report.lines[1].difference, d("10"));
        assert_eq!(report.divergence[&Tax::Inss], d("0.01"));
        assert_eq!(report.divergence[&Tax::Irrf], d("10"));
        assert_eq!(report.divergence[&Tax::Fgts], d("0"));
    }

    #[test]
    fn test_custom_codes_from_json() {
        let codes: TaxCodes = serde_json::from_str(r#"{"irrf": ["99999"]}"#).unwrap();
        assert_eq!(codes.classify(&LedgerCode::new("99999").unwrap()), Some(Tax::Irrf));
        // unspecified lists keep their defaults
        assert_eq!(codes.classify(&LedgerCode::new("30055").unwrap()), Some(Tax::Inss));
    }
}
