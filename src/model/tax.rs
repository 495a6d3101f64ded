use crate::text::normalize;
use serde::{Deserialize, Serialize};

/// Payroll taxes and contributions tracked by their own ledger codes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tax {
    Inss,
    Irrf,
    Fgts,
}

serde_plain::derive_display_from_serialize!(Tax);
serde_plain::derive_fromstr_from_deserialize!(Tax);

impl Tax {
    pub const ALL: [Tax; 3] = [Tax::Inss, Tax::Irrf, Tax::Fgts];

    /// The tax a mapping document key names, ignoring case and accents.
    pub fn from_section_key(key: &str) -> Option<Tax> {
        match normalize(key).as_str() {
            "inss" => Some(Tax::Inss),
            "irrf" => Some(Tax::Irrf),
            "fgts" => Some(Tax::Fgts),
            _ => None,
        }
    }
}
