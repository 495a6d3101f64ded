use crate::text::normalize;
use serde::{Deserialize, Serialize};

/// The payroll report classes that events and mapping entries are grouped by.
///
/// Raw section titles and mapping keys never travel past canonicalization as free text; they
/// become one of these variants. Text that matches no rule becomes `Unrecognized`, which is kept
/// and reported like any other category.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
pub enum CategoryId {
    #[serde(rename = "Folha")]
    Folha,
    #[serde(rename = "Férias")]
    Ferias,
    #[serde(rename = "13ª Parcela")]
    DecimoTerceiro,
    #[serde(rename = "Adiantamento")]
    Adiantamento,
    #[serde(rename = "Rescisão")]
    Rescisao,
    #[serde(rename = "Pró-Labore")]
    ProLabore,
    #[serde(rename = "Geral")]
    Geral,
    #[default]
    #[serde(rename = "Unrecognized")]
    Unrecognized,
}

serde_plain::derive_display_from_serialize!(CategoryId);
serde_plain::derive_fromstr_from_deserialize!(CategoryId);

/// Ordered canonicalization rules. More specific patterns come before broader ones that share a
/// substring, e.g. "folha geral" must hit `Geral` before the generic "folha" rule.
const RULES: &[(Rule, CategoryId)] = &[
    (Rule::Contains(&["geral"]), CategoryId::Geral),
    (
        Rule::Contains(&["pro labore", "pro-labore", "prolabore"]),
        CategoryId::ProLabore,
    ),
    (Rule::Contains(&["rescisao"]), CategoryId::Rescisao),
    (Rule::Contains(&["ferias"]), CategoryId::Ferias),
    (Rule::Thirteenth, CategoryId::DecimoTerceiro),
    (Rule::Contains(&["adiantamento"]), CategoryId::Adiantamento),
    (Rule::Contains(&["folha"]), CategoryId::Folha),
];

enum Rule {
    /// Matches when the normalized text contains any of these substrings.
    Contains(&'static [&'static str]),
    /// Matches a "13", "13a" or "13o" word, or the words "decimo terceiro".
    Thirteenth,
}

impl Rule {
    fn matches(&self, normalized: &str) -> bool {
        match self {
            Rule::Contains(needles) => needles.iter().any(|n| normalized.contains(n)),
            Rule::Thirteenth => {
                normalized.contains("decimo terceiro")
                    || normalized
                        .split(|c: char| !c.is_alphanumeric())
                        .any(is_thirteenth_word)
            }
        }
    }
}

fn is_thirteenth_word(word: &str) -> bool {
    matches!(word, "13" | "13a" | "13o")
}

/// Longest line that can still be a section title.
const MAX_HEADER_LEN: usize = 80;

impl CategoryId {
    /// Maps raw header text (a PDF section title or a mapping document key) to a category.
    pub fn canonicalize(raw: &str) -> CategoryId {
        let normalized = normalize(raw);
        RULES
            .iter()
            .find(|(rule, _)| rule.matches(&normalized))
            .map(|(_, id)| *id)
            .unwrap_or(CategoryId::Unrecognized)
    }

    /// Decides whether a PDF text line is a section title and, if so, which category it opens.
    ///
    /// A title is short and carries no digits other than a "13" ordinal. Titles that match no
    /// rule but contain a `/` (e.g. "Sócios / Diretores") still open a section, as
    /// `Unrecognized`, so their events stay visible.
    pub fn from_section_header(line: &str) -> Option<CategoryId> {
        let normalized = normalize(line);
        if normalized.is_empty() || normalized.chars().count() > MAX_HEADER_LEN {
            return None;
        }
        let has_stray_digits = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !is_thirteenth_word(w))
            .any(|w| w.chars().any(|c| c.is_ascii_digit()));
        if has_stray_digits {
            return None;
        }
        match CategoryId::canonicalize(line) {
            CategoryId::Unrecognized if normalized.contains('/') => Some(CategoryId::Unrecognized),
            CategoryId::Unrecognized => None,
            id => Some(id),
        }
    }

    /// All categories in display order.
    pub fn all() -> &'static [CategoryId] {
        &[
            CategoryId::Folha,
            CategoryId::Ferias,
            CategoryId::DecimoTerceiro,
            CategoryId::Adiantamento,
            CategoryId::Rescisao,
            CategoryId::ProLabore,
            CategoryId::Geral,
            CategoryId::Unrecognized,
        ]
    }
}
