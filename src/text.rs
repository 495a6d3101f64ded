//! Case and accent insensitive canonical form for strings.
//!
//! Every comparison of human text in this crate (section headers, table headers, footers, mapping
//! category keys) goes through [`normalize`] on both sides.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lower-cases, strips diacritics and collapses whitespace.
///
/// Compatibility decomposition (NFKD) is used so that ordinal indicators also fold: `13ª` becomes
/// `13a` and `13º` becomes `13o`.
///
/// ```
/// # use payroll_recon::text::normalize;
/// assert_eq!(normalize("  Rescisão   Complementar "), "rescisao complementar");
/// assert_eq!(normalize("13ª Parcela"), "13a parcela");
/// ```
pub fn normalize(s: &str) -> String {
    // Lower-casing can yield decomposable characters, so decompose again afterwards.
    let lowered = strip_marks(s).to_lowercase();
    strip_marks(&lowered)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_marks(s: &str) -> String {
    s.nfkd().filter(|&c| !is_combining_mark(c)).collect()
}

/// Returns true if `haystack` contains every one of `needles`. Both sides are expected to be
/// normalized already.
pub fn contains_all(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().all(|n| haystack.contains(n))
}

/// Returns true if `haystack` contains any of `needles`.
pub fn contains_any<S: AsRef<str>>(haystack: &str, needles: &[S]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_accents() {
        assert_eq!(normalize("Férias"), "ferias");
        assert_eq!(normalize("AÇÃO"), "acao");
        assert_eq!(normalize("Pró-Labore"), "pro-labore");
        assert_eq!(normalize("Código"), "codigo");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("folha \t  de\npagamento"), "folha de pagamento");
    }

    #[test]
    fn test_total_on_empty_and_garbage() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("\u{0301}\u{0301}"), "");
        assert_eq!(normalize("#$%"), "#$%");
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(normalize("13º Salário"), "13o salario");
        assert_eq!(normalize("13ª parcela"), "13a parcela");
    }

    #[test]
    fn test_contains_helpers() {
        let s = normalize("Código Evento Quantidade Valor");
        assert!(contains_all(&s, &["codigo", "evento", "valor"]));
        assert!(!contains_all(&s, &["codigo", "total"]));
        assert!(contains_any(&s, &["total", "valor"]));
        assert!(!contains_any::<&str>(&s, &[]));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "[\\p{Latin}\\p{Greek}\\p{Cyrillic}0-9 \\t\\n.,/+-]{0,60}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_on_portuguese(s in "[a-zA-ZáàâãéêíóôõúçÁÀÂÃÉÊÍÓÔÕÚÇªº0-9 ]{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
