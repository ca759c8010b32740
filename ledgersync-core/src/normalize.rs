//! Reference normalization and the acceptance rule for fuzzy reference hits.

/// Minimum length of the shorter reference for a containment hit to count
/// without a prefix relation.
pub const MIN_CONTAINED_LEN: usize = 5;

fn fold_char(c: char, out: &mut String) {
    let folded = match c {
        'ä' | 'á' | 'à' | 'â' | 'ã' | 'å' | 'Ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Å' => "a",
        'ö' | 'ó' | 'ò' | 'ô' | 'õ' | 'ø' | 'Ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ø' => "o",
        'ü' | 'ú' | 'ù' | 'û' | 'Ü' | 'Ú' | 'Ù' | 'Û' => "u",
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => "e",
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => "i",
        'ç' | 'Ç' => "c",
        'ñ' | 'Ñ' => "n",
        'ß' => "ss",
        _ => {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
            }
            return;
        }
    };
    out.push_str(folded);
}

/// Fold diacritics, lowercase, and drop everything that is not `[a-z0-9]`.
///
/// `"RE-2024/007 Müller"` becomes `"re2024007muller"`.
pub fn normalize_reference(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        fold_char(c, &mut out);
    }
    out
}

/// Accept `a`/`b` as the same reference.
///
/// Equal strings always match. Otherwise one must contain the other, and the
/// shorter one must either be at least [`MIN_CONTAINED_LEN`] characters long
/// or be a prefix of the longer one. This keeps `"07"` from matching
/// `"2024-007"` while `"RE-2024-007"` still finds `"2024-007"`.
pub fn is_good_reference_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if !longer.contains(shorter) {
        return false;
    }
    shorter.chars().count() >= MIN_CONTAINED_LEN || longer.starts_with(shorter)
}

/// Raw or normalized acceptance. Used when re-validating a match before
/// writing, since matching itself may have gone through the normalized key.
pub fn references_agree(document_ref: &str, bank_ref: &str) -> bool {
    let (doc, bank) = (document_ref.trim(), bank_ref.trim());
    is_good_reference_match(doc, bank)
        || is_good_reference_match(&normalize_reference(doc), &normalize_reference(bank))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_reference() {
        assert_eq!(normalize_reference("RE-2024/007 Müller"), "re2024007muller");
        assert_eq!(normalize_reference("  Straße 5 "), "strasse5");
        assert_eq!(normalize_reference("---"), "");
    }

    #[test]
    fn test_containment_with_long_reference() {
        assert!(is_good_reference_match("RE-2024-007", "2024-007"));
        assert!(is_good_reference_match("2024-007", "RE-2024-007"));
    }

    #[test]
    fn test_short_reference_needs_prefix() {
        assert!(!is_good_reference_match("07", "2024-007"));
        assert!(is_good_reference_match("20", "2024-007"));
        assert!(!is_good_reference_match("", "2024-007"));
    }

    #[test]
    fn test_unrelated_references() {
        assert!(!is_good_reference_match("RE100", "RE200"));
    }

    #[test]
    fn test_references_agree_via_normalized_form() {
        assert!(references_agree("RE 100", "re-100"));
        assert!(!references_agree("RE 100", "RE 200"));
    }
}
