//! Column letter codec.
//!
//! Columns are numbered in bijective base 26: `A` is 0, `Z` is 25, `AA` is 26.
//! There is no zero digit, so every index has exactly one letter name.

use dashmap::DashMap;
use std::sync::OnceLock;

fn decoded_columns() -> &'static DashMap<String, usize> {
    static CACHE: OnceLock<DashMap<String, usize>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

/// Convert column letters to a 0-indexed column (`A` -> 0, `AA` -> 26).
///
/// Accepts either case. Returns `None` for empty input, non-letters, or
/// names too long to fit in a `usize`.
pub fn col_to_index(letters: &str) -> Option<usize> {
    if let Some(hit) = decoded_columns().get(letters) {
        return Some(*hit);
    }

    let mut acc = 0usize;
    for c in letters.bytes() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() - b'A') as usize + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    let index = acc.checked_sub(1)?;

    decoded_columns().insert(letters.to_string(), index);
    Some(index)
}

/// Convert a 0-indexed column to its letter name (0 -> `A`, 25 -> `Z`, 26 -> `AA`).
pub fn index_to_col(index: usize) -> String {
    let mut out = String::new();
    let mut n = index as u128 + 1;
    while n > 0 {
        n -= 1;
        out.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_columns() {
        assert_eq!(col_to_index("A"), Some(0));
        assert_eq!(col_to_index("B"), Some(1));
        assert_eq!(col_to_index("Z"), Some(25));
        assert_eq!(col_to_index("AA"), Some(26));
        assert_eq!(col_to_index("BA"), Some(52));
        assert_eq!(col_to_index("ZADDS"), Some(11_901_778));
    }

    #[test]
    fn test_rejects_bad_letters() {
        assert_eq!(col_to_index(""), None);
        assert_eq!(col_to_index("A1"), None);
        assert_eq!(col_to_index("$A"), None);
        assert_eq!(col_to_index(&"Z".repeat(40)), None);
    }

    #[test]
    fn test_lowercase_is_accepted() {
        assert_eq!(col_to_index("ab"), Some(27));
    }

    #[test]
    fn test_codec_is_bijective() {
        for n in 0..10_000 {
            let letters = index_to_col(n);
            assert_eq!(col_to_index(&letters), Some(n), "index {n}");
            assert_eq!(index_to_col(col_to_index(&letters).unwrap()), letters);
        }
    }

    #[test]
    fn test_index_to_col_handles_max_usize() {
        let letters = index_to_col(usize::MAX);
        assert!(!letters.is_empty());
        assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
    }
}
