//! `?` to `$n` placeholder rebinding.

/// Rewrites `?` placeholders to numbered `$1, $2, ...` left to right.
///
/// `??` is an escaped literal `?` and becomes `?` without being counted;
/// the JSONB operators `?|` and `?&` pass through untouched.
///
/// ```
/// use pgshape_core::query::rebind;
///
/// assert_eq!(
///     rebind("SELECT * FROM t WHERE a = ? AND tags ?| ? AND b ?? 'k'"),
///     "SELECT * FROM t WHERE a = $1 AND tags ?| $2 AND b ? 'k'"
/// );
/// ```
#[must_use]
pub fn rebind(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 10);
    let mut rest = query;
    let mut n = 0_usize;

    while let Some(i) = rest.find('?') {
        match rest.as_bytes().get(i + 1) {
            Some(b'?') => {
                out.push_str(&rest[..=i]);
                rest = &rest[i + 2..];
            }
            Some(b'|' | b'&') => {
                out.push_str(&rest[..i + 2]);
                rest = &rest[i + 2..];
            }
            _ => {
                n += 1;
                out.push_str(&rest[..i]);
                out.push('$');
                out.push_str(&n.to_string());
                rest = &rest[i + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Counts the `?` placeholders [`rebind`] would number.
#[must_use]
pub fn count_placeholders(query: &str) -> usize {
    let bytes = query.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'?' {
            if matches!(bytes.get(i + 1), Some(b'?' | b'|' | b'&')) {
                i += 2;
                continue;
            }
            count += 1;
        }
        i += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_numbering() {
        assert_eq!(rebind("a = ? AND b = ?"), "a = $1 AND b = $2");
        assert_eq!(rebind("?"), "$1");
        assert_eq!(rebind("no placeholders"), "no placeholders");
        assert_eq!(rebind(""), "");
    }

    #[test]
    fn test_escapes_and_operators() {
        assert_eq!(rebind("x ?? y"), "x ? y");
        assert_eq!(rebind("tags ?| ? AND tags ?& ?"), "tags ?| $1 AND tags ?& $2");
        assert_eq!(rebind("???"), "?$1");
        assert_eq!(rebind("trailing ?"), "trailing $1");
    }

    #[test]
    fn test_multibyte_text_is_preserved() {
        assert_eq!(rebind("имя = ? -- ключ"), "имя = $1 -- ключ");
    }

    #[test]
    fn test_count_matches_rebind() {
        let q = "a = ? AND b ?| ? AND c ?? ?";
        assert_eq!(count_placeholders(q), 3);
        assert_eq!(rebind(q), "a = $1 AND b ?| $2 AND c ? $3");
    }

    proptest! {
        #[test]
        fn numbers_are_contiguous(parts in proptest::collection::vec("[a-z =]{1,6}", 1..12)) {
            let query = parts.join("?");
            let rebound = rebind(&query);
            let k = parts.len() - 1;
            prop_assert_eq!(count_placeholders(&query), k);
            for n in 1..=k {
                let placeholder = format!("${n}");
                prop_assert!(rebound.contains(&placeholder));
            }
            prop_assert!(!rebound.contains('?'));
        }

        #[test]
        fn escaped_forms_pass_through(text in "[a-z ]{0,12}") {
            let query = format!("{text} ?| {text} ?& {text}");
            prop_assert_eq!(rebind(&query), query);
        }
    }
}
