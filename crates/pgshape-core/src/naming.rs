//! Name conversion between declared identifiers and database names.

/// Converts a declared name to `snake_case`.
///
/// An uppercase ASCII letter is lowered and preceded by `_` when it is not the
/// first character, the previous character is not `_`, and either the previous
/// character or the next one is lowercase. Runs of capitals therefore stay
/// together: `AppXID` becomes `app_xid` and `HTTPServer` becomes `http_server`.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = String::with_capacity(name.len() + name.len() / 2);

    for (i, c) in name.char_indices() {
        if !c.is_ascii_uppercase() {
            out.push(c);
            continue;
        }
        let prev_lower = i > 0 && bytes[i - 1].is_ascii_lowercase();
        let next_lower = bytes.get(i + 1).is_some_and(u8::is_ascii_lowercase);
        if i > 0 && bytes[i - 1] != b'_' && (prev_lower || next_lower) {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Case-insensitive identifier comparison.
#[must_use]
pub fn eq_fold(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.to_lowercase() == b.to_lowercase()
}
