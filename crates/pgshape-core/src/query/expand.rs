//! List expansion for `IN (...)` style bindings.

use crate::error::{Error, Result};

use super::value::SqlArg;

/// Where an argument lands in the flattened argument list.
#[derive(Debug, Clone, Copy)]
struct Slot {
    /// One-based position of the first flattened value.
    from: usize,
    /// Number of placeholders it expands to; zero for scalars.
    len: usize,
}

impl Slot {
    fn write(self, out: &mut String) {
        out.push('$');
        out.push_str(&self.from.to_string());
        for k in 1..self.len {
            out.push_str(",$");
            out.push_str(&(self.from + k).to_string());
        }
    }
}

/// Expands list arguments into one placeholder per element.
///
/// Valuers are resolved first. Each list bound to a `?` or `$n`
/// placeholder becomes `$from,$from+1,...` and its elements are flattened
/// into the argument list; scalars keep a single placeholder. Numbering is
/// contiguous across all expansions. Byte strings are scalars. `??`, `?|`
/// and `?&` are not placeholders. When no argument is a list the query and
/// arguments come back unchanged.
///
/// # Errors
///
/// - [`Error::EmptyList`] when a list argument is empty.
/// - [`Error::TooManyPlaceholders`] when `?` placeholders outnumber arguments.
/// - [`Error::PlaceholderOutOfRange`] when a `$n` refers past the arguments.
pub fn expand(query: &str, args: Vec<SqlArg>) -> Result<(String, Vec<SqlArg>)> {
    let args: Vec<SqlArg> = args.into_iter().map(SqlArg::resolved).collect();

    let mut slots = Vec::with_capacity(args.len());
    let mut flat_count = 0;
    let mut any_list = false;
    for (i, arg) in args.iter().enumerate() {
        let len = match arg {
            SqlArg::List(items) if items.is_empty() => {
                return Err(Error::EmptyList {
                    position: i + 1,
                    query: query.to_string(),
                });
            }
            SqlArg::List(items) => {
                any_list = true;
                items.len()
            }
            _ => 0,
        };
        slots.push(Slot {
            from: flat_count + 1,
            len,
        });
        flat_count += len.max(1);
    }

    if !any_list {
        return Ok((query.to_string(), args));
    }

    let bytes = query.as_bytes();
    let mut out = String::with_capacity(query.len() + 3 * flat_count);
    let mut next = 0;
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'?' if matches!(bytes.get(i + 1), Some(b'?' | b'|' | b'&')) => i += 2,
            b'?' => {
                let slot = *slots.get(next).ok_or(Error::TooManyPlaceholders)?;
                next += 1;
                out.push_str(&query[copied..i]);
                slot.write(&mut out);
                i += 1;
                copied = i;
            }
            b'$' => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                if digits == 0 {
                    i += 1;
                    continue;
                }
                let n = bytes[i + 1..=i + digits].iter().fold(0_usize, |n, b| {
                    n.saturating_mul(10).saturating_add(usize::from(b - b'0'))
                });
                if n == 0 || n > slots.len() {
                    return Err(Error::PlaceholderOutOfRange(n));
                }
                out.push_str(&query[copied..i]);
                slots[n - 1].write(&mut out);
                i += 1 + digits;
                copied = i;
            }
            _ => i += 1,
        }
    }
    out.push_str(&query[copied..]);

    let mut flat = Vec::with_capacity(flat_count);
    for arg in args {
        match arg {
            SqlArg::List(items) => flat.extend(items.into_iter().map(SqlArg::resolved)),
            scalar => flat.push(scalar),
        }
    }

    tracing::debug!(query = %out, args = flat.len(), "Expanded list arguments");
    Ok((out, flat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::value::{ToSqlArg, Valuer};

    #[derive(Debug)]
    struct NoTags;

    impl Valuer for NoTags {
        fn value(&self) -> SqlArg {
            SqlArg::Null
        }
    }

    #[test]
    fn test_three_element_list() {
        let (sql, args) = expand(
            "SELECT * FROM t WHERE a = ? AND id IN (?) AND b = ?",
            vec![1_i64.to_sql_arg(), SqlArg::list([10, 20, 30]), "x".to_sql_arg()],
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a = $1 AND id IN ($2,$3,$4) AND b = $5");
        assert_eq!(
            args,
            [
                SqlArg::Int(1),
                SqlArg::Int(10),
                SqlArg::Int(20),
                SqlArg::Int(30),
                SqlArg::Text("x".into()),
            ]
        );
    }

    #[test]
    fn test_numbered_placeholders() {
        let (sql, args) = expand(
            "SELECT * FROM t WHERE id IN ($2) AND a = $1 OR a = $1",
            vec![5_i64.to_sql_arg(), SqlArg::list(["p", "q"])],
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE id IN ($2,$3) AND a = $1 OR a = $1");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let err = expand("id IN (?)", vec![SqlArg::List(Vec::new())]).unwrap_err();
        assert_eq!(
            err,
            Error::EmptyList {
                position: 1,
                query: "id IN (?)".to_string(),
            }
        );
    }

    #[test]
    fn test_no_lists_is_identity() {
        let args = vec![1_i64.to_sql_arg(), vec![1_u8, 2].to_sql_arg()];
        let (sql, out) = expand("a = ? AND b = ?", args.clone()).unwrap();
        assert_eq!(sql, "a = ? AND b = ?");
        assert_eq!(out, args);
    }

    #[test]
    fn test_bytes_beside_a_list_stay_scalar() {
        let (sql, args) = expand(
            "UPDATE t SET blob = ? WHERE id IN (?)",
            vec![vec![7_u8, 8, 9].to_sql_arg(), SqlArg::list([1, 2])],
        )
        .unwrap();
        assert_eq!(sql, "UPDATE t SET blob = $1 WHERE id IN ($2,$3)");
        assert_eq!(
            args,
            [SqlArg::Bytes(vec![7, 8, 9]), SqlArg::Int(1), SqlArg::Int(2)]
        );
    }

    #[test]
    fn test_valuer_resolving_to_null_is_scalar() {
        let (sql, args) = expand(
            "a = ? AND id IN (?)",
            vec![SqlArg::valuer(NoTags), SqlArg::list([1, 2])],
        )
        .unwrap();
        assert_eq!(sql, "a = $1 AND id IN ($2,$3)");
        assert_eq!(args[0], SqlArg::Null);
    }

    #[test]
    fn test_operators_and_escapes_are_skipped() {
        let (sql, _) = expand(
            "tags ?| ? AND x ?? y AND id IN (?) AND price > $$",
            vec![SqlArg::list(["a"]), SqlArg::list([1, 2])],
        )
        .unwrap();
        assert_eq!(sql, "tags ?| $1 AND x ?? y AND id IN ($2,$3) AND price > $$");
    }

    #[test]
    fn test_binding_errors() {
        assert_eq!(
            expand("? ?", vec![SqlArg::list([1])]).unwrap_err(),
            Error::TooManyPlaceholders
        );
        assert_eq!(
            expand("$3", vec![SqlArg::list([1])]).unwrap_err(),
            Error::PlaceholderOutOfRange(3)
        );
        assert_eq!(
            expand("$0", vec![SqlArg::list([1])]).unwrap_err(),
            Error::PlaceholderOutOfRange(0)
        );
    }
}
