//! Query template scanner.

use std::ops::Range;

/// One scanned piece of a query: the text up to and including the boundary
/// that ended its word, and the template symbol that word carries, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Segment text with comments removed and control-character runs
    /// collapsed to one space. Quoted content is kept as written.
    pub text: String,
    /// Symbol such as `&Model`, `:Field` or `:Model.Field`.
    pub symbol: Option<String>,
    /// Byte range of the segment in the input.
    pub span: Range<usize>,
}

/// Returns whether `c` ends a word.
///
/// Letters, digits and `& : . _ *` are word characters; every other Latin-1
/// character is a boundary, as are the Unicode space separators above it.
#[must_use]
pub const fn is_boundary(c: char) -> bool {
    if (c as u32) <= 0xFF {
        return match c {
            '&' | ':' | '.' | '_' | '*' => false,
            '\u{85}' | '\u{A0}' => true,
            _ => !c.is_ascii_alphanumeric(),
        };
    }
    matches!(
        c,
        '\u{2000}'..='\u{200a}'
            | '\u{1680}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202f}'
            | '\u{205f}'
            | '\u{3000}'
    )
}

/// Quote and comment state shared by the word scan and the text cleanup.
#[derive(Debug, Default)]
struct Literal {
    quote: Option<char>,
    comment: bool,
}

impl Literal {
    /// Feeds a quote character; returns true when it opened or closed a span.
    fn toggle_quote(&mut self, c: char) -> bool {
        match self.quote {
            Some(q) if q == c => {
                self.quote = None;
                true
            }
            None => {
                self.quote = Some(c);
                true
            }
            Some(_) => false,
        }
    }
}

/// Splits a query template into [`Segment`]s in a single left-to-right pass.
///
/// Quoted spans never produce symbols, `--` starts a comment running to the
/// end of the line, and a `::` cast does not start a new symbol.
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner over `input`.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Scans the next word starting at `data`.
    ///
    /// Returns the number of bytes the segment consumes and the byte range of
    /// its word. A comment ending in a newline closes the segment without a
    /// word.
    fn scan_word(data: &str) -> (usize, Option<Range<usize>>) {
        let mut state = Literal::default();
        let mut chars = data.char_indices().peekable();
        let mut start = None;

        while let Some((i, c)) = chars.next() {
            if state.comment {
                if c == '\n' {
                    return (i + 1, None);
                }
                continue;
            }
            if (c == '"' || c == '\'') && state.toggle_quote(c) {
                continue;
            }
            if state.quote.is_some() {
                continue;
            }
            if c == '-' && chars.peek().is_some_and(|&(_, next)| next == '-') {
                state.comment = true;
                continue;
            }
            if !is_boundary(c) {
                start = Some(i);
                break;
            }
        }

        let Some(start) = start else {
            return (data.len(), None);
        };
        data[start..]
            .char_indices()
            .find(|&(_, c)| is_boundary(c))
            .map_or((data.len(), Some(start..data.len())), |(i, c)| {
                (start + i + c.len_utf8(), Some(start..start + i))
            })
    }

    /// Extracts the template symbol a word carries.
    ///
    /// A prefix before the first `:`/`&` (a table alias) is dropped, and a
    /// trailing `::type` cast is cut off.
    fn symbol(word: &str) -> Option<&str> {
        let word = match word.find([':', '&']) {
            Some(idx) if idx > 0 => &word[idx..],
            _ => word,
        };
        if !(word.starts_with('&') || word.starts_with(':')) || word.starts_with("::") {
            return None;
        }
        let word = word.find("::").map_or(word, |idx| &word[..idx]);
        (word.len() > 1).then_some(word)
    }

    /// Drops comments and collapses control characters outside quotes.
    fn clean(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut state = Literal::default();
        let mut last_space = false;
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            if state.comment {
                if c == '\n' {
                    state.comment = false;
                }
                continue;
            }
            if (c == '"' || c == '\'') && state.toggle_quote(c) {
                out.push(c);
                continue;
            }
            if state.quote.is_some() {
                out.push(c);
                continue;
            }
            if c == '-' && chars.peek() == Some(&'-') {
                state.comment = true;
                continue;
            }
            if c < ' ' {
                if !last_space {
                    last_space = true;
                    out.push(' ');
                }
            } else {
                out.push(c);
                last_space = false;
            }
        }
        out
    }
}

impl Iterator for Scanner<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        let data = &self.input[self.pos..];
        if data.is_empty() {
            return None;
        }
        let (advance, word) = Self::scan_word(data);
        let symbol = word
            .and_then(|range| Self::symbol(&data[range]))
            .map(str::to_string);
        let segment = Segment {
            text: Self::clean(&data[..advance]),
            symbol,
            span: self.pos..self.pos + advance,
        };
        self.pos += advance;
        Some(segment)
    }
}

/// Scans a whole query.
#[must_use]
pub fn segments(query: &str) -> Vec<Segment> {
    Scanner::new(query).collect()
}

/// Returns the symbols a query references, in order of appearance.
#[must_use]
pub fn symbols(query: &str) -> Vec<String> {
    Scanner::new(query).filter_map(|s| s.symbol).collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn pairs(query: &str) -> Vec<(String, Option<String>)> {
        segments(query)
            .into_iter()
            .map(|s| (s.text, s.symbol))
            .collect()
    }

    #[test]
    fn test_scan_reference_query() {
        let query = "Update a.&Model1 SET :Model1.ID-1+2*3/4=? WHERE :ID=? --:COMMENT1\n\t\tFROM SELECT :ID -3 - 5,:Model1.*,:Model2.ID,:Model1.Name,alias.:Model1.ID,:Model2_id \n\t\t-- comment with &SUPERMODEL\nFROM &CURRSCHEMA.&Model1=? LEFT JOIN &Model2.Many2ManyField-1 ON :Model1.ID=:Model2.FID\t\n\t\t\tAND :Model1.ID ?& array[\"a:F'X'&N\", 'b&c   ?:L']";
        let expected: &[(&str, Option<&str>)] = &[
            ("Update ", None),
            ("a.&Model1 ", Some("&Model1")),
            ("SET ", None),
            (":Model1.ID-", Some(":Model1.ID")),
            ("1+", None),
            ("2*3/", None),
            ("4=", None),
            ("? WHERE ", None),
            (":ID=", Some(":ID")),
            ("? ", None),
            (" FROM ", None),
            ("SELECT ", None),
            (":ID ", Some(":ID")),
            ("-3 ", None),
            ("- 5,", None),
            (":Model1.*,", Some(":Model1.*")),
            (":Model2.ID,", Some(":Model2.ID")),
            (":Model1.Name,", Some(":Model1.Name")),
            ("alias.:Model1.ID,", Some(":Model1.ID")),
            (":Model2_id ", Some(":Model2_id")),
            (" ", None),
            ("FROM ", None),
            ("&CURRSCHEMA.&Model1=", Some("&CURRSCHEMA.&Model1")),
            ("? LEFT ", None),
            ("JOIN ", None),
            ("&Model2.Many2ManyField-", Some("&Model2.Many2ManyField")),
            ("1 ", None),
            ("ON ", None),
            (":Model1.ID=", Some(":Model1.ID")),
            (":Model2.FID ", Some(":Model2.FID")),
            (" AND ", None),
            (":Model1.ID ", Some(":Model1.ID")),
            ("?& ", None),
            ("array[", None),
            ("\"a:F'X'&N\", 'b&c   ?:L']", None),
        ];
        let expected: Vec<(String, Option<String>)> = expected
            .iter()
            .map(|(t, s)| ((*t).to_string(), s.map(str::to_string)))
            .collect();
        assert_eq!(pairs(query), expected);
    }

    #[test]
    fn test_spans_cover_input() {
        let query = "SELECT :ID, 'a&b' FROM &Model -- tail\n";
        let segs = segments(query);
        assert_eq!(segs.first().map(|s| s.span.start), Some(0));
        assert_eq!(segs.last().map(|s| s.span.end), Some(query.len()));
        assert!(segs.windows(2).all(|w| w[0].span.end == w[1].span.start));
    }

    #[test]
    fn test_cast_does_not_start_symbol() {
        assert_eq!(symbols("SELECT :Data::jsonb, x::text"), [":Data"]);
    }

    #[test]
    fn test_boundaries() {
        assert!(!is_boundary('a'));
        assert!(!is_boundary('_'));
        assert!(!is_boundary('*'));
        assert!(is_boundary(' '));
        assert!(is_boundary('='));
        assert!(is_boundary('\u{A0}'));
        assert!(is_boundary('\u{3000}'));
        assert!(!is_boundary('ж'));
    }

    #[test]
    fn test_empty_and_blank_queries() {
        assert!(segments("").is_empty());
        assert_eq!(pairs("  \n"), [("   ".to_string(), None)]);
    }

    proptest! {
        #[test]
        fn quoted_literals_never_yield_symbols(body in "[a-zA-Z0-9&:?. ]{0,24}") {
            let query = format!("SELECT x FROM t WHERE y = '{body}'");
            prop_assert!(symbols(&query).is_empty());
        }

        #[test]
        fn segments_concatenate_to_input(query in "[a-zA-Z0-9&:?.,=()* ]{0,48}") {
            let joined: String = segments(&query).into_iter().map(|s| s.text).collect();
            prop_assert_eq!(joined, query);
        }
    }
}
