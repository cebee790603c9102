//! Search highlight spans

use std::ops::Range;

/// Which part of a line a highlight falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightField {
    TagName,
    Text,
    /// The `name="value"` string of the attribute at this position
    Attribute(usize),
}

/// A matched byte range within one field of a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub field: HighlightField,
    pub range: Range<usize>,
}

/// Wrap each range of `text` in `open` and `close`.
///
/// Ranges must be sorted and non-overlapping; any that fall outside `text`
/// or off a char boundary are skipped.
pub fn mark<'r>(text: &str, ranges: impl IntoIterator<Item = &'r Range<usize>>, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for range in ranges {
        if range.start < last
            || range.end > text.len()
            || !text.is_char_boundary(range.start)
            || !text.is_char_boundary(range.end)
        {
            continue;
        }
        out.push_str(&text[last..range.start]);
        out.push_str(open);
        out.push_str(&text[range.clone()]);
        out.push_str(close);
        last = range.end;
    }

    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_ranges() {
        let ranges = [0..2, 5..7];
        assert_eq!(mark("abcdefgh", &ranges, "<m>", "</m>"), "<m>ab</m>cde<m>fg</m>h");
    }

    #[test]
    fn test_mark_skips_bad_ranges() {
        let ranges = [1..3, 2..4, 6..20];
        assert_eq!(mark("héllo", &ranges, "[", "]"), "h[é]llo");
        let none: [Range<usize>; 0] = [];
        assert_eq!(mark("text", &none, "[", "]"), "text");
    }
}
