//! SIMD-accelerated XML scanning using memchr
//!
//! The scanner works over a `&str` but searches its bytes. Every delimiter
//! it looks for is ASCII, so positions it returns are always char
//! boundaries and can be used to slice the source text directly.

use memchr::{memchr, memmem};

/// Scanner for XML delimiter detection
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Total input length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.input.len()
    }

    #[inline]
    fn bytes(&self) -> &'a [u8] {
        &self.input.as_bytes()[self.pos..]
    }

    /// Slice the source between two absolute positions
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Skip whitespace characters (space, tab, newline, carriage return)
    #[inline]
    pub fn skip_whitespace(&mut self) {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && is_whitespace(bytes[self.pos]) {
            self.pos += 1;
        }
    }

    /// Find next '<' (tag start) using SIMD
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', self.bytes()).map(|i| self.pos + i)
    }

    /// Find the '>' closing a tag, skipping over quoted attribute values
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let bytes = self.input.as_bytes();
        let mut quote: Option<u8> = None;
        for (i, &b) in bytes[self.pos..].iter().enumerate() {
            match (quote, b) {
                (None, b'"' | b'\'') => quote = Some(b),
                (Some(q), _) if q == b => quote = None,
                (None, b'>') => return Some(self.pos + i),
                _ => {}
            }
        }
        None
    }

    /// Find the next occurrence of a multi-byte delimiter such as `-->`
    #[inline]
    pub fn find_str(&self, needle: &str) -> Option<usize> {
        memmem::find(self.bytes(), needle.as_bytes()).map(|i| self.pos + i)
    }

    /// Check if input starts with a string at current position
    #[inline]
    pub fn starts_with(&self, needle: &str) -> bool {
        self.bytes().starts_with(needle.as_bytes())
    }

    /// Read an XML name, returning it and advancing past it
    pub fn read_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let len = name_len(&self.input[start..]);
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&self.input[start..self.pos])
    }
}

/// XML whitespace (S production)
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Length in bytes of the XML name at the start of `input` (0 if none)
pub fn name_len(input: &str) -> usize {
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, c)) if is_name_start_char(c) => {}
        _ => return 0,
    }
    for (i, c) in chars {
        if !is_name_char(c) {
            return i;
        }
    }
    input.len()
}

/// True when `name` is a complete XML name
pub fn is_name(name: &str) -> bool {
    !name.is_empty() && name_len(name) == name.len()
}

/// NameStartChar per XML 1.0 fifth edition
#[inline]
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}' |
        '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}'
    )
}

/// NameChar per XML 1.0 fifth edition
#[inline]
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}
