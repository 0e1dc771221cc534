/// Scanner: splits a format string into punctuation runs, value tokens
/// and list blocks.
///
/// Matching is continuous: each lexeme starts exactly where the previous
/// one ended, so anything the scanner cannot match surfaces as an error
/// carrying the unmatched remainder.

use std::ops::Range;

use super::parser::TemplateError;

/// Characters that make up punctuation runs.
pub const PUNCTUATION: &[char] = &[',', ';', ':', '/', '\\', ' ', '\t'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind<'a> {
    /// A maximal run of [`PUNCTUATION`] characters.
    Punctuation,
    /// `#` + selector character + one or two character tag code.
    Value { selector: char, code: &'a str },
    /// `{...}` up to the first `}`. `inner` starts at `span.start + 1`.
    List { inner: &'a str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub kind: LexemeKind<'a>,
    /// Byte range in the full format string.
    pub span: Range<usize>,
    pub text: &'a str,
}

/// A lazy, non-restartable lexeme stream. Stops after the first error.
pub struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    /// Offset of `src` within the full format string.
    base: usize,
    in_list: bool,
    failed: bool,
}

impl<'a> Scanner<'a> {
    /// Scan a top-level format string.
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            base: 0,
            in_list: false,
            failed: false,
        }
    }

    /// Scan the interior of a list block found at `base` (the offset of its
    /// first interior byte). Never yields a `List` lexeme: any `{` inside
    /// is reported as a nested group, even when an earlier lexeme fails.
    pub fn list_interior(src: &'a str, base: usize) -> Self {
        Self {
            src,
            pos: 0,
            base,
            in_list: true,
            failed: false,
        }
    }

    /// Offset into the full format string of the next unscanned byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn lexeme(&mut self, len: usize, kind: LexemeKind<'a>) -> Lexeme<'a> {
        let start = self.pos;
        self.pos += len;
        Lexeme {
            kind,
            span: self.base + start..self.base + self.pos,
            text: &self.src[start..self.pos],
        }
    }

    fn scan_list(&mut self) -> Option<Lexeme<'a>> {
        let rest = self.rest();
        // `.` in the block body does not cross line breaks.
        let close = rest[1..].find(|c: char| c == '}' || c == '\n' || c == '\r')?;
        if rest[1..].as_bytes()[close] != b'}' {
            return None;
        }
        let inner = &rest[1..1 + close];
        Some(self.lexeme(close + 2, LexemeKind::List { inner }))
    }

    fn scan_value(&mut self) -> Option<Lexeme<'a>> {
        let rest = self.rest();
        let word_len = rest[1..]
            .bytes()
            .take(3)
            .take_while(|b| is_word(*b))
            .count();
        if word_len < 2 {
            return None;
        }
        let selector = rest.as_bytes()[1] as char;
        let code = &rest[2..1 + word_len];
        Some(self.lexeme(1 + word_len, LexemeKind::Value { selector, code }))
    }

    fn scan_punctuation(&mut self) -> Option<Lexeme<'a>> {
        let len = self
            .rest()
            .find(|c: char| !PUNCTUATION.contains(&c))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return None;
        }
        Some(self.lexeme(len, LexemeKind::Punctuation))
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Lexeme<'a>, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.src.len() {
            return None;
        }

        let rest = self.rest();
        let scanned = match rest.as_bytes()[0] {
            b'{' if self.in_list => {
                self.failed = true;
                return Some(Err(TemplateError::NestedGroup {
                    text: rest.to_string(),
                    offset: self.offset(),
                }));
            }
            b'{' => self.scan_list(),
            b'#' => self.scan_value(),
            _ => self.scan_punctuation(),
        };

        match scanned {
            Some(lexeme) => Some(Ok(lexeme)),
            None => {
                self.failed = true;
                if self.in_list {
                    if let Some(brace) = rest.find('{') {
                        return Some(Err(TemplateError::NestedGroup {
                            text: rest[brace..].to_string(),
                            offset: self.offset() + brace,
                        }));
                    }
                }
                Some(Err(TemplateError::Scan {
                    text: rest.to_string(),
                    offset: self.offset(),
                }))
            }
        }
    }
}

/// `\w`: ASCII letters, digits and underscore.
fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Scan a whole top-level format string.
pub fn lex(src: &str) -> Result<Vec<Lexeme<'_>>, TemplateError> {
    Scanner::new(src).collect()
}
