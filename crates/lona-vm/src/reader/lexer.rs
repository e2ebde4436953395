// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tokenizer for the reader. Operates on a decoded `&str` of full source
//! text (the reader always has the whole script in memory; there is no
//! incremental/streaming lexer the way a REPL port's buffered reads are).

use crate::error::{LonaError, Result};

/// Which bracket family opened a list/array/dict literal. §4.2: `(`, `[`,
/// and `{` are matched synonyms — a form must close with the exact bracket
/// that opened it, not any of the three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    Paren,
    Square,
    Curly,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    ListOpen(Bracket),
    ListClose(Bracket),
    /// `#(`/`#[`/`#{` array open; closed by the matching `ListClose`.
    ArrayOpen(Bracket),
    /// `##(`/`##[`/`##{` dictionary open; closed by the matching `ListClose`.
    DictOpen(Bracket),
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
    /// `^`: lambda shorthand, `^(formals body...)` reads as one following
    /// sexp with `lambda` consed onto it.
    Caret,
    /// A bare leading `:` (not attached to a preceding symbol): introduces a
    /// `consq` triple from the next two forms.
    Colon,
    /// A symbol immediately followed (no whitespace) by `:`: one component
    /// of a dotted accessor path (`a:b:c`).
    SymbolColon(String),
    Dot,
    Symbol(String),
    Number(f64),
    String(String),
    /// The literal text collected before a `\(`/`\{`/`\[` interpolation
    /// trigger inside a string literal. The triggering bracket itself is
    /// left unconsumed in the source so the next ordinary token read sees
    /// it as a normal list-open; `Lexer::resume_string_part` continues raw
    /// scanning for the next chunk once the parser has read that form.
    StringPart(String),
    /// Hex (`#x"..."`) or binary (`#b"..."`) buffer literal, already decoded.
    Buffer(Vec<u8>),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub offset: u32,
    pub line: u32,
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    #[must_use]
    pub const fn mark(&self) -> Pos {
        Pos {
            offset: self.pos as u32,
            line: self.line,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b';') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn is_delimiter(b: u8) -> bool {
        b.is_ascii_whitespace()
            || matches!(
                b,
                b'(' | b')' | b'[' | b']' | b'{' | b'}' | b'"' | b';' | b'\'' | b'`' | b',' | b':' | b'^'
            )
    }

    /// Read the next token, returning its start position alongside it.
    ///
    /// # Errors
    /// Returns `Err` on malformed string/buffer literals.
    pub fn next_token(&mut self) -> Result<(Pos, Token)> {
        self.skip_whitespace_and_comments();
        let start = self.mark();
        let Some(b) = self.peek() else {
            return Ok((start, Token::Eof));
        };
        let token = match b {
            b'(' => {
                self.bump();
                Token::ListOpen(Bracket::Paren)
            }
            b'[' => {
                self.bump();
                Token::ListOpen(Bracket::Square)
            }
            b'{' => {
                self.bump();
                Token::ListOpen(Bracket::Curly)
            }
            b')' => {
                self.bump();
                Token::ListClose(Bracket::Paren)
            }
            b']' => {
                self.bump();
                Token::ListClose(Bracket::Square)
            }
            b'}' => {
                self.bump();
                Token::ListClose(Bracket::Curly)
            }
            b'\'' => {
                self.bump();
                Token::Quote
            }
            b'`' => {
                self.bump();
                Token::Quasiquote
            }
            b',' => {
                self.bump();
                if self.peek() == Some(b'@') {
                    self.bump();
                    Token::UnquoteSplicing
                } else {
                    Token::Unquote
                }
            }
            b'^' => {
                self.bump();
                Token::Caret
            }
            b':' => {
                self.bump();
                Token::Colon
            }
            b'"' => self.read_string()?,
            b'#' => self.read_hash()?,
            _ => self.read_atom(start)?,
        };
        Ok((start, token))
    }

    fn read_hash(&mut self) -> Result<Token> {
        self.bump(); // '#'
        if self.peek() == Some(b'#') {
            self.bump(); // second '#'
            return match self.peek() {
                Some(b'(') => {
                    self.bump();
                    Ok(Token::DictOpen(Bracket::Paren))
                }
                Some(b'[') => {
                    self.bump();
                    Ok(Token::DictOpen(Bracket::Square))
                }
                Some(b'{') => {
                    self.bump();
                    Ok(Token::DictOpen(Bracket::Curly))
                }
                other => Err(LonaError::read(
                    format!("unexpected character after '##': {:?}", other.map(char::from)),
                    None,
                    self.line,
                    0,
                )),
            };
        }
        match self.peek() {
            Some(b'(') => {
                self.bump();
                Ok(Token::ArrayOpen(Bracket::Paren))
            }
            Some(b'[') => {
                self.bump();
                Ok(Token::ArrayOpen(Bracket::Square))
            }
            Some(b'{') => {
                self.bump();
                Ok(Token::ArrayOpen(Bracket::Curly))
            }
            Some(b'x' | b'X') => {
                self.bump();
                self.read_radix_buffer(16)
            }
            Some(b'b' | b'B') => {
                self.bump();
                self.read_radix_buffer(2)
            }
            other => Err(LonaError::read(
                format!("unexpected character after '#': {:?}", other.map(char::from)),
                None,
                self.line,
                0,
            )),
        }
    }

    fn read_radix_buffer(&mut self, radix: u32) -> Result<Token> {
        if self.bump() != Some(b'"') {
            return Err(LonaError::read(
                "expected '\"' to open a buffer literal",
                None,
                self.line,
                0,
            ));
        }
        let digits_per_byte = if radix == 16 { 2 } else { 8 };
        let mut digits = String::new();
        loop {
            match self.bump() {
                Some(b'"') => break,
                Some(b) if (b as char).is_digit(radix) => digits.push(b as char),
                Some(b) if b.is_ascii_whitespace() => {}
                Some(b) => {
                    return Err(LonaError::read(
                        format!("invalid digit in buffer literal: {:?}", b as char),
                        None,
                        self.line,
                        0,
                    ));
                }
                None => {
                    return Err(LonaError::read(
                        "unterminated buffer literal",
                        None,
                        self.line,
                        0,
                    ));
                }
            }
        }
        if digits.len() % digits_per_byte != 0 {
            return Err(LonaError::read(
                "buffer literal has a partial trailing byte",
                None,
                self.line,
                0,
            ));
        }
        let mut bytes = Vec::with_capacity(digits.len() / digits_per_byte);
        for chunk in digits.as_bytes().chunks(digits_per_byte) {
            let text = std::str::from_utf8(chunk).unwrap_or_default();
            let byte = u8::from_str_radix(text, radix)
                .map_err(|_| LonaError::read("invalid buffer byte", None, self.line, 0))?;
            bytes.push(byte);
        }
        Ok(Token::Buffer(bytes))
    }

    fn read_string(&mut self) -> Result<Token> {
        self.bump(); // opening quote
        self.scan_string_chunk()
    }

    /// Continue scanning a string literal's raw bytes after the parser has
    /// read one interpolated form triggered by `\(`/`\{`/`\[`. The triggering
    /// bracket was left unconsumed by `scan_string_chunk`, so by the time
    /// this runs the lexer's position is already just past that form's
    /// closing bracket.
    ///
    /// # Errors
    /// Returns `Err` on an unterminated string literal or escape.
    pub fn resume_string_part(&mut self) -> Result<Token> {
        self.scan_string_chunk()
    }

    fn scan_string_chunk(&mut self) -> Result<Token> {
        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                Some(b'"') => {
                    let s = String::from_utf8(bytes)
                        .map_err(|_| LonaError::read("invalid UTF-8 in string literal", None, self.line, 0))?;
                    return Ok(Token::String(s));
                }
                Some(b'\\') => {
                    if matches!(self.peek(), Some(b'(' | b'{' | b'[')) {
                        let s = String::from_utf8(bytes).map_err(|_| {
                            LonaError::read("invalid UTF-8 in string literal", None, self.line, 0)
                        })?;
                        return Ok(Token::StringPart(s));
                    }
                    match self.bump() {
                        Some(b'n') => bytes.push(b'\n'),
                        Some(b't') => bytes.push(b'\t'),
                        Some(b'r') => bytes.push(b'\r'),
                        Some(b'"') => bytes.push(b'"'),
                        Some(b'\\') => bytes.push(b'\\'),
                        Some(other) => bytes.push(other),
                        None => {
                            return Err(LonaError::read(
                                "unterminated escape in string literal",
                                None,
                                self.line,
                                0,
                            ));
                        }
                    }
                }
                // Raw bytes, including UTF-8 continuation bytes, pass
                // through untouched; only ASCII escapes are special-cased
                // above, so multi-byte characters reassemble correctly.
                Some(b) => bytes.push(b),
                None => {
                    return Err(LonaError::read(
                        "unterminated string literal",
                        None,
                        self.line,
                        0,
                    ));
                }
            }
        }
    }

    fn read_atom(&mut self, _start: Pos) -> Result<Token> {
        if self.peek() == Some(b'.') && self.peek_at(1).is_none_or(Self::is_delimiter) {
            self.bump();
            return Ok(Token::Dot);
        }
        let start_pos = self.pos;
        while let Some(b) = self.peek() {
            if Self::is_delimiter(b) || b == b'#' {
                break;
            }
            self.bump();
        }
        let text = std::str::from_utf8(&self.src[start_pos..self.pos])
            .map_err(|_| LonaError::read("invalid UTF-8 in atom", None, self.line, 0))?;
        if let Ok(n) = text.parse::<f64>() {
            if text.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '+' || c == '.') && text.chars().any(|c| c.is_ascii_digit()) {
                return Ok(Token::Number(n));
            }
        }
        // A colon immediately following (no whitespace) marks this as one
        // component of a dotted accessor path rather than a plain symbol.
        if self.peek() == Some(b':') {
            self.bump();
            return Ok(Token::SymbolColon(text.to_string()));
        }
        Ok(Token::Symbol(text.to_string()))
    }
}
