//! Byte‑level lexer for Lox source.
//!
//! [`Scanner`] walks a `&[u8]` once and yields `Result<Token>` items: one per
//! lexeme, an error per bad character or unterminated string, and exactly one
//! trailing `EOF`.  It keeps going after an error so a caller can report every
//! lexing problem in a file; [`Scanner::scan_all`] is the strict variant that
//! stops at the first one.
//!
//! Keywords come from a compile‑time perfect hash (`phf`) and `//` comments
//! are skipped in one `memchr` jump to the next newline.
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! let source = b"print 123; // example";
//! let tokens = Scanner::new(source).scan_all().unwrap();
//! assert_eq!(tokens.len(), 4);
//! ```

use std::iter::FusedIterator;

use log::{debug, info, trace};
use memchr::memchr;
use phf::phf_map;

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"      => TokenType::AND,
    b"break"    => TokenType::BREAK,
    b"class"    => TokenType::CLASS,
    b"continue" => TokenType::CONTINUE,
    b"else"     => TokenType::ELSE,
    b"false"    => TokenType::FALSE,
    b"fun"      => TokenType::FUN,
    b"for"      => TokenType::FOR,
    b"if"       => TokenType::IF,
    b"nil"      => TokenType::NIL,
    b"or"       => TokenType::OR,
    b"print"    => TokenType::PRINT,
    b"return"   => TokenType::RETURN,
    b"super"    => TokenType::SUPER,
    b"this"     => TokenType::THIS,
    b"true"     => TokenType::TRUE,
    b"var"      => TokenType::VAR,
    b"while"    => TokenType::WHILE,
};

/// Tokens spelled by exactly one byte.
fn single_byte(b: u8) -> Option<TokenType> {
    let token_type = match b {
        b'(' => TokenType::LEFT_PAREN,
        b')' => TokenType::RIGHT_PAREN,
        b'{' => TokenType::LEFT_BRACE,
        b'}' => TokenType::RIGHT_BRACE,
        b',' => TokenType::COMMA,
        b'.' => TokenType::DOT,
        b'-' => TokenType::MINUS,
        b'+' => TokenType::PLUS,
        b';' => TokenType::SEMICOLON,
        b'*' => TokenType::STAR,
        _ => return None,
    };

    Some(token_type)
}

pub struct Scanner<'a> {
    src: &'a [u8],
    start: usize, // first byte of the lexeme being scanned
    pos: usize,   // next byte to read
    line: usize,  // 1‑based
    done: bool,   // EOF already emitted
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            pos: 0,
            line: 1,
            done: false,
        }
    }

    /// Drain the scanner, stopping at the first lexing error.
    pub fn scan_all(self) -> Result<Vec<Token>> {
        self.collect()
    }

    // ───────────────────────────── cursor ──────────────────────────────────

    #[inline(always)]
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    #[inline(always)]
    fn bump(&mut self) -> u8 {
        let b = self.src[self.pos];
        self.pos += 1;
        b
    }

    /// Byte `offset` places ahead of the cursor, or `0` past the end.
    #[inline(always)]
    fn look(&self, offset: usize) -> u8 {
        self.src.get(self.pos + offset).copied().unwrap_or(0)
    }

    /// `matched` if the next byte is `expected` (consuming it), else `otherwise`.
    #[inline(always)]
    fn either(&mut self, expected: u8, matched: TokenType, otherwise: TokenType) -> TokenType {
        if self.look(0) == expected {
            self.pos += 1;
            matched
        } else {
            otherwise
        }
    }

    fn text(&self, from: usize, to: usize) -> String {
        String::from_utf8_lossy(&self.src[from..to]).into_owned()
    }

    // ───────────────────────────── lexing ──────────────────────────────────

    /// Skip whitespace, newlines and `//` comments in front of the next lexeme.
    fn skip_trivia(&mut self) {
        while !self.at_end() {
            match self.look(0) {
                b' ' | b'\r' | b'\t' => self.pos += 1,

                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }

                b'/' if self.look(1) == b'/' => {
                    // Leave the newline itself for the arm above.
                    self.pos = match memchr(b'\n', &self.src[self.pos..]) {
                        Some(offset) => self.pos + offset,
                        None => self.src.len(),
                    };
                }

                _ => return,
            }
        }
    }

    /// Scan one lexeme starting at `self.start`.
    fn lex(&mut self) -> Result<TokenType> {
        let b = self.bump();

        if let Some(token_type) = single_byte(b) {
            return Ok(token_type);
        }

        let token_type = match b {
            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),
            b'/' => TokenType::SLASH,
            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),
            _ => {
                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ))
            }
        };

        Ok(token_type)
    }

    /// Body of a `"…"` literal; may span lines.
    fn string(&mut self) -> Result<TokenType> {
        while !self.at_end() && self.look(0) != b'"' {
            if self.bump() == b'\n' {
                self.line += 1;
            }
        }

        if self.at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.pos += 1; // closing quote

        Ok(TokenType::STRING(self.text(self.start + 1, self.pos - 1)))
    }

    /// Digits with an optional fractional part; no leading or trailing dot.
    fn number(&mut self) -> TokenType {
        while self.look(0).is_ascii_digit() {
            self.pos += 1;
        }

        if self.look(0) == b'.' && self.look(1).is_ascii_digit() {
            self.pos += 1;

            while self.look(0).is_ascii_digit() {
                self.pos += 1;
            }
        }

        // Only ASCII digits and at most one dot were consumed.
        let value: f64 = self.text(self.start, self.pos).parse().unwrap_or(0.0);

        TokenType::NUMBER(value)
    }

    fn identifier(&mut self) -> TokenType {
        while self.look(0).is_ascii_alphanumeric() || self.look(0) == b'_' {
            self.pos += 1;
        }

        KEYWORDS
            .get(&self.src[self.start..self.pos])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.skip_trivia();

        if self.at_end() {
            self.done = true;
            debug!("Reached end of input on line {}", self.line);
            return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
        }

        self.start = self.pos;

        let result = self.lex().map(|token_type| {
            trace!("Scanned {:?} on line {}", token_type, self.line);
            Token::new(token_type, self.text(self.start, self.pos), self.line)
        });

        Some(result)
    }
}

impl FusedIterator for Scanner<'_> {}
