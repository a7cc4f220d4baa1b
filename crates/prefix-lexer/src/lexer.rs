// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The lexer implementation using logos.

use logos::Logos;
use prefix_ast::token::{Token, TokenKind, TypeTag};
use prefix_ast::Span;

/// Raw token type for logos - literal values are parsed in a second pass.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    // === Keywords ===
    #[token("IF")]
    If,
    #[token("ELIF")]
    Elif,
    #[token("ELSE")]
    Else,
    #[token("WHILE")]
    While,
    #[token("FOR")]
    For,
    #[token("PARFOR")]
    Parfor,
    #[token("FUNC")]
    Func,
    #[token("RETURN")]
    Return,
    #[token("BREAK")]
    Break,
    #[token("CONTINUE")]
    Continue,
    #[token("GOTO")]
    Goto,
    #[token("GOTOPOINT")]
    Gotopoint,
    #[token("THR")]
    Thr,
    #[token("ASYNC")]
    Async,
    #[token("TRY")]
    Try,
    #[token("CATCH")]
    Catch,
    #[token("SYMBOL")]
    Symbol,
    #[token("POP")]
    Pop,

    // Type-tag keywords that are not already claimed above (FUNC/THR double
    // as type tags; the parser maps them contextually).
    #[token("INT")]
    TyInt,
    #[token("FLT")]
    TyFlt,
    #[token("STR")]
    TyStr,
    #[token("TNS")]
    TyTns,
    #[token("MAP")]
    TyMap,
    #[token("UNKNOWN")]
    TyUnknown,

    // === Punctuation (order doesn't matter, logos prefers longest match) ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("<")]
    LAngle,
    #[token(">")]
    RAngle,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=")]
    Assign,
    #[token("@")]
    At,
    #[token("..")]
    DotDot,
    #[token(".")]
    Dot,
    #[token("_")]
    Underscore,

    // === Comments (skipped) ===
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,
    #[token("/*", block_comment)]
    BlockComment,

    // === Literals ===
    // Binary fixed-point float: optional sign, binary digits, '.', binary digits.
    #[regex(r"[+-]?[01]+\.[01]+")]
    Float,
    // Binary integer: optional sign, one or more binary digits.
    #[regex(r"[+-]?[01]+")]
    Int,
    // String literal (escapes resolved in a second pass).
    #[regex(r#""([^"\\]|\\.)*""#)]
    String,

    // === Identifier (must come after keywords via longest-match) ===
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}

/// Skip block comments, handling nesting.
fn block_comment(lexer: &mut logos::Lexer<RawToken>) -> logos::Skip {
    let mut depth = 1;
    let remainder = lexer.remainder();
    let mut chars = remainder.chars().peekable();
    let mut consumed = 0;

    while depth > 0 {
        match chars.next() {
            Some('/') if chars.peek() == Some(&'*') => {
                chars.next();
                consumed += 2;
                depth += 1;
            }
            Some('*') if chars.peek() == Some(&'/') => {
                chars.next();
                consumed += 2;
                depth -= 1;
            }
            Some(c) => consumed += c.len_utf8(),
            None => break,
        }
    }

    lexer.bump(consumed);
    logos::Skip
}

/// Maximum number of errors to collect before stopping.
const MAX_ERRORS: usize = 20;

/// The lexer for Prefix source code.
pub struct Lexer<'a> {
    source: &'a str,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, errors: Vec::new() }
    }

    /// Tokenize the entire source, collecting multiple errors.
    pub fn tokenize(&mut self) -> LexResult {
        let mut tokens = Vec::new();
        let mut logos_lexer = RawToken::lexer(self.source);

        while let Some(result) = logos_lexer.next() {
            if self.errors.len() >= MAX_ERRORS {
                break;
            }

            let span = logos_lexer.span();
            let slice = logos_lexer.slice();

            let kind = match result {
                Ok(raw) => match self.convert_token(raw, slice, span.start, span.end) {
                    Ok(kind) => kind,
                    Err(e) => {
                        self.errors.push(e);
                        continue;
                    }
                },
                Err(()) => {
                    let ch = self.source[span.start..].chars().next().unwrap_or('?');
                    self.errors.push(LexError::unexpected_char(ch, span.start));
                    continue;
                }
            };

            tokens.push(Token { kind, span: Span::new(span.start, span.end) });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(self.source.len(), self.source.len()),
        });

        LexResult { tokens, errors: std::mem::take(&mut self.errors) }
    }

    fn convert_token(&self, raw: RawToken, slice: &str, start: usize, end: usize) -> Result<TokenKind, LexError> {
        Ok(match raw {
            RawToken::If => TokenKind::KwIf,
            RawToken::Elif => TokenKind::KwElif,
            RawToken::Else => TokenKind::KwElse,
            RawToken::While => TokenKind::KwWhile,
            RawToken::For => TokenKind::KwFor,
            RawToken::Parfor => TokenKind::KwParfor,
            RawToken::Func => TokenKind::KwFunc,
            RawToken::Return => TokenKind::KwReturn,
            RawToken::Break => TokenKind::KwBreak,
            RawToken::Continue => TokenKind::KwContinue,
            RawToken::Goto => TokenKind::KwGoto,
            RawToken::Gotopoint => TokenKind::KwGotopoint,
            RawToken::Thr => TokenKind::KwThr,
            RawToken::Async => TokenKind::KwAsync,
            RawToken::Try => TokenKind::KwTry,
            RawToken::Catch => TokenKind::KwCatch,
            RawToken::Symbol => TokenKind::KwSymbol,
            RawToken::Pop => TokenKind::KwPop,

            RawToken::TyInt => TokenKind::TypeTag(TypeTag::Int),
            RawToken::TyFlt => TokenKind::TypeTag(TypeTag::Flt),
            RawToken::TyStr => TokenKind::TypeTag(TypeTag::Str),
            RawToken::TyTns => TokenKind::TypeTag(TypeTag::Tns),
            RawToken::TyMap => TokenKind::TypeTag(TypeTag::Map),
            RawToken::TyUnknown => TokenKind::TypeTag(TypeTag::Unknown),

            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::LAngle => TokenKind::LAngle,
            RawToken::RAngle => TokenKind::RAngle,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Assign => TokenKind::Assign,
            RawToken::At => TokenKind::At,
            RawToken::DotDot => TokenKind::DotDot,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Underscore => TokenKind::Underscore,

            RawToken::Int => {
                let cleaned: String = slice.chars().filter(|c| *c != '_').collect();
                let (sign, digits) = split_sign(&cleaned);
                let value = i64::from_str_radix(digits, 2).map_err(|_| LexError::invalid_number(start, end))?;
                TokenKind::Int(if sign { -value } else { value })
            }
            RawToken::Float => {
                let (sign, rest) = split_sign(slice);
                let (int_part, frac_part) = rest
                    .split_once('.')
                    .ok_or_else(|| LexError::invalid_number(start, end))?;
                let int_val = if int_part.is_empty() {
                    0
                } else {
                    i64::from_str_radix(int_part, 2).map_err(|_| LexError::invalid_number(start, end))?
                };
                let mut frac_val = 0.0f64;
                let mut scale = 0.5f64;
                for c in frac_part.chars() {
                    match c {
                        '0' => {}
                        '1' => frac_val += scale,
                        _ => return Err(LexError::invalid_number(start, end)),
                    }
                    scale /= 2.0;
                }
                let magnitude = int_val as f64 + frac_val;
                TokenKind::Flt(if sign { -magnitude } else { magnitude })
            }
            RawToken::String => {
                let inner = &slice[1..slice.len() - 1];
                let s = parse_string(inner, start)?;
                TokenKind::Str(s)
            }
            RawToken::Ident => TokenKind::Ident(slice.to_string()),

            RawToken::LineComment | RawToken::BlockComment => unreachable!("comments are skipped"),
        })
    }
}

fn split_sign(s: &str) -> (bool, &str) {
    match s.as_bytes().first() {
        Some(b'+') => (false, &s[1..]),
        Some(b'-') => (true, &s[1..]),
        _ => (false, s),
    }
}

/// Parse a string literal, resolving escape sequences.
fn parse_string(s: &str, pos: usize) -> Result<String, LexError> {
    let mut result = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            result.push(parse_escape(&mut chars, pos)?);
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

/// Parse an escape sequence (the conventional set plus `\u{XXXX}`).
fn parse_escape(chars: &mut impl Iterator<Item = char>, pos: usize) -> Result<char, LexError> {
    match chars.next() {
        Some('n') => Ok('\n'),
        Some('r') => Ok('\r'),
        Some('t') => Ok('\t'),
        Some('\\') => Ok('\\'),
        Some('0') => Ok('\0'),
        Some('\'') => Ok('\''),
        Some('"') => Ok('"'),
        Some('u') => parse_unicode_escape(chars, pos),
        _ => Err(LexError::invalid_escape(pos)),
    }
}

/// Parse a Unicode escape sequence: `\u{XXXX}` (1-6 hex digits).
fn parse_unicode_escape(chars: &mut impl Iterator<Item = char>, pos: usize) -> Result<char, LexError> {
    match chars.next() {
        Some('{') => {}
        _ => return Err(LexError::invalid_escape(pos)),
    }

    let mut hex = String::new();
    loop {
        match chars.next() {
            Some('}') => break,
            Some(c) if c.is_ascii_hexdigit() && hex.len() < 6 => hex.push(c),
            _ => return Err(LexError::invalid_escape(pos)),
        }
    }

    if hex.is_empty() {
        return Err(LexError::invalid_escape(pos));
    }

    let code_point = u32::from_str_radix(&hex, 16).map_err(|_| LexError::invalid_escape(pos))?;
    char::from_u32(code_point).ok_or_else(|| LexError::invalid_escape(pos))
}

/// Result of lexing: tokens plus any errors found.
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

impl LexResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A lexer error with location and friendly message.
#[derive(Debug, Clone)]
pub struct LexError {
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LexError {}

impl LexError {
    fn unexpected_char(ch: char, pos: usize) -> Self {
        Self {
            span: Span::new(pos, pos + ch.len_utf8()),
            message: format!("unexpected character '{}'", ch),
            hint: Some("remove this character or check for typos".to_string()),
        }
    }

    fn invalid_escape(pos: usize) -> Self {
        Self {
            span: Span::new(pos, pos + 1),
            message: "invalid escape sequence".to_string(),
            hint: Some("valid escapes: \\n \\r \\t \\\\ \\0 \\' \\\" \\u{...}".to_string()),
        }
    }

    fn invalid_number(start: usize, end: usize) -> Self {
        Self {
            span: Span::new(start, end),
            message: "invalid binary number literal".to_string(),
            hint: Some("integers and floats use only binary digits (0/1)".to_string()),
        }
    }
}
