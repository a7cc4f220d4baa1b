// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Token kinds shared between the lexer and parser.

use crate::Span;

/// A lexed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Declared static types usable in `TYPE: name = expr` and parameter
/// annotations. `Unknown` stands for an absent/unchecked annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Int,
    Flt,
    Str,
    Tns,
    Map,
    Func,
    Thr,
    Unknown,
}

impl TypeTag {
    pub fn from_name(name: &str) -> Option<TypeTag> {
        Some(match name {
            "INT" => TypeTag::Int,
            "FLT" => TypeTag::Flt,
            "STR" => TypeTag::Str,
            "TNS" => TypeTag::Tns,
            "MAP" => TypeTag::Map,
            "FUNC" => TypeTag::Func,
            "THR" => TypeTag::Thr,
            "UNKNOWN" => TypeTag::Unknown,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Int => "INT",
            TypeTag::Flt => "FLT",
            TypeTag::Str => "STR",
            TypeTag::Tns => "TNS",
            TypeTag::Map => "MAP",
            TypeTag::Func => "FUNC",
            TypeTag::Thr => "THR",
            TypeTag::Unknown => "UNKNOWN",
        }
    }
}

/// The kind of a lexed token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Binary-literal integer, already parsed to its decimal value.
    Int(i64),
    /// Binary fixed-point float literal, already parsed.
    Flt(f64),
    /// String literal with escapes already resolved.
    Str(String),
    /// Identifier or keyword that isn't one of the reserved words below.
    Ident(String),
    /// A type-tag keyword (`INT`, `FLT`, `STR`, `TNS`, `MAP`, `FUNC`, `THR`, `UNKNOWN`).
    TypeTag(TypeTag),

    // Keywords
    KwIf,
    KwElif,
    KwElse,
    KwWhile,
    KwFor,
    KwParfor,
    KwFunc,
    KwReturn,
    KwBreak,
    KwContinue,
    KwGoto,
    KwGotopoint,
    KwThr,
    KwAsync,
    KwTry,
    KwCatch,
    KwSymbol,
    KwPop,

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LAngle,
    RAngle,
    Comma,
    Colon,
    Assign,
    At,
    Dot,
    DotDot,
    Underscore,

    Eof,
}

impl TokenKind {
    /// A short human-readable name used in parser error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            TokenKind::Int(_) => "an integer literal",
            TokenKind::Flt(_) => "a float literal",
            TokenKind::Str(_) => "a string literal",
            TokenKind::Ident(_) => "an identifier",
            TokenKind::TypeTag(_) => "a type tag",
            TokenKind::KwIf => "'IF'",
            TokenKind::KwElif => "'ELIF'",
            TokenKind::KwElse => "'ELSE'",
            TokenKind::KwWhile => "'WHILE'",
            TokenKind::KwFor => "'FOR'",
            TokenKind::KwParfor => "'PARFOR'",
            TokenKind::KwFunc => "'FUNC'",
            TokenKind::KwReturn => "'RETURN'",
            TokenKind::KwBreak => "'BREAK'",
            TokenKind::KwContinue => "'CONTINUE'",
            TokenKind::KwGoto => "'GOTO'",
            TokenKind::KwGotopoint => "'GOTOPOINT'",
            TokenKind::KwThr => "'THR'",
            TokenKind::KwAsync => "'ASYNC'",
            TokenKind::KwTry => "'TRY'",
            TokenKind::KwCatch => "'CATCH'",
            TokenKind::KwSymbol => "'SYMBOL'",
            TokenKind::KwPop => "'POP'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LAngle => "'<'",
            TokenKind::RAngle => "'>'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Assign => "'='",
            TokenKind::At => "'@'",
            TokenKind::Dot => "'.'",
            TokenKind::DotDot => "'..'",
            TokenKind::Underscore => "'_'",
            TokenKind::Eof => "end of input",
        }
    }
}
