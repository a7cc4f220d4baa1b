// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Error hints - suggestions for fixing common mistakes.
//!
//! Kept separate from the main parser to avoid clutter.

use prefix_ast::token::TokenKind;

/// Get a hint for an "expected X" error based on context.
pub fn for_expected(expected: &str, found: &TokenKind) -> Option<&'static str> {
    match (expected, found) {
        ("':'", TokenKind::Assign) => Some("declarations use 'TYPE: name', not 'TYPE = name'"),
        ("':'", _) => Some("syntax: TYPE: name"),

        ("'{'", _) => Some("blocks start with '{'"),
        ("'}'", _) => Some("every '{' needs a matching '}'"),

        ("'('", _) => Some("statement and call headers need parentheses"),
        ("')'", TokenKind::Eof) => Some("add ')' to close the parenthesis"),

        ("']'", TokenKind::Eof) => Some("add ']' to close the bracket"),

        ("expression", _) => Some("try a literal, variable, or a call like ADD(a, b)"),
        ("a name", TokenKind::Int(_)) => Some("names can't start with a digit"),
        ("a name", _) => Some("names start with a letter or '_'"),
        ("a type tag", _) => Some("try INT, FLT, STR, TNS, MAP, FUNC, THR, or UNKNOWN"),

        _ => None,
    }
}
