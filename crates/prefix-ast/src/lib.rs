// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Abstract Syntax Tree types for the Prefix language.
//!
//! This crate defines the AST nodes shared between the lexer, parser,
//! and interpreter. Prefix writes every operator in call form
//! (`ADD(a, b)`), so there is no binary/unary operator AST — a call is
//! a call whether its callee is a builtin name or a user function.

pub mod span;
pub mod token;
pub mod expr;
pub mod stmt;

pub use span::{LineMap, Span};

/// Unique identifier for AST nodes, assigned during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);
}
