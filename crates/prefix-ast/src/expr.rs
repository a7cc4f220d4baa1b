// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression AST nodes.

use crate::stmt::Stmt;
use crate::{NodeId, Span};

/// An expression in the AST.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

/// A call argument, positional or named (`f(1, 2, name: 3)`).
#[derive(Debug, Clone)]
pub enum Arg {
    Positional(Expr),
    Named(String, Expr),
}

/// The kind of expression. Mirrors the AST boundary in the specification:
/// `{Int, Flt, Str, Ptr, Ident, Call, Async, Tns, Map, Index, Range, Wildcard}`.
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Binary-literal integer
    Int(i64),
    /// Binary fixed-point float
    Flt(f64),
    /// String literal
    Str(String),
    /// Pointer expression `@name` — resolves to the identifier textually,
    /// never to a value; only meaningful as a builtin's first argument.
    Ptr(String),
    /// Identifier read
    Ident(String),
    /// Call expression; `callee` is either a builtin name or a bound
    /// identifier resolving to a `Func`.
    Call { callee: Box<Expr>, args: Vec<Arg> },
    /// `ASYNC { ... }` — starts a thread immediately, yields a `Thr`.
    Async(Vec<Stmt>),
    /// Tensor literal `[e1, e2, ...]`, each item itself possibly a nested
    /// tensor literal.
    Tns(Vec<Expr>),
    /// Map literal `{"a": 1, "b": 2}` in source order.
    Map(Vec<(Expr, Expr)>),
    /// Bracket index `target[i, j, ...]` — tensor indexing. Each index is
    /// itself an `Expr`; `Range`/`Wildcard` sub-expressions are recognized
    /// structurally by the evaluator and never evaluated as ordinary
    /// values.
    Index { object: Box<Expr>, indices: Vec<Expr> },
    /// Angle index `target<key>` — map indexing, a single scalar key.
    MapIndex { object: Box<Expr>, key: Box<Expr> },
    /// Range expression `a..b`, carried unevaluated until used as an index.
    Range { start: Box<Expr>, end: Box<Expr> },
    /// Wildcard index placeholder `_`, selects the full span of a dimension.
    Wildcard,
}
