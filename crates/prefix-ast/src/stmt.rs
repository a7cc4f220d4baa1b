// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Statement AST nodes.

use crate::expr::Expr;
use crate::token::TypeTag;
use crate::{NodeId, Span};

/// A statement in the AST.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

/// A function parameter: declared type, name, optional default
/// expression held unevaluated (evaluated against the closure's captured
/// environment at call time).
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub declared_type: TypeTag,
    pub default: Option<Expr>,
}

/// A function declaration (`FUNC name(params) : RET { body }`).
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub ret_type: TypeTag,
    pub body: Vec<Stmt>,
}

/// The kind of statement. Mirrors the AST boundary in the specification:
/// `{Block, Async, Expr, Assign, Decl, If, While, For, Parfor, Func,
/// Return, Break, Continue, Thr, Pop, Try, Goto, Gotopoint}`.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// A sequence of statements. Does NOT introduce a new environment scope
    /// — scoping is introduced only by function calls and loop iterations.
    Block(Vec<Stmt>),
    /// `ASYNC { ... }` used as a bare statement (fire-and-forget thread).
    Async(Vec<Stmt>),
    /// Expression statement.
    Expr(Expr),
    /// Declaration without a value: `TYPE: name` creates an uninitialized
    /// binding of the declared type.
    Decl { name: String, declared_type: TypeTag },
    /// Assignment. `declared_type` is `Some` for `TYPE: name = expr`
    /// (declares locally, then assigns); `None` for untyped assignment,
    /// which assigns in the innermost enclosing scope where `target`
    /// already exists, declaring locally otherwise. `target` may be an
    /// identifier, a bracket index, or an angle (map) index — the
    /// evaluator walks the writeable index chain for the latter two.
    Assign {
        target: Expr,
        declared_type: Option<TypeTag>,
        value: Expr,
    },
    /// `IF cond { ... } ELIF cond { ... }* ELSE { ... }?`
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_branch: Option<Vec<Stmt>>,
    },
    While { cond: Expr, body: Vec<Stmt> },
    For { binding: String, iter: Expr, body: Vec<Stmt> },
    /// Semantically identical to `For`, except iterations execute
    /// concurrently (one worker thread per iteration).
    Parfor { binding: String, iter: Expr, body: Vec<Stmt> },
    Func(FuncDecl),
    Return(Option<Expr>),
    /// `Break(value)` — `value` becomes the loop's result (default `Null`
    /// when absent).
    Break(Option<Expr>),
    Continue,
    /// `THR name { ... }` — allocates and starts a thread, storing the
    /// handle under `name`.
    Thr { name: String, body: Vec<Stmt> },
    /// Removes the named binding; equivalent to `DEL` applied to an
    /// identifier.
    Pop(String),
    Try {
        body: Vec<Stmt>,
        catch_name: Option<String>,
        catch_body: Vec<Stmt>,
    },
    /// Transfers control to the `Gotopoint` in the current (or an
    /// enclosing) block sequence whose label equals the evaluated target.
    Goto(Expr),
    /// Marks a location within a block sequence that `Goto` can target.
    Gotopoint(Expr),
}
