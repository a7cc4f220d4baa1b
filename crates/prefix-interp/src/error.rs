// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Runtime errors and the control-flow signals threaded through `?`.
//!
//! Like the evaluator's `Result<Value, RuntimeError>`, non-local control
//! flow (`return`, `break`, `continue`, `goto`, thrown exceptions) is
//! encoded as error variants that `exec_stmt`/`eval_expr` intercept at the
//! right block boundary instead of propagating further.

use prefix_ast::Span;

use crate::env::EnvError;
use crate::value::Value;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("return")]
    Return(Value),
    #[error("break")]
    Break(Value),
    #[error("continue")]
    Continue,
    #[error("goto")]
    Goto(Value),
    #[error("uncaught exception: {0}")]
    Throw(Value),

    #[error("unknown identifier '{0}'")]
    UnknownIdent(String),
    #[error("unknown function or builtin '{0}'")]
    UnknownCallable(String),
    #[error("duplicate builtin registration: '{0}'")]
    DuplicateBuiltin(String),
    #[error("'{0}' expects {1} argument(s), found {2}")]
    ArityMismatch(String, String, usize),
    #[error("type error: {0}")]
    Type(String),
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("assignment to frozen binding '{0}'")]
    Frozen(String),
    #[error("assignment to permafrozen binding '{0}'")]
    Permafrozen(String),
    #[error("alias cycle detected at '{0}'")]
    AliasCycle(String),
    #[error("module error: {0}")]
    Module(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("thread error: {0}")]
    Thread(String),
    #[error("goto target not found: {0}")]
    GotoTargetNotFound(String),
    #[error("binding '{0}' was declared but never assigned a value")]
    Uninitialized(String),
    #[error("worker was stopped")]
    StopRequested,
}

impl From<EnvError> for RuntimeError {
    fn from(e: EnvError) -> Self {
        match e {
            EnvError::NotFound(n) => RuntimeError::UnknownIdent(n),
            EnvError::Frozen(n) => RuntimeError::Frozen(n),
            EnvError::Permafrozen(n) => RuntimeError::Permafrozen(n),
            EnvError::AliasCycle(n) => RuntimeError::AliasCycle(n),
            EnvError::Uninitialized(n) => RuntimeError::Uninitialized(n),
            EnvError::TypeMismatch(msg) => RuntimeError::Type(msg),
        }
    }
}

impl RuntimeError {
    /// True for the non-local control-flow signals that aren't real errors
    /// and must never surface to the user as a diagnostic.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            RuntimeError::Return(_)
                | RuntimeError::Break(_)
                | RuntimeError::Continue
                | RuntimeError::Goto(_)
                | RuntimeError::Throw(_)
        )
    }
}

/// A `RuntimeError` tagged with the source span where it occurred.
#[derive(Debug, Clone)]
pub struct RuntimeDiagnostic {
    pub error: RuntimeError,
    pub span: Span,
}

impl RuntimeDiagnostic {
    pub fn new(error: RuntimeError, span: Span) -> Self {
        Self { error, span }
    }
}

impl std::fmt::Display for RuntimeDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for RuntimeDiagnostic {}
