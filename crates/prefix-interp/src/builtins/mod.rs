// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The builtin registry: an open, name-keyed table rather than a closed
//! enum, so extension libraries can add entries with the exact same
//! contract at startup (`register_all` is just the first registrant).

mod arith;
mod concurrency;
mod env_ctl;
mod io;
mod json;
mod map;
mod modules;
mod tensor;

use std::collections::HashMap;

use prefix_ast::expr::Arg;
use prefix_ast::Span;

use crate::env::Environment;
use crate::error::RuntimeDiagnostic;
use crate::interp::Interpreter;
use crate::value::Value;

pub type BuiltinFn = fn(&Interpreter, &Environment, &[Arg], Span) -> Result<Value, RuntimeDiagnostic>;

#[derive(Clone, Copy)]
pub struct BuiltinEntry {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` means variadic (no upper bound).
    pub max_args: Option<usize>,
    pub func: BuiltinFn,
}

struct Registry(HashMap<String, BuiltinEntry>);

impl Registry {
    fn add(&mut self, name: &'static str, min_args: usize, max_args: Option<usize>, func: BuiltinFn) {
        let entry = BuiltinEntry { name, min_args, max_args, func };
        if self.0.insert(name.to_string(), entry).is_some() {
            panic!("duplicate builtin registration: '{name}'");
        }
    }
}

pub fn register_all() -> HashMap<String, BuiltinEntry> {
    let mut reg = Registry(HashMap::new());
    arith::register(&mut reg);
    tensor::register(&mut reg);
    map::register(&mut reg);
    io::register(&mut reg);
    json::register(&mut reg);
    concurrency::register(&mut reg);
    env_ctl::register(&mut reg);
    modules::register(&mut reg);
    reg.0
}

/// Evaluate every argument positionally, ignoring named-argument binding —
/// used by builtins with no keyword parameters.
pub(crate) fn eval_positional(
    interp: &Interpreter,
    env: &Environment,
    args: &[Arg],
) -> Result<Vec<Value>, RuntimeDiagnostic> {
    args.iter()
        .map(|a| match a {
            Arg::Positional(e) => interp.eval_expr(env, e),
            Arg::Named(_, e) => interp.eval_expr(env, e),
        })
        .collect()
}

/// The raw expression behind positional argument `idx`, for builtins that
/// need the unevaluated node (pointer writeback, index-chain targets).
pub(crate) fn raw_arg(args: &[Arg], idx: usize) -> Option<&prefix_ast::expr::Expr> {
    match args.get(idx)? {
        Arg::Positional(e) | Arg::Named(_, e) => Some(e),
    }
}
