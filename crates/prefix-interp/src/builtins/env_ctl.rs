// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Binding-level control: freeze, thaw, permafreeze, alias, and the
//! shallow/deep copy helpers. `PERMAFREEZE` is one-way; `FREEZE` is
//! reversible via `THAW`, which itself fails on a permafrozen binding.

use prefix_ast::expr::Arg;
use prefix_ast::Span;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::interp::Interpreter;
use crate::value::Value;

use super::{eval_positional, raw_arg, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add("FREEZE", 1, Some(1), freeze);
    reg.add("THAW", 1, Some(1), thaw);
    reg.add("PERMAFREEZE", 1, Some(1), permafreeze);
    reg.add("ALIAS", 2, Some(2), alias);
    reg.add("COPY", 1, Some(1), copy);
    reg.add("DEEPCOPY", 1, Some(1), deepcopy);
}

fn pointer_name<'a>(interp: &Interpreter, args: &'a [Arg], idx: usize, who: &str, span: Span) -> Result<&'a str, RuntimeDiagnostic> {
    raw_arg(args, idx)
        .and_then(|e| interp.ptr_name(e))
        .ok_or_else(|| RuntimeDiagnostic::new(RuntimeError::Type(format!("{} requires a pointer argument", who)), span))
}

fn freeze(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let name = pointer_name(interp, args, 0, "FREEZE(@name)", span)?;
    env.freeze(name).map_err(|e| RuntimeDiagnostic::new(e.into(), span))?;
    Ok(Value::Null)
}

fn thaw(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let name = pointer_name(interp, args, 0, "THAW(@name)", span)?;
    env.thaw(name).map_err(|e| RuntimeDiagnostic::new(e.into(), span))?;
    Ok(Value::Null)
}

fn permafreeze(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let name = pointer_name(interp, args, 0, "PERMAFREEZE(@name)", span)?;
    env.permafreeze(name).map_err(|e| RuntimeDiagnostic::new(e.into(), span))?;
    Ok(Value::Null)
}

/// `ALIAS(@name, @target)`: makes `name` in the caller's scope read/write
/// through to `target`'s current owning scope.
fn alias(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let name = pointer_name(interp, args, 0, "ALIAS(@name, @target)", span)?;
    let target = pointer_name(interp, args, 1, "ALIAS(@name, @target)", span)?;
    env.alias(name, env.clone(), target.to_string()).map_err(|e| RuntimeDiagnostic::new(e.into(), span))?;
    Ok(Value::Null)
}

fn copy(interp: &Interpreter, env: &Environment, args: &[Arg], _span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    Ok(vals[0].clone())
}

fn deepcopy(interp: &Interpreter, env: &Environment, args: &[Arg], _span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    Ok(vals[0].deep_clone())
}
