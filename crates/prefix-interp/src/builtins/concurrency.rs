// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Thin builtin wrappers over the thread-control machinery in
//! `interp::concurrency` — this module only does argument shape checking
//! and unwraps `Value::Thr`/`Value::Func`, the actual pause/resume/restart
//! logic lives next to the spawn code it cooperates with.

use std::sync::Arc;

use prefix_ast::expr::Arg;
use prefix_ast::Span;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::interp::Interpreter;
use crate::value::{Closure, Value};

use super::{eval_positional, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add("AWAIT", 1, Some(1), await_);
    reg.add("PAUSE", 1, Some(2), pause);
    reg.add("RESUME", 1, Some(1), resume);
    reg.add("STOP", 1, Some(1), stop);
    reg.add("RESTART", 1, Some(1), restart);
    reg.add("PARALLEL", 1, None, parallel);
}

fn as_thread<'a>(v: &'a Value, who: &str, span: Span) -> Result<&'a Arc<crate::value::ThreadHandle>, RuntimeDiagnostic> {
    match v {
        Value::Thr(t) => Ok(t),
        other => Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("{} expects THR, found {}", who, other.type_tag())), span)),
    }
}

fn await_(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let handle = as_thread(&vals[0], "AWAIT", span)?;
    interp.thread_await(handle).map_err(|e| RuntimeDiagnostic::new(RuntimeError::Thread(e), span))
}

fn pause(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let handle = as_thread(&vals[0], "PAUSE", span)?;
    let seconds = match vals.get(1) {
        Some(Value::Int(n)) => Some(*n as f64),
        Some(Value::Flt(f)) => Some(*f),
        Some(other) => return Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("PAUSE expects a numeric delay, found {}", other.type_tag())), span)),
        None => None,
    };
    interp.thread_pause(handle, seconds);
    Ok(Value::Null)
}

fn resume(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let handle = as_thread(&vals[0], "RESUME", span)?;
    interp.thread_resume(handle);
    Ok(Value::Null)
}

fn stop(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let handle = as_thread(&vals[0], "STOP", span)?;
    interp.thread_stop(handle);
    Ok(Value::Null)
}

fn restart(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let handle = as_thread(&vals[0], "RESTART", span)?;
    interp.thread_restart(handle).map_err(|e| RuntimeDiagnostic::new(RuntimeError::Thread(e), span))?;
    Ok(vals[0].clone())
}

/// `PARALLEL(f1, f2, ...)`: runs each nullary function on its own thread and
/// blocks until all finish, surfacing the first real error encountered.
fn parallel(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let mut closures: Vec<Arc<Closure>> = Vec::with_capacity(vals.len());
    for v in &vals {
        match v {
            Value::Func(f) => closures.push(f.clone()),
            other => return Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("PARALLEL expects FUNC arguments, found {}", other.type_tag())), span)),
        }
    }
    interp.run_parallel(&closures, span)
}
