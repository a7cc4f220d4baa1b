// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Output, user-raised errors, and the file I/O helper wrappers.
//!
//! `READFILE`/`WRITEFILE`/`CL` are specified only at the boundary level —
//! fixed-contract external collaborators the evaluator calls into, not part
//! of the evaluator's own hard core.

use prefix_ast::expr::Arg;
use prefix_ast::Span;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::interp::Interpreter;
use crate::value::Value;

use super::{eval_positional, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add("PRINT", 0, None, print);
    reg.add("THROW", 1, Some(1), throw);
    reg.add("SHUSH", 0, Some(0), shush);
    reg.add("UNSHUSH", 0, Some(0), unshush);
    reg.add("READFILE", 1, Some(1), readfile);
    reg.add("WRITEFILE", 2, Some(2), writefile);
    reg.add("CL", 0, None, cl);
}

fn print(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let _ = span;
    let line = vals.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
    interp.emit(&line);
    Ok(Value::Null)
}

fn throw(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    Err(RuntimeDiagnostic::new(RuntimeError::Throw(vals[0].clone()), span))
}

fn shush(interp: &Interpreter, _env: &Environment, _args: &[Arg], _span: Span) -> Result<Value, RuntimeDiagnostic> {
    interp.shush();
    Ok(Value::Null)
}

fn unshush(interp: &Interpreter, _env: &Environment, _args: &[Arg], _span: Span) -> Result<Value, RuntimeDiagnostic> {
    interp.unshush();
    Ok(Value::Null)
}

fn readfile(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let path = match &vals[0] {
        Value::Str(s) => s.lock().unwrap().clone(),
        other => return Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("READFILE expects STR, found {}", other.type_tag())), span)),
    };
    std::fs::read_to_string(interp.script_dir().join(&path))
        .map(Value::str)
        .map_err(|e| RuntimeDiagnostic::new(RuntimeError::Io(format!("{}: {}", path, e)), span))
}

fn writefile(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let path = match &vals[0] {
        Value::Str(s) => s.lock().unwrap().clone(),
        other => return Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("WRITEFILE expects STR, found {}", other.type_tag())), span)),
    };
    let contents = vals[1].to_string();
    std::fs::write(interp.script_dir().join(&path), contents)
        .map(|_| Value::Null)
        .map_err(|e| RuntimeDiagnostic::new(RuntimeError::Io(format!("{}: {}", path, e)), span))
}

/// `CL(cmd...)`: runs a host command and returns its captured stdout. A thin
/// wrapper, per the boundary contract — no shell interpretation is added
/// beyond what `std::process::Command` gives each argument.
fn cl(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    if vals.is_empty() {
        return Err(RuntimeDiagnostic::new(RuntimeError::ArityMismatch("CL".into(), "at least 1".into(), 0), span));
    }
    let mut parts = vals.iter().map(|v| v.to_string());
    let program = parts.next().unwrap();
    let output = std::process::Command::new(program)
        .args(parts)
        .current_dir(interp.script_dir())
        .output()
        .map_err(|e| RuntimeDiagnostic::new(RuntimeError::Io(e.to_string()), span))?;
    Ok(Value::str(String::from_utf8_lossy(&output.stdout).into_owned()))
}
