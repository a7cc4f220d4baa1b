// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `IMPORT`/`IMPORT_PATH`/`EXPORT` builtins over the loader in
//! `interp::modules` — argument shape checking and string extraction only.

use std::path::Path;

use prefix_ast::expr::Arg;
use prefix_ast::Span;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::interp::Interpreter;
use crate::value::Value;

use super::{eval_positional, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add("IMPORT", 1, Some(2), import);
    reg.add("IMPORT_PATH", 1, Some(2), import_path);
    reg.add("EXPORT", 2, Some(2), export);
}

fn as_str(v: &Value, who: &str, span: Span) -> Result<String, RuntimeDiagnostic> {
    match v {
        Value::Str(s) => Ok(s.lock().unwrap().clone()),
        other => Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("{} expects STR, found {}", who, other.type_tag())), span)),
    }
}

fn import(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let name = as_str(&vals[0], "IMPORT", span)?;
    let alias = match vals.get(1) {
        Some(v) => Some(as_str(v, "IMPORT", span)?),
        None => None,
    };
    let bound = interp.import(env, &name, alias.as_deref(), span)?;
    Ok(Value::str(bound))
}

fn import_path(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let path = as_str(&vals[0], "IMPORT_PATH", span)?;
    let alias = match vals.get(1) {
        Some(v) => Some(as_str(v, "IMPORT_PATH", span)?),
        None => None,
    };
    let bound = interp.import_path(env, Path::new(&path), alias.as_deref(), span)?;
    Ok(Value::str(bound))
}

fn export(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let symbol = as_str(&vals[0], "EXPORT", span)?;
    let module = as_str(&vals[1], "EXPORT", span)?;
    interp.export(env, &symbol, &module, span)?;
    Ok(Value::Null)
}
