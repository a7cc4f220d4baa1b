// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Map builtins: key/value introspection, deletion, slicing, and MAX/MIN.
//!
//! The elementwise kernels named `MADD`..`MDIV`/`MSUM`/`MPROD` live in
//! `tensor.rs`: they operate on tensors, not maps, per the shape/rank rules
//! shared with `TADD`..`TPOW`.
//!
//! `MAX`/`MIN` on strings order by length, not lexicographically, and
//! `SLICE` is 1-based inclusive — both match the observed source behaviour
//! the specification calls out as intentionally preserved ambiguities.

use std::sync::{Arc, Mutex};

use prefix_ast::expr::Arg;
use prefix_ast::Span;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::interp::Interpreter;
use crate::value::{PrefixMap, Tensor, Value};

use super::{eval_positional, raw_arg, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add("KEYS", 1, Some(1), keys);
    reg.add("VALUES", 1, Some(1), values);
    reg.add("DEL", 1, Some(2), del);
    reg.add("SLICE", 3, Some(3), slice);
    reg.add("MAX", 1, None, max);
    reg.add("MIN", 1, None, min);
}

fn as_map(v: &Value, span: Span) -> Result<Arc<Mutex<PrefixMap>>, RuntimeDiagnostic> {
    match v {
        Value::Map(m) => Ok(m.clone()),
        other => Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("expected MAP, found {}", other.type_tag())), span)),
    }
}

fn keys(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let m = as_map(&vals[0], span)?;
    let m = m.lock().unwrap();
    let data: Vec<Value> = m.keys().map(|k| k.to_value()).collect();
    Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(vec![data.len()], data)))))
}

fn values(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let m = as_map(&vals[0], span)?;
    let m = m.lock().unwrap();
    let data: Vec<Value> = m.values().cloned().collect();
    Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(vec![data.len()], data)))))
}

fn del(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    if args.len() == 1 {
        let name = raw_arg(args, 0)
            .and_then(|e| interp.ptr_name(e))
            .ok_or_else(|| RuntimeDiagnostic::new(RuntimeError::Type("DEL(@name) requires a pointer argument".into()), span))?;
        env.remove(name);
        return Ok(Value::Null);
    }
    let vals = eval_positional(interp, env, args)?;
    let m = as_map(&vals[0], span)?;
    let key = crate::value::MapKey::from_value(&vals[1]).map_err(|msg| RuntimeDiagnostic::new(RuntimeError::Type(msg), span))?;
    m.lock().unwrap().shift_remove(&key);
    Ok(Value::Null)
}

fn slice(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let start = as_index(&vals[1], span)?;
    let end = as_index(&vals[2], span)?;
    match &vals[0] {
        Value::Str(s) => {
            let s = s.lock().unwrap();
            let chars: Vec<char> = s.chars().collect();
            let (lo, hi) = resolve_range(start, end, chars.len(), span)?;
            Ok(Value::str(chars[lo - 1..hi].iter().collect::<String>()))
        }
        Value::Tns(t) => {
            let t = t.lock().unwrap();
            let (lo, hi) = resolve_range(start, end, t.len(), span)?;
            let data = t.data[lo - 1..hi].to_vec();
            Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(vec![data.len()], data)))))
        }
        other => Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("SLICE expects STR or TNS, found {}", other.type_tag())), span)),
    }
}

fn as_index(v: &Value, span: Span) -> Result<i64, RuntimeDiagnostic> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("expected INT, found {}", other.type_tag())), span)),
    }
}

fn resolve_range(start: i64, end: i64, len: usize, span: Span) -> Result<(usize, usize), RuntimeDiagnostic> {
    let norm = |i: i64| -> i64 { if i < 0 { len as i64 + i + 1 } else { i } };
    let lo = norm(start);
    let hi = norm(end);
    if lo < 1 || hi as usize > len || lo > hi {
        return Err(RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds("SLICE range out of bounds".into()), span));
    }
    Ok((lo as usize, hi as usize))
}

fn str_len_cmp(a: &str, b: &str) -> std::cmp::Ordering {
    a.chars().count().cmp(&b.chars().count())
}

fn max(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    extremum(interp, env, args, span, true)
}
fn min(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    extremum(interp, env, args, span, false)
}

fn extremum(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span, want_max: bool) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let mut best = vals
        .first()
        .cloned()
        .ok_or_else(|| RuntimeDiagnostic::new(RuntimeError::ArityMismatch("MAX/MIN".into(), "at least 1".into(), 0), span))?;
    for v in &vals[1..] {
        let better = match (&best, v) {
            (Value::Int(b), Value::Int(x)) => if want_max { x > b } else { x < b },
            (Value::Flt(b), Value::Flt(x)) => if want_max { x > b } else { x < b },
            (Value::Str(b), Value::Str(x)) => {
                let ord = str_len_cmp(&x.lock().unwrap(), &b.lock().unwrap());
                if want_max { ord == std::cmp::Ordering::Greater } else { ord == std::cmp::Ordering::Less }
            }
            (b, x) => return Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("cannot compare {} and {}", b.type_tag(), x.type_tag())), span)),
        };
        if better {
            best = v.clone();
        }
    }
    Ok(best)
}

