// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Arithmetic, comparison, and coercion builtins.
//!
//! Strict operators (`ADD`, `SUB`, ...) require both operands to share a
//! numeric tag. The `I`/`F`-prefixed coercing variants convert first.
//! Any of these accepts a pointer-expression (`@name`) first argument and
//! writes its result back into that binding.

use prefix_ast::expr::Arg;
use prefix_ast::Span;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::interp::{values_equal, Interpreter};
use crate::value::Value;

use super::{eval_positional, raw_arg, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add("ADD", 2, Some(2), add);
    reg.add("SUB", 2, Some(2), sub);
    reg.add("MUL", 2, Some(2), mul);
    reg.add("DIV", 2, Some(2), div);
    reg.add("MOD", 2, Some(2), modulo);
    reg.add("POW", 2, Some(2), pow);
    reg.add("ROOT", 2, Some(2), root);
    reg.add("EQ", 2, Some(2), eq);
    reg.add("NE", 2, Some(2), ne);
    reg.add("LT", 2, Some(2), lt);
    reg.add("GT", 2, Some(2), gt);
    reg.add("LE", 2, Some(2), le);
    reg.add("GE", 2, Some(2), ge);
    reg.add("IADD", 2, Some(2), iadd);
    reg.add("ISUB", 2, Some(2), isub);
    reg.add("IMUL", 2, Some(2), imul);
    reg.add("IDIV", 2, Some(2), idiv);
    reg.add("FADD", 2, Some(2), fadd);
    reg.add("FSUB", 2, Some(2), fsub);
    reg.add("FMUL", 2, Some(2), fmul);
    reg.add("FDIV", 2, Some(2), fdiv);
    reg.add("TINT", 1, Some(1), tint);
    reg.add("TFLT", 1, Some(1), tflt);
    reg.add("TSTR", 1, Some(1), tstr);
}

enum NumPair {
    Int(i64, i64),
    Flt(f64, f64),
}

fn as_same_numeric(a: &Value, b: &Value, span: Span) -> Result<NumPair, RuntimeDiagnostic> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(NumPair::Int(*x, *y)),
        (Value::Flt(x), Value::Flt(y)) => Ok(NumPair::Flt(*x, *y)),
        _ => Err(RuntimeDiagnostic::new(
            RuntimeError::Type(format!("operands must share a numeric type, found {} and {}", a.type_tag(), b.type_tag())),
            span,
        )),
    }
}

fn writeback_and_return(
    interp: &Interpreter,
    env: &Environment,
    args: &[Arg],
    span: Span,
    result: Value,
) -> Result<Value, RuntimeDiagnostic> {
    if let Some(first) = raw_arg(args, 0) {
        interp.maybe_writeback(env, first, &result, span)?;
    }
    Ok(result)
}

fn add(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = match as_same_numeric(&vals[0], &vals[1], span)? {
        NumPair::Int(x, y) => Value::Int(x.wrapping_add(y)),
        NumPair::Flt(x, y) => Value::Flt(x + y),
    };
    writeback_and_return(interp, env, args, span, result)
}

fn sub(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = match as_same_numeric(&vals[0], &vals[1], span)? {
        NumPair::Int(x, y) => Value::Int(x.wrapping_sub(y)),
        NumPair::Flt(x, y) => Value::Flt(x - y),
    };
    writeback_and_return(interp, env, args, span, result)
}

fn mul(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = match as_same_numeric(&vals[0], &vals[1], span)? {
        NumPair::Int(x, y) => Value::Int(x.wrapping_mul(y)),
        NumPair::Flt(x, y) => Value::Flt(x * y),
    };
    writeback_and_return(interp, env, args, span, result)
}

fn div(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = match as_same_numeric(&vals[0], &vals[1], span)? {
        NumPair::Int(_, 0) => return Err(RuntimeDiagnostic::new(RuntimeError::DivisionByZero, span)),
        NumPair::Int(x, y) => Value::Int(x.wrapping_div(y)),
        NumPair::Flt(x, y) => Value::Flt(x / y),
    };
    writeback_and_return(interp, env, args, span, result)
}

fn modulo(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = match as_same_numeric(&vals[0], &vals[1], span)? {
        NumPair::Int(_, 0) => return Err(RuntimeDiagnostic::new(RuntimeError::DivisionByZero, span)),
        NumPair::Int(x, y) => Value::Int(x.rem_euclid(y.abs())),
        NumPair::Flt(x, y) => Value::Flt(x.rem_euclid(y.abs())),
    };
    writeback_and_return(interp, env, args, span, result)
}

fn pow(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = match as_same_numeric(&vals[0], &vals[1], span)? {
        NumPair::Int(_, y) if y < 0 => {
            return Err(RuntimeDiagnostic::new(RuntimeError::Type("POW: negative exponent on INT".into()), span))
        }
        NumPair::Int(x, y) => Value::Int(x.pow(y as u32)),
        NumPair::Flt(x, y) => Value::Flt(x.powf(y)),
    };
    writeback_and_return(interp, env, args, span, result)
}

fn root(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = match (&vals[0], &vals[1]) {
        (Value::Int(x), Value::Int(n)) if *n != 0 => {
            let v = *x as f64;
            let r = v.signum() * v.abs().powf(1.0 / *n as f64);
            Value::Int(r.round() as i64)
        }
        (Value::Flt(x), Value::Flt(n)) if *n != 0.0 => {
            let is_odd_integer_exp = n.fract() == 0.0 && (*n as i64) % 2 != 0;
            if *x < 0.0 && is_odd_integer_exp {
                Value::Flt(-((-x).powf(1.0 / n)))
            } else {
                Value::Flt(x.powf(1.0 / n))
            }
        }
        _ => return Err(RuntimeDiagnostic::new(RuntimeError::Type("ROOT requires matching INT or FLT operands".into()), span)),
    };
    writeback_and_return(interp, env, args, span, result)
}

fn eq(interp: &Interpreter, env: &Environment, args: &[Arg], _span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    Ok(Value::Int(values_equal(&vals[0], &vals[1]) as i64))
}

fn ne(interp: &Interpreter, env: &Environment, args: &[Arg], _span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    Ok(Value::Int(!values_equal(&vals[0], &vals[1]) as i64))
}

fn lt(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    compare(interp, env, args, span, |o| o == std::cmp::Ordering::Less)
}
fn gt(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    compare(interp, env, args, span, |o| o == std::cmp::Ordering::Greater)
}
fn le(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    compare(interp, env, args, span, |o| o != std::cmp::Ordering::Greater)
}
fn ge(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    compare(interp, env, args, span, |o| o != std::cmp::Ordering::Less)
}

fn compare(
    interp: &Interpreter,
    env: &Environment,
    args: &[Arg],
    span: Span,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let ordering = match as_same_numeric(&vals[0], &vals[1], span)? {
        NumPair::Int(x, y) => x.cmp(&y),
        NumPair::Flt(x, y) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Greater),
    };
    Ok(Value::Int(accept(ordering) as i64))
}

/// Numeric `STR` coercion parses binary digits, matching the binary numeral
/// system the lexer uses for literals (and `TSTR`'s output).
fn coerce_to_int(v: &Value, span: Span) -> Result<i64, RuntimeDiagnostic> {
    match v {
        Value::Int(i) => Ok(*i),
        Value::Flt(f) => Ok(*f as i64),
        Value::Str(s) => {
            let text = s.lock().unwrap().clone();
            i64::from_str_radix(text.trim(), 2).map_err(|_| RuntimeDiagnostic::new(RuntimeError::Type(format!("cannot coerce '{}' to INT", text)), span))
        }
        other => Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("cannot coerce {} to INT", other.type_tag())), span)),
    }
}

fn coerce_to_flt(v: &Value, span: Span) -> Result<f64, RuntimeDiagnostic> {
    match v {
        Value::Flt(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        Value::Str(s) => {
            let text = s.lock().unwrap().clone();
            crate::value::parse_flt_binary(&text).ok_or_else(|| RuntimeDiagnostic::new(RuntimeError::Type(format!("cannot coerce '{}' to FLT", text)), span))
        }
        other => Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("cannot coerce {} to FLT", other.type_tag())), span)),
    }
}

fn iadd(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = Value::Int(coerce_to_int(&vals[0], span)?.wrapping_add(coerce_to_int(&vals[1], span)?));
    writeback_and_return(interp, env, args, span, result)
}
fn isub(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = Value::Int(coerce_to_int(&vals[0], span)?.wrapping_sub(coerce_to_int(&vals[1], span)?));
    writeback_and_return(interp, env, args, span, result)
}
fn imul(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = Value::Int(coerce_to_int(&vals[0], span)?.wrapping_mul(coerce_to_int(&vals[1], span)?));
    writeback_and_return(interp, env, args, span, result)
}
fn idiv(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let divisor = coerce_to_int(&vals[1], span)?;
    if divisor == 0 {
        return Err(RuntimeDiagnostic::new(RuntimeError::DivisionByZero, span));
    }
    let result = Value::Int(coerce_to_int(&vals[0], span)?.wrapping_div(divisor));
    writeback_and_return(interp, env, args, span, result)
}

fn fadd(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = Value::Flt(coerce_to_flt(&vals[0], span)? + coerce_to_flt(&vals[1], span)?);
    writeback_and_return(interp, env, args, span, result)
}
fn fsub(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = Value::Flt(coerce_to_flt(&vals[0], span)? - coerce_to_flt(&vals[1], span)?);
    writeback_and_return(interp, env, args, span, result)
}
fn fmul(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = Value::Flt(coerce_to_flt(&vals[0], span)? * coerce_to_flt(&vals[1], span)?);
    writeback_and_return(interp, env, args, span, result)
}
fn fdiv(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = Value::Flt(coerce_to_flt(&vals[0], span)? / coerce_to_flt(&vals[1], span)?);
    writeback_and_return(interp, env, args, span, result)
}

fn tint(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = Value::Int(coerce_to_int(&vals[0], span)?);
    writeback_and_return(interp, env, args, span, result)
}
fn tflt(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = Value::Flt(coerce_to_flt(&vals[0], span)?);
    writeback_and_return(interp, env, args, span, result)
}
fn tstr(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let result = Value::str(vals[0].to_string());
    writeback_and_return(interp, env, args, span, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        Span::new(0, 0)
    }

    #[test]
    fn coerce_int_passes_through_and_truncates_float() {
        assert_eq!(coerce_to_int(&Value::Int(5), dummy_span()).unwrap(), 5);
        assert_eq!(coerce_to_int(&Value::Flt(5.9), dummy_span()).unwrap(), 5);
    }

    #[test]
    fn coerce_str_to_int_parses_binary_not_decimal() {
        // "100" is the binary literal for decimal 4, matching the lexer's
        // own binary-literal numeral grammar.
        assert_eq!(coerce_to_int(&Value::str("100"), dummy_span()).unwrap(), 4);
        assert_eq!(coerce_to_int(&Value::str("-101"), dummy_span()).unwrap(), -5);
    }

    #[test]
    fn coerce_str_to_flt_parses_binary_fixed_point() {
        // "1.1" in binary fixed-point is 1 + 1/2 = 1.5
        assert_eq!(coerce_to_flt(&Value::str("1.1"), dummy_span()).unwrap(), 1.5);
    }

    #[test]
    fn coerce_non_numeric_str_is_a_type_error() {
        assert!(coerce_to_int(&Value::str("abc"), dummy_span()).is_err());
        assert!(coerce_to_flt(&Value::str("abc"), dummy_span()).is_err());
    }

    #[test]
    fn tstr_and_coerce_round_trip_through_binary() {
        let n = Value::Int(42);
        let as_str = n.to_string();
        assert_eq!(coerce_to_int(&Value::str(as_str), dummy_span()).unwrap(), 42);
    }
}
