// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Tensor kernels: elementwise ops, shape introspection, flip, fill,
//! scatter, convolution, and the `TNS` constructor.

use std::sync::{Arc, Mutex};

use prefix_ast::expr::Arg;
use prefix_ast::Span;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::interp::Interpreter;
use crate::value::{Tensor, Value};

use super::{eval_positional, raw_arg, Registry};

pub(super) fn register(reg: &mut Registry) {
    reg.add("TADD", 2, Some(2), tadd);
    reg.add("TSUB", 2, Some(2), tsub);
    reg.add("TMUL", 2, Some(2), tmul);
    reg.add("TDIV", 2, Some(2), tdiv);
    reg.add("TPOW", 2, Some(2), tpow);
    reg.add("SHAPE", 1, Some(1), shape);
    reg.add("TLEN", 2, Some(2), tlen);
    reg.add("TFLIP", 2, Some(2), tflip);
    reg.add("FILL", 2, Some(2), fill);
    reg.add("SCAT", 3, Some(3), scat);
    reg.add("CONV", 2, Some(2), conv);
    reg.add("TNS", 1, Some(2), tns_ctor);
    reg.add("MADD", 2, Some(2), madd);
    reg.add("MSUB", 2, Some(2), msub);
    reg.add("MMUL", 2, Some(2), mmul);
    reg.add("MDIV", 2, Some(2), mdiv);
    reg.add("MSUM", 2, None, msum);
    reg.add("MPROD", 2, None, mprod);
}

fn as_tensor(v: &Value, span: Span) -> Result<Arc<Mutex<Tensor>>, RuntimeDiagnostic> {
    match v {
        Value::Tns(t) => Ok(t.clone()),
        other => Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("expected TNS, found {}", other.type_tag())), span)),
    }
}

enum Binop {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

fn apply_scalar(op: &Binop, a: &Value, b: &Value, span: Span) -> Result<Value, RuntimeDiagnostic> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(match op {
            Binop::Add => x.wrapping_add(*y),
            Binop::Sub => x.wrapping_sub(*y),
            Binop::Mul => x.wrapping_mul(*y),
            Binop::Div => {
                if *y == 0 {
                    return Err(RuntimeDiagnostic::new(RuntimeError::DivisionByZero, span));
                }
                x.wrapping_div(*y)
            }
            Binop::Pow => {
                if *y < 0 {
                    return Err(RuntimeDiagnostic::new(RuntimeError::Type("negative exponent on INT".into()), span));
                }
                x.pow(*y as u32)
            }
        })),
        (Value::Flt(x), Value::Flt(y)) => Ok(Value::Flt(match op {
            Binop::Add => x + y,
            Binop::Sub => x - y,
            Binop::Mul => x * y,
            Binop::Div => x / y,
            Binop::Pow => x.powf(*y),
        })),
        _ => Err(RuntimeDiagnostic::new(
            RuntimeError::Type(format!("elementwise op requires matching numeric elements, found {} and {}", a.type_tag(), b.type_tag())),
            span,
        )),
    }
}

fn elementwise(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span, op: Binop) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let t1 = as_tensor(&vals[0], span)?;
    let t1 = t1.lock().unwrap();
    let result_data = match &vals[1] {
        Value::Tns(t2) => {
            let t2 = t2.lock().unwrap();
            if t1.shape != t2.shape {
                return Err(RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds("tensor shapes must match for elementwise ops".into()), span));
            }
            t1.data
                .iter()
                .zip(t2.data.iter())
                .map(|(a, b)| apply_scalar(&op, a, b, span))
                .collect::<Result<Vec<_>, _>>()?
        }
        scalar @ (Value::Int(_) | Value::Flt(_)) => {
            t1.data.iter().map(|a| apply_scalar(&op, a, scalar, span)).collect::<Result<Vec<_>, _>>()?
        }
        other => {
            return Err(RuntimeDiagnostic::new(
                RuntimeError::Type(format!("expected TNS or numeric scalar, found {}", other.type_tag())),
                span,
            ))
        }
    };
    let result = Value::Tns(Arc::new(Mutex::new(Tensor::new(t1.shape.clone(), result_data))));
    if let Some(first) = raw_arg(args, 0) {
        interp.maybe_writeback(env, first, &result, span)?;
    }
    Ok(result)
}

fn tadd(i: &Interpreter, e: &Environment, a: &[Arg], s: Span) -> Result<Value, RuntimeDiagnostic> { elementwise(i, e, a, s, Binop::Add) }
fn tsub(i: &Interpreter, e: &Environment, a: &[Arg], s: Span) -> Result<Value, RuntimeDiagnostic> { elementwise(i, e, a, s, Binop::Sub) }
fn tmul(i: &Interpreter, e: &Environment, a: &[Arg], s: Span) -> Result<Value, RuntimeDiagnostic> { elementwise(i, e, a, s, Binop::Mul) }
fn tdiv(i: &Interpreter, e: &Environment, a: &[Arg], s: Span) -> Result<Value, RuntimeDiagnostic> { elementwise(i, e, a, s, Binop::Div) }
fn tpow(i: &Interpreter, e: &Environment, a: &[Arg], s: Span) -> Result<Value, RuntimeDiagnostic> { elementwise(i, e, a, s, Binop::Pow) }

// `MADD`..`MDIV` are the same strict elementwise rule as `TADD`..`TDIV`:
// identical rank/shape for tensor-tensor, matching element type for
// tensor-scalar. They're distinct builtin names, not a distinct kernel.
fn madd(i: &Interpreter, e: &Environment, a: &[Arg], s: Span) -> Result<Value, RuntimeDiagnostic> { elementwise(i, e, a, s, Binop::Add) }
fn msub(i: &Interpreter, e: &Environment, a: &[Arg], s: Span) -> Result<Value, RuntimeDiagnostic> { elementwise(i, e, a, s, Binop::Sub) }
fn mmul(i: &Interpreter, e: &Environment, a: &[Arg], s: Span) -> Result<Value, RuntimeDiagnostic> { elementwise(i, e, a, s, Binop::Mul) }
fn mdiv(i: &Interpreter, e: &Environment, a: &[Arg], s: Span) -> Result<Value, RuntimeDiagnostic> { elementwise(i, e, a, s, Binop::Div) }

/// Variadic fold of N tensors sharing one shape through a binary op,
/// left to right. Every operand must be a `TNS` of identical shape.
fn variadic_tensor_fold(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span, op: Binop) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let tensors: Vec<_> = vals.iter().map(|v| as_tensor(v, span)).collect::<Result<_, _>>()?;
    let locked: Vec<_> = tensors.iter().map(|t| t.lock().unwrap()).collect();
    let shape = locked[0].shape.clone();
    if locked.iter().any(|t| t.shape != shape) {
        return Err(RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds("all tensors must share the same shape".into()), span));
    }
    let mut acc = locked[0].data.clone();
    for t in &locked[1..] {
        acc = acc.iter().zip(t.data.iter()).map(|(a, b)| apply_scalar(&op, a, b, span)).collect::<Result<Vec<_>, _>>()?;
    }
    Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(shape, acc)))))
}

fn msum(i: &Interpreter, e: &Environment, a: &[Arg], s: Span) -> Result<Value, RuntimeDiagnostic> { variadic_tensor_fold(i, e, a, s, Binop::Add) }
fn mprod(i: &Interpreter, e: &Environment, a: &[Arg], s: Span) -> Result<Value, RuntimeDiagnostic> { variadic_tensor_fold(i, e, a, s, Binop::Mul) }

fn shape(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let t = as_tensor(&vals[0], span)?;
    let t = t.lock().unwrap();
    let data = t.shape.iter().map(|d| Value::Int(*d as i64)).collect::<Vec<_>>();
    Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(vec![t.shape.len()], data)))))
}

fn tlen(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let t = as_tensor(&vals[0], span)?;
    let dim = match &vals[1] {
        Value::Int(n) => *n,
        other => return Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("expected INT dimension, found {}", other.type_tag())), span)),
    };
    let t = t.lock().unwrap();
    let idx = dim as usize;
    if idx < 1 || idx > t.shape.len() {
        return Err(RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds(format!("dimension {} out of range", dim)), span));
    }
    Ok(Value::Int(t.shape[idx - 1] as i64))
}

fn tflip(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let t = as_tensor(&vals[0], span)?;
    let dim = match &vals[1] {
        Value::Int(n) => *n as usize,
        other => return Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("expected INT dimension, found {}", other.type_tag())), span)),
    };
    let t = t.lock().unwrap();
    if dim < 1 || dim > t.shape.len() {
        return Err(RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds("dimension out of range".into()), span));
    }
    let strides = t.strides();
    let mut out = t.data.clone();
    let axis = dim - 1;
    let dim_size = t.shape[axis];
    let stride = strides[axis];
    let outer = t.data.len() / (dim_size * stride);
    for o in 0..outer {
        for i in 0..dim_size {
            for k in 0..stride {
                let src = o * dim_size * stride + i * stride + k;
                let dst = o * dim_size * stride + (dim_size - 1 - i) * stride + k;
                out[dst] = t.data[src].clone();
            }
        }
    }
    Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(t.shape.clone(), out)))))
}

fn fill(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let t = as_tensor(&vals[0], span)?;
    let t = t.lock().unwrap();
    let fill_value = &vals[1];
    if let Some(elem_type) = t.elem_type {
        if elem_type != fill_value.type_tag() {
            return Err(RuntimeDiagnostic::new(
                RuntimeError::Type(format!("FILL value type {} does not match element type {}", fill_value.type_tag(), elem_type)),
                span,
            ));
        }
    }
    let data = t.data.iter().map(|_| fill_value.deep_clone()).collect();
    Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(t.shape.clone(), data)))))
}

fn scat(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let src = as_tensor(&vals[0], span)?;
    let dst = as_tensor(&vals[1], span)?;
    let ind = as_tensor(&vals[2], span)?;

    let src = src.lock().unwrap();
    let dst = dst.lock().unwrap();
    let ind = ind.lock().unwrap();

    let rank = dst.shape.len();
    if ind.shape != vec![rank, 2] {
        return Err(RuntimeDiagnostic::new(RuntimeError::Type("SCAT index tensor must have shape [rank, 2]".into()), span));
    }
    let mut lo = Vec::with_capacity(rank);
    let mut hi = Vec::with_capacity(rank);
    for d in 0..rank {
        let lo_raw = match &ind.data[d * 2] {
            Value::Int(n) => *n,
            _ => return Err(RuntimeDiagnostic::new(RuntimeError::Type("SCAT indices must be INT".into()), span)),
        };
        let hi_raw = match &ind.data[d * 2 + 1] {
            Value::Int(n) => *n,
            _ => return Err(RuntimeDiagnostic::new(RuntimeError::Type("SCAT indices must be INT".into()), span)),
        };
        let dim = dst.shape[d] as i64;
        let lo_n = if lo_raw < 0 { dim + lo_raw + 1 } else { lo_raw };
        let hi_n = if hi_raw < 0 { dim + hi_raw + 1 } else { hi_raw };
        if lo_n < 1 || hi_n > dim || lo_n > hi_n {
            return Err(RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds("SCAT slice out of range".into()), span));
        }
        lo.push(lo_n as usize);
        hi.push(hi_n as usize);
    }
    let slice_shape: Vec<usize> = lo.iter().zip(hi.iter()).map(|(a, b)| b - a + 1).collect();
    if slice_shape != src.shape {
        return Err(RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds("SCAT slice extents must match src shape".into()), span));
    }
    if let (Some(dst_t), Some(src_t)) = (dst.elem_type, src.elem_type) {
        if dst_t != src_t {
            return Err(RuntimeDiagnostic::new(
                RuntimeError::Type(format!("SCAT src element type {} does not match dst element type {}", src_t, dst_t)),
                span,
            ));
        }
    }

    let mut out = dst.data.clone();
    let strides = dst.strides();
    let mut cur = vec![0usize; rank];
    scat_recurse(0, &lo, &hi, &strides, &src.strides(), &src.data, &mut cur, &mut out);
    Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(dst.shape.clone(), out)))))
}

#[allow(clippy::too_many_arguments)]
fn scat_recurse(
    dim: usize,
    lo: &[usize],
    hi: &[usize],
    dst_strides: &[usize],
    src_strides: &[usize],
    src_data: &[Value],
    cur: &mut Vec<usize>,
    out: &mut [Value],
) {
    if dim == lo.len() {
        let dst_off: usize = cur.iter().zip(dst_strides.iter()).map(|(i, s)| (i - 1) * s).sum();
        let src_off: usize = cur
            .iter()
            .zip(lo.iter())
            .zip(src_strides.iter())
            .map(|((i, l), s)| (i - l) * s)
            .sum();
        out[dst_off] = src_data[src_off].clone();
        return;
    }
    for pos in lo[dim]..=hi[dim] {
        cur.push(pos);
        scat_recurse(dim + 1, lo, hi, dst_strides, src_strides, src_data, cur, out);
        cur.pop();
    }
}

fn conv(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    let x = as_tensor(&vals[0], span)?;
    let kernel = as_tensor(&vals[1], span)?;
    let x = x.lock().unwrap();
    let kernel = kernel.lock().unwrap();
    if x.shape.len() != kernel.shape.len() {
        return Err(RuntimeDiagnostic::new(RuntimeError::Type("CONV kernel rank must match input rank".into()), span));
    }
    if kernel.shape.iter().any(|k| k % 2 == 0) {
        return Err(RuntimeDiagnostic::new(RuntimeError::Type("CONV kernel extents must be odd".into()), span));
    }
    let all_int = x.data.iter().chain(kernel.data.iter()).all(|v| matches!(v, Value::Int(_)));
    let x_strides = x.strides();
    let k_strides = kernel.strides();
    let rank = x.shape.len();
    let radii: Vec<i64> = kernel.shape.iter().map(|k| (*k as i64 - 1) / 2).collect();

    let mut out = Vec::with_capacity(x.data.len());
    let mut idx = vec![0i64; rank];
    conv_recurse(0, &x.shape, &mut idx, &radii, &kernel.shape, &k_strides, &kernel.data, &x_strides, &x.data, all_int, &mut out);
    Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(x.shape.clone(), out)))))
}

#[allow(clippy::too_many_arguments)]
fn conv_recurse(
    dim: usize,
    shape: &[usize],
    idx: &mut Vec<i64>,
    radii: &[i64],
    kshape: &[usize],
    kstrides: &[usize],
    kdata: &[Value],
    xstrides: &[usize],
    xdata: &[Value],
    all_int: bool,
    out: &mut Vec<Value>,
) {
    if dim == shape.len() {
        let mut acc_i: i64 = 0;
        let mut acc_f: f64 = 0.0;
        let rank = shape.len();
        let mut koff = vec![0i64; rank];
        conv_inner(0, rank, idx, radii, kshape, &mut koff, kstrides, kdata, xstrides, xdata, shape, all_int, &mut acc_i, &mut acc_f);
        out.push(if all_int { Value::Int(acc_i) } else { Value::Flt(acc_f) });
        return;
    }
    for i in 0..shape[dim] as i64 {
        idx.push(i);
        conv_recurse(dim + 1, shape, idx, radii, kshape, kstrides, kdata, xstrides, xdata, all_int, out);
        idx.pop();
    }
}

#[allow(clippy::too_many_arguments)]
fn conv_inner(
    dim: usize,
    rank: usize,
    center: &[i64],
    radii: &[i64],
    kshape: &[usize],
    koff: &mut Vec<i64>,
    kstrides: &[usize],
    kdata: &[Value],
    xstrides: &[usize],
    xdata: &[Value],
    xshape: &[usize],
    all_int: bool,
    acc_i: &mut i64,
    acc_f: &mut f64,
) {
    if dim == rank {
        let k_idx: usize = koff
            .iter()
            .zip(radii.iter())
            .zip(kstrides.iter())
            .map(|((o, r), s)| ((o + r) as usize) * s)
            .sum();
        let mut x_idx = 0usize;
        for d in 0..rank {
            let raw = center[d] + koff[d];
            let clamped = raw.clamp(0, xshape[d] as i64 - 1);
            x_idx += clamped as usize * xstrides[d];
        }
        let kv = &kdata[k_idx];
        let xv = &xdata[x_idx];
        if all_int {
            if let (Value::Int(k), Value::Int(x)) = (kv, xv) {
                *acc_i += k * x;
            }
        } else {
            let kf = match kv {
                Value::Int(i) => *i as f64,
                Value::Flt(f) => *f,
                _ => 0.0,
            };
            let xf = match xv {
                Value::Int(i) => *i as f64,
                Value::Flt(f) => *f,
                _ => 0.0,
            };
            *acc_f += kf * xf;
        }
        return;
    }
    for o in -radii[dim]..=radii[dim] {
        if o.unsigned_abs() as usize >= kshape[dim] {
            continue;
        }
        koff.push(o);
        conv_inner(dim + 1, rank, center, radii, kshape, koff, kstrides, kdata, xstrides, xdata, xshape, all_int, acc_i, acc_f);
        koff.pop();
    }
}

fn tns_ctor(interp: &Interpreter, env: &Environment, args: &[Arg], span: Span) -> Result<Value, RuntimeDiagnostic> {
    let vals = eval_positional(interp, env, args)?;
    if vals.len() == 1 {
        let s = match &vals[0] {
            Value::Str(s) => s.lock().unwrap().clone(),
            other => return Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("TNS(string) expected STR, found {}", other.type_tag())), span)),
        };
        let data: Vec<Value> = s.chars().map(|c| Value::str(c.to_string())).collect();
        return Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(vec![data.len()], data)))));
    }
    let shape_t = as_tensor(&vals[0], span)?;
    let shape_t = shape_t.lock().unwrap();
    let shape: Vec<usize> = shape_t
        .data
        .iter()
        .map(|v| match v {
            Value::Int(n) => Ok(*n as usize),
            other => Err(RuntimeDiagnostic::new(RuntimeError::Type(format!("TNS shape must be INT, found {}", other.type_tag())), span)),
        })
        .collect::<Result<_, _>>()?;
    let len: usize = shape.iter().product();
    let data = (0..len).map(|_| vals[1].deep_clone()).collect();
    Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(shape, data)))))
}
