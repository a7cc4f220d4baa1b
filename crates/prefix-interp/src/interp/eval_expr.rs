// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression evaluation.

use std::sync::{Arc, Mutex};

use prefix_ast::expr::{Expr, ExprKind};
use prefix_ast::token::TypeTag;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::value::{MapKey, PrefixMap, Tensor, Value};

use super::Interpreter;

/// An index slot resolved structurally: a plain scalar position, a `Range`,
/// or a `Wildcard`. `Index`'s sub-expressions are never evaluated as
/// ordinary values — this mirrors the AST's own doc comment.
pub(super) enum IndexSlot {
    Pos(i64),
    Range(i64, i64),
    Wildcard,
}

impl Interpreter {
    pub fn eval_expr(&self, env: &Environment, expr: &Expr) -> Result<Value, RuntimeDiagnostic> {
        match &expr.kind {
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Flt(f) => Ok(Value::Flt(*f)),
            ExprKind::Str(s) => Ok(Value::str(s.clone())),

            // A bare `@name` evaluates to the bound value, same as `name`
            // would. The pointer marker only changes meaning at the call
            // site that inspects the unevaluated argument for a writeback
            // target (`raw_arg`/`ptr_name`); generic evaluation here must
            // still read through to the value, e.g. `ADD(@x, 1)` needs
            // `x`'s current value, not the string `"x"`.
            ExprKind::Ptr(name) => env
                .get_checked(name)
                .map_err(|e| RuntimeDiagnostic::new(e.into(), expr.span)),

            ExprKind::Ident(name) => env
                .get_checked(name)
                .map_err(|e| RuntimeDiagnostic::new(e.into(), expr.span)),

            ExprKind::Call { callee, args } => self.eval_call(env, callee, args, expr.span),

            ExprKind::Async(body) => {
                let handle = self.spawn_thread(env, body.clone());
                Ok(Value::Thr(handle))
            }

            ExprKind::Tns(items) => {
                let mut data = Vec::with_capacity(items.len());
                for item in items {
                    data.push(self.eval_expr(env, item)?);
                }
                Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(vec![data.len()], data)))))
            }

            ExprKind::Map(pairs) => {
                let mut map = PrefixMap::new();
                for (k, v) in pairs {
                    let key_val = self.eval_expr(env, k)?;
                    let key = MapKey::from_value(&key_val)
                        .map_err(|msg| RuntimeDiagnostic::new(RuntimeError::Type(msg), k.span))?;
                    let val = self.eval_expr(env, v)?;
                    map.insert(key, val);
                }
                Ok(Value::Map(Arc::new(Mutex::new(map))))
            }

            ExprKind::Index { object, indices } => {
                let obj = self.eval_expr(env, object)?;
                self.eval_index(&obj, indices, env, expr.span)
            }

            ExprKind::MapIndex { object, key } => {
                let obj = self.eval_expr(env, object)?;
                let key_val = self.eval_expr(env, key)?;
                let map = match &obj {
                    Value::Map(m) => m,
                    other => {
                        return Err(RuntimeDiagnostic::new(
                            RuntimeError::Type(format!("expected MAP, found {}", other.type_tag())),
                            expr.span,
                        ))
                    }
                };
                let mapkey = MapKey::from_value(&key_val)
                    .map_err(|msg| RuntimeDiagnostic::new(RuntimeError::Type(msg), key.span))?;
                map.lock()
                    .unwrap()
                    .get(&mapkey)
                    .cloned()
                    .ok_or_else(|| RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds(format!("key {} not found", key_val)), expr.span))
            }

            // Only reachable here when mis-used outside an index position —
            // a genuine evaluator error, since these are structural forms.
            ExprKind::Range(_) | ExprKind::Wildcard => Err(RuntimeDiagnostic::new(
                RuntimeError::Type("range/wildcard cannot be used outside an index".into()),
                expr.span,
            )),
        }
    }

    /// Resolve each index slot structurally, then either return a single
    /// element (full index) or a newly allocated sub-tensor (partial index).
    fn eval_index(
        &self,
        obj: &Value,
        indices: &[Expr],
        env: &Environment,
        span: prefix_ast::Span,
    ) -> Result<Value, RuntimeDiagnostic> {
        let tensor = match obj {
            Value::Tns(t) => t,
            other => {
                return Err(RuntimeDiagnostic::new(
                    RuntimeError::Type(format!("expected TNS, found {}", other.type_tag())),
                    span,
                ))
            }
        };
        let t = tensor.lock().unwrap();
        if indices.len() != t.rank() {
            return Err(RuntimeDiagnostic::new(
                RuntimeError::IndexOutOfBounds(format!("expected {} indices, found {}", t.rank(), indices.len())),
                span,
            ));
        }
        let mut slots = Vec::with_capacity(indices.len());
        for (dim, idx_expr) in indices.iter().enumerate() {
            slots.push(self.resolve_index_slot(env, idx_expr, t.shape[dim])?);
        }
        if slots.iter().all(|s| matches!(s, IndexSlot::Pos(_))) {
            let positions: Vec<usize> = slots
                .iter()
                .zip(t.shape.iter())
                .map(|(s, dim)| match s {
                    IndexSlot::Pos(p) => normalize_index(*p, *dim),
                    _ => unreachable!(),
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|msg| RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds(msg), span))?;
            let off = t
                .offset(&positions)
                .ok_or_else(|| RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds("index out of range".into()), span))?;
            return Ok(t.data[off].clone());
        }

        // Partial index: gather the cartesian product of resolved ranges,
        // producing a new contiguous sub-tensor.
        let mut ranges: Vec<Vec<usize>> = Vec::with_capacity(slots.len());
        for (slot, dim) in slots.iter().zip(t.shape.iter()) {
            let dim = *dim;
            let positions = match slot {
                IndexSlot::Pos(p) => vec![normalize_index(*p, dim)
                    .map_err(|msg| RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds(msg), span))?],
                IndexSlot::Wildcard => (1..=dim).collect(),
                IndexSlot::Range(a, b) => {
                    let a = normalize_index(*a, dim).map_err(|msg| RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds(msg), span))?;
                    let b = normalize_index(*b, dim).map_err(|msg| RuntimeDiagnostic::new(RuntimeError::IndexOutOfBounds(msg), span))?;
                    if a <= b { (a..=b).collect() } else { (b..=a).rev().collect() }
                }
            };
            ranges.push(positions);
        }
        let new_shape: Vec<usize> = ranges.iter().map(|r| r.len()).collect();
        let mut data = Vec::new();
        cartesian_collect(&ranges, &mut Vec::new(), &t, &mut data);
        Ok(Value::Tns(Arc::new(Mutex::new(Tensor::new(new_shape, data)))))
    }

    pub(super) fn resolve_index_slot(
        &self,
        env: &Environment,
        expr: &Expr,
        dim: usize,
    ) -> Result<IndexSlot, RuntimeDiagnostic> {
        match &expr.kind {
            ExprKind::Wildcard => Ok(IndexSlot::Wildcard),
            ExprKind::Range { start, end } => {
                let a = self.eval_expr(env, start)?;
                let b = self.eval_expr(env, end)?;
                Ok(IndexSlot::Range(as_int(&a, expr.span)?, as_int(&b, expr.span)?))
            }
            _ => {
                let _ = dim;
                let v = self.eval_expr(env, expr)?;
                Ok(IndexSlot::Pos(as_int(&v, expr.span)?))
            }
        }
    }
}

fn as_int(v: &Value, span: prefix_ast::Span) -> Result<i64, RuntimeDiagnostic> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(RuntimeDiagnostic::new(
            RuntimeError::Type(format!("expected INT index, found {}", other.type_tag())),
            span,
        )),
    }
}

/// 1-based index, negative counts from the end. Returns a 1-based position.
fn normalize_index(i: i64, dim: usize) -> Result<usize, String> {
    let resolved = if i < 0 { dim as i64 + i + 1 } else { i };
    if resolved < 1 || resolved as usize > dim {
        return Err(format!("index {} out of range for dimension of size {}", i, dim));
    }
    Ok(resolved as usize)
}

fn cartesian_collect(ranges: &[Vec<usize>], cur: &mut Vec<usize>, t: &Tensor, out: &mut Vec<Value>) {
    if cur.len() == ranges.len() {
        let off = t.offset(cur).expect("normalized indices are in range");
        out.push(t.data[off].clone());
        return;
    }
    let dim = cur.len();
    for &pos in &ranges[dim] {
        cur.push(pos);
        cartesian_collect(ranges, cur, t, out);
        cur.pop();
    }
}

/// Infer a tensor element's static type tag for the purposes the language
/// cares about (writes honouring the declared element type). Unused directly
/// by literal construction (which stores heterogeneous `Value`s as-is) but
/// kept for builtins that need to check element-type compatibility.
pub(super) fn common_type(values: &[Value]) -> TypeTag {
    let mut iter = values.iter().map(Value::type_tag);
    let first = match iter.next() {
        Some(t) => t,
        None => return TypeTag::Unknown,
    };
    if iter.all(|t| t == first) {
        match first {
            "INT" => TypeTag::Int,
            "FLT" => TypeTag::Flt,
            "STR" => TypeTag::Str,
            "TNS" => TypeTag::Tns,
            "MAP" => TypeTag::Map,
            "FUNC" => TypeTag::Func,
            "THR" => TypeTag::Thr,
            _ => TypeTag::Unknown,
        }
    } else {
        TypeTag::Unknown
    }
}
