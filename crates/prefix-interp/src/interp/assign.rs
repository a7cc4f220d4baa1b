// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Assignment target resolution: identifier, tensor index, and map index
//! targets, including the broadcast-fill behaviour when an index slot is a
//! `Range`/`Wildcard`.

use prefix_ast::expr::{Expr, ExprKind};
use prefix_ast::token::TypeTag;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::value::{MapKey, Value};

use super::eval_expr::IndexSlot;
use super::Interpreter;

impl Interpreter {
    pub(super) fn assign(
        &self,
        env: &Environment,
        target: &Expr,
        declared_type: Option<TypeTag>,
        value: Value,
    ) -> Result<(), RuntimeError> {
        match &target.kind {
            ExprKind::Ident(name) => {
                if let Some(ty) = declared_type {
                    env.declare(name, ty, value, true);
                    Ok(())
                } else {
                    env.assign(name, value).map_err(Into::into)
                }
            }
            ExprKind::Index { object, indices } => self.assign_index(env, object, indices, value),
            ExprKind::MapIndex { object, key } => self.assign_map_index(env, object, key, value),
            _ => Err(RuntimeError::Type("invalid assignment target".into())),
        }
    }

    fn assign_index(
        &self,
        env: &Environment,
        object: &Expr,
        indices: &[Expr],
        value: Value,
    ) -> Result<(), RuntimeError> {
        let obj = self
            .eval_expr(env, object)
            .map_err(|d| d.error)?;
        let tensor = match &obj {
            Value::Tns(t) => t,
            other => return Err(RuntimeError::Type(format!("expected TNS, found {}", other.type_tag()))),
        };
        let shape = tensor.lock().unwrap().shape.clone();
        if indices.len() != shape.len() {
            return Err(RuntimeError::IndexOutOfBounds(format!(
                "expected {} indices, found {}",
                shape.len(),
                indices.len()
            )));
        }
        let mut slots = Vec::with_capacity(indices.len());
        for (dim, idx_expr) in indices.iter().enumerate() {
            slots.push(self.resolve_index_slot(env, idx_expr, shape[dim]).map_err(|d| d.error)?);
        }

        if slots.iter().all(|s| matches!(s, IndexSlot::Pos(_))) {
            let positions: Vec<usize> = slots
                .iter()
                .zip(shape.iter())
                .map(|(s, dim)| match s {
                    IndexSlot::Pos(p) => normalize(*p, *dim),
                    _ => unreachable!(),
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(RuntimeError::IndexOutOfBounds)?;
            let mut t = tensor.lock().unwrap();
            let off = t.offset(&positions).ok_or_else(|| RuntimeError::IndexOutOfBounds("index out of range".into()))?;
            t.check_elem(&value).map_err(RuntimeError::Type)?;
            t.data[off] = value;
            return Ok(());
        }

        // Broadcast fill across the selected sub-block.
        let mut ranges: Vec<Vec<usize>> = Vec::with_capacity(slots.len());
        for (slot, dim) in slots.iter().zip(shape.iter()) {
            let dim = *dim;
            let positions = match slot {
                IndexSlot::Pos(p) => vec![normalize(*p, dim).map_err(RuntimeError::IndexOutOfBounds)?],
                IndexSlot::Wildcard => (1..=dim).collect(),
                IndexSlot::Range(a, b) => {
                    let a = normalize(*a, dim).map_err(RuntimeError::IndexOutOfBounds)?;
                    let b = normalize(*b, dim).map_err(RuntimeError::IndexOutOfBounds)?;
                    if a <= b { (a..=b).collect() } else { (b..=a).rev().collect() }
                }
            };
            ranges.push(positions);
        }
        let mut t = tensor.lock().unwrap();
        t.check_elem(&value).map_err(RuntimeError::Type)?;
        let strides = t.strides();
        let mut cur = Vec::new();
        fill_cartesian(&ranges, &mut cur, &strides, &mut t.data, &value);
        Ok(())
    }

    fn assign_map_index(&self, env: &Environment, object: &Expr, key: &Expr, value: Value) -> Result<(), RuntimeError> {
        let obj = self.eval_expr(env, object).map_err(|d| d.error)?;
        let map = match &obj {
            Value::Map(m) => m,
            other => return Err(RuntimeError::Type(format!("expected MAP, found {}", other.type_tag()))),
        };
        let key_val = self.eval_expr(env, key).map_err(|d| d.error)?;
        let mapkey = MapKey::from_value(&key_val).map_err(RuntimeError::Type)?;
        map.lock().unwrap().insert(mapkey, value);
        Ok(())
    }
}

fn normalize(i: i64, dim: usize) -> Result<usize, String> {
    let resolved = if i < 0 { dim as i64 + i + 1 } else { i };
    if resolved < 1 || resolved as usize > dim {
        return Err(format!("index {} out of range for dimension of size {}", i, dim));
    }
    Ok(resolved as usize)
}

fn fill_cartesian(ranges: &[Vec<usize>], cur: &mut Vec<usize>, strides: &[usize], data: &mut [Value], value: &Value) {
    if cur.len() == ranges.len() {
        let off: usize = cur.iter().zip(strides.iter()).map(|(i, s)| (i - 1) * s).sum();
        data[off] = value.deep_clone();
        return;
    }
    let dim = cur.len();
    for &pos in &ranges[dim] {
        cur.push(pos);
        fill_cartesian(ranges, cur, strides, data, value);
        cur.pop();
    }
}
