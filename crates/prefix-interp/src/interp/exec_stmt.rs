// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Statement execution.

use std::sync::{Arc, Mutex};

use prefix_ast::stmt::{Stmt, StmtKind};
use prefix_ast::token::TypeTag;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::value::{PrefixMap, Tensor, Value};

use super::Interpreter;

/// The value a `TYPE: name` declaration without an initializer starts out
/// holding, before the binding is marked initialized=false so a premature
/// read is still caught.
fn zero_value(t: TypeTag) -> Value {
    match t {
        TypeTag::Int => Value::Int(0),
        TypeTag::Flt => Value::Flt(0.0),
        TypeTag::Str => Value::str(""),
        TypeTag::Tns => Value::Tns(Arc::new(Mutex::new(Tensor::new(vec![0], Vec::new())))),
        TypeTag::Map => Value::Map(Arc::new(Mutex::new(PrefixMap::new()))),
        TypeTag::Func | TypeTag::Thr | TypeTag::Unknown => Value::Null,
    }
}

impl Interpreter {
    pub fn exec_stmt(&self, env: &Environment, stmt: &Stmt) -> Result<Value, RuntimeDiagnostic> {
        match &stmt.kind {
            StmtKind::Block(body) => self.exec_block(env, body),

            StmtKind::Async(body) => {
                self.spawn_thread(env, body.clone());
                Ok(Value::Null)
            }

            StmtKind::Expr(expr) => self.eval_expr(env, expr),

            StmtKind::Decl { name, declared_type } => {
                env.declare(name, *declared_type, zero_value(*declared_type), false);
                Ok(Value::Null)
            }

            StmtKind::Assign { target, declared_type, value } => {
                let val = self.eval_expr(env, value)?;
                self.assign(env, target, *declared_type, val)
                    .map_err(|e| RuntimeDiagnostic::new(e, stmt.span))?;
                Ok(Value::Null)
            }

            StmtKind::If { branches, else_branch } => {
                for (cond, body) in branches {
                    if self.eval_expr(env, cond)?.is_truthy() {
                        return self.exec_block(&env.child(), body);
                    }
                }
                if let Some(body) = else_branch {
                    return self.exec_block(&env.child(), body);
                }
                Ok(Value::Null)
            }

            StmtKind::While { cond, body } => {
                loop {
                    if !self.eval_expr(env, cond)?.is_truthy() {
                        break;
                    }
                    match self.exec_block(&env.child(), body) {
                        Ok(_) => {}
                        Err(diag) => match diag.error {
                            RuntimeError::Break(v) => return Ok(v),
                            RuntimeError::Continue => continue,
                            _ => return Err(diag),
                        },
                    }
                }
                Ok(Value::Null)
            }

            StmtKind::For { binding, iter, body } => {
                let iter_val = self.eval_expr(env, iter)?;
                for item in self.iterate(&iter_val) {
                    let loop_env = env.child();
                    loop_env.declare(binding, TypeTag::Unknown, item, true);
                    match self.exec_block(&loop_env, body) {
                        Ok(_) => {}
                        Err(diag) => match diag.error {
                            RuntimeError::Break(v) => return Ok(v),
                            RuntimeError::Continue => continue,
                            _ => return Err(diag),
                        },
                    }
                }
                Ok(Value::Null)
            }

            StmtKind::Parfor { binding, iter, body } => {
                let iter_val = self.eval_expr(env, iter)?;
                let items = self.iterate(&iter_val);
                self.run_parfor(env, binding, &items, body, stmt.span)
            }

            StmtKind::Func(decl) => {
                let closure = Value::Func(Arc::new(crate::value::Closure {
                    name: Some(decl.name.clone()),
                    params: decl.params.clone(),
                    body: decl.body.clone(),
                    env: env.clone(),
                }));
                env.declare(&decl.name, TypeTag::Func, closure, true);
                Ok(Value::Null)
            }

            StmtKind::Return(expr) => {
                let v = match expr {
                    Some(e) => self.eval_expr(env, e)?,
                    None => Value::Null,
                };
                Err(RuntimeDiagnostic::new(RuntimeError::Return(v), stmt.span))
            }

            StmtKind::Break(expr) => {
                let v = match expr {
                    Some(e) => self.eval_expr(env, e)?,
                    None => Value::Null,
                };
                Err(RuntimeDiagnostic::new(RuntimeError::Break(v), stmt.span))
            }

            StmtKind::Continue => Err(RuntimeDiagnostic::new(RuntimeError::Continue, stmt.span)),

            StmtKind::Thr { name, body } => {
                let handle = self.spawn_thread(env, body.clone());
                env.declare(name, TypeTag::Thr, Value::Thr(handle), true);
                Ok(Value::Null)
            }

            StmtKind::Pop(name) => {
                env.remove(name);
                Ok(Value::Null)
            }

            StmtKind::Try { body, catch_name, catch_body } => match self.exec_block(&env.child(), body) {
                Ok(v) => Ok(v),
                Err(diag) => match diag.error {
                    // Control-flow signals are not errors and must keep
                    // unwinding past `Try` untouched. `StopRequested` is the
                    // same kind of unwind (cooperative worker cancellation),
                    // not a user-facing error, so it propagates too.
                    RuntimeError::Return(_)
                    | RuntimeError::Break(_)
                    | RuntimeError::Continue
                    | RuntimeError::Goto(_)
                    | RuntimeError::StopRequested => Err(diag),
                    RuntimeError::Throw(v) => {
                        let catch_env = env.child();
                        if let Some(name) = catch_name {
                            catch_env.declare(name, TypeTag::Str, v, true);
                        }
                        self.exec_block(&catch_env, catch_body)
                    }
                    ref err => {
                        let catch_env = env.child();
                        if let Some(name) = catch_name {
                            catch_env.declare(name, TypeTag::Str, Value::str(err.to_string()), true);
                        }
                        self.exec_block(&catch_env, catch_body)
                    }
                },
            },

            StmtKind::Goto(label_expr) => {
                let label = self.eval_expr(env, label_expr)?;
                Err(RuntimeDiagnostic::new(RuntimeError::Goto(label), stmt.span))
            }

            StmtKind::Gotopoint(_) => Ok(Value::Null),
        }
    }

    /// Expand a value into the sequence `FOR`/`PARFOR` walk over: tensor
    /// elements in row-major order, map values in insertion order, or the
    /// repeated count when given a plain integer (`FOR(i, 100)`).
    pub(super) fn iterate(&self, v: &Value) -> Vec<Value> {
        match v {
            Value::Int(n) => (0..*n).map(Value::Int).collect(),
            Value::Tns(t) => t.lock().unwrap().data.clone(),
            Value::Map(m) => m.lock().unwrap().values().cloned().collect(),
            other => vec![other.clone()],
        }
    }
}
