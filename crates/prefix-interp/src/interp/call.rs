// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Call dispatch: function parameters take precedence over builtin names
//! (per the dispatch order), argument binding for user closures, and
//! writeback support for pointer-expression (`@name`) arguments.

use std::sync::Arc;

use prefix_ast::expr::{Arg, Expr, ExprKind};
use prefix_ast::Span;

use crate::env::{type_matches, Environment};
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::value::{Closure, Value};

use super::Interpreter;

impl Interpreter {
    pub(super) fn eval_call(
        &self,
        env: &Environment,
        callee: &Expr,
        args: &[Arg],
        span: Span,
    ) -> Result<Value, RuntimeDiagnostic> {
        let name = match &callee.kind {
            ExprKind::Ident(n) => n.clone(),
            _ => {
                let v = self.eval_expr(env, callee)?;
                return match v {
                    Value::Func(closure) => self.call_closure(env, &closure, args, span),
                    other => Err(RuntimeDiagnostic::new(
                        RuntimeError::Type(format!("{} is not callable", other.type_tag())),
                        span,
                    )),
                };
            }
        };

        if let Some(Value::Func(closure)) = env.get(&name) {
            return self.call_closure(env, &closure, args, span);
        }

        match self.builtin(&name).cloned() {
            Some(entry) => {
                if args.len() < entry.min_args || entry.max_args.is_some_and(|max| args.len() > max) {
                    let expected = match entry.max_args {
                        Some(max) if max == entry.min_args => format!("{}", max),
                        Some(max) => format!("{}..{}", entry.min_args, max),
                        None => format!("at least {}", entry.min_args),
                    };
                    return Err(RuntimeDiagnostic::new(
                        RuntimeError::ArityMismatch(name, expected, args.len()),
                        span,
                    ));
                }
                (entry.func)(self, env, args, span)
            }
            None => Err(RuntimeDiagnostic::new(RuntimeError::UnknownCallable(name), span)),
        }
    }

    /// Bind arguments to parameters (named first, then positional, then
    /// defaults evaluated against the closure's own captured environment)
    /// and execute the body, catching its `Return`.
    fn call_closure(
        &self,
        caller_env: &Environment,
        closure: &Arc<Closure>,
        args: &[Arg],
        span: Span,
    ) -> Result<Value, RuntimeDiagnostic> {
        let mut positional = Vec::new();
        let mut named: Vec<(String, Value)> = Vec::new();
        for arg in args {
            match arg {
                Arg::Positional(e) => positional.push(self.eval_expr(caller_env, e)?),
                Arg::Named(n, e) => named.push((n.clone(), self.eval_expr(caller_env, e)?)),
            }
        }

        let call_env = closure.env.child();
        let mut pos_iter = positional.into_iter();
        for param in &closure.params {
            let value = if let Some((_, v)) = named.iter().find(|(n, _)| n == &param.name) {
                v.clone()
            } else if let Some(v) = pos_iter.next() {
                v
            } else if let Some(default) = &param.default {
                self.eval_expr(&closure.env, default)?
            } else {
                return Err(RuntimeDiagnostic::new(
                    RuntimeError::ArityMismatch(
                        closure.name.clone().unwrap_or_else(|| "<anonymous>".into()),
                        format!("at least {}", param_min_count(&closure.params)),
                        args.len(),
                    ),
                    span,
                ));
            };
            if !type_matches(param.declared_type, &value) {
                return Err(RuntimeDiagnostic::new(
                    RuntimeError::Type(format!(
                        "argument for parameter '{}' must be {:?}, found {}",
                        param.name,
                        param.declared_type,
                        value.type_tag()
                    )),
                    span,
                ));
            }
            call_env.declare(&param.name, param.declared_type, value, true);
        }

        match self.exec_block(&call_env, &closure.body) {
            Ok(v) => Ok(v),
            Err(diag) => match diag.error {
                RuntimeError::Return(v) => Ok(v),
                _ => Err(diag),
            },
        }
    }

    /// If `expr` is a pointer expression `@name`, write `value` back into
    /// that binding in `env`. Used by arithmetic/mutating builtins whose
    /// first argument is a writeback target.
    pub(crate) fn maybe_writeback(
        &self,
        env: &Environment,
        expr: &Expr,
        value: &Value,
        span: Span,
    ) -> Result<(), RuntimeDiagnostic> {
        if let ExprKind::Ptr(name) = &expr.kind {
            env.assign(name, value.clone()).map_err(|e| RuntimeDiagnostic::new(e.into(), span))?;
        }
        Ok(())
    }

    /// Resolve the identifier a pointer-expression argument names, for
    /// builtins that need to read/write the binding themselves (e.g.
    /// `FREEZE(@x)`, `ALIAS(@x, @y)`).
    pub(crate) fn ptr_name<'a>(&self, expr: &'a Expr) -> Option<&'a str> {
        match &expr.kind {
            ExprKind::Ptr(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

fn param_min_count(params: &[prefix_ast::stmt::Param]) -> usize {
    params.iter().filter(|p| p.default.is_none()).count()
}
