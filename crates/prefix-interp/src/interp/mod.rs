// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The interpreter implementation.
//!
//! This is a tree-walk interpreter that directly evaluates the AST. All
//! mutable interpreter-wide state lives behind `Arc<Mutex<..>>` in
//! `SharedState` so an `Interpreter` handle can be cloned cheaply and moved
//! into a spawned `THR`/`PARFOR` worker thread.

mod assign;
mod call;
mod concurrency;
mod eval_expr;
mod exec_stmt;
mod modules;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::builtins::{self, BuiltinEntry};
use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::value::Value;

struct SharedState {
    builtins: HashMap<String, BuiltinEntry>,
    /// Loaded-module cache, keyed by canonical filesystem path, so the same
    /// file is never re-executed by a second `IMPORT`.
    module_cache: Mutex<HashMap<PathBuf, Environment>>,
    /// Last module `Environment` bound to each import alias, so `EXPORT`
    /// can find the module's own environment from the alias a caller names
    /// (`EXPORT` only ever sees the alias, never the canonical path).
    alias_envs: Mutex<HashMap<String, Environment>>,
    /// Directory `IMPORT`/`IMPORT_PATH` resolve relative paths against —
    /// the running script's own directory.
    script_dir: Mutex<PathBuf>,
    /// Nesting depth of `SHUSH`/`UNSHUSH`; output is suppressed while > 0.
    silence_depth: AtomicUsize,
    /// Captured stdout, used by the CLI normally (`None`) and by tests
    /// (`Some`) that want to assert on printed output.
    output: Option<Arc<Mutex<String>>>,
    verbose: bool,
}

/// The tree-walk interpreter. Cheap to clone — clones share all state.
#[derive(Clone)]
pub struct Interpreter {
    shared: Arc<SharedState>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::build(PathBuf::from("."), false, None)
    }

    pub fn with_verbose(verbose: bool) -> Self {
        Self::build(PathBuf::from("."), verbose, None)
    }

    pub fn with_script_dir(dir: PathBuf, verbose: bool) -> Self {
        Self::build(dir, verbose, None)
    }

    /// Construct an interpreter whose `PRINT`/`THROW` output is captured
    /// into a string instead of going to stdout/stderr — used by tests.
    pub fn with_captured_output() -> (Self, Arc<Mutex<String>>) {
        let buf = Arc::new(Mutex::new(String::new()));
        (Self::build(PathBuf::from("."), false, Some(buf.clone())), buf)
    }

    fn build(script_dir: PathBuf, verbose: bool, output: Option<Arc<Mutex<String>>>) -> Self {
        Self {
            shared: Arc::new(SharedState {
                builtins: builtins::register_all(),
                module_cache: Mutex::new(HashMap::new()),
                alias_envs: Mutex::new(HashMap::new()),
                script_dir: Mutex::new(script_dir),
                silence_depth: AtomicUsize::new(0),
                output,
                verbose,
            }),
        }
    }

    pub fn verbose(&self) -> bool {
        self.shared.verbose
    }

    pub fn script_dir(&self) -> PathBuf {
        self.shared.script_dir.lock().unwrap().clone()
    }

    pub fn set_script_dir(&self, dir: PathBuf) {
        *self.shared.script_dir.lock().unwrap() = dir;
    }

    pub fn module_cache_get(&self, path: &std::path::Path) -> Option<Environment> {
        self.shared.module_cache.lock().unwrap().get(path).cloned()
    }

    pub fn module_cache_insert(&self, path: PathBuf, env: Environment) {
        self.shared.module_cache.lock().unwrap().insert(path, env);
    }

    pub fn alias_env_get(&self, alias: &str) -> Option<Environment> {
        self.shared.alias_envs.lock().unwrap().get(alias).cloned()
    }

    pub fn alias_env_insert(&self, alias: String, env: Environment) {
        self.shared.alias_envs.lock().unwrap().insert(alias, env);
    }

    pub fn builtin(&self, name: &str) -> Option<&BuiltinEntry> {
        self.shared.builtins.get(name)
    }

    pub fn shush(&self) {
        self.shared.silence_depth.fetch_add(1, Ordering::SeqCst);
    }

    pub fn unshush(&self) {
        let _ = self.shared.silence_depth.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| {
            Some(d.saturating_sub(1))
        });
    }

    pub fn is_silenced(&self) -> bool {
        self.shared.silence_depth.load(Ordering::SeqCst) > 0
    }

    /// Write a line of program output, honoring `SHUSH`.
    pub fn emit(&self, line: &str) {
        if self.is_silenced() {
            return;
        }
        match &self.shared.output {
            Some(buf) => {
                let mut buf = buf.lock().unwrap();
                buf.push_str(line);
                buf.push('\n');
            }
            None => println!("{}", line),
        }
    }

    /// Run a full program: a fresh root environment, executed top to
    /// bottom. Uncaught `Throw`/control-flow leaks are reported as errors.
    pub fn run(&self, stmts: &[prefix_ast::stmt::Stmt]) -> Result<(), RuntimeDiagnostic> {
        let env = Environment::root();
        match self.exec_block(&env, stmts) {
            Ok(_) => Ok(()),
            Err(diag) => Err(diag),
        }
    }

    /// Execute a statement sequence, honoring `GOTO`/`GOTOPOINT` targets
    /// scoped to this sequence: a `Goto` unwind is caught here, the target
    /// `Gotopoint` is located by evaluated label, and execution resumes
    /// just after it; if not found here, the unwind re-propagates to the
    /// caller's enclosing block.
    pub fn exec_block(&self, env: &Environment, stmts: &[prefix_ast::stmt::Stmt]) -> Result<Value, RuntimeDiagnostic> {
        let mut i = 0;
        let mut last = Value::Null;
        while i < stmts.len() {
            match self.exec_stmt(env, &stmts[i]) {
                Ok(v) => {
                    last = v;
                    i += 1;
                }
                Err(diag) => {
                    if let RuntimeError::Goto(label) = &diag.error {
                        if let Some(target) = self.find_gotopoint(env, stmts, label)? {
                            i = target + 1;
                            continue;
                        }
                    }
                    return Err(diag);
                }
            }
        }
        Ok(last)
    }

    fn find_gotopoint(
        &self,
        env: &Environment,
        stmts: &[prefix_ast::stmt::Stmt],
        label: &Value,
    ) -> Result<Option<usize>, RuntimeDiagnostic> {
        use prefix_ast::stmt::StmtKind;
        for (idx, stmt) in stmts.iter().enumerate() {
            if let StmtKind::Gotopoint(expr) = &stmt.kind {
                let here = self.eval_expr(env, expr)?;
                if values_equal(&here, label) {
                    return Ok(Some(idx));
                }
            }
        }
        Ok(None)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Structural equality used by `GOTO` label matching and `==`-flavored
/// builtins. `Func`/`Thr` compare by identity; tensors/maps by contents.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Int(x), Value::Flt(y)) | (Value::Flt(y), Value::Int(x)) => *x as f64 == *y,
        (Value::Flt(x), Value::Flt(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => *x.lock().unwrap() == *y.lock().unwrap(),
        (Value::Tns(x), Value::Tns(y)) => {
            let x = x.lock().unwrap();
            let y = y.lock().unwrap();
            x.shape == y.shape && x.data.iter().zip(y.data.iter()).all(|(a, b)| values_equal(a, b))
        }
        (Value::Map(x), Value::Map(y)) => {
            let x = x.lock().unwrap();
            let y = y.lock().unwrap();
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).map(|v2| values_equal(v, v2)).unwrap_or(false))
        }
        (Value::Func(x), Value::Func(y)) => Arc::ptr_eq(x, y),
        (Value::Thr(x), Value::Thr(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}
