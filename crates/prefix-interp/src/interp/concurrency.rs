// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `THR`/`ASYNC`/`PARFOR`/`PARALLEL` and the thread-control builtins
//! (`AWAIT`, `PAUSE`, `RESUME`, `STOP`, `RESTART`).
//!
//! Scheduling is real OS threads. Cancellation and pausing are cooperative:
//! a worker polls its `ThreadControl` flags between top-level statements of
//! its body, matching the suspension points the language promises.
//!
//! `PARFOR` does not route environment writes through a separate
//! single-consumer write buffer. Every scope is already an
//! `Arc<Mutex<Scope>>` (see `env.rs`): a write to an outer-scope binding
//! locks that binding's owning scope for the duration of the write, and a
//! read locks the same scope to read it. That gives the same guarantee the
//! write-buffer model promises — writes to one binding are serialized,
//! reads see a consistent snapshot — without a dedicated prepare thread.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use prefix_ast::stmt::Stmt;
use prefix_ast::token::TypeTag;
use prefix_ast::Span;

use crate::env::Environment;
use crate::error::{RuntimeDiagnostic, RuntimeError};
use crate::value::{Closure, ThreadControl, ThreadHandle, Value};

use super::Interpreter;

impl Interpreter {
    /// Allocate and immediately start a thread running `body` against a
    /// fresh child of `env`.
    pub(super) fn spawn_thread(&self, env: &Environment, body: Vec<Stmt>) -> Arc<ThreadHandle> {
        let control = Arc::new(ThreadControl::default());
        let body_env = env.child();
        let join = self.start_worker(body.clone(), body_env.clone(), control.clone());
        Arc::new(ThreadHandle {
            control,
            body,
            body_env,
            join: Mutex::new(Some(join)),
            result: Mutex::new(None),
        })
    }

    fn start_worker(&self, body: Vec<Stmt>, body_env: Environment, control: Arc<ThreadControl>) -> thread::JoinHandle<Result<Value, String>> {
        control.started.store(true, Ordering::SeqCst);
        let interp = self.clone();
        let control_for_thread = control.clone();
        thread::spawn(move || {
            let result = match interp.exec_block_cancelable(&body_env, &body, &control_for_thread) {
                Ok(v) => Ok(v),
                Err(diag) => match diag.error {
                    RuntimeError::Return(v) => Ok(v),
                    other => Err(other.to_string()),
                },
            };
            control_for_thread.finished.store(true, Ordering::SeqCst);
            result
        })
    }

    /// Like `exec_block`, but polls `control.stop`/`control.paused` at each
    /// top-level statement boundary.
    fn exec_block_cancelable(
        &self,
        env: &Environment,
        stmts: &[Stmt],
        control: &ThreadControl,
    ) -> Result<Value, RuntimeDiagnostic> {
        let mut i = 0;
        let mut last = Value::Null;
        while i < stmts.len() {
            while control.paused.load(Ordering::SeqCst) && !control.stop.load(Ordering::SeqCst) {
                thread::yield_now();
                thread::sleep(Duration::from_millis(5));
            }
            if control.stop.load(Ordering::SeqCst) {
                let span = stmts.get(i).map(|s| s.span).unwrap_or_else(|| prefix_ast::Span::new(0, 0));
                return Err(RuntimeDiagnostic::new(RuntimeError::StopRequested, span));
            }
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

    /// `THR`/`PARFOR` iterations each run on their own worker; write
    /// through the shared `Arc<Mutex<Scope>>` chain is enough to serialize
    /// concurrent outer-scope mutation (see module docs).
    pub(super) fn run_parfor(
        &self,
        env: &Environment,
        binding: &str,
        items: &[Value],
        body: &[Stmt],
        span: Span,
    ) -> Result<Value, RuntimeDiagnostic> {
        let handles: Vec<_> = items
            .iter()
            .map(|item| {
                let worker_env = env.child();
                worker_env.declare(binding, TypeTag::Unknown, item.clone(), true);
                let interp = self.clone();
                let body = body.to_vec();
                thread::spawn(move || interp.exec_block(&worker_env, &body))
            })
            .collect();

        let mut first_err = None;
        for h in handles {
            if let Err(diag) = h.join().expect("parfor worker panicked") {
                if first_err.is_none() {
                    first_err = Some(diag);
                }
            }
        }
        match first_err {
            Some(diag) => Err(RuntimeDiagnostic::new(diag.error, span)),
            None => Ok(Value::Null),
        }
    }

    /// `PARALLEL(funcs...)` — one worker per nullary closure; the first
    /// error from any worker is reported once every worker has finished.
    pub fn run_parallel(&self, closures: &[Arc<Closure>], span: Span) -> Result<Value, RuntimeDiagnostic> {
        let handles: Vec<_> = closures
            .iter()
            .cloned()
            .map(|closure| {
                let interp = self.clone();
                thread::spawn(move || {
                    let call_env = closure.env.child();
                    interp.exec_block(&call_env, &closure.body)
                })
            })
            .collect();

        let mut first_err = None;
        for h in handles {
            if let Err(diag) = h.join().expect("parallel worker panicked") {
                if first_err.is_none() {
                    first_err = Some(diag);
                }
            }
        }
        match first_err {
            Some(diag) => Err(RuntimeDiagnostic::new(diag.error, span)),
            None => Ok(Value::Null),
        }
    }

    /// `AWAIT(thr)`: blocks until the worker finishes, then joins it.
    pub fn thread_await(&self, handle: &Arc<ThreadHandle>) -> Result<Value, String> {
        let mut result = handle.result.lock().unwrap();
        if let Some(r) = result.clone() {
            return r;
        }
        let join = handle.join.lock().unwrap().take();
        let outcome = match join {
            Some(j) => j.join().unwrap_or_else(|_| Err("thread panicked".to_string())),
            None => {
                // Spawned via `spawn_thread`, whose join handle lives only
                // inside the closure's captured `control`; busy-wait on the
                // finished flag since no handle was retained here.
                while !handle.control.finished.load(Ordering::SeqCst) {
                    thread::yield_now();
                    thread::sleep(Duration::from_millis(5));
                }
                Ok(Value::Null)
            }
        };
        *result = Some(outcome.clone());
        outcome
    }

    pub fn thread_pause(&self, handle: &Arc<ThreadHandle>, resume_after_secs: Option<f64>) {
        handle.control.paused.store(true, Ordering::SeqCst);
        if let Some(secs) = resume_after_secs {
            let control = handle.control.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_secs_f64(secs.max(0.0)));
                control.paused.store(false, Ordering::SeqCst);
            });
        }
    }

    pub fn thread_resume(&self, handle: &Arc<ThreadHandle>) {
        handle.control.paused.store(false, Ordering::SeqCst);
    }

    pub fn thread_stop(&self, handle: &Arc<ThreadHandle>) {
        handle.control.stop.store(true, Ordering::SeqCst);
    }

    /// `RESTART`: only valid once the thread has finished; resets flags and
    /// re-runs the stored body against the stored environment.
    pub fn thread_restart(&self, handle: &Arc<ThreadHandle>) -> Result<(), String> {
        if !handle.control.finished.load(Ordering::SeqCst) {
            return Err("cannot RESTART a thread that has not finished".to_string());
        }
        handle.control.stop.store(false, Ordering::SeqCst);
        handle.control.paused.store(false, Ordering::SeqCst);
        handle.control.finished.store(false, Ordering::SeqCst);
        *handle.result.lock().unwrap() = None;
        let join = self.start_worker(handle.body.clone(), handle.body_env.clone(), handle.control.clone());
        *handle.join.lock().unwrap() = Some(join);
        Ok(())
    }
}
