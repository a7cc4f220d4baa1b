// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The interactive REPL: accumulates input lines until braces balance and
//! no trailing continuation marker (`\`) is present, then lexes, parses,
//! and executes the accumulated chunk against a persistent environment.
//! `.exit` terminates the session.

use std::io::{self, BufRead, Write};

use colored::Colorize;
use prefix_ast::LineMap;
use prefix_interp::{Environment, Interpreter};
use prefix_lexer::Lexer;
use prefix_parser::Parser;

use crate::output;

pub fn run(interp: &Interpreter) {
    let env = Environment::root();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut buffer = String::new();

    loop {
        if buffer.is_empty() {
            print!("{} ", output::prompt());
        } else {
            print!("{} ", output::continuation_prompt());
        }
        io::stdout().flush().ok();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(_)) | None => break,
        };

        if buffer.is_empty() && line.trim() == ".exit" {
            break;
        }

        buffer.push_str(&line);
        buffer.push('\n');

        if !ready_to_execute(&buffer) {
            continue;
        }

        let chunk = std::mem::take(&mut buffer);
        execute_chunk(interp, &env, &chunk);
    }
}

/// A chunk is ready once its braces balance and the last non-blank line
/// doesn't end in the continuation marker `\`.
fn ready_to_execute(buffer: &str) -> bool {
    let balance: i64 = buffer.chars().fold(0i64, |acc, c| match c {
        '{' => acc + 1,
        '}' => acc - 1,
        _ => acc,
    });
    if balance > 0 {
        return false;
    }
    let last_nonblank = buffer.lines().rev().find(|l| !l.trim().is_empty());
    !matches!(last_nonblank, Some(l) if l.trim_end().ends_with('\\'))
}

fn execute_chunk(interp: &Interpreter, env: &Environment, source: &str) {
    let lexed = Lexer::new(source).tokenize();
    if !lexed.is_ok() {
        let map = LineMap::new(source);
        for err in &lexed.errors {
            let (line, col) = map.offset_to_line_col(err.span.start);
            eprintln!("{}: {} at {}:{}", output::error_label(), err.message, line, col);
        }
        return;
    }
    let parsed = Parser::new(lexed.tokens).parse();
    if !parsed.is_ok() {
        let map = LineMap::new(source);
        for err in &parsed.errors {
            let (line, col) = map.offset_to_line_col(err.span.start);
            eprintln!("{}: {} at {}:{}", output::error_label(), err.message, line, col);
        }
        return;
    }
    match interp.exec_block(env, &parsed.stmts) {
        Ok(value) => {
            if !matches!(value, prefix_interp::Value::Null) {
                println!("{}", value);
            }
        }
        Err(diag) if diag.error.is_control_flow() => {
            // A bare RETURN/BREAK/etc. at REPL top level has nowhere to
            // unwind to; treat it as a no-op result rather than an error.
        }
        Err(diag) => {
            let map = LineMap::new(source);
            let (line, col) = map.offset_to_line_col(diag.span.start);
            eprintln!("{}: {} at {}:{}", output::error_label(), diag.error, line, col);
        }
    }
}
