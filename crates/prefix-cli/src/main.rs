// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Prefix CLI — script runner and REPL.
//!
//! Accepts an optional script path, `-verbose`, and any mix of
//! `.dll`/`.so`/`.dylib`/`.prex` extension arguments. Native extension
//! loading itself is outside this evaluator's scope (see `prefix-interp`);
//! the CLI only recognizes the arguments and, under `-verbose`, notes that
//! it saw them.

mod output;
mod repl;

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use prefix_ast::LineMap;
use prefix_interp::{Environment, Interpreter, RuntimeError};
use prefix_lexer::Lexer;
use prefix_parser::Parser;

const EXIT_OK: i32 = 0;
const EXIT_IO: i32 = 1;
const EXIT_MEMORY: i32 = 2;
const EXIT_SYNTAX: i32 = 3;
const EXIT_RUNTIME: i32 = 4;

fn is_extension_arg(arg: &str) -> bool {
    let lower = arg.to_ascii_lowercase();
    lower.ends_with(".dll") || lower.ends_with(".so") || lower.ends_with(".dylib") || lower.ends_with(".prex")
}

fn main() {
    output::init();
    let args: Vec<String> = env::args().skip(1).collect();

    let verbose = args.iter().any(|a| a == "-verbose");
    let extensions: Vec<&String> = args.iter().filter(|a| is_extension_arg(a)).collect();
    let script = args.iter().find(|a| *a != "-verbose" && !is_extension_arg(a));

    if verbose {
        for ext in &extensions {
            eprintln!("{}: extension argument '{}' recognized (native loading is host-managed)", output::trace_label(), ext);
        }
    }

    match script {
        Some(path) => run_script(path, verbose),
        None => {
            println!("{} {}", output::title("prefix"), output::version(env!("CARGO_PKG_VERSION")));
            println!("Type {} to leave.", output::arg(".exit"));
            let interp = Interpreter::with_script_dir(env::current_dir().unwrap_or_else(|_| PathBuf::from(".")), verbose);
            repl::run(&interp);
        }
    }
}

fn run_script(path: &str, verbose: bool) {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: reading {}: {}", output::error_label(), output::file_path(path), e);
            process::exit(EXIT_IO);
        }
    };
    let source = source.strip_prefix('\u{feff}').unwrap_or(&source).to_string();

    let script_path = Path::new(path);
    let script_dir = script_path.parent().filter(|p| !p.as_os_str().is_empty()).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    if env::set_current_dir(&script_dir).is_err() && verbose {
        eprintln!("{}: could not change working directory to {}", output::warn_label(), script_dir.display());
    }

    let map = LineMap::new(&source);

    let lexed = Lexer::new(&source).tokenize();
    if !lexed.is_ok() {
        for err in &lexed.errors {
            let (line, col) = map.offset_to_line_col(err.span.start);
            eprintln!("{}: {} at {}:{}", output::error_label(), err.message, line, col);
        }
        process::exit(EXIT_SYNTAX);
    }

    let parsed = Parser::new(lexed.tokens).parse();
    if !parsed.is_ok() {
        for err in &parsed.errors {
            let (line, col) = map.offset_to_line_col(err.span.start);
            eprintln!("{}: {} at {}:{}", output::error_label(), err.message, line, col);
        }
        process::exit(EXIT_SYNTAX);
    }

    let interp = Interpreter::with_script_dir(PathBuf::from("."), verbose);
    let env_root = Environment::root();
    match interp.exec_block(&env_root, &parsed.stmts) {
        Ok(_) => process::exit(EXIT_OK),
        Err(diag) => {
            let (line, col) = map.offset_to_line_col(diag.span.start);
            eprintln!("{}: {} at {}:{}", output::error_label(), diag.error, line, col);
            process::exit(exit_code_for(&diag.error));
        }
    }
}

/// Maps a runtime error to the IO/memory/syntax/runtime exit categories
/// named in the language contract. `AliasCycle` is the one failure mode in
/// this evaluator shaped like a resource-exhaustion bug (an unbounded
/// redirect chain) so it is classified under "memory" rather than generic
/// "runtime".
fn exit_code_for(err: &RuntimeError) -> i32 {
    match err {
        RuntimeError::Io(_) | RuntimeError::Module(_) => EXIT_IO,
        RuntimeError::AliasCycle(_) => EXIT_MEMORY,
        _ => EXIT_RUNTIME,
    }
}
