// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Full pipeline tests: lex -> parse -> execute, asserting on captured
//! stdout and on returned/thrown values. Exercises the scenarios named in
//! the language contract plus the aliasing/freezing and module-exposure
//! rules layered on top of it.

use prefix_interp::{Environment, Interpreter, RuntimeError};
use prefix_lexer::Lexer;
use prefix_parser::Parser;

/// Lex, parse, and run `source` against a fresh interpreter with captured
/// output, returning (captured stdout, exec result).
fn run(source: &str) -> (String, Result<prefix_interp::Value, RuntimeError>) {
    let lexed = Lexer::new(source).tokenize();
    assert!(lexed.is_ok(), "lex errors: {:?}", lexed.errors);
    let parsed = Parser::new(lexed.tokens).parse();
    assert!(parsed.is_ok(), "parse errors: {:?}", parsed.errors);
    let (interp, output) = Interpreter::with_captured_output();
    let env = Environment::root();
    let result = interp.exec_block(&env, &parsed.stmts).map_err(|d| d.error).map(|v| v);
    (output.lock().unwrap().clone(), result)
}

#[test]
fn print_add_uses_binary_literals_and_binary_display() {
    // 10 and 1 are binary literals (decimal 2 and 1); ADD -> 3 -> "11".
    let (out, result) = run("PRINT(ADD(10,1))");
    result.unwrap();
    assert_eq!(out.trim(), "11");
}

#[test]
fn tensor_literal_length_and_flip() {
    let (out, result) = run(
        r#"
        TNS: t = [1, 10, 11]
        PRINT(TLEN(t, 1))
        PRINT(TFLIP(t, 1))
        "#,
    );
    result.unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "11");
    assert_eq!(lines[1], "[11, 10, 1]");
}

#[test]
fn for_loop_counts_binary_literal_bound() {
    // FOR(i, 100): "100" is a binary literal for decimal 4, so the loop body
    // runs 4 times with i = 0, 1, 10, 11 (binary-displayed).
    let (out, result) = run(
        r#"
        FOR(i, 100) {
            PRINT(i)
        }
        "#,
    );
    result.unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines, vec!["0", "1", "10", "11"]);
}

#[test]
fn division_by_zero_is_a_runtime_error_not_a_panic() {
    let (_out, result) = run("PRINT(DIV(1,0))");
    assert!(matches!(result.unwrap_err(), RuntimeError::DivisionByZero));
}

#[test]
fn freeze_blocks_write_and_thaw_restores_it() {
    let (_out, result) = run(
        r#"
        INT: x = 1
        FREEZE(@x)
        x = 10
        "#,
    );
    assert!(matches!(result.unwrap_err(), RuntimeError::Frozen(n) if n == "x"));

    let (out, result) = run(
        r#"
        INT: x = 1
        FREEZE(@x)
        THAW(@x)
        x = 10
        PRINT(x)
        "#,
    );
    result.unwrap();
    assert_eq!(out.trim(), "1010");
}

#[test]
fn permafreeze_rejects_thaw() {
    let (_out, result) = run(
        r#"
        INT: x = 1
        PERMAFREEZE(@x)
        THAW(@x)
        "#,
    );
    assert!(matches!(result.unwrap_err(), RuntimeError::Permafrozen(n) if n == "x"));
}

#[test]
fn alias_shares_writes_between_names() {
    let (out, result) = run(
        r#"
        INT: a = 1
        INT: b = 0
        ALIAS(@b, @a)
        a = 1010
        PRINT(b)
        "#,
    );
    result.unwrap();
    assert_eq!(out.trim(), "1010");
}

#[test]
fn alias_onto_frozen_target_is_rejected() {
    let (_out, result) = run(
        r#"
        INT: a = 1
        FREEZE(@a)
        INT: b = 0
        ALIAS(@b, @a)
        "#,
    );
    assert!(matches!(result.unwrap_err(), RuntimeError::Frozen(n) if n == "a"));
}

#[test]
fn copy_is_shallow_and_deepcopy_is_independent() {
    let (out, result) = run(
        r#"
        TNS: t = [1, 1]
        TNS: shallow = COPY(t)
        TNS: deep = DEEPCOPY(t)
        t[1] = 1010
        PRINT(t)
        PRINT(shallow)
        PRINT(deep)
        "#,
    );
    result.unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "[1010, 1]");
    assert_eq!(lines[1], "[1010, 1]", "COPY must alias the same underlying tensor");
    assert_eq!(lines[2], "[1, 1]", "DEEPCOPY must be unaffected by later mutation of the source");
}

#[test]
fn try_catch_recovers_from_thrown_value() {
    let (out, result) = run(
        r#"
        TRY {
            THROW("boom")
        } CATCH(SYMBOL: e) {
            PRINT(e)
        }
        "#,
    );
    result.unwrap();
    assert_eq!(out.trim(), "boom");
}

#[test]
fn ser_unser_round_trips_int_as_binary_string() {
    let (out, result) = run(
        r#"
        STR: s = SER(1010)
        PRINT(s)
        PRINT(UNSER(s))
        "#,
    );
    result.unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[0].contains(r#""v":"1010""#), "expected binary-literal INT encoding, got {}", lines[0]);
    assert_eq!(lines[1], "1010");
}

#[test]
fn map_keys_preserve_insertion_order() {
    let (out, result) = run(
        r#"
        MAP: m = {"z": 1, "a": 2}
        PRINT(KEYS(m))
        "#,
    );
    result.unwrap();
    assert_eq!(out.trim(), "[z, a]");
}

#[test]
fn unknown_identifier_is_a_clean_error() {
    let (_out, result) = run("PRINT(nope)");
    assert!(matches!(result.unwrap_err(), RuntimeError::UnknownIdent(n) if n == "nope"));
}

#[test]
fn pointer_arg_writeback_sees_current_value_not_the_name() {
    // ADD(@x, 1) must write x+1 back into x, which means the ADD itself has
    // to read x's bound value through `@x`, not the literal string "x".
    let (out, result) = run(
        r#"
        INT: x = 1
        ADD(@x, 1)
        PRINT(x)
        "#,
    );
    result.unwrap();
    assert_eq!(out.trim(), "10");
}

#[test]
fn madd_is_a_shape_checked_tensor_kernel() {
    let (out, result) = run(
        r#"
        TNS: a = [1, 10]
        TNS: b = [1, 1]
        PRINT(MADD(a, b))
        "#,
    );
    result.unwrap();
    assert_eq!(out.trim(), "[10, 11]");
}

#[test]
fn madd_rejects_mismatched_shapes() {
    let (_out, result) = run(
        r#"
        TNS: a = [1, 10]
        TNS: b = [1, 1, 1]
        MADD(a, b)
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn try_catch_recovers_from_non_throw_runtime_error() {
    let (out, result) = run(
        r#"
        TRY {
            DIV(1, "x")
        } CATCH(SYMBOL: e) {
            PRINT(e)
        }
        "#,
    );
    result.unwrap();
    assert!(!out.trim().is_empty(), "expected the stringified error to reach the catch body");
}

#[test]
fn declared_type_mismatch_on_assignment_is_rejected() {
    let (_out, result) = run(
        r#"
        INT: x = 1
        x = "oops"
        "#,
    );
    assert!(result.is_err());
}
