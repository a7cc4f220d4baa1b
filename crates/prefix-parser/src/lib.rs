// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Parser for the Prefix language.
//!
//! Transforms a token stream into a statement sequence. Every operator is a
//! call, so there is no expression-precedence table here — only calls,
//! literals, and the bracket/angle postfix index forms.

mod hints;
mod parser;

pub use parser::{ParseError, ParseResult, Parser};

#[cfg(test)]
mod tests {
    use super::*;
    use prefix_ast::expr::ExprKind;
    use prefix_ast::stmt::StmtKind;

    fn parse(src: &str) -> ParseResult {
        let lex_result = prefix_lexer::Lexer::new(src).tokenize();
        assert!(lex_result.is_ok(), "lex errors: {:?}", lex_result.errors);
        Parser::new(lex_result.tokens).parse()
    }

    #[test]
    fn parse_typed_decl_and_call() {
        let result = parse(r#"x:INT=0 PRINT(x)"#);
        assert!(result.is_ok(), "parse errors: {:?}", result.errors);
        assert_eq!(result.stmts.len(), 2);
        assert!(matches!(result.stmts[0].kind, StmtKind::Assign { .. }));
        assert!(matches!(result.stmts[1].kind, StmtKind::Expr(_)));
    }

    #[test]
    fn parse_for_loop() {
        let result = parse("x:INT=0 FOR(i, 100) { x = ADD(x, 1) } PRINT(x)");
        assert!(result.is_ok(), "parse errors: {:?}", result.errors);
        assert!(matches!(result.stmts[1].kind, StmtKind::For { .. }));
    }

    #[test]
    fn parse_map_literal_and_index() {
        let result = parse(r#"m:MAP={"a":1,"b":10} PRINT(m<"b">)"#);
        assert!(result.is_ok(), "parse errors: {:?}", result.errors);
        if let StmtKind::Assign { value, .. } = &result.stmts[0].kind {
            assert!(matches!(value.kind, ExprKind::Map(_)));
        } else {
            panic!("expected assign");
        }
    }

    #[test]
    fn parse_tensor_index_with_range_and_wildcard() {
        let result = parse("t:TNS=[1,10,11] PRINT(TLEN(t[0..1, _],1))");
        assert!(result.is_ok(), "parse errors: {:?}", result.errors);
    }

    #[test]
    fn parse_try_catch() {
        let result = parse(r#"TRY { THROW("oops") } CATCH(SYMBOL: e) { PRINT(e) }"#);
        assert!(result.is_ok(), "parse errors: {:?}", result.errors);
        assert!(matches!(result.stmts[0].kind, StmtKind::Try { .. }));
    }

    #[test]
    fn parse_thr_and_await() {
        let result = parse("THR t { FOR(i,1111) { } } AWAIT(t) PRINT(\"done\")");
        assert!(result.is_ok(), "parse errors: {:?}", result.errors);
        assert!(matches!(result.stmts[0].kind, StmtKind::Thr { .. }));
    }

    #[test]
    fn parse_func_decl() {
        let result = parse("FUNC add(INT:a, INT:b) : INT { RETURN(ADD(a,b)) }");
        assert!(result.is_ok(), "parse errors: {:?}", result.errors);
        assert!(matches!(result.stmts[0].kind, StmtKind::Func(_)));
    }

    #[test]
    fn parse_if_elif_else() {
        let result = parse("IF(1) { PRINT(1) } ELIF(0) { PRINT(2) } ELSE { PRINT(3) }");
        assert!(result.is_ok(), "parse errors: {:?}", result.errors);
        if let StmtKind::If { branches, else_branch } = &result.stmts[0].kind {
            assert_eq!(branches.len(), 2);
            assert!(else_branch.is_some());
        } else {
            panic!("expected if");
        }
    }

    #[test]
    fn missing_closing_paren_reports_error() {
        let result = parse("PRINT(1");
        assert!(!result.is_ok());
    }

    #[test]
    fn pointer_expression() {
        let result = parse("READFILE(@dest, \"f.txt\")");
        assert!(result.is_ok(), "parse errors: {:?}", result.errors);
        if let StmtKind::Expr(e) = &result.stmts[0].kind {
            if let ExprKind::Call { args, .. } = &e.kind {
                assert!(matches!(args[0], prefix_ast::expr::Arg::Positional(ref a) if matches!(a.kind, ExprKind::Ptr(_))));
            } else {
                panic!("expected call");
            }
        } else {
            panic!("expected expr stmt");
        }
    }
}
