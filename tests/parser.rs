#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use rox::ast::{Expr, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::error::LoxError;
    use rox::parser::Parser;
    use rox::scanner::Scanner;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
        let (tokens, errors) = Scanner::new(source.as_bytes()).scan_all();
        assert!(errors.is_empty(), "unexpected lexical errors: {:?}", errors);

        Parser::new(tokens).parse()
    }

    fn printed(source: &str) -> Vec<String> {
        parse(source)
            .expect("source should parse")
            .iter()
            .map(AstPrinter::print_stmt)
            .collect()
    }

    fn error_messages(source: &str) -> Vec<String> {
        parse(source)
            .expect_err("source should not parse")
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[rstest]
    #[case("print 1 + 2 * 3;", "(print (+ 1.0 (* 2.0 3.0)))")]
    #[case("print (1 + 2) * 3;", "(print (* (group (+ 1.0 2.0)) 3.0))")]
    #[case("print -x == !y;", "(print (== (- x) (! y)))")]
    #[case("a or b and c;", "(; (or a (and b c)))")]
    #[case("a = b = 3;", "(; (= a (= b 3.0)))")]
    #[case("obj.field = 1;", "(; (= (. obj field) 1.0))")]
    #[case("f(1, 2)(3);", "(; (call (call f 1.0 2.0) 3.0))")]
    #[case("print \"hi\";", "(print hi)")]
    #[case("1 >= 2 != nil;", "(; (!= (>= 1.0 2.0) nil))")]
    fn test_expression_precedence(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(printed(source), vec![expected.to_string()]);
    }

    #[test]
    fn test_comma_expression_statement() {
        assert_eq!(printed("1, 2, 3;"), vec!["(; (, 1.0 2.0 3.0))".to_string()]);
    }

    #[test]
    fn test_commas_in_arguments_separate_items() {
        let statements = parse("f(1, 2);").expect("parses");

        match &statements[0] {
            Stmt::Expression(Expr::Call { arguments, .. }) => assert_eq!(arguments.len(), 2),
            other => panic!("expected call statement, got {:?}", other),
        }
    }

    #[test]
    fn test_grouped_comma_is_one_argument() {
        let statements = parse("f((1, 2));").expect("parses");

        match &statements[0] {
            Stmt::Expression(Expr::Call { arguments, .. }) => {
                assert_eq!(arguments.len(), 1);
                assert_eq!(AstPrinter::print(&arguments[0]), "(group (, 1.0 2.0))");
            }
            other => panic!("expected call statement, got {:?}", other),
        }
    }

    #[test]
    fn test_var_declarations() {
        assert_eq!(
            printed("var a; var b = 1; var c = 1, d, e = c;"),
            vec![
                "(var a)".to_string(),
                "(var b = 1.0)".to_string(),
                "(var-list (var c = 1.0) (var d) (var e = c))".to_string(),
            ]
        );

        let statements = parse("var x = 1, y = 2;").expect("parses");
        assert!(matches!(&statements[0], Stmt::VarList(items) if items.len() == 2));
    }

    #[test]
    fn test_for_loop_is_desugared() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec![
                "(block (var i = 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_empty_for_clauses() {
        assert_eq!(
            printed("for (;;) print 1;"),
            vec!["(while true (print 1.0))".to_string()]
        );
    }

    #[test]
    fn test_class_and_function_declarations() {
        assert_eq!(
            printed("class B < A { init(x) { this.x = x; } get() { return super.get(); } }"),
            vec![
                "(class B < A (fun init (x) (; (= (. this x) x))) (fun get () (return (call (super get)))))"
                    .to_string()
            ]
        );

        assert_eq!(
            printed("fun add(a, b) { return a + b; } fun noop() { return; }"),
            vec![
                "(fun add (a b) (return (+ a b)))".to_string(),
                "(fun noop () (return))".to_string(),
            ]
        );
    }

    #[test]
    fn test_if_else_and_while() {
        assert_eq!(
            printed("if (a) print 1; else { print 2; } while (b) b = false;"),
            vec![
                "(if a (print 1.0) (block (print 2.0)))".to_string(),
                "(while b (; (= b false)))".to_string(),
            ]
        );
    }

    #[test]
    fn test_reports_every_statement_error() {
        assert_eq!(
            error_messages("var = 1;\nprint 2\nprint 3;\nprint 4;"),
            vec![
                "[line 1] Error at '=': Expect variable name.".to_string(),
                "[line 3] Error at 'print': Expect ';' after value.".to_string(),
            ]
        );
    }

    #[test]
    fn test_error_at_end() {
        assert_eq!(
            error_messages("print 1"),
            vec!["[line 1] Error at end: Expect ';' after value.".to_string()]
        );
    }

    #[rstest]
    #[case("1 = 2;", "[line 1] Error at '=': Invalid assignment target.")]
    #[case("a + b = c;", "[line 1] Error at '=': Invalid assignment target.")]
    #[case("(a) = 3;", "[line 1] Error at '=': Invalid assignment target.")]
    fn test_invalid_assignment_target(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(error_messages(source), vec![expected.to_string()]);
    }

    #[test]
    fn test_invalid_target_does_not_stop_parsing() {
        assert_eq!(
            error_messages("1 = 2; print ;"),
            vec![
                "[line 1] Error at '=': Invalid assignment target.".to_string(),
                "[line 1] Error at ';': Expect expression.".to_string(),
            ]
        );
    }

    #[test]
    fn test_too_many_parameters() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{}}", params.join(", "));

        let errors = error_messages(&source);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("Can't have more than 255 parameters."));
    }

    #[test]
    fn test_too_many_arguments() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));

        let errors = error_messages(&source);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("Can't have more than 255 arguments."));
    }

    #[test]
    fn test_super_requires_method_name() {
        assert_eq!(
            error_messages("super;"),
            vec!["[line 1] Error at ';': Expect '.' after 'super'.".to_string()]
        );
    }

    #[test]
    fn test_json_dump_tags_nodes() {
        let statements = parse("print 1;").expect("parses");
        let json = serde_json::to_value(&statements).expect("serializes");

        assert!(json.is_array());
        assert!(json[0].get("Print").is_some());
    }
}
