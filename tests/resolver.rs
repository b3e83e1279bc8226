#[cfg(test)]
mod resolver_tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use rox::ast::{Expr, Stmt};
    use rox::parser::Parser;
    use rox::resolver::{Locals, Resolver};
    use rox::scanner::Scanner;

    fn parse(source: &str) -> Vec<Stmt> {
        let (tokens, errors) = Scanner::new(source.as_bytes()).scan_all();
        assert!(errors.is_empty(), "unexpected lexical errors: {:?}", errors);

        Parser::new(tokens).parse().expect("source should parse")
    }

    fn resolve(source: &str) -> Result<Locals, Vec<String>> {
        Resolver::new()
            .resolve(&parse(source))
            .map_err(|errors| errors.iter().map(ToString::to_string).collect())
    }

    /// The single `print <expr>;` statement nested anywhere in `statements`.
    fn find_print(statements: &[Stmt]) -> Option<&Expr> {
        statements.iter().find_map(|stmt| match stmt {
            Stmt::Print(expr) => Some(expr),
            Stmt::Block(inner) => find_print(inner),
            Stmt::Function(function) => find_print(&function.body),
            _ => None,
        })
    }

    #[test]
    fn test_local_distances() {
        let statements = parse("{ var a = 1; { var b = 2; { print a; } } }");
        let locals = Resolver::new().resolve(&statements).expect("resolves");

        match find_print(&statements) {
            Some(Expr::Variable(variable)) => assert_eq!(locals.get(&variable.id), Some(&2)),
            other => panic!("expected variable in print, got {:?}", other),
        }
    }

    #[test]
    fn test_globals_stay_out_of_the_table() {
        let statements = parse("var a = 1; fun f() { print a; }");
        let locals = Resolver::new().resolve(&statements).expect("resolves");

        match find_print(&statements) {
            Some(Expr::Variable(variable)) => assert_eq!(locals.get(&variable.id), None),
            other => panic!("expected variable in print, got {:?}", other),
        }
    }

    #[test]
    fn test_parameters_share_the_body_scope() {
        let statements = parse("fun f(x) { print x; }");
        let locals = Resolver::new().resolve(&statements).expect("resolves");

        match find_print(&statements) {
            Some(Expr::Variable(variable)) => assert_eq!(locals.get(&variable.id), Some(&0)),
            other => panic!("expected variable in print, got {:?}", other),
        }
    }

    #[test]
    fn test_resolving_twice_gives_the_same_table() {
        let statements = parse(
            "fun counter() { var n = 0; fun inc() { n = n + 1; return n; } return inc; }
             class A { m() { return this; } }
             class B < A { m() { return super.m(); } }",
        );

        let first = Resolver::new().resolve(&statements).expect("resolves");
        let second = Resolver::new().resolve(&statements).expect("resolves");

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[rstest]
    #[case(
        "var a = a;",
        "[line 1] Error at 'a': Can't read local variable in its own initializer."
    )]
    #[case(
        "{ var a = 1; { var a = a; } }",
        "[line 1] Error at 'a': Can't read local variable in its own initializer."
    )]
    #[case(
        "{ var a = 1; var a = 2; }",
        "[line 1] Error at 'a': Already a variable with this name in this scope."
    )]
    #[case(
        "fun f(a, a) {}",
        "[line 1] Error at 'a': Already a variable with this name in this scope."
    )]
    #[case("return 1;", "[line 1] Error at 'return': Can't return from top-level code.")]
    #[case(
        "class A { init() { return 1; } }",
        "[line 1] Error at 'return': Can't return a value from an initializer."
    )]
    #[case("print this;", "[line 1] Error at 'this': Can't use 'this' outside of a class.")]
    #[case(
        "fun f() { return this; }",
        "[line 1] Error at 'this': Can't use 'this' outside of a class."
    )]
    #[case(
        "print super.m;",
        "[line 1] Error at 'super': Can't use 'super' outside of a class."
    )]
    #[case(
        "class A { m() { super.m(); } }",
        "[line 1] Error at 'super': Can't use 'super' in a class with no superclass."
    )]
    #[case("class A < A {}", "[line 1] Error at 'A': A class can't inherit from itself.")]
    fn test_static_errors(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(resolve(source), Err(vec![expected.to_string()]));
    }

    #[rstest]
    #[case("var a = 1; var a = 2;")]
    #[case("var a = 1; { var b = a + 1; }")]
    #[case("class A { init() { return; } }")]
    #[case("fun f() { return 1; }")]
    #[case("{ var a = 1; { var a = 2; } }")]
    fn test_accepted_programs(#[case] source: &str) {
        assert!(resolve(source).is_ok(), "{} should resolve", source);
    }

    #[test]
    fn test_collects_every_error() {
        let errors = resolve("return 1;\nprint this;\nclass A < A {}").expect_err("fails");

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at 'return': Can't return from top-level code.".to_string(),
                "[line 2] Error at 'this': Can't use 'this' outside of a class.".to_string(),
                "[line 3] Error at 'A': A class can't inherit from itself.".to_string(),
            ]
        );
    }
}
