#[cfg(test)]
mod interpreter_tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use rox::error::RunError;
    use rox::session::Session;

    /// Runs each batch in turn on one session, collecting what was printed
    /// and the outcome of every batch.
    fn run_batches(batches: &[&str]) -> (String, Vec<Result<(), RunError>>) {
        let mut session: Session<Vec<u8>> = Session::with_output(Vec::new());

        let outcomes: Vec<Result<(), RunError>> = batches
            .iter()
            .map(|source| session.run(source.as_bytes()))
            .collect();

        let output: String = String::from_utf8(session.into_output()).expect("utf-8 output");

        (output, outcomes)
    }

    fn run_ok(source: &str) -> String {
        let (output, mut outcomes) = run_batches(&[source]);

        if let Err(e) = outcomes.remove(0) {
            panic!("program failed:\n{}", e);
        }

        output
    }

    fn run_err(source: &str) -> (String, RunError) {
        let (output, mut outcomes) = run_batches(&[source]);

        match outcomes.remove(0) {
            Ok(()) => panic!("program should fail, printed:\n{}", output),
            Err(e) => (output, e),
        }
    }

    #[rstest]
    #[case("print 1 + 2;", "3\n")]
    #[case("print 10 / 4;", "2.5\n")]
    #[case("print 6 / 3;", "2\n")]
    #[case("print -3 * 2;", "-6\n")]
    #[case("print \"foo\" + \"bar\";", "foobar\n")]
    #[case("print 1 < 2 == true;", "true\n")]
    #[case("print nil;", "nil\n")]
    #[case("print (1, 2, 3);", "3\n")]
    #[case("var a = 1, b = a + 1; print b;", "2\n")]
    fn test_expressions(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(run_ok(source), expected);
    }

    #[test]
    fn test_truthiness_and_equality() {
        assert_eq!(
            run_ok(
                "print nil == false; print 0 == 0; print \"a\" == \"a\"; print nil == nil;
                 print !0; print !nil; print !\"\"; print 1 == \"1\";"
            ),
            "false\ntrue\ntrue\ntrue\nfalse\ntrue\nfalse\nfalse\n"
        );
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(
            run_ok("print nil or \"x\"; print 1 and 2; print false and missing; print 1 or missing;"),
            "x\n2\nfalse\n1\n"
        );
    }

    #[test]
    fn test_value_display() {
        assert_eq!(
            run_ok("fun f() {} class A {} print clock; print f; print A; print A();"),
            "<native fn>\n<fn f>\nA\nA instance\n"
        );
    }

    #[test]
    fn test_control_flow() {
        assert_eq!(
            run_ok(
                "var out = \"\";
                 for (var i = 0; i < 3; i = i + 1) { out = out + \"i\"; }
                 print out;
                 var n = 0;
                 while (n < 5) n = n + 2;
                 print n;
                 if (n > 5) print \"big\"; else print \"small\";"
            ),
            "iii\n6\nbig\n"
        );
    }

    #[test]
    fn test_closure_counter() {
        assert_eq!(
            run_ok(
                "fun makeCounter() {
                   var i = 0;
                   fun count() { i = i + 1; return i; }
                   return count;
                 }
                 var counter = makeCounter();
                 counter();
                 print counter();"
            ),
            "2\n"
        );
    }

    #[test]
    fn test_closures_bind_lexically() {
        assert_eq!(
            run_ok(
                "var a = \"global\";
                 {
                   fun showA() { print a; }
                   showA();
                   var a = \"block\";
                   showA();
                   print a;
                 }"
            ),
            "global\nglobal\nblock\n"
        );
    }

    #[test]
    fn test_recursion_and_return_from_loop() {
        assert_eq!(
            run_ok(
                "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
                 print fib(15);
                 fun find() { var i = 0; while (true) { if (i == 3) return i; i = i + 1; } }
                 print find();
                 fun nothing() { return; }
                 print nothing();"
            ),
            "610\n3\nnil\n"
        );
    }

    #[test]
    fn test_fields_and_methods() {
        assert_eq!(
            run_ok(
                "class Box {
                   init(v) { this.v = v; }
                   get() { return this.v; }
                 }
                 var b = Box(1);
                 b.v = 2;
                 print b.get();
                 var m = b.get;
                 b.v = 3;
                 print m();
                 b.get = \"shadowed\";
                 print b.get;"
            ),
            "2\n3\nshadowed\n"
        );
    }

    #[test]
    fn test_initializer_returns_this() {
        assert_eq!(
            run_ok(
                "class P {
                   init(x) { this.x = x; return; this.x = 0; }
                 }
                 var p = P(1);
                 print p.x;
                 print p.init(2) == p;
                 print p.x;"
            ),
            "1\ntrue\n2\n"
        );
    }

    #[test]
    fn test_inheritance_and_super() {
        assert_eq!(
            run_ok(
                "class A { method() { print \"A\"; } }
                 class B < A {
                   method() { print \"B\"; }
                   test() { super.method(); }
                 }
                 class C < B {}
                 C().test();
                 C().method();"
            ),
            "A\nB\n"
        );
    }

    #[test]
    fn test_block_shadows_global() {
        assert_eq!(
            run_ok("var a = \"global\"; { var a = \"block\"; print a; } print a;"),
            "block\nglobal\n"
        );
    }

    #[test]
    fn test_super_call_keeps_the_receiver() {
        assert_eq!(
            run_ok(
                "class A {
                   bump() { this.count = this.count + 1; return this; }
                 }
                 class B < A {
                   init() { this.count = 0; }
                   bump() { return super.bump(); }
                 }
                 var b = B();
                 print b.bump() == b;
                 b.bump();
                 print b.count;"
            ),
            "true\n2\n"
        );
    }

    #[test]
    fn test_bare_return_in_init_yields_instance() {
        assert_eq!(
            run_ok("class A { init() { return; } } print A();"),
            "A instance\n"
        );
    }

    #[test]
    fn test_subtracting_from_a_string() {
        let (_, error) = run_err("print \"a\" - 1;");

        assert_eq!(error.to_string(), "Operands must be numbers.\n[line 1]");
    }

    #[test]
    fn test_inherited_initializer_sets_arity() {
        let (_, error) = run_err("class A { init(a, b) {} } class B < A {} B(1);");

        assert_eq!(error.to_string(), "Expected 2 arguments but got 1.\n[line 1]");
    }

    #[test]
    fn test_class_is_visible_in_its_methods() {
        assert_eq!(
            run_ok("class A { make() { return A(); } } print A().make();"),
            "A instance\n"
        );
    }

    #[test]
    fn test_instances_compare_by_identity() {
        assert_eq!(
            run_ok("class A {} var a = A(); var b = A(); print a == b; print a == a;"),
            "false\ntrue\n"
        );
    }

    #[test]
    fn test_clock_returns_a_number() {
        assert_eq!(run_ok("print clock() > 0;"), "true\n");
    }

    #[rstest]
    #[case("print 1 + \"a\";", "Operands must be two numbers or two strings.")]
    #[case("print 1 < \"a\";", "Operands must be numbers.")]
    #[case("print -\"x\";", "Operand must be a number.")]
    #[case("print x;", "Undefined variable 'x'.")]
    #[case("x = 1;", "Undefined variable 'x'.")]
    #[case("\"str\"();", "Can only call functions and classes.")]
    #[case("fun f(a) {} f();", "Expected 1 arguments but got 0.")]
    #[case("var a = 1; print a.b;", "Only instances have properties.")]
    #[case("var a = 1; a.b = 2;", "Only instances have fields.")]
    #[case("class A {} print A().missing;", "Undefined property 'missing'.")]
    #[case("var A = 1; class B < A {}", "Superclass must be a class.")]
    #[case("clock(1);", "Expected 0 arguments but got 1.")]
    fn test_runtime_errors(#[case] source: &str, #[case] message: &str) {
        let (_, error) = run_err(source);

        assert_eq!(error.exit_code(), 70);
        assert_eq!(error.to_string(), format!("{}\n[line 1]", message));
    }

    /// Runs `batches` on a thread with room for `MAX_CALL_DEPTH` Lox frames,
    /// as the binary does.
    fn run_batches_deep(batches: &'static [&'static str]) -> (String, Vec<Result<(), RunError>>) {
        std::thread::Builder::new()
            .stack_size(256 * 1024 * 1024)
            .spawn(move || run_batches(batches))
            .expect("spawn interpreter thread")
            .join()
            .expect("interpreter thread")
    }

    #[test]
    fn test_unbounded_recursion_is_a_runtime_error() {
        let (output, outcomes) = run_batches_deep(&[
            "var a = 1; fun f() { f(); }",
            "f();",
            "print a;",
        ]);

        assert!(outcomes[0].is_ok());
        match &outcomes[1] {
            Err(e @ RunError::Runtime(_)) => {
                assert_eq!(e.to_string(), "Stack overflow.\n[line 1]");
                assert_eq!(e.exit_code(), 70);
            }
            other => panic!("expected runtime error, got {:?}", other),
        }
        assert!(outcomes[2].is_ok());
        assert_eq!(output, "1\n");
    }

    #[test]
    fn test_recursion_below_the_depth_limit() {
        let (output, outcomes) = run_batches_deep(&[
            "fun f(n) { if (n == 0) return 0; return f(n - 1) + 1; } print f(1000);",
        ]);

        assert!(outcomes[0].is_ok(), "{:?}", outcomes[0]);
        assert_eq!(output, "1000\n");
    }

    #[test]
    fn test_depth_is_released_after_an_overflow() {
        let (output, outcomes) = run_batches_deep(&[
            "fun down(n) { if (n == 0) return 0; return down(n - 1); }",
            "down(5000);",
            "print down(1000);",
        ]);

        assert!(matches!(outcomes[1], Err(RunError::Runtime(_))));
        assert!(outcomes[2].is_ok(), "{:?}", outcomes[2]);
        assert_eq!(output, "0\n");
    }

    #[test]
    fn test_non_finite_numbers_print_like_lox() {
        assert_eq!(
            run_ok("print 1 / 0; print -1 / 0; print -0;"),
            "Infinity\n-Infinity\n-0\n"
        );
    }

    #[test]
    fn test_runtime_error_reports_its_line() {
        let (_, error) = run_err("var a = 1;\n\nprint a + nil;");

        assert_eq!(error.to_string(), "Operands must be two numbers or two strings.\n[line 3]");

        let diagnostic = error.diagnostics()[0];
        assert_eq!(diagnostic.line(), Some(3));
        assert_eq!(diagnostic.message(), "Operands must be two numbers or two strings.");
    }

    #[test]
    fn test_runtime_error_stops_the_batch() {
        let (output, error) = run_err("print 1; print nil + 1; print 2;");

        assert_eq!(output, "1\n");
        assert!(matches!(error, RunError::Runtime(_)));
    }

    #[test]
    fn test_static_errors_prevent_execution() {
        let (output, error) = run_err("print 1; print ;\nreturn 2;");

        assert_eq!(output, "");
        assert_eq!(error.exit_code(), 65);
        assert_eq!(
            error.to_string(),
            "[line 1] Error at ';': Expect expression."
        );
    }

    #[test]
    fn test_resolution_errors_prevent_execution() {
        let (output, error) = run_err("print 1;\nreturn 2;");

        assert_eq!(output, "");
        assert_eq!(error.exit_code(), 65);
        assert_eq!(
            error.to_string(),
            "[line 2] Error at 'return': Can't return from top-level code."
        );
    }

    #[test]
    fn test_lexical_and_syntax_errors_reported_together() {
        let (_, error) = run_err("var a = @;");

        assert_eq!(
            error.to_string(),
            "[line 1] Error: Unexpected character: @\n[line 1] Error at ';': Expect expression."
        );
        assert_eq!(error.diagnostics().len(), 2);
    }

    #[test]
    fn test_globals_persist_across_batches() {
        let (output, outcomes) = run_batches(&[
            "var a = 1;",
            "fun show() { print a; }",
            "a = a + 1;",
            "show();",
        ]);

        assert!(outcomes.iter().all(Result::is_ok));
        assert_eq!(output, "2\n");
    }

    #[test]
    fn test_session_recovers_after_errors() {
        let (output, outcomes) = run_batches(&[
            "var a = 1; fun f() { var a = 2; { nil + 1; } }",
            "f();",
            "print ;",
            "print a;",
        ]);

        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1], Err(RunError::Runtime(_))));
        assert!(matches!(outcomes[2], Err(RunError::Static(_))));
        assert!(outcomes[3].is_ok());
        assert_eq!(output, "1\n");
    }

    #[test]
    fn test_closures_survive_their_batch() {
        let (output, outcomes) = run_batches(&[
            "fun make() { var n = 10; fun get() { return n; } return get; }",
            "var g = make();",
            "print g();",
        ]);

        assert!(outcomes.iter().all(Result::is_ok));
        assert_eq!(output, "10\n");
    }
}
