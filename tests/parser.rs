#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;
    use rox as lox;

    use lox::ast::{Expr, Stmt};
    use lox::ast_printer::AstPrinter;
    use lox::error::LoxError;
    use lox::parser::Parser;
    use lox::scanner::Scanner;

    fn parse(source: &str) -> Result<Vec<Stmt>, LoxError> {
        let tokens = Scanner::new(source.as_bytes()).scan_all()?;
        Parser::new(&tokens).parse()
    }

    fn print(source: &str) -> String {
        AstPrinter::print_program(&parse(source).unwrap())
    }

    fn print_expression(source: &str) -> String {
        let tokens = Scanner::new(source.as_bytes()).scan_all().unwrap();
        let expr = Parser::new(&tokens).parse_expression().unwrap();
        AstPrinter::print(&expr)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(print_expression("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(
            print_expression("-(1 - 2) >= 3 == !true"),
            "(== (>= (- (group (- 1.0 2.0))) 3.0) (! true))"
        );
        assert_eq!(
            print_expression("a or b and c"),
            "(or a (and b c))"
        );
    }

    #[test]
    fn test_calls_and_properties() {
        assert_eq!(
            print_expression("point.move(1, 2).x"),
            "(. (call (. point move) 1.0 2.0) x)"
        );
        assert_eq!(print("a.b = c = 3;"), "(; (= (. a b) (= c 3.0)))");
    }

    #[test]
    fn test_for_is_desugared_into_while() {
        assert_eq!(
            print("for (var i = 0; i < 3; i = i + 1) print i;"),
            "(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"
        );
        assert_eq!(print("for (;;) break;"), "(while true (break))");
    }

    #[test]
    fn test_class_declaration() {
        let source = "class B < A { init(x) { this.x = x; } get() { return super.get(); } }";

        assert_eq!(
            print(source),
            "(class B < A (method init(x) (; (= (. this x) x))) (method get() (return (call (super get)))))"
        );

        let statements = parse(source).unwrap();
        let Stmt::Class {
            superclass: Some(Expr::Variable { name, .. }),
            methods,
            ..
        } = &statements[0]
        else {
            panic!("Expected a subclass declaration, got {:?}", statements[0]);
        };
        assert_eq!(name.lexeme, "A");
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].params.len(), 1);
    }

    #[test]
    fn test_loop_control_statements() {
        assert_eq!(
            print("while (true) { continue; break; }"),
            "(while true (block (continue) (break)))"
        );
    }

    #[test]
    fn test_reference_nodes_get_distinct_ids() {
        let statements = parse("a; a;").unwrap();

        let ids: Vec<_> = statements
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Expression(expr) => expr.id(),
                _ => None,
            })
            .collect();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse("1 + 2 = 3;").unwrap_err();

        assert_eq!(
            err.to_string(),
            "[line 1] Error at '=': Invalid assignment target."
        );
    }

    #[test]
    fn test_error_at_end() {
        let err = parse("print 1").unwrap_err();

        assert_eq!(
            err.to_string(),
            "[line 1] Error at end: Expect ';' after value."
        );
    }

    #[test]
    fn test_iterator_recovers_after_error() {
        let tokens = Scanner::new(b"var = 1; print 2; fun (;\nprint 3;")
            .scan_all()
            .unwrap();

        let results: Vec<_> = Parser::new(&tokens).collect();

        let errors = results.iter().filter(|r| r.is_err()).count();
        let printed: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(AstPrinter::print_stmt)
            .collect();

        assert_eq!(errors, 2);
        assert_eq!(printed, vec!["(print 2.0)", "(print 3.0)"]);
    }

    #[test]
    fn test_too_many_arguments() {
        let args = vec!["1"; 256].join(", ");
        let err = parse(&format!("f({});", args)).unwrap_err();

        assert!(
            err.to_string().contains("Can't have more than 255 arguments."),
            "unexpected error: {}",
            err
        );
    }

    #[test]
    fn test_ast_serialises_to_json() {
        let statements = parse("print 1;").unwrap();
        let json = serde_json::to_value(&statements).unwrap();

        assert_eq!(json[0]["Print"]["Literal"]["Number"], 1.0);
    }
}
