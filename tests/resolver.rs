#[cfg(test)]
mod resolver_tests {
    use pretty_assertions::assert_eq;
    use rox as lox;

    use lox::ast::{Expr, ExprId, Stmt};
    use lox::error::ResolveError;
    use lox::parser::Parser;
    use lox::resolver::{Locals, Resolver};
    use lox::scanner::Scanner;
    use lox::token::Token;

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens = Scanner::new(source.as_bytes()).scan_all().unwrap();
        Parser::new(&tokens).parse().unwrap()
    }

    fn resolve(source: &str) -> Result<Locals, ResolveError> {
        Resolver::new().resolve(&parse(source))
    }

    /// `{ var a = 1; { { … print a; } } }` with `depth` blocks in total.
    fn nested_blocks(depth: usize) -> (Vec<Stmt>, ExprId) {
        let reference = Expr::variable(Token::identifier("a", 1));
        let id = reference.id().unwrap();

        let mut body = Stmt::Print(reference);
        for _ in 1..depth {
            body = Stmt::block(vec![body]);
        }

        let declaration = Stmt::Var {
            name: Token::identifier("a", 1),
            initializer: Some(Expr::number(1.0)),
        };

        (vec![Stmt::block(vec![declaration, body])], id)
    }

    /// The single method of the single class in `statements`.
    fn method_return_value(statements: &[Stmt]) -> &Expr {
        let Stmt::Class { methods, .. } = &statements[statements.len() - 1] else {
            panic!("Expected a class declaration");
        };

        match &methods[0].body[0] {
            Stmt::Return {
                value: Some(value), ..
            } => value,
            other => panic!("Expected a return statement, got {:?}", other),
        }
    }

    #[test]
    fn test_hop_count_matches_block_nesting() {
        for depth in 1..=10 {
            let (program, id) = nested_blocks(depth);
            let locals = Resolver::new().resolve(&program).unwrap();

            assert_eq!(locals.get(&id), Some(&(depth - 1)), "depth {}", depth);
        }
    }

    #[test]
    fn test_top_level_variable_seen_through_nine_blocks() {
        let mut source = String::from("var v1 = 1; ");
        source.push_str(&"{ ".repeat(9));
        source.push_str("print v1; ");
        source.push_str(&"} ".repeat(9));
        source.push_str("print v1;");

        let statements = parse(&source);
        let locals = Resolver::new().resolve(&statements).unwrap();

        let mut inner: &Stmt = &statements[1];
        while let Stmt::Block(body) = inner {
            inner = &body[0];
        }
        let (Stmt::Print(nested), Stmt::Print(top)) = (inner, &statements[2]) else {
            panic!("Expected two print statements");
        };

        assert_eq!(locals.get(&nested.id().unwrap()), Some(&9));
        assert_eq!(locals.get(&top.id().unwrap()), Some(&0));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let statements = parse(
            "fun makeCounter() { var i = 0; fun count() { i = i + 1; print i; } return count; }
             var counter = makeCounter();
             counter();",
        );

        let first = Resolver::new().resolve(&statements).unwrap();
        let second = Resolver::new().resolve(&statements).unwrap();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_names_are_left_unresolved() {
        let statements = parse("fun f() { return g; }");
        let locals = Resolver::new().resolve(&statements).unwrap();

        let Stmt::Function(decl) = &statements[0] else {
            panic!("Expected a function declaration");
        };
        let Stmt::Return {
            value: Some(reference),
            ..
        } = &decl.body[0]
        else {
            panic!("Expected a return statement");
        };

        assert_eq!(locals.get(&reference.id().unwrap()), None);
    }

    #[test]
    fn test_this_and_super_distances() {
        let statements = parse("class A { m() { return this; } }");
        let locals = Resolver::new().resolve(&statements).unwrap();
        let this = method_return_value(&statements);

        // function body → `this` scope
        assert_eq!(locals.get(&this.id().unwrap()), Some(&1));

        let statements = parse("class A {} class B < A { m() { return super.m; } }");
        let locals = Resolver::new().resolve(&statements).unwrap();
        let sup = method_return_value(&statements);

        // function body → `this` scope → `super` scope
        assert_eq!(locals.get(&sup.id().unwrap()), Some(&2));
    }

    #[test]
    fn test_duplicate_declaration() {
        assert_eq!(
            resolve("{\n var v1;\n var v1;\n}"),
            Err(ResolveError::DuplicateDeclaration {
                name: "v1".into(),
                line: 3,
            })
        );
    }

    #[test]
    fn test_shadowing_in_inner_scope_is_allowed() {
        assert!(resolve("var a = 1; { var a = 2; { var a = 3; } }").is_ok());
    }

    #[test]
    fn test_variable_in_its_own_initializer() {
        assert_eq!(
            resolve("{ var i = i; }"),
            Err(ResolveError::SelfReferentialInitializer {
                name: "i".into(),
                line: 1,
            })
        );
    }

    #[test]
    fn test_return_outside_function() {
        assert_eq!(
            resolve("return 1;"),
            Err(ResolveError::ReturnOutsideFunction { line: 1 })
        );
    }

    #[test]
    fn test_return_value_from_initializer() {
        assert_eq!(
            resolve("class A { init() { return 1; } }"),
            Err(ResolveError::ReturnValueFromInitializer { line: 1 })
        );
        assert!(resolve("class A { init() { return; } }").is_ok());
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        assert_eq!(
            resolve("class A < A {}"),
            Err(ResolveError::SelfInheritance {
                name: "A".into(),
                line: 1,
            })
        );
    }

    #[test]
    fn test_super_misuse() {
        assert_eq!(
            resolve("fun f() { super.m(); }"),
            Err(ResolveError::SuperOutsideClass { line: 1 })
        );
        assert_eq!(
            resolve("class A { m() { super.m(); } }"),
            Err(ResolveError::SuperWithoutSuperclass { line: 1 })
        );
    }

    #[test]
    fn test_this_outside_class() {
        assert_eq!(
            resolve("fun f() { print this; }"),
            Err(ResolveError::ThisOutsideClass { line: 1 })
        );
    }

    #[test]
    fn test_stray_loop_control_is_not_an_error() {
        assert!(resolve("break; continue;").is_ok());
    }

    #[test]
    fn test_error_message() {
        let err = resolve("{ var i = i; }").unwrap_err();

        assert_eq!(
            err.to_string(),
            "[line 1] Error at 'i': Can't read local variable in its own initializer."
        );
    }
}
