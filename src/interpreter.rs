//! Tree‑walking evaluator.
//!
//! Statements execute to `Option<Signal>`: `None` when control falls off the
//! end normally, otherwise the `return` / `break` / `continue` that cut it
//! short.  Signals travel as ordinary return values and are kept apart from
//! [`RuntimeError`], which is the only thing `?` propagates.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::{debug, info, trace};

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::callable::{Function, NativeFunction};
use crate::class::{Class, INITIALIZER};
use crate::environment::Environment;
use crate::error::{ResolveError, RuntimeError};
use crate::resolver::{Locals, Resolver};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non‑error control transfer out of a statement.
#[derive(Debug, Clone)]
pub enum Signal {
    /// `return` with its value, if one was given.
    Return(Option<Value>),

    Break,

    Continue,
}

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

pub struct Interpreter<'o> {
    /// Host‑provided bindings (`clock`).
    globals: Rc<RefCell<Environment>>,

    /// The program's own outermost scope, nested in `globals`.  Names the
    /// resolver could not place are looked up from here.
    script: Rc<RefCell<Environment>>,

    /// Scope the next statement runs in.
    environment: Rc<RefCell<Environment>>,

    locals: Locals,

    output: &'o mut dyn Write,
}

impl<'o> Interpreter<'o> {
    /// Creates a new Interpreter printing to `output` and defines native
    /// functions such as `clock`.
    pub fn new(output: &'o mut dyn Write) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction(Rc::new(NativeFunction::clock())),
        );

        let script = Environment::child(&globals);

        Self {
            globals,
            environment: Rc::clone(&script),
            script,
            locals: HashMap::new(),
            output,
        }
    }

    /// Run the resolver over `statements` and remember its binding table.
    ///
    /// Must be called on a program before [`interpret`](Self::interpret)
    /// runs it.  Tables from successive programs accumulate, so one
    /// interpreter can serve a whole REPL session.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<(), ResolveError> {
        let locals = Resolver::new().resolve(statements)?;

        self.locals.extend(locals);

        Ok(())
    }

    pub fn globals(&self) -> &Rc<RefCell<Environment>> {
        &self.globals
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        info!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            if let Some(signal) = self.execute(stmt)? {
                // break/continue outside any loop
                debug!("Ignoring stray {:?} at top level", signal);
            }
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> IResult<Option<Signal>> {
        trace!("Executing statement: {:?}", stmt);

        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(None)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(None)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                debug!("Variable '{}' defined with value: {}", name.lexeme, value);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(None)
            }

            Stmt::Block(statements) => {
                let environment = Environment::child(&self.environment);
                self.execute_block(statements, environment)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(None)
                }
            }

            Stmt::While { condition, body } => {
                debug!("Entering while loop");

                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Some(Signal::Break) => break,
                        Some(Signal::Continue) | None => {}
                        Some(signal @ Signal::Return(_)) => return Ok(Some(signal)),
                    }
                }

                debug!("Exited while loop");
                Ok(None)
            }

            Stmt::Function(decl) => {
                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                debug!(
                    "Function '{}' defined with {} parameter(s)",
                    decl.name.lexeme,
                    decl.params.len()
                );
                self.environment
                    .borrow_mut()
                    .define(&decl.name.lexeme, Value::Function(Rc::new(function)));
                Ok(None)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => Some(self.evaluate(expr)?),
                    None => None,
                };
                Ok(Some(Signal::Return(value)))
            }

            Stmt::Break(_) => Ok(Some(Signal::Break)),

            Stmt::Continue(_) => Ok(Some(Signal::Continue)),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.declare_class(name, superclass.as_ref(), methods)?;
                Ok(None)
            }
        }
    }

    /// Run `statements` inside `environment`, stopping at the first signal.
    /// The previous scope is restored however the block ends.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> IResult<Option<Signal>> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = self.execute_statements(statements);

        self.environment = previous;

        result
    }

    fn execute_statements(&mut self, statements: &[Stmt]) -> IResult<Option<Signal>> {
        for stmt in statements {
            if let Some(signal) = self.execute(stmt)? {
                return Ok(Some(signal));
            }
        }

        Ok(None)
    }

    fn declare_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> IResult<()> {
        debug!("Declaring class '{}'", name.lexeme);

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let token = match expr {
                        Expr::Variable { name, .. } => name,
                        _ => name,
                    };
                    return Err(RuntimeError::SuperclassNotAClass {
                        name: token.lexeme.clone(),
                        line: token.line,
                    });
                }
            },
            None => None,
        };

        // Methods close over a scope holding `super` when there is one.
        let method_scope = match &superclass {
            Some(superclass) => {
                let scope = Environment::child(&self.environment);
                scope
                    .borrow_mut()
                    .define("super", Value::Class(Rc::clone(superclass)));
                scope
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, Rc<Function>> = methods
            .iter()
            .map(|decl| {
                let function = Function::new(
                    Rc::clone(decl),
                    Rc::clone(&method_scope),
                    decl.name.lexeme == INITIALIZER,
                );
                (decl.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = Class::new(name.lexeme.as_str(), superclass, methods);

        self.environment.borrow_mut().assign(
            &name.lexeme,
            Value::Class(Rc::new(class)),
            name.line,
        )?;

        info!("Class '{}' defined", name.lexeme);

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        trace!("Evaluating expression: {:?}", expr);

        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;

                let short_circuit = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),
                    None => {
                        self.script
                            .borrow_mut()
                            .assign(&name.lexeme, value.clone(), name.line)?
                    }
                }

                debug!("Assigned value {} to '{}'", value, name.lexeme);
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;

                let mut values = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    values.push(self.evaluate(arg)?);
                }

                self.call(callee, paren, values)
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => instance.get(name),
                _ => Err(RuntimeError::NotAnInstance {
                    what: "properties",
                    name: name.lexeme.clone(),
                    line: name.line,
                }),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::NotAnInstance {
                        what: "fields",
                        name: name.lexeme.clone(),
                        line: name.line,
                    });
                };

                let value = self.evaluate(value)?;
                instance.set(name, value.clone());
                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> IResult<Value> {
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => Ok(Value::Number(-number_operand(&right, operator)?)),
            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
            _ => Err(unsupported_operator(operator)),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> IResult<Value> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        trace!("Left operand: {}, Right operand: {}", left, right);

        // Booleans and strings only know (in)equality among themselves.
        match (&left, &right) {
            (Value::Bool(a), Value::Bool(b)) => {
                if let Some(result) = equality(a, b, operator) {
                    return Ok(result);
                }
            }

            (Value::String(a), Value::String(b)) => {
                if let Some(result) = equality(a, b, operator) {
                    return Ok(result);
                }
            }

            _ => {}
        }

        let has_string = matches!(left, Value::String(_)) || matches!(right, Value::String(_));
        if has_string && operator.token_type == TokenType::PLUS {
            return Ok(Value::String(format!("{}{}", left, right)));
        }

        let a = number_operand(&left, operator)?;
        let b = number_operand(&right, operator)?;

        let value = match operator.token_type {
            TokenType::GREATER => Value::Bool(a > b),
            TokenType::GREATER_EQUAL => Value::Bool(a >= b),
            TokenType::LESS => Value::Bool(a < b),
            TokenType::LESS_EQUAL => Value::Bool(a <= b),
            TokenType::BANG_EQUAL => Value::Bool(a != b),
            TokenType::EQUAL_EQUAL => Value::Bool(a == b),
            TokenType::MINUS => Value::Number(a - b),
            TokenType::PLUS => Value::Number(a + b),
            TokenType::STAR => Value::Number(a * b),
            TokenType::SLASH => {
                if b == 0.0 {
                    return Err(RuntimeError::DivisionByZero {
                        line: operator.line,
                    });
                }
                Value::Number(a / b)
            }
            _ => return Err(unsupported_operator(operator)),
        };

        Ok(value)
    }

    /// Invokes a callable (native function, user function, or class).
    fn call(&mut self, callee: Value, paren: &Token, arguments: Vec<Value>) -> IResult<Value> {
        let Some(callable) = callee.as_callable() else {
            return Err(RuntimeError::NotCallable {
                kind: callee.kind(),
                lexeme: paren.lexeme.clone(),
                line: paren.line,
            });
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::ArityMismatch {
                expected: callable.arity(),
                got: arguments.len(),
                lexeme: paren.lexeme.clone(),
                line: paren.line,
            });
        }

        debug!("Calling {} with {} argument(s)", callee, arguments.len());

        callable.call(self, arguments)
    }

    /// `super.method`: found on the superclass, bound to the current `this`.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let Some(&distance) = self.locals.get(&id) else {
            return Err(RuntimeError::UndefinedVariable {
                name: keyword.lexeme.clone(),
                line: keyword.line,
            });
        };

        let Value::Class(superclass) =
            Environment::get_at(&self.environment, distance, "super", keyword.line)?
        else {
            return Err(RuntimeError::SuperclassNotAClass {
                name: keyword.lexeme.clone(),
                line: keyword.line,
            });
        };

        // `this` lives one scope inside the one holding `super`.
        let Value::Instance(instance) = Environment::get_at(
            &self.environment,
            distance.saturating_sub(1),
            "this",
            keyword.line,
        )?
        else {
            return Err(RuntimeError::UndefinedVariable {
                name: "this".to_string(),
                line: keyword.line,
            });
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
            None => Err(RuntimeError::UndefinedProperty {
                name: method.lexeme.clone(),
                line: method.line,
            }),
        }
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        let value = match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, &name.lexeme, name.line)?
            }
            None => self.script.borrow().get(&name.lexeme, name.line)?,
        };

        trace!("Variable '{}' evaluated to: {}", name.lexeme, value);

        Ok(value)
    }
}

/// `Some` when `operator` is `==` / `!=`, `None` for any other operator.
fn equality<T: PartialEq + ?Sized>(a: &T, b: &T, operator: &Token) -> Option<Value> {
    match operator.token_type {
        TokenType::EQUAL_EQUAL => Some(Value::Bool(a == b)),
        TokenType::BANG_EQUAL => Some(Value::Bool(a != b)),
        _ => None,
    }
}

fn number_operand(value: &Value, operator: &Token) -> IResult<f64> {
    value.as_number().ok_or_else(|| RuntimeError::TypeMismatch {
        message: format!("{} is not a number", value.kind()),
        lexeme: operator.lexeme.clone(),
        line: operator.line,
    })
}

fn unsupported_operator(operator: &Token) -> RuntimeError {
    RuntimeError::TypeMismatch {
        message: format!("unsupported operator {}", operator.token_type.name()),
        lexeme: operator.lexeme.clone(),
        line: operator.line,
    }
}
