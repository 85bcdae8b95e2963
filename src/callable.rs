//! The call interface shared by user functions, native functions and classes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::FunctionDecl;
use crate::class::Instance;
use crate::environment::Environment;
use crate::interpreter::{IResult, Interpreter, Signal};
use crate::value::Value;

/// Anything a call expression can invoke.
///
/// The interpreter checks `arity` against the argument count before calling,
/// so implementations may assume `arguments.len() == self.arity()`.
pub trait Callable {
    fn arity(&self) -> usize;

    fn call(self: Rc<Self>, interpreter: &mut Interpreter<'_>, arguments: Vec<Value>)
        -> IResult<Value>;
}

/// A user‑defined function (or method) closed over the scope it was declared in.
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Copy of this method whose closure additionally binds `this` to `instance`.
    pub fn bind(&self, instance: Rc<Instance>) -> Function {
        debug!(
            "Binding method '{}' to instance of '{}'",
            self.name(),
            instance.class().name()
        );

        let environment = Environment::child(&self.closure);
        environment
            .borrow_mut()
            .define("this", Value::Instance(instance));

        Function::new(
            Rc::clone(&self.declaration),
            environment,
            self.is_initializer,
        )
    }
}

impl fmt::Debug for Function {
    // The closure may (indirectly) contain this very function.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("arity", &self.declaration.params.len())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
    ) -> IResult<Value> {
        debug!("Calling user-defined function '{}'", self.name());

        // Parented to the closure, never to the caller's scope.
        let environment = Environment::child(&self.closure);

        {
            let mut scope = environment.borrow_mut();
            for (param, argument) in self.declaration.params.iter().zip(arguments) {
                scope.define(&param.lexeme, argument);
            }
        }

        let signal: Option<Signal> =
            interpreter.execute_block(&self.declaration.body, environment)?;

        match signal {
            Some(Signal::Return(Some(value))) if !self.is_initializer => {
                info!("Function '{}' returned: {}", self.name(), value);
                Ok(value)
            }

            _ if self.is_initializer => {
                Environment::get_at(&self.closure, 0, "this", self.declaration.name.line)
            }

            _ => Ok(Value::Nil),
        }
    }
}

/// Signature of a host function body.
pub type NativeFn = fn(&[Value]) -> Value;

/// A function implemented in Rust and pre‑registered in the globals.
pub struct NativeFunction {
    name: &'static str,
    arity: usize,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, func: NativeFn) -> Self {
        Self { name, arity, func }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    /// `clock()`: seconds since the Unix epoch, with millisecond precision.
    pub fn clock() -> Self {
        Self::new("clock", 0, |_args: &[Value]| {
            let millis: i64 = Utc::now().timestamp_millis();

            Value::Number(millis as f64 / 1000.0)
        })
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        self: Rc<Self>,
        _interpreter: &mut Interpreter<'_>,
        arguments: Vec<Value>,
    ) -> IResult<Value> {
        debug!("Calling native function '{}'", self.name);

        let result = (self.func)(&arguments);

        info!("Native function '{}' returned: {}", self.name, result);

        Ok(result)
    }
}
