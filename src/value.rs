use std::fmt;
use std::rc::Rc;

use crate::callable::{Callable, Function, NativeFunction};
use crate::class::{Class, Instance};

/// Every runtime value a Lox program can produce.
///
/// Functions, classes and instances are shared behind `Rc`: copying a value
/// copies the handle, never the object.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),

    Number(f64),

    Bool(bool),

    Nil,

    /// User‑defined function, method or bound method.
    Function(Rc<Function>),

    /// Host function such as `clock`.
    NativeFunction(Rc<NativeFunction>),

    Class(Rc<Class>),

    Instance(Rc<Instance>),
}

impl Value {
    /// Truthiness: booleans are themselves, numbers are truthy only when
    /// strictly positive, everything else (strings and `nil` included) is
    /// falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n > 0.0,
            _ => false,
        }
    }

    /// Short type name used in coercion error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::Nil => "nil",
            Value::Function(_) | Value::NativeFunction(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// View this value through the call interface, if it has one.
    pub fn as_callable(&self) -> Option<Rc<dyn Callable>> {
        match self {
            Value::Function(f) => Some(Rc::clone(f) as Rc<dyn Callable>),
            Value::NativeFunction(f) => Some(Rc::clone(f) as Rc<dyn Callable>),
            Value::Class(c) => Some(Rc::clone(c) as Rc<dyn Callable>),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),

            // Shortest round‑trip form, never an exponent: 4, 2.5, 1e21 spelled out.
            Value::Number(n) => write!(f, "{}", n),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),

            Value::Function(func) => write!(f, "[function] {}", func.name()),

            Value::NativeFunction(func) => write!(f, "[function] {}", func.name()),

            Value::Class(class) => write!(f, "[class] {}", class.name()),

            Value::Instance(instance) => write!(f, "[class instance] {}", instance.class().name()),
        }
    }
}
