//! Runtime values and method bodies.
//!
//! Method bodies are plain closures over a `Receiver`, the object the method
//! runs on. A body never sees the concrete composite type; it reaches its
//! own fields and super implementations through the accessor and bridge
//! methods the composer emits.

use std::fmt;
use std::sync::Arc;

use crate::ty::{MethodKey, Ty};
use crate::Symbol;

/// A runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Void,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// Initial value of a freshly allocated slot of type `ty`.
    pub fn default_for(ty: &Ty) -> Self {
        match ty {
            Ty::Void => Value::Void,
            Ty::Bool => Value::Bool(false),
            Ty::Int => Value::Int(0),
            Ty::Float => Value::Float(0.0),
            Ty::Str | Ty::Object(_) => Value::Null,
        }
    }

    /// Whether this value may be stored in, or passed as, a `ty`.
    pub fn conforms_to(&self, ty: &Ty) -> bool {
        match (self, ty) {
            (Value::Void, Ty::Void)
            | (Value::Bool(_), Ty::Bool)
            | (Value::Int(_), Ty::Int)
            | (Value::Float(_), Ty::Float)
            | (Value::Null | Value::Str(_), Ty::Str | Ty::Object(_)) => true,
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Void => "void",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("void"),
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// The object a method body runs on.
pub trait Receiver {
    /// Name of the receiver's concrete type.
    fn type_name(&self) -> &Symbol;

    /// Dispatch `key` on this object.
    fn invoke(&mut self, key: &MethodKey, args: &[Value]) -> Result<Value, RuntimeError>;

    /// Dispatch by name, picking the declared (non-bridge) method with a
    /// matching arity.
    fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, RuntimeError>;
}

/// Implementation of a method. The receiver is passed explicitly, the way a
/// static implementation entry point takes `this` as its first argument.
pub type MethodBody =
    Arc<dyn Fn(&mut dyn Receiver, &[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

/// Wrap a closure as a `MethodBody`.
pub fn body<F>(f: F) -> MethodBody
where
    F: Fn(&mut dyn Receiver, &[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Failure while running a composite instance.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum RuntimeError {
    #[error("`{type_name}` has no method `{method}`")]
    NoSuchMethod { type_name: String, method: String },

    #[error("`{method}` on `{type_name}` has no implementation")]
    AbstractMethod { type_name: String, method: String },

    #[error("`{method}` expects {expected} argument(s), found {found}")]
    ArityMismatch {
        method: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {index} of `{method}` expects `{expected}`, found `{found}`")]
    ArgumentType {
        method: String,
        index: usize,
        expected: String,
        found: String,
    },

    /// Raised by a method body.
    #[error("{0}")]
    Body(String),
}
