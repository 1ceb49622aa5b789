//! The dynamic outcome model.
//!
//! A container can settle with any shape of value: plain data, another
//! container, or a foreign object that may (or may not) expose a callable
//! `then` member. [`Value`] is the tagged rendering of that universe, and
//! [`ObjectLike`] is the probing surface the resolution machinery uses to
//! classify foreign objects without committing to their layout.

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::promise::Promise;

/// A settlement callback handed to a thenable's `then`. The thenable may
/// invoke it synchronously, store it and invoke it later, or invoke it many
/// times; only the first invocation across the pair ever takes effect.
pub type SettleFn = Box<dyn Fn(Value) + Send + Sync>;

/// A callable `then` member. The closure is already bound to its object, so
/// invoking it is the moral equivalent of `then.call(x, resolve, reject)`.
/// `Err` models the call itself raising.
pub type ThenFn = Arc<dyn Fn(SettleFn, SettleFn) -> Result<(), Value> + Send + Sync>;

/// What probing an object's `then` member turned up.
pub enum ThenProbe {
    /// A callable `then`, ready to be invoked with a resolve/reject pair.
    Callable(ThenFn),
    /// A `then` member exists but cannot be called.
    Uncallable,
    /// No `then` member at all.
    Absent,
}

/// A foreign object honored for interoperability. The single operation is the
/// capability probe: attempt to read the object's `then` member, which may
/// itself raise (`Err` carries the raised reason).
pub trait ObjectLike: Send + Sync + fmt::Debug {
    /// Attempts to read the `then` member and classify what was found.
    fn then_member(&self) -> Result<ThenProbe, Value> {
        Ok(ThenProbe::Absent)
    }
}

/// An outcome, a rejection reason, or a candidate settlement value.
///
/// Reference-shaped variants ([`Value::Promise`], [`Value::Object`]) compare
/// by identity, everything else structurally.
#[derive(Debug, Clone)]
pub enum Value {
    /// The absent value.
    Undefined,
    /// An explicit null.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A string.
    Str(String),
    /// A reference to another container.
    Promise(Promise),
    /// A foreign object, possibly thenable.
    Object(Arc<dyn ObjectLike>),
    /// An error raised by the resolution machinery itself.
    Fault(Error),
}

impl Value {
    /// Wraps a closure as an object whose `then` member is callable, the
    /// cheapest way to hand a foreign thenable to a chain.
    ///
    /// ```
    /// use promise_cell::{ThenProbe, Value};
    ///
    /// let v = Value::thenable(|resolve, _reject| {
    ///     resolve(Value::Int(7));
    ///     Ok(())
    /// });
    /// let Value::Object(obj) = &v else { unreachable!() };
    /// assert!(matches!(obj.then_member(), Ok(ThenProbe::Callable(_))));
    /// ```
    pub fn thenable<F>(then: F) -> Value
    where
        F: Fn(SettleFn, SettleFn) -> Result<(), Value> + Send + Sync + 'static,
    {
        Value::Object(Arc::new(FnThenable {
            then: Arc::new(then),
        }))
    }

    /// A short tag naming the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Promise(_) => "promise",
            Value::Object(_) => "object",
            Value::Fault(_) => "fault",
        }
    }

    /// The integer payload, if this is an [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The string payload, if this is a [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Fault(a), Value::Fault(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Promise(_) => f.write_str("[promise]"),
            Value::Object(_) => f.write_str("[object]"),
            Value::Fault(e) => write!(f, "{e}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Error> for Value {
    fn from(e: Error) -> Self {
        Value::Fault(e)
    }
}

impl From<Promise> for Value {
    fn from(p: Promise) -> Self {
        Value::Promise(p)
    }
}

struct FnThenable {
    then: ThenFn,
}

impl fmt::Debug for FnThenable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnThenable")
    }
}

impl ObjectLike for FnThenable {
    fn then_member(&self) -> Result<ThenProbe, Value> {
        Ok(ThenProbe::Callable(self.then.clone()))
    }
}
