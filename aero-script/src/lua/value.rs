//! Host-side view of every value that can cross the Lua boundary.
//!
//! Lua 5.4 distinguishes integers from floats; the host does not.  Both are
//! read as [`Value::Number`] and integer views truncate toward zero.

use std::fmt;

use mlua::Value as LuaValue;

use super::handle::{Function, Table};
use crate::error::{Error, Result};

// ── ValueKind ─────────────────────────────────────────────────────────────────

/// The runtime type tag of a Lua value the host knows how to represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    String,
    Boolean,
    Nil,
    Table,
    Function,
}

impl ValueKind {
    /// The name Lua's own `type()` uses for this kind.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Number   => "number",
            ValueKind::String   => "string",
            ValueKind::Boolean  => "boolean",
            ValueKind::Nil      => "nil",
            ValueKind::Table    => "table",
            ValueKind::Function => "function",
        }
    }

    /// Classify a raw interpreter value.
    ///
    /// Userdata, threads, light userdata and anything else mlua hands back
    /// are an embedding gap and fail with [`Error::Unsupported`].
    pub(crate) fn of(raw: &LuaValue) -> Result<Self> {
        match raw {
            LuaValue::Nil => Ok(ValueKind::Nil),
            LuaValue::Boolean(_) => Ok(ValueKind::Boolean),
            LuaValue::Integer(_) | LuaValue::Number(_) => Ok(ValueKind::Number),
            LuaValue::String(_) => Ok(ValueKind::String),
            LuaValue::Table(_) => Ok(ValueKind::Table),
            LuaValue::Function(_) => Ok(ValueKind::Function),
            other => Err(Error::Unsupported(other.type_name())),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Value ─────────────────────────────────────────────────────────────────────

/// A value read off (or about to be pushed onto) the interpreter stack.
///
/// Composite variants are registry-backed proxies, not copies: two
/// `Value::Table`s may refer to the same Lua table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Nil,
    Table(Table),
    Function(Function),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Number(_)   => ValueKind::Number,
            Value::String(_)   => ValueKind::String,
            Value::Boolean(_)  => ValueKind::Boolean,
            Value::Nil         => ValueKind::Nil,
            Value::Table(_)    => ValueKind::Table,
            Value::Function(_) => ValueKind::Function,
        }
    }

    /// Type name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        self.kind().name()
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The number truncated toward zero.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(n.trunc() as i64),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Value::Table(t)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

/// `None` crosses the boundary as `nil`.
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

// ── FromValue ─────────────────────────────────────────────────────────────────

/// Simple host types a script value can be cast to.
///
/// Casting is strict: no string-to-number or truthiness coercion.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
