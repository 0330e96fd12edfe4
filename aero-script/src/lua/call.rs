//! Call protocol in both directions.
//!
//! Host → script: [`Context::call`] snapshots the stack depth, pushes the
//! function and its arguments, runs a protected call and classifies the
//! results by how much the stack grew.
//!
//! Script → host: [`Context::create_function`] wraps a Rust closure so that
//! Lua can call it.  The wrapper validates arguments against an optional
//! schema and is the only place where a host-side failure is turned into a
//! raised Lua error.

use mlua::{Lua, MultiValue, Value as LuaValue};
use tracing::{debug, trace};

use super::context::Context;
use super::handle::Function;
use super::value::Value;
use crate::error::{lua_message, Error, Result};
use crate::script::args::ScriptArguments;
use crate::script::schema::FunctionParameterType;

// ── CallResult ────────────────────────────────────────────────────────────────

/// Outcome of a call in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    NoValue,
    Single(Value),
    Multiple(Vec<Value>),
    /// The call failed.  Calling a script this carries the raised message;
    /// returned from a host body it is raised as a Lua error.
    Error(String),
}

impl CallResult {
    /// First returned value, if any.
    pub fn first(&self) -> Option<&Value> {
        match self {
            CallResult::Single(v) => Some(v),
            CallResult::Multiple(vs) => vs.first(),
            CallResult::NoValue | CallResult::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CallResult::Error(_))
    }

    /// All returned values in order; an error becomes [`Error::Runtime`].
    pub fn into_values(self) -> Result<Vec<Value>> {
        match self {
            CallResult::NoValue => Ok(Vec::new()),
            CallResult::Single(v) => Ok(vec![v]),
            CallResult::Multiple(vs) => Ok(vs),
            CallResult::Error(msg) => Err(Error::Runtime(msg)),
        }
    }
}

// ── Host → script ─────────────────────────────────────────────────────────────

impl Context {
    /// Call `function` with `args` in protected mode.
    ///
    /// The stack is left exactly as deep as it was before the call whatever
    /// the outcome.
    pub fn call(&self, function: &Function, args: &[Value]) -> Result<CallResult> {
        let before = self.stack_size();

        self.push(&Value::Function(function.clone()))?;
        for (pushed, arg) in args.iter().enumerate() {
            if let Err(e) = self.push(arg) {
                self.remove(pushed + 1)?;
                return Err(e);
            }
        }

        if !self.pcall(args.len())? {
            let message = self.pop()?;
            let message = match message {
                Value::String(s) => s,
                other => other.describe().to_owned(),
            };
            trace!(context = %self.id(), "call failed: {message}");
            return Ok(CallResult::Error(message));
        }

        let returned = self.stack_size() - before;
        match returned {
            0 => Ok(CallResult::NoValue),
            1 => Ok(CallResult::Single(self.pop()?)),
            n => {
                // Results sit in call order: the first one deepest.
                let values: Result<Vec<Value>> =
                    (1..=n).rev().map(|depth| self.read_at(-(depth as i32))).collect();
                self.remove(n)?;
                Ok(CallResult::Multiple(values?))
            }
        }
    }
}

// ── Script → host ─────────────────────────────────────────────────────────────

impl Context {
    /// Expose `body` to Lua as a function.
    ///
    /// `name` prefixes every error the function raises.  When `expected` is
    /// given the arguments are validated first and the body is skipped on a
    /// mismatch.
    pub fn create_function<F>(
        &self,
        name: impl Into<String>,
        expected: Option<Vec<FunctionParameterType>>,
        body: F,
    ) -> Result<Function>
    where
        F: Fn(&ScriptArguments) -> Result<CallResult> + 'static,
    {
        let name = name.into();
        let function = self.lua().create_function(move |lua: &Lua, frame: MultiValue| {
            let ctx = Context::from_lua(lua).map_err(|e| raise(&name, &e.to_string()))?;
            let args = ScriptArguments::new(ctx.clone(), frame);

            if let Some(expected) = &expected {
                if let Err(msg) = args.check_arguments(expected) {
                    return Err(raise(&name, &msg));
                }
            }

            let values = match body(&args) {
                Ok(CallResult::NoValue) => Vec::new(),
                Ok(CallResult::Single(v)) => vec![v],
                Ok(CallResult::Multiple(vs)) => vs,
                Ok(CallResult::Error(msg)) => return Err(raise(&name, &msg)),
                Err(Error::Lua(e)) => return Err(raise(&name, &lua_message(&e))),
                Err(e) => return Err(raise(&name, &e.to_string())),
            };
            for (pushed, v) in values.iter().enumerate() {
                if let Err(e) = ctx.push(v) {
                    if let Err(cleanup) = ctx.remove(pushed) {
                        debug!(context = %ctx.id(), "failed to drop partial results: {cleanup}");
                    }
                    return Err(raise(&name, &e.to_string()));
                }
            }
            ctx.take_top(values.len()).map_err(|e| raise(&name, &e.to_string()))
        })?;
        self.push_raw(LuaValue::Function(function));
        Function::ref_and_pop(self)
    }
}

fn raise(name: &str, message: &str) -> mlua::Error {
    mlua::Error::RuntimeError(format!("{name}: {message}"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
