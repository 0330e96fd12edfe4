//! Registry-backed handles to interpreter-resident tables and functions.
//!
//! A [`Registration`] owns exactly one registry entry and removes it when
//! dropped.  [`Table`] and [`Function`] share their registration through an
//! `Rc`, so cloning a handle never unregisters early and the last clone
//! unregisters exactly once.
//!
//! Handles keep only a weak reference to the interpreter.  Once it is
//! closed or reloaded every operation reports [`Error::StaleHandle`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use mlua::{RegistryKey, Value as LuaValue, WeakLua};
use tracing::debug;

use super::call::CallResult;
use super::context::{Context, ContextId};
use super::value::{Value, ValueKind};
use crate::error::{Error, Result};

// ── Registration ──────────────────────────────────────────────────────────────

struct Registration {
    lua: WeakLua,
    context: ContextId,
    /// Identity of the registered object, stable while it is pinned.
    object: usize,
    key: Option<RegistryKey>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let (Some(key), Some(lua)) = (self.key.take(), self.lua.try_upgrade()) else {
            return;
        };
        if let Err(e) = lua.remove_registry_value(key) {
            debug!(context = %self.context, "failed to unregister handle: {e}");
        }
    }
}

/// Shared ownership of one registry entry.
#[derive(Clone)]
pub(crate) struct Handle(Rc<Registration>);

impl Handle {
    /// Take ownership of `key`, which must have been created by `ctx`.
    pub(crate) fn new(ctx: &Context, key: RegistryKey) -> Result<Self> {
        let object = ctx.lua().registry_value::<LuaValue>(&key)?.to_pointer() as usize;
        Ok(Handle(Rc::new(Registration {
            lua: ctx.lua().weak(),
            context: ctx.id(),
            object,
            key: Some(key),
        })))
    }

    pub(crate) fn context_id(&self) -> ContextId {
        self.0.context
    }

    pub(crate) fn key(&self) -> Result<&RegistryKey> {
        self.0.key.as_ref().ok_or(Error::StaleHandle)
    }

    /// The context this handle was created in, if it is still alive.
    pub(crate) fn context(&self) -> Result<Context> {
        let lua = self.0.lua.try_upgrade().ok_or(Error::StaleHandle)?;
        let ctx = Context::from_lua(&lua)?;
        if ctx.id() != self.0.context {
            return Err(Error::StaleHandle);
        }
        Ok(ctx)
    }

    /// The integer registry reference, `-1` once unregistered.
    pub(crate) fn registry_id(&self) -> i32 {
        self.0.key.as_ref().map_or(-1, RegistryKey::id)
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.0.context == other.0.context && self.0.object == other.0.object
    }
}

impl Eq for Handle {}

impl Hash for Handle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.context.hash(state);
        self.0.object.hash(state);
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context {} ref {}", self.0.context, self.registry_id())
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// A Lua table pinned in the registry.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Table {
    handle: Handle,
}

impl Table {
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Table { handle }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Create an empty table.
    pub fn new(ctx: &Context) -> Result<Self> {
        ctx.create_table()?;
        Self::ref_and_pop(ctx)
    }

    /// Pin the table on top of the stack and pop it.
    pub fn ref_and_pop(ctx: &Context) -> Result<Self> {
        let actual = ctx.type_at(-1)?;
        if actual != ValueKind::Table {
            return Err(Error::Type { expected: ValueKind::Table, actual });
        }
        let key = ctx.register_top()?;
        Ok(Table::from_handle(Handle::new(ctx, key)?))
    }

    /// Pin the table at `index`, leaving the stack as is.
    pub fn at(ctx: &Context, index: i32) -> Result<Self> {
        let actual = ctx.type_at(index)?;
        if actual != ValueKind::Table {
            return Err(Error::Type { expected: ValueKind::Table, actual });
        }
        let key = ctx.register_at(index)?;
        Ok(Table::from_handle(Handle::new(ctx, key)?))
    }

    pub fn context(&self) -> Result<Context> {
        self.handle.context()
    }

    pub fn get(&self, key: impl Into<Value>) -> Result<Value> {
        let ctx = self.context()?;
        let before = ctx.stack_size();
        let value = ctx.push(&Value::Table(self.clone())).and_then(|()| {
            ctx.push(&key.into())?;
            ctx.get_table(-2)?;
            ctx.pop()
        });
        ctx.truncate(before);
        value
    }

    /// Assigns `t[key] = value`; metamethods apply.
    pub fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let ctx = self.context()?;
        let before = ctx.stack_size();
        let result = ctx.push(&Value::Table(self.clone())).and_then(|()| {
            ctx.push(&key.into())?;
            ctx.push(&value.into())?;
            ctx.set_table(-3)
        });
        ctx.truncate(before);
        result
    }

    pub fn get_field(&self, name: &str) -> Result<Value> {
        let ctx = self.context()?;
        let before = ctx.stack_size();
        let value = ctx.push(&Value::Table(self.clone())).and_then(|()| {
            ctx.get_field(-1, name)?;
            ctx.pop()
        });
        ctx.truncate(before);
        value
    }

    pub fn set_field(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let ctx = self.context()?;
        let before = ctx.stack_size();
        let result = ctx.push(&Value::Table(self.clone())).and_then(|()| {
            ctx.push(&value.into())?;
            ctx.set_field(-2, name)
        });
        ctx.truncate(before);
        result
    }

    /// Type of `t[name]` without registering it when it is a table or
    /// function.
    pub fn field_type(&self, name: &str) -> Result<ValueKind> {
        let ctx = self.context()?;
        let before = ctx.stack_size();
        let kind = ctx.push(&Value::Table(self.clone())).and_then(|()| {
            ctx.get_field(-1, name)?;
            ctx.type_at(-1)
        });
        ctx.truncate(before);
        kind
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({:?})", self.handle)
    }
}

// ── Function ──────────────────────────────────────────────────────────────────

/// A Lua function (script-defined or host-registered) pinned in the
/// registry.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Function {
    handle: Handle,
}

impl Function {
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Function { handle }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Pin the function on top of the stack and pop it.
    pub fn ref_and_pop(ctx: &Context) -> Result<Self> {
        let actual = ctx.type_at(-1)?;
        if actual != ValueKind::Function {
            return Err(Error::Type { expected: ValueKind::Function, actual });
        }
        let key = ctx.register_top()?;
        Ok(Function::from_handle(Handle::new(ctx, key)?))
    }

    pub fn context(&self) -> Result<Context> {
        self.handle.context()
    }

    /// Protected call with `args`; see [`Context::call`].
    pub fn call(&self, args: &[Value]) -> Result<CallResult> {
        self.context()?.call(self, args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({:?})", self.handle)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
