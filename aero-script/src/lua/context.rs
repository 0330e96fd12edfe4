//! The VM context: one Lua interpreter plus the value stack every other
//! component is expressed in terms of.
//!
//! mlua keeps the native Lua stack to itself, so the context keeps its own
//! stack of raw interpreter values with Lua's indexing rules (`1` is the
//! bottom, `-1` the top).  Host code stages values here before a call and
//! reads results back from here afterwards.  Every push must be matched by a
//! pop or an explicit [`Context::remove`] before control returns to the
//! caller.
//!
//! A context is single-threaded.  Clones share the interpreter and the stack.

use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use mlua::{Lua, MultiValue, RegistryKey, Value as LuaValue};
use tracing::debug;

use super::handle::{Function, Handle, Table};
use super::value::{Value, ValueKind};
use crate::error::{lua_message, Error, Result};

// ── ContextId ─────────────────────────────────────────────────────────────────

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one interpreter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Context ───────────────────────────────────────────────────────────────────

/// Stored as Lua app data so native callbacks, which only receive `&Lua`,
/// can find their way back to the owning context.
struct ContextState {
    id: ContextId,
    stack: RefCell<Vec<LuaValue>>,
}

#[derive(Clone)]
pub struct Context {
    lua: Lua,
    state: Rc<ContextState>,
}

impl Context {
    /// Create a new interpreter with the safe standard libraries loaded.
    pub fn new() -> Self {
        Self::attach(Lua::new())
    }

    fn attach(lua: Lua) -> Self {
        let state = Rc::new(ContextState {
            id: ContextId::next(),
            stack: RefCell::new(Vec::new()),
        });
        lua.set_app_data(Rc::clone(&state));
        Context { lua, state }
    }

    /// Recover the context that owns `lua`.
    pub(crate) fn from_lua(lua: &Lua) -> Result<Self> {
        let state = lua
            .app_data_ref::<Rc<ContextState>>()
            .map(|state| Rc::clone(&state))
            .ok_or(Error::StaleHandle)?;
        Ok(Context { lua: lua.clone(), state })
    }

    /// Release this handle on the interpreter.  The interpreter itself goes
    /// away once the last clone is dropped; handles created from it then
    /// report [`Error::StaleHandle`].
    pub fn close(self) {
        debug!(context = %self.id(), "closing Lua context");
    }

    /// Replace the interpreter with a fresh one: empty stack, empty globals,
    /// standard libraries reloaded.  Every [`Table`] and [`Function`] obtained
    /// before the reload is invalidated.
    pub fn reload(&mut self) {
        let old = self.id();
        *self = Context::new();
        debug!(old = %old, new = %self.id(), "reloaded Lua context");
    }

    pub fn id(&self) -> ContextId {
        self.state.id
    }

    pub(crate) fn lua(&self) -> &Lua {
        &self.lua
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    /// Compile a file into a function without running it.
    pub fn load_file(&self, path: &Path) -> Result<Function> {
        let source = std::fs::read_to_string(path)?;
        self.load_chunk(&source, &format!("@{}", path.display()))
    }

    /// Compile source text into a function without running it.
    pub fn load_source(&self, code: &str) -> Result<Function> {
        self.load_chunk(code, "=(load)")
    }

    fn load_chunk(&self, code: &str, name: &str) -> Result<Function> {
        match self.lua.load(code).set_name(name).into_function() {
            Ok(function) => {
                self.push_raw(LuaValue::Function(function));
                Function::ref_and_pop(self)
            }
            Err(err) => Err(Error::Load(lua_message(&err))),
        }
    }

    // ── Globals ───────────────────────────────────────────────────────────────

    pub fn set_global(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.push(&value.into())?;
        let raw = self.pop_raw()?;
        self.lua.globals().set(name, raw)?;
        Ok(())
    }

    pub fn get_global(&self, name: &str) -> Result<Value> {
        let raw: LuaValue = self.lua.globals().get(name)?;
        self.push_raw(raw);
        self.pop()
    }

    // ── Stack primitives ──────────────────────────────────────────────────────

    pub fn stack_size(&self) -> usize {
        self.state.stack.borrow().len()
    }

    /// Push a host value.  Tables and functions are fetched from the
    /// registry, not re-serialized.
    pub fn push(&self, value: &Value) -> Result<()> {
        let raw = self.to_raw(value)?;
        self.push_raw(raw);
        Ok(())
    }

    /// Pop the top value.  The slot is removed even when the value cannot
    /// be represented.
    pub fn pop(&self) -> Result<Value> {
        let raw = self.pop_raw()?;
        self.from_raw(raw)
    }

    /// Drop the top `n` values.
    pub fn remove(&self, n: usize) -> Result<()> {
        let mut stack = self.state.stack.borrow_mut();
        if n > stack.len() {
            return Err(Error::StackIndex { index: -(n as i32), size: stack.len() });
        }
        let keep = stack.len() - n;
        stack.truncate(keep);
        Ok(())
    }

    /// Drop everything above `depth`.  A no-op when the stack is already
    /// that shallow.
    pub(crate) fn truncate(&self, depth: usize) {
        self.state.stack.borrow_mut().truncate(depth);
    }

    /// Read the value at `index`.  Table and function slots are registered
    /// anew on every call, so repeated reads give equal but distinct handles.
    pub fn read_at(&self, index: i32) -> Result<Value> {
        let raw = self.raw_at(index)?;
        self.from_raw(raw)
    }

    /// Type tag of the value at `index`, without materializing it.
    pub fn type_at(&self, index: i32) -> Result<ValueKind> {
        ValueKind::of(&self.raw_at(index)?)
    }

    /// Pin the top value in the registry and pop it.
    pub fn register_top(&self) -> Result<RegistryKey> {
        let raw = self.pop_raw()?;
        Ok(self.lua.create_registry_value(raw)?)
    }

    /// Pin the value at `index` in the registry, leaving the stack as is.
    pub fn register_at(&self, index: i32) -> Result<RegistryKey> {
        let raw = self.raw_at(index)?;
        Ok(self.lua.create_registry_value(raw)?)
    }

    pub fn unregister(&self, key: RegistryKey) -> Result<()> {
        Ok(self.lua.remove_registry_value(key)?)
    }

    // ── Table primitives ──────────────────────────────────────────────────────

    /// Push a new empty table.
    pub fn create_table(&self) -> Result<()> {
        let table = self.lua.create_table()?;
        self.push_raw(LuaValue::Table(table));
        Ok(())
    }

    /// `[.. t .. k]` → `[.. t .. t[k]]`, where `t` is at `index`.
    pub fn get_table(&self, index: i32) -> Result<()> {
        let table = self.table_at(index)?;
        let key = self.pop_raw()?;
        let value: LuaValue = table.get(key)?;
        self.push_raw(value);
        Ok(())
    }

    /// `[.. t .. k v]` → `[.. t ..]` after `t[k] = v`.
    pub fn set_table(&self, index: i32) -> Result<()> {
        let table = self.table_at(index)?;
        let value = self.pop_raw()?;
        let key = self.pop_raw()?;
        table.set(key, value)?;
        Ok(())
    }

    /// Push `t[name]`, where `t` is at `index`.
    pub fn get_field(&self, index: i32, name: &str) -> Result<()> {
        let table = self.table_at(index)?;
        let value: LuaValue = table.get(name)?;
        self.push_raw(value);
        Ok(())
    }

    /// Pop a value and store it as `t[name]`, where `t` is at `index`.
    pub fn set_field(&self, index: i32, name: &str) -> Result<()> {
        let table = self.table_at(index)?;
        let value = self.pop_raw()?;
        table.set(name, value)?;
        Ok(())
    }

    // ── Calls ─────────────────────────────────────────────────────────────────

    /// Protected call of the function sitting below `nargs` arguments.
    ///
    /// Function and arguments are popped.  On success the results are
    /// pushed in order and `true` is returned; on failure the error message
    /// is pushed as a string and `false` is returned.
    pub fn pcall(&self, nargs: usize) -> Result<bool> {
        let (function, args) = {
            let mut stack = self.state.stack.borrow_mut();
            if nargs + 1 > stack.len() {
                return Err(Error::StackIndex { index: -((nargs + 1) as i32), size: stack.len() });
            }
            let at = stack.len() - nargs;
            let args = stack.split_off(at);
            let function = stack.pop();
            (function, args)
        };
        let function = match function {
            Some(LuaValue::Function(f)) => f,
            Some(other) => {
                return Err(Error::Type { expected: ValueKind::Function, actual: ValueKind::of(&other)? })
            }
            None => return Err(Error::StackIndex { index: -1, size: 0 }),
        };

        // No stack borrow is held here: the callee may re-enter the host.
        match function.call::<MultiValue>(MultiValue::from_vec(args)) {
            Ok(results) => {
                self.state.stack.borrow_mut().extend(results);
                Ok(true)
            }
            Err(err) => {
                let message = self.lua.create_string(lua_message(&err))?;
                self.push_raw(LuaValue::String(message));
                Ok(false)
            }
        }
    }

    /// Pop the top `n` values as the result list of a native callback.
    pub(crate) fn take_top(&self, n: usize) -> Result<MultiValue> {
        let mut stack = self.state.stack.borrow_mut();
        if n > stack.len() {
            return Err(Error::StackIndex { index: -(n as i32), size: stack.len() });
        }
        let at = stack.len() - n;
        Ok(MultiValue::from_vec(stack.split_off(at)))
    }

    // ── Raw conversion ────────────────────────────────────────────────────────

    pub(crate) fn to_raw(&self, value: &Value) -> Result<LuaValue> {
        Ok(match value {
            Value::Number(n) => number_to_raw(*n),
            Value::String(s) => LuaValue::String(self.lua.create_string(s)?),
            Value::Boolean(b) => LuaValue::Boolean(*b),
            Value::Nil => LuaValue::Nil,
            Value::Table(t) => self.resolve(t.handle())?,
            Value::Function(f) => self.resolve(f.handle())?,
        })
    }

    pub(crate) fn from_raw(&self, raw: LuaValue) -> Result<Value> {
        match raw {
            LuaValue::Nil => Ok(Value::Nil),
            LuaValue::Boolean(b) => Ok(Value::Boolean(b)),
            LuaValue::Integer(i) => Ok(Value::Number(i as f64)),
            LuaValue::Number(n) => Ok(Value::Number(n)),
            LuaValue::String(s) => Ok(Value::String(s.to_string_lossy())),
            raw @ LuaValue::Table(_) => {
                let key = self.lua.create_registry_value(raw)?;
                Ok(Value::Table(Table::from_handle(Handle::new(self, key)?)))
            }
            raw @ LuaValue::Function(_) => {
                let key = self.lua.create_registry_value(raw)?;
                Ok(Value::Function(Function::from_handle(Handle::new(self, key)?)))
            }
            other => Err(Error::Unsupported(other.type_name())),
        }
    }

    fn resolve(&self, handle: &Handle) -> Result<LuaValue> {
        if handle.context_id() != self.id() {
            return Err(Error::ForeignHandle);
        }
        Ok(self.lua.registry_value::<LuaValue>(handle.key()?)?)
    }

    pub(crate) fn push_raw(&self, raw: LuaValue) {
        self.state.stack.borrow_mut().push(raw);
    }

    fn pop_raw(&self) -> Result<LuaValue> {
        self.state
            .stack
            .borrow_mut()
            .pop()
            .ok_or(Error::StackIndex { index: -1, size: 0 })
    }

    /// Convert a Lua-style index to a 0-based slot.
    fn slot(&self, index: i32) -> Result<usize> {
        let size = self.stack_size();
        let slot = if index > 0 {
            index as usize - 1
        } else if index < 0 && index.unsigned_abs() as usize <= size {
            size - index.unsigned_abs() as usize
        } else {
            return Err(Error::StackIndex { index, size });
        };
        if slot >= size {
            return Err(Error::StackIndex { index, size });
        }
        Ok(slot)
    }

    fn raw_at(&self, index: i32) -> Result<LuaValue> {
        let slot = self.slot(index)?;
        Ok(self.state.stack.borrow()[slot].clone())
    }

    fn table_at(&self, index: i32) -> Result<mlua::Table> {
        match self.raw_at(index)? {
            LuaValue::Table(t) => Ok(t),
            other => Err(Error::Type { expected: ValueKind::Table, actual: ValueKind::of(&other)? }),
        }
    }
}

/// Integral numbers go in as Lua integers so scripts print `42`, not `42.0`.
fn number_to_raw(n: f64) -> LuaValue {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        LuaValue::Integer(n as i64)
    } else {
        LuaValue::Number(n)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id())
            .field("stack_size", &self.stack_size())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip() {
        let ctx = Context::new();
        for v in [
            Value::Number(3.5),
            Value::String("x".into()),
            Value::Boolean(true),
            Value::Nil,
        ] {
            ctx.push(&v).unwrap();
            assert_eq!(ctx.read_at(-1).unwrap(), v);
            assert_eq!(ctx.pop().unwrap(), v);
        }
        assert_eq!(ctx.stack_size(), 0);
    }

    #[test]
    fn positive_and_negative_indices() {
        let ctx = Context::new();
        ctx.push(&Value::Number(1.0)).unwrap();
        ctx.push(&Value::Number(2.0)).unwrap();
        ctx.push(&Value::Number(3.0)).unwrap();
        assert_eq!(ctx.read_at(1).unwrap(), Value::Number(1.0));
        assert_eq!(ctx.read_at(-1).unwrap(), Value::Number(3.0));
        assert_eq!(ctx.read_at(-3).unwrap(), Value::Number(1.0));
        assert!(matches!(ctx.read_at(4), Err(Error::StackIndex { .. })));
        assert!(matches!(ctx.read_at(-4), Err(Error::StackIndex { .. })));
        assert!(matches!(ctx.read_at(0), Err(Error::StackIndex { .. })));
        ctx.remove(3).unwrap();
        assert_eq!(ctx.stack_size(), 0);
    }

    #[test]
    fn remove_more_than_size_is_an_error() {
        let ctx = Context::new();
        ctx.push(&Value::Nil).unwrap();
        assert!(ctx.remove(2).is_err());
        assert_eq!(ctx.stack_size(), 1);
    }

    #[test]
    fn integers_from_lua_read_as_numbers() {
        let ctx = Context::new();
        let f = ctx.load_source("return 42").unwrap();
        ctx.push(&Value::Function(f)).unwrap();
        assert!(ctx.pcall(0).unwrap());
        assert_eq!(ctx.pop().unwrap(), Value::Number(42.0));
    }

    #[test]
    fn integral_numbers_print_without_fraction() {
        let ctx = Context::new();
        ctx.set_global("n", 42i64).unwrap();
        ctx.set_global("x", 2.5).unwrap();
        let f = ctx.load_source("return tostring(n) .. ' ' .. tostring(x)").unwrap();
        ctx.push(&Value::Function(f)).unwrap();
        assert!(ctx.pcall(0).unwrap());
        assert_eq!(ctx.pop().unwrap(), Value::from("42 2.5"));
    }

    #[test]
    fn globals_round_trip() {
        let ctx = Context::new();
        ctx.set_global("answer", 42i64).unwrap();
        assert_eq!(ctx.get_global("answer").unwrap(), Value::Number(42.0));
        assert_eq!(ctx.get_global("missing").unwrap(), Value::Nil);
        assert_eq!(ctx.stack_size(), 0);
    }

    #[test]
    fn syntax_error_leaves_stack_untouched() {
        let ctx = Context::new();
        ctx.push(&Value::Boolean(false)).unwrap();
        let err = ctx.load_source("return +").unwrap_err();
        assert!(matches!(err, Error::Load(_)));
        assert_eq!(ctx.stack_size(), 1);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let ctx = Context::new();
        let err = ctx.load_file(Path::new("/nonexistent/init.lua")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn coroutine_is_unsupported() {
        let ctx = Context::new();
        ctx.push(&Value::Function(ctx.load_source("return coroutine.create(function() end)").unwrap()))
            .unwrap();
        assert!(ctx.pcall(0).unwrap());
        assert_eq!(ctx.type_at(-1).unwrap_err().to_string(), "unsupported Lua value kind: thread");
        assert!(matches!(ctx.pop(), Err(Error::Unsupported("thread"))));
        assert_eq!(ctx.stack_size(), 0);
    }

    #[test]
    fn table_primitives() {
        let ctx = Context::new();
        ctx.create_table().unwrap();
        ctx.push(&Value::from("k")).unwrap();
        ctx.push(&Value::from(7i64)).unwrap();
        ctx.set_table(-3).unwrap();
        assert_eq!(ctx.stack_size(), 1);

        ctx.get_field(-1, "k").unwrap();
        assert_eq!(ctx.pop().unwrap(), Value::Number(7.0));

        ctx.push(&Value::from("v")).unwrap();
        ctx.set_field(-2, "s").unwrap();
        ctx.push(&Value::from("s")).unwrap();
        ctx.get_table(-2).unwrap();
        assert_eq!(ctx.pop().unwrap(), Value::from("v"));
        ctx.remove(1).unwrap();
        assert_eq!(ctx.stack_size(), 0);
    }

    #[test]
    fn registry_keys_pin_values() {
        let ctx = Context::new();
        ctx.push(&Value::from("pinned")).unwrap();
        let at = ctx.register_at(-1).unwrap();
        assert_eq!(ctx.stack_size(), 1);
        let top = ctx.register_top().unwrap();
        assert_eq!(ctx.stack_size(), 0);
        let v: String = ctx.lua().registry_value(&top).unwrap();
        assert_eq!(v, "pinned");
        ctx.unregister(at).unwrap();
        ctx.unregister(top).unwrap();
    }

    #[test]
    fn reload_gives_a_new_identity() {
        let mut ctx = Context::new();
        ctx.set_global("x", 1i64).unwrap();
        ctx.push(&Value::Nil).unwrap();
        let before = ctx.id();
        ctx.reload();
        assert_ne!(ctx.id(), before);
        assert_eq!(ctx.stack_size(), 0);
        assert_eq!(ctx.get_global("x").unwrap(), Value::Nil);
        // standard libraries are back
        assert!(matches!(ctx.get_global("string").unwrap(), Value::Table(_)));
    }
}
