//! Positional view over the arguments of a native call.

use mlua::{MultiValue, Value as LuaValue};

use crate::error::{Error, Result};
use crate::lua::{Context, Value, ValueKind};

/// The arguments a script passed to a host function.
///
/// The count is fixed when the call starts.  Positions are 1-based; negative
/// positions count back from the last argument.
pub struct ScriptArguments {
    ctx: Context,
    frame: Vec<LuaValue>,
}

impl ScriptArguments {
    pub(crate) fn new(ctx: Context, frame: MultiValue) -> Self {
        ScriptArguments { ctx, frame: frame.into_vec() }
    }

    pub fn count(&self) -> usize {
        self.frame.len()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Type of the argument at `index` without materializing it.
    pub fn kind(&self, index: i32) -> Result<ValueKind> {
        ValueKind::of(self.raw(index)?)
    }

    /// The argument at `index`.
    pub fn at(&self, index: i32) -> Result<Value> {
        let raw = self.raw(index)?.clone();
        self.ctx.from_raw(raw)
    }

    /// Every argument, in order.
    pub fn collect(&self) -> Result<Vec<Value>> {
        self.frame.iter().map(|raw| self.ctx.from_raw(raw.clone())).collect()
    }

    fn raw(&self, index: i32) -> Result<&LuaValue> {
        let count = self.frame.len();
        let slot = match index {
            i if i > 0 => i as usize - 1,
            i if i < 0 && (i.unsigned_abs() as usize) <= count => count - i.unsigned_abs() as usize,
            _ => return Err(Error::ArgumentIndex { index, count }),
        };
        self.frame.get(slot).ok_or(Error::ArgumentIndex { index, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ctx: &Context, values: &[Value]) -> ScriptArguments {
        let raw = values.iter().map(|v| ctx.to_raw(v).unwrap()).collect();
        ScriptArguments::new(ctx.clone(), MultiValue::from_vec(raw))
    }

    #[test]
    fn positive_and_negative_positions() {
        let ctx = Context::new();
        let args = frame(&ctx, &[Value::from("main"), Value::Number(2.0), Value::Nil]);
        assert_eq!(args.count(), 3);
        assert_eq!(args.at(1).unwrap(), Value::from("main"));
        assert_eq!(args.at(-1).unwrap(), Value::Nil);
        assert_eq!(args.at(-3).unwrap(), Value::from("main"));
        assert_eq!(args.kind(2).unwrap(), ValueKind::Number);
    }

    #[test]
    fn out_of_range_is_a_usage_error() {
        let ctx = Context::new();
        let args = frame(&ctx, &[Value::Boolean(true)]);
        for index in [0, 2, -2] {
            assert!(matches!(args.at(index), Err(Error::ArgumentIndex { count: 1, .. })));
        }
        assert_eq!(
            args.kind(5).unwrap_err().to_string(),
            "argument 5 is out of range, only 1 arguments were provided"
        );
    }

    #[test]
    fn collect_preserves_order() {
        let ctx = Context::new();
        let values = vec![Value::from("a"), Value::Boolean(false), Value::Number(1.5)];
        assert_eq!(frame(&ctx, &values).collect().unwrap(), values);
        assert!(frame(&ctx, &[]).collect().unwrap().is_empty());
    }
}
