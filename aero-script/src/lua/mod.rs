//! Embedding layer around a Lua 5.4 interpreter (via `mlua`).
//!
//! | Piece                 | Type                                    |
//! |-----------------------|-----------------------------------------|
//! | interpreter + stack   | [`Context`]                             |
//! | boundary values       | [`Value`], [`ValueKind`], [`FromValue`] |
//! | registry handles      | [`Table`], [`Function`]                 |
//! | calls, both ways      | [`Context::call`], [`Context::create_function`], [`CallResult`] |
//!
//! Everything here is single-threaded: `Context`, its handles and the
//! closures registered into it are `!Send`.

pub mod call;
pub mod context;
pub mod handle;
pub mod value;

pub use call::CallResult;
pub use context::{Context, ContextId};
pub use handle::{Function, Table};
pub use value::{FromValue, Value, ValueKind};
