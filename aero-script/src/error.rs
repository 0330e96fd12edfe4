//! Crate-wide error type.
//!
//! Load and runtime errors are recoverable and flow back to whoever asked
//! for the load or call.  [`Error::Unsupported`] and [`Error::Config`] mark a
//! broken embedding or a broken user script that the host must surface
//! immediately; the `aero-script` binary exits on them.

use thiserror::Error;

use crate::lua::ValueKind;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A chunk failed to compile.  The message is the interpreter's own.
    #[error("{0}")]
    Load(String),

    /// A protected call failed.
    #[error("{0}")]
    Runtime(String),

    /// The interpreter produced a value kind the host cannot represent.
    #[error("unsupported Lua value kind: {0}")]
    Unsupported(&'static str),

    #[error("expected {expected}, got {actual}")]
    Type { expected: ValueKind, actual: ValueKind },

    #[error("stack index {index} is out of range (stack size {size})")]
    StackIndex { index: i32, size: usize },

    #[error("argument {index} is out of range, only {count} arguments were provided")]
    ArgumentIndex { index: i32, count: usize },

    /// The interpreter that owned this handle was closed or reloaded.
    #[error("handle refers to an interpreter that no longer exists")]
    StaleHandle,

    /// A handle was used with a context other than the one that created it.
    #[error("handle belongs to a different Lua context")]
    ForeignHandle,

    /// A dynamic configuration value could not be evaluated.
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    Lua(#[from] mlua::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the embedding itself is broken.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Unsupported(_) | Error::Config(_))
    }
}

/// Extract the human-readable message from an interpreter error, looking
/// through the callback wrappers mlua adds around host-raised errors.
pub(crate) fn lua_message(err: &mlua::Error) -> String {
    match err {
        mlua::Error::RuntimeError(msg) => without_traceback(msg).to_owned(),
        mlua::Error::SyntaxError { message, .. } => message.clone(),
        mlua::Error::CallbackError { cause, .. } => lua_message(cause),
        other => without_traceback(&other.to_string()).to_owned(),
    }
}

/// mlua appends a `stack traceback:` block to errors raised inside protected
/// calls; scripts and callers only see the raised text.
fn without_traceback(msg: &str) -> &str {
    msg.split_once("\nstack traceback:").map_or(msg, |(head, _)| head)
}
