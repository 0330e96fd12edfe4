//! Lua scripting layer for a tiling window manager.
//!
//! [`lua`] is the embedding boundary: values, the interpreter context, its
//! registry handles and the call protocol.  [`script`] builds the `aero`
//! namespaces on top of it and runs the user's `init.lua`; what scripts
//! configure lands in [`config::HostConfig`], and everything the window
//! manager itself provides comes in through [`host::Host`].

pub mod cli;
pub mod command;
pub mod config;
pub mod dynamic;
pub mod error;
pub mod host;
pub mod keymap;
pub mod lua;
pub mod script;

pub use error::{Error, Result};
pub use script::ScriptEngine;
