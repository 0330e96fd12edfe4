//! The window manager as seen from the scripting layer.
//!
//! The tiling tree, the command parser and command execution live on the
//! host side of [`Host`].  [`RecordingHost`] answers lookups from canned
//! data and records what it is asked to run; the `aero-script` binary and
//! the tests use it.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::keymap::Mode;

// ── Boundary types ────────────────────────────────────────────────────────────

/// A command the host has parsed and knows how to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub args: Vec<String>,
}

impl ParsedCommand {
    pub fn new<S: Into<String>>(args: impl IntoIterator<Item = S>) -> Self {
        ParsedCommand { args: args.into_iter().map(Into::into).collect() }
    }

    pub fn name(&self) -> &str {
        self.args.first().map_or("", String::as_str)
    }
}

/// Where a command runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CmdEnv {
    pub window_id: Option<u32>,
    pub workspace_name: Option<String>,
    pub pwd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub title: String,
    pub app_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceName {
    Focused,
    Named(String),
}

impl WorkspaceName {
    /// `"focused"` is reserved for the focused workspace.
    pub fn parse(name: &str) -> Self {
        if name == "focused" {
            WorkspaceName::Focused
        } else {
            WorkspaceName::Named(name.to_owned())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkspaceInfo {
    pub leaf_window_count: usize,
}

/// A newly detected window, matched against `on_window_detected` callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetectedWindow {
    pub id: u32,
    pub app_id: Option<String>,
    pub app_name: Option<String>,
    pub title: String,
    pub workspace: Option<String>,
}

// ── Host ──────────────────────────────────────────────────────────────────────

/// Operations the scripting layer consumes from the window manager.
///
/// All calls happen on the thread that owns the Lua context, synchronously,
/// from inside a script call.
pub trait Host {
    fn parse_command(&self, args: &[String]) -> Result<ParsedCommand, String>;

    fn run_command(&self, command: &ParsedCommand, env: &CmdEnv) -> CommandOutput;

    fn lookup_window(&self, id: u32) -> Option<WindowInfo>;

    fn lookup_workspace(&self, name: &WorkspaceName) -> WorkspaceInfo;

    /// Re-register the global hotkeys of `mode`, replacing the current ones.
    fn apply_bindings(&self, mode: &Mode);
}

// ── RecordingHost ─────────────────────────────────────────────────────────────

/// A [`Host`] with canned lookups that records every command and mode
/// change instead of acting on them.
#[derive(Debug, Default)]
pub struct RecordingHost {
    windows: HashMap<u32, WindowInfo>,
    workspaces: HashMap<String, usize>,
    focused_workspace: String,
    /// Command names `parse_command` rejects.
    unknown: Vec<String>,
    outputs: HashMap<String, CommandOutput>,
    executed: RefCell<Vec<(ParsedCommand, CmdEnv)>>,
    applied: RefCell<Vec<Mode>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, id: u32, title: &str, app_name: Option<&str>) -> Self {
        self.windows.insert(
            id,
            WindowInfo { title: title.to_owned(), app_name: app_name.map(str::to_owned) },
        );
        self
    }

    pub fn with_workspace(mut self, name: &str, leaf_window_count: usize) -> Self {
        self.workspaces.insert(name.to_owned(), leaf_window_count);
        self
    }

    pub fn with_focused_workspace(mut self, name: &str) -> Self {
        self.focused_workspace = name.to_owned();
        self
    }

    /// Make `parse_command` reject commands named `name`.
    pub fn rejecting(mut self, name: &str) -> Self {
        self.unknown.push(name.to_owned());
        self
    }

    /// Canned output for commands named `name`.
    pub fn with_output(mut self, name: &str, output: CommandOutput) -> Self {
        self.outputs.insert(name.to_owned(), output);
        self
    }

    pub fn executed(&self) -> Vec<(ParsedCommand, CmdEnv)> {
        self.executed.borrow().clone()
    }

    /// Names of the modes whose bindings were applied, oldest first.
    pub fn applied_modes(&self) -> Vec<String> {
        self.applied.borrow().iter().map(|m| m.name.clone()).collect()
    }

    pub fn last_applied(&self) -> Option<Mode> {
        self.applied.borrow().last().cloned()
    }
}

impl Host for RecordingHost {
    fn parse_command(&self, args: &[String]) -> Result<ParsedCommand, String> {
        let Some(name) = args.first() else {
            return Err("Can't parse empty string command".to_owned());
        };
        if self.unknown.contains(name) {
            return Err(format!("Unrecognized subcommand '{name}'"));
        }
        Ok(ParsedCommand { args: args.to_vec() })
    }

    fn run_command(&self, command: &ParsedCommand, env: &CmdEnv) -> CommandOutput {
        self.executed.borrow_mut().push((command.clone(), env.clone()));
        self.outputs.get(command.name()).cloned().unwrap_or_default()
    }

    fn lookup_window(&self, id: u32) -> Option<WindowInfo> {
        self.windows.get(&id).cloned()
    }

    fn lookup_workspace(&self, name: &WorkspaceName) -> WorkspaceInfo {
        let name = match name {
            WorkspaceName::Focused => &self.focused_workspace,
            WorkspaceName::Named(name) => name,
        };
        WorkspaceInfo { leaf_window_count: self.workspaces.get(name).copied().unwrap_or(0) }
    }

    fn apply_bindings(&self, mode: &Mode) {
        self.applied.borrow_mut().push(mode.clone());
    }
}
