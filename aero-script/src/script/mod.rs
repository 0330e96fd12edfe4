//! The scripting engine: one Lua context with the `aero` API installed,
//! plus everything needed to run the user's `init.lua` and dispatch host
//! events to what it registered.
//!
//! # Script API
//!
//! | Lua                                          | Effect                                   |
//! |----------------------------------------------|------------------------------------------|
//! | `aero.api.command(cmd, ...)`                 | run a host command → `{stdout, stderr, exitCode}` |
//! | `aero.api.activate_mode(mode)`               | switch binding mode                      |
//! | `aero.api.window_get_title(id)`              | window title or nil                      |
//! | `aero.api.window_get_app_name(id)`           | app name or nil                          |
//! | `aero.api.workspace_windows_count(name)`     | leaf windows on a workspace (`"focused"` allowed) |
//! | `aero.api.gap_set(GAP_*, n \| fn)`           | set a gap, constant or computed          |
//! | `aero.callbacks.on_focus_changed(...)`       | commands to run on focus change          |
//! | `aero.callbacks.on_focused_monitor_changed(...)` | commands to run on monitor change    |
//! | `aero.callbacks.on_window_detected(opts, ...)` | commands for matching new windows      |
//! | `aero.config.*`                              | scalar settings                          |
//! | `aero.keymap.set(mode, key, ...)` / `del`    | edit key bindings                        |
//!
//! Commands are host command strings (`"move-node-to-workspace S"`) or Lua
//! functions called with `{ windowID, workspaceName, pwd }`.
//!
//! # Quick start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use aero_script::config::HostConfig;
//! use aero_script::host::RecordingHost;
//! use aero_script::script::ScriptEngine;
//!
//! let config = Rc::new(RefCell::new(HostConfig::default()));
//! let engine = ScriptEngine::new(Rc::new(RecordingHost::new()), Rc::clone(&config)).unwrap();
//! engine.run_source("aero.config.accordion_padding(12)").unwrap();
//! assert_eq!(config.borrow().accordion_padding, 12);
//! ```

pub mod api;
pub mod args;
pub mod callbacks;
pub mod config_api;
pub mod keymap_api;
pub mod schema;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::command::{arg_to_command, Command};
use crate::config::{GapPosition, HostConfig, DEFAULT_MODE};
use crate::dynamic::Monitor;
use crate::error::{Error, Result};
use crate::host::{CmdEnv, DetectedWindow, Host};
use crate::keymap::Mode;
use crate::lua::{CallResult, Context, Table, Value};

pub use args::ScriptArguments;
pub use schema::{FunctionParameterType, Parameter, ParameterType, TableSchema};

// ── HostEnv ───────────────────────────────────────────────────────────────────

/// What every native closure captures: the host and the configuration it
/// writes into.
#[derive(Clone)]
pub(crate) struct HostEnv {
    pub(crate) host: Rc<dyn Host>,
    pub(crate) config: Rc<RefCell<HostConfig>>,
}

impl HostEnv {
    pub(crate) fn activate_mode(&self, name: &str) {
        let mode = {
            let mut cfg = self.config.borrow_mut();
            cfg.active_mode = name.to_owned();
            cfg.modes.get(name).cloned().unwrap_or_else(|| Mode::new(name))
        };
        debug!(mode = name, "activating binding mode");
        self.host.apply_bindings(&mode);
    }

    /// Re-apply bindings if `name` is the active mode.
    pub(crate) fn refresh_if_active(&self, name: &str) {
        let mode = {
            let cfg = self.config.borrow();
            if cfg.active_mode != name {
                return;
            }
            cfg.modes.get(name).cloned().unwrap_or_else(|| Mode::new(name))
        };
        self.host.apply_bindings(&mode);
    }

    /// Arguments `from..=count` as commands.
    pub(crate) fn commands(&self, args: &ScriptArguments, from: usize) -> Result<Vec<Command>> {
        (from..=args.count())
            .map(|i| {
                let arg = args.at(i as i32)?;
                arg_to_command(&*self.host, &arg).map_err(Error::Runtime)
            })
            .collect()
    }
}

// ── ScriptEngine ──────────────────────────────────────────────────────────────

/// Owns the Lua context for the lifetime of the process.
pub struct ScriptEngine {
    ctx: Context,
    env: HostEnv,
    init_path: Option<PathBuf>,
}

impl ScriptEngine {
    /// Create a context and install the `aero` namespaces.  The init script
    /// is not run; see [`ScriptEngine::run_init_file`].
    pub fn new(host: Rc<dyn Host>, config: Rc<RefCell<HostConfig>>) -> Result<Self> {
        let engine = ScriptEngine {
            ctx: Context::new(),
            env: HostEnv { host, config },
            init_path: init_script_path(),
        };
        engine.install()?;
        Ok(engine)
    }

    /// Use `path` as the init script instead of the default location.
    pub fn with_init_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.init_path = Some(path.into());
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn config(&self) -> &Rc<RefCell<HostConfig>> {
        &self.env.config
    }

    pub fn init_path(&self) -> Option<&Path> {
        self.init_path.as_deref()
    }

    fn install(&self) -> Result<()> {
        let aero = Table::new(&self.ctx)?;
        aero.set_field("api", api::create(&self.ctx, &self.env)?)?;
        aero.set_field("callbacks", callbacks::create(&self.ctx, &self.env)?)?;
        aero.set_field("config", config_api::create(&self.ctx, &self.env)?)?;
        aero.set_field("keymap", keymap_api::create(&self.ctx, &self.env)?)?;
        self.ctx.set_global("aero", aero)?;
        debug!(context = %self.ctx.id(), "installed aero namespaces");
        Ok(())
    }

    // ── Running scripts ───────────────────────────────────────────────────────

    /// Load and run the init script.  A missing file is not an error.
    pub fn run_init_file(&self) -> Result<()> {
        let Some(path) = self.init_path.as_deref() else {
            debug!("no init script location could be determined");
            return Ok(());
        };
        if !path.exists() {
            debug!(path = %path.display(), "no init script");
            return Ok(());
        }
        info!(path = %path.display(), "running init script");
        let init = self.ctx.load_file(path)?;
        match init.call(&[])? {
            CallResult::Error(msg) => Err(Error::Runtime(msg)),
            _ => Ok(()),
        }
    }

    /// Compile and run `code`, returning what it returned.
    pub fn run_source(&self, code: &str) -> Result<Vec<Value>> {
        self.ctx.load_source(code)?.call(&[])?.into_values()
    }

    /// Start over: reset the configuration, replace the interpreter, install
    /// the namespaces again, hand the host the empty default mode and re-run
    /// the init script.
    ///
    /// Every [`Table`](crate::lua::Table) and [`Function`](crate::lua::Function)
    /// taken from the old interpreter is stale afterwards.
    pub fn reload(&mut self) -> Result<()> {
        self.env.config.borrow_mut().reset();
        self.ctx.reload();
        self.install()?;
        self.env.activate_mode(DEFAULT_MODE);
        self.run_init_file()
    }

    // ── Events ────────────────────────────────────────────────────────────────

    pub fn fire_focus_changed(&self, env: &CmdEnv) {
        let commands = self.env.config.borrow().on_focus_changed.clone();
        self.run_commands("on-focus-changed", &commands, env);
    }

    pub fn fire_focused_monitor_changed(&self, env: &CmdEnv) {
        let commands = self.env.config.borrow().on_focused_monitor_changed.clone();
        self.run_commands("on-focused-monitor-changed", &commands, env);
    }

    /// Run the commands of the callbacks matching `window`.  `startup` says
    /// whether the window was found while the window manager was starting.
    pub fn fire_window_detected(&self, window: &DetectedWindow, startup: bool) {
        let commands = self.env.config.borrow().window_detected_commands(window, startup);
        let env = CmdEnv {
            window_id: Some(window.id),
            workspace_name: window.workspace.clone(),
            pwd: None,
        };
        self.run_commands("on-window-detected", &commands, &env);
    }

    /// Current value of the gap at `pos` for `monitor`.
    pub fn gap(&self, pos: GapPosition, monitor: &Monitor, monitors: &[Monitor]) -> Result<i64> {
        let gap = self.env.config.borrow().gaps.get(pos).clone();
        gap.get(monitor, monitors)
    }

    fn run_commands(&self, event: &str, commands: &[Command], env: &CmdEnv) {
        debug!(event, count = commands.len(), "dispatching");
        for command in commands {
            match command.run(&*self.env.host, env) {
                Ok(true) => {}
                Ok(false) => debug!(event, "command reported failure"),
                Err(e) => warn!(event, "command could not run: {e}"),
            }
        }
    }
}

/// `$XDG_CONFIG_HOME/aerospace/init.lua`, falling back to
/// `~/.config/aerospace/init.lua`.
pub fn init_script_path() -> Option<PathBuf> {
    let config_home = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| directories::BaseDirs::new().map(|d| d.home_dir().join(".config")))?;
    Some(config_home.join("aerospace").join("init.lua"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingHost;

    fn engine() -> (ScriptEngine, Rc<RecordingHost>) {
        let host = Rc::new(RecordingHost::new());
        let config = Rc::new(RefCell::new(HostConfig::default()));
        let engine = ScriptEngine::new(host.clone(), config).unwrap().with_init_path("/nonexistent/init.lua");
        (engine, host)
    }

    #[test]
    fn namespaces_are_installed() {
        let (engine, _) = engine();
        let kinds = engine
            .run_source("return type(aero.api), type(aero.callbacks), type(aero.config), type(aero.keymap)")
            .unwrap();
        assert!(kinds.iter().all(|k| k == &Value::from("table")));
    }

    #[test]
    fn missing_init_file_is_fine() {
        let (engine, _) = engine();
        engine.run_init_file().unwrap();
    }

    #[test]
    fn run_source_reports_errors() {
        let (engine, _) = engine();
        assert!(matches!(engine.run_source("return +"), Err(Error::Load(_))));
        assert!(matches!(engine.run_source("error('x', 0)"), Err(Error::Runtime(m)) if m == "x"));
    }

    #[test]
    fn activate_mode_applies_bindings() {
        let (engine, host) = engine();
        engine.run_source("aero.api.activate_mode('service')").unwrap();
        assert_eq!(engine.config().borrow().active_mode, "service");
        assert_eq!(host.applied_modes(), ["service"]);
    }

    #[test]
    fn init_path_ends_in_aerospace_dir() {
        // the environment is shared between tests; only the shape is checked
        let path = init_script_path().unwrap();
        assert!(path.ends_with("aerospace/init.lua"));
    }
}
