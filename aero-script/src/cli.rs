//! Command-line arguments and output of the `aero-script` checker.
//!
//! Usage:
//!   aero-script [--init <path>] [--eval <chunk>]... [-v]

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{GapPosition, HostConfig};
use crate::dynamic::DynamicValue;

// ── Public types ──────────────────────────────────────────────────────────────

/// Run an init script against a recording host and print what it configured.
#[derive(Parser, Debug)]
#[command(name = "aero-script", version)]
pub struct Cli {
    /// Init script to run instead of `$XDG_CONFIG_HOME/aerospace/init.lua`.
    #[arg(long, value_name = "PATH")]
    pub init: Option<PathBuf>,
    /// Lua chunk to run after the init script; may be repeated.
    #[arg(long, value_name = "CHUNK")]
    pub eval: Vec<String>,
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long)]
    pub verbose: bool,
}

// ── Logging ───────────────────────────────────────────────────────────────────

/// Install the global subscriber.  `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

// ── Summary ───────────────────────────────────────────────────────────────────

/// One line per setting, event sink and mode.
pub fn summary(cfg: &HostConfig) -> Vec<String> {
    let mut lines = Vec::new();
    for &pos in GapPosition::ALL {
        let value = match cfg.gaps.get(pos) {
            DynamicValue::Constant(v) => v.to_string(),
            DynamicValue::PerMonitor { rules, default } => {
                format!("per-monitor ({} rules, default {default})", rules.len())
            }
            DynamicValue::Callback { .. } => "<lua function>".to_owned(),
        };
        lines.push(format!("{} = {value}", pos.global_name()));
    }
    lines.push(format!("start_at_login = {}", cfg.start_at_login));
    lines.push(format!(
        "enable_normalization_flatten_containers = {}",
        cfg.enable_normalization_flatten_containers
    ));
    lines.push(format!(
        "enable_normalization_opposite_orientation_for_nested_containers = {}",
        cfg.enable_normalization_opposite_orientation_for_nested_containers
    ));
    lines.push(format!("accordion_padding = {}", cfg.accordion_padding));
    lines.push(format!("default_root_container_layout = {}", cfg.default_root_container_layout));
    lines.push(format!(
        "default_root_container_orientation = {}",
        cfg.default_root_container_orientation
    ));

    for (event, commands) in [
        ("on_focus_changed", &cfg.on_focus_changed),
        ("on_focused_monitor_changed", &cfg.on_focused_monitor_changed),
    ] {
        for command in commands {
            lines.push(format!("{event}: {command}"));
        }
    }
    for callback in &cfg.on_window_detected {
        let run: Vec<String> = callback.run.iter().map(ToString::to_string).collect();
        lines.push(format!("on_window_detected: {}", run.join("; ")));
    }

    for mode in cfg.modes.values() {
        let marker = if mode.name == cfg.active_mode { " (active)" } else { "" };
        lines.push(format!("mode {}{marker}: {} bindings", mode.name, mode.len()));
        for binding in mode.bindings() {
            let run: Vec<String> = binding.commands.iter().map(ToString::to_string).collect();
            lines.push(format!("  {} -> {}", binding.description(), run.join("; ")));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::host::ParsedCommand;
    use crate::keymap::HotkeyBinding;

    #[test]
    fn no_args() {
        let cli = Cli::try_parse_from(["aero-script"]).unwrap();
        assert!(cli.init.is_none());
        assert!(cli.eval.is_empty());
        assert!(!cli.verbose);
    }

    #[test]
    fn all_flags() {
        let cli = Cli::try_parse_from([
            "aero-script",
            "--init",
            "/tmp/init.lua",
            "--eval",
            "print(1)",
            "--eval",
            "print(2)",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.init, Some(PathBuf::from("/tmp/init.lua")));
        assert_eq!(cli.eval, ["print(1)", "print(2)"]);
        assert!(cli.verbose);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["aero-script", "--bogus"]).is_err());
        assert!(Cli::try_parse_from(["aero-script", "--init"]).is_err());
    }

    #[test]
    fn summary_of_defaults() {
        let lines = summary(&HostConfig::default());
        assert_eq!(lines[0], "GAP_INNER_HORIZONTAL = 0");
        assert!(lines.contains(&"accordion_padding = 30".to_owned()));
        assert!(lines.contains(&"default_root_container_layout = tiles".to_owned()));
        assert_eq!(lines.last().unwrap(), "mode main (active): 0 bindings");
    }

    #[test]
    fn summary_lists_bindings_and_callbacks() {
        let mut cfg = HostConfig::default();
        let workspace = Command::Host(ParsedCommand::new(["workspace", "1"]));
        cfg.on_focus_changed.push(workspace.clone());
        cfg.mode_mut("main").set(HotkeyBinding {
            chord: "alt-1".parse().unwrap(),
            commands: vec![workspace],
        });
        let lines = summary(&cfg);
        assert!(lines.contains(&"on_focus_changed: workspace 1".to_owned()));
        assert!(lines.contains(&"  alt-1 -> workspace 1".to_owned()));
    }
}
