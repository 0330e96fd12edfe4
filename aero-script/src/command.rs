//! Commands registered from scripts: either a host command string or a
//! script function.

use std::fmt;

use tracing::{debug, warn};

use crate::error::Result;
use crate::host::{CmdEnv, Host, ParsedCommand};
use crate::lua::{CallResult, Function, Table, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Host(ParsedCommand),
    /// Called as `function(env)` with `env = { windowID, workspaceName, pwd }`.
    Script(Function),
}

impl Command {
    /// Run the command; `Ok(true)` iff it succeeded.
    pub fn run(&self, host: &dyn Host, env: &CmdEnv) -> Result<bool> {
        match self {
            Command::Host(command) => {
                let output = host.run_command(command, env);
                debug!(command = %command.args.join(" "), exit_code = output.exit_code, "ran host command");
                Ok(output.exit_code == 0)
            }
            Command::Script(function) => {
                let env = env_table(function, env)?;
                match function.call(&[Value::Table(env)])? {
                    CallResult::Error(msg) => {
                        warn!("script command failed: {msg}");
                        Ok(false)
                    }
                    _ => Ok(true),
                }
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Host(command) => f.write_str(&command.args.join(" ")),
            Command::Script(_) => f.write_str("<lua function>"),
        }
    }
}

fn env_table(function: &Function, env: &CmdEnv) -> Result<Table> {
    let table = Table::new(&function.context()?)?;
    table.set_field("windowID", env.window_id)?;
    table.set_field("workspaceName", env.workspace_name.clone())?;
    table.set_field("pwd", env.pwd.clone())?;
    Ok(table)
}

/// Turn a script argument into a command.  Strings are tokenized and handed
/// to the host parser; functions are kept as they are.
pub fn arg_to_command(host: &dyn Host, arg: &Value) -> std::result::Result<Command, String> {
    match arg {
        Value::String(s) => host.parse_command(&split_args(s)).map(Command::Host),
        Value::Function(f) => Ok(Command::Script(f.clone())),
        other => Err(format!("expected a command string or function, but got {}", other.describe())),
    }
}

// ── Argument tokenizer ────────────────────────────────────────────────────────

/// Split `s` into whitespace-delimited tokens, honouring single- and
/// double-quoted strings and `\` escapes within them.
pub fn split_args(s: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    let mut quoted = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match (ch, quote) {
            ('"' | '\'', None) => {
                quote = Some(ch);
                quoted = true;
            }
            (c, Some(q)) if c == q => quote = None,
            ('\\', Some(_)) => {
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            (c, None) if c.is_whitespace() => {
                if !cur.is_empty() || quoted {
                    args.push(std::mem::take(&mut cur));
                    quoted = false;
                }
            }
            (c, _) => cur.push(c),
        }
    }
    if !cur.is_empty() || quoted {
        args.push(cur);
    }
    args
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RecordingHost;
    use crate::lua::Context;

    // -- split_args -----------------------------------------------------------

    #[test]
    fn split_simple() {
        assert_eq!(split_args("move-node-to-workspace  S"), ["move-node-to-workspace", "S"]);
    }

    #[test]
    fn split_quoted_spaces() {
        assert_eq!(split_args(r#"exec-and-forget "open -a Terminal""#), ["exec-and-forget", "open -a Terminal"]);
        assert_eq!(split_args("summon 'My App' now"), ["summon", "My App", "now"]);
    }

    #[test]
    fn split_escaped_quote_inside_quotes() {
        assert_eq!(split_args(r#"echo "say \"hi\"""#), ["echo", r#"say "hi""#]);
    }

    #[test]
    fn split_keeps_empty_quoted_token() {
        assert_eq!(split_args(r#"rename """#), ["rename", ""]);
        assert!(split_args("   ").is_empty());
    }

    // -- arg_to_command -------------------------------------------------------

    #[test]
    fn strings_go_through_the_host_parser() {
        let host = RecordingHost::new().rejecting("bogus");
        let cmd = arg_to_command(&host, &Value::from("layout floating")).unwrap();
        assert_eq!(cmd, Command::Host(ParsedCommand::new(["layout", "floating"])));
        assert!(arg_to_command(&host, &Value::from("bogus 1")).is_err());
        assert!(arg_to_command(&host, &Value::from("")).is_err());
        assert!(arg_to_command(&host, &Value::Number(1.0)).is_err());
    }

    #[test]
    fn host_command_success_follows_exit_code() {
        use crate::host::CommandOutput;
        let host = RecordingHost::new()
            .with_output("fail", CommandOutput { exit_code: 2, ..CommandOutput::default() });
        let ok = Command::Host(ParsedCommand::new(["workspace", "1"]));
        let fail = Command::Host(ParsedCommand::new(["fail"]));
        assert!(ok.run(&host, &CmdEnv::default()).unwrap());
        assert!(!fail.run(&host, &CmdEnv::default()).unwrap());
        assert_eq!(host.executed().len(), 2);
    }

    #[test]
    fn script_command_receives_env_and_reports_success() {
        let ctx = Context::new();
        let host = RecordingHost::new();
        let f = ctx
            .load_source("return function(env) seen = env.windowID .. '@' .. env.workspaceName end")
            .unwrap()
            .call(&[])
            .unwrap()
            .first()
            .and_then(Value::as_function)
            .cloned()
            .unwrap();
        let env = CmdEnv { window_id: Some(42), workspace_name: Some("S".into()), pwd: None };
        assert!(Command::Script(f).run(&host, &env).unwrap());
        assert_eq!(ctx.get_global("seen").unwrap(), Value::from("42@S"));
    }

    #[test]
    fn failing_script_command_reports_failure() {
        let ctx = Context::new();
        let host = RecordingHost::new();
        let f = ctx
            .load_source("return function() error('broken') end")
            .unwrap()
            .call(&[])
            .unwrap()
            .first()
            .and_then(Value::as_function)
            .cloned()
            .unwrap();
        assert!(!Command::Script(f).run(&host, &CmdEnv::default()).unwrap());
        assert_eq!(ctx.stack_size(), 0);
    }
}
