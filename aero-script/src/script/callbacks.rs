//! `aero.callbacks`: commands to run when the window manager reports an
//! event.

use regex::{Regex, RegexBuilder};

use crate::config::{WindowDetectedCallback, WindowDetectedMatcher};
use crate::error::{Error, Result};
use crate::lua::{CallResult, Context, Table, Value};

use super::schema::{FunctionParameterType as F, Parameter, ParameterType as T};
use super::HostEnv;

fn command_params() -> Vec<F> {
    let command = || Parameter::one_of([T::STRING, T::FUNCTION]);
    vec![F::Fixed(command()), F::variadic(command())]
}

pub(crate) fn create(ctx: &Context, env: &HostEnv) -> Result<Table> {
    let callbacks = Table::new(ctx)?;

    // on_focus_changed(cmd, ...) → true
    {
        let env = env.clone();
        callbacks.set_field(
            "on_focus_changed",
            ctx.create_function("aero.callbacks.on_focus_changed", Some(command_params()), move |args| {
                let commands = env.commands(args, 1)?;
                env.config.borrow_mut().on_focus_changed.extend(commands);
                Ok(CallResult::Single(Value::Boolean(true)))
            })?,
        )?;
    }

    // on_focused_monitor_changed(cmd, ...) → true
    {
        let env = env.clone();
        callbacks.set_field(
            "on_focused_monitor_changed",
            ctx.create_function(
                "aero.callbacks.on_focused_monitor_changed",
                Some(command_params()),
                move |args| {
                    let commands = env.commands(args, 1)?;
                    env.config.borrow_mut().on_focused_monitor_changed.extend(commands);
                    Ok(CallResult::Single(Value::Boolean(true)))
                },
            )?,
        )?;
    }

    // on_window_detected(opts, cmd, ...) → true
    {
        let env = env.clone();
        let mut expected = vec![F::schema([
            ("appId", Parameter::optional(T::STRING)),
            ("appNameRegexSubstring", Parameter::optional(T::STRING)),
            ("windowTitleRegexSubstring", Parameter::optional(T::STRING)),
            ("workspace", Parameter::optional(T::STRING)),
            ("duringAerospaceStartup", Parameter::optional(T::BOOLEAN)),
            ("checkFurtherCallbacks", Parameter::optional(T::BOOLEAN)),
        ])];
        expected.extend(command_params());
        callbacks.set_field(
            "on_window_detected",
            ctx.create_function("aero.callbacks.on_window_detected", Some(expected), move |args| {
                let opts = args.at(1)?;
                let Some(opts) = opts.as_table() else {
                    return Ok(CallResult::Error("expected a table of options".to_owned()));
                };
                let commands = env.commands(args, 2)?;
                let matcher = WindowDetectedMatcher {
                    app_id: string_field(opts, "appId")?,
                    app_name_regex_substring: regex_field(opts, "appNameRegexSubstring")?,
                    window_title_regex_substring: regex_field(opts, "windowTitleRegexSubstring")?,
                    workspace: string_field(opts, "workspace")?,
                    during_aerospace_startup: opts.get_field("duringAerospaceStartup")?.as_bool(),
                };
                let check_further_callbacks =
                    opts.get_field("checkFurtherCallbacks")?.as_bool().unwrap_or(false);
                env.config.borrow_mut().on_window_detected.push(WindowDetectedCallback {
                    matcher,
                    check_further_callbacks,
                    run: commands,
                });
                Ok(CallResult::Single(Value::Boolean(true)))
            })?,
        )?;
    }

    Ok(callbacks)
}

fn string_field(table: &Table, name: &str) -> Result<Option<String>> {
    Ok(table.get_field(name)?.as_str().map(str::to_owned))
}

fn regex_field(table: &Table, name: &str) -> Result<Option<Regex>> {
    let Some(pattern) = string_field(table, name)? else {
        return Ok(None);
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| Error::Runtime(format!("Can't parse '{pattern}' regex for {name}: {e}")))
}
