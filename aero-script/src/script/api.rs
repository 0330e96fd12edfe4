//! `aero.api`: queries and commands against the running window manager.

use crate::config::GapPosition;
use crate::dynamic::DynamicValue;
use crate::error::Result;
use crate::host::{CmdEnv, WorkspaceName};
use crate::lua::{CallResult, Context, Table, Value};

use super::schema::{FunctionParameterType as F, Parameter, ParameterType as T};
use super::HostEnv;

pub(crate) fn create(ctx: &Context, env: &HostEnv) -> Result<Table> {
    let api = Table::new(ctx)?;

    // command(cmd, ...args) → { stdout, stderr, exitCode }
    {
        let env = env.clone();
        api.set_field(
            "command",
            ctx.create_function(
                "aero.api.command",
                Some(vec![F::STRING, F::variadic(Parameter::STRING)]),
                move |args| {
                    let words: Vec<String> = args
                        .collect()?
                        .into_iter()
                        .filter_map(|v| v.as_str().map(str::to_owned))
                        .collect();
                    let result = Table::new(args.context())?;
                    match env.host.parse_command(&words) {
                        Ok(command) => {
                            let output = env.host.run_command(&command, &CmdEnv::default());
                            result.set_field("stdout", output.stdout.join("\n"))?;
                            result.set_field("stderr", output.stderr.join("\n"))?;
                            result.set_field("exitCode", output.exit_code)?;
                        }
                        Err(err) => {
                            result.set_field("stdout", "")?;
                            result.set_field("stderr", err)?;
                            result.set_field("exitCode", -1)?;
                        }
                    }
                    Ok(CallResult::Single(result.into()))
                },
            )?,
        )?;
    }

    // activate_mode(mode)
    {
        let env = env.clone();
        api.set_field(
            "activate_mode",
            ctx.create_function("aero.api.activate_mode", Some(vec![F::STRING]), move |args| {
                let mode = args.at(1)?;
                env.activate_mode(mode.as_str().unwrap_or_default());
                Ok(CallResult::NoValue)
            })?,
        )?;
    }

    // window_get_title(id) → string | nil
    {
        let env = env.clone();
        api.set_field(
            "window_get_title",
            ctx.create_function("aero.api.window_get_title", Some(vec![F::NUMBER]), move |args| {
                let title = window_id(&args.at(1)?)
                    .and_then(|id| env.host.lookup_window(id))
                    .map(|w| w.title);
                Ok(CallResult::Single(title.into()))
            })?,
        )?;
    }

    // window_get_app_name(id) → string | nil
    {
        let env = env.clone();
        api.set_field(
            "window_get_app_name",
            ctx.create_function("aero.api.window_get_app_name", Some(vec![F::NUMBER]), move |args| {
                let name = window_id(&args.at(1)?)
                    .and_then(|id| env.host.lookup_window(id))
                    .and_then(|w| w.app_name);
                Ok(CallResult::Single(name.into()))
            })?,
        )?;
    }

    // workspace_windows_count(name | "focused") → number
    {
        let env = env.clone();
        api.set_field(
            "workspace_windows_count",
            ctx.create_function("aero.api.workspace_windows_count", Some(vec![F::STRING]), move |args| {
                let name = args.at(1)?;
                let workspace = WorkspaceName::parse(name.as_str().unwrap_or_default());
                let count = env.host.lookup_workspace(&workspace).leaf_window_count;
                Ok(CallResult::Single(Value::Number(count as f64)))
            })?,
        )?;
    }

    // gap_set(GAP_*, number | function(id, monitorInfo))
    for &pos in GapPosition::ALL {
        ctx.set_global(pos.global_name(), pos.id())?;
    }
    {
        let env = env.clone();
        api.set_field(
            "gap_set",
            ctx.create_function(
                "aero.api.gap_set",
                Some(vec![F::NUMBER, F::one_of([T::NUMBER, T::FUNCTION])]),
                move |args| {
                    let id = args.at(1)?;
                    let gap = match args.at(2)? {
                        Value::Function(function) => DynamicValue::Callback { function, id: id.clone() },
                        value => DynamicValue::Constant(value.as_integer().unwrap_or_default()),
                    };
                    let Some(pos) = id.as_integer().and_then(GapPosition::from_id) else {
                        return Ok(CallResult::Error("Invalid gap position value".to_owned()));
                    };
                    env.config.borrow_mut().gaps.set(pos, gap);
                    Ok(CallResult::NoValue)
                },
            )?,
        )?;
    }

    Ok(api)
}

fn window_id(v: &Value) -> Option<u32> {
    v.as_integer().and_then(|id| u32::try_from(id).ok())
}
