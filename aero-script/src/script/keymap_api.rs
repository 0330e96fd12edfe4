//! `aero.keymap`: key bindings per mode.

use crate::error::Result;
use crate::keymap::{HotkeyBinding, KeyChord};
use crate::lua::{CallResult, Context, Table, Value};

use super::schema::{FunctionParameterType as F, Parameter, ParameterType as T};
use super::HostEnv;

pub(crate) fn create(ctx: &Context, env: &HostEnv) -> Result<Table> {
    let keymap = Table::new(ctx)?;

    // set(mode, key, cmd, ...) → bool
    {
        let env = env.clone();
        let command = || Parameter::one_of([T::STRING, T::FUNCTION]);
        keymap.set_field(
            "set",
            ctx.create_function(
                "aero.keymap.set",
                Some(vec![F::STRING, F::STRING, F::Fixed(command()), F::variadic(command())]),
                move |args| {
                    let mode = string_arg(&args.at(1)?);
                    let key = string_arg(&args.at(2)?);
                    let commands = env.commands(args, 3)?;

                    let Ok(chord) = key.parse::<KeyChord>() else {
                        return Ok(CallResult::Single(Value::Boolean(false)));
                    };
                    env.config.borrow_mut().mode_mut(&mode).set(HotkeyBinding { chord, commands });
                    env.refresh_if_active(&mode);
                    Ok(CallResult::Single(Value::Boolean(true)))
                },
            )?,
        )?;
    }

    // del(mode, key) → true
    {
        let env = env.clone();
        keymap.set_field(
            "del",
            ctx.create_function("aero.keymap.del", Some(vec![F::STRING, F::STRING]), move |args| {
                let mode = string_arg(&args.at(1)?);
                let key = string_arg(&args.at(2)?);
                let description = key.parse::<KeyChord>().map_or(key, |chord| chord.to_string());

                let removed = match env.config.borrow_mut().modes.get_mut(&mode) {
                    Some(m) => m.remove(&description).is_some(),
                    None => false,
                };
                if removed {
                    env.refresh_if_active(&mode);
                }
                Ok(CallResult::Single(Value::Boolean(true)))
            })?,
        )?;
    }

    Ok(keymap)
}

fn string_arg(v: &Value) -> String {
    v.as_str().unwrap_or_default().to_owned()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::config::HostConfig;
    use crate::host::RecordingHost;
    use crate::keymap::KeyChord;
    use crate::script::ScriptEngine;

    use super::*;

    fn engine() -> (ScriptEngine, Rc<RecordingHost>) {
        let host = Rc::new(RecordingHost::new());
        let config = Rc::new(RefCell::new(HostConfig::default()));
        (ScriptEngine::new(host.clone(), config).unwrap(), host)
    }

    #[test]
    fn set_binds_under_canonical_chord() {
        let (engine, _) = engine();
        let r = engine.run_source("return aero.keymap.set('service', 'Shift-Alt-H', 'join-with left')").unwrap();
        assert_eq!(r, vec![Value::Boolean(true)]);
        let cfg = engine.config().borrow();
        let mode = &cfg.modes["service"];
        assert_eq!(mode.bindings()[0].description(), "alt-shift-h");
        assert!(mode.lookup(&"alt-shift-h".parse::<KeyChord>().unwrap()).is_some());
    }

    #[test]
    fn unparsable_chord_returns_false() {
        let (engine, _) = engine();
        let r = engine.run_source("return aero.keymap.set('main', 'hyper-x', 'workspace 1')").unwrap();
        assert_eq!(r, vec![Value::Boolean(false)]);
        assert!(engine.config().borrow().modes["main"].is_empty());
    }

    #[test]
    fn editing_the_active_mode_reapplies_bindings() {
        let (engine, host) = engine();
        engine
            .run_source(
                "aero.keymap.set('main', 'alt-1', 'workspace 1') \
                 aero.keymap.set('service', 'esc', 'mode main') \
                 aero.keymap.set('main', 'alt-2', function() end)",
            )
            .unwrap();
        assert_eq!(host.applied_modes(), ["main", "main"]);
        assert_eq!(host.last_applied().unwrap().len(), 2);

        engine.run_source("aero.keymap.del('main', 'ALT-1') aero.keymap.del('service', 'esc')").unwrap();
        assert_eq!(host.applied_modes(), ["main", "main", "main"]);
        assert_eq!(host.last_applied().unwrap().len(), 1);
    }

    #[test]
    fn del_on_missing_mode_or_key_is_fine() {
        let (engine, host) = engine();
        let r = engine
            .run_source("return aero.keymap.del('nosuchmode', 'alt-1'), aero.keymap.del('main', 'alt-9')")
            .unwrap();
        assert_eq!(r, vec![Value::Boolean(true), Value::Boolean(true)]);
        assert!(host.applied_modes().is_empty());
    }
}
