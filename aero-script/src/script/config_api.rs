//! `aero.config`: scalar settings.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::{HostConfig, Layout, Orientation};
use crate::error::Result;
use crate::lua::{CallResult, Context, Table, Value};

use super::schema::FunctionParameterType as F;
use super::HostEnv;

type Setter = fn(&mut HostConfig, &Value) -> std::result::Result<(), String>;

/// Name, parameter type and how the argument lands in the configuration.
const SETTINGS: &[(&str, F, Setter)] = &[
    ("start_at_login", F::BOOLEAN, |cfg, v| {
        cfg.start_at_login = v.as_bool().unwrap_or_default();
        Ok(())
    }),
    ("enable_normalization_flatten_containers", F::BOOLEAN, |cfg, v| {
        cfg.enable_normalization_flatten_containers = v.as_bool().unwrap_or_default();
        Ok(())
    }),
    ("enable_normalization_opposite_orientation_for_nested_containers", F::BOOLEAN, |cfg, v| {
        cfg.enable_normalization_opposite_orientation_for_nested_containers = v.as_bool().unwrap_or_default();
        Ok(())
    }),
    ("accordion_padding", F::NUMBER, |cfg, v| {
        cfg.accordion_padding = v.as_integer().unwrap_or_default();
        Ok(())
    }),
    ("default_root_container_layout", F::STRING, |cfg, v| {
        cfg.default_root_container_layout = v.as_str().unwrap_or_default().parse::<Layout>()?;
        Ok(())
    }),
    ("default_root_container_orientation", F::STRING, |cfg, v| {
        cfg.default_root_container_orientation = v.as_str().unwrap_or_default().parse::<Orientation>()?;
        Ok(())
    }),
];

pub(crate) fn create(ctx: &Context, env: &HostEnv) -> Result<Table> {
    let cnf = Table::new(ctx)?;
    for (name, param, setter) in SETTINGS {
        cnf.set_field(name, setter_function(ctx, name, param.clone(), *setter, Rc::clone(&env.config))?)?;
    }
    Ok(cnf)
}

fn setter_function(
    ctx: &Context,
    name: &str,
    param: F,
    setter: Setter,
    config: Rc<RefCell<HostConfig>>,
) -> Result<Value> {
    let function = ctx.create_function(format!("aero.config.{name}"), Some(vec![param]), move |args| {
        let value = args.at(1)?;
        match setter(&mut config.borrow_mut(), &value) {
            Ok(()) => Ok(CallResult::NoValue),
            Err(msg) => Ok(CallResult::Error(msg)),
        }
    })?;
    Ok(function.into())
}
