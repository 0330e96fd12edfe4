//! Configuration values that may be constant, monitor-specific, or computed
//! by a script callback every time they are read.

use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};
use crate::lua::{CallResult, FromValue, Function, Table, Value};

// ── Monitors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect { x, y, width, height }
    }

    pub fn top_left(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// What the host knows about one display.
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    pub id: i64,
    pub name: String,
    pub rect: Rect,
    pub active_workspace: String,
    pub is_main: bool,
}

/// Monitors ordered left to right, then top to bottom.
pub fn sorted_monitors(monitors: &[Monitor]) -> Vec<&Monitor> {
    let mut sorted: Vec<&Monitor> = monitors.iter().collect();
    sorted.sort_by(|a, b| {
        a.rect.x.total_cmp(&b.rect.x).then(a.rect.y.total_cmp(&b.rect.y))
    });
    sorted
}

// ── MonitorDescription ────────────────────────────────────────────────────────

/// A user-written reference to a monitor.
#[derive(Debug, Clone)]
pub enum MonitorDescription {
    Main,
    /// The non-main monitor; only resolves when exactly two are attached.
    Secondary,
    /// 1-based position in [`sorted_monitors`] order.
    Sequence(usize),
    /// Case-insensitive pattern over the monitor name.
    Pattern(Regex),
}

impl MonitorDescription {
    pub fn resolve<'a>(&self, sorted: &[&'a Monitor]) -> Option<&'a Monitor> {
        match self {
            MonitorDescription::Main => sorted.iter().copied().find(|m| m.is_main),
            MonitorDescription::Secondary => match sorted {
                [a, b] => Some(if a.is_main { *b } else { *a }),
                _ => None,
            },
            MonitorDescription::Sequence(n) => n.checked_sub(1).and_then(|i| sorted.get(i)).copied(),
            MonitorDescription::Pattern(re) => sorted.iter().copied().find(|m| re.is_match(&m.name)),
        }
    }
}

impl FromStr for MonitorDescription {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "main" => return Ok(MonitorDescription::Main),
            "secondary" => return Ok(MonitorDescription::Secondary),
            _ => {}
        }
        if let Ok(n) = s.parse::<usize>() {
            if n == 0 {
                return Err("Monitor sequence numbers start from 1".to_owned());
            }
            return Ok(MonitorDescription::Sequence(n));
        }
        if s.is_empty() {
            return Err("Empty string is an illegal monitor description".to_owned());
        }
        RegexBuilder::new(s)
            .case_insensitive(true)
            .build()
            .map(MonitorDescription::Pattern)
            .map_err(|e| format!("Can't parse '{s}' regex: {e}"))
    }
}

impl PartialEq for MonitorDescription {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MonitorDescription::Main, MonitorDescription::Main) => true,
            (MonitorDescription::Secondary, MonitorDescription::Secondary) => true,
            (MonitorDescription::Sequence(a), MonitorDescription::Sequence(b)) => a == b,
            (MonitorDescription::Pattern(a), MonitorDescription::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for MonitorDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorDescription::Main => f.write_str("main"),
            MonitorDescription::Secondary => f.write_str("secondary"),
            MonitorDescription::Sequence(n) => write!(f, "{n}"),
            MonitorDescription::Pattern(re) => f.write_str(re.as_str()),
        }
    }
}

// ── DynamicValue ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PerMonitorValue<T> {
    pub description: MonitorDescription,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue<T> {
    Constant(T),
    /// First rule whose monitor resolves to the queried one wins.
    PerMonitor { rules: Vec<PerMonitorValue<T>>, default: T },
    /// Called as `function(id, monitorInfo)` on every read.
    Callback { function: Function, id: Value },
}

impl<T: Default> Default for DynamicValue<T> {
    fn default() -> Self {
        DynamicValue::Constant(T::default())
    }
}

impl<T: FromValue + Clone> DynamicValue<T> {
    /// Evaluate for `monitor`, with `monitors` the currently attached set.
    ///
    /// A callback that returns nothing, returns something of the wrong type
    /// or raises is an [`Error::Config`].
    pub fn get(&self, monitor: &Monitor, monitors: &[Monitor]) -> Result<T> {
        match self {
            DynamicValue::Constant(v) => Ok(v.clone()),
            DynamicValue::PerMonitor { rules, default } => {
                let sorted = sorted_monitors(monitors);
                let hit = rules.iter().find(|rule| {
                    rule.description
                        .resolve(&sorted)
                        .is_some_and(|m| m.rect.top_left() == monitor.rect.top_left())
                });
                Ok(hit.map_or(default, |rule| &rule.value).clone())
            }
            DynamicValue::Callback { function, id } => {
                let info = monitor_info(function, monitor)?;
                match function.call(&[id.clone(), Value::Table(info)])? {
                    CallResult::NoValue => {
                        Err(Error::Config("Lua callback did not return a value".to_owned()))
                    }
                    CallResult::Error(msg) => Err(Error::Config(format!(
                        "Failed to call the Lua callback for dynamic config value: {msg}"
                    ))),
                    result => result.first().and_then(T::from_value).ok_or_else(|| {
                        Error::Config(
                            "Could not cast the return value of Lua callback to dynamic config value"
                                .to_owned(),
                        )
                    }),
                }
            }
        }
    }
}

/// A fresh table copied from `monitor`; scripts cannot reach host state
/// through it.
fn monitor_info(function: &Function, monitor: &Monitor) -> Result<Table> {
    let info = Table::new(&function.context()?)?;
    info.set_field("id", monitor.id)?;
    info.set_field("name", monitor.name.as_str())?;
    info.set_field("width", monitor.rect.width)?;
    info.set_field("height", monitor.rect.height)?;
    info.set_field("activeWorkspace", monitor.active_workspace.as_str())?;
    Ok(info)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
