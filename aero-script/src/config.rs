//! Host configuration that scripts write into.
//!
//! | Script call                                  | Field                          |
//! |----------------------------------------------|--------------------------------|
//! | `aero.api.gap_set(pos, v)`                   | [`HostConfig::gaps`]           |
//! | `aero.config.*`                              | scalar settings                |
//! | `aero.callbacks.on_focus_changed(...)`       | [`HostConfig::on_focus_changed`] |
//! | `aero.callbacks.on_focused_monitor_changed`  | [`HostConfig::on_focused_monitor_changed`] |
//! | `aero.callbacks.on_window_detected(...)`     | [`HostConfig::on_window_detected`] |
//! | `aero.keymap.set` / `del`                    | [`HostConfig::modes`]          |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::command::Command;
use crate::dynamic::DynamicValue;
use crate::host::DetectedWindow;
use crate::keymap::Mode;

// ── Gaps ──────────────────────────────────────────────────────────────────────

/// Gap locations, numbered as the `GAP_*` script globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GapPosition {
    InnerHorizontal = 1,
    InnerVertical,
    OuterLeft,
    OuterBottom,
    OuterTop,
    OuterRight,
}

impl GapPosition {
    pub const ALL: &'static [GapPosition] = &[
        GapPosition::InnerHorizontal,
        GapPosition::InnerVertical,
        GapPosition::OuterLeft,
        GapPosition::OuterBottom,
        GapPosition::OuterTop,
        GapPosition::OuterRight,
    ];

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.id() == id)
    }

    pub fn id(self) -> i64 {
        self as i64
    }

    /// Name of the script global holding [`GapPosition::id`].
    pub fn global_name(self) -> &'static str {
        match self {
            GapPosition::InnerHorizontal => "GAP_INNER_HORIZONTAL",
            GapPosition::InnerVertical   => "GAP_INNER_VERTICAL",
            GapPosition::OuterLeft       => "GAP_OUTER_LEFT",
            GapPosition::OuterBottom     => "GAP_OUTER_BOTTOM",
            GapPosition::OuterTop        => "GAP_OUTER_TOP",
            GapPosition::OuterRight      => "GAP_OUTER_RIGHT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Gaps {
    pub inner_horizontal: DynamicValue<i64>,
    pub inner_vertical: DynamicValue<i64>,
    pub outer_left: DynamicValue<i64>,
    pub outer_bottom: DynamicValue<i64>,
    pub outer_top: DynamicValue<i64>,
    pub outer_right: DynamicValue<i64>,
}

impl Gaps {
    pub fn get(&self, pos: GapPosition) -> &DynamicValue<i64> {
        match pos {
            GapPosition::InnerHorizontal => &self.inner_horizontal,
            GapPosition::InnerVertical   => &self.inner_vertical,
            GapPosition::OuterLeft       => &self.outer_left,
            GapPosition::OuterBottom     => &self.outer_bottom,
            GapPosition::OuterTop        => &self.outer_top,
            GapPosition::OuterRight      => &self.outer_right,
        }
    }

    pub fn set(&mut self, pos: GapPosition, value: DynamicValue<i64>) {
        let slot = match pos {
            GapPosition::InnerHorizontal => &mut self.inner_horizontal,
            GapPosition::InnerVertical   => &mut self.inner_vertical,
            GapPosition::OuterLeft       => &mut self.outer_left,
            GapPosition::OuterBottom     => &mut self.outer_bottom,
            GapPosition::OuterTop        => &mut self.outer_top,
            GapPosition::OuterRight      => &mut self.outer_right,
        };
        *slot = value;
    }
}

// ── Layout settings ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Tiles,
    Accordion,
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "tiles" => Ok(Layout::Tiles),
            "accordion" => Ok(Layout::Accordion),
            _ => Err("Invalid value for default-root-container-layout".to_owned()),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Layout::Tiles => "tiles",
            Layout::Accordion => "accordion",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    Horizontal,
    Vertical,
    #[default]
    Auto,
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "horizontal" => Ok(Orientation::Horizontal),
            "vertical" => Ok(Orientation::Vertical),
            "auto" => Ok(Orientation::Auto),
            _ => Err("Invalid value for default-root-container-orientation".to_owned()),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
            Orientation::Auto => "auto",
        })
    }
}

// ── Window detection ──────────────────────────────────────────────────────────

/// Which windows an `on_window_detected` callback applies to.  Every field
/// that is set must match.
#[derive(Debug, Clone, Default)]
pub struct WindowDetectedMatcher {
    /// Exact application id.
    pub app_id: Option<String>,
    pub app_name_regex_substring: Option<Regex>,
    pub window_title_regex_substring: Option<Regex>,
    pub workspace: Option<String>,
    pub during_aerospace_startup: Option<bool>,
}

impl WindowDetectedMatcher {
    pub fn matches(&self, window: &DetectedWindow, startup: bool) -> bool {
        if let Some(app_id) = &self.app_id {
            if window.app_id.as_deref() != Some(app_id.as_str()) {
                return false;
            }
        }
        if let Some(re) = &self.app_name_regex_substring {
            if !window.app_name.as_deref().is_some_and(|name| re.is_match(name)) {
                return false;
            }
        }
        if let Some(re) = &self.window_title_regex_substring {
            if !re.is_match(&window.title) {
                return false;
            }
        }
        if let Some(workspace) = &self.workspace {
            if window.workspace.as_deref() != Some(workspace.as_str()) {
                return false;
            }
        }
        self.during_aerospace_startup.map_or(true, |flag| flag == startup)
    }
}

impl PartialEq for WindowDetectedMatcher {
    fn eq(&self, other: &Self) -> bool {
        let re = |a: &Option<Regex>, b: &Option<Regex>| a.as_ref().map(Regex::as_str) == b.as_ref().map(Regex::as_str);
        self.app_id == other.app_id
            && re(&self.app_name_regex_substring, &other.app_name_regex_substring)
            && re(&self.window_title_regex_substring, &other.window_title_regex_substring)
            && self.workspace == other.workspace
            && self.during_aerospace_startup == other.during_aerospace_startup
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowDetectedCallback {
    pub matcher: WindowDetectedMatcher,
    /// Keep looking at later callbacks after this one matched.
    pub check_further_callbacks: bool,
    pub run: Vec<Command>,
}

// ── HostConfig ────────────────────────────────────────────────────────────────

pub const DEFAULT_MODE: &str = "main";

#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub gaps: Gaps,
    pub start_at_login: bool,
    pub enable_normalization_flatten_containers: bool,
    pub enable_normalization_opposite_orientation_for_nested_containers: bool,
    pub accordion_padding: i64,
    pub default_root_container_layout: Layout,
    pub default_root_container_orientation: Orientation,
    pub on_focus_changed: Vec<Command>,
    pub on_focused_monitor_changed: Vec<Command>,
    pub on_window_detected: Vec<WindowDetectedCallback>,
    pub modes: BTreeMap<String, Mode>,
    pub active_mode: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        let mut modes = BTreeMap::new();
        modes.insert(DEFAULT_MODE.to_owned(), Mode::new(DEFAULT_MODE));
        HostConfig {
            gaps: Gaps::default(),
            start_at_login: false,
            enable_normalization_flatten_containers: true,
            enable_normalization_opposite_orientation_for_nested_containers: true,
            accordion_padding: 30,
            default_root_container_layout: Layout::default(),
            default_root_container_orientation: Orientation::default(),
            on_focus_changed: Vec::new(),
            on_focused_monitor_changed: Vec::new(),
            on_window_detected: Vec::new(),
            modes,
            active_mode: DEFAULT_MODE.to_owned(),
        }
    }
}

impl HostConfig {
    /// Forget everything scripts have set.
    pub fn reset(&mut self) {
        *self = HostConfig::default();
    }

    /// The mode named `name`, created empty if missing.
    pub fn mode_mut(&mut self, name: &str) -> &mut Mode {
        self.modes.entry(name.to_owned()).or_insert_with(|| Mode::new(name))
    }

    /// Commands of every `on_window_detected` callback that applies to
    /// `window`, stopping after the first match unless it asks to go on.
    pub fn window_detected_commands(&self, window: &DetectedWindow, startup: bool) -> Vec<Command> {
        let mut commands = Vec::new();
        for callback in &self.on_window_detected {
            if !callback.matcher.matches(window, startup) {
                continue;
            }
            commands.extend(callback.run.iter().cloned());
            if !callback.check_further_callbacks {
                break;
            }
        }
        commands
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
