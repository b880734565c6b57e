// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ControlId, PaneLevel, SurfaceId};

const PARAMETER_PREFIX: &str = "prm";
const GENERATE_PREFIX: &str = "gen";
const TAB_PREFIX: &str = "tab";
pub const PICKER_PREFIX: &str = "qpk";
pub const PICKER_GRID: &str = "qgrid";

pub const REPORT_CODE_COLUMN: &str = "report_code";
pub const REPORT_NAME_COLUMN: &str = "report_name";

/// Fixed controls of the principal screen the engine attaches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenLayout {
    pub principal: SurfaceId,
    pub home_tab: ControlId,
    pub reports_grid: ControlId,
    pub department_chooser: ControlId,
}

impl Default for ScreenLayout {
    fn default() -> Self {
        Self {
            principal: SurfaceId::from("principal"),
            home_tab: ControlId::from("tab_home"),
            reports_grid: ControlId::from("reports"),
            department_chooser: ControlId::from("departments"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterRole {
    Label,
    Value,
    Trigger,
    Description,
    FlagSource,
    DateSource,
}

impl ParameterRole {
    const fn tag(self) -> &'static str {
        match self {
            Self::Label => "lbl",
            Self::Value => "val",
            Self::Trigger => "btn",
            Self::Description => "dsc",
            Self::FlagSource => "flg",
            Self::DateSource => "dat",
        }
    }
}

/// Ids embed the pane level, which is never reused, so they are unique for
/// the whole session: `prm{pane}_{role}{index:02}`.
pub fn parameter_control_id(pane: PaneLevel, role: ParameterRole, index: usize) -> ControlId {
    ControlId::new(format!(
        "{PARAMETER_PREFIX}{}_{}{index:02}",
        pane.get(),
        role.tag()
    ))
}

pub fn generate_control_id(pane: PaneLevel) -> ControlId {
    ControlId::new(format!("{GENERATE_PREFIX}{:06}", pane.get()))
}

/// Keyed by pane level, so a header left behind by a failed render never
/// collides with a later one.
pub fn tab_control_id(pane: PaneLevel) -> ControlId {
    ControlId::new(format!("{TAB_PREFIX}{:04}", pane.get()))
}

pub fn picker_surface_id(stamp: i128) -> SurfaceId {
    SurfaceId::new(format!("{PICKER_PREFIX}{stamp}"))
}

pub fn is_trigger_control(control: &ControlId) -> bool {
    control
        .as_str()
        .strip_prefix(PARAMETER_PREFIX)
        .and_then(|rest| rest.split_once('_'))
        .is_some_and(|(pane, role)| {
            !pane.is_empty()
                && pane.bytes().all(|byte| byte.is_ascii_digit())
                && role.starts_with(ParameterRole::Trigger.tag())
        })
}

pub fn is_generate_control(control: &ControlId) -> bool {
    control
        .as_str()
        .strip_prefix(GENERATE_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|byte| byte.is_ascii_digit()))
}

pub fn is_picker_surface(surface: &SurfaceId) -> bool {
    surface.as_str().starts_with(PICKER_PREFIX)
}
