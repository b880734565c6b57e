// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;

use crate::{ControlId, PaneLevel, QueryRows, SurfaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Dedicated value slot a control is bound to on its surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backing {
    /// Single character, `Y` or `N`.
    Flag { source: String },
    Date { source: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    Label {
        caption: String,
    },
    TextField {
        value: String,
        read_only: bool,
        backing: Option<Backing>,
    },
    Toggle {
        on: String,
        off: String,
        backing: Backing,
    },
    Button {
        caption: String,
    },
    /// A tab header that switches the surface to `pane` when selected.
    Tab {
        caption: String,
        pane: PaneLevel,
        group_with: Option<ControlId>,
    },
    Grid,
    Chooser,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSpec {
    pub id: ControlId,
    pub kind: ControlKind,
    pub bounds: Bounds,
    /// Pane the control is visible in; `None` means every pane.
    pub pane: Option<PaneLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    Text(String),
    /// `None` until the user touches the toggle.
    Toggle(Option<bool>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSpec {
    pub id: SurfaceId,
    pub title: String,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

/// Outbound calls the orchestration engine makes into the host UI.
///
/// Implementations deliver events on a single thread and are called back from
/// the same thread, so methods take `&mut self` without any locking.
pub trait HostSurface {
    fn create_surface(&mut self, spec: &SurfaceSpec) -> Result<()>;
    fn show_surface(&mut self, surface: &SurfaceId) -> Result<()>;
    fn close_surface(&mut self, surface: &SurfaceId) -> Result<()>;

    fn add_control(&mut self, surface: &SurfaceId, control: ControlSpec) -> Result<()>;
    fn has_control(&self, surface: &SurfaceId, control: &ControlId) -> bool;
    fn control_bounds(&self, surface: &SurfaceId, control: &ControlId) -> Result<Bounds>;
    fn control_value(&self, surface: &SurfaceId, control: &ControlId) -> Result<ControlValue>;
    fn set_control_value(
        &mut self,
        surface: &SurfaceId,
        control: &ControlId,
        value: &str,
    ) -> Result<()>;
    fn set_control_visible(
        &mut self,
        surface: &SurfaceId,
        control: &ControlId,
        visible: bool,
    ) -> Result<()>;
    fn focus_control(&mut self, surface: &SurfaceId, control: &ControlId) -> Result<()>;

    /// Retitles an existing tab header and points it at `pane`.
    fn configure_tab(
        &mut self,
        surface: &SurfaceId,
        tab: &ControlId,
        caption: &str,
        pane: PaneLevel,
    ) -> Result<()>;
    fn set_active_pane(&mut self, surface: &SurfaceId, pane: PaneLevel) -> Result<()>;

    fn bind_grid(&mut self, surface: &SurfaceId, grid: &ControlId, rows: QueryRows) -> Result<()>;
    fn grid(&self, surface: &SurfaceId, grid: &ControlId) -> Result<&QueryRows>;
    fn set_choices(
        &mut self,
        surface: &SurfaceId,
        chooser: &ControlId,
        choices: Vec<(String, String)>,
        selected: Option<usize>,
    ) -> Result<()>;

    fn post_status(&mut self, message: &StatusMessage);
}
