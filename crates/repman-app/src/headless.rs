// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;

use crate::host::{
    Bounds, ControlKind, ControlSpec, ControlValue, HostSurface, StatusMessage, SurfaceSpec,
};
use crate::layout::ScreenLayout;
use crate::{BASE_PANE, ControlId, PaneLevel, QueryRows, SurfaceId};

pub const HOME_TAB_CAPTION: &str = "Reports";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryControl {
    pub spec: ControlSpec,
    pub value: ControlValue,
    pub visible: bool,
    pub rows: QueryRows,
    pub choices: Vec<(String, String)>,
    pub selected_choice: Option<usize>,
}

impl MemoryControl {
    fn new(spec: ControlSpec) -> Self {
        let value = match &spec.kind {
            ControlKind::TextField { value, .. } => ControlValue::Text(value.clone()),
            ControlKind::Toggle { .. } => ControlValue::Toggle(None),
            ControlKind::Label { caption }
            | ControlKind::Button { caption }
            | ControlKind::Tab { caption, .. } => ControlValue::Text(caption.clone()),
            ControlKind::Grid | ControlKind::Chooser => ControlValue::Text(String::new()),
        };
        Self {
            spec,
            value,
            visible: true,
            rows: QueryRows::default(),
            choices: Vec::new(),
            selected_choice: None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            ControlValue::Text(text) => Some(text),
            ControlValue::Toggle(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySurface {
    pub spec: SurfaceSpec,
    pub shown: bool,
    pub active_pane: PaneLevel,
    pub focused: Option<ControlId>,
    controls: Vec<MemoryControl>,
}

impl MemorySurface {
    pub fn controls(&self) -> &[MemoryControl] {
        &self.controls
    }

    fn control(&self, id: &ControlId) -> Option<&MemoryControl> {
        self.controls.iter().find(|control| &control.spec.id == id)
    }

    fn control_mut(&mut self, id: &ControlId) -> Result<&mut MemoryControl> {
        let surface = self.spec.id.clone();
        self.controls
            .iter_mut()
            .find(|control| &control.spec.id == id)
            .ok_or_else(|| anyhow!("control {id} not found on surface {surface}"))
    }
}

/// In-process [`HostSurface`] that keeps every surface and control in memory.
/// Drives the engine from the command line and from tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    surfaces: BTreeMap<SurfaceId, MemorySurface>,
    statuses: Vec<StatusMessage>,
    closed: Vec<SurfaceId>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host with the principal screen already built: home tab, department
    /// chooser and reports grid.
    pub fn with_principal(layout: &ScreenLayout) -> Result<Self> {
        let mut host = Self::new();
        host.create_surface(&SurfaceSpec {
            id: layout.principal.clone(),
            title: "Report manager".to_owned(),
            width: 960,
            height: 560,
        })?;
        host.add_control(
            &layout.principal,
            ControlSpec {
                id: layout.home_tab.clone(),
                kind: ControlKind::Tab {
                    caption: HOME_TAB_CAPTION.to_owned(),
                    pane: BASE_PANE,
                    group_with: None,
                },
                bounds: Bounds::new(420, 40, 100, 20),
                pane: None,
            },
        )?;
        host.add_control(
            &layout.principal,
            ControlSpec {
                id: layout.department_chooser.clone(),
                kind: ControlKind::Chooser,
                bounds: Bounds::new(10, 40, 400, 20),
                pane: None,
            },
        )?;
        host.add_control(
            &layout.principal,
            ControlSpec {
                id: layout.reports_grid.clone(),
                kind: ControlKind::Grid,
                bounds: Bounds::new(10, 70, 400, 460),
                pane: None,
            },
        )?;
        host.show_surface(&layout.principal)?;
        Ok(host)
    }

    pub fn surface(&self, surface: &SurfaceId) -> Option<&MemorySurface> {
        self.surfaces.get(surface)
    }

    pub fn has_surface(&self, surface: &SurfaceId) -> bool {
        self.surfaces.contains_key(surface)
    }

    pub fn surface_ids(&self) -> impl Iterator<Item = &SurfaceId> {
        self.surfaces.keys()
    }

    pub fn control(&self, surface: &SurfaceId, control: &ControlId) -> Option<&MemoryControl> {
        self.surfaces.get(surface)?.control(control)
    }

    /// Controls scoped to exactly `pane`, in creation order.
    pub fn controls_in_pane(&self, surface: &SurfaceId, pane: PaneLevel) -> Vec<&MemoryControl> {
        self.surfaces
            .get(surface)
            .map(|surface| {
                surface
                    .controls
                    .iter()
                    .filter(|control| control.spec.pane == Some(pane))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn active_pane(&self, surface: &SurfaceId) -> Option<PaneLevel> {
        self.surfaces.get(surface).map(|surface| surface.active_pane)
    }

    pub fn statuses(&self) -> &[StatusMessage] {
        &self.statuses
    }

    pub fn last_status(&self) -> Option<&StatusMessage> {
        self.statuses.last()
    }

    pub fn closed_surfaces(&self) -> &[SurfaceId] {
        &self.closed
    }

    fn surface_mut(&mut self, surface: &SurfaceId) -> Result<&mut MemorySurface> {
        self.surfaces
            .get_mut(surface)
            .ok_or_else(|| anyhow!("surface {surface} is not open"))
    }

    fn surface_ref(&self, surface: &SurfaceId) -> Result<&MemorySurface> {
        self.surfaces
            .get(surface)
            .ok_or_else(|| anyhow!("surface {surface} is not open"))
    }
}

impl HostSurface for MemoryHost {
    fn create_surface(&mut self, spec: &SurfaceSpec) -> Result<()> {
        if self.surfaces.contains_key(&spec.id) {
            bail!("surface {} already exists", spec.id);
        }
        self.surfaces.insert(
            spec.id.clone(),
            MemorySurface {
                spec: spec.clone(),
                shown: false,
                active_pane: BASE_PANE,
                focused: None,
                controls: Vec::new(),
            },
        );
        Ok(())
    }

    fn show_surface(&mut self, surface: &SurfaceId) -> Result<()> {
        self.surface_mut(surface)?.shown = true;
        Ok(())
    }

    fn close_surface(&mut self, surface: &SurfaceId) -> Result<()> {
        if self.surfaces.remove(surface).is_none() {
            bail!("surface {surface} is not open");
        }
        self.closed.push(surface.clone());
        Ok(())
    }

    fn add_control(&mut self, surface: &SurfaceId, control: ControlSpec) -> Result<()> {
        let target = self.surface_mut(surface)?;
        if target.control(&control.id).is_some() {
            bail!("control {} already exists on surface {surface}", control.id);
        }
        target.controls.push(MemoryControl::new(control));
        Ok(())
    }

    fn has_control(&self, surface: &SurfaceId, control: &ControlId) -> bool {
        self.control(surface, control).is_some()
    }

    fn control_bounds(&self, surface: &SurfaceId, control: &ControlId) -> Result<Bounds> {
        self.surface_ref(surface)?
            .control(control)
            .map(|control| control.spec.bounds)
            .ok_or_else(|| anyhow!("control {control} not found on surface {surface}"))
    }

    fn control_value(&self, surface: &SurfaceId, control: &ControlId) -> Result<ControlValue> {
        self.surface_ref(surface)?
            .control(control)
            .map(|control| control.value.clone())
            .ok_or_else(|| anyhow!("control {control} not found on surface {surface}"))
    }

    fn set_control_value(
        &mut self,
        surface: &SurfaceId,
        control: &ControlId,
        value: &str,
    ) -> Result<()> {
        let target = self.surface_mut(surface)?.control_mut(control)?;
        target.value = match &target.spec.kind {
            ControlKind::Toggle { on, off, .. } => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    ControlValue::Toggle(None)
                } else if trimmed.eq_ignore_ascii_case(on) {
                    ControlValue::Toggle(Some(true))
                } else if trimmed.eq_ignore_ascii_case(off) {
                    ControlValue::Toggle(Some(false))
                } else {
                    bail!("toggle {control} accepts {on} or {off}, got {value:?}");
                }
            }
            ControlKind::Grid => bail!("grid {control} has no editable value"),
            _ => ControlValue::Text(value.to_owned()),
        };
        Ok(())
    }

    fn set_control_visible(
        &mut self,
        surface: &SurfaceId,
        control: &ControlId,
        visible: bool,
    ) -> Result<()> {
        self.surface_mut(surface)?.control_mut(control)?.visible = visible;
        Ok(())
    }

    fn focus_control(&mut self, surface: &SurfaceId, control: &ControlId) -> Result<()> {
        let target = self.surface_mut(surface)?;
        target.control_mut(control)?;
        target.focused = Some(control.clone());
        Ok(())
    }

    fn configure_tab(
        &mut self,
        surface: &SurfaceId,
        tab: &ControlId,
        caption: &str,
        pane: PaneLevel,
    ) -> Result<()> {
        let target = self.surface_mut(surface)?.control_mut(tab)?;
        let ControlKind::Tab {
            caption: current,
            pane: current_pane,
            ..
        } = &mut target.spec.kind
        else {
            bail!("control {tab} is not a tab");
        };
        *current = caption.to_owned();
        *current_pane = pane;
        target.value = ControlValue::Text(caption.to_owned());
        Ok(())
    }

    fn set_active_pane(&mut self, surface: &SurfaceId, pane: PaneLevel) -> Result<()> {
        self.surface_mut(surface)?.active_pane = pane;
        Ok(())
    }

    fn bind_grid(&mut self, surface: &SurfaceId, grid: &ControlId, rows: QueryRows) -> Result<()> {
        let target = self.surface_mut(surface)?.control_mut(grid)?;
        if target.spec.kind != ControlKind::Grid {
            bail!("control {grid} is not a grid");
        }
        target.rows = rows;
        Ok(())
    }

    fn grid(&self, surface: &SurfaceId, grid: &ControlId) -> Result<&QueryRows> {
        let control = self
            .surface_ref(surface)?
            .control(grid)
            .ok_or_else(|| anyhow!("grid {grid} not found on surface {surface}"))?;
        if control.spec.kind != ControlKind::Grid {
            bail!("control {grid} is not a grid");
        }
        Ok(&control.rows)
    }

    fn set_choices(
        &mut self,
        surface: &SurfaceId,
        chooser: &ControlId,
        choices: Vec<(String, String)>,
        selected: Option<usize>,
    ) -> Result<()> {
        let target = self.surface_mut(surface)?.control_mut(chooser)?;
        if target.spec.kind != ControlKind::Chooser {
            bail!("control {chooser} is not a chooser");
        }
        let selected = selected.filter(|index| *index < choices.len());
        target.value = ControlValue::Text(
            selected
                .and_then(|index| choices.get(index))
                .map(|(code, _)| code.clone())
                .unwrap_or_default(),
        );
        target.choices = choices;
        target.selected_choice = selected;
        Ok(())
    }

    fn post_status(&mut self, message: &StatusMessage) {
        self.statuses.push(message.clone());
    }
}
