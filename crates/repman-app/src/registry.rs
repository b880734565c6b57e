// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::collections::HashMap;

use crate::{ControlId, PaneLevel, ParameterDefinition, ParameterType, SurfaceId, TabHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInstance {
    pub definition: ParameterDefinition,
    pub value_control: ControlId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTabContext {
    pub report_code: String,
    pub report_name: String,
    pub surface: SurfaceId,
    pub tab_control: ControlId,
    pub pane: PaneLevel,
    pub generate_control: ControlId,
    pub parameters: Vec<ParameterInstance>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterUiContext {
    pub value_control: ControlId,
    pub description_control: Option<ControlId>,
    pub parameter_type: ParameterType,
    pub query: String,
    pub description_query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPickerContext {
    pub origin_surface: SurfaceId,
    pub value_control: ControlId,
    pub description_control: Option<ControlId>,
    pub description_query: String,
}

/// A freshly rendered tab plus the correlation records its controls need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTab {
    pub context: ReportTabContext,
    pub parameter_contexts: Vec<(ControlId, ParameterUiContext)>,
}

/// Session-lifetime tables of tab contexts and in-flight pickers.
///
/// Tabs live in an arena addressed by [`TabHandle`]; the string-keyed maps
/// only index into it. Nothing is evicted while the session runs.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    tabs: Vec<ReportTabContext>,
    by_report: HashMap<String, TabHandle>,
    by_generate: HashMap<ControlId, TabHandle>,
    parameter_contexts: HashMap<ControlId, ParameterUiContext>,
    pickers: HashMap<SurfaceId, QueryPickerContext>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `report_code`, building the tab with `create`
    /// when none exists. `create` receives the number of tabs already built.
    /// The flag is `true` when a new tab was registered.
    pub fn get_or_create<F>(&mut self, report_code: &str, create: F) -> Result<(TabHandle, bool)>
    where
        F: FnOnce(usize) -> Result<RenderedTab>,
    {
        if let Some(handle) = self.find_report(report_code) {
            return Ok((handle, false));
        }

        let rendered = create(self.tabs.len())?;
        Ok((self.insert(rendered), true))
    }

    fn insert(&mut self, rendered: RenderedTab) -> TabHandle {
        let RenderedTab {
            context,
            parameter_contexts,
        } = rendered;

        let handle = TabHandle::new(self.tabs.len());
        self.by_report
            .insert(report_key(&context.report_code), handle);
        self.by_generate
            .insert(context.generate_control.clone(), handle);
        for (control, parameter_context) in parameter_contexts {
            self.register_parameter_context(control, parameter_context);
        }
        self.tabs.push(context);
        handle
    }

    pub fn find_report(&self, report_code: &str) -> Option<TabHandle> {
        self.by_report.get(&report_key(report_code)).copied()
    }

    pub fn find_generate(&self, control: &ControlId) -> Option<TabHandle> {
        self.by_generate.get(control).copied()
    }

    pub fn tab(&self, handle: TabHandle) -> Option<&ReportTabContext> {
        self.tabs.get(handle.index())
    }

    pub fn tabs(&self) -> impl Iterator<Item = &ReportTabContext> {
        self.tabs.iter()
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn register_parameter_context(&mut self, control: ControlId, context: ParameterUiContext) {
        self.parameter_contexts.insert(control, context);
    }

    pub fn parameter_context(&self, control: &ControlId) -> Option<&ParameterUiContext> {
        self.parameter_contexts.get(control)
    }

    pub fn register_picker_context(&mut self, picker: SurfaceId, context: QueryPickerContext) {
        self.pickers.insert(picker, context);
    }

    pub fn picker_context(&self, picker: &SurfaceId) -> Option<&QueryPickerContext> {
        self.pickers.get(picker)
    }

    pub fn take_picker_context(&mut self, picker: &SurfaceId) -> Option<QueryPickerContext> {
        self.pickers.remove(picker)
    }

    pub fn open_picker_count(&self) -> usize {
        self.pickers.len()
    }
}

/// Report codes compare case-insensitively.
fn report_key(report_code: &str) -> String {
    report_code.trim().to_ascii_uppercase()
}
