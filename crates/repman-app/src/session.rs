// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use time::{Date, OffsetDateTime};
use tracing::{debug, error, info};

use crate::catalog::{MetadataStore, load_catalog};
use crate::controls::ControlRenderer;
use crate::events::{EventAdapter, HostEvent, RawHostEvent};
use crate::generate::{ArtifactResolver, GenerateError, collect_values};
use crate::host::{HostSurface, StatusMessage};
use crate::layout::{REPORT_CODE_COLUMN, REPORT_NAME_COLUMN, ScreenLayout};
use crate::picker::{PickerOutcome, QueryPicker};
use crate::tabs::TabAllocator;
use crate::viewer::{RenderOutcome, ViewerLauncher};
use crate::{ControlId, InstanceRegistry, QueryRows, ReportSummary, SurfaceId, TabHandle};

pub const REPORT_OPENED: &str = "report opened";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub layout: ScreenLayout,
    pub resolver: ArtifactResolver,
}

/// Owns every piece of per-screen state and reacts to host events.
///
/// One session serves one principal screen on the host's UI thread. Nothing
/// it registers is released before the session itself is dropped.
pub struct Session<S> {
    store: S,
    config: SessionConfig,
    adapter: EventAdapter,
    registry: InstanceRegistry,
    allocator: TabAllocator,
    renderer: ControlRenderer,
    picker: QueryPicker,
    launcher: ViewerLauncher,
}

impl<S: MetadataStore> Session<S> {
    pub fn new(store: S, launcher: ViewerLauncher, config: SessionConfig) -> Self {
        Self {
            adapter: EventAdapter::new(config.layout.clone()),
            allocator: TabAllocator::new(config.layout.home_tab.clone()),
            renderer: ControlRenderer::new(OffsetDateTime::now_utc().date()),
            registry: InstanceRegistry::new(),
            picker: QueryPicker::new(),
            store,
            config,
            launcher,
        }
    }

    /// Pins the date used to seed date fields.
    pub fn with_today(mut self, today: Date) -> Self {
        self.renderer = ControlRenderer::new(today);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn layout(&self) -> &ScreenLayout {
        &self.config.layout
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn launcher(&self) -> &ViewerLauncher {
        &self.launcher
    }

    /// Classifies and handles a raw host event. Unrecognised events are
    /// ignored.
    pub fn handle_raw<H: HostSurface + ?Sized>(
        &mut self,
        host: &mut H,
        raw: &RawHostEvent,
    ) -> Option<StatusMessage> {
        match self.adapter.classify(raw) {
            Some(event) => self.handle(host, event),
            None => {
                self.drain_outcomes();
                None
            }
        }
    }

    /// Entry point for the host event loop. Failures never escape: they are
    /// logged and turned into a status message, which is also returned.
    pub fn handle<H: HostSurface + ?Sized>(
        &mut self,
        host: &mut H,
        event: HostEvent,
    ) -> Option<StatusMessage> {
        self.drain_outcomes();

        let result = match event {
            HostEvent::DepartmentSelected {
                surface,
                department,
            } => self
                .select_department(host, &surface, &department)
                .map(|()| None),
            HostEvent::ReportSelected { surface, row } => {
                self.select_report_row(host, &surface, row).map(|_| None)
            }
            HostEvent::ParameterTriggerPressed { surface, control } => {
                self.open_picker(host, &surface, &control).map(|_| None)
            }
            HostEvent::PickerRowSelected { picker, row } => {
                self.apply_selection(host, &picker, row).map(|_| None)
            }
            HostEvent::PickerClosed { picker } => {
                self.picker.abandon(&mut self.registry, &picker);
                Ok(None)
            }
            HostEvent::GeneratePressed { control, .. } => self
                .generate_for_control(host, &control)
                .map(|job| job.map(|_| StatusMessage::success(REPORT_OPENED))),
        };

        let status = match result {
            Ok(status) => status,
            Err(error) => Some(failure_status(&error)),
        };
        if let Some(status) = &status {
            host.post_status(status);
        }
        status
    }

    /// Fills the department chooser, selects the first department and shows
    /// its reports.
    pub fn open_principal<H: HostSurface + ?Sized>(&mut self, host: &mut H) -> Result<()> {
        let departments = self.store.departments().context("load departments")?;
        let first = departments.first().map(|department| department.code.clone());
        let choices = departments
            .into_iter()
            .map(|department| (department.code, department.name))
            .collect::<Vec<_>>();
        let selected = first.as_ref().map(|_| 0);

        let layout = &self.config.layout;
        host.set_choices(
            &layout.principal,
            &layout.department_chooser,
            choices,
            selected,
        )
        .context("fill department chooser")?;

        match first {
            Some(code) => {
                let surface = layout.principal.clone();
                self.select_department(host, &surface, &code)
            }
            None => host
                .bind_grid(&layout.principal, &layout.reports_grid, report_rows(Vec::new()))
                .context("clear reports grid"),
        }
    }

    /// Rebinds the reports grid to the reports of one department.
    pub fn select_department<H: HostSurface + ?Sized>(
        &mut self,
        host: &mut H,
        surface: &SurfaceId,
        department: &str,
    ) -> Result<()> {
        if department.trim().is_empty() {
            return Ok(());
        }
        let reports = self
            .store
            .reports_for_department(department)
            .with_context(|| format!("load reports for department {department}"))?;
        debug!(department, reports = reports.len(), "showing department reports");
        host.bind_grid(surface, &self.config.layout.reports_grid, report_rows(reports))
            .context("bind reports grid")
    }

    fn select_report_row<H: HostSurface + ?Sized>(
        &mut self,
        host: &mut H,
        surface: &SurfaceId,
        row: usize,
    ) -> Result<Option<TabHandle>> {
        let grid = host
            .grid(surface, &self.config.layout.reports_grid)
            .context("read reports grid")?;
        let code = grid
            .named_cell(row, REPORT_CODE_COLUMN)
            .or_else(|| grid.cell(row, 0))
            .unwrap_or_default()
            .trim()
            .to_owned();
        if code.is_empty() {
            return Ok(None);
        }
        let name = grid
            .named_cell(row, REPORT_NAME_COLUMN)
            .or_else(|| grid.cell(row, 1))
            .unwrap_or_default()
            .trim()
            .to_owned();

        self.select_report(host, surface, &ReportSummary { code, name })
            .map(Some)
    }

    /// Shows the tab for `report`, building it on first selection. The
    /// catalog is read before any control is created, so a failed load
    /// leaves the screen untouched.
    pub fn select_report<H: HostSurface + ?Sized>(
        &mut self,
        host: &mut H,
        surface: &SurfaceId,
        report: &ReportSummary,
    ) -> Result<TabHandle> {
        let handle = match self.registry.find_report(&report.code) {
            Some(handle) => handle,
            None => {
                let definitions = load_catalog(&self.store, &report.code)?;
                let allocator = &mut self.allocator;
                let renderer = &self.renderer;
                let (handle, _) = self.registry.get_or_create(&report.code, |existing| {
                    let allocation = allocator.allocate(host, surface, &report.code, existing)?;
                    let tab_control = allocation.tab_control.clone();
                    match renderer.render(host, surface, report, allocation, definitions) {
                        Ok(rendered) => Ok(rendered),
                        Err(error) => {
                            allocator.discard(host, surface, &tab_control);
                            Err(error)
                        }
                    }
                })?;
                info!(report_code = %report.code, "opened report tab");
                handle
            }
        };

        let selected = self
            .registry
            .tab(handle)
            .ok_or_else(|| anyhow!("report tab for {} is not registered", report.code))?;
        self.allocator
            .activate(host, self.registry.tabs(), selected)
            .with_context(|| format!("activate tab for report {}", report.code))?;
        Ok(handle)
    }

    pub fn open_picker<H: HostSurface + ?Sized>(
        &mut self,
        host: &mut H,
        surface: &SurfaceId,
        trigger: &ControlId,
    ) -> Result<Option<SurfaceId>> {
        self.picker
            .open(host, &self.store, &mut self.registry, surface, trigger)
    }

    pub fn apply_selection<H: HostSurface + ?Sized>(
        &mut self,
        host: &mut H,
        picker: &SurfaceId,
        row: usize,
    ) -> Result<PickerOutcome> {
        self.picker
            .apply(host, &self.store, &mut self.registry, picker, row)
    }

    fn generate_for_control<H: HostSurface + ?Sized>(
        &mut self,
        host: &mut H,
        control: &ControlId,
    ) -> Result<Option<u64>> {
        match self.registry.find_generate(control) {
            Some(handle) => self.generate(host, handle).map(Some),
            None => Ok(None),
        }
    }

    /// Validates the tab's values, resolves its report file and launches the
    /// viewer. Returns the viewer job id.
    pub fn generate<H: HostSurface + ?Sized>(
        &mut self,
        host: &mut H,
        handle: TabHandle,
    ) -> Result<u64> {
        let tab = self
            .registry
            .tab(handle)
            .ok_or_else(|| anyhow!("report tab is not registered"))?;
        let values = collect_values(host, tab)?;
        let artifact = self
            .config
            .resolver
            .resolve(&tab.report_code, &tab.report_name)?;
        debug!(
            report_code = %tab.report_code,
            artifact = %artifact.display(),
            values = values.len(),
            "resolved report artifact"
        );
        self.launcher.launch(&tab.report_code, artifact, values)
    }

    /// Logs and returns viewer outcomes that arrived since the last call.
    pub fn drain_outcomes(&self) -> Vec<RenderOutcome> {
        let outcomes = self.launcher.drain();
        for outcome in &outcomes {
            outcome.log();
        }
        outcomes
    }
}

fn report_rows(reports: Vec<ReportSummary>) -> QueryRows {
    QueryRows {
        columns: vec![REPORT_CODE_COLUMN.to_owned(), REPORT_NAME_COLUMN.to_owned()],
        rows: reports
            .into_iter()
            .map(|report| vec![report.code, report.name])
            .collect(),
    }
}

/// Validation problems are the user's to fix and only warrant an info line.
fn failure_status(failure: &anyhow::Error) -> StatusMessage {
    if let Some(generate) = failure.downcast_ref::<GenerateError>() {
        if generate.is_validation() {
            info!(reason = %generate, "report generation blocked");
            return StatusMessage::warning(generate.to_string());
        }
        error!(error = %format!("{failure:#}"), "report generation failed");
        return StatusMessage::error(generate.to_string());
    }

    error!(error = %format!("{failure:#}"), "host event failed");
    StatusMessage::error(failure.to_string())
}
