// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::catalog::MetadataStore;
use crate::host::{Bounds, ControlKind, ControlSpec, HostSurface, SurfaceSpec};
use crate::layout::{PICKER_GRID, picker_surface_id};
use crate::{ControlId, InstanceRegistry, QueryPickerContext, QueryRows, SurfaceId};

/// Token in a description query that receives the picked value.
pub const DESCRIPTION_PLACEHOLDER: &str = "filtro";

const PICKER_TITLE: &str = "Select value";
const PICKER_WIDTH: i32 = 550;
const PICKER_HEIGHT: i32 = 400;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    /// Stale picker, empty grid, or a row outside the result set.
    Ignored,
    Applied {
        value: String,
        description: Option<String>,
    },
}

/// Opens value pickers and writes their selections back to the origin.
#[derive(Debug, Default)]
pub struct QueryPicker {
    last_stamp: i128,
}

impl QueryPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp-derived id, bumped when two pickers land on the same tick.
    fn next_surface_id(&mut self) -> SurfaceId {
        let now = OffsetDateTime::now_utc().unix_timestamp_nanos();
        let stamp = if now > self.last_stamp {
            now
        } else {
            self.last_stamp + 1
        };
        self.last_stamp = stamp;
        picker_surface_id(stamp)
    }

    /// Returns the new picker id, or `None` when the trigger has no query.
    pub fn open<H, S>(
        &mut self,
        host: &mut H,
        store: &S,
        registry: &mut InstanceRegistry,
        origin: &SurfaceId,
        trigger: &ControlId,
    ) -> Result<Option<SurfaceId>>
    where
        H: HostSurface + ?Sized,
        S: MetadataStore + ?Sized,
    {
        let Some(context) = registry.parameter_context(trigger) else {
            return Ok(None);
        };
        if context.query.trim().is_empty() {
            return Ok(None);
        }

        let rows = store
            .run_query(&context.query)
            .with_context(|| format!("run value query for {trigger}"))?;
        let picker_context = QueryPickerContext {
            origin_surface: origin.clone(),
            value_control: context.value_control.clone(),
            description_control: context.description_control.clone(),
            description_query: context.description_query.clone(),
        };

        let picker = self.next_surface_id();
        host.create_surface(&SurfaceSpec {
            id: picker.clone(),
            title: PICKER_TITLE.to_owned(),
            width: PICKER_WIDTH,
            height: PICKER_HEIGHT,
        })
        .context("create picker surface")?;

        let row_count = rows.rows.len();
        if let Err(error) = populate_picker(host, &picker, rows) {
            if let Err(close_error) = host.close_surface(&picker) {
                warn!(
                    picker = %picker,
                    error = %format!("{close_error:#}"),
                    "close unpopulated picker surface"
                );
            }
            return Err(error.context("populate picker surface"));
        }

        registry.register_picker_context(picker.clone(), picker_context);
        debug!(picker = %picker, trigger = %trigger, rows = row_count, "opened value picker");
        Ok(Some(picker))
    }

    /// Copies column 0 of `row` into the origin control and resolves the
    /// description. Once a value is read, the picker context is removed and
    /// the surface closed no matter how the rest goes.
    pub fn apply<H, S>(
        &mut self,
        host: &mut H,
        store: &S,
        registry: &mut InstanceRegistry,
        picker: &SurfaceId,
        row: usize,
    ) -> Result<PickerOutcome>
    where
        H: HostSurface + ?Sized,
        S: MetadataStore + ?Sized,
    {
        let Some(context) = registry.picker_context(picker) else {
            return Ok(PickerOutcome::Ignored);
        };

        let grid = match host.grid(picker, &ControlId::from(PICKER_GRID)) {
            Ok(grid) => grid,
            Err(error) => {
                registry.take_picker_context(picker);
                return Err(error.context("read picker grid"));
            }
        };
        if grid.columns.is_empty() {
            return Ok(PickerOutcome::Ignored);
        }
        let Some(value) = grid.cell(row, 0).map(str::to_owned) else {
            return Ok(PickerOutcome::Ignored);
        };
        let context = context.clone();

        let written = host
            .set_control_value(&context.origin_surface, &context.value_control, &value)
            .with_context(|| format!("write picked value into {}", context.value_control));
        let description = match &written {
            Ok(()) => resolve_description(host, store, &context, &value),
            Err(_) => None,
        };

        registry.take_picker_context(picker);
        if let Err(error) = host.close_surface(picker) {
            warn!(picker = %picker, error = %format!("{error:#}"), "close picker surface");
        }

        written?;
        Ok(PickerOutcome::Applied { value, description })
    }

    /// Forgets a picker the user dismissed without choosing.
    pub fn abandon(&mut self, registry: &mut InstanceRegistry, picker: &SurfaceId) -> bool {
        registry.take_picker_context(picker).is_some()
    }
}

fn populate_picker<H: HostSurface + ?Sized>(
    host: &mut H,
    picker: &SurfaceId,
    rows: QueryRows,
) -> Result<()> {
    let grid = ControlId::from(PICKER_GRID);
    host.add_control(
        picker,
        ControlSpec {
            id: grid.clone(),
            kind: ControlKind::Grid,
            bounds: Bounds::new(10, 10, 500, 330),
            pane: None,
        },
    )?;
    host.bind_grid(picker, &grid, rows)?;
    host.show_surface(picker)
}

/// Best effort: failures are logged and leave the description untouched.
fn resolve_description<H, S>(
    host: &mut H,
    store: &S,
    context: &QueryPickerContext,
    value: &str,
) -> Option<String>
where
    H: HostSurface + ?Sized,
    S: MetadataStore + ?Sized,
{
    let control = context.description_control.as_ref()?;
    if context.description_query.trim().is_empty()
        || !host.has_control(&context.origin_surface, control)
    {
        return None;
    }

    let query = substitute_placeholder(&context.description_query, value);
    let resolved = store
        .scalar(&query)
        .and_then(|description| {
            host.set_control_value(&context.origin_surface, control, &description)?;
            Ok(description)
        });
    match resolved {
        Ok(description) => Some(description),
        Err(error) => {
            warn!(
                control = %control,
                error = %format!("{error:#}"),
                "description lookup failed"
            );
            None
        }
    }
}

/// Doubles single quotes so a value can sit inside a SQL string literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

/// Replaces every occurrence of [`DESCRIPTION_PLACEHOLDER`] with the escaped
/// value. No other interpolation happens.
pub fn substitute_placeholder(template: &str, value: &str) -> String {
    if template.trim().is_empty() {
        return String::new();
    }
    template.replace(DESCRIPTION_PLACEHOLDER, &escape_literal(value))
}
