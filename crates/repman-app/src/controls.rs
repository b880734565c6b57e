// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use time::Date;
use time::macros::format_description;
use tracing::debug;

use crate::host::{Backing, Bounds, ControlKind, ControlSpec, HostSurface};
use crate::layout::{ParameterRole, generate_control_id, parameter_control_id};
use crate::tabs::TabAllocation;
use crate::{
    ControlId, PaneLevel, ParameterDefinition, ParameterInstance, ParameterType,
    ParameterUiContext, RenderedTab, ReportSummary, ReportTabContext, SurfaceId,
};

const FIRST_ROW_TOP: i32 = 70;
const ROW_STEP: i32 = 24;
const CONTROL_HEIGHT: i32 = 15;
const LABEL_LEFT: i32 = 430;
const LABEL_WIDTH: i32 = 120;
const VALUE_LEFT: i32 = 560;
const VALUE_WIDTH: i32 = 100;
const TOGGLE_WIDTH: i32 = 20;
const TRIGGER_LEFT: i32 = 665;
const TRIGGER_WIDTH: i32 = 24;
const DESCRIPTION_LEFT: i32 = 694;
const DESCRIPTION_WIDTH: i32 = 250;
const GENERATE_LEFT: i32 = 824;
const GENERATE_WIDTH: i32 = 120;
const GENERATE_GAP: i32 = 10;

pub const TRIGGER_CAPTION: &str = "...";
pub const GENERATE_CAPTION: &str = "Generate report";

/// Builds the parameter block of a freshly allocated report tab.
#[derive(Debug, Clone, Copy)]
pub struct ControlRenderer {
    today: Date,
}

impl ControlRenderer {
    pub fn new(today: Date) -> Self {
        Self { today }
    }

    /// Adds one row of controls per definition, top to bottom, then the
    /// generate button. Every control is scoped to the tab's pane so the
    /// whole block shows and hides together.
    pub fn render<H: HostSurface + ?Sized>(
        &self,
        host: &mut H,
        surface: &SurfaceId,
        report: &ReportSummary,
        allocation: TabAllocation,
        definitions: Vec<ParameterDefinition>,
    ) -> Result<RenderedTab> {
        let TabAllocation { tab_control, pane } = allocation;
        let mut parameters = Vec::with_capacity(definitions.len());
        let mut parameter_contexts = Vec::new();
        let mut top = FIRST_ROW_TOP;

        for (index, definition) in definitions.into_iter().enumerate() {
            let row = self
                .render_row(host, surface, pane, index, top, &definition)
                .with_context(|| {
                    format!(
                        "render parameter {} of report {}",
                        definition.param_id, report.code
                    )
                })?;

            parameter_contexts.push((row.value_control.clone(), row.context.clone()));
            if let Some(trigger) = row.trigger_control {
                parameter_contexts.push((trigger, row.context));
            }
            parameters.push(ParameterInstance {
                definition,
                value_control: row.value_control,
            });
            top += ROW_STEP;
        }

        let generate_control = generate_control_id(pane);
        host.add_control(
            surface,
            ControlSpec {
                id: generate_control.clone(),
                kind: ControlKind::Button {
                    caption: GENERATE_CAPTION.to_owned(),
                },
                bounds: Bounds::new(
                    GENERATE_LEFT,
                    FIRST_ROW_TOP.max(top + GENERATE_GAP),
                    GENERATE_WIDTH,
                    CONTROL_HEIGHT + 4,
                ),
                pane: Some(pane),
            },
        )
        .with_context(|| format!("add generate button for report {}", report.code))?;

        debug!(
            report_code = %report.code,
            pane = pane.get(),
            parameters = parameters.len(),
            "rendered parameter controls"
        );

        Ok(RenderedTab {
            context: ReportTabContext {
                report_code: report.code.clone(),
                report_name: report.name.clone(),
                surface: surface.clone(),
                tab_control,
                pane,
                generate_control,
                parameters,
            },
            parameter_contexts,
        })
    }

    fn render_row<H: HostSurface + ?Sized>(
        &self,
        host: &mut H,
        surface: &SurfaceId,
        pane: PaneLevel,
        index: usize,
        top: i32,
        definition: &ParameterDefinition,
    ) -> Result<RenderedRow> {
        let scoped = |id: ControlId, kind: ControlKind, bounds: Bounds| ControlSpec {
            id,
            kind,
            bounds,
            pane: Some(pane),
        };

        host.add_control(
            surface,
            scoped(
                parameter_control_id(pane, ParameterRole::Label, index),
                ControlKind::Label {
                    caption: definition.display_name().to_owned(),
                },
                Bounds::new(LABEL_LEFT, top + 2, LABEL_WIDTH, CONTROL_HEIGHT),
            ),
        )?;

        let value_control = parameter_control_id(pane, ParameterRole::Value, index);
        let (value_kind, value_width) = match definition.param_type {
            ParameterType::Boolean => (
                ControlKind::Toggle {
                    on: "Y".to_owned(),
                    off: "N".to_owned(),
                    backing: Backing::Flag {
                        source: parameter_control_id(pane, ParameterRole::FlagSource, index)
                            .as_str()
                            .to_owned(),
                    },
                },
                TOGGLE_WIDTH,
            ),
            ParameterType::Date => (
                ControlKind::TextField {
                    value: self.today_text()?,
                    read_only: false,
                    backing: Some(Backing::Date {
                        source: parameter_control_id(pane, ParameterRole::DateSource, index)
                            .as_str()
                            .to_owned(),
                    }),
                },
                VALUE_WIDTH,
            ),
            ParameterType::Numeric | ParameterType::Text => (
                ControlKind::TextField {
                    value: String::new(),
                    read_only: false,
                    backing: None,
                },
                VALUE_WIDTH,
            ),
        };
        host.add_control(
            surface,
            scoped(
                value_control.clone(),
                value_kind,
                Bounds::new(VALUE_LEFT, top, value_width, CONTROL_HEIGHT),
            ),
        )?;

        let trigger_control = if definition.has_value_query() {
            let trigger = parameter_control_id(pane, ParameterRole::Trigger, index);
            host.add_control(
                surface,
                scoped(
                    trigger.clone(),
                    ControlKind::Button {
                        caption: TRIGGER_CAPTION.to_owned(),
                    },
                    Bounds::new(TRIGGER_LEFT, top, TRIGGER_WIDTH, CONTROL_HEIGHT),
                ),
            )?;
            Some(trigger)
        } else {
            None
        };

        let description_control = if definition.shows_description() {
            let description = parameter_control_id(pane, ParameterRole::Description, index);
            host.add_control(
                surface,
                scoped(
                    description.clone(),
                    ControlKind::TextField {
                        value: String::new(),
                        read_only: true,
                        backing: None,
                    },
                    Bounds::new(DESCRIPTION_LEFT, top, DESCRIPTION_WIDTH, CONTROL_HEIGHT),
                ),
            )?;
            Some(description)
        } else {
            None
        };

        Ok(RenderedRow {
            context: ParameterUiContext {
                value_control: value_control.clone(),
                description_control,
                parameter_type: definition.param_type,
                query: definition.value_query.clone(),
                description_query: definition.description_query.clone(),
            },
            value_control,
            trigger_control,
        })
    }

    fn today_text(&self) -> Result<String> {
        self.today
            .format(format_description!("[year][month][day]"))
            .context("format current date")
    }
}

struct RenderedRow {
    context: ParameterUiContext,
    value_control: ControlId,
    trigger_control: Option<ControlId>,
}

#[cfg(test)]
mod tests {
    use super::ControlRenderer;
    use crate::headless::MemoryHost;
    use crate::host::{Backing, ControlKind, ControlValue, HostSurface};
    use crate::layout::ScreenLayout;
    use crate::tabs::TabAllocator;
    use crate::{PaneLevel, ParameterDefinition, ParameterType, ReportSummary};
    use anyhow::Result;
    use time::{Date, Month};

    fn definition(param_id: &str, param_type: ParameterType) -> ParameterDefinition {
        ParameterDefinition {
            param_id: param_id.to_owned(),
            description: String::new(),
            param_type,
            is_required: false,
            value_query: String::new(),
            show_description: false,
            description_query: String::new(),
        }
    }

    fn report() -> ReportSummary {
        ReportSummary {
            code: "R1".to_owned(),
            name: "Sales".to_owned(),
        }
    }

    #[test]
    fn rows_get_typed_value_controls_in_the_tab_pane() -> Result<()> {
        let layout = ScreenLayout::default();
        let mut host = MemoryHost::with_principal(&layout)?;
        let mut allocator = TabAllocator::new(layout.home_tab.clone());
        let allocation = allocator.allocate(&mut host, &layout.principal, "R1", 0)?;
        let today = Date::from_calendar_date(2026, Month::October, 16).expect("valid date");

        let rendered = ControlRenderer::new(today).render(
            &mut host,
            &layout.principal,
            &report(),
            allocation,
            vec![
                definition("P1", ParameterType::Boolean),
                definition("P2", ParameterType::Date),
            ],
        )?;

        let flag = &rendered.context.parameters[0].value_control;
        let date = &rendered.context.parameters[1].value_control;
        assert!(matches!(
            host.control(&layout.principal, flag).map(|control| &control.spec.kind),
            Some(ControlKind::Toggle {
                backing: Backing::Flag { .. },
                ..
            })
        ));
        assert_eq!(
            host.control_value(&layout.principal, date)?,
            ControlValue::Text("20261016".to_owned())
        );

        let pane = host.controls_in_pane(&layout.principal, PaneLevel::new(2));
        assert_eq!(pane.len(), 5, "two labels, two values, one generate button");
        let generate = host.control_bounds(&layout.principal, &rendered.context.generate_control)?;
        assert_eq!((generate.left, generate.top), (824, 70 + 2 * 24 + 10));
        Ok(())
    }

    #[test]
    fn queries_add_trigger_and_description_controls() -> Result<()> {
        let layout = ScreenLayout::default();
        let mut host = MemoryHost::with_principal(&layout)?;
        let mut allocator = TabAllocator::new(layout.home_tab.clone());
        let allocation = allocator.allocate(&mut host, &layout.principal, "R1", 0)?;

        let mut customer = definition("CUST", ParameterType::Text);
        customer.description = "Customer".to_owned();
        customer.value_query = "SELECT code FROM customers".to_owned();
        customer.show_description = true;
        customer.description_query = "SELECT name FROM customers WHERE code = 'filtro'".to_owned();

        let rendered = ControlRenderer::new(Date::MIN).render(
            &mut host,
            &layout.principal,
            &report(),
            allocation,
            vec![customer],
        )?;

        assert_eq!(rendered.parameter_contexts.len(), 2);
        let (trigger, context) = &rendered.parameter_contexts[1];
        assert_eq!(trigger.as_str(), "prm2_btn00");
        assert_eq!(
            context.description_control.as_ref().map(|id| id.as_str()),
            Some("prm2_dsc00")
        );
        let label = host
            .control(&layout.principal, &"prm2_lbl00".into())
            .and_then(|control| control.text().map(str::to_owned));
        assert_eq!(label.as_deref(), Some("Customer"));
        Ok(())
    }

    #[test]
    fn empty_catalog_keeps_generate_at_the_first_row() -> Result<()> {
        let layout = ScreenLayout::default();
        let mut host = MemoryHost::with_principal(&layout)?;
        let mut allocator = TabAllocator::new(layout.home_tab.clone());
        let allocation = allocator.allocate(&mut host, &layout.principal, "R1", 0)?;

        let rendered =
            ControlRenderer::new(Date::MIN).render(&mut host, &layout.principal, &report(), allocation, Vec::new())?;
        let generate = host.control_bounds(&layout.principal, &rendered.context.generate_control)?;
        assert_eq!(generate.top, 80);
        Ok(())
    }
}
