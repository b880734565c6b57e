// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::layout::{self, ScreenLayout};
use crate::{ControlId, SurfaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    Pressed,
    Click,
    DoubleClick,
    ChoiceSelected,
    Closed,
}

/// An item event exactly as the host fires it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHostEvent {
    pub surface: SurfaceId,
    pub control: ControlId,
    pub kind: RawEventKind,
    pub row: Option<usize>,
    pub value: Option<String>,
}

impl RawHostEvent {
    pub fn new(surface: impl Into<SurfaceId>, control: impl Into<ControlId>, kind: RawEventKind) -> Self {
        Self {
            surface: surface.into(),
            control: control.into(),
            kind,
            row: None,
            value: None,
        }
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    DepartmentSelected {
        surface: SurfaceId,
        department: String,
    },
    ReportSelected {
        surface: SurfaceId,
        row: usize,
    },
    ParameterTriggerPressed {
        surface: SurfaceId,
        control: ControlId,
    },
    PickerRowSelected {
        picker: SurfaceId,
        row: usize,
    },
    PickerClosed {
        picker: SurfaceId,
    },
    GeneratePressed {
        surface: SurfaceId,
        control: ControlId,
    },
}

/// Turns raw host events into the typed events the session understands.
#[derive(Debug, Clone, Default)]
pub struct EventAdapter {
    layout: ScreenLayout,
}

impl EventAdapter {
    pub fn new(layout: ScreenLayout) -> Self {
        Self { layout }
    }

    pub fn classify(&self, raw: &RawHostEvent) -> Option<HostEvent> {
        if layout::is_picker_surface(&raw.surface) {
            return match (raw.kind, raw.row) {
                (RawEventKind::DoubleClick, Some(row))
                    if raw.control.as_str() == layout::PICKER_GRID =>
                {
                    Some(HostEvent::PickerRowSelected {
                        picker: raw.surface.clone(),
                        row,
                    })
                }
                (RawEventKind::Closed, _) => Some(HostEvent::PickerClosed {
                    picker: raw.surface.clone(),
                }),
                _ => None,
            };
        }

        match raw.kind {
            RawEventKind::Pressed if layout::is_trigger_control(&raw.control) => {
                Some(HostEvent::ParameterTriggerPressed {
                    surface: raw.surface.clone(),
                    control: raw.control.clone(),
                })
            }
            RawEventKind::Pressed if layout::is_generate_control(&raw.control) => {
                Some(HostEvent::GeneratePressed {
                    surface: raw.surface.clone(),
                    control: raw.control.clone(),
                })
            }
            RawEventKind::Click | RawEventKind::DoubleClick
                if raw.surface == self.layout.principal
                    && raw.control == self.layout.reports_grid =>
            {
                raw.row.map(|row| HostEvent::ReportSelected {
                    surface: raw.surface.clone(),
                    row,
                })
            }
            RawEventKind::ChoiceSelected
                if raw.surface == self.layout.principal
                    && raw.control == self.layout.department_chooser =>
            {
                raw.value
                    .as_ref()
                    .map(|department| HostEvent::DepartmentSelected {
                        surface: raw.surface.clone(),
                        department: department.clone(),
                    })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EventAdapter, HostEvent, RawEventKind, RawHostEvent};
    use crate::ControlId;

    #[test]
    fn report_grid_clicks_need_a_row() {
        let adapter = EventAdapter::default();
        let without_row = RawHostEvent::new("principal", "reports", RawEventKind::Click);
        assert_eq!(adapter.classify(&without_row), None);

        let with_row = without_row.with_row(4);
        assert_eq!(
            adapter.classify(&with_row),
            Some(HostEvent::ReportSelected {
                surface: "principal".into(),
                row: 4,
            })
        );
    }

    #[test]
    fn presses_route_by_control_shape() {
        let adapter = EventAdapter::default();
        let trigger = RawHostEvent::new("principal", "prm2_btn00", RawEventKind::Pressed);
        assert_eq!(
            adapter.classify(&trigger),
            Some(HostEvent::ParameterTriggerPressed {
                surface: "principal".into(),
                control: ControlId::from("prm2_btn00"),
            })
        );

        let generate = RawHostEvent::new("principal", "gen000002", RawEventKind::Pressed);
        assert!(matches!(
            adapter.classify(&generate),
            Some(HostEvent::GeneratePressed { .. })
        ));

        let other = RawHostEvent::new("principal", "ok", RawEventKind::Pressed);
        assert_eq!(adapter.classify(&other), None);
    }

    #[test]
    fn picker_surfaces_only_emit_picker_events() {
        let adapter = EventAdapter::default();
        let pick = RawHostEvent::new("qpk42", "qgrid", RawEventKind::DoubleClick).with_row(0);
        assert_eq!(
            adapter.classify(&pick),
            Some(HostEvent::PickerRowSelected {
                picker: "qpk42".into(),
                row: 0,
            })
        );

        let single_click = RawHostEvent::new("qpk42", "qgrid", RawEventKind::Click).with_row(0);
        assert_eq!(adapter.classify(&single_click), None);

        let closed = RawHostEvent::new("qpk42", "qpk42", RawEventKind::Closed);
        assert_eq!(
            adapter.classify(&closed),
            Some(HostEvent::PickerClosed {
                picker: "qpk42".into()
            })
        );
    }

    #[test]
    fn department_choice_carries_the_selected_code() {
        let adapter = EventAdapter::default();
        let raw = RawHostEvent::new("principal", "departments", RawEventKind::ChoiceSelected)
            .with_value("FIN");
        assert_eq!(
            adapter.classify(&raw),
            Some(HostEvent::DepartmentSelected {
                surface: "principal".into(),
                department: "FIN".to_owned(),
            })
        );
    }
}
