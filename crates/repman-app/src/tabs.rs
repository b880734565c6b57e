// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::host::{Bounds, ControlKind, ControlSpec, HostSurface};
use crate::layout::tab_control_id;
use crate::{BASE_PANE, ControlId, PaneLevel, ReportTabContext, SurfaceId};

const TAB_OFFSET: i32 = 102;
const TAB_WIDTH: i32 = 100;
const TAB_HEIGHT: i32 = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabAllocation {
    pub tab_control: ControlId,
    pub pane: PaneLevel,
}

/// Hands out tab headers and pane levels for report tabs.
#[derive(Debug, Clone)]
pub struct TabAllocator {
    home_tab: ControlId,
    next_pane: PaneLevel,
}

impl TabAllocator {
    pub fn new(home_tab: ControlId) -> Self {
        Self {
            home_tab,
            next_pane: PaneLevel::new(BASE_PANE.get() + 1),
        }
    }

    pub fn next_pane(&self) -> PaneLevel {
        self.next_pane
    }

    /// The first report takes over the home tab; later ones get a new header
    /// grouped with it. The pane level is consumed even if the host call
    /// fails, so levels are never handed out twice.
    pub fn allocate<H: HostSurface + ?Sized>(
        &mut self,
        host: &mut H,
        surface: &SurfaceId,
        report_code: &str,
        existing_tabs: usize,
    ) -> Result<TabAllocation> {
        let pane = self.next_pane;
        self.next_pane = PaneLevel::new(pane.get() + 1);

        let tab_control = if existing_tabs == 0 {
            host.configure_tab(surface, &self.home_tab, report_code, pane)
                .with_context(|| format!("claim home tab for report {report_code}"))?;
            self.home_tab.clone()
        } else {
            let anchor = host
                .control_bounds(surface, &self.home_tab)
                .context("read home tab position")?;
            let offset = i32::try_from(existing_tabs)
                .unwrap_or(i32::MAX / TAB_OFFSET)
                .saturating_mul(TAB_OFFSET);
            let tab_control = tab_control_id(pane);
            host.add_control(
                surface,
                ControlSpec {
                    id: tab_control.clone(),
                    kind: ControlKind::Tab {
                        caption: report_code.to_owned(),
                        pane,
                        group_with: Some(self.home_tab.clone()),
                    },
                    bounds: Bounds::new(
                        anchor.left.saturating_add(offset),
                        anchor.top,
                        TAB_WIDTH,
                        TAB_HEIGHT,
                    ),
                    pane: None,
                },
            )
            .with_context(|| format!("add tab for report {report_code}"))?;
            tab_control
        };

        debug!(report_code, pane = pane.get(), tab = %tab_control, "allocated report tab");
        Ok(TabAllocation { tab_control, pane })
    }

    /// Hides a header whose report never finished rendering. The home tab
    /// stays as it is and is claimed again by the next report.
    pub fn discard<H: HostSurface + ?Sized>(
        &self,
        host: &mut H,
        surface: &SurfaceId,
        tab_control: &ControlId,
    ) {
        if *tab_control == self.home_tab || !host.has_control(surface, tab_control) {
            return;
        }
        if let Err(error) = host.set_control_visible(surface, tab_control, false) {
            warn!(tab = %tab_control, error = %format!("{error:#}"), "hide abandoned report tab");
        }
    }

    /// Shows the selected report's tab, hides the others, and switches the
    /// surface to the selected pane.
    pub fn activate<'a, H, I>(
        &self,
        host: &mut H,
        tabs: I,
        selected: &ReportTabContext,
    ) -> Result<()>
    where
        H: HostSurface + ?Sized,
        I: IntoIterator<Item = &'a ReportTabContext>,
    {
        for tab in tabs {
            if !host.has_control(&tab.surface, &tab.tab_control) {
                continue;
            }
            let visible = tab.report_code.eq_ignore_ascii_case(&selected.report_code);
            host.set_control_visible(&tab.surface, &tab.tab_control, visible)
                .with_context(|| format!("toggle tab for report {}", tab.report_code))?;
        }

        host.set_active_pane(&selected.surface, selected.pane)
            .with_context(|| format!("switch to pane {}", selected.pane.get()))?;
        if host.has_control(&selected.surface, &selected.tab_control) {
            host.focus_control(&selected.surface, &selected.tab_control)
                .context("focus report tab")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TabAllocator;
    use crate::headless::MemoryHost;
    use crate::host::{ControlKind, HostSurface};
    use crate::layout::ScreenLayout;
    use crate::{PaneLevel, ReportTabContext};
    use anyhow::Result;

    fn context(layout: &ScreenLayout, code: &str, allocation: super::TabAllocation) -> ReportTabContext {
        ReportTabContext {
            report_code: code.to_owned(),
            report_name: String::new(),
            surface: layout.principal.clone(),
            tab_control: allocation.tab_control,
            pane: allocation.pane,
            generate_control: crate::layout::generate_control_id(allocation.pane),
            parameters: Vec::new(),
        }
    }

    #[test]
    fn first_report_reuses_home_tab_and_later_ones_are_offset() -> Result<()> {
        let layout = ScreenLayout::default();
        let mut host = MemoryHost::with_principal(&layout)?;
        let mut allocator = TabAllocator::new(layout.home_tab.clone());

        let first = allocator.allocate(&mut host, &layout.principal, "R1", 0)?;
        assert_eq!(first.tab_control, layout.home_tab);
        assert_eq!(first.pane, PaneLevel::new(2));
        let home = host
            .control(&layout.principal, &layout.home_tab)
            .expect("home tab");
        assert!(matches!(
            &home.spec.kind,
            ControlKind::Tab { caption, pane, .. } if caption == "R1" && *pane == PaneLevel::new(2)
        ));

        let second = allocator.allocate(&mut host, &layout.principal, "R2", 1)?;
        assert_eq!(second.pane, PaneLevel::new(3));
        let anchor = host.control_bounds(&layout.principal, &layout.home_tab)?;
        let bounds = host.control_bounds(&layout.principal, &second.tab_control)?;
        assert_eq!(bounds.left, anchor.left + 102);
        assert_eq!(bounds.top, anchor.top);
        assert_eq!((bounds.width, bounds.height), (100, 20));
        Ok(())
    }

    #[test]
    fn failed_allocation_still_consumes_the_pane() {
        let layout = ScreenLayout::default();
        let mut host = MemoryHost::new();
        let mut allocator = TabAllocator::new(layout.home_tab.clone());

        allocator
            .allocate(&mut host, &layout.principal, "R1", 0)
            .expect_err("principal surface is missing");
        assert_eq!(allocator.next_pane(), PaneLevel::new(3));
    }

    #[test]
    fn header_ids_follow_the_pane_and_discard_hides_them() -> Result<()> {
        let layout = ScreenLayout::default();
        let mut host = MemoryHost::with_principal(&layout)?;
        let mut allocator = TabAllocator::new(layout.home_tab.clone());

        allocator.allocate(&mut host, &layout.principal, "R1", 0)?;
        let abandoned = allocator.allocate(&mut host, &layout.principal, "R2", 1)?;
        assert_eq!(abandoned.tab_control.as_str(), "tab0003");
        allocator.discard(&mut host, &layout.principal, &abandoned.tab_control);
        allocator.discard(&mut host, &layout.principal, &layout.home_tab);

        let next = allocator.allocate(&mut host, &layout.principal, "R3", 1)?;
        assert_eq!(next.tab_control.as_str(), "tab0004");
        let hidden = host
            .control(&layout.principal, &abandoned.tab_control)
            .expect("abandoned tab");
        assert!(!hidden.visible);
        let home = host
            .control(&layout.principal, &layout.home_tab)
            .expect("home tab");
        assert!(home.visible);
        Ok(())
    }

    #[test]
    fn activation_switches_pane_and_hides_other_tabs() -> Result<()> {
        let layout = ScreenLayout::default();
        let mut host = MemoryHost::with_principal(&layout)?;
        let mut allocator = TabAllocator::new(layout.home_tab.clone());

        let first = allocator.allocate(&mut host, &layout.principal, "R1", 0)?;
        let second = allocator.allocate(&mut host, &layout.principal, "R2", 1)?;
        let tabs = vec![
            context(&layout, "R1", first),
            context(&layout, "R2", second),
        ];

        allocator.activate(&mut host, &tabs, &tabs[1])?;
        assert_eq!(host.active_pane(&layout.principal), Some(PaneLevel::new(3)));
        let home = host
            .control(&layout.principal, &layout.home_tab)
            .expect("home tab");
        assert!(!home.visible);
        let selected = host
            .control(&layout.principal, &tabs[1].tab_control)
            .expect("second tab");
        assert!(selected.visible);
        assert_eq!(
            host.surface(&layout.principal).and_then(|surface| surface.focused.clone()),
            Some(tabs[1].tab_control.clone())
        );
        Ok(())
    }
}
