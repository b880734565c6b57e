// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use repman_app::layout::ScreenLayout;
use repman_app::{
    ArtifactResolver, HostEvent, HostSurface, MemoryHost, ParameterValues, RenderOutcome,
    ReportRenderer, Session, SessionConfig, StatusKind, ViewerLauncher, load_catalog,
};
use repman_db::Store;
use serde_json::{Map, Value, json};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Runs an external viewer as `<program> <report file> ID=VALUE...`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl ReportRenderer for CommandRenderer {
    fn render(&self, artifact: &Path, values: &ParameterValues) -> Result<()> {
        let status = Command::new(&self.program)
            .arg(artifact)
            .args(viewer_arguments(values))
            .status()
            .with_context(|| format!("start viewer {:?}", self.program))?;
        if !status.success() {
            bail!("viewer {:?} exited with {status}", self.program);
        }
        Ok(())
    }
}

/// Prints what would have been shown when no viewer is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn render(&self, artifact: &Path, values: &ParameterValues) -> Result<()> {
        let summary = serde_json::to_string_pretty(&render_summary(artifact, values))
            .context("encode render summary")?;
        println!("{summary}");
        Ok(())
    }
}

pub fn viewer_arguments(values: &ParameterValues) -> Vec<String> {
    values
        .iter()
        .map(|(id, value)| format!("{id}={value}"))
        .collect()
}

pub fn render_summary(artifact: &Path, values: &ParameterValues) -> Value {
    let values = values
        .iter()
        .map(|(id, value)| (id.clone(), Value::String(value.to_string())))
        .collect::<Map<_, _>>();
    json!({
        "artifact": artifact.display().to_string(),
        "values": values,
    })
}

/// Splits `ID=VALUE`. The value may be empty or contain further `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, String)> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("--set expects ID=VALUE, got {raw:?}"))?;
    let id = id.trim();
    if id.is_empty() {
        bail!("--set expects a parameter id before '=', got {raw:?}");
    }
    Ok((id.to_owned(), value.to_owned()))
}

pub struct CatalogRuntime<'a> {
    store: &'a Store,
}

impl<'a> CatalogRuntime<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn summary_line(&self) -> Result<String> {
        let counts = self.store.catalog_counts()?;
        Ok(format!(
            "{} departments, {} reports, {} of {} parameters active",
            counts.departments, counts.reports, counts.active_parameters, counts.parameters
        ))
    }

    pub fn department_lines(&self) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_departments()?
            .into_iter()
            .map(|department| format!("{}\t{}", department.code, department.name))
            .collect())
    }

    pub fn report_lines(&self, department: &str) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_reports_for_department(department)?
            .into_iter()
            .map(|report| format!("{}\t{}", report.code, report.name))
            .collect())
    }

    /// One line per active parameter, in catalog order.
    pub fn describe(&self, report_code: &str) -> Result<Vec<String>> {
        let report = self.find_report(report_code)?;
        let definitions = load_catalog(self.store, &report.code)?;
        let mut lines = vec![format!("{}\t{}", report.code, report.name)];
        for definition in definitions {
            let mut line = format!(
                "  {}\t{}\t{}",
                definition.param_id,
                definition.param_type.as_str(),
                definition.display_name()
            );
            if definition.is_required {
                line.push_str("\trequired");
            }
            if definition.has_value_query() {
                line.push_str("\tpicker");
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Opens the report's tab on a headless host, fills it from
    /// `assignments`, presses generate and waits for the viewer.
    pub fn generate(
        &self,
        report_code: &str,
        assignments: &[(String, String)],
        resolver: ArtifactResolver,
        renderer: Arc<dyn ReportRenderer>,
        wait: Duration,
    ) -> Result<u64> {
        let report = self.find_report(report_code)?;
        let layout = ScreenLayout::default();
        let mut host = MemoryHost::with_principal(&layout)?;
        let mut session = Session::new(
            self.store,
            ViewerLauncher::new(renderer),
            SessionConfig {
                layout: layout.clone(),
                resolver,
            },
        );

        let handle = session.select_report(&mut host, &layout.principal, &report)?;
        let tab = session
            .registry()
            .tab(handle)
            .ok_or_else(|| anyhow!("report tab for {} is not registered", report.code))?;

        let mut writes = Vec::with_capacity(assignments.len());
        for (id, value) in assignments {
            let instance = tab
                .parameters
                .iter()
                .find(|instance| instance.definition.param_id.eq_ignore_ascii_case(id))
                .ok_or_else(|| {
                    let known = tab
                        .parameters
                        .iter()
                        .map(|instance| instance.definition.param_id.as_str())
                        .collect::<Vec<_>>();
                    anyhow!(
                        "report {} has no parameter {id}; known parameters: {}",
                        report.code,
                        if known.is_empty() {
                            "none".to_owned()
                        } else {
                            known.join(", ")
                        }
                    )
                })?;
            writes.push((instance.value_control.clone(), value.clone()));
        }
        let pressed = HostEvent::GeneratePressed {
            surface: tab.surface.clone(),
            control: tab.generate_control.clone(),
        };
        let surface = tab.surface.clone();

        for (control, value) in writes {
            debug!(control = %control.as_str(), "filling parameter");
            host.set_control_value(&surface, &control, &value)
                .with_context(|| format!("fill control {}", control.as_str()))?;
        }

        let status = session
            .handle(&mut host, pressed)
            .ok_or_else(|| anyhow!("generate button for {} did not respond", report.code))?;
        if status.kind != StatusKind::Success {
            bail!("{}", status.text);
        }

        match session.launcher().wait_next(wait) {
            Some(RenderOutcome::Completed { job, .. }) => Ok(job),
            Some(RenderOutcome::Failed { error, .. }) => {
                bail!("viewer failed for {}: {error}", report.code)
            }
            None => bail!(
                "viewer for {} did not finish within {:?}; raise [viewer].wait",
                report.code,
                wait
            ),
        }
    }

    fn find_report(&self, report_code: &str) -> Result<repman_app::ReportSummary> {
        self.store.get_report(report_code)?.ok_or_else(|| {
            anyhow!("unknown report {report_code:?}; run --list-reports <department> to see codes")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogRuntime, parse_assignment, render_summary, viewer_arguments};
    use anyhow::Result;
    use repman_app::{ArtifactResolver, DEFAULT_EXTENSION, ParamValue, ParameterValues};
    use repman_db::Store;
    use repman_testkit::{
        FLAG_REPORT, PICKER_REPORT, RecordingRenderer, ReportDir, seed_sample_catalog,
    };
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    fn sample_store() -> Result<Store> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        seed_sample_catalog(store.raw_connection())?;
        Ok(store)
    }

    fn wait() -> Duration {
        Duration::from_secs(5)
    }

    #[test]
    fn assignments_split_on_first_equals() -> Result<()> {
        assert_eq!(
            parse_assignment("P1=a=b")?,
            ("P1".to_owned(), "a=b".to_owned())
        );
        assert_eq!(parse_assignment("P2=")?, ("P2".to_owned(), String::new()));
        assert!(parse_assignment("P1").is_err());
        assert!(parse_assignment(" =Y").is_err());
        Ok(())
    }

    #[test]
    fn viewer_arguments_and_summary_use_display_values() {
        let mut values = ParameterValues::new();
        values.insert("P1".to_owned(), ParamValue::Bool(true));
        values.insert("CUST".to_owned(), ParamValue::Text("A1".to_owned()));

        assert_eq!(viewer_arguments(&values), vec!["CUST=A1", "P1=true"]);
        assert_eq!(
            render_summary(Path::new("/r/R1.rpt"), &values),
            json!({
                "artifact": "/r/R1.rpt",
                "values": { "CUST": "A1", "P1": "true" },
            })
        );
    }

    #[test]
    fn describe_lists_active_parameters() -> Result<()> {
        let store = sample_store()?;
        let lines = CatalogRuntime::new(&store).describe("r2")?;
        assert_eq!(lines[0], format!("{}\t{}", PICKER_REPORT.0, PICKER_REPORT.1));
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("CUST"));
        assert!(lines[1].ends_with("\trequired\tpicker"));
        assert!(lines[2].contains("numeric"));

        let error = CatalogRuntime::new(&store)
            .describe("NOPE")
            .expect_err("unknown report should fail");
        assert!(error.to_string().contains("--list-reports"));
        Ok(())
    }

    #[test]
    fn generate_fills_values_and_waits_for_viewer() -> Result<()> {
        let store = sample_store()?;
        let reports = ReportDir::new()?;
        let artifact = reports.touch("sales/R1 - Sales Summary.rpt")?;
        let recorder = RecordingRenderer::new();

        let job = CatalogRuntime::new(&store).generate(
            FLAG_REPORT.0,
            &[
                ("p1".to_owned(), "Y".to_owned()),
                ("P2".to_owned(), "20260301".to_owned()),
            ],
            ArtifactResolver::new(reports.path(), DEFAULT_EXTENSION),
            Arc::new(recorder.clone()),
            wait(),
        )?;
        assert_eq!(job, 1);

        let calls = recorder.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].artifact, artifact);
        assert_eq!(calls[0].values.get("P1"), Some(&ParamValue::Bool(true)));
        assert_eq!(
            calls[0].values.get("P2").map(ToString::to_string),
            Some("2026-03-01".to_owned())
        );
        Ok(())
    }

    #[test]
    fn generate_reports_missing_required_value() -> Result<()> {
        let store = sample_store()?;
        let reports = ReportDir::new()?;
        reports.touch("R1.rpt")?;
        let recorder = RecordingRenderer::new();

        let error = CatalogRuntime::new(&store)
            .generate(
                FLAG_REPORT.0,
                &[],
                ArtifactResolver::new(reports.path(), DEFAULT_EXTENSION),
                Arc::new(recorder.clone()),
                wait(),
            )
            .expect_err("P1 is required");
        assert!(error.to_string().contains("P1"));
        assert!(recorder.calls().is_empty());
        Ok(())
    }

    #[test]
    fn generate_rejects_unknown_parameter_ids() -> Result<()> {
        let store = sample_store()?;
        let reports = ReportDir::new()?;
        let error = CatalogRuntime::new(&store)
            .generate(
                FLAG_REPORT.0,
                &[("NOPE".to_owned(), "1".to_owned())],
                ArtifactResolver::new(reports.path(), DEFAULT_EXTENSION),
                Arc::new(RecordingRenderer::new()),
                wait(),
            )
            .expect_err("unknown parameter should fail");
        let message = error.to_string();
        assert!(message.contains("NOPE"));
        assert!(message.contains("P1, P2"));
        Ok(())
    }
}
