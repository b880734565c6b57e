// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};

use crate::{Department, ParameterDefinition, ParameterRow, QueryRows, ReportSummary};

/// Read-only access to the report metadata tables.
pub trait MetadataStore {
    /// Catalog rows for one report, ordered by line sequence.
    fn parameter_rows(&self, report_code: &str) -> Result<Vec<ParameterRow>>;
    fn run_query(&self, query: &str) -> Result<QueryRows>;
    /// First column of the first row, or an empty string when there is none.
    fn scalar(&self, query: &str) -> Result<String>;
    fn departments(&self) -> Result<Vec<Department>>;
    fn reports_for_department(&self, department_code: &str) -> Result<Vec<ReportSummary>>;
}

impl<T: MetadataStore + ?Sized> MetadataStore for &T {
    fn parameter_rows(&self, report_code: &str) -> Result<Vec<ParameterRow>> {
        (**self).parameter_rows(report_code)
    }

    fn run_query(&self, query: &str) -> Result<QueryRows> {
        (**self).run_query(query)
    }

    fn scalar(&self, query: &str) -> Result<String> {
        (**self).scalar(query)
    }

    fn departments(&self) -> Result<Vec<Department>> {
        (**self).departments()
    }

    fn reports_for_department(&self, department_code: &str) -> Result<Vec<ReportSummary>> {
        (**self).reports_for_department(department_code)
    }
}

/// Loads the active parameter definitions for `report_code` in catalog order.
/// Nothing is cached, so catalog edits show up on the next load.
pub fn load_catalog<S: MetadataStore + ?Sized>(
    store: &S,
    report_code: &str,
) -> Result<Vec<ParameterDefinition>> {
    if report_code.trim().is_empty() {
        bail!("report code is required to load parameters");
    }

    let mut rows = store
        .parameter_rows(report_code)
        .with_context(|| format!("load parameter catalog for report {report_code}"))?;
    rows.sort_by_key(|row| row.line_id);

    Ok(rows
        .into_iter()
        .filter_map(ParameterDefinition::from_row)
        .collect())
}
