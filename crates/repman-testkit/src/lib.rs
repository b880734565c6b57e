// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use repman_app::{ParameterValues, ReportRenderer};
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use time::{Date, Month};

pub const SAMPLE_DEPARTMENT: &str = "SALES";
pub const OTHER_DEPARTMENT: &str = "OPS";

/// `P1` required boolean, `P2` optional date.
pub const FLAG_REPORT: (&str, &str) = ("R1", "Sales Summary");
/// `CUST` picked from `customers`, plus an inactive and a numeric parameter.
pub const PICKER_REPORT: (&str, &str) = ("R2", "Customer Statement");
/// No parameters at all.
pub const EMPTY_REPORT: (&str, &str) = ("R3", "Stock Snapshot");

pub const CUSTOMER_QUERY: &str = "SELECT code FROM customers ORDER BY code";
pub const CUSTOMER_NAME_QUERY: &str = "SELECT name FROM customers WHERE code = 'filtro'";

const DEPARTMENTS: [(&str, &str); 2] = [(SAMPLE_DEPARTMENT, "Sales"), (OTHER_DEPARTMENT, "Operations")];

const CUSTOMERS: [(&str, &str); 3] = [
    ("A1", "Acme Corporation"),
    ("B2", "O'Brien Supply"),
    ("C3", "Globex"),
];

/// One catalog row as the tests describe it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterFixture {
    pub line_id: i64,
    pub param_id: String,
    pub description: String,
    pub type_tag: String,
    pub required: bool,
    pub value_query: String,
    pub show_description: bool,
    pub description_query: String,
    pub active: bool,
}

impl ParameterFixture {
    pub fn new(line_id: i64, param_id: &str, type_tag: &str) -> Self {
        Self {
            line_id,
            param_id: param_id.to_owned(),
            description: String::new(),
            type_tag: type_tag.to_owned(),
            required: false,
            value_query: String::new(),
            show_description: false,
            description_query: String::new(),
            active: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.value_query = query.to_owned();
        self
    }

    pub fn with_description_query(mut self, query: &str) -> Self {
        self.show_description = true;
        self.description_query = query.to_owned();
        self
    }
}

/// Loads the sample departments, reports, parameters and the `customers`
/// lookup table into a bootstrapped database.
pub fn seed_sample_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS customers (
          code TEXT PRIMARY KEY,
          name TEXT NOT NULL
        );
        ",
    )
    .context("create customers table")?;
    for (code, name) in CUSTOMERS {
        conn.execute(
            "INSERT INTO customers (code, name) VALUES (?, ?)",
            params![code, name],
        )
        .with_context(|| format!("insert customer {code}"))?;
    }

    for (code, name) in DEPARTMENTS {
        conn.execute(
            "INSERT INTO departments (code, name) VALUES (?, ?)",
            params![code, name],
        )
        .with_context(|| format!("insert department {code}"))?;
    }

    insert_report(conn, SAMPLE_DEPARTMENT, FLAG_REPORT.0, FLAG_REPORT.1)?;
    insert_parameter(
        conn,
        FLAG_REPORT.0,
        &ParameterFixture::new(1, "P1", "BOOLEAN").required(),
    )?;
    insert_parameter(conn, FLAG_REPORT.0, &ParameterFixture::new(2, "P2", "DATE"))?;

    insert_report(conn, SAMPLE_DEPARTMENT, PICKER_REPORT.0, PICKER_REPORT.1)?;
    insert_parameter(
        conn,
        PICKER_REPORT.0,
        &ParameterFixture::new(1, "CUST", "TEXT")
            .described("Customer")
            .required()
            .with_query(CUSTOMER_QUERY)
            .with_description_query(CUSTOMER_NAME_QUERY),
    )?;
    insert_parameter(
        conn,
        PICKER_REPORT.0,
        &ParameterFixture::new(2, "OLD", "TEXT").required().inactive(),
    )?;
    insert_parameter(
        conn,
        PICKER_REPORT.0,
        &ParameterFixture::new(3, "AMT", "NUMBER").described("Minimum amount"),
    )?;

    insert_report(conn, OTHER_DEPARTMENT, EMPTY_REPORT.0, EMPTY_REPORT.1)?;
    Ok(())
}

pub fn insert_report(conn: &Connection, department: &str, code: &str, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO reports (code, name) VALUES (?, ?)",
        params![code, name],
    )
    .with_context(|| format!("insert report {code}"))?;
    conn.execute(
        "INSERT INTO department_reports (department_code, report_code) VALUES (?, ?)",
        params![department, code],
    )
    .with_context(|| format!("map report {code} to {department}"))?;
    Ok(())
}

pub fn insert_parameter(
    conn: &Connection,
    report_code: &str,
    parameter: &ParameterFixture,
) -> Result<()> {
    let flag = |value: bool| if value { "Y" } else { "N" };
    conn.execute(
        "
        INSERT INTO report_parameters (
          report_code, line_id, param_id, description, type_tag, required_flag,
          value_query, show_description_flag, description_query, active_flag
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            report_code,
            parameter.line_id,
            parameter.param_id,
            parameter.description,
            parameter.type_tag,
            flag(parameter.required),
            parameter.value_query,
            flag(parameter.show_description),
            parameter.description_query,
            flag(parameter.active),
        ],
    )
    .with_context(|| format!("insert parameter {} for {report_code}", parameter.param_id))?;
    Ok(())
}

/// Temporary directory laid out like a report share.
pub struct ReportDir {
    dir: tempfile::TempDir,
}

impl ReportDir {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp report dir")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates an empty file at `relative`, making parent directories.
    pub fn touch(&self, relative: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, b"").with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCall {
    pub artifact: PathBuf,
    pub values: ParameterValues,
}

/// Renderer that records every call instead of showing anything.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RenderCall>> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ReportRenderer for RecordingRenderer {
    fn render(&self, artifact: &Path, values: &ParameterValues) -> Result<()> {
        if artifact.as_os_str().is_empty() {
            return Err(anyhow!("empty artifact path"));
        }
        self.lock().push(RenderCall {
            artifact: artifact.to_path_buf(),
            values: values.clone(),
        });
        Ok(())
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("repman-test.db");
    Ok((dir, path))
}

/// Date the session tests pin "today" to.
pub fn fixture_today() -> Date {
    Date::from_calendar_date(2026, Month::March, 4).unwrap_or(Date::MIN)
}
