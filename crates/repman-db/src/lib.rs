// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use repman_app::{Department, MetadataStore, ParameterRow, QueryRows, ReportSummary};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const APP_NAME: &str = "repman";

const MAX_QUERY_ROWS: usize = 5000;

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("departments", &["code", "name"]),
    ("reports", &["code", "name"]),
    ("department_reports", &["department_code", "report_code"]),
    (
        "report_parameters",
        &[
            "report_code",
            "line_id",
            "param_id",
            "description",
            "type_tag",
            "required_flag",
            "value_query",
            "show_description_flag",
            "description_query",
            "active_flag",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequiredIndex {
    name: &'static str,
    create_sql: &'static str,
}

const REQUIRED_INDEXES: &[RequiredIndex] = &[
    RequiredIndex {
        name: "idx_department_reports_report_code",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_department_reports_report_code ON department_reports (report_code);",
    },
    RequiredIndex {
        name: "idx_report_parameters_report_code",
        create_sql: "CREATE INDEX IF NOT EXISTS idx_report_parameters_report_code ON report_parameters (report_code COLLATE NOCASE, line_id);",
    },
];

const DISALLOWED_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "ATTACH", "DETACH", "PRAGMA",
    "REINDEX", "VACUUM",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogCounts {
    pub departments: i64,
    pub reports: i64,
    pub parameters: i64,
    pub active_parameters: i64,
}

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the catalog tables on an empty database and checks the layout
    /// of an existing one.
    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }

        ensure_required_indexes(&self.conn)?;
        Ok(())
    }

    /// Loads a small self-contained catalog, with lookup tables for its
    /// value queries. Safe to run more than once.
    pub fn seed_demo_data(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS demo_customers (
                  code TEXT PRIMARY KEY,
                  name TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS demo_warehouses (
                  code TEXT PRIMARY KEY,
                  name TEXT NOT NULL
                );
                INSERT OR IGNORE INTO demo_customers (code, name) VALUES
                  ('C001', 'Northwind Traders'),
                  ('C002', 'Contoso Retail'),
                  ('C003', 'O''Neill Hardware');
                INSERT OR IGNORE INTO demo_warehouses (code, name) VALUES
                  ('01', 'Main warehouse'),
                  ('02', 'Overflow');
                ",
            )
            .context("create demo lookup tables")?;

        for (code, name) in DEMO_DEPARTMENTS {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO departments (code, name) VALUES (?, ?)",
                    params![code, name],
                )
                .with_context(|| format!("insert demo department {code}"))?;
        }

        for (department, code, name) in DEMO_REPORTS {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO reports (code, name) VALUES (?, ?)",
                    params![code, name],
                )
                .with_context(|| format!("insert demo report {code}"))?;
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO department_reports (department_code, report_code) VALUES (?, ?)",
                    params![department, code],
                )
                .with_context(|| format!("map demo report {code} to {department}"))?;
        }

        for parameter in DEMO_PARAMETERS {
            self.conn
                .execute(
                    "
                    INSERT OR IGNORE INTO report_parameters (
                      report_code, line_id, param_id, description, type_tag, required_flag,
                      value_query, show_description_flag, description_query, active_flag
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    ",
                    params![
                        parameter.report_code,
                        parameter.line_id,
                        parameter.param_id,
                        parameter.description,
                        parameter.type_tag,
                        parameter.required,
                        parameter.value_query,
                        parameter.show_description,
                        parameter.description_query,
                        parameter.active,
                    ],
                )
                .with_context(|| {
                    format!(
                        "insert demo parameter {} for {}",
                        parameter.param_id, parameter.report_code
                    )
                })?;
        }
        Ok(())
    }

    pub fn list_departments(&self) -> Result<Vec<Department>> {
        let mut stmt = self
            .conn
            .prepare("SELECT code, name FROM departments ORDER BY code ASC")
            .context("prepare departments query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Department {
                    code: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .context("query departments")?;
        let departments = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("collect departments")?;
        Ok(departments
            .into_iter()
            .filter(|department| !department.code.trim().is_empty())
            .collect())
    }

    pub fn list_reports_for_department(&self, department_code: &str) -> Result<Vec<ReportSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT r.code, r.name
                FROM department_reports dr
                JOIN reports r ON r.code = dr.report_code
                WHERE dr.department_code = ? COLLATE NOCASE
                ORDER BY r.code ASC
                ",
            )
            .context("prepare department reports query")?;
        let rows = stmt
            .query_map(params![department_code.trim()], |row| {
                Ok(ReportSummary {
                    code: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .with_context(|| format!("query reports for department {department_code}"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("collect reports for department {department_code}"))
    }

    pub fn get_report(&self, report_code: &str) -> Result<Option<ReportSummary>> {
        self.conn
            .query_row(
                "SELECT code, name FROM reports WHERE code = ? COLLATE NOCASE",
                params![report_code.trim()],
                |row| {
                    Ok(ReportSummary {
                        code: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("load report {report_code}"))
    }

    /// Every catalog row of a report, inactive ones included.
    pub fn list_parameter_rows(&self, report_code: &str) -> Result<Vec<ParameterRow>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT
                  line_id,
                  param_id,
                  COALESCE(description, ''),
                  COALESCE(type_tag, ''),
                  COALESCE(required_flag, ''),
                  COALESCE(value_query, ''),
                  COALESCE(show_description_flag, ''),
                  COALESCE(description_query, ''),
                  COALESCE(active_flag, '')
                FROM report_parameters
                WHERE report_code = ? COLLATE NOCASE
                ORDER BY line_id ASC
                ",
            )
            .context("prepare parameter catalog query")?;
        let rows = stmt
            .query_map(params![report_code.trim()], |row| {
                Ok(ParameterRow {
                    line_id: row.get(0)?,
                    param_id: row.get(1)?,
                    description: row.get(2)?,
                    type_tag: row.get(3)?,
                    required_flag: row.get(4)?,
                    value_query: row.get(5)?,
                    show_description_flag: row.get(6)?,
                    description_query: row.get(7)?,
                    active_flag: row.get(8)?,
                })
            })
            .with_context(|| format!("query parameter catalog for {report_code}"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("collect parameter catalog for {report_code}"))
    }

    pub fn catalog_counts(&self) -> Result<CatalogCounts> {
        let count = |sql: &str, label: &str| -> Result<i64> {
            self.conn
                .query_row(sql, [], |row| row.get(0))
                .with_context(|| format!("count {label}"))
        };
        Ok(CatalogCounts {
            departments: count("SELECT COUNT(*) FROM departments", "departments")?,
            reports: count("SELECT COUNT(*) FROM reports", "reports")?,
            parameters: count("SELECT COUNT(*) FROM report_parameters", "parameters")?,
            active_parameters: count(
                "SELECT COUNT(*) FROM report_parameters WHERE UPPER(COALESCE(active_flag, '')) <> 'N'",
                "active parameters",
            )?,
        })
    }

    /// Runs a catalog-authored lookup query. Only a single read-only
    /// statement is accepted; text inside string literals is not inspected.
    pub fn read_only_query(&self, query: &str) -> Result<QueryRows> {
        let trimmed = query.trim().trim_end_matches(';').trim_end();
        if trimmed.is_empty() {
            bail!("empty query");
        }

        let upper = strip_string_literals(&trimmed.to_ascii_uppercase());
        if upper.contains(';') {
            bail!("multiple statements are not allowed");
        }
        if !upper.starts_with("SELECT") && !upper.starts_with("WITH") {
            bail!("only SELECT queries are allowed");
        }
        for keyword in DISALLOWED_KEYWORDS {
            if contains_word(&upper, keyword) {
                bail!("query contains disallowed keyword: {keyword}");
            }
        }

        let mut stmt = self
            .conn
            .prepare(trimmed)
            .context("prepare read-only query")?;
        if !stmt.readonly() {
            bail!("query would modify the database");
        }
        let columns = stmt
            .column_names()
            .iter()
            .map(|column| (*column).to_owned())
            .collect::<Vec<_>>();
        let mut rows = stmt.query([]).context("execute read-only query")?;

        let mut output_rows = Vec::new();
        while let Some(row) = rows.next().context("scan read-only query rows")? {
            if output_rows.len() >= MAX_QUERY_ROWS {
                debug!(limit = MAX_QUERY_ROWS, "query result truncated");
                break;
            }

            let mut output = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                let value = row
                    .get_ref(index)
                    .map(value_ref_to_string)
                    .with_context(|| format!("read column {index} from query result"))?;
                output.push(value);
            }
            output_rows.push(output);
        }

        Ok(QueryRows {
            columns,
            rows: output_rows,
        })
    }

    pub fn scalar_query(&self, query: &str) -> Result<String> {
        let rows = self.read_only_query(query)?;
        Ok(rows.cell(0, 0).unwrap_or_default().to_owned())
    }
}

impl MetadataStore for Store {
    fn parameter_rows(&self, report_code: &str) -> Result<Vec<ParameterRow>> {
        self.list_parameter_rows(report_code)
    }

    fn run_query(&self, query: &str) -> Result<QueryRows> {
        self.read_only_query(query)
    }

    fn scalar(&self, query: &str) -> Result<String> {
        self.scalar_query(query)
    }

    fn departments(&self) -> Result<Vec<Department>> {
        self.list_departments()
    }

    fn reports_for_department(&self, department_code: &str) -> Result<Vec<ReportSummary>> {
        self.list_reports_for_department(department_code)
    }
}

struct DemoParameter {
    report_code: &'static str,
    line_id: i64,
    param_id: &'static str,
    description: &'static str,
    type_tag: &'static str,
    required: &'static str,
    value_query: &'static str,
    show_description: &'static str,
    description_query: &'static str,
    active: &'static str,
}

const DEMO_DEPARTMENTS: [(&str, &str); 2] = [("FIN", "Finance"), ("OPS", "Operations")];

const DEMO_REPORTS: [(&str, &str, &str); 3] = [
    ("FIN", "FIN01", "Customer balance"),
    ("FIN", "FIN02", "Sales by period"),
    ("OPS", "OPS01", "Stock on hand"),
];

const DEMO_PARAMETERS: [DemoParameter; 8] = [
    DemoParameter {
        report_code: "FIN01",
        line_id: 1,
        param_id: "CUST",
        description: "Customer",
        type_tag: "TEXT",
        required: "Y",
        value_query: "SELECT code, name FROM demo_customers ORDER BY code",
        show_description: "Y",
        description_query: "SELECT name FROM demo_customers WHERE code = 'filtro'",
        active: "Y",
    },
    DemoParameter {
        report_code: "FIN01",
        line_id: 2,
        param_id: "ASOF",
        description: "As of",
        type_tag: "DATE",
        required: "Y",
        value_query: "",
        show_description: "N",
        description_query: "",
        active: "Y",
    },
    DemoParameter {
        report_code: "FIN01",
        line_id: 3,
        param_id: "DETAIL",
        description: "Show detail",
        type_tag: "BOOLEAN",
        required: "N",
        value_query: "",
        show_description: "N",
        description_query: "",
        active: "Y",
    },
    DemoParameter {
        report_code: "FIN02",
        line_id: 1,
        param_id: "FROM",
        description: "From date",
        type_tag: "DATE",
        required: "Y",
        value_query: "",
        show_description: "N",
        description_query: "",
        active: "Y",
    },
    DemoParameter {
        report_code: "FIN02",
        line_id: 2,
        param_id: "TO",
        description: "To date",
        type_tag: "DATE",
        required: "Y",
        value_query: "",
        show_description: "N",
        description_query: "",
        active: "Y",
    },
    DemoParameter {
        report_code: "FIN02",
        line_id: 3,
        param_id: "MINAMT",
        description: "Minimum amount",
        type_tag: "NUMERIC",
        required: "N",
        value_query: "",
        show_description: "N",
        description_query: "",
        active: "Y",
    },
    DemoParameter {
        report_code: "OPS01",
        line_id: 1,
        param_id: "WHS",
        description: "Warehouse",
        type_tag: "TEXT",
        required: "Y",
        value_query: "SELECT code, name FROM demo_warehouses ORDER BY code",
        show_description: "Y",
        description_query: "SELECT name FROM demo_warehouses WHERE code = 'filtro'",
        active: "Y",
    },
    DemoParameter {
        report_code: "OPS01",
        line_id: 2,
        param_id: "LEGACY",
        description: "Legacy filter",
        type_tag: "TEXT",
        required: "Y",
        value_query: "",
        show_description: "N",
        description_query: "",
        active: "N",
    },
];

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("REPMAN_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set REPMAN_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("repman.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn value_ref_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(value) => value.to_string(),
        ValueRef::Real(value) => value.to_string(),
        ValueRef::Text(value) => String::from_utf8_lossy(value).into_owned(),
        ValueRef::Blob(value) => format!("{value:?}"),
    }
}

/// Blanks out the contents of `'...'` literals so keyword and separator
/// checks only see SQL structure. Doubled quotes stay inside the literal.
fn strip_string_literals(source: &str) -> String {
    let mut output = String::with_capacity(source.len());
    let mut in_literal = false;
    let mut chars = source.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\'' {
            if in_literal && chars.peek() == Some(&'\'') {
                chars.next();
                output.push_str("  ");
                continue;
            }
            in_literal = !in_literal;
            output.push(ch);
        } else if in_literal {
            output.push(' ');
        } else {
            output.push(ch);
        }
    }
    output
}

fn contains_word(source: &str, keyword: &str) -> bool {
    let bytes = source.as_bytes();
    let keyword_len = keyword.len();
    if keyword_len == 0 || keyword_len > bytes.len() {
        return false;
    }

    let mut index = 0usize;
    while let Some(offset) = source[index..].find(keyword) {
        let start = index + offset;
        let end = start + keyword_len;
        let left_ok = start == 0 || !is_identifier_char(bytes[start - 1]);
        let right_ok = end >= bytes.len() || !is_identifier_char(bytes[end]);
        if left_ok && right_ok {
            return true;
        }
        index = start + 1;
    }
    false
}

fn is_identifier_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            bail!(
                "database is missing required table `{table}`; use a repman catalog database or migrate first"
            );
        }

        let columns = table_columns(conn, table)?;
        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();

        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; run migration before launching",
                missing.join(", ")
            );
        }
    }

    Ok(())
}

fn ensure_required_indexes(conn: &Connection) -> Result<()> {
    for index in REQUIRED_INDEXES {
        conn.execute_batch(index.create_sql)
            .with_context(|| format!("ensure required index `{}`", index.name))?;
    }

    let existing_indexes = index_names(conn)?;
    let missing = REQUIRED_INDEXES
        .iter()
        .filter(|index| !existing_indexes.contains(index.name))
        .map(|index| index.name)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        bail!(
            "database is missing required indexes: {}; run migration before launching",
            missing.join(", ")
        );
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let exists = conn
        .query_row(
            "
            SELECT EXISTS(
              SELECT 1
              FROM sqlite_master
              WHERE type = 'table' AND name = ?
            )
            ",
            params![table],
            |row| row.get::<_, i64>(0),
        )
        .with_context(|| format!("check table existence for {table}"))?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    let names = rows
        .collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))?;
    Ok(names)
}

fn index_names(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(
            "
            SELECT name
            FROM sqlite_master
            WHERE type = 'index'
              AND name NOT LIKE 'sqlite_%'
            ORDER BY name ASC
            ",
        )
        .context("prepare index names query")?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .context("query index names")?;
    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .context("collect index names")
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}
