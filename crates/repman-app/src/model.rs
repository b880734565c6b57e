// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::Date;
use time::macros::format_description;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    Text,
    Boolean,
    Numeric,
    Date,
}

impl ParameterType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Numeric => "numeric",
            Self::Date => "date",
        }
    }

    /// Catalog type tags are free text; anything unrecognised renders as text.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => Self::Boolean,
            "NUMERIC" | "NUMBER" | "INT" | "INTEGER" | "DECIMAL" => Self::Numeric,
            "DATE" => Self::Date,
            _ => Self::Text,
        }
    }
}

/// One catalog row as stored. Nullable columns arrive as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterRow {
    pub line_id: i64,
    pub param_id: String,
    pub description: String,
    pub type_tag: String,
    pub required_flag: String,
    pub value_query: String,
    pub show_description_flag: String,
    pub description_query: String,
    pub active_flag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDefinition {
    pub param_id: String,
    pub description: String,
    pub param_type: ParameterType,
    pub is_required: bool,
    pub value_query: String,
    pub show_description: bool,
    pub description_query: String,
}

impl ParameterDefinition {
    /// Returns `None` for soft-deleted rows.
    pub fn from_row(row: ParameterRow) -> Option<Self> {
        if row.active_flag.trim().eq_ignore_ascii_case("N") {
            return None;
        }

        Some(Self {
            param_id: row.param_id,
            description: row.description,
            param_type: ParameterType::from_tag(&row.type_tag),
            is_required: is_yes(&row.required_flag),
            value_query: row.value_query,
            show_description: is_yes(&row.show_description_flag),
            description_query: row.description_query,
        })
    }

    pub fn display_name(&self) -> &str {
        if self.description.trim().is_empty() {
            &self.param_id
        } else {
            &self.description
        }
    }

    pub fn has_value_query(&self) -> bool {
        !self.value_query.trim().is_empty()
    }

    pub fn shows_description(&self) -> bool {
        self.show_description && !self.description_query.trim().is_empty()
    }
}

fn is_yes(flag: &str) -> bool {
    flag.trim().eq_ignore_ascii_case("Y")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Department {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub code: String,
    pub name: String,
}

/// Tabular result of an ad-hoc query, every cell rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryRows {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|values| values.get(column))
            .map(String::as_str)
    }

    pub fn named_cell(&self, row: usize, column: &str) -> Option<&str> {
        self.column_index(column)
            .and_then(|index| self.cell(row, index))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Bool(bool),
    Date(Date),
    Number(Decimal),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Date(value) => {
                let formatted = value
                    .format(format_description!("[year]-[month]-[day]"))
                    .map_err(|_| fmt::Error)?;
                f.write_str(&formatted)
            }
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Coerced values keyed by parameter id, as handed to the rendering engine.
pub type ParameterValues = BTreeMap<String, ParamValue>;

#[cfg(test)]
mod tests {
    use super::{ParamValue, ParameterDefinition, ParameterRow, ParameterType, QueryRows};
    use rust_decimal::Decimal;
    use time::{Date, Month};

    fn row(param_id: &str) -> ParameterRow {
        ParameterRow {
            line_id: 1,
            param_id: param_id.to_owned(),
            type_tag: "TEXT".to_owned(),
            active_flag: "Y".to_owned(),
            ..ParameterRow::default()
        }
    }

    #[test]
    fn type_tags_accept_aliases_in_any_case() {
        assert_eq!(ParameterType::from_tag("bool"), ParameterType::Boolean);
        assert_eq!(ParameterType::from_tag("Integer"), ParameterType::Numeric);
        assert_eq!(ParameterType::from_tag(" DATE "), ParameterType::Date);
        assert_eq!(ParameterType::from_tag("whatever"), ParameterType::Text);
        assert_eq!(ParameterType::from_tag(""), ParameterType::Text);
    }

    #[test]
    fn inactive_rows_are_dropped() {
        let mut inactive = row("P1");
        inactive.active_flag = "n".to_owned();
        assert!(ParameterDefinition::from_row(inactive).is_none());

        let mut unset = row("P2");
        unset.active_flag = String::new();
        assert!(ParameterDefinition::from_row(unset).is_some());
    }

    #[test]
    fn flags_and_display_name_follow_row_values() {
        let mut source = row("P1");
        source.required_flag = "y".to_owned();
        source.show_description_flag = "Y".to_owned();
        source.description_query = "SELECT name FROM x WHERE code = 'filtro'".to_owned();

        let definition = ParameterDefinition::from_row(source).expect("active row");
        assert!(definition.is_required);
        assert!(definition.shows_description());
        assert!(!definition.has_value_query());
        assert_eq!(definition.display_name(), "P1");
    }

    #[test]
    fn named_cells_match_columns_case_insensitively() {
        let rows = QueryRows {
            columns: vec!["report_code".to_owned(), "report_name".to_owned()],
            rows: vec![vec!["R1".to_owned(), "Sales".to_owned()]],
        };
        assert_eq!(rows.named_cell(0, "REPORT_NAME"), Some("Sales"));
        assert_eq!(rows.named_cell(1, "report_code"), None);
        assert_eq!(rows.cell(0, 5), None);
    }

    #[test]
    fn param_values_display_for_viewer_arguments() {
        let date = Date::from_calendar_date(2026, Month::March, 4).expect("valid date");
        assert_eq!(ParamValue::Date(date).to_string(), "2026-03-04");
        assert_eq!(ParamValue::Bool(true).to_string(), "true");
        assert_eq!(
            ParamValue::Number(Decimal::new(1250, 2)).to_string(),
            "12.50"
        );
    }
}
