// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use glob::{MatchOptions, Pattern};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use time::Date;
use time::macros::format_description;
use tracing::debug;

use crate::host::{ControlValue, HostSurface};
use crate::{ParamValue, ParameterType, ParameterValues, ReportTabContext};

pub const DEFAULT_EXTENSION: &str = "rpt";

/// Failures the user can fix from the screen. Everything else is plain
/// `anyhow` context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    MissingRequired { parameter: String },
    ArtifactNotFound { report_code: String },
    BaseDirMissing { path: PathBuf },
}

impl GenerateError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingRequired { .. })
    }
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { parameter } => {
                write!(f, "required parameter '{parameter}' must be filled in")
            }
            Self::ArtifactNotFound { report_code } => {
                write!(f, "no report file found for {report_code}")
            }
            Self::BaseDirMissing { path } => {
                write!(f, "report directory {} does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for GenerateError {}

/// Converts a control's raw state into a typed value. `None` covers blank,
/// untouched and unparseable input alike.
pub fn coerce(param_type: ParameterType, raw: &ControlValue) -> Option<ParamValue> {
    match (param_type, raw) {
        (ParameterType::Boolean, ControlValue::Toggle(state)) => state.map(ParamValue::Bool),
        (ParameterType::Boolean, ControlValue::Text(text)) => {
            match text.trim().to_ascii_uppercase().as_str() {
                "Y" => Some(ParamValue::Bool(true)),
                "N" => Some(ParamValue::Bool(false)),
                _ => None,
            }
        }
        (_, ControlValue::Toggle(_)) => None,
        (ParameterType::Date, ControlValue::Text(text)) => parse_date(text).map(ParamValue::Date),
        (ParameterType::Numeric, ControlValue::Text(text)) => {
            parse_number(text).map(ParamValue::Number)
        }
        (ParameterType::Text, ControlValue::Text(text)) => {
            if text.trim().is_empty() {
                None
            } else {
                Some(ParamValue::Text(text.clone()))
            }
        }
    }
}

/// Accepts the compact `yyyyMMdd` form the date fields are seeded with, ISO
/// dates, and day-first `dd/MM/yyyy`.
pub fn parse_date(input: &str) -> Option<Date> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    Date::parse(input, format_description!("[year][month][day]"))
        .or_else(|_| Date::parse(input, format_description!("[year]-[month]-[day]")))
        .or_else(|_| Date::parse(input, format_description!("[day]/[month]/[year]")))
        .ok()
}

/// Reads either `.` or `,` as the decimal separator. When both appear, the
/// last one is the separator and the other groups thousands.
pub fn parse_number(input: &str) -> Option<Decimal> {
    let compact: String = input.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let separator = match (compact.rfind('.'), compact.rfind(',')) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (Some(_), None) if compact.matches('.').count() == 1 => Some('.'),
        (None, Some(_)) if compact.matches(',').count() == 1 => Some(','),
        _ => None,
    };

    let normalized: String = match separator {
        Some(decimal) => {
            let Some(split) = compact.rfind(decimal) else {
                return None;
            };
            let (whole, fraction) = compact.split_at(split);
            let whole: String = whole.chars().filter(|ch| *ch != '.' && *ch != ',').collect();
            format!("{whole}.{}", &fraction[1..])
        }
        None => compact.chars().filter(|ch| *ch != '.' && *ch != ',').collect(),
    };
    Decimal::from_str(&normalized).ok()
}

/// Reads and coerces every parameter of `tab`. The first required parameter
/// without a usable value aborts with [`GenerateError::MissingRequired`];
/// optional ones are left out of the map.
pub fn collect_values<H: HostSurface + ?Sized>(
    host: &H,
    tab: &ReportTabContext,
) -> Result<ParameterValues> {
    let mut values = ParameterValues::new();
    for instance in &tab.parameters {
        if !host.has_control(&tab.surface, &instance.value_control) {
            debug!(
                report_code = %tab.report_code,
                control = %instance.value_control,
                "skipping parameter without a live control"
            );
            continue;
        }

        let raw = host
            .control_value(&tab.surface, &instance.value_control)
            .with_context(|| format!("read value of parameter {}", instance.definition.param_id))?;
        match coerce(instance.definition.param_type, &raw) {
            Some(value) => {
                values.insert(instance.definition.param_id.clone(), value);
            }
            None if instance.definition.is_required => {
                return Err(GenerateError::MissingRequired {
                    parameter: instance.definition.display_name().to_owned(),
                }
                .into());
            }
            None => {}
        }
    }
    Ok(values)
}

/// Locates report files by the `"{code} - {name}.{ext}"` naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactResolver {
    base_dir: PathBuf,
    extension: String,
}

impl ArtifactResolver {
    pub fn new(base_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Exact name match first, then any file for the code. Both passes search
    /// the whole tree, ignore case, and take the first path in sorted order.
    pub fn resolve(&self, report_code: &str, report_name: &str) -> Result<PathBuf> {
        if !self.base_dir.is_dir() {
            return Err(GenerateError::BaseDirMissing {
                path: self.base_dir.clone(),
            }
            .into());
        }

        let code = Pattern::escape(report_code.trim());
        let extension = Pattern::escape(&self.extension);
        if !report_name.trim().is_empty() {
            let exact = format!(
                "{code} - {}.{extension}",
                Pattern::escape(report_name.trim())
            );
            if let Some(path) = self.first_match(&exact)? {
                return Ok(path);
            }
        }

        self.first_match(&format!("{code} - *.{extension}"))?
            .ok_or_else(|| {
                GenerateError::ArtifactNotFound {
                    report_code: report_code.to_owned(),
                }
                .into()
            })
    }

    fn first_match(&self, file_pattern: &str) -> Result<Option<PathBuf>> {
        let base = self.base_dir.to_str().ok_or_else(|| {
            anyhow!(
                "report directory {} is not valid UTF-8",
                self.base_dir.display()
            )
        })?;
        let pattern = format!(
            "{}/**/{file_pattern}",
            Pattern::escape(base.trim_end_matches(['/', '\\']))
        );
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        let mut matches = Vec::new();
        for entry in glob::glob_with(&pattern, options)
            .with_context(|| format!("build report search pattern {pattern}"))?
        {
            let path = entry
                .with_context(|| format!("search report directory {}", self.base_dir.display()))?;
            if path.is_file() {
                matches.push(path);
            }
        }
        matches.sort();
        debug!(pattern = %pattern, matches = matches.len(), "searched report directory");
        Ok(matches.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::{ArtifactResolver, GenerateError, coerce, parse_date, parse_number};
    use crate::host::ControlValue;
    use crate::{ParamValue, ParameterType};
    use anyhow::Result;
    use rust_decimal::Decimal;
    use std::fs;
    use time::{Date, Month};

    fn text(value: &str) -> ControlValue {
        ControlValue::Text(value.to_owned())
    }

    #[test]
    fn untouched_toggle_has_no_value() {
        assert_eq!(
            coerce(ParameterType::Boolean, &ControlValue::Toggle(None)),
            None
        );
        assert_eq!(
            coerce(ParameterType::Boolean, &ControlValue::Toggle(Some(false))),
            Some(ParamValue::Bool(false))
        );
        assert_eq!(
            coerce(ParameterType::Boolean, &text("y")),
            Some(ParamValue::Bool(true))
        );
    }

    #[test]
    fn dates_accept_seeded_and_typed_forms() {
        let expected = Date::from_calendar_date(2026, Month::October, 16).expect("valid date");
        assert_eq!(parse_date("20261016"), Some(expected));
        assert_eq!(parse_date("2026-10-16"), Some(expected));
        assert_eq!(parse_date("16/10/2026"), Some(expected));
        assert_eq!(parse_date("20261399"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn numbers_follow_the_last_separator() {
        assert_eq!(parse_number("1.234,5"), Some(Decimal::new(12345, 1)));
        assert_eq!(parse_number("1,234.5"), Some(Decimal::new(12345, 1)));
        assert_eq!(parse_number("12,50"), Some(Decimal::new(1250, 2)));
        assert_eq!(parse_number("1.000.000"), Some(Decimal::new(1_000_000, 0)));
        assert_eq!(parse_number("-7"), Some(Decimal::new(-7, 0)));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("  "), None);
    }

    #[test]
    fn blank_text_is_missing() {
        assert_eq!(coerce(ParameterType::Text, &text("   ")), None);
        assert_eq!(
            coerce(ParameterType::Text, &text("north")),
            Some(ParamValue::Text("north".to_owned()))
        );
    }

    #[test]
    fn resolver_prefers_exact_name_then_any_file_for_the_code() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("nested"))?;
        fs::write(dir.path().join("R1 - Another.rpt"), b"")?;
        fs::write(dir.path().join("nested").join("r1 - sales.RPT"), b"")?;
        fs::write(dir.path().join("R2 - Sales.rpt"), b"")?;

        let resolver = ArtifactResolver::new(dir.path(), "rpt");
        let exact = resolver.resolve("R1", "Sales")?;
        assert!(exact.ends_with("nested/r1 - sales.RPT"));

        let fallback = resolver.resolve("R1", "Missing")?;
        assert!(fallback.ends_with("R1 - Another.rpt"));
        Ok(())
    }

    #[test]
    fn resolver_treats_codes_literally_and_skips_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("R[1] - Folder.rpt"))?;
        fs::write(dir.path().join("R1 - Plain.rpt"), b"")?;
        fs::write(dir.path().join("R[1] - Odd.rpt"), b"")?;

        let resolver = ArtifactResolver::new(dir.path(), "rpt");
        let literal = resolver.resolve("R[1]", "")?;
        assert!(literal.ends_with("R[1] - Odd.rpt"));
        let star = resolver.resolve("R*", "Plain");
        assert!(star.is_err(), "wildcards in codes must not match other reports");
        Ok(())
    }

    #[test]
    fn resolver_reports_missing_artifacts_and_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("R10 - Other.rpt"), b"")?;

        let resolver = ArtifactResolver::new(dir.path(), "rpt");
        let error = resolver
            .resolve("R1", "Sales")
            .expect_err("R1 has no artifact");
        assert_eq!(
            error.downcast_ref::<GenerateError>(),
            Some(&GenerateError::ArtifactNotFound {
                report_code: "R1".to_owned()
            })
        );

        let missing = ArtifactResolver::new(dir.path().join("absent"), "rpt");
        let error = missing.resolve("R1", "").expect_err("no directory");
        assert!(matches!(
            error.downcast_ref::<GenerateError>(),
            Some(GenerateError::BaseDirMissing { .. })
        ));
        Ok(())
    }
}
