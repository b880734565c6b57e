// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use repman_app::DEFAULT_EXTENSION;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_VIEWER_WAIT: &str = "30s";
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub reports: Reports,
    #[serde(default)]
    pub viewer: Viewer,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            reports: Reports::default(),
            viewer: Viewer::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Reports {
    pub base_dir: Option<String>,
    pub extension: Option<String>,
}

impl Default for Reports {
    fn default() -> Self {
        Self {
            base_dir: None,
            extension: Some(DEFAULT_EXTENSION.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Viewer {
    /// External program handed the report file and its values.
    pub command: Option<String>,
    /// How long `--generate` waits for the viewer to finish.
    pub wait: Option<String>,
}

impl Default for Viewer {
    fn default() -> Self {
        Self {
            command: None,
            wait: Some(DEFAULT_VIEWER_WAIT.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub level: Option<String>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("REPMAN_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set REPMAN_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(repman_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version; add `version = 1` above the [storage], [reports], [viewer], and [logging] sections",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.version != CONFIG_VERSION {
            bail!(
                "config {} has version {}; expected 1",
                path.display(),
                self.version
            );
        }

        if let Some(db_path) = &self.storage.db_path {
            repman_db::validate_db_path(db_path)
                .with_context(|| format!("storage.db_path in {}", path.display()))?;
        }

        if let Some(base_dir) = &self.reports.base_dir
            && base_dir.trim().is_empty()
        {
            bail!("reports.base_dir in {} must not be empty", path.display());
        }

        if let Some(extension) = &self.reports.extension {
            if extension.trim().is_empty() {
                bail!("reports.extension in {} must not be empty", path.display());
            }
            if extension.contains(['.', '/', '\\']) {
                bail!(
                    "reports.extension in {} must be a bare extension like \"rpt\", got {:?}",
                    path.display(),
                    extension
                );
            }
        }

        if let Some(command) = &self.viewer.command
            && command.trim().is_empty()
        {
            bail!(
                "viewer.command in {} must not be empty; remove it to print values instead",
                path.display()
            );
        }

        if let Some(wait) = &self.viewer.wait {
            let parsed = parse_duration(wait)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "viewer.wait in {} must be positive, got {}",
                    path.display(),
                    wait
                );
            }
        }

        if let Some(level) = &self.logging.level
            && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            bail!(
                "logging.level in {} must be one of {}, got {:?}",
                path.display(),
                LOG_LEVELS.join(", "),
                level
            );
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => repman_db::default_db_path(),
        }
    }

    pub fn reports_dir(&self) -> Result<PathBuf> {
        if let Some(base_dir) = &self.reports.base_dir {
            return Ok(PathBuf::from(base_dir));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set reports.base_dir in the config file")
        })?;
        Ok(data_root.join(repman_db::APP_NAME).join("reports"))
    }

    pub fn extension(&self) -> &str {
        self.reports
            .extension
            .as_deref()
            .unwrap_or(DEFAULT_EXTENSION)
    }

    pub fn viewer_command(&self) -> Option<&str> {
        self.viewer.command.as_deref().map(str::trim)
    }

    pub fn viewer_wait(&self) -> Result<Duration> {
        parse_duration(self.viewer.wait.as_deref().unwrap_or(DEFAULT_VIEWER_WAIT))
    }

    pub fn log_level(&self) -> String {
        self.logging
            .level
            .as_deref()
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_ascii_lowercase()
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# repman config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/repman/repman.db)\n# db_path = \"/absolute/path/to/repman.db\"\n\n[reports]\n# Directory searched recursively for report files\n# base_dir = \"/srv/reports\"\nextension = \"{}\"\n\n[viewer]\n# Program run as: <command> <report file> ID=VALUE...\n# Without it the values are printed as JSON.\n# command = \"report-viewer\"\nwait = \"{}\"\n\n[logging]\n# Overridden by RUST_LOG\nlevel = \"{}\"\n",
            path.display(),
            DEFAULT_EXTENSION,
            DEFAULT_VIEWER_WAIT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid wait duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid wait duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid wait duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}
