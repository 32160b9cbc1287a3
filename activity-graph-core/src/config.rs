//! Configuration file support for the activity graph
//!
//! Loads graph settings from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.activityrc.json` in the working directory
//! 3. `activity-graph.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::legend::GraphType;
use crate::table::{is_valid_date_format, DEFAULT_DATE_FORMAT, DEFAULT_MAX_ROWS};
use crate::tooltip::TieBreak;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default cap on custom graph metrics
pub const DEFAULT_MAX_CUSTOM_METRICS: usize = 4;

/// Default minimum explicit zoom span, in hours
pub const DEFAULT_MIN_ZOOM_HOURS: f64 = 12.0;

const RC_FILE: &str = ".activityrc.json";
const CONFIG_FILE: &str = "activity-graph.config.json";

/// Activity graph configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityConfig {
    /// Graph to show (default: issues)
    #[serde(default)]
    pub graph: Option<GraphType>,

    /// Ordered metric keys for the custom graph
    #[serde(default)]
    pub custom_metrics: Vec<String>,

    /// Maximum number of custom metrics (default: 4)
    #[serde(default)]
    pub max_custom_metrics: Option<usize>,

    /// Nearest-point tie rule (default: earlier)
    #[serde(default)]
    pub tie_break: Option<TieBreak>,

    /// Narrowest accepted zoom window in hours (default: 12)
    #[serde(default)]
    pub min_zoom_hours: Option<f64>,

    /// Data table settings
    #[serde(default)]
    pub table: Option<TableConfig>,
}

/// Data table settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    /// Rows shown before truncation (default: 100)
    pub max_rows: Option<usize>,
    /// strftime pattern for the date column (default: "%Y-%m-%d %H:%M")
    pub date_format: Option<String>,
}

/// Configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub graph: GraphType,
    pub custom_metrics: Vec<String>,
    pub max_custom_metrics: usize,
    pub tie_break: TieBreak,
    pub min_zoom_hours: f64,
    pub table_max_rows: usize,
    pub table_date_format: String,
    /// Path the config was loaded from (None if defaults)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
}

impl ActivityConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        let max_custom = self
            .max_custom_metrics
            .unwrap_or(DEFAULT_MAX_CUSTOM_METRICS);
        if max_custom == 0 {
            anyhow::bail!("max_custom_metrics must be at least 1");
        }
        if self.custom_metrics.len() > max_custom {
            anyhow::bail!(
                "custom_metrics lists {} metrics but max_custom_metrics is {}",
                self.custom_metrics.len(),
                max_custom
            );
        }
        for (i, metric) in self.custom_metrics.iter().enumerate() {
            if metric.trim().is_empty() {
                anyhow::bail!("custom_metrics[{}] must not be empty", i);
            }
            if self.custom_metrics[..i].contains(metric) {
                anyhow::bail!("custom_metrics lists '{}' more than once", metric);
            }
        }

        if let Some(hours) = self.min_zoom_hours {
            if !hours.is_finite() || hours < 0.0 {
                anyhow::bail!(
                    "min_zoom_hours must be a non-negative number (got {})",
                    hours
                );
            }
        }

        if let Some(ref table) = self.table {
            if table.max_rows == Some(0) {
                anyhow::bail!("table.max_rows must be at least 1");
            }
            if let Some(ref format) = table.date_format {
                if !is_valid_date_format(format) {
                    anyhow::bail!("table.date_format is not a valid strftime pattern: {:?}", format);
                }
            }
        }

        Ok(())
    }

    /// Resolve config into its ready-to-use form
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let (table_max_rows, table_date_format) = match &self.table {
            Some(t) => (
                t.max_rows.unwrap_or(DEFAULT_MAX_ROWS),
                t.date_format
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
            ),
            None => (DEFAULT_MAX_ROWS, DEFAULT_DATE_FORMAT.to_string()),
        };

        Ok(ResolvedConfig {
            graph: self.graph.unwrap_or_default(),
            custom_metrics: self.custom_metrics.clone(),
            max_custom_metrics: self
                .max_custom_metrics
                .unwrap_or(DEFAULT_MAX_CUSTOM_METRICS),
            tie_break: self.tie_break.unwrap_or_default(),
            min_zoom_hours: self.min_zoom_hours.unwrap_or(DEFAULT_MIN_ZOOM_HOURS),
            table_max_rows,
            table_date_format,
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        ActivityConfig::default().resolve()
    }
}

/// Discover a config file in `root`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(root: &Path) -> Result<Option<(ActivityConfig, PathBuf)>> {
    for name in [RC_FILE, CONFIG_FILE] {
        let path = root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<ActivityConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: ActivityConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in `root`.
/// Returns default config if nothing is found.
pub fn load_and_resolve(root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(root)? {
            Some((config, path)) => (config, Some(path)),
            None => (ActivityConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let resolved = ResolvedConfig::defaults().expect("default config should resolve");
        assert_eq!(resolved.graph, GraphType::Issues);
        assert_eq!(resolved.max_custom_metrics, 4);
        assert_eq!(resolved.tie_break, TieBreak::Earlier);
        assert_eq!(resolved.min_zoom_hours, 12.0);
        assert_eq!(resolved.table_max_rows, 100);
        assert_eq!(resolved.table_date_format, "%Y-%m-%d %H:%M");
        assert!(resolved.config_path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "graph": "custom",
            "custom_metrics": ["coverage", "ncloc"],
            "max_custom_metrics": 3,
            "tie_break": "later",
            "min_zoom_hours": 24,
            "table": {"max_rows": 50, "date_format": "%d/%m/%Y"}
        }"#;
        let config: ActivityConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.graph, GraphType::Custom);
        assert_eq!(resolved.custom_metrics, vec!["coverage", "ncloc"]);
        assert_eq!(resolved.max_custom_metrics, 3);
        assert_eq!(resolved.tie_break, TieBreak::Later);
        assert_eq!(resolved.min_zoom_hours, 24.0);
        assert_eq!(resolved.table_max_rows, 50);
        assert_eq!(resolved.table_date_format, "%d/%m/%Y");
    }

    #[test]
    fn test_reject_unknown_fields() {
        let result: Result<ActivityConfig, _> = serde_json::from_str(r#"{"zoom": 3}"#);
        assert!(result.is_err(), "unknown fields should be rejected");
        let result: Result<ActivityConfig, _> =
            serde_json::from_str(r#"{"table": {"rows": 3}}"#);
        assert!(result.is_err(), "unknown table fields should be rejected");
    }

    #[test]
    fn test_reject_unknown_graph() {
        let result: Result<ActivityConfig, _> = serde_json::from_str(r#"{"graph": "velocity"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_too_many_custom_metrics() {
        let json = r#"{"custom_metrics": ["a", "b", "c"], "max_custom_metrics": 2}"#;
        let config: ActivityConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_duplicate_custom_metrics() {
        let json = r#"{"custom_metrics": ["coverage", "coverage"]}"#;
        let config: ActivityConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_zero_cap_and_zero_rows() {
        let config: ActivityConfig =
            serde_json::from_str(r#"{"max_custom_metrics": 0}"#).unwrap();
        assert!(config.validate().is_err());
        let config: ActivityConfig = serde_json::from_str(r#"{"table": {"max_rows": 0}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_negative_zoom() {
        let config: ActivityConfig = serde_json::from_str(r#"{"min_zoom_hours": -1}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_bad_date_format() {
        let config: ActivityConfig =
            serde_json::from_str(r#"{"table": {"date_format": "%Q"}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discover_priority_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".activityrc.json"), r#"{"graph": "coverage"}"#).unwrap();
        fs::write(
            dir.path().join("activity-graph.config.json"),
            r#"{"graph": "duplications"}"#,
        )
        .unwrap();

        let (config, path) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(
            config.graph,
            Some(GraphType::Coverage),
            ".activityrc.json should take priority"
        );
        assert!(path.ends_with(".activityrc.json"));
    }

    #[test]
    fn test_discover_config_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("activity-graph.config.json"),
            r#"{"tie_break": "later"}"#,
        )
        .unwrap();
        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.tie_break, Some(TieBreak::Later));
    }

    #[test]
    fn test_no_config_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_and_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.json");
        fs::write(&config_path, r#"{"min_zoom_hours": 1.5}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&config_path)).unwrap();
        assert_eq!(resolved.min_zoom_hours, 1.5);
        assert_eq!(resolved.config_path, Some(config_path));
    }

    #[test]
    fn test_invalid_file_names_path_in_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".activityrc.json");
        fs::write(&config_path, r#"{"max_custom_metrics": 0}"#).unwrap();
        let err = load_and_resolve(dir.path(), None).unwrap_err();
        assert!(format!("{:#}", err).contains(".activityrc.json"));
    }
}
