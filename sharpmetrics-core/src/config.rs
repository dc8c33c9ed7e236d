//! Configuration file support for sharpmetrics
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.sharpmetricsrc.json` in project root
//! 3. `sharpmetrics.config.json` in project root
//!
//! All fields are optional.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default exclude patterns applied when no config is specified
const DEFAULT_EXCLUDES: &[&str] = &["**/bin/**", "**/obj/**"];

const DEFAULT_FEATURE_ENVY_THRESHOLD: usize = 3;

const DEFAULT_SYSTEM_PREFIXES: &[&str] = &["System.", "Microsoft."];

const DEFAULT_ID_COLUMN: &str = "Code Snippet ID";
const DEFAULT_LABEL_COLUMN: &str = "Final annotation";

/// sharpmetrics configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharpMetricsConfig {
    /// Glob patterns for documents to include (default: every `.cs` file)
    #[serde(default)]
    pub include: Vec<String>,

    /// Glob patterns for documents to exclude (default: bin and obj output)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Calls to one foreign type above which Feature Envy is reported (default: 3)
    #[serde(default)]
    pub feature_envy_threshold: Option<usize>,

    /// Assembly name prefixes treated as framework code
    #[serde(default)]
    pub system_assembly_prefixes: Option<Vec<String>>,

    /// Column names of the annotation CSV
    #[serde(default)]
    pub annotations: Option<AnnotationColumns>,
}

/// Column names of the annotation CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnnotationColumns {
    /// Column holding the qualified method name (default: "Code Snippet ID")
    pub id_column: Option<String>,
    /// Column holding the integer label (default: "Final annotation")
    pub label_column: Option<String>,
}

/// Resolved configuration with compiled glob patterns
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Compiled include patterns (empty means include all)
    pub include: Option<GlobSet>,
    /// Compiled exclude patterns
    pub exclude: GlobSet,
    pub feature_envy_threshold: usize,
    pub system_assembly_prefixes: Vec<String>,
    pub annotation_id_column: String,
    pub annotation_label_column: String,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl SharpMetricsConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.feature_envy_threshold {
            if threshold < 1 {
                anyhow::bail!("feature_envy_threshold must be at least 1 (got {})", threshold);
            }
        }

        if let Some(ref prefixes) = self.system_assembly_prefixes {
            if prefixes.iter().any(|prefix| prefix.trim().is_empty()) {
                anyhow::bail!("system_assembly_prefixes must not contain empty prefixes");
            }
        }

        if let Some(ref columns) = self.annotations {
            for (name, value) in [
                ("id_column", &columns.id_column),
                ("label_column", &columns.label_column),
            ] {
                if value.as_ref().is_some_and(|v| v.trim().is_empty()) {
                    anyhow::bail!("annotations.{} must not be empty", name);
                }
            }
        }

        // Validate glob patterns compile
        for pattern in &self.include {
            Glob::new(pattern).with_context(|| format!("invalid include pattern: {}", pattern))?;
        }
        for pattern in &self.exclude {
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {}", pattern))?;
        }

        Ok(())
    }

    /// Resolve config into compiled form ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        // Compile include patterns
        let include = if self.include.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &self.include {
                builder.add(Glob::new(pattern)?);
            }
            Some(builder.build()?)
        };

        // Compile exclude patterns (defaults when the user gave none)
        let exclude = {
            let mut builder = GlobSetBuilder::new();
            if self.exclude.is_empty() {
                for pattern in DEFAULT_EXCLUDES {
                    builder.add(Glob::new(pattern)?);
                }
            } else {
                for pattern in &self.exclude {
                    builder.add(Glob::new(pattern)?);
                }
            }
            builder.build()?
        };

        let system_assembly_prefixes = match &self.system_assembly_prefixes {
            Some(prefixes) => prefixes.clone(),
            None => DEFAULT_SYSTEM_PREFIXES.iter().map(|p| p.to_string()).collect(),
        };

        let (id_column, label_column) = match &self.annotations {
            Some(columns) => (
                columns
                    .id_column
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ID_COLUMN.to_string()),
                columns
                    .label_column
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LABEL_COLUMN.to_string()),
            ),
            None => (DEFAULT_ID_COLUMN.to_string(), DEFAULT_LABEL_COLUMN.to_string()),
        };

        Ok(ResolvedConfig {
            include,
            exclude,
            feature_envy_threshold: self
                .feature_envy_threshold
                .unwrap_or(DEFAULT_FEATURE_ENVY_THRESHOLD),
            system_assembly_prefixes,
            annotation_id_column: id_column,
            annotation_label_column: label_column,
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Check if a file path should be included based on include/exclude patterns
    pub fn should_include(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        // Check exclude first
        if self.exclude.is_match(path_str.as_ref()) {
            return false;
        }

        // If include patterns exist, file must match at least one
        if let Some(ref include) = self.include {
            return include.is_match(path_str.as_ref());
        }

        true
    }

    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        SharpMetricsConfig::default().resolve()
    }
}

/// Discover and load a config file from the project root
///
/// Search order:
/// 1. `.sharpmetricsrc.json`
/// 2. `sharpmetrics.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(SharpMetricsConfig, PathBuf)>> {
    for name in [".sharpmetricsrc.json", "sharpmetrics.config.json"] {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }

    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<SharpMetricsConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: SharpMetricsConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (SharpMetricsConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
