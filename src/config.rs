//! Preload configuration loading
//!
//! Reads the "preload" settings from a composer.json style file and
//! builds a validated `RuleSet` from them. This layer owns everything
//! the core treats as external: file IO, JSON shape, defaulting and
//! path resolution against the project root.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::core::paths::normalize_path;
use crate::core::rules::RuleSet;
use crate::core::script::Mechanism;

/// Recognized "preload" settings. Unknown keys are ignored, matching
/// how composer treats the extra section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PreloadConfig {
    /// Directories to scan, relative to the project root.
    #[serde(default)]
    pub paths: Vec<String>,

    /// Individual files to always include, bypassing every filter.
    #[serde(default)]
    pub files: Vec<String>,

    /// Directories to exclude by path prefix.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Additional file extensions to scan (alphanumeric only).
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Additional path-exclusion regex patterns.
    #[serde(default)]
    pub exclude_regex: Option<Vec<String>>,

    /// Skip the opcache status checks in the generated script.
    #[serde(default)]
    pub no_status_check: bool,

    /// How the generated script loads files.
    #[serde(default)]
    pub mechanism: Mechanism,
}

/// Keys that mark a bare JSON document as a preload configuration.
const PRELOAD_KEYS: &[&str] = &[
    "paths",
    "files",
    "exclude",
    "extensions",
    "exclude-regex",
    "no-status-check",
    "mechanism",
];

/// Load the preload configuration from a JSON file.
///
/// The settings are looked up under "extra.preload" (composer.json),
/// then under a top-level "preload" key, and finally the document root
/// itself is accepted when it carries preload keys.
pub fn load(path: &Path) -> Result<PreloadConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    let Some(section) = locate_preload(&document) else {
        bail!("\"preload\" setting is not set in {}", path.display());
    };

    let config: PreloadConfig = serde_json::from_value(section.clone())
        .with_context(|| format!("\"preload\" configuration in {} is invalid", path.display()))?;
    Ok(config)
}

fn locate_preload(document: &Value) -> Option<&Value> {
    if let Some(section) = document.pointer("/extra/preload") {
        return Some(section);
    }
    if let Some(section) = document.get("preload") {
        return Some(section);
    }
    if let Some(object) = document.as_object() {
        if PRELOAD_KEYS.iter().any(|key| object.contains_key(*key)) {
            return Some(document);
        }
    }
    None
}

/// Build a validated rule set from the configuration, resolving every
/// configured path against the project root.
pub fn build_ruleset(root: &Path, config: &PreloadConfig) -> Result<RuleSet> {
    let mut rules = RuleSet::new();

    for path in &config.paths {
        rules.add_include_dir(root.join(path));
    }
    for file in &config.files {
        rules.add_include_file(root.join(file));
    }
    for path in &config.exclude {
        rules.add_exclude_dir(&normalize_path(&root.join(path)));
    }

    rules.set_exclude_regex(config.exclude_regex.as_deref())?;

    for extension in &config.extensions {
        rules.add_extension(extension)?;
    }

    Ok(rules)
}
