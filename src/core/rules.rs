//! Inclusion/exclusion rules for preload discovery
//!
//! A `RuleSet` collects include directories and files, exclude
//! directories (matched as case-insensitive path prefixes), exclusion
//! regex patterns and the file extension whitelist. Patterns and
//! extensions are validated at insertion time, never at discovery time.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::core::paths::normalize_dir;
use crate::error::PreloadError;

/// Extensions must be purely alphanumeric.
static EXTENSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("Invalid EXTENSION_RE regex"));

/// PHP regex flags we can translate to inline groups.
const TRANSLATABLE_FLAGS: &str = "imsx";

/// Full PHP pattern-modifier set, used to decide whether a '/'-wrapped
/// string is a delimited pattern at all.
const PHP_FLAGS: &str = "imsxADSUXJu";

#[derive(Debug)]
pub struct RuleSet {
    include_dirs: Vec<PathBuf>,
    include_files: Vec<PathBuf>,
    exclude_dirs: Vec<String>,
    exclude_sub_dirs: Vec<String>,
    exclude_patterns: Vec<Regex>,
    extensions: Vec<String>,
    dir_pattern: Option<String>,
    dir_regex: Option<Regex>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self {
            include_dirs: Vec::new(),
            include_files: Vec::new(),
            exclude_dirs: Vec::new(),
            exclude_sub_dirs: Vec::new(),
            exclude_patterns: Vec::new(),
            extensions: vec!["php".to_string()],
            dir_pattern: None,
            dir_regex: None,
        }
    }

    /// Add a directory to scan recursively.
    pub fn add_include_dir(&mut self, dir: impl Into<PathBuf>) {
        self.include_dirs.push(dir.into());
    }

    /// Add a file that is always preloaded, bypassing every filter.
    pub fn add_include_file(&mut self, file: impl Into<PathBuf>) {
        self.include_files.push(file.into());
    }

    /// Exclude every path under `dir`. The combined prefix regex is
    /// rebuilt immediately, so it can never serve a stale directory list.
    pub fn add_exclude_dir(&mut self, dir: &str) {
        self.exclude_dirs.push(normalize_dir(dir));
        self.rebuild_dir_regex();
    }

    /// Prune a subdirectory (relative to each include directory) from
    /// traversal entirely. Distinct from `add_exclude_dir`: pruned
    /// directories are never descended into.
    pub fn add_exclude_sub_dir(&mut self, name: impl Into<String>) {
        self.exclude_sub_dirs.push(name.into());
    }

    /// Register exclusion regex patterns. `None` is a no-op. Every
    /// pattern must compile; the first failure aborts the whole call.
    pub fn set_exclude_regex(&mut self, patterns: Option<&[String]>) -> Result<(), PreloadError> {
        let Some(patterns) = patterns else {
            return Ok(());
        };

        for pattern in patterns {
            self.exclude_patterns.push(compile_exclude_pattern(pattern)?);
        }
        Ok(())
    }

    /// Whitelist a file extension. Re-adding an extension is a no-op.
    pub fn add_extension(&mut self, extension: &str) -> Result<(), PreloadError> {
        if !EXTENSION_RE.is_match(extension) {
            return Err(PreloadError::InvalidExtension(extension.to_string()));
        }

        if !self.extensions.iter().any(|e| e == extension) {
            self.extensions.push(extension.to_string());
        }
        Ok(())
    }

    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    pub fn include_files(&self) -> &[PathBuf] {
        &self.include_files
    }

    pub fn exclude_sub_dirs(&self) -> &[String] {
        &self.exclude_sub_dirs
    }

    pub fn exclude_patterns(&self) -> &[Regex] {
        &self.exclude_patterns
    }

    #[allow(dead_code)]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// The combined exclude-directory regex, or `None` when no exclude
    /// directories are configured.
    pub fn exclude_dir_regex(&self) -> Option<&Regex> {
        self.dir_regex.as_ref()
    }

    /// The combined exclude-directory pattern string, for inspection.
    #[allow(dead_code)]
    pub fn exclude_dir_pattern(&self) -> Option<&str> {
        self.dir_pattern.as_deref()
    }

    /// Whether `path` matches the configured extension whitelist.
    /// Matching is case-sensitive.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    }

    fn rebuild_dir_regex(&mut self) {
        let alternation = self
            .exclude_dirs
            .iter()
            .map(|dir| regex::escape(dir))
            .collect::<Vec<_>>()
            .join("|");

        // Duplicate directories stay duplicated in the alternation.
        let pattern = format!("(?i)^({})", alternation);
        let regex = Regex::new(&pattern).expect("Invalid exclude directory regex");
        self.dir_pattern = Some(pattern);
        self.dir_regex = Some(regex);
    }
}

/// Compile one exclusion pattern.
///
/// Patterns use native `regex` syntax. As a compatibility shim for
/// configurations written for PCRE, a '/'-delimited pattern with the
/// flags `i`, `m`, `s` or `x` (e.g. `/_test\.php$/i`) is translated to
/// an inline-flag group; other PHP modifiers are rejected.
fn compile_exclude_pattern(pattern: &str) -> Result<Regex, PreloadError> {
    let translated = translate_delimited(pattern)?;
    Regex::new(&translated).map_err(|err| PreloadError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: err.to_string(),
    })
}

/// Strip PHP-style '/' delimiters and translate trailing flags.
///
/// A string only counts as delimited when it is wrapped in '/' and its
/// trailing segment consists solely of PHP pattern modifiers; anything
/// else (e.g. `/tmp/cache`) is taken as a native pattern verbatim.
fn translate_delimited(pattern: &str) -> Result<String, PreloadError> {
    let Some(rest) = pattern.strip_prefix('/') else {
        return Ok(pattern.to_string());
    };

    let Some(close) = rest.rfind('/') else {
        return Ok(pattern.to_string());
    };

    let (body, flags) = rest.split_at(close);
    let flags = &flags[1..];

    if !flags.chars().all(|c| PHP_FLAGS.contains(c)) {
        return Ok(pattern.to_string());
    }

    if !flags.chars().all(|c| TRANSLATABLE_FLAGS.contains(c)) {
        return Err(PreloadError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: format!("unsupported pattern modifiers \"{}\"", flags),
        });
    }

    if flags.is_empty() {
        Ok(body.to_string())
    } else {
        Ok(format!("(?{}){}", flags, body))
    }
}
