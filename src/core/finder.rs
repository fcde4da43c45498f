//! Preload file discovery
//!
//! Resolves a `RuleSet` into the ordered manifest of files to preload:
//! include directories are walked recursively in insertion order,
//! candidates are filtered, and explicitly listed files are appended
//! last, unfiltered.

use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::core::manifest::{Manifest, ResolvedFile};
use crate::core::paths::normalize_path;
use crate::core::rules::RuleSet;
use crate::error::PreloadError;

/// Discover every file matching the rule set.
///
/// Output order: scanned files first, in traversal order per include
/// directory; explicit include files last. Nothing is deduplicated: a
/// file reachable both by scan and by explicit listing appears twice.
pub fn discover(rules: &RuleSet) -> Result<Manifest, PreloadError> {
    if rules.include_dirs().is_empty() {
        return Err(PreloadError::NoIncludePaths);
    }

    let mut files = Vec::new();

    for dir in rules.include_dirs() {
        collect_dir(rules, dir, &mut files);
    }

    for file in rules.include_files() {
        files.push(ResolvedFile::new(normalize_path(file)));
    }

    let mut manifest = Manifest::new();
    manifest.populate(files)?;
    Ok(manifest)
}

fn collect_dir(rules: &RuleSet, dir: &Path, files: &mut Vec<ResolvedFile>) {
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_pruned_sub_dir(rules, dir, entry));

    for entry in walker {
        // Unreadable entries are dropped; preload generation is best effort.
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if !rules.matches_extension(entry.path()) {
            continue;
        }

        let path = normalize_path(entry.path());
        if is_excluded(rules, &path) {
            continue;
        }

        files.push(ResolvedFile::new(path));
    }
}

/// The skip-subdirectory layer: pruned directories are never descended
/// into. Patterns are matched against the path relative to the include
/// directory being walked.
fn is_pruned_sub_dir(rules: &RuleSet, root: &Path, entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }

    let Ok(relative) = entry.path().strip_prefix(root) else {
        return false;
    };
    let relative = normalize_path(relative);

    rules
        .exclude_sub_dirs()
        .iter()
        .any(|pattern| pattern.trim_end_matches('/') == relative)
}

/// Directory exclusion wins first; the static patterns only run when it
/// did not match. Patterns are checked in insertion order.
fn is_excluded(rules: &RuleSet, path: &str) -> bool {
    if let Some(dir_regex) = rules.exclude_dir_regex() {
        if dir_regex.is_match(path) {
            return true;
        }
    }

    rules.exclude_patterns().iter().any(|re| re.is_match(path))
}
