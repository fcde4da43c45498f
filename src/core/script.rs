//! Preload script generation
//!
//! Renders a manifest into the executable PHP preload script and
//! persists it. The header comment, the `$_root_directory` variable and
//! the load-statement shapes are a compatibility surface: consumers
//! diff the generated output, so the exact text matters.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::manifest::{Manifest, ResolvedFile};
use crate::core::paths::make_relative;
use crate::error::PreloadError;

/// How the generated script loads each file into the opcache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mechanism {
    /// `require_once()` each file; top-level code in it runs.
    #[default]
    Require,
    /// `opcache_compile_file()` each file without executing it.
    Precompile,
}

impl std::str::FromStr for Mechanism {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "require" => Ok(Mechanism::Require),
            "precompile" => Ok(Mechanism::Precompile),
            _ => Err(format!("Unknown mechanism: {}", s)),
        }
    }
}

/// A rendered script body plus the number of load statements in it.
#[derive(Debug, Clone)]
pub struct GeneratedScript {
    pub text: String,
    pub count: usize,
}

const HEADER: &str = r#"<?php

/**
 * Opcache warm-up file generated by prewarm.
 * This file was generated automatically. Any changes will be overwritten
 * during the next "prewarm generate" run.
 */

require_once(\dirname(__DIR__) . '/vendor/autoload.php');

$_root_directory = \dirname(__DIR__);
"#;

const STATUS_CHECK: &str = r#"
if (!\function_exists('opcache_compile_file') || !\ini_get('opcache.enable')) {
  echo 'Opcache is not available.';
  die(1);
}

if ('cli' === \PHP_SAPI && !\ini_get('opcache.enable_cli')) {
  echo 'Opcache is not enabled for CLI applications.';
  die(2);
}

"#;

/// Renders the manifest into the preload script body.
#[derive(Debug, Clone, Copy)]
pub struct ScriptGenerator {
    mechanism: Mechanism,
    status_check: bool,
}

impl ScriptGenerator {
    pub fn new(mechanism: Mechanism) -> Self {
        Self {
            mechanism,
            status_check: true,
        }
    }

    /// Toggle the opcache status guard in the generated script.
    pub fn with_status_check(mut self, check: bool) -> Self {
        self.status_check = check;
        self
    }

    /// Render the manifest. The count starts at zero on every call and
    /// ends equal to the number of load statements emitted.
    pub fn generate(
        &self,
        manifest: &Manifest,
        root: &Path,
    ) -> Result<GeneratedScript, PreloadError> {
        let mut count = 0;
        let mut text = String::from(HEADER);

        if self.status_check {
            text.push_str(STATUS_CHECK);
        }

        text.push_str("// Cache files to opcache.\n");
        for file in manifest.files()? {
            text.push_str(&self.cache_line(file, root));
            count += 1;
        }

        Ok(GeneratedScript { text, count })
    }

    fn cache_line(&self, file: &ResolvedFile, root: &Path) -> String {
        let path = root_relative(file, root);
        let path = add_slashes(&path);
        match self.mechanism {
            Mechanism::Require => {
                format!("require_once($_root_directory . '/{}');\n", path)
            }
            Mechanism::Precompile => {
                format!("\\opcache_compile_file($_root_directory . '/{}');\n", path)
            }
        }
    }
}

/// Paths under the project root are emitted root-relative; anything else
/// is emitted as-is.
fn root_relative(file: &ResolvedFile, root: &Path) -> String {
    make_relative(Path::new(file.as_str()), root)
        .filter(|relative| !relative.is_empty())
        .unwrap_or_else(|| file.as_str().to_string())
}

/// Escape for a single-quoted PHP string literal, addslashes() style.
fn add_slashes(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        if matches!(c, '\\' | '\'' | '"') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Persists a generated script to its destination path.
#[derive(Debug)]
pub struct PreloadWriter {
    path: PathBuf,
}

impl PreloadWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the script, creating parent directories as needed.
    pub fn write(&self, script: &GeneratedScript) -> Result<(), PreloadError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| PreloadError::Write {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }

        fs::write(&self.path, &script.text).map_err(|source| PreloadError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manifest_of(paths: &[&str]) -> Manifest {
        let mut manifest = Manifest::new();
        manifest
            .populate(paths.iter().copied().map(ResolvedFile::new).collect())
            .unwrap();
        manifest
    }

    #[test]
    fn test_mechanism_from_str() {
        assert_eq!("require".parse::<Mechanism>().unwrap(), Mechanism::Require);
        assert_eq!(
            "precompile".parse::<Mechanism>().unwrap(),
            Mechanism::Precompile
        );
        assert_eq!("REQUIRE".parse::<Mechanism>().unwrap(), Mechanism::Require);
        assert!("opcache".parse::<Mechanism>().is_err());
    }

    #[test]
    fn test_require_mechanism_emits_one_statement_per_file() {
        let manifest = manifest_of(&["/app/src/a.php", "/app/src/b.php"]);
        let generator = ScriptGenerator::new(Mechanism::Require);

        let script = generator.generate(&manifest, Path::new("/app")).unwrap();
        assert_eq!(script.count, 2);
        assert!(script
            .text
            .contains("require_once($_root_directory . '/src/a.php');\n"));
        assert!(script
            .text
            .contains("require_once($_root_directory . '/src/b.php');\n"));
    }

    #[test]
    fn test_precompile_mechanism_switches_statement_shape() {
        let manifest = manifest_of(&["/app/src/a.php"]);
        let generator = ScriptGenerator::new(Mechanism::Precompile);

        let script = generator.generate(&manifest, Path::new("/app")).unwrap();
        assert!(script
            .text
            .contains("\\opcache_compile_file($_root_directory . '/src/a.php');\n"));
        assert!(!script.text.contains("require_once($_root_directory"));
    }

    #[test]
    fn test_header_establishes_root_directory() {
        let manifest = manifest_of(&[]);
        let generator = ScriptGenerator::new(Mechanism::Require);

        let script = generator.generate(&manifest, Path::new("/app")).unwrap();
        assert!(script.text.starts_with("<?php\n"));
        assert!(script.text.contains("generated automatically"));
        assert!(script
            .text
            .contains("require_once(\\dirname(__DIR__) . '/vendor/autoload.php');"));
        assert!(script
            .text
            .contains("$_root_directory = \\dirname(__DIR__);"));
        assert!(script.text.contains("// Cache files to opcache.\n"));
        assert_eq!(script.count, 0);
    }

    #[test]
    fn test_status_check_present_by_default() {
        let manifest = manifest_of(&[]);
        let script = ScriptGenerator::new(Mechanism::Require)
            .generate(&manifest, Path::new("/app"))
            .unwrap();

        assert!(script.text.contains("Opcache is not available."));
        assert!(script.text.contains("die(1);"));
        assert!(script
            .text
            .contains("Opcache is not enabled for CLI applications."));
        assert!(script.text.contains("die(2);"));
    }

    #[test]
    fn test_status_check_can_be_disabled() {
        let manifest = manifest_of(&[]);
        let script = ScriptGenerator::new(Mechanism::Require)
            .with_status_check(false)
            .generate(&manifest, Path::new("/app"))
            .unwrap();

        assert!(!script.text.contains("Opcache is not available."));
        assert!(!script.text.contains("\\function_exists"));
    }

    #[test]
    fn test_count_resets_between_renders() {
        let manifest = manifest_of(&["/app/a.php"]);
        let generator = ScriptGenerator::new(Mechanism::Require);

        let first = generator.generate(&manifest, Path::new("/app")).unwrap();
        let second = generator.generate(&manifest, Path::new("/app")).unwrap();
        assert_eq!(first.count, 1);
        assert_eq!(second.count, 1);
    }

    #[test]
    fn test_generate_on_unpopulated_manifest_fails() {
        let manifest = Manifest::new();
        let generator = ScriptGenerator::new(Mechanism::Require);
        assert!(matches!(
            generator.generate(&manifest, Path::new("/app")),
            Err(PreloadError::NotPopulated)
        ));
    }

    #[test]
    fn test_path_outside_root_is_emitted_verbatim() {
        let manifest = manifest_of(&["/elsewhere/f.php"]);
        let script = ScriptGenerator::new(Mechanism::Require)
            .generate(&manifest, Path::new("/app"))
            .unwrap();

        assert!(script
            .text
            .contains("require_once($_root_directory . '//elsewhere/f.php');\n"));
    }

    #[test]
    fn test_add_slashes_escapes_quotes_and_backslashes() {
        assert_eq!(add_slashes(r"a'b\c"), r"a\'b\\c");
        assert_eq!(add_slashes(r#"x"y"#), r#"x\"y"#);
        assert_eq!(add_slashes("plain/path.php"), "plain/path.php");
    }

    #[test]
    fn test_writer_creates_parent_directories() {
        let temp = tempdir().unwrap();
        let destination = temp.path().join("vendor/preload.php");

        let manifest = manifest_of(&["/app/a.php"]);
        let script = ScriptGenerator::new(Mechanism::Require)
            .generate(&manifest, Path::new("/app"))
            .unwrap();

        let writer = PreloadWriter::new(&destination);
        writer.write(&script).unwrap();

        let written = std::fs::read_to_string(&destination).unwrap();
        assert_eq!(written, script.text);
    }

    #[test]
    fn test_writer_reports_os_failures() {
        let temp = tempdir().unwrap();

        let manifest = manifest_of(&[]);
        let script = ScriptGenerator::new(Mechanism::Require)
            .generate(&manifest, Path::new("/app"))
            .unwrap();

        // The destination is an existing directory; the write must fail.
        let writer = PreloadWriter::new(temp.path());
        assert!(matches!(
            writer.write(&script),
            Err(PreloadError::Write { .. })
        ));
    }
}
