//! Preload manifest
//!
//! The manifest is the ordered list of files the generated script will
//! load. It is populated exactly once by discovery and read any number
//! of times afterwards.

use crate::error::PreloadError;

/// A discovered file path, normalized to '/' separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile(String);

impl ResolvedFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResolvedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, populate-once holder for the preload file list.
///
/// Reading before populating fails with `NotPopulated`; populating twice
/// fails with `AlreadyPopulated`. Regenerating a manifest means building
/// a new one, not overwriting an existing one.
#[derive(Debug, Default)]
pub struct Manifest {
    files: Option<Vec<ResolvedFile>>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the discovered file list. A second call is rejected.
    pub fn populate(&mut self, files: Vec<ResolvedFile>) -> Result<(), PreloadError> {
        if self.files.is_some() {
            return Err(PreloadError::AlreadyPopulated);
        }
        self.files = Some(files);
        Ok(())
    }

    /// The stored file list, in discovery order.
    pub fn files(&self) -> Result<&[ResolvedFile], PreloadError> {
        self.files.as_deref().ok_or(PreloadError::NotPopulated)
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.files.as_ref().map_or(0, Vec::len)
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
