//! Safe-write guard
//!
//! Decides, per target file, whether a rendered artifact may be written and
//! performs the write. The customization check is a heuristic: a file longer
//! than [`CUSTOMIZED_MIN_LINES`] lines with none of the placeholder markers is
//! assumed to be operator-authored. An operator file that mentions
//! `localhost` is treated as a placeholder and overwritten.

use crate::error::{ProvisionError, Result};
use crate::models::{RenderedArtifact, WriteDecision};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Files with at most this many lines are never considered customized
pub const CUSTOMIZED_MIN_LINES: usize = 5;

/// Fragments found in stock or placeholder proxy configs, matched case-insensitively
pub const PLACEHOLDER_MARKERS: [&str; 4] = [
    "example.com",
    ":80 {",
    "caddy works!",
    "localhost",
];

/// Three-way classification of an existing file's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// Too short to hold meaningful operator edits
    Trivial,
    /// Contains a stock/placeholder marker
    Placeholder,
    /// Looks hand-edited; must not be overwritten
    Customized,
}

/// Classify existing file content
pub fn classify(content: &str) -> ContentClass {
    if content.lines().count() <= CUSTOMIZED_MIN_LINES {
        return ContentClass::Trivial;
    }

    let lowered = content.to_lowercase();
    if PLACEHOLDER_MARKERS.iter().any(|m| lowered.contains(m)) {
        ContentClass::Placeholder
    } else {
        ContentClass::Customized
    }
}

/// Decision for a target that may hold operator customizations
///
/// `existing` is `None` when the file does not exist.
pub fn decide_overwrite(existing: Option<&str>) -> WriteDecision {
    match existing.map(classify) {
        Some(ContentClass::Customized) => WriteDecision::SkipCustomized,
        _ => WriteDecision::Write,
    }
}

/// Decision for a target that must be generated exactly once
pub fn decide_once(path: &Path) -> WriteDecision {
    if path.exists() {
        WriteDecision::SkipExisting
    } else {
        WriteDecision::Write
    }
}

/// Read a target file, treating "not found" as absent
pub fn read_existing(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProvisionError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persist an artifact and apply its permission bits
///
/// New files are created with the artifact's mode; existing files are
/// narrowed before content is written.
pub fn write_artifact(artifact: &RenderedArtifact) -> Result<()> {
    let path = &artifact.path;
    let wrap = |source: std::io::Error| ProvisionError::Write {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }

    let mut options = fs::OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(artifact.mode);
    }
    let mut file = options.open(path).map_err(wrap)?;

    // The creation mode only applies to new files
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(artifact.mode)).map_err(wrap)?;
    }

    file.write_all(&artifact.content).map_err(wrap)?;
    file.sync_all().map_err(wrap)?;
    Ok(())
}

/// Verify a directory exists (creating it if needed) and accepts new files
pub fn ensure_writable_dir(dir: &Path) -> Result<()> {
    let wrap = |source: std::io::Error| ProvisionError::Preflight {
        path: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(wrap)?;
    tempfile::Builder::new()
        .prefix(".provision-write-test")
        .tempfile_in(dir)
        .map_err(wrap)?;
    Ok(())
}
