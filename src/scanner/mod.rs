//! File scanner for discovering input and result files.
//!
//! Matches entry names in a single directory level against a glob, the
//! way a shell expands `dir/*.csv`: names starting with `.` only match a
//! pattern that itself starts with `.`, and every entry type (including
//! directories and dangling symlinks) is eligible. Subdirectories are
//! never entered.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Compile a file-name glob, reporting the offending pattern on failure.
pub fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    let glob =
        Glob::new(pattern).with_context(|| format!("Invalid file pattern: {}", pattern))?;
    Ok(glob.compile_matcher())
}

/// Configuration for file scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Glob matched against file names (e.g. `*.csv`)
    pub pattern: String,
    /// Sort results by file name; otherwise keep directory listing order
    pub sort: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pattern: "*.csv".to_string(),
            sort: true,
        }
    }
}

/// Scanner over the top level of one directory.
pub struct FileScanner {
    root: PathBuf,
    matcher: GlobMatcher,
    match_hidden: bool,
    sort: bool,
}

impl FileScanner {
    /// Create a new file scanner. Fails if the pattern is not a valid glob.
    pub fn new(root: PathBuf, config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            root,
            matcher: compile_pattern(&config.pattern)?,
            match_hidden: config.pattern.starts_with('.'),
            sort: config.sort,
        })
    }

    /// List matching entries.
    ///
    /// A missing, non-directory, or unreadable root is an error; an
    /// existing directory without matches yields an empty list.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        if !self.root.exists() {
            bail!("Directory not found: {}", self.root.display());
        }
        if !self.root.is_dir() {
            bail!("Not a directory: {}", self.root.display());
        }
        fs::read_dir(&self.root)
            .with_context(|| format!("Cannot read directory: {}", self.root.display()))?;

        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false);

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry
                .with_context(|| format!("Cannot read directory: {}", self.root.display()))?;

            if self.matches(entry.file_name()) {
                files.push(entry.into_path());
            }
        }

        if self.sort {
            files.sort();
        }

        debug!(
            "Scanned {}: {} matching entries",
            self.root.display(),
            files.len()
        );
        Ok(files)
    }

    /// Check if an entry name matches the scan pattern.
    pub fn matches(&self, name: impl AsRef<Path>) -> bool {
        let name = name.as_ref();
        let hidden = name
            .to_str()
            .map_or(false, |n| n.starts_with('.'));
        if hidden && !self.match_hidden {
            return false;
        }
        self.matcher.is_match(name)
    }
}
