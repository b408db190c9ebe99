//! Input raster discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::BatchConfig;
use crate::error::{BatchError, Result};

/// Paths never treated as inputs.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    /// Canonical output directory, when it differs from the input directory.
    pub output_dir: Option<PathBuf>,
    /// Canonical paths of recorded artifacts.
    pub artifacts: HashSet<PathBuf>,
}

impl Exclusions {
    pub fn new(input_dir: &Path, output_dir: &Path, artifacts: HashSet<PathBuf>) -> Self {
        let input = std::fs::canonicalize(input_dir).ok();
        let output = std::fs::canonicalize(output_dir).ok();
        Self {
            output_dir: output.filter(|out| Some(out) != input.as_ref()),
            artifacts,
        }
    }

    pub fn excludes(&self, canonical: &Path) -> bool {
        self.artifacts.contains(canonical)
            || self
                .output_dir
                .as_ref()
                .is_some_and(|dir| canonical.starts_with(dir))
    }
}

/// Result of scanning the input directory.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Candidate rasters, sorted by file name.
    pub candidates: Vec<PathBuf>,
    /// Raster entries that could not be inspected, in walk order.
    pub failures: Vec<(PathBuf, BatchError)>,
}

impl Discovery {
    /// Every raster entry seen, usable or not.
    pub fn len(&self) -> usize {
        self.candidates.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Candidate rasters in `config.input_dir`, sorted by file name.
///
/// Non-recursive. Files are matched by extension (case-insensitive) and
/// anything in `exclusions` is dropped. Only an unreadable input directory
/// is an error; entries that cannot be inspected (dangling links, races with
/// deletion) are reported in [`Discovery::failures`].
pub fn discover(config: &BatchConfig, exclusions: &Exclusions) -> Result<Discovery> {
    let mut found = Discovery::default();

    let walker = WalkDir::new(&config.input_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| config.input_dir.clone());
                let root = e.depth() == 0;
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                let err = BatchError::io(&path, source);

                if root {
                    return Err(err);
                }
                if config.accepts_extension(&path) {
                    found.failures.push((path, err));
                } else {
                    debug!(file = %path.display(), error = %err, "Ignoring unreadable entry");
                }
                continue;
            }
        };

        if !entry.file_type().is_file() || !config.accepts_extension(entry.path()) {
            continue;
        }

        let canonical = match std::fs::canonicalize(entry.path()) {
            Ok(path) => path,
            Err(e) => {
                let err = BatchError::io(entry.path(), e);
                found.failures.push((entry.into_path(), err));
                continue;
            }
        };
        if exclusions.excludes(&canonical) {
            debug!(file = %entry.path().display(), "Skipping derived artifact");
            continue;
        }

        found.candidates.push(entry.into_path());
    }

    debug!(
        dir = %config.input_dir.display(),
        count = found.candidates.len(),
        failed = found.failures.len(),
        "Discovered input rasters"
    );

    Ok(found)
}
