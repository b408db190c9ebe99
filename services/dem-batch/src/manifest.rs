//! Manifest of derived artifacts (`artifacts.json`).
//!
//! Records which output files were produced from which input so later runs
//! can tell derived rasters apart from source rasters without guessing from
//! file names.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BatchError, Result};
use crate::export::write_atomic;

pub const MANIFEST_FILE: &str = "artifacts.json";

const MANIFEST_VERSION: u32 = 1;

/// Derived artifacts, keyed by input path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    /// Input path → artifact file names in the output directory.
    pub inputs: BTreeMap<String, BTreeSet<String>>,
    /// Artifacts derived from several inputs (comparison figures).
    pub shared: BTreeSet<String>,
}

impl ArtifactManifest {
    pub fn new() -> Self {
        Self {
            version: MANIFEST_VERSION,
            ..Self::default()
        }
    }

    /// Load the manifest of `output_dir`; empty if none exists yet.
    pub fn load(output_dir: &Path) -> Result<Self> {
        let path = output_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Self::new());
        }

        let text = std::fs::read_to_string(&path).map_err(|e| BatchError::io(&path, e))?;
        let manifest: Self = serde_json::from_str(&text)?;
        debug!(
            file = %path.display(),
            inputs = manifest.inputs.len(),
            "Loaded artifact manifest"
        );
        Ok(manifest)
    }

    /// Write the manifest into `output_dir` atomically.
    pub fn save(&self, output_dir: &Path) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(self)?;
        json.push(b'\n');
        write_atomic(&output_dir.join(MANIFEST_FILE), &json)
    }

    /// Add artifacts derived from `input`.
    ///
    /// Earlier entries are kept: their files may still exist even when a
    /// later run stops short of rewriting them.
    pub fn record<I, S>(&mut self, input: &Path, artifacts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs
            .entry(input.display().to_string())
            .or_default()
            .extend(artifacts.into_iter().map(Into::into));
    }

    pub fn record_shared(&mut self, artifact: impl Into<String>) {
        self.shared.insert(artifact.into());
    }

    /// Every recorded artifact as a path inside `output_dir`, plus the
    /// manifest itself.
    pub fn artifact_paths(&self, output_dir: &Path) -> HashSet<PathBuf> {
        self.inputs
            .values()
            .flatten()
            .chain(&self.shared)
            .map(String::as_str)
            .chain(std::iter::once(MANIFEST_FILE))
            .map(|name| canonical_or_joined(output_dir, name))
            .collect()
    }
}

fn canonical_or_joined(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::canonicalize(&path).unwrap_or(path)
}
