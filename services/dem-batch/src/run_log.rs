//! Human-readable run log (`run_log.txt`).
//!
//! Append-only: every run adds one block holding its configuration, one
//! line per item outcome, and a summary. Each line is mirrored as a tracing
//! event.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::BatchConfig;
use crate::error::{BatchError, Result};

pub const RUN_LOG_FILE: &str = "run_log.txt";

/// Per-item result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Skip,
    Fail,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "OK",
            Outcome::Skip => "SKIP",
            Outcome::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stage an item outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discover,
    Clip,
    Difference,
    Aggregate,
    Visualize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Discover => "discover",
            Stage::Clip => "clip",
            Stage::Difference => "difference",
            Stage::Aggregate => "aggregate",
            Stage::Visualize => "visualize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts written at the end of a run block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub discovered: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunCounts {
    /// Nothing made it through the pipeline.
    pub fn is_suspicious(&self) -> bool {
        self.processed == 0
    }
}

/// Open handle on the run log of an output directory.
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    pub fn open(output_dir: &Path) -> Result<Self> {
        let path = output_dir.join(RUN_LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| BatchError::io(&path, e))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the block header with the run configuration.
    pub fn begin(&mut self, config: &BatchConfig, started: DateTime<Utc>) -> Result<()> {
        info!(
            baseline = %config.baseline_path.display(),
            reference = %config.reference_path.display(),
            polygons = %config.polygon_path.display(),
            zone_field = %config.zone_field,
            "Batch run started"
        );

        let mut block = String::new();
        block.push_str(&format!(
            "==== DEM difference run {} ====\n",
            started.to_rfc3339()
        ));
        for (label, value) in [
            ("input dir", config.input_dir.display().to_string()),
            ("output dir", config.output_dir.display().to_string()),
            ("baseline", config.baseline_path.display().to_string()),
            ("snap raster", config.reference_path.display().to_string()),
            ("polygons", config.polygon_path.display().to_string()),
            ("zone field", config.zone_field.clone()),
            ("clip mode", config.clip_mode.to_string()),
            ("resampling", config.resampling.to_string()),
            ("visualize", config.visualize.to_string()),
            ("convention", "difference = current - baseline".to_string()),
        ] {
            block.push_str(&format!("{:<12} {}\n", format!("{}:", label), value));
        }
        self.write(&block)
    }

    /// Record one item outcome.
    pub fn record(
        &mut self,
        stage: Stage,
        outcome: Outcome,
        item: &Path,
        detail: &str,
    ) -> Result<()> {
        let name = item
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| item.display().to_string());

        match outcome {
            Outcome::Ok => info!(stage = %stage, file = %name, detail, "Item processed"),
            Outcome::Skip => warn!(stage = %stage, file = %name, reason = detail, "Item skipped"),
            Outcome::Fail => warn!(stage = %stage, file = %name, reason = detail, "Item failed"),
        }

        self.write(&format!(
            "[{:<4}] {:<10} {}: {}\n",
            outcome.as_str(),
            stage.as_str(),
            name,
            detail
        ))
    }

    /// Close the block of a run stopped by `err`.
    pub fn abort(
        &mut self,
        err: &BatchError,
        counts: &RunCounts,
        finished: DateTime<Utc>,
    ) -> Result<()> {
        error!(error = %err, "Batch run aborted");
        self.write(&format!("ABORTED: {}: {}\n", err.kind(), err))?;
        self.finish(counts, finished)
    }

    /// Close the block with the run summary.
    pub fn finish(&mut self, counts: &RunCounts, finished: DateTime<Utc>) -> Result<()> {
        info!(
            discovered = counts.discovered,
            processed = counts.processed,
            skipped = counts.skipped,
            failed = counts.failed,
            "Batch run finished"
        );

        let mut block = format!(
            "summary: discovered {}, processed {}, skipped {}, failed {}\n",
            counts.discovered, counts.processed, counts.skipped, counts.failed
        );
        if counts.is_suspicious() {
            warn!("No input was processed, run flagged as suspicious");
            block.push_str("SUSPICIOUS: no input was processed\n");
        }
        block.push_str(&format!("==== end of run {} ====\n\n", finished.to_rfc3339()));
        self.write(&block)
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.file
            .write_all(text.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|e| BatchError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_block_layout() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig {
            zone_field: "glacier_id".to_string(),
            ..BatchConfig::default()
        };

        let mut log = RunLog::open(dir.path()).unwrap();
        log.begin(&config, at(0)).unwrap();
        log.record(Stage::Clip, Outcome::Ok, Path::new("/in/a.tif"), "a_clp.tif")
            .unwrap();
        log.record(
            Stage::Difference,
            Outcome::Fail,
            Path::new("/in/b.tif"),
            "GridMismatch: grids differ",
        )
        .unwrap();
        log.finish(
            &RunCounts {
                discovered: 2,
                processed: 1,
                skipped: 0,
                failed: 1,
            },
            at(60),
        )
        .unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert!(text.starts_with("==== DEM difference run 1970-01-01T00:00:00+00:00 ===="));
        assert!(text.contains("zone field:  glacier_id\n"));
        assert!(text.contains("convention:  difference = current - baseline\n"));
        assert!(text.contains("[OK  ] clip       a.tif: a_clp.tif\n"));
        assert!(text.contains("[FAIL] difference b.tif: GridMismatch: grids differ\n"));
        assert!(text.contains("summary: discovered 2, processed 1, skipped 0, failed 1\n"));
        assert!(!text.contains("SUSPICIOUS"));
    }

    #[test]
    fn test_appends_runs_and_flags_suspicious() {
        let dir = tempfile::tempdir().unwrap();
        let config = BatchConfig::default();

        for _ in 0..2 {
            let mut log = RunLog::open(dir.path()).unwrap();
            log.begin(&config, at(0)).unwrap();
            log.finish(&RunCounts::default(), at(1)).unwrap();
        }

        let text = std::fs::read_to_string(dir.path().join(RUN_LOG_FILE)).unwrap();
        assert_eq!(text.matches("==== DEM difference run").count(), 2);
        assert_eq!(text.matches("SUSPICIOUS").count(), 2);
    }

    #[test]
    fn test_abort_closes_block() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RunLog::open(dir.path()).unwrap();
        log.begin(&BatchConfig::default(), at(0)).unwrap();

        let err = BatchError::io(
            "/in",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        log.abort(&err, &RunCounts::default(), at(5)).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert!(text.contains("ABORTED: IOFailure: "));
        assert!(text.contains("summary: discovered 0, processed 0, skipped 0, failed 0\n"));
        assert!(text.ends_with("==== end of run 1970-01-01T00:00:05+00:00 ====\n\n"));
    }
}
