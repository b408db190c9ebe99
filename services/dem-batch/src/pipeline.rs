//! The batch orchestrator.
//!
//! ```text
//! DISCOVER ─► CLIP ─► DIFFERENCE ─► AGGREGATE ─► EXPORT ─► VISUALIZE
//!             (align + clip)  (vs baseline)   (CSV)       (optional)
//! ```
//!
//! Stages run one after another over the whole input set, each reading the
//! artifact the previous stage wrote. A failing item is logged and dropped
//! from later stages; it leaves no artifact for the failing stage.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use chrono::Utc;
use dem_common::Raster;
use geotiff_io::{read_grid, read_raster, write_raster};
use grid_processor::{
    aggregate, align, clip, difference, AlignmentConfig, PolygonLayer, PolygonMask,
};
use renderer::{encode_image, render_comparison, render_single, FigureOptions, Panel};
use tracing::{debug, info, warn};

use crate::config::BatchConfig;
use crate::discovery::{discover, Exclusions};
use crate::error::{BatchError, ErrorKind, Result};
use crate::export::{write_atomic, write_zonal_csv};
use crate::manifest::ArtifactManifest;
use crate::run_log::{Outcome, RunCounts, RunLog, Stage};

pub const CLIPPED_SUFFIX: &str = "_clp.tif";
pub const DIFFERENCE_SUFFIX: &str = "_diff.tif";
pub const ZONAL_SUFFIX: &str = "_zonal_stats.csv";
pub const PLOT_SUFFIX: &str = "_diff.png";
pub const COMPARISON_FIGURE: &str = "difference_panels.png";

/// Artifacts of one fully processed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedItem {
    pub input: PathBuf,
    pub clipped: PathBuf,
    pub difference: PathBuf,
    pub zonal_table: PathBuf,
    pub plot: Option<PathBuf>,
}

/// An input that was skipped or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIssue {
    pub input: PathBuf,
    pub stage: Stage,
    /// Error category; `None` for deliberate skips.
    pub kind: Option<ErrorKind>,
    pub reason: String,
}

/// Result of one batch run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub discovered: usize,
    pub processed: Vec<ProcessedItem>,
    pub skipped: Vec<ItemIssue>,
    pub failed: Vec<ItemIssue>,
    pub figure: Option<PathBuf>,
}

impl RunSummary {
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            discovered: self.discovered,
            processed: self.processed.len(),
            skipped: self.skipped.len(),
            failed: self.failed.len(),
        }
    }

    /// True when no input made it through the pipeline.
    pub fn is_suspicious(&self) -> bool {
        self.counts().is_suspicious()
    }
}

/// An input accepted by discovery.
#[derive(Debug, Clone)]
struct Item {
    input: PathBuf,
    /// Canonical input path, the manifest key.
    identity: PathBuf,
    /// Full file stem; artifact names derive from it.
    stem: String,
}

/// A configured batch: reference grid, polygons and prepared baseline.
pub struct BatchPipeline {
    config: BatchConfig,
    alignment: AlignmentConfig,
    layer: PolygonLayer,
    mask: PolygonMask,
    /// Baseline aligned to the reference grid and clipped like the inputs.
    baseline: Raster,
    baseline_identity: PathBuf,
}

impl BatchPipeline {
    /// Validate the configuration and load the shared inputs.
    ///
    /// Every configuration-level error (missing paths, unreadable reference
    /// grid, baseline or polygon layer, missing zone field) surfaces here,
    /// before any item is touched.
    pub fn new(config: BatchConfig) -> Result<Self> {
        config.validate()?;

        let reference = read_grid(&config.reference_path)?;
        info!(
            file = %config.reference_path.display(),
            grid = %reference.describe(),
            "Loaded reference grid"
        );

        let mut layer = PolygonLayer::from_path(&config.polygon_path)?;
        if let Some(crs) = config.polygon_crs()? {
            layer = layer.with_crs(crs);
        }
        if layer.is_empty() {
            return Err(BatchError::config(format!(
                "polygon layer {} has no features",
                config.polygon_path.display()
            )));
        }
        layer.require_field(&config.zone_field)?;
        info!(
            file = %config.polygon_path.display(),
            features = layer.len(),
            crs = %layer.crs,
            zone_field = %config.zone_field,
            "Loaded polygon layer"
        );

        let alignment = config.alignment(reference);
        let mask = layer.mask();

        let raw_baseline = read_raster(&config.baseline_path)?;
        let baseline = clip(&align(&raw_baseline, &alignment)?, &mask, config.clip_mode)?;
        if baseline.is_all_nodata() {
            warn!(
                file = %config.baseline_path.display(),
                "Baseline has no valid pixels inside the clip area"
            );
        }

        let baseline_identity = std::fs::canonicalize(&config.baseline_path)
            .map_err(|e| BatchError::io(&config.baseline_path, e))?;

        Ok(Self {
            config,
            alignment,
            layer,
            mask,
            baseline,
            baseline_identity,
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Run every stage over the input directory.
    ///
    /// Item failures are logged and counted. Only an unreadable input
    /// directory or run log and manifest I/O errors abort the run; the run
    /// log block is closed either way.
    pub fn run(&self) -> Result<RunSummary> {
        let output_dir = &self.config.output_dir;
        std::fs::create_dir_all(output_dir).map_err(|e| BatchError::io(output_dir, e))?;

        let mut log = RunLog::open(output_dir)?;
        log.begin(&self.config, Utc::now())?;

        let mut summary = RunSummary::default();
        match self.run_stages(&mut log, &mut summary) {
            Ok(()) => {
                log.finish(&summary.counts(), Utc::now())?;
                Ok(summary)
            }
            Err(err) => {
                if let Err(log_err) = log.abort(&err, &summary.counts(), Utc::now()) {
                    warn!(error = %log_err, "Could not close the run log block");
                }
                Err(err)
            }
        }
    }

    fn run_stages(&self, log: &mut RunLog, summary: &mut RunSummary) -> Result<()> {
        let output_dir = &self.config.output_dir;
        let mut manifest = ArtifactManifest::load(output_dir)?;
        let exclusions = Exclusions::new(
            &self.config.input_dir,
            output_dir,
            manifest.artifact_paths(output_dir),
        );

        let mut produced: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();

        let found = discover(&self.config, &exclusions)?;
        summary.discovered = found.len();
        for (input, err) in &found.failures {
            self.fail(log, summary, Stage::Discover, input, err)?;
        }
        let items = self.select_items(found.candidates, log, summary)?;

        // CLIP
        let mut clipped = Vec::with_capacity(items.len());
        for item in items {
            let result = self.clip_item(&item);
            if let Some(path) = self.settle(log, summary, Stage::Clip, &item, result)? {
                note_artifact(&mut produced, &item, &path);
                clipped.push((item, path));
            }
        }

        // DIFFERENCE
        let mut differenced = Vec::with_capacity(clipped.len());
        for (item, clp) in clipped {
            let result = self.difference_item(&item, &clp);
            if let Some(path) = self.settle(log, summary, Stage::Difference, &item, result)? {
                note_artifact(&mut produced, &item, &path);
                differenced.push((item, clp, path));
            }
        }

        // AGGREGATE + EXPORT
        for (item, clp, diff) in differenced {
            let result = self.aggregate_item(&item, &diff);
            if let Some(table) = self.settle(log, summary, Stage::Aggregate, &item, result)? {
                note_artifact(&mut produced, &item, &table);
                summary.processed.push(ProcessedItem {
                    input: item.input.clone(),
                    clipped: clp,
                    difference: diff,
                    zonal_table: table,
                    plot: None,
                });
            }
        }

        // VISUALIZE
        if self.config.visualize {
            self.visualize(log, summary, &mut produced)?;
        }

        for (identity, names) in produced {
            manifest.record(&identity, names);
        }
        if let Some(figure) = &summary.figure {
            manifest.record_shared(artifact_name(figure));
        }
        manifest.save(output_dir)?;
        Ok(())
    }

    /// Drop the baseline and name collisions from the discovered inputs.
    fn select_items(
        &self,
        candidates: Vec<PathBuf>,
        log: &mut RunLog,
        summary: &mut RunSummary,
    ) -> Result<Vec<Item>> {
        let mut items = Vec::with_capacity(candidates.len());
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();

        for input in candidates {
            let identity = match std::fs::canonicalize(&input) {
                Ok(path) => path,
                Err(e) => {
                    let err = BatchError::io(&input, e);
                    self.fail(log, summary, Stage::Discover, &input, &err)?;
                    continue;
                }
            };

            if identity == self.baseline_identity {
                self.skip(log, summary, Stage::Discover, &input, "input is the baseline raster")?;
                continue;
            }

            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();

            if let Some(owner) = claimed.get(&stem) {
                let reason = format!(
                    "artifact names collide with {}",
                    owner.file_name().unwrap_or_default().to_string_lossy()
                );
                self.skip(log, summary, Stage::Discover, &input, &reason)?;
                continue;
            }
            claimed.insert(stem.clone(), input.clone());

            items.push(Item {
                input,
                identity,
                stem,
            });
        }

        Ok(items)
    }

    fn clip_item(&self, item: &Item) -> Result<PathBuf> {
        let raster = read_raster(&item.input)?;
        let aligned = align(&raster, &self.alignment)?;
        let clipped = clip(&aligned, &self.mask, self.config.clip_mode)?;

        if clipped.is_all_nodata() {
            info!(
                file = %item.input.display(),
                "No valid pixels inside the clip area, writing an all-nodata raster"
            );
        }

        let out = self.artifact_path(&item.stem, CLIPPED_SUFFIX);
        write_raster(&out, &clipped)?;
        Ok(out)
    }

    fn difference_item(&self, item: &Item, clipped: &Path) -> Result<PathBuf> {
        let subject = read_raster(clipped)?;
        let diff = difference(&subject, &self.baseline, self.config.default_nodata)?;

        let out = self.artifact_path(&item.stem, DIFFERENCE_SUFFIX);
        write_raster(&out, &diff)?;
        Ok(out)
    }

    fn aggregate_item(&self, item: &Item, diff: &Path) -> Result<PathBuf> {
        let raster = read_raster(diff)?;
        let table = aggregate(&raster, &self.layer, &self.config.zone_field)?;

        debug!(
            file = %item.input.display(),
            zones = table.len(),
            pixels = table.total_count(),
            "Computed zonal statistics"
        );

        let out = self.artifact_path(&item.stem, ZONAL_SUFFIX);
        write_zonal_csv(&out, &table)?;
        Ok(out)
    }

    fn visualize(
        &self,
        log: &mut RunLog,
        summary: &mut RunSummary,
        produced: &mut BTreeMap<PathBuf, Vec<String>>,
    ) -> Result<()> {
        let options = FigureOptions {
            max_panels: self.config.max_panels,
            ..FigureOptions::default()
        };

        if self.config.individual_plots {
            for index in 0..summary.processed.len() {
                let item = summary.processed[index].clone();
                let result = self.plot_item(&item, &options);
                match result {
                    Ok(path) => {
                        log.record(Stage::Visualize, Outcome::Ok, &item.input, &artifact_name(&path))?;
                        if let Ok(identity) = std::fs::canonicalize(&item.input) {
                            produced.entry(identity).or_default().push(artifact_name(&path));
                        }
                        summary.processed[index].plot = Some(path);
                    }
                    Err(err) => self.fail(log, summary, Stage::Visualize, &item.input, &err)?,
                }
            }
        }

        let figure_path = self.config.output_dir.join(COMPARISON_FIGURE);
        if summary.processed.is_empty() {
            self.skip(log, summary, Stage::Visualize, &figure_path, "no difference rasters to plot")?;
            return Ok(());
        }

        let panels: Vec<PathBuf> = summary
            .processed
            .iter()
            .take(self.config.max_panels)
            .map(|item| item.difference.clone())
            .collect();

        match self.plot_comparison(&panels, &figure_path, &options) {
            Ok(()) => {
                let names: Vec<String> = panels.iter().map(|p| artifact_name(p)).collect();
                log.record(Stage::Visualize, Outcome::Ok, &figure_path, &names.join(", "))?;
                summary.figure = Some(figure_path);
            }
            Err(err) => self.fail(log, summary, Stage::Visualize, &figure_path, &err)?,
        }
        Ok(())
    }

    fn plot_item(&self, item: &ProcessedItem, options: &FigureOptions) -> Result<PathBuf> {
        let diff = read_raster(&item.difference)?;
        let title = artifact_name(&item.difference);
        let png = encode_image(&render_single(Panel::new(&title, &diff), options)?)?;

        let stem = item
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let out = self.artifact_path(&stem, PLOT_SUFFIX);
        write_atomic(&out, &png)?;
        Ok(out)
    }

    fn plot_comparison(&self, panels: &[PathBuf], out: &Path, options: &FigureOptions) -> Result<()> {
        let rasters = panels
            .iter()
            .map(read_raster)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let titles: Vec<String> = panels.iter().map(|p| artifact_name(p)).collect();
        let figure: Vec<Panel> = titles
            .iter()
            .zip(&rasters)
            .map(|(title, raster)| Panel::new(title, raster))
            .collect();

        let png = encode_image(&render_comparison(&figure, options)?)?;
        write_atomic(out, &png)
    }

    fn artifact_path(&self, stem: &str, suffix: &str) -> PathBuf {
        self.config.output_dir.join(format!("{}{}", stem, suffix))
    }

    /// Log a stage result; `Some` on success.
    fn settle(
        &self,
        log: &mut RunLog,
        summary: &mut RunSummary,
        stage: Stage,
        item: &Item,
        result: Result<PathBuf>,
    ) -> Result<Option<PathBuf>> {
        match result {
            Ok(path) => {
                log.record(stage, Outcome::Ok, &item.input, &artifact_name(&path))?;
                Ok(Some(path))
            }
            Err(err) => {
                self.fail(log, summary, stage, &item.input, &err)?;
                Ok(None)
            }
        }
    }

    fn skip(
        &self,
        log: &mut RunLog,
        summary: &mut RunSummary,
        stage: Stage,
        input: &Path,
        reason: &str,
    ) -> Result<()> {
        log.record(stage, Outcome::Skip, input, reason)?;
        summary.skipped.push(ItemIssue {
            input: input.to_path_buf(),
            stage,
            kind: None,
            reason: reason.to_string(),
        });
        Ok(())
    }

    fn fail(
        &self,
        log: &mut RunLog,
        summary: &mut RunSummary,
        stage: Stage,
        input: &Path,
        err: &BatchError,
    ) -> Result<()> {
        let kind = err.kind();
        let reason = err.to_string();
        log.record(stage, Outcome::Fail, input, &format!("{}: {}", kind, reason))?;
        summary.failed.push(ItemIssue {
            input: input.to_path_buf(),
            stage,
            kind: Some(kind),
            reason,
        });
        Ok(())
    }
}

fn note_artifact(produced: &mut BTreeMap<PathBuf, Vec<String>>, item: &Item, path: &Path) {
    produced
        .entry(item.identity.clone())
        .or_default()
        .push(artifact_name(path));
}

fn artifact_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
