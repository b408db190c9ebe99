//! Batch configuration.
//!
//! Loaded from a YAML file with `${VAR}` / `${VAR:-default}` substitution,
//! then overlaid with `DEM_DIFF_*` environment variables and finally with
//! command-line flags.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use dem_common::{Crs, GridSpec, DEFAULT_NODATA};
use grid_processor::{AlignmentConfig, ClipMode, ResamplingMethod};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{BatchError, Result};

/// Everything a batch run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Directory scanned (non-recursively) for input rasters.
    pub input_dir: PathBuf,
    /// GeoJSON polygon layer used for clipping and zonal statistics.
    pub polygon_path: PathBuf,
    /// Property holding the zone identifier.
    pub zone_field: String,
    /// Raster whose grid every input is snapped to.
    pub reference_path: PathBuf,
    /// Raster subtracted from every input.
    pub baseline_path: PathBuf,
    pub output_dir: PathBuf,
    /// Write the comparison figure.
    pub visualize: bool,
    /// Accepted file extensions, matched case-insensitively.
    pub extensions: Vec<String>,
    pub clip_mode: ClipMode,
    pub resampling: ResamplingMethod,
    /// Nodata written where an input declares none.
    pub default_nodata: f32,
    /// Difference rasters shown in the comparison figure.
    pub max_panels: usize,
    /// Also write one figure per difference raster.
    pub individual_plots: bool,
    /// Overrides the CRS declared by the polygon layer.
    pub polygon_crs: Option<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::new(),
            polygon_path: PathBuf::new(),
            zone_field: String::new(),
            reference_path: PathBuf::new(),
            baseline_path: PathBuf::new(),
            output_dir: PathBuf::new(),
            visualize: true,
            extensions: vec!["tif".to_string(), "tiff".to_string()],
            clip_mode: ClipMode::Inside,
            resampling: ResamplingMethod::Nearest,
            default_nodata: DEFAULT_NODATA,
            max_panels: 3,
            individual_plots: false,
            polygon_crs: None,
        }
    }
}

impl BatchConfig {
    /// Load a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| BatchError::io(path, e))?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML after environment variable substitution.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        serde_yaml::from_str(&expanded)
            .map_err(|e| BatchError::config(format!("invalid configuration YAML: {}", e)))
    }

    /// Overlay `DEM_DIFF_*` variables from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay `DEM_DIFF_*` variables resolved by `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("DEM_DIFF_INPUT_DIR") {
            self.input_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("DEM_DIFF_POLYGON_PATH") {
            self.polygon_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("DEM_DIFF_ZONE_FIELD") {
            self.zone_field = val;
        }
        if let Some(val) = lookup("DEM_DIFF_REFERENCE_PATH") {
            self.reference_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("DEM_DIFF_BASELINE_PATH") {
            self.baseline_path = PathBuf::from(val);
        }
        if let Some(val) = lookup("DEM_DIFF_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("DEM_DIFF_VISUALIZE") {
            self.visualize = parse_flag(&val);
        }
        if let Some(val) = lookup("DEM_DIFF_INDIVIDUAL_PLOTS") {
            self.individual_plots = parse_flag(&val);
        }
        if let Some(val) = lookup("DEM_DIFF_EXTENSIONS") {
            self.extensions = val
                .split(',')
                .map(|ext| ext.trim().trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .collect();
        }
        if let Some(val) = lookup("DEM_DIFF_CLIP_MODE") {
            match ClipMode::from_str(&val) {
                Ok(mode) => self.clip_mode = mode,
                Err(e) => warn!(error = %e, "Ignoring DEM_DIFF_CLIP_MODE"),
            }
        }
        if let Some(val) = lookup("DEM_DIFF_RESAMPLING") {
            match ResamplingMethod::from_str(&val) {
                Ok(method) => self.resampling = method,
                Err(e) => warn!(error = %e, "Ignoring DEM_DIFF_RESAMPLING"),
            }
        }
        if let Some(val) = lookup("DEM_DIFF_DEFAULT_NODATA") {
            match val.trim().parse() {
                Ok(nodata) => self.default_nodata = nodata,
                Err(_) => warn!(value = %val, "Ignoring DEM_DIFF_DEFAULT_NODATA"),
            }
        }
        if let Some(val) = lookup("DEM_DIFF_MAX_PANELS") {
            match val.trim().parse() {
                Ok(panels) => self.max_panels = panels,
                Err(_) => warn!(value = %val, "Ignoring DEM_DIFF_MAX_PANELS"),
            }
        }
        if let Some(val) = lookup("DEM_DIFF_POLYGON_CRS") {
            self.polygon_crs = Some(val);
        }
    }

    /// Check the configuration before any item is processed.
    pub fn validate(&self) -> Result<()> {
        if self.zone_field.trim().is_empty() {
            return Err(BatchError::config("zone_field must be set"));
        }
        if !self.input_dir.is_dir() {
            return Err(BatchError::config(format!(
                "input_dir {} is not a directory",
                self.input_dir.display()
            )));
        }
        for (name, path) in [
            ("polygon_path", &self.polygon_path),
            ("reference_path", &self.reference_path),
            ("baseline_path", &self.baseline_path),
        ] {
            if !path.is_file() {
                return Err(BatchError::config(format!(
                    "{} {} is not a readable file",
                    name,
                    path.display()
                )));
            }
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(BatchError::config("output_dir must be set"));
        }
        if self.extensions.is_empty() {
            return Err(BatchError::config("at least one raster extension is required"));
        }
        if self.max_panels == 0 {
            return Err(BatchError::config("max_panels must be at least 1"));
        }
        if !self.default_nodata.is_finite() {
            return Err(BatchError::config("default_nodata must be a finite number"));
        }
        self.polygon_crs()?;
        Ok(())
    }

    /// Parsed polygon CRS override.
    pub fn polygon_crs(&self) -> Result<Option<Crs>> {
        self.polygon_crs
            .as_deref()
            .map(|s| Crs::parse(s).map_err(|e| BatchError::config(e.to_string())))
            .transpose()
    }

    /// Alignment settings for a reference grid.
    pub fn alignment(&self, reference: GridSpec) -> AlignmentConfig {
        AlignmentConfig::new(reference)
            .with_resampling(self.resampling)
            .with_default_nodata(self.default_nodata)
    }

    /// Extension filter, case-insensitive and without a leading dot.
    pub fn accepts_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

fn parse_flag(val: &str) -> bool {
    matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Expand environment variables in YAML content.
///
/// Supports `${VAR}` and `${VAR:-default}` syntax.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => {
                        return Err(BatchError::config(format!(
                            "unclosed variable substitution: ${{{}",
                            var_expr
                        )))
                    }
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .map_err(|_| BatchError::config(format!("environment variable {} not set", expr)))
    }
}
