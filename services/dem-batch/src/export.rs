//! Zonal statistics tables and atomic artifact writes.

use std::io::Write;
use std::path::Path;

use grid_processor::ZonalTable;
use tempfile::NamedTempFile;

use crate::error::{BatchError, Result};

/// Written in place of every statistic of a zone without valid pixels.
pub const NO_DATA: &str = "NoData";

/// Statistic columns following the zone column.
pub const STAT_COLUMNS: [&str; 9] = [
    "COUNT", "AREA", "MIN", "MAX", "RANGE", "MEAN", "STD", "SUM", "MEDIAN",
];

/// Serialize a zonal table as CSV.
///
/// The first column is named after the zone field. Rows keep the table
/// order, so equal tables always serialize to equal bytes.
pub fn zonal_csv(table: &ZonalTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec![table.zone_field.as_str()];
    header.extend(STAT_COLUMNS);
    writer.write_record(&header)?;

    for row in &table.rows {
        let mut record = vec![row.zone.to_string(), row.count.to_string()];
        match &row.statistics {
            Some(s) => record.extend(
                [s.area, s.min, s.max, s.range, s.mean, s.std, s.sum, s.median]
                    .iter()
                    .map(|v| v.to_string()),
            ),
            None => record.extend(std::iter::repeat(NO_DATA.to_string()).take(8)),
        }
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| BatchError::Csv(csv::Error::from(e.into_error())))
}

/// Write a zonal table to `path` atomically.
pub fn write_zonal_csv(path: &Path, table: &ZonalTable) -> Result<()> {
    write_atomic(path, &zonal_csv(table)?)
}

/// Write `bytes` to a temp file next to `path`, then rename over it.
///
/// A failure leaves no partial file behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| BatchError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| BatchError::io(path, e))?;
    tmp.as_file().sync_all().map_err(|e| BatchError::io(path, e))?;
    tmp.persist(path).map_err(|e| BatchError::io(path, e.error))?;
    Ok(())
}
