//! GeoTIFF encoding from [`Raster`].

use std::io::{Cursor, Write};
use std::path::Path;

use dem_common::Raster;
use tempfile::NamedTempFile;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tracing::debug;

use crate::geokeys::GeoKeys;
use crate::{GeoTiffError, Result};

/// Encode a raster as a Float32 GeoTIFF held in memory.
pub fn encode_raster(raster: &Raster) -> Result<Vec<u8>> {
    let grid = &raster.grid;
    let mut buffer = Cursor::new(Vec::new());

    {
        let mut encoder = TiffEncoder::new(&mut buffer)?;
        let mut image =
            encoder.new_image::<colortype::Gray32Float>(grid.width as u32, grid.height as u32)?;

        let pixel_scale = [grid.pixel_width, grid.pixel_height, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, grid.origin_x, grid.origin_y, 0.0];
        let geokeys = GeoKeys::encode(grid.crs);

        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &pixel_scale[..])?;
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
        image
            .encoder()
            .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;

        if let Some(nodata) = raster.nodata {
            let text = format_nodata(nodata);
            image.encoder().write_tag(Tag::GdalNodata, text.as_str())?;
        }

        image.write_data(&raster.data)?;
    }

    Ok(buffer.into_inner())
}

/// Write a raster to `path` atomically.
///
/// The file is staged next to its destination and renamed into place only
/// after encoding succeeded, so a failure never leaves a partial artifact.
pub fn write_raster<P: AsRef<Path>>(path: P, raster: &Raster) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_raster(raster)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir).map_err(|e| GeoTiffError::io(dir, e))?;
    staged
        .write_all(&bytes)
        .and_then(|_| staged.flush())
        .map_err(|e| GeoTiffError::io(staged.path(), e))?;
    staged
        .persist(path)
        .map_err(|e| GeoTiffError::io(path, e.error))?;

    debug!(
        file = %path.display(),
        bytes = bytes.len(),
        grid = %raster.grid.describe(),
        "Wrote GeoTIFF"
    );

    Ok(())
}

/// GDAL writes nodata with full round-trip precision.
fn format_nodata(nodata: f32) -> String {
    if nodata.is_nan() {
        "nan".to_string()
    } else if nodata.fract() == 0.0 && nodata.abs() < 1e15 {
        format!("{}", nodata as i64)
    } else {
        format!("{:e}", nodata as f64)
    }
}
