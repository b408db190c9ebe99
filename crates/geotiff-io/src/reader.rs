//! GeoTIFF decoding into [`Raster`].

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use dem_common::{GridSpec, Raster};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::debug;

use crate::geokeys::{GeoKeys, RasterType};
use crate::{GeoTiffError, Result};

/// Buffer limit for decoding; a 1 arc-second 1°x1° tile is ~52 MB as f32.
const DECODE_LIMIT_BYTES: usize = 1024 * 1024 * 1024;

/// Load a single-band GeoTIFF.
pub fn read_raster<P: AsRef<Path>>(path: P) -> Result<Raster> {
    let path = path.as_ref();
    let mut decoder = open_decoder(path)?;

    let grid = read_georeferencing(&mut decoder)?;
    let nodata = read_nodata_value(&mut decoder);
    let data = decode_elevation_data(&mut decoder)?;

    debug!(
        file = %path.display(),
        grid = %grid.describe(),
        nodata = ?nodata,
        "Decoded GeoTIFF"
    );

    Ok(Raster::new(grid, data, nodata)?)
}

/// Read only the grid of a GeoTIFF without decoding pixel data.
///
/// Used for the snap raster, whose values are never needed.
pub fn read_grid<P: AsRef<Path>>(path: P) -> Result<GridSpec> {
    let mut decoder = open_decoder(path.as_ref())?;
    read_georeferencing(&mut decoder)
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path).map_err(|e| GeoTiffError::io(path, e))?;

    let mut limits = Limits::default();
    limits.decoding_buffer_size = DECODE_LIMIT_BYTES;
    limits.intermediate_buffer_size = DECODE_LIMIT_BYTES;
    limits.ifd_value_size = DECODE_LIMIT_BYTES;

    let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(limits);

    match decoder.colortype()? {
        ColorType::Gray(_) => Ok(decoder),
        other => Err(GeoTiffError::Unsupported(format!(
            "{}: expected a single-band grid, found {:?}",
            path.display(),
            other
        ))),
    }
}

/// Build the grid from tiepoint/scale or transformation tags plus GeoKeys.
fn read_georeferencing<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GridSpec> {
    let (width, height) = decoder.dimensions()?;

    let keys = decoder
        .get_tag_u16_vec(Tag::GeoKeyDirectoryTag)
        .map(|dir| GeoKeys::parse(&dir))
        .unwrap_or(GeoKeys {
            crs: dem_common::Crs::Undefined,
            raster_type: RasterType::PixelIsArea,
        });

    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok();
    let pixel_scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok();
    let transformation = decoder.get_tag_f64_vec(Tag::ModelTransformationTag).ok();

    let (origin_x, origin_y, pixel_width, pixel_height) = match (tiepoint, pixel_scale, transformation) {
        (Some(tie), Some(scale), _) if tie.len() >= 6 && scale.len() >= 2 => {
            // Tiepoint format: [i, j, k, x, y, z] ties raster (i, j) to model (x, y)
            let (sx, sy) = (scale[0], scale[1]);
            if sx <= 0.0 || sy <= 0.0 {
                return Err(GeoTiffError::Unsupported(format!(
                    "non north-up pixel scale ({}, {})",
                    sx, sy
                )));
            }
            (tie[3] - tie[0] * sx, tie[4] + tie[1] * sy, sx, sy)
        }
        (_, _, Some(m)) if m.len() >= 16 => {
            // Row-major 4x4: x = m0*col + m1*row + m3, y = m4*col + m5*row + m7
            if m[1] != 0.0 || m[4] != 0.0 {
                return Err(GeoTiffError::Unsupported(
                    "rotated or sheared grids".to_string(),
                ));
            }
            if m[0] <= 0.0 || m[5] >= 0.0 {
                return Err(GeoTiffError::Unsupported(format!(
                    "non north-up transformation ({}, {})",
                    m[0], m[5]
                )));
            }
            (m[3], m[7], m[0], -m[5])
        }
        _ => {
            return Err(GeoTiffError::InvalidGeoTiff(
                "missing ModelTiepoint/ModelPixelScale or ModelTransformation".to_string(),
            ))
        }
    };

    // PixelIsPoint ties the model coordinate to the pixel center
    let (origin_x, origin_y) = match keys.raster_type {
        RasterType::PixelIsArea => (origin_x, origin_y),
        RasterType::PixelIsPoint => (origin_x - pixel_width / 2.0, origin_y + pixel_height / 2.0),
    };

    Ok(GridSpec::new(
        width as usize,
        height as usize,
        origin_x,
        origin_y,
        pixel_width,
        pixel_height,
        keys.crs,
    ))
}

/// Decode elevation data from the TIFF decoder.
fn decode_elevation_data<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
    let result = decoder.read_image()?;

    match result {
        DecodingResult::F32(data) => Ok(data),
        DecodingResult::F64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::U64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        DecodingResult::I64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
    }
}

/// Read the no-data value from the GDAL_NODATA tag, if present.
fn read_nodata_value<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    let raw = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    parse_nodata(&raw)
}

fn parse_nodata(raw: &str) -> Option<f32> {
    let trimmed = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    // Parse as f64 first so GDAL's "-3.4028234663852886e+38" lands on f32::MIN
    trimmed.parse::<f64>().ok().map(|v| v as f32)
}
