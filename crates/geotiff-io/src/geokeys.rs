//! GeoKey directory encoding and decoding.
//!
//! The directory is a flat `u16` array: a 4-value header
//! `[version, revision, minor, key_count]` followed by `key_count` entries of
//! `[key_id, tag_location, count, value]`. Only inline SHORT values
//! (`tag_location == 0`) are interpreted here.

use dem_common::Crs;

const KEY_DIRECTORY_VERSION: u16 = 1;
const KEY_REVISION: u16 = 1;
const MINOR_REVISION: u16 = 0;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

/// Code GeoTIFF uses for "user-defined" CRS parameters.
const USER_DEFINED: u16 = 32767;

/// How a tiepoint relates to the pixel it is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterType {
    /// Tiepoint marks the pixel's upper-left corner.
    #[default]
    PixelIsArea,
    /// Tiepoint marks the pixel center.
    PixelIsPoint,
}

/// The GeoKeys this codec understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeys {
    pub crs: Crs,
    pub raster_type: RasterType,
}

impl GeoKeys {
    /// Decode a GeoKey directory, ignoring keys that are not inline SHORTs.
    pub fn parse(directory: &[u16]) -> Self {
        let mut model_type = None;
        let mut raster_type = RasterType::PixelIsArea;
        let mut geographic = None;
        let mut projected = None;

        if directory.len() >= 4 {
            let key_count = directory[3] as usize;
            for entry in directory[4..].chunks_exact(4).take(key_count) {
                let (key, location, value) = (entry[0], entry[1], entry[3]);
                if location != 0 {
                    continue;
                }
                match key {
                    GT_MODEL_TYPE => model_type = Some(value),
                    GT_RASTER_TYPE if value == 2 => raster_type = RasterType::PixelIsPoint,
                    GEOGRAPHIC_TYPE => geographic = Some(value),
                    PROJECTED_CS_TYPE => projected = Some(value),
                    _ => {}
                }
            }
        }

        let usable = |code: Option<u16>| code.filter(|c| *c != 0 && *c != USER_DEFINED);

        let crs = match (model_type, usable(projected), usable(geographic)) {
            (Some(MODEL_TYPE_GEOGRAPHIC), _, Some(code)) => Crs::Epsg(code as u32),
            (_, Some(code), _) => Crs::Epsg(code as u32),
            (_, None, Some(code)) => Crs::Epsg(code as u32),
            _ => Crs::Undefined,
        };

        Self { crs, raster_type }
    }

    /// Encode a directory for a PixelIsArea raster in `crs`.
    ///
    /// EPSG codes that do not fit a SHORT are written as user-defined.
    pub fn encode(crs: Crs) -> Vec<u16> {
        let mut keys: Vec<[u16; 4]> = vec![[GT_RASTER_TYPE, 0, 1, 1]];

        if let Some(code) = crs.epsg() {
            let short = u16::try_from(code).unwrap_or(USER_DEFINED);
            if crs.is_geographic() {
                keys.insert(0, [GT_MODEL_TYPE, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
                keys.push([GEOGRAPHIC_TYPE, 0, 1, short]);
            } else {
                keys.insert(0, [GT_MODEL_TYPE, 0, 1, MODEL_TYPE_PROJECTED]);
                keys.push([PROJECTED_CS_TYPE, 0, 1, short]);
            }
        }

        let mut directory = vec![
            KEY_DIRECTORY_VERSION,
            KEY_REVISION,
            MINOR_REVISION,
            keys.len() as u16,
        ];
        directory.extend(keys.iter().flatten());
        directory
    }
}
