use anyhow::{Context, Result};
use nom_exif::*;
use std::path::Path;

// Tags nom-exif has no names for
const TAG_IMAGE_ID: u16 = 0x800D;
const TAG_IMAGE_UNIQUE_ID: u16 = 0xA420;

/// EXIF data read back from a derived image.
#[derive(Debug, Clone, Default)]
pub struct ExifData {
    pub has_gps: bool,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    /// Meters; negative below sea level.
    pub gps_altitude: Option<f64>,
    pub date_time_original: Option<String>,
    pub image_id: Option<String>,
    pub image_unique_id: Option<String>,
}

/// Read EXIF data from an image file.
pub fn read_exif(path: &Path) -> Result<ExifData> {
    let mut parser = MediaParser::new();
    let ms = MediaSource::file_path(path).context("Failed to open image file")?;

    let iter: ExifIter = match parser.parse(ms) {
        Ok(iter) => iter,
        Err(_) => {
            log::debug!("No EXIF data found in {}", path.display());
            return Ok(ExifData::default());
        }
    };

    // Parse GPS info before converting to Exif (consumes the iterator)
    let gps_info = iter.parse_gps_info().ok().flatten();
    let exif: Exif = iter.into();

    let mut data = ExifData::default();

    if let Some(val) = exif.get(ExifTag::DateTimeOriginal) {
        data.date_time_original = entry_to_string(val);
    }

    if let Some(val) = exif.get_by_ifd_tag_code(0, TAG_IMAGE_ID) {
        data.image_id = entry_to_string(val);
    }

    if let Some(val) = exif.get_by_ifd_tag_code(0, TAG_IMAGE_UNIQUE_ID) {
        data.image_unique_id = entry_to_string(val);
    }

    // GPS via nom-exif's built-in parser
    if let Some(gps) = gps_info {
        data.has_gps = true;
        data.gps_latitude = Some(latlng_to_decimal(&gps.latitude, gps.latitude_ref));
        data.gps_longitude = Some(latlng_to_decimal(&gps.longitude, gps.longitude_ref));
        if gps.altitude.1 != 0 {
            let meters = gps.altitude.0 as f64 / gps.altitude.1 as f64;
            data.gps_altitude = Some(if gps.altitude_ref == 1 { -meters } else { meters });
        }
    }

    Ok(data)
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = val.to_string();
    let s = s.trim().trim_matches('"').to_string();
    if s.is_empty() { None } else { Some(s) }
}

/// Convert a nom-exif LatLng (3 URationals: deg, min, sec) to decimal degrees.
fn latlng_to_decimal(latlng: &LatLng, reference: char) -> f64 {
    let degrees = latlng.0.0 as f64 / latlng.0.1 as f64;
    let minutes = latlng.1.0 as f64 / latlng.1.1 as f64;
    let seconds = latlng.2.0 as f64 / latlng.2.1 as f64;

    let mut coord = degrees + minutes / 60.0 + seconds / 3600.0;

    if reference == 'S' || reference == 'W' {
        coord = -coord;
    }

    coord
}
