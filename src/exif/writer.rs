use img_parts::Bytes;
use img_parts::ImageEXIF;
use img_parts::jpeg::Jpeg;
use little_exif::endian::Endian;
use little_exif::exif_tag::{ExifTag, ExifTagGroup};
use little_exif::exif_tag_format::ExifTagFormat;
use little_exif::filetype::FileExtension;
use little_exif::metadata::Metadata;
use std::io::{Read, Write};
use thiserror::Error;

use super::properties::{ExifProperties, IMAGE_ID, Rational, X_LATITUDE, X_LONGITUDE};

// EXIF tag IDs for tags written from raw data
const TAG_IMAGE_ID: u16 = 0x800D;
const TAG_GPS_INFO: u16 = 0x8825;
const TAG_GPS_VERSION_ID: u16 = 0x0000;
const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
const TAG_GPS_LATITUDE: u16 = 0x0002;
const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
const TAG_GPS_LONGITUDE: u16 = 0x0004;
const TAG_GPS_ALTITUDE_REF: u16 = 0x0005;
const TAG_GPS_ALTITUDE: u16 = 0x0006;

const GPS_VERSION: [u8; 4] = [2, 2, 0, 0];

// TIFF directory layout: 2 byte count, 12 byte entries, 4 byte next-IFD link
const IFD_ENTRY_LEN: usize = 12;

// little_exif as_u8_vec(JPEG) returns: [APP1 marker 2B][length 2B][Exif\0\0 6B][TIFF data]
// img-parts set_exif() expects just the TIFF data (after Exif\0\0)
const JPEG_EXIF_OVERHEAD: usize = 10; // 2 + 2 + 6

const MARKER_APP0: u8 = 0xE0;
const MARKER_APP1: u8 = 0xE1;

/// Failure to embed EXIF tags into a JPEG stream.
#[derive(Debug, Error)]
pub enum ExifWriteError {
    #[error("failed to read JPEG stream")]
    Read(#[source] std::io::Error),
    #[error("failed to write JPEG stream")]
    Write(#[source] std::io::Error),
    #[error("malformed JPEG: {0}")]
    MalformedJpeg(String),
    #[error("unsupported value for {tag}: {value}")]
    UnsupportedValue { tag: &'static str, value: String },
    #[error("failed to build {tag} tag: {reason}")]
    Tag { tag: &'static str, reason: String },
    #[error("EXIF encoder produced no data")]
    EmptyExif,
}

/// Copy the JPEG read from `input` to `output` with the given tags embedded.
///
/// Strategy:
/// 1. Read the entire JPEG with img-parts (keeps every other segment as is)
/// 2. Build a fresh EXIF block with little_exif from the property set
/// 2b. Append the GPS directory little_exif cannot write and link it from IFD0
/// 3. Install it as the APP1 EXIF segment, directly after APP0
/// 4. Re-emit the segments to `output`
///
/// Any EXIF already present in the input is replaced.
pub fn embed_exif<R: Read, W: Write>(
    mut input: R,
    props: &ExifProperties,
    mut output: W,
) -> Result<(), ExifWriteError> {
    let mut buf = Vec::new();
    input.read_to_end(&mut buf).map_err(ExifWriteError::Read)?;

    let mut jpeg = Jpeg::from_bytes(Bytes::from(buf))
        .map_err(|e| ExifWriteError::MalformedJpeg(e.to_string()))?;

    let gps = gps_entries(props)?;

    let mut metadata = Metadata::new();
    for tag in build_tags(props)? {
        metadata.set_tag(tag);
    }

    let exif_bytes = metadata.as_u8_vec(FileExtension::JPEG);
    if exif_bytes.len() <= JPEG_EXIF_OVERHEAD {
        return Err(ExifWriteError::EmptyExif);
    }
    let mut tiff_data = exif_bytes[JPEG_EXIF_OVERHEAD..].to_vec();
    append_gps_ifd(&mut tiff_data, &gps)?;

    jpeg.set_exif(Some(Bytes::from(tiff_data)));

    // set_exif() inserts at a fixed index; EXIF must come right after JFIF.
    if let Some(pos) = find_exif_segment_pos(&jpeg) {
        let target = match jpeg.segments().first() {
            Some(s) if s.marker() == MARKER_APP0 => 1,
            _ => 0,
        };
        if pos != target {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(pos);
            segments.insert(target, seg);
        }
    }

    for (name, value) in props.entries() {
        log::debug!("  {name}: {value}");
    }

    let bytes = jpeg.encoder().bytes();
    output.write_all(&bytes).map_err(ExifWriteError::Write)?;
    output.flush().map_err(ExifWriteError::Write)?;

    Ok(())
}

/// Find the position of the EXIF APP1 segment in a JPEG.
/// EXIF segments have marker 0xE1 (APP1) and contents starting with "Exif\0\0".
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    const EXIF_PREFIX: &[u8] = b"Exif\0\0";
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == MARKER_APP1 && s.contents().starts_with(EXIF_PREFIX))
}

/// Translate the IFD0 and Exif properties into little_exif tags.
///
/// `GPSInfo` is a placeholder: little_exif 0.4 writes no GPS directory, so
/// [`append_gps_ifd`] fills in its offset afterwards.
fn build_tags(props: &ExifProperties) -> Result<Vec<ExifTag>, ExifWriteError> {
    Ok(vec![
        ExifTag::GPSInfo(vec![0]),
        raw_tag(
            IMAGE_ID,
            TAG_IMAGE_ID,
            &ExifTagFormat::STRING,
            nul_terminated(&props.image_id),
            &ExifTagGroup::IFD0,
        )?,
        ExifTag::DateTimeOriginal(props.date_time_original.clone()),
        ExifTag::ImageUniqueID(props.image_unique_id.clone()),
    ])
}

fn raw_tag(
    name: &'static str,
    tag_id: u16,
    format: &ExifTagFormat,
    data: Vec<u8>,
    group: &ExifTagGroup,
) -> Result<ExifTag, ExifWriteError> {
    ExifTag::from_u16_with_data(tag_id, format, &data, &Endian::Little, group).map_err(|e| {
        ExifWriteError::Tag {
            tag: name,
            reason: format!("{e:?}"),
        }
    })
}

fn nul_terminated(s: &str) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    bytes
}

/// Encode rationals as raw little-endian bytes (8 bytes each).
fn encode_rationals(values: &[Rational]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 8);
    for r in values {
        bytes.extend_from_slice(&r.numerator.to_le_bytes());
        bytes.extend_from_slice(&r.denominator.to_le_bytes());
    }
    bytes
}

/// Split absolute decimal degrees into degrees, minutes and 1/10000 seconds.
fn to_dms(value: f64) -> [Rational; 3] {
    let abs = value.abs();
    let deg = abs.floor() as u32;
    let min = ((abs - deg as f64) * 60.0).floor() as u32;
    let sec = ((abs - deg as f64 - min as f64 / 60.0) * 3600.0 * 10000.0).round() as u32;

    [
        Rational::whole(deg),
        Rational::whole(min),
        Rational {
            numerator: sec,
            denominator: 10000,
        },
    ]
}

/// A GPS directory entry with its value already encoded little-endian.
#[derive(Debug)]
struct GpsEntry {
    tag: u16,
    format: ExifTagFormat,
    count: u32,
    value: Vec<u8>,
}

impl GpsEntry {
    fn ascii(tag: u16, text: &str) -> Self {
        let value = nul_terminated(text);
        Self {
            tag,
            format: ExifTagFormat::STRING,
            count: value.len() as u32,
            value,
        }
    }

    fn bytes(tag: u16, value: &[u8]) -> Self {
        Self {
            tag,
            format: ExifTagFormat::INT8U,
            count: value.len() as u32,
            value: value.to_vec(),
        }
    }

    fn rationals(tag: u16, values: &[Rational]) -> Self {
        Self {
            tag,
            format: ExifTagFormat::RATIONAL64U,
            count: values.len() as u32,
            value: encode_rationals(values),
        }
    }
}

/// GPS directory entries in ascending tag order.
fn gps_entries(props: &ExifProperties) -> Result<Vec<GpsEntry>, ExifWriteError> {
    let (lat, lon) = (props.latitude, props.longitude);
    if !lat.is_finite() || lat.abs() > 90.0 {
        return Err(ExifWriteError::UnsupportedValue {
            tag: X_LATITUDE,
            value: lat.to_string(),
        });
    }
    if !lon.is_finite() || lon.abs() > 180.0 {
        return Err(ExifWriteError::UnsupportedValue {
            tag: X_LONGITUDE,
            value: lon.to_string(),
        });
    }
    let altitude: Rational = props.gps_altitude.parse()?;

    let lat_ref = if lat >= 0.0 { "N" } else { "S" };
    let lon_ref = if lon >= 0.0 { "E" } else { "W" };

    Ok(vec![
        GpsEntry::bytes(TAG_GPS_VERSION_ID, &GPS_VERSION),
        GpsEntry::ascii(TAG_GPS_LATITUDE_REF, lat_ref),
        GpsEntry::rationals(TAG_GPS_LATITUDE, &to_dms(lat)),
        GpsEntry::ascii(TAG_GPS_LONGITUDE_REF, lon_ref),
        GpsEntry::rationals(TAG_GPS_LONGITUDE, &to_dms(lon)),
        GpsEntry::bytes(TAG_GPS_ALTITUDE_REF, &[0]), // above sea level
        GpsEntry::rationals(TAG_GPS_ALTITUDE, &[altitude]),
    ])
}

/// Encode a directory that starts `base` bytes into the TIFF block.
fn encode_ifd(entries: &[GpsEntry], base: u32) -> Vec<u8> {
    let table_len = 2 + IFD_ENTRY_LEN * entries.len() + 4;
    let mut data_offset = base + table_len as u32;
    let mut table = Vec::with_capacity(table_len);
    let mut data = Vec::new();

    table.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        table.extend_from_slice(&entry.tag.to_le_bytes());
        table.extend_from_slice(&entry.format.as_u16().to_le_bytes());
        table.extend_from_slice(&entry.count.to_le_bytes());

        if entry.value.len() > 4 {
            table.extend_from_slice(&data_offset.to_le_bytes());
            data.extend_from_slice(&entry.value);
            // Offsets stay word aligned
            if entry.value.len() % 2 == 1 {
                data.push(0);
            }
            data_offset = base + (table_len + data.len()) as u32;
        } else {
            let mut inline = [0u8; 4];
            inline[..entry.value.len()].copy_from_slice(&entry.value);
            table.extend_from_slice(&inline);
        }
    }
    table.extend_from_slice(&[0, 0, 0, 0]); // no next IFD

    table.extend_from_slice(&data);
    table
}

/// Append the GPS directory to a little-endian TIFF block and point IFD0's
/// `GPSInfo` entry at it.
fn append_gps_ifd(tiff: &mut Vec<u8>, entries: &[GpsEntry]) -> Result<(), ExifWriteError> {
    let slot = ifd0_value_slot(tiff, TAG_GPS_INFO).ok_or_else(|| ExifWriteError::Tag {
        tag: "GPSInfo",
        reason: "pointer missing from IFD0".into(),
    })?;

    if tiff.len() % 2 == 1 {
        tiff.push(0);
    }
    let base = u32::try_from(tiff.len()).map_err(|_| ExifWriteError::Tag {
        tag: "GPSInfo",
        reason: "EXIF block too large".into(),
    })?;

    tiff[slot..slot + 4].copy_from_slice(&base.to_le_bytes());
    tiff.extend_from_slice(&encode_ifd(entries, base));
    Ok(())
}

/// Byte position of the 4 byte value field of `tag` in IFD0.
fn ifd0_value_slot(tiff: &[u8], tag: u16) -> Option<usize> {
    const LITTLE_ENDIAN_HEADER: &[u8] = b"II*\0";
    if !tiff.starts_with(LITTLE_ENDIAN_HEADER) {
        return None;
    }

    let read_u16 = |pos: usize| tiff.get(pos..pos + 2).map(|b| u16::from_le_bytes([b[0], b[1]]));
    let ifd0 = tiff
        .get(4..8)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)?;
    let count = read_u16(ifd0)? as usize;

    (0..count)
        .map(|i| ifd0 + 2 + i * IFD_ENTRY_LEN)
        .take_while(|&entry| entry + IFD_ENTRY_LEN <= tiff.len())
        .find(|&entry| read_u16(entry) == Some(tag))
        .map(|entry| entry + 8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::read_exif;
    use image::codecs::jpeg::JpegEncoder;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn small_jpeg() -> Vec<u8> {
        let img = RgbImage::from_pixel(8, 8, Rgb([120, 160, 200]));
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, 90)
            .encode_image(&img)
            .unwrap();
        buf
    }

    fn props() -> ExifProperties {
        ExifProperties {
            latitude: 34.2687,
            longitude: -118.2369,
            gps_altitude: "1528/1".into(),
            date_time_original: "2024:08:26 13:15:58".into(),
            image_id: "https://botsin.space/@CALandscapeBot/113028507763072851".into(),
            image_unique_id: "https://files.botsin.space/original/8fc23194efc42460.jpeg".into(),
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn dms_conversion() {
        let [d, m, s] = to_dms(34.2687);
        assert_eq!(d, Rational::whole(34));
        assert_eq!(m, Rational::whole(16));
        // 0.2687° = 16' 7.32"
        assert_eq!(s.numerator, 73200);
        assert_eq!(s.denominator, 10000);

        let [d, _, _] = to_dms(-118.2369);
        assert_eq!(d, Rational::whole(118));
    }

    #[test]
    fn dms_round_trips_to_decimal() {
        for value in [34.2687, -118.2369, 0.5, 89.9999] {
            let [d, m, s] = to_dms(value);
            let back = d.to_f64() + m.to_f64() / 60.0 + s.to_f64() / 3600.0;
            assert!((back - value.abs()).abs() < 1e-6, "{value} -> {back}");
        }
    }

    #[test]
    fn rational_bytes_are_little_endian() {
        let bytes = encode_rationals(&[Rational::whole(1528)]);
        assert_eq!(bytes, [0xF8, 0x05, 0, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn embeds_exif_segment_after_app0() {
        let mut out = Vec::<u8>::new();
        embed_exif(small_jpeg().as_slice(), &props(), &mut out).unwrap();

        let jpeg = Jpeg::from_bytes(Bytes::from(out.clone())).unwrap();
        assert!(find_exif_segment_pos(&jpeg).unwrap() <= 1);
        assert!(jpeg.exif().is_some());

        assert!(contains(&out, b"2024:08:26 13:15:58"));
        assert!(contains(&out, props().image_id.as_bytes()));
        assert!(contains(&out, props().image_unique_id.as_bytes()));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stamped.jpg");
        std::fs::write(&path, &out).unwrap();
        let data = read_exif(&path).unwrap();

        assert!(data.has_gps);
        let lat = data.gps_latitude.unwrap();
        let lon = data.gps_longitude.unwrap();
        assert!((lat - 34.2687).abs() < 1e-6, "latitude {lat}");
        assert!((lon + 118.2369).abs() < 1e-6, "longitude {lon}");
        assert_eq!(data.gps_altitude, Some(1528.0));
        assert!(data.date_time_original.is_some());
        assert_eq!(data.image_unique_id, Some(props().image_unique_id));
    }

    #[test]
    fn southern_eastern_coordinates_keep_their_sign() {
        let mut p = props();
        p.latitude = -33.8568;
        p.longitude = 151.2153;
        let mut out = Vec::<u8>::new();
        embed_exif(small_jpeg().as_slice(), &p, &mut out).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sydney.jpg");
        std::fs::write(&path, &out).unwrap();
        let data = read_exif(&path).unwrap();

        assert!((data.gps_latitude.unwrap() + 33.8568).abs() < 1e-6);
        assert!((data.gps_longitude.unwrap() - 151.2153).abs() < 1e-6);
    }

    #[test]
    fn gps_directory_offsets() {
        let entries = gps_entries(&props()).unwrap();
        let ifd = encode_ifd(&entries, 100);

        // count + 7 entries + next link, then latitude's three rationals
        assert_eq!(&ifd[..2], &7u16.to_le_bytes());
        let table_len = 2 + 7 * IFD_ENTRY_LEN + 4;
        assert_eq!(&ifd[table_len - 4..table_len], &[0, 0, 0, 0]);

        let lat_entry = 2 + 2 * IFD_ENTRY_LEN;
        assert_eq!(&ifd[lat_entry..lat_entry + 2], &TAG_GPS_LATITUDE.to_le_bytes());
        assert_eq!(
            &ifd[lat_entry + 8..lat_entry + 12],
            &(100 + table_len as u32).to_le_bytes()
        );
        assert_eq!(
            &ifd[table_len..table_len + 24],
            encode_rationals(&to_dms(34.2687)).as_slice()
        );

        // "N\0" fits inline
        let lat_ref = 2 + IFD_ENTRY_LEN;
        assert_eq!(&ifd[lat_ref + 8..lat_ref + 12], b"N\0\0\0");

        // altitude is the last data block
        assert_eq!(
            &ifd[ifd.len() - 8..],
            encode_rationals(&[Rational::whole(1528)]).as_slice()
        );
    }

    #[test]
    fn gps_pointer_targets_appended_directory() {
        let mut metadata = Metadata::new();
        for tag in build_tags(&props()).unwrap() {
            metadata.set_tag(tag);
        }
        let mut tiff = metadata.as_u8_vec(FileExtension::JPEG)[JPEG_EXIF_OVERHEAD..].to_vec();
        let before = tiff.len();

        append_gps_ifd(&mut tiff, &gps_entries(&props()).unwrap()).unwrap();

        let slot = ifd0_value_slot(&tiff, TAG_GPS_INFO).unwrap();
        let offset = u32::from_le_bytes(tiff[slot..slot + 4].try_into().unwrap()) as usize;
        assert!(offset >= before && offset % 2 == 0);
        assert_eq!(&tiff[offset..offset + 2], &7u16.to_le_bytes());
        assert_eq!(&tiff[offset + 2..offset + 4], &TAG_GPS_VERSION_ID.to_le_bytes());
    }

    #[test]
    fn gps_pointer_requires_little_endian_tiff() {
        assert_eq!(ifd0_value_slot(b"MM\0*\0\0\0\x08", TAG_GPS_INFO), None);
        assert_eq!(ifd0_value_slot(b"II", TAG_GPS_INFO), None);
    }

    #[test]
    fn output_still_decodes() {
        let mut out = Vec::<u8>::new();
        embed_exif(small_jpeg().as_slice(), &props(), &mut out).unwrap();
        let img = image::load_from_memory(&out).unwrap();
        assert_eq!(img.width(), 8);
    }

    #[test]
    fn rejects_non_jpeg() {
        let err = embed_exif(&b"not a jpeg"[..], &props(), Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, ExifWriteError::MalformedJpeg(_)));
    }

    #[test]
    fn rejects_bad_altitude() {
        let mut p = props();
        p.gps_altitude = "high".into();
        let err = embed_exif(small_jpeg().as_slice(), &p, Vec::<u8>::new()).unwrap_err();
        assert!(matches!(
            err,
            ExifWriteError::UnsupportedValue { tag: "GPSAltitude", .. }
        ));
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut p = props();
        p.latitude = 91.0;
        let err = embed_exif(small_jpeg().as_slice(), &p, Vec::<u8>::new()).unwrap_err();
        assert!(matches!(
            err,
            ExifWriteError::UnsupportedValue { tag: "X-Latitude", .. }
        ));

        let mut p = props();
        p.longitude = f64::NAN;
        let err = embed_exif(small_jpeg().as_slice(), &p, Vec::<u8>::new()).unwrap_err();
        assert!(matches!(
            err,
            ExifWriteError::UnsupportedValue { tag: "X-Longitude", .. }
        ));
    }
}
