//! Turn a [`Post`] into a JPEG carrying its location, time and provenance.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageEncoder};
use std::io::Write;

use crate::error::{Error, Result};
use crate::exif::{ExifProperties, ExifWriteError, GPS_ALTITUDE, Rational, embed_exif};
use crate::post::Post;

pub const FEET_TO_METERS: f64 = 0.3048;
pub const JPEG_QUALITY: u8 = 100;

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Whole meters for an altitude in feet, truncated toward zero.
///
/// Fails when the result does not fit an unsigned EXIF rational.
pub fn feet_to_meters(feet: f64) -> std::result::Result<u32, ExifWriteError> {
    let meters = (feet * FEET_TO_METERS).trunc();
    if !meters.is_finite() || meters < 0.0 || meters > u32::MAX as f64 {
        return Err(ExifWriteError::UnsupportedValue {
            tag: GPS_ALTITUDE,
            value: format!("{feet} ft"),
        });
    }
    Ok(meters as u32)
}

/// The EXIF property set derived from a post.
///
/// The capture time keeps the offset the post was published with.
pub fn derive_properties(post: &Post) -> Result<ExifProperties> {
    Ok(ExifProperties {
        latitude: post.latitude,
        longitude: post.longitude,
        gps_altitude: Rational::whole(feet_to_meters(post.altitude_feet)?).to_string(),
        date_time_original: post.published_time.format(EXIF_DATE_FORMAT).to_string(),
        image_id: post.post_url.clone(),
        image_unique_id: post.image_url.clone(),
    })
}

/// Re-encode the post's image as a maximum quality JPEG.
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(Error::ImageEncode)?;
    Ok(buf)
}

/// Write the stamped JPEG for `post` to `output`.
///
/// The post is left untouched; stamping the same post twice yields the same
/// tag values.
pub fn stamp<W: Write>(post: &Post, output: W) -> Result<()> {
    let props = derive_properties(post)?;
    let jpeg = encode_jpeg(&post.image)?;

    log::debug!(
        "Stamping {} ({} bytes) with EXIF from {}",
        post.image_url,
        jpeg.len(),
        post.post_url
    );

    embed_exif(jpeg.as_slice(), &props, output)?;
    Ok(())
}

/// [`stamp`] into a new buffer.
pub fn stamp_to_vec(post: &Post) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    stamp(post, &mut out)?;
    Ok(out)
}
