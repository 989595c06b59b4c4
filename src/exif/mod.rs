//! EXIF reading and writing for derived JPEGs.
//!
//! This module provides two main functions:
//!
//! - [`embed_exif`] — Copy a JPEG stream, inserting an EXIF block built from [`ExifProperties`]
//! - [`read_exif`] — Read the GPS and capture-time tags back from an image file

mod properties;
mod reader;
mod writer;

pub use properties::{
    DATE_TIME_ORIGINAL, ExifProperties, GPS_ALTITUDE, IMAGE_ID, IMAGE_UNIQUE_ID, Rational, X_LATITUDE,
    X_LONGITUDE,
};
pub use reader::{ExifData, read_exif};
pub use writer::{ExifWriteError, embed_exif};
