use std::fmt;
use std::str::FromStr;

use super::writer::ExifWriteError;

pub const X_LATITUDE: &str = "X-Latitude";
pub const X_LONGITUDE: &str = "X-Longitude";
pub const GPS_ALTITUDE: &str = "GPSAltitude";
pub const DATE_TIME_ORIGINAL: &str = "DateTimeOriginal";
pub const IMAGE_ID: &str = "ImageID";
pub const IMAGE_UNIQUE_ID: &str = "ImageUniqueID";

/// The fixed set of tags stamped into every derived image.
///
/// `X-Latitude` and `X-Longitude` are decimal degrees; the writer turns them
/// into the standard GPS latitude/longitude tags.
#[derive(Debug, Clone, PartialEq)]
pub struct ExifProperties {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters, as a rational string such as `"1528/1"`.
    pub gps_altitude: String,
    /// `YYYY:MM:DD HH:MM:SS`
    pub date_time_original: String,
    /// Source post URL.
    pub image_id: String,
    /// Source image URL.
    pub image_unique_id: String,
}

impl ExifProperties {
    /// Tag name / value pairs, for logging and display.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (X_LATITUDE, self.latitude.to_string()),
            (X_LONGITUDE, self.longitude.to_string()),
            (GPS_ALTITUDE, self.gps_altitude.clone()),
            (DATE_TIME_ORIGINAL, self.date_time_original.clone()),
            (IMAGE_ID, self.image_id.clone()),
            (IMAGE_UNIQUE_ID, self.image_unique_id.clone()),
        ]
    }
}

/// An unsigned EXIF rational, written `numerator/denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub fn whole(n: u32) -> Self {
        Self {
            numerator: n,
            denominator: 1,
        }
    }

    pub fn to_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Rational {
    type Err = ExifWriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ExifWriteError::UnsupportedValue {
            tag: GPS_ALTITUDE,
            value: s.to_string(),
        };

        let (num, den) = s.trim().split_once('/').ok_or_else(invalid)?;
        let numerator = num.trim().parse::<u32>().map_err(|_| invalid())?;
        let denominator = den.trim().parse::<u32>().map_err(|_| invalid())?;
        if denominator == 0 {
            return Err(invalid());
        }

        Ok(Self {
            numerator,
            denominator,
        })
    }
}
