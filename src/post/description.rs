use regex::Regex;
use std::sync::LazyLock;

use crate::error::{DescriptionError, Field};

// "🗺34.2687, -118.2369 🧭141° ⛰5016 ft"
static RE_COORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d+(?:\.\d+)?), (-?\d+(?:\.\d+)?)").expect("valid coordinates pattern")
});
static RE_ALT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*ft").expect("valid altitude pattern"));

/// Coordinates and altitude pulled from a post description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_feet: f64,
}

/// Extract `lat, lon` and `<digits> ft` from free description text.
///
/// The first coordinate pair in the text wins. Zero values are returned as
/// is; rejecting them is up to the caller.
pub fn parse_description(text: &str) -> Result<Location, DescriptionError> {
    let coords = RE_COORDS
        .captures(text)
        .ok_or(DescriptionError::CoordinatePattern)?;
    let alt = RE_ALT
        .captures(text)
        .ok_or(DescriptionError::AltitudePattern)?;

    let str_lat = &coords[1];
    let str_lon = &coords[2];
    let str_alt = &alt[1];

    log::debug!(
        "Parse description string values latitude={str_lat} longitude={str_lon} altitude={str_alt}"
    );

    Ok(Location {
        latitude: parse_number(Field::Latitude, str_lat)?,
        longitude: parse_number(Field::Longitude, str_lon)?,
        altitude_feet: parse_number(Field::Altitude, str_alt)?,
    })
}

fn parse_number(field: Field, value: &str) -> Result<f64, DescriptionError> {
    value
        .parse::<f64>()
        .map_err(|source| DescriptionError::NumericParse {
            field,
            value: value.to_string(),
            source,
        })
}
