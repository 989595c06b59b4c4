use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

use crate::exif::ExifWriteError;

/// Convenience alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A required post field, as reported by [`Error::MissingField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ImageUrl,
    PostUrl,
    Latitude,
    Longitude,
    Altitude,
    PublishedTime,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::ImageUrl => "image URL",
            Field::PostUrl => "post URL",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::Altitude => "altitude",
            Field::PublishedTime => "published time",
        };
        f.write_str(name)
    }
}

/// Failure to pull coordinates and altitude out of an `og:description`.
#[derive(Debug, Error)]
pub enum DescriptionError {
    #[error("description failed coordinates pattern match")]
    CoordinatePattern,
    #[error("description failed altitude pattern match")]
    AltitudePattern,
    #[error("failed to parse {field} ({value})")]
    NumericParse {
        field: Field,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}

/// Failure to read `og:published_time` as an RFC 3339 timestamp.
#[derive(Debug, Error)]
pub enum TimeError {
    #[error("date and time must be separated by 'T'")]
    Separator,
    #[error(transparent)]
    Format(#[from] chrono::ParseError),
}

/// Every way deriving an image from a post can fail.
///
/// Fetch-related variants carry the URL that was being requested, so the
/// caller can tell a failed post page from a failed image download.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("failed to request {url}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request for {url} failed, {status}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("failed to read body for {url}")]
    Read {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request for {url} was cancelled")]
    Cancelled { url: String },

    #[error("failed to parse published time for {url} ({value})")]
    TimeParse {
        url: String,
        value: String,
        #[source]
        source: TimeError,
    },

    #[error("failed to parse description for {url}")]
    Description {
        url: String,
        #[source]
        source: DescriptionError,
    },

    #[error("failed to derive {field} from {url}")]
    MissingField { url: String, field: Field },

    #[error("failed to decode image {url}")]
    ImageDecode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode post image")]
    ImageEncode(#[source] image::ImageError),

    #[error("failed to write EXIF metadata")]
    ExifWrite(#[from] ExifWriteError),
}

impl Error {
    /// The HTTP status of a non-200 response, if that is what failed.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The missing field, if the post page lacked one.
    pub fn missing_field(&self) -> Option<Field> {
        match self {
            Error::MissingField { field, .. } => Some(*field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names() {
        assert_eq!(Field::ImageUrl.to_string(), "image URL");
        assert_eq!(Field::PublishedTime.to_string(), "published time");
    }

    #[test]
    fn missing_field_message_names_field_and_url() {
        let err = Error::MissingField {
            url: "https://example.com/post/1".into(),
            field: Field::Altitude,
        };
        assert_eq!(
            err.to_string(),
            "failed to derive altitude from https://example.com/post/1"
        );
        assert_eq!(err.missing_field(), Some(Field::Altitude));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn http_status_carries_code_and_phrase() {
        let err = Error::HttpStatus {
            url: "https://example.com/a.jpg".into(),
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert!(err.to_string().contains("404 Not Found"));
    }

    #[test]
    fn time_error_wraps_chrono() {
        let source = chrono::DateTime::parse_from_rfc3339("yesterday").unwrap_err();
        let err = TimeError::from(source);
        assert!(matches!(err, TimeError::Format(_)));
        assert_eq!(err.to_string(), source.to_string());
    }
}
