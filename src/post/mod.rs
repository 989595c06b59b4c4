//! Landscape-camera posts: the post record and how to get one from a URL.
//!
//! - [`parse_post`] — Fetch a post page, read its Open Graph tags, then fetch and decode the image
//! - [`parse_post_html`] — The markup half of that, for pages already in hand
//! - [`parse_description`] — Coordinates and altitude from `og:description` text

mod description;
mod parse;

pub use description::{Location, parse_description};
pub use parse::{parse_post, parse_post_html};

use chrono::{DateTime, FixedOffset};
use image::DynamicImage;

/// The validated Open Graph fields of a post, before its image is fetched.
///
/// Only [`parse_post_html`] builds one, and only when all six fields were found.
#[derive(Debug, Clone, PartialEq)]
pub struct PostMeta {
    /// `og:url`
    pub post_url: String,
    /// `og:image`
    pub image_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_feet: f64,
    /// `og:published_time`, in the offset the post gave.
    pub published_time: DateTime<FixedOffset>,
}

/// A fully derived post: metadata plus the decoded snapshot.
#[derive(Debug, Clone)]
pub struct Post {
    pub post_url: String,
    pub image_url: String,
    pub image: DynamicImage,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_feet: f64,
    pub published_time: DateTime<FixedOffset>,
}

impl PostMeta {
    /// Attach the decoded image, completing the record.
    pub fn with_image(self, image: DynamicImage) -> Post {
        Post {
            post_url: self.post_url,
            image_url: self.image_url,
            image,
            latitude: self.latitude,
            longitude: self.longitude,
            altitude_feet: self.altitude_feet,
            published_time: self.published_time,
        }
    }
}
