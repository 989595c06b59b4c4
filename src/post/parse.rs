use chrono::{DateTime, FixedOffset};
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tokio_util::sync::CancellationToken;

use super::description::parse_description;
use super::{Post, PostMeta};
use crate::error::{Error, Field, Result, TimeError};
use crate::fetch::Fetcher;

static META_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property]").expect("valid meta selector"));

/// Fetch a post page, derive its metadata, then fetch and decode its image.
///
/// The image is only requested once every other field has been found.
///
/// # Example
///
/// ```rust,no_run
/// use landscape_exif::config::Config;
/// use landscape_exif::fetch::Fetcher;
/// use landscape_exif::post::parse_post;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> landscape_exif::Result<()> {
/// let fetcher = Fetcher::new(&Config::default().fetch)?;
/// let post = parse_post(
///     &fetcher,
///     &CancellationToken::new(),
///     "https://botsin.space/users/CALandscapeBot/statuses/113028507763072851",
/// )
/// .await?;
/// println!("{}, {} at {} ft", post.latitude, post.longitude, post.altitude_feet);
/// # Ok(())
/// # }
/// ```
pub async fn parse_post(fetcher: &Fetcher, cancel: &CancellationToken, url: &str) -> Result<Post> {
    let body = fetcher.fetch(cancel, url).await?;
    let html = String::from_utf8_lossy(&body);
    let meta = parse_post_html(url, &html)?;

    let image_url = meta.image_url.clone();
    let image_body = fetcher.fetch(cancel, &image_url).await?;

    let image = image::load_from_memory(&image_body).map_err(|source| Error::ImageDecode {
        url: image_url.clone(),
        source,
    })?;

    log::debug!(
        "Decoded image {image_url} ({}x{}) for {url}",
        image.width(),
        image.height()
    );

    Ok(meta.with_image(image))
}

/// Read the `og:*` meta tags of an already fetched post page.
///
/// `url` is the page's address and only used for error context. When a
/// property appears more than once the first usable value is kept.
pub fn parse_post_html(url: &str, html: &str) -> Result<PostMeta> {
    let document = Html::parse_document(html);
    let mut scan = MetaScan::default();

    for element in document.select(&META_SELECTOR) {
        let Some(property) = element.value().attr("property") else {
            continue;
        };
        let content = element.value().attr("content").unwrap_or_default();

        match property {
            "og:url" => set_text(&mut scan.post_url, content),
            "og:image" => set_text(&mut scan.image_url, content),
            "og:published_time" => {
                if scan.published_time.is_none() {
                    let t = parse_published_time(content).map_err(|source| Error::TimeParse {
                        url: url.to_string(),
                        value: content.to_string(),
                        source,
                    })?;
                    scan.published_time = Some(t);
                }
            }
            "og:description" => {
                // Location comes from one description only, never a mix
                if !scan.described {
                    scan.described = true;
                    let loc = parse_description(content).map_err(|source| Error::Description {
                        url: url.to_string(),
                        source,
                    })?;
                    scan.latitude = non_zero(loc.latitude);
                    scan.longitude = non_zero(loc.longitude);
                    scan.altitude_feet = non_zero(loc.altitude_feet);
                }
            }
            other => log::debug!("Unknown or unsupported property {other} on {url}"),
        }

        if scan.is_complete() {
            break;
        }
    }

    scan.into_meta(url)
}

/// Fields found so far while walking the meta tags.
#[derive(Debug, Default)]
struct MetaScan {
    post_url: Option<String>,
    image_url: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude_feet: Option<f64>,
    published_time: Option<DateTime<FixedOffset>>,
    described: bool,
}

impl MetaScan {
    fn is_complete(&self) -> bool {
        self.post_url.is_some()
            && self.image_url.is_some()
            && self.described
            && self.published_time.is_some()
    }

    /// Checked in the order the fields are reported.
    fn into_meta(self, url: &str) -> Result<PostMeta> {
        let missing = |field| Error::MissingField {
            url: url.to_string(),
            field,
        };

        Ok(PostMeta {
            image_url: self.image_url.ok_or_else(|| missing(Field::ImageUrl))?,
            post_url: self.post_url.ok_or_else(|| missing(Field::PostUrl))?,
            latitude: self.latitude.ok_or_else(|| missing(Field::Latitude))?,
            longitude: self.longitude.ok_or_else(|| missing(Field::Longitude))?,
            altitude_feet: self.altitude_feet.ok_or_else(|| missing(Field::Altitude))?,
            published_time: self
                .published_time
                .ok_or_else(|| missing(Field::PublishedTime))?,
        })
    }
}

/// Content is kept verbatim; blank content counts as absent.
fn set_text(slot: &mut Option<String>, content: &str) {
    if slot.is_none() && !content.trim().is_empty() {
        *slot = Some(content.to_string());
    }
}

// A parsed 0 counts as absent: posts use it when a value is unknown.
fn non_zero(value: f64) -> Option<f64> {
    (value != 0.0).then_some(value)
}

/// RFC 3339 with an upper case `T` between date and time. chrono alone also
/// takes a space or `t` there.
fn parse_published_time(value: &str) -> std::result::Result<DateTime<FixedOffset>, TimeError> {
    let time = DateTime::parse_from_rfc3339(value)?;
    match value.as_bytes().get(10) {
        Some(b'T') => Ok(time),
        _ => Err(TimeError::Separator),
    }
}
