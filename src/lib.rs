//! # landscape-exif
//!
//! Fetch landscape-camera posts (Mastodon statuses from bots such as
//! `@CALandscapeBot`), read the snapshot URL, coordinates, altitude and publish
//! time from the page's Open Graph tags, download the snapshot and write it out
//! as a JPEG with that data embedded as EXIF.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use landscape_exif::config::Config;
//! use landscape_exif::fetch::Fetcher;
//! use landscape_exif::pipeline::derive_image_from_post_url;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let fetcher = Fetcher::new(&config.fetch)?;
//!     let cancel = CancellationToken::new();
//!
//!     let file = std::fs::File::create("113028507763072851.jpg")?;
//!     derive_image_from_post_url(
//!         &fetcher,
//!         &cancel,
//!         "https://botsin.space/users/CALandscapeBot/statuses/113028507763072851",
//!         file,
//!     )
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! ```rust,no_run
//! use landscape_exif::post::parse_post;
//! use landscape_exif::stamp::{derive_properties, stamp_to_vec};
//! # use landscape_exif::{config::Config, fetch::Fetcher};
//! # use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> landscape_exif::Result<()> {
//! # let fetcher = Fetcher::new(&Config::default().fetch)?;
//! # let cancel = CancellationToken::new();
//! let post = parse_post(&fetcher, &cancel, "https://botsin.space/users/CALandscapeBot/statuses/113028507763072851").await?;
//! for (tag, value) in derive_properties(&post)?.entries() {
//!     println!("{tag} = {value}");
//! }
//! let jpeg = stamp_to_vec(&post)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Written Tags
//!
//! | Tag | Value |
//! |-----|-------|
//! | `GPSLatitude` / `GPSLatitudeRef` | From the description's `lat, lon` |
//! | `GPSLongitude` / `GPSLongitudeRef` | From the description's `lat, lon` |
//! | `GPSAltitude` / `GPSAltitudeRef` | `<n> ft` converted to whole meters |
//! | `DateTimeOriginal` | `og:published_time` as `YYYY:MM:DD HH:MM:SS` |
//! | `ImageID` | `og:url` |
//! | `ImageUniqueID` | `og:image` |
//!
//! ## Modules
//!
//! - [`config`] — Configuration types and loading/saving
//! - [`error`] — Error taxonomy
//! - [`exif`] — EXIF embedding and reading
//! - [`fetch`] — Cancellable HTTP GET
//! - [`pipeline`] — Post URL to stamped file, plus batch helpers
//! - [`post`] — Post record and Open Graph parsing
//! - [`stamp`] — Property derivation and JPEG re-encoding

pub mod config;
pub mod error;
pub mod exif;
pub mod fetch;
pub mod pipeline;
pub mod post;
pub mod stamp;

pub use error::{Error, Result};
