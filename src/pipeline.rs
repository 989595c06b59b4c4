use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

use crate::fetch::Fetcher;
use crate::post::parse_post;
use crate::stamp::{stamp, stamp_to_vec};

/// Fetch a post, derive its image and write the stamped JPEG to `output`.
///
/// Nothing is written unless every stage before the EXIF embedding succeeded.
///
/// # Example
///
/// ```rust,no_run
/// use landscape_exif::config::Config;
/// use landscape_exif::fetch::Fetcher;
/// use landscape_exif::pipeline::derive_image_from_post_url;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> landscape_exif::Result<()> {
/// let fetcher = Fetcher::new(&Config::default().fetch)?;
/// let mut out = Vec::new();
/// derive_image_from_post_url(
///     &fetcher,
///     &CancellationToken::new(),
///     "https://botsin.space/users/CALandscapeBot/statuses/113028507763072851",
///     &mut out,
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn derive_image_from_post_url<W: Write>(
    fetcher: &Fetcher,
    cancel: &CancellationToken,
    url: &str,
    output: W,
) -> crate::Result<()> {
    let post = parse_post(fetcher, cancel, url).await?;
    stamp(&post, output)
}

/// The outcome of deriving one URL into a file.
#[derive(Debug, Serialize)]
pub struct ProcessResult {
    pub url: String,
    pub path: PathBuf,
    pub error: Option<String>,
}

/// Derive the image for `url` into `root`, skipping on failure.
///
/// The file is only created once the stamped image is complete, so a failed
/// item leaves nothing behind. An existing file is kept unless `overwrite`.
pub async fn process_url(
    fetcher: &Fetcher,
    cancel: &CancellationToken,
    url: &str,
    root: &Path,
    overwrite: bool,
) -> ProcessResult {
    let path = output_path_for(root, url);
    let mut result = ProcessResult {
        url: url.to_string(),
        path: path.clone(),
        error: None,
    };

    if path.exists() && !overwrite {
        result.error = Some(format!("{} already exists", path.display()));
        return result;
    }

    let bytes = match parse_post(fetcher, cancel, url).await {
        Ok(post) => stamp_to_vec(&post),
        Err(e) => Err(e),
    };

    match bytes {
        Ok(bytes) => {
            if let Err(e) = std::fs::write(&path, bytes) {
                result.error = Some(format!("Failed to write {}: {e}", path.display()));
            }
        }
        Err(e) => {
            result.error = Some(error_chain(&e));
        }
    }

    result
}

/// Render an error with its sources, `outer: inner: root`.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(e) = source {
        msg.push_str(": ");
        msg.push_str(&e.to_string());
        source = e.source();
    }
    msg
}

/// Read one URL per line, trimming whitespace and skipping blank lines.
pub fn read_urls<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read URL list")?;
        let line = line.trim();
        if !line.is_empty() {
            urls.push(line.to_string());
        }
    }
    Ok(urls)
}

/// `<root>/<last path segment of url>.jpg`
pub fn output_path_for(root: &Path, url: &str) -> PathBuf {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let base = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .unwrap_or("post");
    root.join(format!("{base}.jpg"))
}

/// Resolve the output directory: `.` is the working directory, anything else
/// is made absolute.
pub fn resolve_destination(destination: &Path) -> Result<PathBuf> {
    if destination == Path::new(".") {
        return std::env::current_dir().context("Failed to determine current working directory");
    }
    std::path::absolute(destination).with_context(|| {
        format!(
            "Failed to derive absolute path for '{}'",
            destination.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DescriptionError, Error};

    #[test]
    fn output_path_uses_status_id() {
        let root = Path::new("/tmp/out");
        assert_eq!(
            output_path_for(
                root,
                "https://botsin.space/users/CALandscapeBot/statuses/113028507763072851"
            ),
            PathBuf::from("/tmp/out/113028507763072851.jpg")
        );
    }

    #[test]
    fn output_path_ignores_query_and_trailing_slash() {
        let root = Path::new("/tmp/out");
        assert_eq!(
            output_path_for(root, "https://example.com/statuses/42/?x=1#top"),
            PathBuf::from("/tmp/out/42.jpg")
        );
    }

    #[test]
    fn output_path_fallback() {
        let root = Path::new("/tmp/out");
        assert_eq!(
            output_path_for(root, "https://"),
            PathBuf::from("/tmp/out/post.jpg")
        );
    }

    #[test]
    fn read_urls_skips_blanks() {
        let input = "https://a.example/1\n\n   https://a.example/2  \r\n\t\n";
        let urls = read_urls(input.as_bytes()).unwrap();
        assert_eq!(urls, ["https://a.example/1", "https://a.example/2"]);
    }

    #[test]
    fn resolve_dot_is_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(resolve_destination(Path::new(".")).unwrap(), cwd);
    }

    #[test]
    fn resolve_relative_is_absolute() {
        let resolved = resolve_destination(Path::new("images")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("images"));
    }

    #[test]
    fn error_chain_includes_sources() {
        let err = Error::Description {
            url: "https://example.com/1".into(),
            source: DescriptionError::AltitudePattern,
        };
        assert_eq!(
            error_chain(&err),
            "failed to parse description for https://example.com/1: description failed altitude pattern match"
        );
    }
}
