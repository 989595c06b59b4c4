use anyhow::Result;
use clap::Parser;
use std::io::BufReader;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use landscape_exif::{config, exif, fetch, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "landscape-exif",
    version,
    about = "Fetch landscape-camera posts and write each snapshot as a JPEG with EXIF derived from the post",
    after_help = "If the only URL is \"-\" the list of URLs is read from STDIN, one per line."
)]
struct Cli {
    /// Post URLs to fetch (or local images with --show-exif)
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Folder images are written to (default: from config, else the working directory)
    #[arg(short, long, value_name = "DIR")]
    destination: Option<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Replace images that already exist in the destination
    #[arg(long)]
    overwrite: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Display the EXIF metadata of local image files and exit
    #[arg(long = "show-exif")]
    show_exif: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();
    log::debug!("Verbose logging enabled");

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.urls.is_empty() {
        anyhow::bail!("No URLs specified. Use --help for usage.");
    }

    // Handle --show-exif
    if cli.show_exif {
        for path in &cli.urls {
            print_exif(&PathBuf::from(path))?;
        }
        return Ok(());
    }

    // Load config and apply CLI overrides
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(timeout) = cli.timeout {
        config.fetch.timeout_secs = Some(timeout);
    }
    if let Some(ref destination) = cli.destination {
        config.output.destination = destination.clone();
    }
    if cli.overwrite {
        config.output.overwrite = true;
    }

    let root = pipeline::resolve_destination(&config.output.destination)?;

    let urls = if cli.urls.len() == 1 && cli.urls[0] == "-" {
        pipeline::read_urls(BufReader::new(std::io::stdin()))?
    } else {
        cli.urls.clone()
    };

    let fetcher = fetch::Fetcher::new(&config.fetch)?;

    // Ctrl-C cancels whatever is in flight
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        });
    }

    log::info!("Writing {} image(s) to {}", urls.len(), root.display());

    let mut results = Vec::new();
    let total = urls.len();

    for (i, url) in urls.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        log::info!("[{}/{}] Fetching: {url}", i + 1, total);

        let result =
            pipeline::process_url(&fetcher, &cancel, url, &root, config.output.overwrite).await;

        match result.error {
            Some(ref err) => log::error!("  Failed to derive image, skipping: {err}"),
            None => log::info!("  Wrote: {}", result.path.display()),
        }

        results.push(result);
    }

    // JSON output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    // Summary
    let success = results.iter().filter(|r| r.error.is_none()).count();
    let failed = results.len() - success;
    log::info!("Done: {success} succeeded, {failed} failed out of {total} posts");

    Ok(())
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print the tags this tool writes, as read back from a file.
fn print_exif(path: &std::path::Path) -> Result<()> {
    let data = exif::read_exif(path)?;

    println!();
    println!("  {BOLD}{}{RESET}", path.display());
    println!("  {DIM}{}{RESET}", "─".repeat(72));

    if data.has_gps {
        print_row("GPSLatitude", data.gps_latitude.map(|v| format!("{v:.6}")));
        print_row("GPSLongitude", data.gps_longitude.map(|v| format!("{v:.6}")));
        print_row("GPSAltitude", data.gps_altitude.map(|v| format!("{v} m")));
    } else {
        print_row("GPS", None);
    }
    print_row("DateTimeOriginal", data.date_time_original);
    print_row("ImageID", data.image_id);
    print_row("ImageUniqueID", data.image_unique_id);

    Ok(())
}

fn print_row(label: &str, value: Option<String>) {
    match value {
        Some(v) => println!("  {label:<20} {v}"),
        None => println!("  {label:<20} {DIM}(none){RESET}"),
    }
}
