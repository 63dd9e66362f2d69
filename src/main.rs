use clap::{Parser, Subcommand};
use kisspages::cache::ContentCache;
use kisspages::site::Site;
use kisspages::store::ContentStore;
use kisspages::types::{ContentRecord, ContentType};
use kisspages::{config, output, serve};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup; called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "kisspages")]
#[command(about = "Flat-file blog and portfolio server")]
#[command(long_about = "\
Flat-file blog and portfolio server

Every page and every work is a directory holding an index.txt: a short
positional header followed by markdown.

Site structure:

  site/
  ├── kisspages.toml               # Config (optional)
  └── content/
      ├── pages/
      │   ├── index.txt            # Home page          → /
      │   ├── about/
      │   │   ├── index.txt        # Page               → /about
      │   │   └── portrait.jpg     # Static file        → /about/portrait.jpg
      │   └── contact/index.txt
      └── works/
          └── launch/index.txt     # Work               → /works/launch

index.txt header:

  Title: <title>                   # pages stop here
  TAGS: <tag>, <tag>               # works only
  DATE: <date>
  SHORT: <one-line summary>
  <markdown body>

Run 'kisspages gen-config' to generate a documented kisspages.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Site directory holding kisspages.toml and content/
    #[arg(long, default_value = ".", global = true)]
    site: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Warm the content cache and serve the site
    Serve {
        /// Port to listen on (overrides kisspages.toml)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Parse every page and work and report problems
    Check,
    /// Print a stock kisspages.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Serve { port } => {
            let site_config = config::load_config(&cli.site)?;
            let content_dir = site_config.content_dir(&cli.site);
            if !content_dir.is_dir() {
                warn!(path = %content_dir.display(), "content directory does not exist");
            }
            let cache = site_config.cache.build_cache()?;
            let site = Site::new(ContentStore::new(content_dir), cache);

            match site.rebuild_cache() {
                Ok(report) => {
                    for (key, err) in &report.failures {
                        error!(%key, kind = err.kind(), error = %err, "content failed to parse");
                    }
                }
                Err(err) => warn!(error = %err, "cache warm-up skipped, serving from disk"),
            }

            serve::serve(&site, &site_config, port.unwrap_or(site_config.port))?;
        }
        Command::Check => {
            let site_config = config::load_config(&cli.site)?;
            let content_dir = site_config.content_dir(&cli.site);
            println!("==> Checking {}", content_dir.display());

            let site = Site::new(ContentStore::new(content_dir), ContentCache::in_memory());
            let report = site.rebuild_cache()?;
            let pages = cached_records(&site, ContentType::Page)?;
            let works = cached_records(&site, ContentType::Work)?;
            output::print_check_output(&pages, &works, &report, site.cache().stats());

            if !report.is_clean() {
                return Err(format!("{} content files failed to parse", report.failures.len()).into());
            }
            info!("content is valid");
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Records that made it into the cache, in walk order.
fn cached_records(
    site: &Site,
    content_type: ContentType,
) -> Result<Vec<ContentRecord>, Box<dyn std::error::Error>> {
    let mut records = Vec::new();
    for path in site.store().content_dirs(content_type)? {
        if let Some(record) = site.cache().get(content_type, &path)? {
            records.push(record);
        }
    }
    Ok(records)
}
