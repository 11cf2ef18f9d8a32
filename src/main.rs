//! `streamscout` CLI - resolve playable stream URLs from the command line

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use streamscout::extract::absolutize;
use streamscout::resolver::{mixdrop, HostKind};
use streamscout::{
    unpack_in, AcceleratedClient, Aggregator, EmbedCache, MediaKind, ResolutionRequest,
    StreamResponse, UserConfig,
};

#[derive(Parser)]
#[command(name = "streamscout")]
#[command(about = "Resolve playable stream URLs for movies and series")]
#[command(version)]
struct Cli {
    /// Log progress to stderr (repeat for debug output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve streams for a title and print them as JSON
    Resolve {
        /// Title kind: movie or series
        kind: String,

        /// IMDb id, with `:season:episode` for series (e.g. tt0903747:1:1)
        id: String,

        /// TMDB API key (overrides config file)
        #[arg(long)]
        tmdb_key: Option<String>,

        /// Proxy base URL (overrides config file)
        #[arg(long)]
        proxy_url: Option<String>,

        /// Proxy password (overrides config file)
        #[arg(long)]
        proxy_password: Option<String>,

        /// Config file to use instead of the default location
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Don't read or write the embed cache
        #[arg(long)]
        no_cache: bool,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Decode the packed script in a file ("-" reads stdin)
    Unpack {
        /// File containing a packed script
        file: String,
    },

    /// Show which host resolver handles an embed URL
    Classify {
        /// Embed URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let default_level = match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Resolve {
            kind,
            id,
            tmdb_key,
            proxy_url,
            proxy_password,
            config,
            no_cache,
            pretty,
        } => {
            let overrides = UserConfig {
                tmdb_key,
                proxy_url,
                proxy_password,
            };
            cmd_resolve(&kind, &id, overrides, config.as_deref(), no_cache, pretty).await?;
        }
        Commands::Unpack { file } => {
            cmd_unpack(&file)?;
        }
        Commands::Classify { url } => {
            cmd_classify(&url);
        }
    }

    Ok(())
}

async fn cmd_resolve(
    kind: &str,
    id: &str,
    overrides: UserConfig,
    config_file: Option<&Path>,
    no_cache: bool,
    pretty: bool,
) -> Result<()> {
    let kind: MediaKind = kind.parse()?;
    let file_config = match config_file {
        Some(path) => UserConfig::load_from(path)?,
        None => UserConfig::load()?,
    };
    let config = file_config.merged_with(overrides);

    let cache = if no_cache {
        None
    } else {
        let cache = EmbedCache::open(EmbedCache::default_path());
        cache.purge();
        Some(Arc::new(cache))
    };

    let client = AcceleratedClient::new()?;
    let aggregator = Aggregator::with_default_providers(cache);
    let request = ResolutionRequest::new(id, kind, config);
    info!("Querying providers: {}", aggregator.provider_names().join(", "));

    let start = Instant::now();
    let streams = aggregator.resolve_all(&request, &client).await;
    info!(
        "Resolved {} streams for {id} in {:.2}s",
        streams.len(),
        start.elapsed().as_secs_f64()
    );

    let response = StreamResponse::new(streams);
    let json = if pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{json}");
    Ok(())
}

fn cmd_unpack(file: &str) -> Result<()> {
    let source = if file == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(file).with_context(|| format!("failed to read {file}"))?
    };

    let decoded = unpack_in(&source).context("no packed script found")?;
    println!("{decoded}");
    Ok(())
}

fn cmd_classify(url: &str) {
    let url = absolutize(url);
    let host = HostKind::classify(&url);
    let normalized = match host {
        HostKind::Mixdrop => mixdrop::normalize_url(&url),
        _ => url,
    };
    println!("host: {host}");
    println!("supported: {}", host.is_supported());
    println!("url: {normalized}");
}
