//! s3browse - Directory-style browsing for object storage
//!
//! Serves the browse API, or lists a location straight from the command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s3browse::api::HttpServer;
use s3browse::backend::{MemoryBackend, MemoryBackendFactory};
use s3browse::config::{BrowserConfig, LoggingConfig};
use s3browse::error::Result;
use s3browse::listing::ListingService;
use s3browse::location;

/// s3browse - Directory-style browsing for object storage
#[derive(Parser)]
#[command(name = "s3browse")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "s3browse.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Address to listen on (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Serve a `bucket/key` snapshot file instead of S3
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// List one page of a location
    Ls {
        /// Location, e.g. my-bucket/logs/ or s3://my-bucket/logs/
        path: String,

        /// Region (defaults to storage.default_region)
        #[arg(short, long)]
        region: Option<String>,

        /// Continuation token from a previous page
        #[arg(short, long)]
        token: Option<String>,

        /// Page size (defaults to storage.max_keys)
        #[arg(short, long)]
        max_keys: Option<usize>,

        /// Keep requesting pages until the listing is exhausted
        #[arg(long)]
        all: bool,

        /// List a `bucket/key` snapshot file instead of S3
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "s3browse.toml")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, snapshot } => {
            let config = load_config(&cli.config, cli.log_level.as_deref())?;
            run_serve(config, bind, snapshot).await
        }
        Commands::Ls {
            path,
            region,
            token,
            max_keys,
            all,
            snapshot,
        } => {
            let config = load_config(&cli.config, cli.log_level.as_deref())?;
            run_ls(config, path, region, token, max_keys, all, snapshot).await
        }
        Commands::Init { output } => run_init(output),
        Commands::Validate => run_validate(&cli.config),
    }
}

/// Load configuration (defaults when the file is absent) and start logging
fn load_config(path: &Path, level_override: Option<&str>) -> Result<BrowserConfig> {
    let config = BrowserConfig::load_or_default(path)?;
    init_logging(&config.logging, level_override);
    tracing::debug!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig, level_override: Option<&str>) {
    let level = level_override.unwrap_or(&logging.level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());
    let json = logging.format == "json";

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

/// Build the listing service for S3 or for a local snapshot
fn build_service(config: &BrowserConfig, snapshot: Option<&Path>) -> Result<ListingService> {
    match snapshot {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let backend = Arc::new(MemoryBackend::from_snapshot(&text)?);
            tracing::info!("Serving snapshot {:?}", path);
            Ok(ListingService::new(Arc::new(MemoryBackendFactory::new(backend)))
                .with_max_keys(config.storage.max_keys)
                .with_request_timeout(config.request_timeout()))
        }
        None => ListingService::from_config(config),
    }
}

/// Start the HTTP API
async fn run_serve(
    mut config: BrowserConfig,
    bind: Option<String>,
    snapshot: Option<PathBuf>,
) -> Result<()> {
    tracing::info!("Starting s3browse...");

    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }

    let service = match build_service(&config, snapshot.as_deref()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to initialize storage backend: {}", e);
            return Err(e);
        }
    };
    tracing::info!(
        "Default region {}, page size {}",
        config.storage.default_region,
        service.max_keys()
    );

    let server = HttpServer::new(config.server.clone(), service);
    server.start().await
}

/// List a location from the command line
async fn run_ls(
    config: BrowserConfig,
    path: String,
    region: Option<String>,
    token: Option<String>,
    max_keys: Option<usize>,
    all: bool,
    snapshot: Option<PathBuf>,
) -> Result<()> {
    let service = build_service(&config, snapshot.as_deref())?;
    let location = location::resolve(&path)?;
    let region = region.unwrap_or_else(|| config.storage.default_region.clone());
    let max_keys = max_keys.unwrap_or(config.storage.max_keys);

    println!("{}", location);

    let mut token = token;
    loop {
        let page = service
            .list_page(&location, &region, max_keys, token.as_deref())
            .await?;

        for dir in &page.directories {
            println!("  {}", dir);
        }
        for file in &page.files {
            println!("  {}", file);
        }

        token = page.next_token;
        match (&token, all) {
            (Some(_), true) => continue,
            (Some(t), false) => {
                println!();
                println!("More results: --token {}", t);
                break;
            }
            (None, _) => break,
        }
    }

    Ok(())
}

/// Initialize configuration file
fn run_init(output: PathBuf) -> Result<()> {
    let config_content = r#"# s3browse Configuration
# Generated configuration file

[server]
bind_address = "0.0.0.0:8080"
cors_enabled = false

[storage]
default_region = "us-east-2"
max_keys = 20
request_timeout_secs = 30
# endpoint = "http://localhost:9000"
# path_style = true

[credentials]
# Read these when the host reserves AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY
access_key_var = "S3BROWSE_ACCESS_KEY_ID"
secret_key_var = "S3BROWSE_SECRET_ACCESS_KEY"
# profile = "default"

[logging]
level = "info"
format = "pretty"
"#;

    std::fs::write(&output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("Then start with: s3browse --config {} serve", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: &Path) -> Result<()> {
    match BrowserConfig::from_file(config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Bind Address:   {}", config.server.bind_address);
            println!("  Default Region: {}", config.storage.default_region);
            println!("  Page Size:      {}", config.storage.max_keys);
            println!("  Timeout:        {} s", config.storage.request_timeout_secs);
            println!(
                "  Endpoint:       {}",
                config.storage.endpoint.as_deref().unwrap_or("(AWS)")
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}
