//! s3browsectl - Command line client for a running s3browse server
//!
//! Usage:
//!   s3browsectl ls my-bucket/logs/ --region us-east-2   - Show one page
//!   s3browsectl ls my-bucket/logs/ --all                - Follow every page
//!   s3browsectl health                                  - Show server health

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

use s3browse::api::{BrowseResponse, ErrorResponse, InvalidFieldResponse};
use s3browse::config::BrowserConfig;

/// s3browse Control Tool
#[derive(Parser)]
#[command(name = "s3browsectl")]
#[command(about = "Browse object storage through an s3browse server", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "s3browse.toml")]
    config: PathBuf,

    /// API endpoint to connect to (overrides config)
    #[arg(short, long)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a location one page at a time
    Ls {
        /// Location, e.g. my-bucket/logs/ or s3://my-bucket/logs/
        path: String,

        /// Region (defaults to storage.default_region in the config)
        #[arg(short, long)]
        region: Option<String>,

        /// Continuation token from a previous page
        #[arg(short, long)]
        token: Option<String>,

        /// Keep requesting pages until the listing is exhausted
        #[arg(long)]
        all: bool,
    },
    /// Show server health
    Health,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    healthy: bool,
    #[serde(default)]
    regions_cached: usize,
}

// ============ Main ============

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        match BrowserConfig::from_file(&cli.config) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: ignoring {}: {}", cli.config.display(), e);
                BrowserConfig::default()
            }
        }
    } else {
        BrowserConfig::default()
    };

    let endpoint = match &cli.endpoint {
        Some(e) => e.trim_end_matches('/').to_string(),
        None => endpoint_from_bind(&config.server.bind_address),
    };

    let result = match &cli.command {
        Commands::Ls {
            path,
            region,
            token,
            all,
        } => {
            let region = region
                .clone()
                .unwrap_or_else(|| config.storage.default_region.clone());
            list(&endpoint, path, &region, token.clone(), *all).await
        }
        Commands::Health => show_health(&endpoint).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Turn a server bind address into a URL this host can reach
fn endpoint_from_bind(bind_address: &str) -> String {
    match bind_address.strip_prefix("0.0.0.0:") {
        Some(port) => format!("http://127.0.0.1:{}", port),
        None => format!("http://{}", bind_address),
    }
}

// ============ Commands ============

async fn list(
    endpoint: &str,
    path: &str,
    region: &str,
    mut token: Option<String>,
    all: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/api/s3", endpoint);
    let client = reqwest::Client::new();

    let mut page_number = 1;
    loop {
        let mut query = vec![("path", path), ("region", region)];
        if let Some(t) = token.as_deref() {
            query.push(("token", t));
        }

        let response = client.get(&url).query(&query).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::BAD_REQUEST {
            let body: InvalidFieldResponse = response.json().await?;
            return Err(format!("invalid {}: {}", body.field, body.message).into());
        }
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => format!("{} ({})", body.error, body.code),
                Err(_) => status.to_string(),
            };
            return Err(format!("API error: {}", message).into());
        }

        let page: BrowseResponse = response.json().await?;

        if page_number == 1 {
            println!();
            println!("{}  [{}]", page.path, page.region);
            println!("{}", "-".repeat(40));
        }
        for dir in &page.directories {
            println!("\x1b[1;34m{}\x1b[0m", dir);
        }
        for file in &page.files {
            println!("{}", file);
        }

        token = page.token;
        match (&token, all) {
            (Some(_), true) => page_number += 1,
            (Some(t), false) => {
                println!();
                println!("More results: --token {}", t);
                break;
            }
            (None, _) => break,
        }
    }
    println!();

    Ok(())
}

async fn show_health(endpoint: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/health", endpoint);
    let client = reqwest::Client::new();

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(format!("API error: {}", response.status()).into());
    }

    let health: HealthResponse = response.json().await?;

    println!();
    println!("s3browse Health (s3browsectl v{})", env!("CARGO_PKG_VERSION"));
    println!("=================================");
    println!();
    println!(
        "Status:         {}",
        if health.healthy { "\x1b[32mHealthy\x1b[0m" } else { "\x1b[31mUnhealthy\x1b[0m" }
    );
    println!("Regions cached: {}", health.regions_cached);
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_wildcard_bind() {
        assert_eq!(endpoint_from_bind("0.0.0.0:8080"), "http://127.0.0.1:8080");
        assert_eq!(endpoint_from_bind("10.0.0.5:9000"), "http://10.0.0.5:9000");
    }
}
