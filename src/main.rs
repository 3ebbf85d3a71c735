use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pageseg::server::SegmentServer;
use pageseg::{HostConfig, PageHost, Viewport};

const DEFAULT_PORT: u16 = 5000;

/// Extract sanitized layout segments from web pages.
#[derive(Parser)]
#[command(name = "pageseg")]
#[command(version)]
struct Cli {
    /// Layout viewport, WIDTHxHEIGHT
    #[arg(long, default_value = "1280x800", global = true)]
    viewport: Viewport,

    /// Navigation timeout in milliseconds
    #[arg(long, default_value_t = 60_000, global = true)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment one page and print `{segments}` as JSON
    Segment {
        /// Page to fetch
        url: Option<String>,

        /// Read the page from a local HTML file instead
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Also return the elements found again by their marker classes
        #[arg(long)]
        marked: bool,
    },

    /// Serve `POST /segment` over HTTP
    Serve {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on (falls back to $PORT, then 5000)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn port_from_env() -> anyhow::Result<u16> {
    match std::env::var("PORT") {
        Ok(p) => p.parse().with_context(|| format!("invalid PORT '{}'", p)),
        Err(_) => Ok(DEFAULT_PORT),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::try_init().ok();
    let cli = Cli::parse();

    let mut config = HostConfig {
        viewport: cli.viewport,
        timeout_ms: cli.timeout_ms,
        ..HostConfig::default()
    };

    match cli.command {
        Commands::Segment {
            url,
            file,
            pretty,
            marked,
        } => {
            config.reextract_marked = marked;
            let host = PageHost::new(config)?;
            let response = match (url, file) {
                (_, Some(path)) => {
                    let html = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    host.segment_html(&html)?
                }
                (Some(url), None) => host.segment_url(&url)?,
                (None, None) => bail!("pass a URL or --file <PATH>"),
            };
            let json = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{}", json);
        }
        Commands::Serve { host, port } => {
            let port = match port {
                Some(p) => p,
                None => port_from_env()?,
            };
            let server = SegmentServer::bind(&format!("{}:{}", host, port), config)?;
            server.run();
        }
    }
    Ok(())
}
