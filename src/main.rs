//! wstail - entry point.

use clap::Parser;
use tracing::info;
use wstail::stream::{AuthContext, ConnectGate, StreamConnection, StreamEndpoint, TailDepth};

/// Tail live container logs from a remote runtime.
///
/// Connects to the container's log endpoint over the streaming transport and
/// either renders an interactive viewer (default) or prints decoded lines to
/// stdout (`--headless`).
#[derive(Parser, Debug)]
#[command(name = "wstail")]
#[command(version)]
#[command(about = "Terminal viewer and headless tailer for live container log streams")]
pub struct Args {
    /// Base HTTP(S) URL of the container logs resource
    pub url: String,

    /// Bearer token for the connection header
    #[arg(long)]
    pub token: Option<String>,

    /// Lines of server-side history to request (a number, or "all")
    #[arg(long)]
    pub tail: Option<String>,

    /// Request server-side timestamp annotation
    #[arg(long)]
    pub timestamps: bool,

    /// Print lines to stdout instead of opening the viewer
    #[arg(long)]
    pub headless: bool,

    /// Start the viewer with this search term active
    #[arg(short, long)]
    pub search: Option<String>,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,
}

fn parse_tail(raw: &str) -> Result<TailDepth, String> {
    if raw == "all" {
        return Ok(TailDepth::All);
    }
    raw.parse::<u32>()
        .map(TailDepth::Lines)
        .map_err(|_| format!("invalid tail value '{raw}': expected a number or \"all\""))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Defaults -> config file -> env vars -> CLI args.
    let config = {
        let file = wstail::config::load_config_with_precedence(args.config.clone())?;
        let merged = wstail::config::merge_config(file);
        let with_env = wstail::config::apply_env_overrides(merged);
        let timestamps_override = if args.timestamps { Some(true) } else { None };
        wstail::config::apply_cli_overrides(with_env, args.tail.clone(), timestamps_override)
    };

    wstail::logging::init(&config.log_file_path)?;
    info!(config = ?config, url = %args.url, "configuration resolved");

    let tail = parse_tail(&config.tail)?;
    let endpoint = StreamEndpoint::from_http_base(&args.url, tail, config.timestamps)?;
    let auth = match &args.token {
        Some(token) => AuthContext::Bearer(token.clone()),
        None => AuthContext::Ambient,
    };
    let gate = ConnectGate::new();

    let runtime = tokio::runtime::Runtime::new()?;

    if args.headless {
        let connection = {
            let _guard = runtime.enter();
            StreamConnection::open(&endpoint, &auth, &gate)?
        };
        runtime.block_on(wstail::headless::run(connection))?;
    } else {
        let _guard = runtime.enter();
        let connection = StreamConnection::open(&endpoint, &auth, &gate)?;
        let mut app = wstail::view::TuiApp::new(connection, endpoint, auth, gate, config.overscan)?;
        if let Some(term) = args.search {
            app.seed_search(term);
        }
        app.run()?;
    }

    Ok(())
}
