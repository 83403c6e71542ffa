use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use embercache::commands::Engine;
use embercache::config::Config;
use embercache::network::connection;

/// embercache - an in-memory, RESP-compatible key-value cache server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long, default_value = "embercache.toml")]
    config: PathBuf,

    /// Override the bind address (takes precedence over config file and CACHE_HOST)
    #[arg(long)]
    bind: Option<String>,

    /// Override the listen port (takes precedence over config file and CACHE_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    let config = Config::load(Some(&args.config), args.bind, args.port).unwrap_or_else(|e| {
        eprintln!("warning: failed to load config ({e}), using defaults");
        Config::default()
    });

    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .init();

    embercache::observability::metrics::init_metrics();

    info!("starting embercache server");
    info!("listening on {}", config.server_address());
    info!("max connections: {}", config.server.max_connections);

    let engine = Arc::new(Engine::new());
    let listener = TcpListener::bind(config.server_address()).await?;
    let connection_limit = Arc::new(tokio::sync::Semaphore::new(config.server.max_connections));

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let engine = Arc::clone(&engine);
                match Arc::clone(&connection_limit).try_acquire_owned() {
                    Ok(permit) => {
                        tokio::spawn(async move {
                            let _permit = permit;
                            info!("client connected: {addr}");
                            connection::handle_client(stream, engine).await;
                            info!("client disconnected: {addr}");
                        });
                    }
                    Err(_) => {
                        error!("max connections reached, rejecting client: {addr}");
                    }
                }
            }
            Err(e) => error!("accept error: {e}"),
        }
    }
}
