use clap::Parser;
use delver_dns_domain::CliOverrides;
use delver_dns_infrastructure::dns::{DnsServer, RecursiveResolver};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod bootstrap;

#[derive(Parser)]
#[command(name = "delver-dns")]
#[command(version)]
#[command(about = "Delver DNS - minimal recursive DNS resolver")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Listen port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// Root nameserver IPv4 address
    #[arg(short = 'r', long)]
    root: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        port: cli.port,
        bind_address: cli.bind.clone(),
        root_server: cli.root.clone(),
        log_level: cli.log_level.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config);

    info!("Starting Delver DNS v{}", env!("CARGO_PKG_VERSION"));

    let resolver = Arc::new(RecursiveResolver::new(&config.resolver)?);
    let server = DnsServer::bind(&config.server, resolver).await?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received ctrl-c, shutting down");
            signal_token.cancel();
        }
    });

    server.run(shutdown).await?;

    info!("Server shutdown complete");
    Ok(())
}
