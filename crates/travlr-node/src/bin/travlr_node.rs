use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use travlr_exchange::MemoryNetwork;
use travlr_node::http::ApiServer;
use travlr_node::{demo, logging, Node, NodeConfig};

/// Command line options for the node binary.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port for the HTTP API, overriding the config
    #[arg(long)]
    port: Option<u16>,

    /// Run the access walkthrough and exit
    #[arg(long, default_value_t = false)]
    demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = NodeConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(port) = cli.port {
        config.api.set_port(port);
    }
    logging::init(&config.logging.level);

    // Peers are reachable in-process only.
    let network = MemoryNetwork::new();
    let node = Arc::new(
        Node::open(config, Arc::new(network.join().await))
            .await
            .context("opening node")?,
    );
    tracing::info!(peer = %node.peer_id(), "node identity");

    if cli.demo {
        let report = demo::run(&node).await.context("running demo")?;
        tracing::info!(
            granted = report.granted,
            credential_valid = report.credential_valid,
            after_revoke = report.after_revoke,
            "demo finished"
        );
        return Ok(());
    }

    node.start().await.context("starting node")?;

    // Returns once the server has drained after SIGINT/SIGTERM.
    ApiServer::bind(Arc::clone(&node))
        .context("binding HTTP API")?
        .run()
        .await
        .context("running HTTP API")?;

    tracing::info!("shutting down");
    node.stop().await.context("stopping node")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["test"]);
        assert!(cli.config.is_none());
        assert!(cli.port.is_none());
        assert!(!cli.demo);
    }

    #[test]
    fn custom_port_and_demo() {
        let cli = Cli::parse_from(["test", "--port", "8000", "--demo", "--config", "node.toml"]);
        assert_eq!(cli.port, Some(8000));
        assert!(cli.demo);
        assert_eq!(cli.config.unwrap().to_str(), Some("node.toml"));
    }
}
