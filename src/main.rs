use clap::Parser;
use log::{info, LevelFilter};

use chordrs::{Config, Node};

/// Starts a single Chord ring node: binds the listening address, joins the
/// ring (forming a new one if no bootstrap peer is given), then runs until
/// interrupted.
#[derive(Parser, Debug)]
#[command(name = "chordrs", about = "A Chord distributed hash table ring node")]
struct Cli {
    /// This node's own listening address, e.g. 127.0.0.1:7000. Also the
    /// input to this node's ring identifier (SHA-1 of the address).
    #[arg(long)]
    address: String,

    /// Address of an already-running node to join through. Omit to start a
    /// brand new single-node ring.
    #[arg(long)]
    bootstrap: Option<String>,

    /// Path to an optional INI file overriding the maintenance intervals
    /// and RPC timeout (see the `[maintenance]` section in `Config`).
    #[arg(long, default_value = "chordrs.ini")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    simple_logger::SimpleLogger::new()
        .env()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    let config = Config::from_ini_file(&cli.config);
    let node = Node::new(cli.address.clone(), config);

    node.start().await?;
    node.join(cli.bootstrap.clone()).await?;

    info!(
        "{} is in the ring, successor is {}",
        node.self_descriptor(),
        node.successor()
    );

    tokio::signal::ctrl_c().await?;
    info!("received shutdown signal");
    node.stop().await;

    Ok(())
}
