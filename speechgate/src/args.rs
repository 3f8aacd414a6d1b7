use std::path::PathBuf;

use clap::Parser;

/// Speech generation gateway
#[derive(Debug, Parser)]
#[command(name = "speechgate", about = "HTTP gateway for cloud, neural and offline text-to-speech")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "speechgate.toml", env = "SPEECHGATE_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "SPEECHGATE_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,
}
