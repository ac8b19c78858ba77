use std::net::SocketAddr;
use std::time::Duration;

use chat::config::{ClientConfig, DEFAULT_ADDR, DEFAULT_CALL_TIMEOUT, DEFAULT_POLL_INTERVAL};
use chat::console::StdoutConsole;
use chat::session::Session;
use clap::Parser;
use tokio::io::BufReader;

#[derive(Parser, Debug, Clone)]
#[command(about = "Interactive chat client")]
pub struct CliArgs {
    /// Server address
    #[arg(short, long, default_value = DEFAULT_ADDR)]
    pub address: SocketAddr,

    /// How often to poll the server for new messages
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: u64,

    /// Give up on a remote call after this long
    #[arg(long, default_value_t = DEFAULT_CALL_TIMEOUT.as_millis() as u64, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_ms: u64,
}

impl From<CliArgs> for ClientConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            address: args.address,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            call_timeout: Duration::from_millis(args.timeout_ms),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = ClientConfig::from(CliArgs::parse());

    let mut session = Session::connect(config, StdoutConsole).await?;
    session.run(BufReader::new(tokio::io::stdin())).await?;

    Ok(())
}
