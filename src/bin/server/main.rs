use std::net::SocketAddr;
use std::sync::Arc;

use chat::config::DEFAULT_ADDR;
use chat::server::Server;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(about = "Chat server keeping one shared message log")]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(short, long, default_value = DEFAULT_ADDR)]
    pub address: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = ServerArgs::parse();

    let server = Arc::new(Server::default());
    server.set_interrupt_handler();

    println!("Chat server running on port {}...", args.address.port());

    match server.listen(args.address).await {
        Ok(()) => println!("Server stopped."),
        Err(e) => eprintln!("Server shutdown with error: {e}"),
    }

    Ok(())
}
