use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::Notify;
use tokio::task::JoinSet;

use crate::error::RpcError;
use crate::protocol::{self, Envelope, Request};
use crate::service::ChatService;
use crate::util::{stream_to_rpc_network, RpcNetwork};

pub struct Server {
    interrupt: Notify,
    service: ChatService,
}

impl Default for Server {
    fn default() -> Self {
        Self::new(ChatService::default())
    }
}

impl Server {
    pub fn new(service: ChatService) -> Self {
        Self {
            interrupt: Notify::new(),
            service,
        }
    }

    pub async fn listen(self: Arc<Self>, addr: impl ToSocketAddrs) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Accepts connections until [`Server::interrupt`] is called, then aborts
    /// the connections still open.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.interrupt.notified() => {
                    log::info!("Stopping the listener.");
                    break;
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = listener.accept() => {
                    match accepted {
                        Err(e) => log::warn!("Failed to accept connection: {e}"),
                        Ok((stream, addr)) => {
                            connections.spawn(self.clone().process_connection(stream, addr));
                        }
                    };
                }
            }
        }

        log::info!("Aborting {} connections...", connections.len());
        connections.shutdown().await;

        Ok(())
    }

    async fn process_connection(self: Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        log::info!("Accepted connection from addr: {addr}");

        let network = stream_to_rpc_network(stream);
        match serve_requests(&self.service, network).await {
            Ok(()) => log::info!("Peer {addr} disconnected"),
            Err(e) => log::warn!("Peer {addr} dropped: {e}"),
        }
    }

    pub fn interrupt(&self) {
        self.interrupt.notify_one();
    }
}

/// Answers requests one at a time until the peer hangs up. A frame that does
/// not decode ends the connection, since nothing after it can be trusted.
async fn serve_requests(service: &ChatService, mut network: RpcNetwork) -> Result<(), RpcError> {
    while let Some(frame) = network.next().await {
        let request: Envelope<Request> = protocol::decode(&frame?)?;

        let response = Envelope {
            seq: request.seq,
            body: service.handle(request.body),
        };

        network.send(protocol::encode(&response)?).await?;
    }

    Ok(())
}

impl Server {
    pub fn set_interrupt_handler(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);

        let result = ctrlc::set_handler(
            move || match weak.upgrade() {
                Some(server) => server.interrupt(),
                None => eprintln!("Server no longer exists, nothing to interrupt."),
            }
        );

        match result {
            Ok(_) => {},

            Err(ctrlc::Error::NoSuchSignal(signal_type)) =>
                log::warn!("Signal {signal_type:?} not found, CTRL + C interrupt will not be handled gracefully."),

            Err(ctrlc::Error::MultipleHandlers) =>
                log::warn!("CTRL + C interrupt already has a handler, interrupt may not be handled gracefully."),

            Err(ctrlc::Error::System(err)) =>
                log::warn!("CTRL + C interrupt not set, interrupt may not be handled gracefully. Reason: {err}."),
        }
    }
}
