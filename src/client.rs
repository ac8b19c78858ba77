//! Client end of the chat connection.
//!
//! One background task owns the socket. [`ChatClient`] handles are cheap to
//! clone and hand their calls to that task, which tags each request with a
//! sequence number and routes the matching response back. Every call is
//! bounded by the client's timeout.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};

use crate::datatypes::Message;
use crate::error::RpcError;
use crate::protocol::{self, Envelope, Request, Response};
use crate::util::{stream_to_rpc_network, RpcNetwork};

pub type RpcSystemHandle = tokio::task::JoinHandle<Result<(), RpcError>>;

struct Call {
    request: Request,
    reply: oneshot::Sender<Response>,
}

#[derive(Clone)]
pub struct ChatClient {
    calls: mpsc::Sender<Call>,
    timeout: Duration,
}

pub async fn connect_to_server(addr: SocketAddr, timeout: Duration) -> Result<(RpcSystemHandle, ChatClient), std::io::Error> {
    let stream = TcpStream::connect(addr).await?;
    let network = stream_to_rpc_network(stream);

    let (calls, pending_calls) = mpsc::channel(32);
    let rpc_handle = tokio::spawn(drive_connection(network, pending_calls));

    Ok((rpc_handle, ChatClient { calls, timeout }))
}

impl ChatClient {
    pub async fn send_message(&self, username: &str, content: &str) -> Result<Vec<Message>, RpcError> {
        let request = Request::SendMessage {
            username: username.to_owned(),
            content: content.to_owned(),
        };
        Ok(self.call(request).await?.into_history())
    }

    pub async fn get_history(&self, username: &str) -> Result<Vec<Message>, RpcError> {
        let request = Request::GetHistory {
            username: username.to_owned(),
        };
        Ok(self.call(request).await?.into_history())
    }

    async fn call(&self, request: Request) -> Result<Response, RpcError> {
        let exchange = async {
            let (reply, response) = oneshot::channel();
            self.calls
                .send(Call { request, reply })
                .await
                .map_err(|_| RpcError::Disconnected)?;

            response.await.map_err(|_| RpcError::Disconnected)
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| RpcError::Timeout(self.timeout))?
    }
}

/// Runs until every [`ChatClient`] is dropped or the server hangs up. Calls
/// still waiting when it stops see [`RpcError::Disconnected`].
async fn drive_connection(mut network: RpcNetwork, mut calls: mpsc::Receiver<Call>) -> Result<(), RpcError> {
    let mut pending: HashMap<u64, oneshot::Sender<Response>> = HashMap::new();
    let mut next_seq = 0u64;

    loop {
        tokio::select! {
            call = calls.recv() => {
                let Some(call) = call else { break };

                let seq = next_seq;
                next_seq += 1;

                let frame = match protocol::encode(&Envelope { seq, body: call.request }) {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::error!("Failed to encode call #{seq}: {e}");
                        continue;
                    }
                };

                // Callers that timed out are not coming back for their answer.
                pending.retain(|_, reply| !reply.is_closed());
                pending.insert(seq, call.reply);

                network.send(frame).await?;
            }
            frame = network.next() => {
                let Some(frame) = frame else { break };
                let response: Envelope<Response> = protocol::decode(&frame?)?;

                match pending.remove(&response.seq) {
                    Some(reply) => { let _ = reply.send(response.body); }
                    None => log::debug!("Dropping late response to call #{}", response.seq),
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::net::TcpListener;

    use super::*;
    use crate::message_log::MessageLog;
    use crate::server::Server;
    use crate::service::ChatService;

    async fn spawn_server() -> (Arc<Server>, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(Server::default());
        tokio::spawn(server.clone().serve(listener));
        (server, addr)
    }

    #[tokio::test]
    async fn send_then_history_over_tcp() {
        let (_server, addr) = spawn_server().await;
        let (_rpc, client) = connect_to_server(addr, Duration::from_secs(5)).await.unwrap();

        let reply = client.send_message("alice", "hi").await.unwrap();
        assert_eq!(reply.len(), 1);

        let history = client.get_history("whoever").await.unwrap();
        assert_eq!(history, reply);
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_connection() {
        let (_server, addr) = spawn_server().await;
        let (_rpc, client) = connect_to_server(addr, Duration::from_secs(5)).await.unwrap();

        let calls: Vec<_> = (0..20)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move { client.send_message("alice", &format!("msg-{i}")).await })
            })
            .collect();

        for call in calls {
            let reply = call.await.unwrap().unwrap();
            assert!(!reply.is_empty());
        }

        assert_eq!(client.get_history("alice").await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn history_larger_than_default_frame_cap() {
        let log = MessageLog::new();
        let line = "x".repeat(100 * 1024);
        for i in 0..90 {
            log.append(format!("user-{i}"), line.clone());
        }

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(Server::new(ChatService::new(log)));
        tokio::spawn(server.clone().serve(listener));

        let (_rpc, client) = connect_to_server(addr, Duration::from_secs(30)).await.unwrap();

        let history = client.get_history("alice").await.unwrap();
        assert_eq!(history.len(), 90);
        assert!(history.iter().all(|m| m.content.len() == 100 * 1024));

        let reply = client.send_message("alice", "still here").await.unwrap();
        assert_eq!(reply.len(), 91);
        assert_eq!(reply[90].content, "still here");
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold the socket without ever answering.
        let _peer = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let (_rpc, client) = connect_to_server(addr, Duration::from_millis(100)).await.unwrap();
        let result = client.get_history("alice").await;

        assert!(matches!(result, Err(RpcError::Timeout(_))));
    }

    #[tokio::test]
    async fn closed_peer_reports_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let peer = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let (rpc, client) = connect_to_server(addr, Duration::from_secs(5)).await.unwrap();
        peer.await.unwrap();
        let _ = rpc.await;

        let result = client.get_history("alice").await;
        assert!(matches!(result, Err(RpcError::Disconnected)));
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        assert!(connect_to_server(addr, Duration::from_secs(1)).await.is_err());
    }
}
