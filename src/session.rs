//! One interactive client session.
//!
//! `Connecting -> AwaitingUsername -> Active -> Terminating -> Closed`. While
//! active, the input loop sends what the user types and a [`SyncAgent`] task
//! polls for everybody else's messages. Both share one connection.

use std::io::ErrorKind;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::{connect_to_server, ChatClient, RpcSystemHandle};
use crate::config::ClientConfig;
use crate::console::Console;
use crate::datatypes::{Message, Username};
use crate::error::SessionError;
use crate::sync::SyncAgent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingUsername,
    Active,
    Terminating,
    Closed,
}

/// What a line of user input asks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Exit,
    Skip,
    Send(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "exit" => Command::Exit,
            "" => Command::Skip,
            content => Command::Send(content.to_owned()),
        }
    }
}

pub struct Session<C: Console> {
    state: SessionState,
    config: ClientConfig,
    client: ChatClient,
    rpc: RpcSystemHandle,
    console: C,
}

impl<C: Console> Session<C> {
    /// Failing to reach the server is fatal: no session is created.
    pub async fn connect(config: ClientConfig, mut console: C) -> Result<Self, SessionError> {
        log::debug!("Session {:?}: dialing {}", SessionState::Connecting, config.address);

        let (rpc, client) = connect_to_server(config.address, config.call_timeout)
            .await
            .map_err(SessionError::Connect)?;

        console.notice("Connected to server\n");

        let mut session = Self {
            state: SessionState::Connecting,
            config,
            client,
            rpc,
            console,
        };
        session.transition(SessionState::AwaitingUsername);
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drives the session to [`SessionState::Closed`], reading user input
    /// from `input`. Ends on `exit`, end of input, or a read error.
    pub async fn run(&mut self, input: impl AsyncBufRead + Unpin) -> Result<(), SessionError> {
        let mut lines = input.lines();

        let username = match self.read_username(&mut lines).await {
            Ok(username) => username,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };
        self.console.notice("Type 'exit' to quit.\n");
        self.transition(SessionState::Active);

        let shutdown = CancellationToken::new();
        let (sent_tx, sent_rx) = mpsc::channel(16);
        let agent = SyncAgent::new(self.client.clone(), self.console.clone(), username.clone(), self.config.poll_interval);
        let agent = tokio::spawn(agent.run(sent_rx, shutdown.clone()));

        let result = self.read_eval_loop(&mut lines, &username, &sent_tx).await;

        self.transition(SessionState::Terminating);
        shutdown.cancel();
        match agent.await {
            Ok(cursor) => log::debug!("Sync agent stopped after {} messages", cursor.last_seen()),
            Err(e) => log::warn!("Sync agent failed: {e}"),
        }
        self.close();

        result
    }

    async fn read_username<R: AsyncBufRead + Unpin>(&mut self, lines: &mut Lines<R>) -> Result<Username, SessionError> {
        self.console.prompt("Enter your username: ");

        let line = lines.next_line().await.map_err(SessionError::Input)?;
        match line.as_deref().map(str::trim) {
            Some(username) if !username.is_empty() => Ok(username.to_owned()),
            _ => Err(SessionError::EmptyUsername),
        }
    }

    async fn read_eval_loop<R: AsyncBufRead + Unpin>(
        &mut self,
        lines: &mut Lines<R>,
        username: &str,
        sent: &mpsc::Sender<Vec<Message>>,
    ) -> Result<(), SessionError> {
        loop {
            self.console.prompt(&format!("{username}: "));

            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    log::warn!("Error reading input: {e}");
                    continue;
                }
                Err(e) => return Err(SessionError::Input(e)),
            };

            match Command::parse(&line) {
                Command::Exit => {
                    self.console.notice("Goodbye!");
                    return Ok(());
                }
                Command::Skip => continue,
                Command::Send(content) => match self.client.send_message(username, &content).await {
                    Ok(history) => {
                        let _ = sent.send(history).await;
                    }
                    Err(e) => {
                        log::warn!("Error sending message: {e}");
                        self.console.notice("Server may be down.");
                    }
                },
            }
        }
    }

    fn close(&mut self) {
        self.rpc.abort();
        self.transition(SessionState::Closed);
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!("Session {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
