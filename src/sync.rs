//! Pull-based delivery of the shared log to one client.
//!
//! The [`SyncAgent`] polls the full history on a timer and shows only what its
//! [`Cursor`] has not seen yet. The cursor lives inside the agent's task and
//! nothing else touches it: the input loop reports the log returned by its own
//! sends over a channel instead of moving the cursor itself.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::ChatClient;
use crate::console::Console;
use crate::datatypes::Message;
use crate::error::RpcError;
use crate::service::ChatService;

/// Anything that can hand out the full chat history.
pub trait HistorySource: Send + Sync + 'static {
    fn history(&self, username: &str) -> impl Future<Output = Result<Vec<Message>, RpcError>> + Send;
}

impl HistorySource for ChatClient {
    async fn history(&self, username: &str) -> Result<Vec<Message>, RpcError> {
        self.get_history(username).await
    }
}

impl HistorySource for ChatService {
    async fn history(&self, username: &str) -> Result<Vec<Message>, RpcError> {
        Ok(self.get_history(username))
    }
}

/// How many messages of the log a client has already shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    last_seen: usize,
}

impl Cursor {
    /// A cursor that treats the first `last_seen` messages as already shown.
    pub fn at(last_seen: usize) -> Self {
        Self { last_seen }
    }

    pub fn last_seen(&self) -> usize {
        self.last_seen
    }

    /// Returns the part of `history` past the cursor and moves the cursor to
    /// its end. A history no longer than what was already seen yields nothing;
    /// one that is shorter should not come out of a fresh read and is logged.
    pub fn advance<'a>(&mut self, history: &'a [Message]) -> &'a [Message] {
        if history.len() < self.last_seen {
            log::warn!("History shrank from {} to {} messages, ignoring it", self.last_seen, history.len());
        }
        self.catch_up(history)
    }

    /// Same as [`Cursor::advance`] for a history that may be older than the
    /// cursor, such as a send reply overtaken by a poll. Older ones yield
    /// nothing.
    pub fn catch_up<'a>(&mut self, history: &'a [Message]) -> &'a [Message] {
        if history.len() <= self.last_seen {
            return &[];
        }

        let fresh = &history[self.last_seen..];
        self.last_seen = history.len();
        fresh
    }
}

pub struct SyncAgent<S, C> {
    source: S,
    console: C,
    username: String,
    interval: Duration,
    cursor: Cursor,
}

impl<S: HistorySource, C: Console> SyncAgent<S, C> {
    pub fn new(source: S, console: C, username: impl Into<String>, interval: Duration) -> Self {
        Self {
            source,
            console,
            username: username.into(),
            interval,
            cursor: Cursor::default(),
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// One polling tick. Returns how many messages were shown.
    pub async fn poll(&mut self) -> Result<usize, RpcError> {
        let history = self.source.history(&self.username).await?;
        Ok(self.show(&history, false))
    }

    /// Takes in the log returned by this client's own send. Its last message
    /// is the one just typed, which the terminal already shows, so only the
    /// messages that landed before it are rendered.
    pub fn acknowledge_sent(&mut self, history: &[Message]) -> usize {
        self.show(history, true)
    }

    fn show(&mut self, history: &[Message], skip_own: bool) -> usize {
        let fresh = if skip_own {
            let fresh = self.cursor.catch_up(history);
            fresh.split_last().map_or(fresh, |(_, before)| before)
        } else {
            self.cursor.advance(history)
        };

        if !fresh.is_empty() {
            self.console.render(fresh, &self.username);
        }
        fresh.len()
    }

    /// Polls until `shutdown` fires. The first tick is immediate, so whatever
    /// is already in the log is shown right away. Failed polls are skipped;
    /// the next tick tries again.
    pub async fn run(mut self, mut sent: mpsc::Receiver<Vec<Message>>, shutdown: CancellationToken) -> Cursor {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                Some(history) = sent.recv() => {
                    self.acknowledge_sent(&history);
                }
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        polled = self.poll() => {
                            if let Err(e) = polled {
                                log::debug!("Skipping poll: {e}");
                            }
                        }
                    }
                }
            }
        }

        self.cursor
    }
}
