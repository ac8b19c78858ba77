use std::io::{stdout, Write};

use crate::datatypes::Message;
use crate::message_log::MessageLog;
use crate::protocol::{Request, Response};
use crate::sync::Cursor;
use crate::util::Handle;

/// The two remote procedures over the shared log. Cloning shares the log.
#[derive(Clone)]
pub struct ChatService {
    log: MessageLog,
    /// How much of the log has been written to the operator console.
    announced: Handle<Cursor>,
}

impl Default for ChatService {
    fn default() -> Self {
        Self::new(MessageLog::default())
    }
}

impl ChatService {
    /// Messages already in `log` are not announced on the console.
    pub fn new(log: MessageLog) -> Self {
        let announced = Handle::from(Cursor::at(log.len()));
        Self { log, announced }
    }

    /// Appends the message and returns the whole log including it.
    ///
    /// Content is not validated here: an empty message that reaches the
    /// server is stored like any other. Clients skip blank lines themselves.
    pub fn send_message(&self, username: &str, content: &str) -> Vec<Message> {
        let (_, messages) = self.log.append(username, content);
        self.announce(&messages, &mut stdout().lock());
        messages
    }

    /// Writes a console line for every message of `messages` not announced
    /// yet. Concurrent senders may get here in any order; the cursor keeps the
    /// lines in log order and prints each one once. The log lock is not held.
    fn announce(&self, messages: &[Message], out: &mut impl Write) {
        let mut announced = self.announced.lock();
        for message in announced.catch_up(messages) {
            let _ = writeln!(out, "{}", message.console_line());
        }
        let _ = out.flush();
    }

    /// Whole log. The username plays no part in the result.
    pub fn get_history(&self, _username: &str) -> Vec<Message> {
        self.log.snapshot()
    }

    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::SendMessage { username, content } => Response::History(self.send_message(&username, &content)),
            Request::GetHistory { username } => Response::History(self.get_history(&username)),
        }
    }
}
