use std::io::{stdout, Write};

use crate::datatypes::Message;

/// Where a client session writes what the user sees. Clones write to the same
/// place: the input loop and the sync agent each hold one.
pub trait Console: Clone + Send + 'static {
    /// Shows freshly arrived messages, then restores `username`'s prompt.
    fn render(&mut self, messages: &[Message], username: &str);

    /// Writes `text` without a line break.
    fn prompt(&mut self, text: &str);

    fn notice(&mut self, text: &str);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn render(&mut self, messages: &[Message], username: &str) {
        let mut out = stdout().lock();

        // Wipe the half-typed prompt line before printing over it.
        let _ = write!(out, "\r\x1b[K");
        for message in messages {
            let _ = writeln!(out, "{message}");
        }
        let _ = write!(out, "{username}: ");
        let _ = out.flush();
    }

    fn prompt(&mut self, text: &str) {
        let mut out = stdout().lock();
        let _ = write!(out, "{text}");
        let _ = out.flush();
    }

    fn notice(&mut self, text: &str) {
        println!("{text}");
    }
}
