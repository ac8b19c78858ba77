//! The shared, append-only chat log.
//!
//! Every read and write goes through one mutex: [`MessageLog::append`] pushes
//! and copies out inside the same critical section, [`MessageLog::snapshot`]
//! copies out. Readers therefore only ever see prefixes of later states.

use chrono::{DateTime, Utc};

use crate::datatypes::Message;
use crate::util::Handle;

#[derive(Clone, Default)]
pub struct MessageLog {
    messages: Handle<Vec<Message>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message stamped with the current time and returns the
    /// assigned timestamp together with a copy of the log including it.
    ///
    /// Timestamps never go backwards in append order, even if the wall clock
    /// does.
    pub fn append(&self, username: impl Into<String>, content: impl Into<String>) -> (DateTime<Utc>, Vec<Message>) {
        let mut messages = self.messages.lock();

        let timestamp = next_timestamp(messages.last(), Utc::now());

        messages.push(Message {
            username: username.into(),
            content: content.into(),
            timestamp,
        });

        (timestamp, messages.clone())
    }

    /// Independent copy of the whole log.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `now`, unless the clock has stepped back behind `previous`.
fn next_timestamp(previous: Option<&Message>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(last) if last.timestamp > now => last.timestamp,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use chrono::TimeDelta;

    use super::*;

    #[test]
    fn timestamp_never_goes_backwards() {
        let now = Utc::now();
        let previous = Message {
            username: "alice".into(),
            content: "hi".into(),
            timestamp: now,
        };

        let earlier = now - TimeDelta::seconds(30);
        assert_eq!(next_timestamp(Some(&previous), earlier), now);

        let later = now + TimeDelta::seconds(1);
        assert_eq!(next_timestamp(Some(&previous), later), later);
        assert_eq!(next_timestamp(Some(&previous), now), now);
        assert_eq!(next_timestamp(None, earlier), earlier);
    }

    #[test]
    fn single_append_is_visible() {
        let log = MessageLog::new();
        assert!(log.is_empty());
        let (timestamp, after) = log.append("alice", "hi");
        assert!(!log.is_empty());

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].username, "alice");
        assert_eq!(snapshot[0].content, "hi");
        assert_eq!(snapshot[0].timestamp, timestamp);
        assert_eq!(after, snapshot);
    }

    #[test]
    fn appends_keep_arrival_order() {
        let log = MessageLog::new();
        log.append("alice", "hi");
        let (_, after) = log.append("bob", "yo");

        let snapshot = log.snapshot();
        let lines: Vec<_> = snapshot.iter().map(|m| (m.username.as_str(), m.content.as_str())).collect();
        assert_eq!(lines, vec![("alice", "hi"), ("bob", "yo")]);
        assert_eq!(after, snapshot);
        assert!(snapshot[0].timestamp <= snapshot[1].timestamp);
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let log = MessageLog::new();
        log.append("alice", "first");

        let before = log.snapshot();
        log.append("alice", "second");

        assert_eq!(before.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn repeated_reads_are_identical() {
        let log = MessageLog::new();
        log.append("alice", "hi");
        log.append("bob", "");

        assert_eq!(log.snapshot(), log.snapshot());
    }

    #[test]
    fn concurrent_appends_are_all_kept_once() {
        let log = MessageLog::new();

        let threads: Vec<_> = (0..50)
            .map(|i| {
                let log = log.clone();
                thread::spawn(move || {
                    log.append(format!("user-{i}"), format!("payload-{i}"));
                })
            })
            .collect();
        threads.into_iter().for_each(|t| t.join().unwrap());

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 50);

        let contents: HashSet<_> = snapshot.iter().map(|m| m.content.clone()).collect();
        assert_eq!(contents.len(), 50);
        for i in 0..50 {
            assert!(contents.contains(&format!("payload-{i}")));
        }
        assert!(snapshot.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn readers_only_see_growing_prefixes() {
        let log = MessageLog::new();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let log = log.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        log.append(format!("writer-{w}"), format!("{w}-{i}"));
                    }
                })
            })
            .collect();

        let reader = {
            let log = log.clone();
            thread::spawn(move || {
                let mut previous: Vec<Message> = Vec::new();
                for _ in 0..200 {
                    let current = log.snapshot();
                    assert!(current.len() >= previous.len());
                    assert_eq!(&current[..previous.len()], &previous[..]);
                    previous = current;
                }
            })
        };

        writers.into_iter().for_each(|t| t.join().unwrap());
        reader.join().unwrap();
        assert_eq!(log.len(), 400);
    }
}
