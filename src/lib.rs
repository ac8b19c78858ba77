//! A small polling chat: one server keeps an append-only message log, clients
//! send lines into it and poll the whole log to find what is new.

pub mod client;
pub mod config;
pub mod console;
pub mod datatypes;
pub mod error;
pub mod message_log;
pub mod protocol;
pub mod server;
pub mod service;
pub mod session;
pub mod sync;
pub mod util;
