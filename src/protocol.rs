//! Wire types shared by the server and the client.
//!
//! Every frame on the connection carries one bincode encoded [`Envelope`].
//! Responses echo the `seq` of the request they answer, so several calls can
//! be in flight on one connection.

use bytes::{Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::datatypes::{Message, Username};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    SendMessage { username: Username, content: String },
    /// `username` is carried for symmetry with `SendMessage` and ignored.
    GetHistory { username: Username },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    History(Vec<Message>),
}

impl Response {
    pub fn into_history(self) -> Vec<Message> {
        match self {
            Response::History(messages) => messages,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub seq: u64,
    pub body: T,
}

pub fn encode<T: Serialize>(envelope: &Envelope<T>) -> Result<Bytes, bincode::Error> {
    Ok(Bytes::from(bincode::serialize(envelope)?))
}

pub fn decode<T: DeserializeOwned>(frame: &BytesMut) -> Result<Envelope<T>, bincode::Error> {
    bincode::deserialize(frame)
}
