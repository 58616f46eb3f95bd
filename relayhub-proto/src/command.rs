//! Classification of inbound frames.
//!
//! Frames are compared as raw bytes: `id` and `list` must match exactly,
//! `relay` is a prefix. Anything else is unrecognized.

use crate::identity::ClientId;
use crate::relay::{RelayError, RelayRequest};

/// Reply sent for frames that match no command.
pub const COMMAND_NOT_RECOGNIZED: &[u8] = b"command not recognized";

const LIST_HEADER: &str = "users list: \n";

/// A classified inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    /// `id`: the sender asks for its own identity.
    Identity,
    /// `list`: the sender asks for every other connected identity.
    List,
    /// A frame starting with `relay`, validated or rejected.
    Relay(Result<RelayRequest<'a>, RelayError>),
    /// Anything else.
    Unrecognized,
}

impl<'a> Command<'a> {
    /// Classifies a frame. Never fails: malformed input becomes
    /// [`Command::Unrecognized`] or a rejected [`Command::Relay`].
    #[must_use]
    pub fn parse(frame: &'a [u8]) -> Self {
        match frame {
            b"id" => Self::Identity,
            b"list" => Self::List,
            f if f.starts_with(b"relay") => Self::Relay(RelayRequest::parse(f)),
            _ => Self::Unrecognized,
        }
    }
}

/// Reply to `id`: the identity in decimal.
#[must_use]
pub fn identity_reply(id: ClientId) -> Vec<u8> {
    id.to_string().into_bytes()
}

/// Reply to `list`: a header line followed by one `"<index>) <id>"` line per
/// identity, indexed from zero.
#[must_use]
pub fn list_reply(ids: &[ClientId]) -> Vec<u8> {
    let mut reply = String::from(LIST_HEADER);
    for (i, id) in ids.iter().enumerate() {
        reply.push_str(&format!("{i}) {id}\n"));
    }
    reply.into_bytes()
}
