//! The `relay` command.
//!
//! Wire form: `relay|users=<id1>;<id2>;...,body=<text>`. The users field and
//! the body field are separated by the only `,` allowed in the frame, so the
//! body itself cannot contain a comma.

use crate::identity::ClientId;

/// Maximum number of destinations a single relay may name.
pub const MAX_RECEIVERS: usize = 255;

/// Maximum relay body length in bytes.
pub const MAX_BODY_SIZE: usize = 1_024_000;

const RELAY_PREFIX: &[u8] = b"relay|";
const USERS_PREFIX: &[u8] = b"users=";
const BODY_PREFIX: &[u8] = b"body=";
const DELIVERY_SEPARATOR: &[u8] = b"-> ";
const NOT_FOUND_PREFIX: &[u8] = b"userid not found: ";

/// Reasons a relay request is rejected.
///
/// The `Display` text of each variant is the reply sent back to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The frame does not split into exactly two comma-separated fields.
    #[error("relay message should contain users and body fields")]
    FieldCount,

    /// The first field does not start with `users=`.
    #[error("relay message should contain users field")]
    MissingUsers,

    /// The second field does not start with `body=`.
    #[error("relay message should contain a body field")]
    MissingBody,

    /// The users field names no destination at all.
    #[error("unexpected message format")]
    NoDestinations,

    /// More than [`MAX_RECEIVERS`] destinations.
    #[error("max receivers per message exceeded")]
    TooManyReceivers,

    /// Body longer than [`MAX_BODY_SIZE`] bytes.
    #[error("message body can't exceed 1024kb")]
    BodyTooLarge,
}

/// A validated relay request, borrowing from the inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest<'a> {
    /// Destination tokens in the order they were written. Not yet resolved.
    pub destinations: Vec<&'a [u8]>,
    /// Payload forwarded to every destination.
    pub body: &'a [u8],
}

impl<'a> RelayRequest<'a> {
    /// Validates a frame that starts with `relay`.
    ///
    /// Checks run in a fixed order and the first failure wins, so a frame
    /// with several problems always reports the same one.
    ///
    /// # Errors
    ///
    /// Returns the [`RelayError`] for the first failed check.
    pub fn parse(frame: &'a [u8]) -> Result<Self, RelayError> {
        let rest = frame.strip_prefix(RELAY_PREFIX).unwrap_or(frame);

        let fields: Vec<&[u8]> = rest.split(|&b| b == b',').collect();
        let &[users, body] = fields.as_slice() else {
            return Err(RelayError::FieldCount);
        };
        let users = users
            .strip_prefix(USERS_PREFIX)
            .ok_or(RelayError::MissingUsers)?;
        let body = body.strip_prefix(BODY_PREFIX).ok_or(RelayError::MissingBody)?;

        if users.is_empty() {
            return Err(RelayError::NoDestinations);
        }
        let destinations: Vec<&[u8]> = users.split(|&b| b == b';').collect();
        if destinations.len() > MAX_RECEIVERS {
            return Err(RelayError::TooManyReceivers);
        }
        if body.len() > MAX_BODY_SIZE {
            return Err(RelayError::BodyTooLarge);
        }

        Ok(Self { destinations, body })
    }
}

/// Builds the frame delivered to a relay destination: `"<sender>-> <body>"`.
#[must_use]
pub fn delivery_frame(sender: ClientId, body: &[u8]) -> Vec<u8> {
    let sender = sender.to_string();
    let mut frame = Vec::with_capacity(sender.len() + DELIVERY_SEPARATOR.len() + body.len());
    frame.extend_from_slice(sender.as_bytes());
    frame.extend_from_slice(DELIVERY_SEPARATOR);
    frame.extend_from_slice(body);
    frame
}

/// Builds the reply for a destination token that is not registered.
#[must_use]
pub fn not_found_reply(token: &[u8]) -> Vec<u8> {
    [NOT_FOUND_PREFIX, token].concat()
}
