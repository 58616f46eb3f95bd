//! Client identities.
//!
//! A client is addressed by the source port of its connection. Assigning
//! identities this way needs no coordination, but a port can be reused by a
//! later connection once the first one has gone away, and the remote side
//! chooses it. Callers must not treat a [`ClientId`] as a credential.

use std::fmt;

/// Errors produced while deriving a [`ClientId`] from a remote address.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The address has no `host:port` shape.
    #[error("error reading the address: {0}")]
    Malformed(String),

    /// The port component is not a base-10 port number.
    #[error("error converting port: {0}")]
    InvalidPort(String),
}

/// Identity of a connected client, derived from its remote source port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(u16);

impl ClientId {
    /// Wraps a raw port number.
    #[must_use]
    pub const fn new(port: u16) -> Self {
        Self(port)
    }

    /// Returns the underlying port number.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Resolves the identity of a connection from its remote address.
    ///
    /// The address is split on its last `:`; the trailing component must be
    /// a base-10 port number. IPv6 peers (`[::1]:5000`) therefore resolve to
    /// their port as well.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Malformed`] when the address contains no `:`
    /// and [`AddressError::InvalidPort`] when the port does not parse.
    pub fn from_remote_addr(addr: &str) -> Result<Self, AddressError> {
        let Some((_host, port)) = addr.rsplit_once(':') else {
            return Err(AddressError::Malformed(addr.to_string()));
        };
        port.parse::<u16>()
            .map(Self)
            .map_err(|_| AddressError::InvalidPort(port.to_string()))
    }

    /// Parses a relay destination token.
    ///
    /// Malformed tokens yield `None`; the hub reports them the same way as a
    /// well-formed identity that is not registered.
    #[must_use]
    pub fn from_token(token: &[u8]) -> Option<Self> {
        std::str::from_utf8(token).ok()?.parse::<u16>().ok().map(Self)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for ClientId {
    fn from(port: u16) -> Self {
        Self(port)
    }
}
