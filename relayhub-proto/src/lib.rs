//! Wire protocol for the relayhub message hub.
//!
//! Everything in this crate is pure: it classifies inbound frames, validates
//! relay requests and builds reply payloads. Routing and I/O live in
//! `relayhub-server`.

pub mod command;
pub mod identity;
pub mod relay;
