//! Relayhub server library.
//!
//! Exposes the hub for use in tests and embedding. Clients connect over
//! WebSocket, are registered under the source port of their connection and
//! exchange short text messages through a single serialized event loop.

pub mod client;
pub mod config;
pub mod connection;
pub mod hub;
pub mod registry;
pub mod server;
