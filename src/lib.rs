//! # eppkit
//!
//! Client runtime for the Extensible Provisioning Protocol (RFC 5730):
//! - Codec contract and element tree for EPP documents
//! - Namespace-keyed registries for object mappings and extensions
//! - Command / response envelopes with result classification
//! - Sessions in sync or pipelined mode, and a session pool
//!
//! ## Components
//!
//! - `eppkit-protocol`: codec contract, registries, envelope model, framing
//! - `eppkit-client`: sessions, session pool, transports
//!
//! Object mappings (domain, contact, host, ...) and extensions live outside
//! this crate; they implement `protocol::Element` and are registered in a
//! `protocol::Registry`.

pub use eppkit_client as client;
pub use eppkit_protocol as protocol;
