//! # eppkit protocol
//!
//! Core protocol machinery for the Extensible Provisioning Protocol.
//!
//! This crate provides:
//! - `EppCodec` / `Element`: the codec contract every wire type implements
//! - `CodecNode`: the element tree codecs produce and consume, with its XML
//!   reader and writer
//! - `ServiceDescriptor`: static namespace identity
//! - `MappingRegistry` / `ExtensionRegistry`: two-level namespace → tag
//!   dispatch for object mappings and extensions
//! - `Command` / `Response`: the envelope model
//! - `Greeting`, `Hello`, `Login`, `Logout`, `Poll`: session-level messages
//! - RFC 5734 framing, the session state machine and the `Transport` trait
//!
//! ## Example
//!
//! ```
//! use eppkit_protocol::{
//!     Element, EppCodec, CodecNode, DecodeError, EncodeError, MappingModule, Registry,
//!     ServiceDescriptor, Command,
//! };
//!
//! const HOST: ServiceDescriptor =
//!     ServiceDescriptor::new("host", "urn:ietf:params:xml:ns:host-1.0", "host-1.0.xsd");
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct HostInfo {
//!     name: String,
//! }
//!
//! impl EppCodec for HostInfo {
//!     fn encode(&self) -> Result<CodecNode, EncodeError> {
//!         Ok(HOST
//!             .root_element("info")
//!             .with_child(HOST.element("name").with_text(&self.name)))
//!     }
//!
//!     fn decode(node: &CodecNode) -> Result<Self, DecodeError> {
//!         Self::expect_root(node)?;
//!         Ok(Self { name: node.required_text(HOST.uri(), "name")?.to_owned() })
//!     }
//! }
//!
//! impl Element for HostInfo {
//!     const SERVICE: ServiceDescriptor = HOST;
//!     const TAG: &'static str = "info";
//! }
//!
//! let mut registry = Registry::new();
//! registry
//!     .register_mapping(MappingModule::new(HOST).with_command::<HostInfo>().unwrap())
//!     .unwrap();
//!
//! let command = Command::new(HostInfo { name: "ns1.example.com".into() })
//!     .with_client_trans_id("ABC-12345");
//! let xml = command.to_document().unwrap();
//!
//! let decoded = Command::decode(&CodecNode::parse(&xml).unwrap(), &registry).unwrap();
//! assert_eq!(decoded, command);
//! ```

pub mod codec;
pub mod envelope;
pub mod error;
pub mod extension;
pub mod framing;
pub mod messages;
pub mod node;
pub mod registry;
pub mod service;
pub mod services;
pub mod state;
pub mod transport;

pub use codec::{AnyElement, Element, EppCodec};
pub use envelope::{
    ClientMessage, Command, CommandBody, EppResult, ExtValue, MessageQueue, ObjectCommand,
    Response, ResultCode, ServerMessage, TransId,
};
pub use error::{
    CommandError, DecodeError, DecodeResult, DispatchError, EncodeError, EncodeResult,
    FrameError, NegotiationError, RegistryError, StateError,
};
pub use extension::{ExtensionEntry, ExtensionList, ExtensionRegistry};
pub use framing::{encode_frame, FrameDecoder, DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_SIZE};
pub use messages::{Greeting, Hello, Login, Logout, Poll, PollOp};
pub use node::CodecNode;
pub use registry::{
    Constructor, ExtensionModule, MappingModule, MappingRegistry, NamespaceModule, Registry, Side,
};
pub use service::{ServiceDescriptor, EPP};
pub use services::{negotiate, LoginServices, EPP_VERSION};
pub use state::SessionState;
pub use transport::Transport;

/// Identifier of one client session
///
/// Local to the process; never sent on the wire. Used to correlate log
/// lines and pool bookkeeping.
pub type SessionId = uuid::Uuid;
