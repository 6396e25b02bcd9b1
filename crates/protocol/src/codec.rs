//! The codec contract every wire-representable value implements
//!
//! Two layers:
//!
//! - [`EppCodec`]: encode to / decode from a [`CodecNode`]. Implemented by
//!   every record, from small sub-records up to the session messages.
//! - [`Element`]: an [`EppCodec`] value with a fixed `(namespace, tag)`
//!   identity. Object-mapping payloads and extensions are elements; the
//!   registries only ever deal with elements.
//!
//! [`AnyElement`] is the object-safe view of an [`Element`]. Envelopes hold
//! their polymorphic payloads as `Box<dyn AnyElement>`, which keeps value
//! equality and deep copy available without the envelope knowing the
//! concrete type.
//!
//! # Example
//!
//! ```
//! use eppkit_protocol::codec::{Element, EppCodec};
//! use eppkit_protocol::error::{DecodeError, EncodeError};
//! use eppkit_protocol::node::CodecNode;
//! use eppkit_protocol::service::ServiceDescriptor;
//!
//! const HOST: ServiceDescriptor =
//!     ServiceDescriptor::new("host", "urn:ietf:params:xml:ns:host-1.0", "host-1.0.xsd");
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct HostDelete {
//!     name: String,
//! }
//!
//! impl EppCodec for HostDelete {
//!     fn encode(&self) -> Result<CodecNode, EncodeError> {
//!         if self.name.is_empty() {
//!             return Err(EncodeError::MissingField("name"));
//!         }
//!         Ok(HOST
//!             .root_element("delete")
//!             .with_child(HOST.element("name").with_text(&self.name)))
//!     }
//!
//!     fn decode(node: &CodecNode) -> Result<Self, DecodeError> {
//!         Self::expect_root(node)?;
//!         Ok(Self { name: node.required_text(HOST.uri(), "name")?.to_owned() })
//!     }
//! }
//!
//! impl Element for HostDelete {
//!     const SERVICE: ServiceDescriptor = HOST;
//!     const TAG: &'static str = "delete";
//! }
//!
//! let cmd = HostDelete { name: "ns1.example.com".into() };
//! assert_eq!(HostDelete::decode(&cmd.encode().unwrap()).unwrap(), cmd);
//! ```

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, DecodeResult, EncodeError};
use crate::node::CodecNode;
use crate::service::ServiceDescriptor;

/// Encode-to-node / decode-from-node
pub trait EppCodec: Sized {
    /// Encodes this value.
    ///
    /// Fails with [`EncodeError`] when a required field was never set.
    fn encode(&self) -> Result<CodecNode, EncodeError>;

    /// Decodes a value from `node`.
    ///
    /// Fails when the node's identity does not match or a required child
    /// is missing.
    fn decode(node: &CodecNode) -> Result<Self, DecodeError>;
}

/// An [`EppCodec`] value with a fixed namespace-qualified identity
pub trait Element: EppCodec + Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Namespace this element belongs to
    const SERVICE: ServiceDescriptor;

    /// Local name of the root element
    const TAG: &'static str;

    /// Checks that `node` is this element's root
    fn expect_root(node: &CodecNode) -> DecodeResult<()> {
        node.expect(Self::SERVICE.uri(), Self::TAG)
    }
}

/// Object-safe view of an [`Element`]
///
/// Implemented for every [`Element`] by a blanket impl; never implement it
/// by hand.
pub trait AnyElement: fmt::Debug + Send + Sync {
    fn service(&self) -> ServiceDescriptor;

    fn tag(&self) -> &'static str;

    fn encode_node(&self) -> Result<CodecNode, EncodeError>;

    fn clone_box(&self) -> Box<dyn AnyElement>;

    fn eq_dyn(&self, other: &dyn AnyElement) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn type_name(&self) -> &'static str;
}

impl<T: Element> AnyElement for T {
    fn service(&self) -> ServiceDescriptor {
        T::SERVICE
    }

    fn tag(&self) -> &'static str {
        T::TAG
    }

    fn encode_node(&self) -> Result<CodecNode, EncodeError> {
        self.encode()
    }

    fn clone_box(&self) -> Box<dyn AnyElement> {
        Box::new(self.clone())
    }

    fn eq_dyn(&self, other: &dyn AnyElement) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl dyn AnyElement {
    /// Returns true if the concrete type is `T`
    pub fn is<T: Element>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Element>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Unboxes into `T`; `None` (dropping the value) on a type mismatch
    pub fn downcast<T: Element>(self: Box<Self>) -> Option<T> {
        self.into_any().downcast::<T>().ok().map(|b| *b)
    }
}

impl Clone for Box<dyn AnyElement> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl PartialEq for Box<dyn AnyElement> {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref().eq_dyn(other.as_ref())
    }
}

/// Decodes `node` as `T` and boxes it; the shape stored in registries
pub fn decode_boxed<T: Element>(node: &CodecNode) -> DecodeResult<Box<dyn AnyElement>> {
    T::decode(node).map(|value| Box::new(value) as Box<dyn AnyElement>)
}

/// Parses a text value, naming the field in the error
pub fn parse_value<T: FromStr>(field: &str, value: &str) -> DecodeResult<T> {
    value.trim().parse().map_err(|_| DecodeError::InvalidValue {
        field: field.to_owned(),
        value: value.to_owned(),
    })
}

/// Parses an XML Schema boolean (`true`, `false`, `1`, `0`)
pub fn parse_bool(field: &str, value: &str) -> DecodeResult<bool> {
    match value.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(DecodeError::InvalidValue {
            field: field.to_owned(),
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST: ServiceDescriptor = ServiceDescriptor::new("t", "urn:test:t-1.0", "t-1.0.xsd");

    #[derive(Debug, Clone, PartialEq)]
    struct Ping {
        seq: u32,
    }

    impl EppCodec for Ping {
        fn encode(&self) -> Result<CodecNode, EncodeError> {
            Ok(TEST.element("ping").with_attribute("seq", self.seq.to_string()))
        }

        fn decode(node: &CodecNode) -> DecodeResult<Self> {
            Self::expect_root(node)?;
            Ok(Self {
                seq: parse_value("seq", node.required_attribute("seq")?)?,
            })
        }
    }

    impl Element for Ping {
        const SERVICE: ServiceDescriptor = TEST;
        const TAG: &'static str = "ping";
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Pong;

    impl EppCodec for Pong {
        fn encode(&self) -> Result<CodecNode, EncodeError> {
            Ok(TEST.element("pong"))
        }

        fn decode(node: &CodecNode) -> DecodeResult<Self> {
            Self::expect_root(node).map(|_| Pong)
        }
    }

    impl Element for Pong {
        const SERVICE: ServiceDescriptor = TEST;
        const TAG: &'static str = "pong";
    }

    #[test]
    fn test_dyn_equality_and_clone() {
        let a: Box<dyn AnyElement> = Box::new(Ping { seq: 1 });
        let b = a.clone();
        let c: Box<dyn AnyElement> = Box::new(Ping { seq: 2 });
        let d: Box<dyn AnyElement> = Box::new(Pong);

        assert!(a.eq_dyn(b.as_ref()));
        assert!(!a.eq_dyn(c.as_ref()));
        assert!(!a.eq_dyn(d.as_ref()));
        assert!(a == b && a != c);
    }

    #[test]
    fn test_downcast() {
        let boxed: Box<dyn AnyElement> = Box::new(Ping { seq: 7 });
        assert!(boxed.is::<Ping>());
        assert!(boxed.downcast_ref::<Pong>().is_none());
        assert_eq!(boxed.downcast_ref::<Ping>(), Some(&Ping { seq: 7 }));

        assert_eq!(boxed.clone().downcast::<Ping>(), Some(Ping { seq: 7 }));
        assert_eq!(boxed.downcast::<Pong>(), None);
    }

    #[test]
    fn test_identity_through_trait_object() {
        let boxed: Box<dyn AnyElement> = Box::new(Pong);
        assert_eq!(boxed.service(), TEST);
        assert_eq!(boxed.tag(), "pong");
    }

    #[test]
    fn test_decode_boxed_checks_identity() {
        let node = Pong.encode().unwrap();
        assert!(decode_boxed::<Pong>(&node).is_ok());
        assert!(matches!(
            decode_boxed::<Ping>(&node),
            Err(DecodeError::UnexpectedElement { .. })
        ));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_value::<u32>("count", " 5 ").unwrap(), 5);
        assert!(parse_value::<u32>("count", "five").is_err());
        assert!(parse_bool("avail", "1").unwrap());
        assert!(!parse_bool("avail", "false").unwrap());
        assert!(parse_bool("avail", "yes").is_err());
    }
}
