//! Static identity of a protocol namespace.
//!
//! Every object mapping and extension module owns exactly one
//! [`ServiceDescriptor`]. It tags root elements during encode and keys the
//! registries during decode.

use crate::node::{CodecNode, XSI_NS};

/// `{prefix, uri, schema location}` triple of one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceDescriptor {
    prefix: &'static str,
    uri: &'static str,
    schema_location: &'static str,
}

impl ServiceDescriptor {
    pub const fn new(prefix: &'static str, uri: &'static str, schema_location: &'static str) -> Self {
        Self {
            prefix,
            uri,
            schema_location,
        }
    }

    #[inline]
    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    #[inline]
    pub fn uri(&self) -> &'static str {
        self.uri
    }

    #[inline]
    pub fn schema_location(&self) -> &'static str {
        self.schema_location
    }

    /// Value of the `xsi:schemaLocation` attribute for this namespace
    pub fn schema_location_value(&self) -> String {
        format!("{} {}", self.uri, self.schema_location)
    }

    /// Creates a prefixed element in this namespace
    pub fn element(&self, local: &str) -> CodecNode {
        CodecNode::new(Some(self.uri), Some(self.prefix), local)
    }

    /// Creates a prefixed root element carrying `xsi:schemaLocation`
    ///
    /// This is the shape of every object-mapping command and response root,
    /// e.g. `<domain:check xsi:schemaLocation="urn:...domain-1.0 domain-1.0.xsd">`.
    pub fn root_element(&self, local: &str) -> CodecNode {
        self.element(local).with_attribute_ns(
            XSI_NS,
            "xsi",
            "schemaLocation",
            self.schema_location_value(),
        )
    }
}

impl std::fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.prefix, self.uri)
    }
}

/// The EPP base namespace (RFC 5730)
pub const EPP: ServiceDescriptor =
    ServiceDescriptor::new("epp", "urn:ietf:params:xml:ns:epp-1.0", "epp-1.0.xsd");

/// Creates an element in the EPP base namespace.
///
/// The base namespace is always written as the default namespace, so these
/// elements carry no prefix.
pub fn epp_element(local: &str) -> CodecNode {
    CodecNode::new(Some(EPP.uri()), None, local)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: ServiceDescriptor = ServiceDescriptor::new(
        "domain",
        "urn:ietf:params:xml:ns:domain-1.0",
        "domain-1.0.xsd",
    );

    #[test]
    fn test_schema_location_value() {
        assert_eq!(
            DOMAIN.schema_location_value(),
            "urn:ietf:params:xml:ns:domain-1.0 domain-1.0.xsd"
        );
    }

    #[test]
    fn test_root_element_is_tagged() {
        let node = DOMAIN.root_element("check");
        assert_eq!(node.namespace(), Some(DOMAIN.uri()));
        assert_eq!(node.prefix(), Some("domain"));
        assert_eq!(node.local_name(), "check");
        assert_eq!(
            node.attribute_ns(XSI_NS, "schemaLocation"),
            Some("urn:ietf:params:xml:ns:domain-1.0 domain-1.0.xsd")
        );
    }

    #[test]
    fn test_epp_element_is_unprefixed() {
        let node = epp_element("command");
        assert_eq!(node.namespace(), Some(EPP.uri()));
        assert_eq!(node.prefix(), None);
    }
}
