//! Generic element tree exchanged through the codec contract
//!
//! A [`CodecNode`] is the only thing codec implementations produce and
//! consume. It is an owned, mutable XML element: a namespace-qualified tag,
//! attributes, ordered children and optional text.
//!
//! The byte-level work is kept here as well: [`CodecNode::parse`] reads a
//! document with `roxmltree`, [`CodecNode::to_document`] writes one back
//! with the minimum set of namespace declarations.
//!
//! ## Example
//!
//! ```
//! use eppkit_protocol::node::CodecNode;
//!
//! let ns = "urn:ietf:params:xml:ns:domain-1.0";
//! let node = CodecNode::new(Some(ns), Some("domain"), "check")
//!     .with_child(CodecNode::new(Some(ns), Some("domain"), "name").with_text("example.com"));
//!
//! let xml = node.to_xml();
//! assert_eq!(CodecNode::parse(&xml).unwrap(), node);
//! ```

use crate::error::{DecodeError, DecodeResult};

/// XML Schema instance namespace, used for `xsi:schemaLocation`
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// The implicitly bound `xml:` namespace
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace URI + local name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_owned),
            local: local.to_owned(),
        }
    }

    fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.namespace.as_deref() == namespace && self.local == local
    }
}

impl std::fmt::Display for QName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub prefix: Option<String>,
    pub value: String,
}

/// One XML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecNode {
    name: QName,
    prefix: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<CodecNode>,
    text: Option<String>,
}

impl CodecNode {
    /// Creates an empty element
    pub fn new(namespace: Option<&str>, prefix: Option<&str>, local: &str) -> Self {
        Self {
            name: QName::new(namespace, local),
            prefix: prefix.map(str::to_owned),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    #[inline]
    pub fn name(&self) -> &QName {
        &self.name
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.name.namespace.as_deref()
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    #[inline]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Tag as written on the wire, e.g. `domain:check`
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name.local),
            None => self.name.local.clone(),
        }
    }

    /// Returns true if this element has the given namespace and local name
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.name.matches(Some(namespace), local)
    }

    /// Fails with [`DecodeError::UnexpectedElement`] unless this element is `{namespace}local`
    pub fn expect(&self, namespace: &str, local: &str) -> DecodeResult<()> {
        if self.is(namespace, local) {
            Ok(())
        } else {
            Err(DecodeError::UnexpectedElement {
                expected: QName::new(Some(namespace), local).to_string(),
                found: self.name.to_string(),
            })
        }
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Sets the text content; an empty string clears it
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.text = if text.is_empty() { None } else { Some(text) };
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Looks up an unqualified attribute
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.matches(None, local))
            .map(|a| a.value.as_str())
    }

    pub fn attribute_ns(&self, namespace: &str, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.matches(Some(namespace), local))
            .map(|a| a.value.as_str())
    }

    pub fn required_attribute(&self, local: &str) -> DecodeResult<&str> {
        self.attribute(local)
            .ok_or_else(|| DecodeError::MissingAttribute(format!("{}@{}", self.name.local, local)))
    }

    /// Sets an unqualified attribute, replacing any previous value
    pub fn set_attribute(&mut self, local: &str, value: impl Into<String>) {
        self.put_attribute(Attribute {
            name: QName::new(None, local),
            prefix: None,
            value: value.into(),
        });
    }

    pub fn with_attribute(mut self, local: &str, value: impl Into<String>) -> Self {
        self.set_attribute(local, value);
        self
    }

    pub fn with_attribute_ns(
        mut self,
        namespace: &str,
        prefix: &str,
        local: &str,
        value: impl Into<String>,
    ) -> Self {
        self.put_attribute(Attribute {
            name: QName::new(Some(namespace), local),
            prefix: Some(prefix.to_owned()),
            value: value.into(),
        });
        self
    }

    fn put_attribute(&mut self, attribute: Attribute) {
        match self.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    // ------------------------------------------------------------------
    // Children
    // ------------------------------------------------------------------

    pub fn children(&self) -> &[CodecNode] {
        &self.children
    }

    pub fn push(&mut self, child: CodecNode) {
        self.children.push(child);
    }

    pub fn with_child(mut self, child: CodecNode) -> Self {
        self.children.push(child);
        self
    }

    /// Appends `child` only when present
    pub fn with_optional_child(mut self, child: Option<CodecNode>) -> Self {
        if let Some(child) = child {
            self.children.push(child);
        }
        self
    }

    pub fn first_child(&self) -> Option<&CodecNode> {
        self.children.first()
    }

    pub fn child(&self, namespace: &str, local: &str) -> Option<&CodecNode> {
        self.children.iter().find(|c| c.is(namespace, local))
    }

    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a CodecNode> + 'a {
        self.children.iter().filter(move |c| c.is(namespace, local))
    }

    pub fn required_child(&self, namespace: &str, local: &str) -> DecodeResult<&CodecNode> {
        self.child(namespace, local)
            .ok_or_else(|| DecodeError::MissingElement(QName::new(Some(namespace), local).to_string()))
    }

    /// Text of a child element; an empty child yields `Some("")`
    pub fn child_text(&self, namespace: &str, local: &str) -> Option<&str> {
        self.child(namespace, local).map(|c| c.text().unwrap_or(""))
    }

    pub fn required_text(&self, namespace: &str, local: &str) -> DecodeResult<&str> {
        self.required_child(namespace, local).map(|c| c.text().unwrap_or(""))
    }

    /// Text of every child element named `{namespace}local`, in document order
    pub fn child_texts(&self, namespace: &str, local: &str) -> Vec<String> {
        self.children_named(namespace, local)
            .map(|c| c.text().unwrap_or("").to_owned())
            .collect()
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    /// Parses an XML document into its root element
    pub fn parse(xml: &str) -> DecodeResult<Self> {
        let document =
            roxmltree::Document::parse(xml).map_err(|e| DecodeError::Xml(e.to_string()))?;
        Ok(Self::from_xml_node(document.root_element()))
    }

    /// Parses a UTF-8 encoded XML document
    pub fn from_bytes(bytes: &[u8]) -> DecodeResult<Self> {
        let xml = std::str::from_utf8(bytes)
            .map_err(|e| DecodeError::Xml(format!("document is not UTF-8: {}", e)))?;
        Self::parse(xml)
    }

    fn from_xml_node(node: roxmltree::Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        // `xmlns=""` reports an empty namespace; that is no namespace
        let namespace = tag.namespace().filter(|ns| !ns.is_empty());
        let prefix = namespace.and_then(|ns| node.lookup_prefix(ns));

        let attributes = node
            .attributes()
            .map(|attr| Attribute {
                name: QName::new(attr.namespace(), attr.name()),
                prefix: attr
                    .namespace()
                    .and_then(|ns| node.lookup_prefix(ns))
                    .map(str::to_owned),
                value: attr.value().to_owned(),
            })
            .collect();

        let mut children = Vec::new();
        let mut text = String::new();
        for child in node.children() {
            if child.is_element() {
                children.push(Self::from_xml_node(child));
            } else if child.is_text() {
                text.push_str(child.text().unwrap_or(""));
            }
        }

        // Whitespace between child elements is formatting, not content
        let text = if children.is_empty() {
            Some(text).filter(|t| !t.is_empty())
        } else {
            Some(text.trim().to_owned()).filter(|t| !t.is_empty())
        };

        Self {
            name: QName::new(namespace, tag.name()),
            prefix: prefix.map(str::to_owned),
            attributes,
            children,
            text,
        }
    }

    // ------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------

    /// Serializes this element (without an XML declaration)
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(256);
        let mut scope = Vec::new();
        self.write_into(&mut out, &mut scope);
        out
    }

    /// Serializes this element as a standalone UTF-8 document
    pub fn to_document(&self) -> String {
        let mut out = String::with_capacity(512);
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#);
        let mut scope = Vec::new();
        self.write_into(&mut out, &mut scope);
        out
    }

    fn write_into(&self, out: &mut String, scope: &mut Vec<(Option<String>, String)>) {
        let mark = scope.len();
        let mut declarations: Vec<(Option<String>, String)> = Vec::new();

        match &self.name.namespace {
            Some(ns) => declare_if_needed(scope, &mut declarations, self.prefix.as_deref(), ns),
            None => {
                // An unqualified child below a default namespace must undeclare it
                if lookup(scope, None).is_some_and(|uri| !uri.is_empty()) {
                    declare_if_needed(scope, &mut declarations, None, "");
                }
            }
        }
        for attr in &self.attributes {
            if let (Some(ns), Some(prefix)) = (&attr.name.namespace, &attr.prefix) {
                if ns != XML_NS {
                    declare_if_needed(scope, &mut declarations, Some(prefix), ns);
                }
            }
        }

        let tag = self.qualified_name();
        out.push('<');
        out.push_str(&tag);
        for (prefix, uri) in &declarations {
            match prefix {
                Some(prefix) => {
                    out.push_str(" xmlns:");
                    out.push_str(prefix);
                }
                None => out.push_str(" xmlns"),
            }
            out.push_str("=\"");
            escape_into(out, uri, true);
            out.push('"');
        }
        for attr in &self.attributes {
            out.push(' ');
            if let (Some(_), Some(prefix)) = (&attr.name.namespace, &attr.prefix) {
                out.push_str(prefix);
                out.push(':');
            }
            out.push_str(&attr.name.local);
            out.push_str("=\"");
            escape_into(out, &attr.value, true);
            out.push('"');
        }

        if self.children.is_empty() && self.text.is_none() {
            out.push_str("/>");
        } else {
            out.push('>');
            if let Some(text) = &self.text {
                escape_into(out, text, false);
            }
            for child in &self.children {
                child.write_into(out, scope);
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }

        scope.truncate(mark);
    }
}

impl std::fmt::Display for CodecNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_xml())
    }
}

fn lookup<'a>(scope: &'a [(Option<String>, String)], prefix: Option<&str>) -> Option<&'a str> {
    scope
        .iter()
        .rev()
        .find(|(p, _)| p.as_deref() == prefix)
        .map(|(_, uri)| uri.as_str())
}

fn declare_if_needed(
    scope: &mut Vec<(Option<String>, String)>,
    declarations: &mut Vec<(Option<String>, String)>,
    prefix: Option<&str>,
    uri: &str,
) {
    let bound = lookup(scope, prefix);
    if bound == Some(uri) || (bound.is_none() && prefix.is_none() && uri.is_empty()) {
        return;
    }
    let entry = (prefix.map(str::to_owned), uri.to_owned());
    scope.push(entry.clone());
    declarations.push(entry);
}

fn escape_into(out: &mut String, value: &str, attribute: bool) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\n' if attribute => out.push_str("&#10;"),
            '\r' if attribute => out.push_str("&#13;"),
            '\t' if attribute => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
}
