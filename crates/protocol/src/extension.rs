//! Extension attachment
//!
//! Extensions are side-payloads that ride along in the `<extension>` block
//! of any command or response. An envelope holds them in an
//! [`ExtensionList`], which is indexed by concrete type: at most one value
//! per extension type, retrieved with [`ExtensionList::get`].
//!
//! Elements no registered module claims are kept as opaque nodes so that
//! an unknown third-party extension never breaks decoding of the envelope
//! around it.

use std::any::TypeId;

use crate::codec::{AnyElement, Element};
use crate::error::{DispatchError, EncodeError, RegistryError};
use crate::node::CodecNode;
use crate::registry::{Constructor, ExtensionModule, NamespaceTable, Side};
use crate::service::{epp_element, ServiceDescriptor, EPP};

/// One child of an `<extension>` block
#[derive(Debug, Clone)]
pub enum ExtensionEntry {
    /// Decoded through a registered extension module
    Known(Box<dyn AnyElement>),

    /// Preserved as-is; no module claims it or it failed to decode
    Opaque(CodecNode),
}

impl PartialEq for ExtensionEntry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Known(a), Self::Known(b)) => a.eq_dyn(b.as_ref()),
            (Self::Opaque(a), Self::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl ExtensionEntry {
    fn type_id(&self) -> Option<TypeId> {
        match self {
            ExtensionEntry::Known(value) => Some(value.as_any().type_id()),
            ExtensionEntry::Opaque(_) => None,
        }
    }

    fn encode(&self) -> Result<CodecNode, EncodeError> {
        match self {
            ExtensionEntry::Known(value) => value.encode_node(),
            ExtensionEntry::Opaque(node) => Ok(node.clone()),
        }
    }
}

/// Ordered, type-indexed extension list carried by an envelope
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionList {
    entries: Vec<ExtensionEntry>,
}

impl ExtensionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `value`, replacing (in place) any previous value of the same type
    ///
    /// Returns the replaced value.
    pub fn insert<T: Element>(&mut self, value: T) -> Option<T> {
        let boxed: Box<dyn AnyElement> = Box::new(value);
        self.insert_boxed(boxed).and_then(|old| old.downcast::<T>())
    }

    /// Type-erased form of [`ExtensionList::insert`]
    pub fn insert_boxed(&mut self, value: Box<dyn AnyElement>) -> Option<Box<dyn AnyElement>> {
        let type_id = value.as_any().type_id();
        match self.position(type_id) {
            Some(index) => {
                let old = std::mem::replace(&mut self.entries[index], ExtensionEntry::Known(value));
                match old {
                    ExtensionEntry::Known(old) => Some(old),
                    ExtensionEntry::Opaque(_) => None,
                }
            }
            None => {
                self.entries.push(ExtensionEntry::Known(value));
                None
            }
        }
    }

    /// Keeps an element no module decoded
    pub fn push_opaque(&mut self, node: CodecNode) {
        self.entries.push(ExtensionEntry::Opaque(node));
    }

    pub fn get<T: Element>(&self) -> Option<&T> {
        self.entries.iter().find_map(|entry| match entry {
            ExtensionEntry::Known(value) => value.downcast_ref::<T>(),
            ExtensionEntry::Opaque(_) => None,
        })
    }

    pub fn contains<T: Element>(&self) -> bool {
        self.position(TypeId::of::<T>()).is_some()
    }

    pub fn remove<T: Element>(&mut self) -> Option<T> {
        let index = self.position(TypeId::of::<T>())?;
        match self.entries.remove(index) {
            ExtensionEntry::Known(value) => value.downcast::<T>(),
            ExtensionEntry::Opaque(_) => None,
        }
    }

    fn position(&self, type_id: TypeId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.type_id() == Some(type_id))
    }

    /// Elements that were kept undecoded, in document order
    pub fn opaque(&self) -> impl Iterator<Item = &CodecNode> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            ExtensionEntry::Opaque(node) => Some(node),
            ExtensionEntry::Known(_) => None,
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExtensionEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes the `<extension>` block; `None` when the list is empty
    pub fn encode(&self) -> Result<Option<CodecNode>, EncodeError> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let mut block = epp_element("extension");
        for entry in &self.entries {
            block.push(entry.encode()?);
        }
        Ok(Some(block))
    }
}

impl<'a> IntoIterator for &'a ExtensionList {
    type Item = &'a ExtensionEntry;
    type IntoIter = std::slice::Iter<'a, ExtensionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Resolves extension elements by `(side, namespace, tag)`
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    table: NamespaceTable,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one extension namespace; duplicate namespaces are rejected
    pub fn register_extension(&mut self, module: ExtensionModule) -> Result<(), RegistryError> {
        if module.service().uri() == EPP.uri() {
            return Err(RegistryError::DuplicateNamespace(EPP.uri().to_owned()));
        }
        self.table.register(module)
    }

    pub fn resolve_extension(
        &self,
        side: Side,
        namespace: &str,
        tag: &str,
    ) -> Result<Constructor, DispatchError> {
        self.table.resolve(side, namespace, tag)
    }

    /// Decodes every child of an `<extension>` block
    ///
    /// Never fails: unresolved or undecodable children become
    /// [`ExtensionEntry::Opaque`]. A second value of a type already present
    /// is kept opaque as well.
    pub fn decode_block(&self, side: Side, block: &CodecNode) -> ExtensionList {
        let mut list = ExtensionList::new();

        for child in block.children() {
            let namespace = child.namespace().unwrap_or("");
            let ctor = match self.resolve_extension(side, namespace, child.local_name()) {
                Ok(ctor) => ctor,
                Err(e) => {
                    tracing::debug!(element = %child.name(), %side, "Keeping unknown extension opaque: {}", e);
                    list.push_opaque(child.clone());
                    continue;
                }
            };

            if list.position(ctor.type_id()).is_some() {
                tracing::warn!(element = %child.name(), "Duplicate extension in envelope, keeping opaque");
                list.push_opaque(child.clone());
                continue;
            }

            match ctor.construct(child) {
                Ok(value) => {
                    list.insert_boxed(value);
                }
                Err(e) => {
                    tracing::warn!(element = %child.name(), "Failed to decode extension, keeping opaque: {}", e);
                    list.push_opaque(child.clone());
                }
            }
        }

        list
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceDescriptor> + '_ {
        self.table.services()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.table.module(namespace).is_some()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EppCodec;
    use crate::error::DecodeResult;

    const SYNC: ServiceDescriptor = ServiceDescriptor::new(
        "sync",
        "http://www.verisign.com/epp/sync-1.0",
        "sync-1.0.xsd",
    );
    const LAUNCH: ServiceDescriptor = ServiceDescriptor::new(
        "launch",
        "urn:ietf:params:xml:ns:launch-1.0",
        "launch-1.0.xsd",
    );

    #[derive(Debug, Clone, PartialEq)]
    struct SyncUpdate {
        exp_month_day: String,
    }

    impl EppCodec for SyncUpdate {
        fn encode(&self) -> Result<CodecNode, EncodeError> {
            if self.exp_month_day.is_empty() {
                return Err(EncodeError::MissingField("expMonthDay"));
            }
            Ok(SYNC
                .root_element("update")
                .with_child(SYNC.element("expMonthDay").with_text(&self.exp_month_day)))
        }

        fn decode(node: &CodecNode) -> DecodeResult<Self> {
            Self::expect_root(node)?;
            Ok(Self {
                exp_month_day: node.required_text(SYNC.uri(), "expMonthDay")?.to_owned(),
            })
        }
    }

    impl Element for SyncUpdate {
        const SERVICE: ServiceDescriptor = SYNC;
        const TAG: &'static str = "update";
    }

    #[derive(Debug, Clone, PartialEq)]
    struct LaunchPhase {
        phase: String,
    }

    impl EppCodec for LaunchPhase {
        fn encode(&self) -> Result<CodecNode, EncodeError> {
            Ok(LAUNCH
                .root_element("info")
                .with_child(LAUNCH.element("phase").with_text(&self.phase)))
        }

        fn decode(node: &CodecNode) -> DecodeResult<Self> {
            Self::expect_root(node)?;
            Ok(Self {
                phase: node.required_text(LAUNCH.uri(), "phase")?.to_owned(),
            })
        }
    }

    impl Element for LaunchPhase {
        const SERVICE: ServiceDescriptor = LAUNCH;
        const TAG: &'static str = "info";
    }

    fn sync(day: &str) -> SyncUpdate {
        SyncUpdate {
            exp_month_day: day.into(),
        }
    }

    fn registry() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        registry
            .register_extension(ExtensionModule::new(SYNC).with_element::<SyncUpdate>().unwrap())
            .unwrap();
        registry
            .register_extension(ExtensionModule::new(LAUNCH).with_command::<LaunchPhase>().unwrap())
            .unwrap();
        registry
    }

    #[test]
    fn test_insert_replaces_same_type() {
        let mut list = ExtensionList::new();
        assert_eq!(list.insert(sync("--05-31")), None);
        list.insert(LaunchPhase { phase: "sunrise".into() });
        assert_eq!(list.insert(sync("--06-30")), Some(sync("--05-31")));

        assert_eq!(list.len(), 2);
        assert_eq!(list.get::<SyncUpdate>(), Some(&sync("--06-30")));
        // Replacement keeps the original position
        assert!(matches!(list.iter().next(), Some(ExtensionEntry::Known(v)) if v.is::<SyncUpdate>()));
    }

    #[test]
    fn test_get_absent_is_none() {
        let mut list = ExtensionList::new();
        list.insert(sync("--05-31"));
        assert!(list.get::<LaunchPhase>().is_none());
        assert!(!list.contains::<LaunchPhase>());
    }

    #[test]
    fn test_remove() {
        let mut list = ExtensionList::new();
        list.insert(sync("--05-31"));
        assert_eq!(list.remove::<SyncUpdate>(), Some(sync("--05-31")));
        assert!(list.is_empty());
        assert_eq!(list.remove::<SyncUpdate>(), None);
    }

    #[test]
    fn test_empty_list_encodes_nothing() {
        assert_eq!(ExtensionList::new().encode().unwrap(), None);
    }

    #[test]
    fn test_encode_propagates_missing_field() {
        let mut list = ExtensionList::new();
        list.insert(sync(""));
        assert_eq!(list.encode(), Err(EncodeError::MissingField("expMonthDay")));
    }

    #[test]
    fn test_decode_block_with_unknown_extension() {
        let registry = registry();
        let mut list = ExtensionList::new();
        list.insert(sync("--05-31"));
        list.push_opaque(
            CodecNode::new(Some("urn:example:unknown-1.0"), Some("unk"), "data").with_text("x"),
        );

        let block = list.encode().unwrap().unwrap();
        let parsed = CodecNode::parse(&block.to_xml()).unwrap();
        let decoded = registry.decode_block(Side::Response, &parsed);

        assert_eq!(decoded.get::<SyncUpdate>(), Some(&sync("--05-31")));
        assert_eq!(decoded.opaque().count(), 1);
        assert_eq!(
            decoded.opaque().next().map(|n| n.local_name()),
            Some("data")
        );
    }

    #[test]
    fn test_decode_block_respects_side() {
        let registry = registry();
        let block = epp_element("extension")
            .with_child(LaunchPhase { phase: "claims".into() }.encode().unwrap());

        let as_command = registry.decode_block(Side::Command, &block);
        assert!(as_command.contains::<LaunchPhase>());

        // Only registered on the command side
        let as_response = registry.decode_block(Side::Response, &block);
        assert!(!as_response.contains::<LaunchPhase>());
        assert_eq!(as_response.opaque().count(), 1);
    }

    #[test]
    fn test_decode_block_keeps_broken_extension_opaque() {
        let registry = registry();
        let block = epp_element("extension").with_child(SYNC.root_element("update"));

        let decoded = registry.decode_block(Side::Response, &block);
        assert!(decoded.get::<SyncUpdate>().is_none());
        assert_eq!(decoded.opaque().count(), 1);
    }

    #[test]
    fn test_decode_block_duplicate_type_kept_opaque() {
        let registry = registry();
        let block = epp_element("extension")
            .with_child(sync("--01-01").encode().unwrap())
            .with_child(sync("--02-02").encode().unwrap());

        let decoded = registry.decode_block(Side::Response, &block);
        assert_eq!(decoded.get::<SyncUpdate>(), Some(&sync("--01-01")));
        assert_eq!(decoded.opaque().count(), 1);
    }

    #[test]
    fn test_resolve_extension_errors() {
        let registry = registry();
        assert!(matches!(
            registry.resolve_extension(Side::Command, "urn:nope", "x"),
            Err(DispatchError::UnknownNamespace(_))
        ));
        assert!(matches!(
            registry.resolve_extension(Side::Command, SYNC.uri(), "info"),
            Err(DispatchError::UnknownTag { .. })
        ));
    }

    #[test]
    fn test_base_namespace_cannot_be_an_extension() {
        let mut registry = ExtensionRegistry::new();
        assert!(registry.register_extension(ExtensionModule::new(EPP)).is_err());
    }
}
