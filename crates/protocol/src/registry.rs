//! Namespace-keyed dispatch registries
//!
//! Dispatch is two-level: the namespace URI of an element selects a
//! [`NamespaceModule`], and the module maps the element's local name to a
//! [`Constructor`]. Independently written object mappings and extensions
//! therefore coexist without a central enum of every possible command.
//!
//! # Example
//!
//! ```ignore
//! use eppkit_protocol::registry::{MappingModule, Registry};
//!
//! let mut registry = Registry::new();
//! registry.register_mapping(
//!     MappingModule::new(DOMAIN)
//!         .with_command::<DomainCheck>()?
//!         .with_response::<DomainCheckData>()?,
//! )?;
//!
//! let ctor = registry.mappings().resolve_response(DOMAIN.uri(), "chkData")?;
//! assert!(ctor.is::<DomainCheckData>());
//! ```

use std::any::TypeId;
use std::collections::HashMap;

use crate::codec::{decode_boxed, AnyElement, Element};
use crate::error::{DecodeResult, DispatchError, RegistryError};
use crate::extension::ExtensionRegistry;
use crate::node::CodecNode;
use crate::service::ServiceDescriptor;

/// Decoder stored per registered tag
pub type DecodeFn = fn(&CodecNode) -> DecodeResult<Box<dyn AnyElement>>;

/// Which direction of the exchange an element travels in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Client to server (commands and their extensions)
    Command,
    /// Server to client (response data and response extensions)
    Response,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Command => write!(f, "command"),
            Side::Response => write!(f, "response"),
        }
    }
}

/// A registered way to build one concrete element type from a node
#[derive(Clone, Copy)]
pub struct Constructor {
    type_id: TypeId,
    type_name: &'static str,
    decode: DecodeFn,
}

impl Constructor {
    pub fn of<T: Element>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            decode: decode_boxed::<T>,
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if this constructor builds `T`
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn construct(&self, node: &CodecNode) -> DecodeResult<Box<dyn AnyElement>> {
        (self.decode)(node)
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Constructor").field(&self.type_name).finish()
    }
}

/// All tags one namespace knows how to build, split by [`Side`]
#[derive(Debug, Clone)]
pub struct NamespaceModule {
    service: ServiceDescriptor,
    commands: HashMap<&'static str, Constructor>,
    responses: HashMap<&'static str, Constructor>,
}

/// An object mapping (domain, host, contact, ...)
pub type MappingModule = NamespaceModule;

/// An extension namespace (secDNS, sync, namestore, ...)
pub type ExtensionModule = NamespaceModule;

impl NamespaceModule {
    pub fn new(service: ServiceDescriptor) -> Self {
        Self {
            service,
            commands: HashMap::new(),
            responses: HashMap::new(),
        }
    }

    #[inline]
    pub fn service(&self) -> &ServiceDescriptor {
        &self.service
    }

    /// Registers `T` as a command-side element
    pub fn with_command<T: Element>(mut self) -> Result<Self, RegistryError> {
        self.insert::<T>(Side::Command)?;
        Ok(self)
    }

    /// Registers `T` as a response-side element
    pub fn with_response<T: Element>(mut self) -> Result<Self, RegistryError> {
        self.insert::<T>(Side::Response)?;
        Ok(self)
    }

    /// Registers `T` on both sides (extensions shared by commands and responses)
    pub fn with_element<T: Element>(mut self) -> Result<Self, RegistryError> {
        self.insert::<T>(Side::Command)?;
        self.insert::<T>(Side::Response)?;
        Ok(self)
    }

    fn insert<T: Element>(&mut self, side: Side) -> Result<(), RegistryError> {
        if T::SERVICE.uri() != self.service.uri() {
            return Err(RegistryError::NamespaceMismatch {
                type_name: std::any::type_name::<T>(),
                expected: self.service.uri().to_owned(),
                actual: T::SERVICE.uri().to_owned(),
            });
        }

        let table = self.table_mut(side);
        if table.contains_key(T::TAG) {
            return Err(RegistryError::DuplicateTag {
                namespace: T::SERVICE.uri().to_owned(),
                tag: T::TAG.to_owned(),
            });
        }
        table.insert(T::TAG, Constructor::of::<T>());
        Ok(())
    }

    fn table(&self, side: Side) -> &HashMap<&'static str, Constructor> {
        match side {
            Side::Command => &self.commands,
            Side::Response => &self.responses,
        }
    }

    fn table_mut(&mut self, side: Side) -> &mut HashMap<&'static str, Constructor> {
        match side {
            Side::Command => &mut self.commands,
            Side::Response => &mut self.responses,
        }
    }

    /// Looks up the constructor for `tag`; `None` if this module does not know it
    pub fn resolve(&self, side: Side, tag: &str) -> Option<Constructor> {
        self.table(side).get(tag).copied()
    }

    /// Registered tags for one side, sorted
    pub fn tags(&self, side: Side) -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = self.table(side).keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}

/// Namespace URI → module table shared by both registries
#[derive(Debug, Clone, Default)]
pub(crate) struct NamespaceTable {
    modules: HashMap<&'static str, NamespaceModule>,
    // Registration order, for stable login service lists
    order: Vec<&'static str>,
}

impl NamespaceTable {
    pub(crate) fn register(&mut self, module: NamespaceModule) -> Result<(), RegistryError> {
        let uri = module.service.uri();
        if self.modules.contains_key(uri) {
            return Err(RegistryError::DuplicateNamespace(uri.to_owned()));
        }
        tracing::debug!(
            namespace = uri,
            commands = module.commands.len(),
            responses = module.responses.len(),
            "Registered namespace module"
        );
        self.order.push(uri);
        self.modules.insert(uri, module);
        Ok(())
    }

    pub(crate) fn module(&self, namespace: &str) -> Option<&NamespaceModule> {
        self.modules.get(namespace)
    }

    pub(crate) fn resolve(
        &self,
        side: Side,
        namespace: &str,
        tag: &str,
    ) -> Result<Constructor, DispatchError> {
        let module = self
            .modules
            .get(namespace)
            .ok_or_else(|| DispatchError::UnknownNamespace(namespace.to_owned()))?;

        module.resolve(side, tag).ok_or_else(|| DispatchError::UnknownTag {
            namespace: namespace.to_owned(),
            tag: tag.to_owned(),
        })
    }

    pub(crate) fn services(&self) -> impl Iterator<Item = &ServiceDescriptor> + '_ {
        self.order
            .iter()
            .filter_map(|uri| self.modules.get(uri))
            .map(NamespaceModule::service)
    }

    pub(crate) fn len(&self) -> usize {
        self.modules.len()
    }
}

/// Resolves object-mapping commands and response data
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    table: NamespaceTable,
}

impl MappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one object mapping; duplicate namespaces are rejected
    pub fn register_mapping(&mut self, module: MappingModule) -> Result<(), RegistryError> {
        self.table.register(module)
    }

    pub fn module(&self, namespace: &str) -> Option<&MappingModule> {
        self.table.module(namespace)
    }

    pub fn resolve_command(&self, namespace: &str, tag: &str) -> Result<Constructor, DispatchError> {
        self.table.resolve(Side::Command, namespace, tag)
    }

    pub fn resolve_response(&self, namespace: &str, tag: &str) -> Result<Constructor, DispatchError> {
        self.table.resolve(Side::Response, namespace, tag)
    }

    /// Decodes a command payload root such as `<domain:check>`
    pub fn decode_command(&self, node: &CodecNode) -> DecodeResult<Box<dyn AnyElement>> {
        self.decode(Side::Command, node)
    }

    /// Decodes a response payload root such as `<domain:chkData>`
    pub fn decode_response(&self, node: &CodecNode) -> DecodeResult<Box<dyn AnyElement>> {
        self.decode(Side::Response, node)
    }

    fn decode(&self, side: Side, node: &CodecNode) -> DecodeResult<Box<dyn AnyElement>> {
        let namespace = node.namespace().unwrap_or("");
        let ctor = self.table.resolve(side, namespace, node.local_name())?;
        ctor.construct(node)
    }

    /// Registered object services in registration order
    pub fn services(&self) -> impl Iterator<Item = &ServiceDescriptor> + '_ {
        self.table.services()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.table.module(namespace).is_some()
    }
}

/// Object mappings and extensions known to one runtime
///
/// Built once at setup and shared (behind an `Arc`) by every session.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    mappings: MappingRegistry,
    extensions: ExtensionRegistry,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_mapping(&mut self, module: MappingModule) -> Result<(), RegistryError> {
        self.mappings.register_mapping(module)
    }

    pub fn register_extension(&mut self, module: ExtensionModule) -> Result<(), RegistryError> {
        self.extensions.register_extension(module)
    }

    #[inline]
    pub fn mappings(&self) -> &MappingRegistry {
        &self.mappings
    }

    #[inline]
    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    /// Object URIs offered at login
    pub fn object_uris(&self) -> Vec<String> {
        self.mappings.services().map(|s| s.uri().to_owned()).collect()
    }

    /// Extension URIs offered at login
    pub fn extension_uris(&self) -> Vec<String> {
        self.extensions.services().map(|s| s.uri().to_owned()).collect()
    }
}
