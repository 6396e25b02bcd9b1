//! Service negotiation at login
//!
//! The server announces its protocol versions, object services and
//! extension services in the greeting. The login must only name services
//! from that menu, so the client offers the intersection of what it has
//! registered with what the server announced.
//!
//! ## Negotiation
//! 1. The greeting must list EPP version `1.0`
//! 2. Object URIs: registered ∩ announced, in registration order; at least one
//! 3. Extension URIs: registered ∩ announced, in registration order (may be empty)
//! 4. Language: `en` if announced, otherwise the server's first language

use crate::error::NegotiationError;
use crate::messages::Greeting;

/// The only EPP protocol version in existence
pub const EPP_VERSION: &str = "1.0";

/// Fallback login language
pub const DEFAULT_LANGUAGE: &str = "en";

/// What the login will offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginServices {
    pub version: &'static str,
    pub language: String,
    pub object_uris: Vec<String>,
    pub extension_uris: Vec<String>,
}

/// Negotiates the login service list against a server greeting
///
/// # Example
/// ```
/// use eppkit_protocol::messages::Greeting;
/// use eppkit_protocol::services::negotiate;
///
/// let greeting = Greeting::new("srv")
///     .with_object_uri("urn:ietf:params:xml:ns:domain-1.0")
///     .with_object_uri("urn:ietf:params:xml:ns:host-1.0");
///
/// let offered = vec!["urn:ietf:params:xml:ns:domain-1.0".to_owned()];
/// let services = negotiate(&greeting, &offered, &[]).unwrap();
/// assert_eq!(services.object_uris, offered);
/// ```
pub fn negotiate(
    greeting: &Greeting,
    object_uris: &[String],
    extension_uris: &[String],
) -> Result<LoginServices, NegotiationError> {
    if !greeting.supports_version(EPP_VERSION) {
        return Err(NegotiationError::UnsupportedVersion {
            required: EPP_VERSION,
            offered: greeting.versions.clone(),
        });
    }

    let objects: Vec<String> = object_uris
        .iter()
        .filter(|uri| greeting.supports_object(uri))
        .cloned()
        .collect();
    if objects.is_empty() {
        return Err(NegotiationError::NoCommonObjectService);
    }

    let extensions: Vec<String> = extension_uris
        .iter()
        .filter(|uri| greeting.supports_extension(uri))
        .cloned()
        .collect();

    let skipped = extension_uris.len() - extensions.len();
    if skipped > 0 {
        tracing::debug!(skipped, "Server does not announce some registered extensions");
    }

    let language = if greeting.languages.iter().any(|l| l == DEFAULT_LANGUAGE) {
        DEFAULT_LANGUAGE.to_owned()
    } else {
        greeting
            .languages
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_owned())
    };

    Ok(LoginServices {
        version: EPP_VERSION,
        language,
        object_uris: objects,
        extension_uris: extensions,
    })
}
