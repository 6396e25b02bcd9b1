//! Session-level messages in the EPP base namespace
//!
//! These drive the session state machine rather than any object mapping:
//! - `<hello>` / `<greeting>`: capability announcement, also used as a
//!   keepalive probe
//! - `<login>`: credentials plus the negotiated service list
//! - `<logout>`: graceful end of session
//! - `<poll>`: message queue request / acknowledge

use crate::codec::{Element, EppCodec};
use crate::error::{DecodeError, DecodeResult, EncodeError};
use crate::node::CodecNode;
use crate::service::{epp_element, ServiceDescriptor, EPP};
use crate::services::EPP_VERSION;

/// `<hello/>`: asks the server for a fresh greeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hello;

impl EppCodec for Hello {
    fn encode(&self) -> Result<CodecNode, EncodeError> {
        Ok(epp_element("hello"))
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        Self::expect_root(node).map(|_| Hello)
    }
}

impl Element for Hello {
    const SERVICE: ServiceDescriptor = EPP;
    const TAG: &'static str = "hello";
}

/// Server capability announcement
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Greeting {
    pub server_id: String,
    pub server_date: Option<String>,
    pub versions: Vec<String>,
    pub languages: Vec<String>,
    pub object_uris: Vec<String>,
    pub extension_uris: Vec<String>,
    /// Data collection policy, kept as-is
    pub dcp: Option<CodecNode>,
}

impl Greeting {
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            versions: vec![EPP_VERSION.to_owned()],
            languages: vec!["en".to_owned()],
            ..Default::default()
        }
    }

    pub fn with_object_uri(mut self, uri: impl Into<String>) -> Self {
        self.object_uris.push(uri.into());
        self
    }

    pub fn with_extension_uri(mut self, uri: impl Into<String>) -> Self {
        self.extension_uris.push(uri.into());
        self
    }

    pub fn supports_version(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    pub fn supports_object(&self, uri: &str) -> bool {
        self.object_uris.iter().any(|u| u == uri)
    }

    pub fn supports_extension(&self, uri: &str) -> bool {
        self.extension_uris.iter().any(|u| u == uri)
    }
}

impl EppCodec for Greeting {
    fn encode(&self) -> Result<CodecNode, EncodeError> {
        if self.server_id.is_empty() {
            return Err(EncodeError::MissingField("svID"));
        }

        let mut menu = epp_element("svcMenu");
        for version in &self.versions {
            menu.push(epp_element("version").with_text(version));
        }
        for lang in &self.languages {
            menu.push(epp_element("lang").with_text(lang));
        }
        for uri in &self.object_uris {
            menu.push(epp_element("objURI").with_text(uri));
        }
        if !self.extension_uris.is_empty() {
            let mut ext = epp_element("svcExtension");
            for uri in &self.extension_uris {
                ext.push(epp_element("extURI").with_text(uri));
            }
            menu.push(ext);
        }

        Ok(epp_element("greeting")
            .with_child(epp_element("svID").with_text(&self.server_id))
            .with_optional_child(
                self.server_date
                    .as_ref()
                    .map(|date| epp_element("svDate").with_text(date)),
            )
            .with_child(menu)
            .with_optional_child(self.dcp.clone()))
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        Self::expect_root(node)?;
        let ns = EPP.uri();
        let menu = node.required_child(ns, "svcMenu")?;

        Ok(Self {
            server_id: node.required_text(ns, "svID")?.to_owned(),
            server_date: node.child_text(ns, "svDate").map(str::to_owned),
            versions: menu.child_texts(ns, "version"),
            languages: menu.child_texts(ns, "lang"),
            object_uris: menu.child_texts(ns, "objURI"),
            extension_uris: menu
                .child(ns, "svcExtension")
                .map(|ext| ext.child_texts(ns, "extURI"))
                .unwrap_or_default(),
            dcp: node.child(ns, "dcp").cloned(),
        })
    }
}

impl Element for Greeting {
    const SERVICE: ServiceDescriptor = EPP;
    const TAG: &'static str = "greeting";
}

/// `<login>` command body
#[derive(Clone, PartialEq, Eq)]
pub struct Login {
    pub client_id: String,
    pub password: String,
    pub new_password: Option<String>,
    pub version: String,
    pub language: String,
    pub object_uris: Vec<String>,
    pub extension_uris: Vec<String>,
}

impl Login {
    pub fn new(client_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            password: password.into(),
            new_password: None,
            version: EPP_VERSION.to_owned(),
            language: "en".to_owned(),
            object_uris: Vec::new(),
            extension_uris: Vec::new(),
        }
    }

    pub fn with_new_password(mut self, new_password: impl Into<String>) -> Self {
        self.new_password = Some(new_password.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_services(mut self, object_uris: Vec<String>, extension_uris: Vec<String>) -> Self {
        self.object_uris = object_uris;
        self.extension_uris = extension_uris;
        self
    }
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("client_id", &self.client_id)
            .field("password", &"<redacted>")
            .field("new_password", &self.new_password.as_ref().map(|_| "<redacted>"))
            .field("version", &self.version)
            .field("language", &self.language)
            .field("object_uris", &self.object_uris)
            .field("extension_uris", &self.extension_uris)
            .finish()
    }
}

impl EppCodec for Login {
    fn encode(&self) -> Result<CodecNode, EncodeError> {
        if self.client_id.is_empty() {
            return Err(EncodeError::MissingField("clID"));
        }
        if self.password.is_empty() {
            return Err(EncodeError::MissingField("pw"));
        }
        if self.object_uris.is_empty() {
            return Err(EncodeError::MissingField("objURI"));
        }

        let options = epp_element("options")
            .with_child(epp_element("version").with_text(&self.version))
            .with_child(epp_element("lang").with_text(&self.language));

        let mut svcs = epp_element("svcs");
        for uri in &self.object_uris {
            svcs.push(epp_element("objURI").with_text(uri));
        }
        if !self.extension_uris.is_empty() {
            let mut ext = epp_element("svcExtension");
            for uri in &self.extension_uris {
                ext.push(epp_element("extURI").with_text(uri));
            }
            svcs.push(ext);
        }

        Ok(epp_element("login")
            .with_child(epp_element("clID").with_text(&self.client_id))
            .with_child(epp_element("pw").with_text(&self.password))
            .with_optional_child(
                self.new_password
                    .as_ref()
                    .map(|pw| epp_element("newPW").with_text(pw)),
            )
            .with_child(options)
            .with_child(svcs))
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        Self::expect_root(node)?;
        let ns = EPP.uri();
        let options = node.required_child(ns, "options")?;
        let svcs = node.required_child(ns, "svcs")?;

        Ok(Self {
            client_id: node.required_text(ns, "clID")?.to_owned(),
            password: node.required_text(ns, "pw")?.to_owned(),
            new_password: node.child_text(ns, "newPW").map(str::to_owned),
            version: options.required_text(ns, "version")?.to_owned(),
            language: options.required_text(ns, "lang")?.to_owned(),
            object_uris: svcs.child_texts(ns, "objURI"),
            extension_uris: svcs
                .child(ns, "svcExtension")
                .map(|ext| ext.child_texts(ns, "extURI"))
                .unwrap_or_default(),
        })
    }
}

impl Element for Login {
    const SERVICE: ServiceDescriptor = EPP;
    const TAG: &'static str = "login";
}

/// `<logout/>` command body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Logout;

impl EppCodec for Logout {
    fn encode(&self) -> Result<CodecNode, EncodeError> {
        Ok(epp_element("logout"))
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        Self::expect_root(node).map(|_| Logout)
    }
}

impl Element for Logout {
    const SERVICE: ServiceDescriptor = EPP;
    const TAG: &'static str = "logout";
}

/// `op` attribute of `<poll>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOp {
    Request,
    Acknowledge,
}

impl PollOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PollOp::Request => "req",
            PollOp::Acknowledge => "ack",
        }
    }
}

/// `<poll>` command body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    pub op: PollOp,
    /// Message being acknowledged; required for [`PollOp::Acknowledge`]
    pub message_id: Option<String>,
}

impl Poll {
    pub fn request() -> Self {
        Self {
            op: PollOp::Request,
            message_id: None,
        }
    }

    pub fn acknowledge(message_id: impl Into<String>) -> Self {
        Self {
            op: PollOp::Acknowledge,
            message_id: Some(message_id.into()),
        }
    }
}

impl EppCodec for Poll {
    fn encode(&self) -> Result<CodecNode, EncodeError> {
        let node = epp_element("poll").with_attribute("op", self.op.as_str());
        match (self.op, &self.message_id) {
            (PollOp::Acknowledge, None) => Err(EncodeError::MissingField("msgID")),
            (PollOp::Acknowledge, Some(id)) => Ok(node.with_attribute("msgID", id.as_str())),
            (PollOp::Request, _) => Ok(node),
        }
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        Self::expect_root(node)?;
        let op = match node.required_attribute("op")? {
            "req" => PollOp::Request,
            "ack" => PollOp::Acknowledge,
            other => {
                return Err(DecodeError::InvalidValue {
                    field: "poll@op".to_owned(),
                    value: other.to_owned(),
                })
            }
        };
        Ok(Self {
            op,
            message_id: node.attribute("msgID").map(str::to_owned),
        })
    }
}

impl Element for Poll {
    const SERVICE: ServiceDescriptor = EPP;
    const TAG: &'static str = "poll";
}
