//! Sample object mapping, extensions and a scripted EPP server
//!
//! The responder runs on the far side of a [`MemoryTransport`] and speaks
//! just enough EPP for the integration tests:
//! - a greeting on connect and for every `<hello>`
//! - `<login>` accepted unless the password is `"wrong"`
//! - `<logout>` answered with 1500, then the connection closes
//! - `<domain:check>` answered with `chkData`, echoing any namestore
//!   extension; some names trigger failure codes (see [`respond_check`])
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eppkit::client::{
    Credentials, MemoryTransport, Session, SessionConfig, SessionError, SessionFactory,
};
use eppkit::protocol::codec::parse_bool;
use eppkit::protocol::{
    ClientMessage, Command, CommandBody, CodecNode, DecodeResult, Element, EncodeError,
    EncodeResult, EppCodec, EppResult, ExtensionModule, Greeting, MappingModule, Registry,
    Response, ResultCode, ServerMessage, ServiceDescriptor, TransId,
};
use tokio::sync::{mpsc, Notify};

pub const DOMAIN: ServiceDescriptor =
    ServiceDescriptor::new("domain", "urn:ietf:params:xml:ns:domain-1.0", "domain-1.0.xsd");

pub const NAMESTORE: ServiceDescriptor = ServiceDescriptor::new(
    "namestoreExt",
    "http://www.verisign-grs.com/epp/namestoreExt-1.1",
    "namestoreExt-1.1.xsd",
);

pub const LAUNCH: ServiceDescriptor =
    ServiceDescriptor::new("launch", "urn:ietf:params:xml:ns:launch-1.0", "launch-1.0.xsd");

/// `<domain:check>`
#[derive(Debug, Clone, PartialEq)]
pub struct DomainCheck {
    pub names: Vec<String>,
}

impl DomainCheck {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl EppCodec for DomainCheck {
    fn encode(&self) -> EncodeResult<CodecNode> {
        if self.names.is_empty() {
            return Err(EncodeError::MissingField("domain:name"));
        }
        let mut node = DOMAIN.root_element("check");
        for name in &self.names {
            node.push(DOMAIN.element("name").with_text(name));
        }
        Ok(node)
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        Self::expect_root(node)?;
        Ok(Self {
            names: node.child_texts(DOMAIN.uri(), "name"),
        })
    }
}

impl Element for DomainCheck {
    const SERVICE: ServiceDescriptor = DOMAIN;
    const TAG: &'static str = "check";
}

/// One `<domain:cd>` entry
#[derive(Debug, Clone, PartialEq)]
pub struct DomainAvailability {
    pub name: String,
    pub available: bool,
    pub reason: Option<String>,
}

/// `<domain:chkData>`
#[derive(Debug, Clone, PartialEq)]
pub struct DomainCheckData {
    pub results: Vec<DomainAvailability>,
}

impl DomainCheckData {
    pub fn availability(&self, name: &str) -> Option<bool> {
        self.results
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.available)
    }
}

impl EppCodec for DomainCheckData {
    fn encode(&self) -> EncodeResult<CodecNode> {
        let mut node = DOMAIN.root_element("chkData");
        for result in &self.results {
            let name = DOMAIN
                .element("name")
                .with_attribute("avail", if result.available { "1" } else { "0" })
                .with_text(&result.name);
            let reason = result
                .reason
                .as_ref()
                .map(|reason| DOMAIN.element("reason").with_text(reason));
            node.push(
                DOMAIN
                    .element("cd")
                    .with_child(name)
                    .with_optional_child(reason),
            );
        }
        Ok(node)
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        Self::expect_root(node)?;
        let results = node
            .children_named(DOMAIN.uri(), "cd")
            .map(|cd| -> DecodeResult<DomainAvailability> {
                let name = cd.required_child(DOMAIN.uri(), "name")?;
                Ok(DomainAvailability {
                    name: name.text().unwrap_or_default().to_owned(),
                    available: parse_bool("avail", name.required_attribute("avail")?)?,
                    reason: cd.child_text(DOMAIN.uri(), "reason").map(str::to_owned),
                })
            })
            .collect::<DecodeResult<Vec<_>>>()?;
        Ok(Self { results })
    }
}

impl Element for DomainCheckData {
    const SERVICE: ServiceDescriptor = DOMAIN;
    const TAG: &'static str = "chkData";
}

/// `<namestoreExt:namestoreExt>` selecting the registry sub-product
#[derive(Debug, Clone, PartialEq)]
pub struct SubProduct {
    pub name: String,
}

impl SubProduct {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl EppCodec for SubProduct {
    fn encode(&self) -> EncodeResult<CodecNode> {
        if self.name.is_empty() {
            return Err(EncodeError::MissingField("namestoreExt:subProduct"));
        }
        Ok(NAMESTORE
            .root_element("namestoreExt")
            .with_child(NAMESTORE.element("subProduct").with_text(&self.name)))
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        Self::expect_root(node)?;
        Ok(Self {
            name: node.required_text(NAMESTORE.uri(), "subProduct")?.to_owned(),
        })
    }
}

impl Element for SubProduct {
    const SERVICE: ServiceDescriptor = NAMESTORE;
    const TAG: &'static str = "namestoreExt";
}

/// `<launch:check>` phase selector
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchCheck {
    pub phase: String,
}

impl EppCodec for LaunchCheck {
    fn encode(&self) -> EncodeResult<CodecNode> {
        Ok(LAUNCH
            .root_element("check")
            .with_attribute("type", "avail")
            .with_child(LAUNCH.element("phase").with_text(&self.phase)))
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        Self::expect_root(node)?;
        Ok(Self {
            phase: node.required_text(LAUNCH.uri(), "phase")?.to_owned(),
        })
    }
}

impl Element for LaunchCheck {
    const SERVICE: ServiceDescriptor = LAUNCH;
    const TAG: &'static str = "check";
}

/// Registry with the domain mapping and both extensions
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_mapping(
            MappingModule::new(DOMAIN)
                .with_command::<DomainCheck>()
                .unwrap()
                .with_response::<DomainCheckData>()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_extension(ExtensionModule::new(NAMESTORE).with_element::<SubProduct>().unwrap())
        .unwrap();
    registry
        .register_extension(ExtensionModule::new(LAUNCH).with_command::<LaunchCheck>().unwrap())
        .unwrap();
    registry
}

pub fn credentials() -> Credentials {
    Credentials::new("ClientX", "foo-BAR2")
}

pub fn session_config() -> SessionConfig {
    SessionConfig::default()
        .with_read_timeout(Duration::from_millis(500))
        .with_cltrid_prefix("TEST")
}

pub fn greeting() -> Greeting {
    let mut greeting = Greeting::new("Example EPP server epp.example.com")
        .with_object_uri(DOMAIN.uri())
        .with_object_uri("urn:ietf:params:xml:ns:contact-1.0")
        .with_extension_uri(NAMESTORE.uri())
        .with_extension_uri(LAUNCH.uri());
    greeting.server_date = Some("2000-06-08T22:00:00.0Z".to_owned());
    greeting
}

/// Scripted server behaviour
#[derive(Debug, Clone, Default)]
pub struct Responder {
    /// Answer object commands in pairs, second one first
    pub reorder: bool,
    /// Never answer object commands
    pub silent: bool,
    /// Hang up instead of answering `<hello>` once logged in
    pub refuse_hello: bool,
    /// Hang up when notified, as a server dropping an idle connection
    pub hang_up: Option<Arc<Notify>>,
}

impl Responder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the server task and returns the client's end of the pipe
    pub fn spawn(self) -> MemoryTransport {
        let (client, server) = MemoryTransport::create_pair(16);
        let (to_client, from_client) = server.into_parts();
        tokio::spawn(self.serve(to_client, from_client));
        client
    }

    async fn serve(self, to_client: mpsc::Sender<Bytes>, mut from_client: mpsc::Receiver<Bytes>) {
        let registry = registry();
        let mut logged_in = false;
        let mut served = 0usize;
        let mut held: Option<Bytes> = None;

        if send(&to_client, ServerMessage::Greeting(greeting())).await.is_err() {
            return;
        }

        loop {
            let document = tokio::select! {
                document = from_client.recv() => match document {
                    Some(document) => document,
                    None => return,
                },
                _ = notified(self.hang_up.as_deref()) => return,
            };

            let command = match ClientMessage::from_bytes(&document, &registry) {
                Ok(ClientMessage::Hello) => {
                    if self.refuse_hello && logged_in {
                        return;
                    }
                    if send(&to_client, ServerMessage::Greeting(greeting())).await.is_err() {
                        return;
                    }
                    continue;
                }
                Ok(ClientMessage::Command(command)) => command,
                Err(_) => return,
            };

            served += 1;
            let trans_id = TransId::new(
                command.client_trans_id().map(str::to_owned),
                format!("SRV-{served}"),
            );

            let response = match command.body() {
                CommandBody::Login(login) if login.password == "wrong" => Response::new(
                    EppResult::new(ResultCode::AUTHENTICATION_ERROR, "Authentication error"),
                    trans_id,
                ),
                CommandBody::Login(_) => {
                    logged_in = true;
                    Response::new(
                        EppResult::new(ResultCode::SUCCESS, "Command completed successfully"),
                        trans_id,
                    )
                }
                CommandBody::Logout => {
                    let bye = Response::new(
                        EppResult::new(
                            ResultCode::SUCCESS_ENDING_SESSION,
                            "Command completed successfully; ending session",
                        ),
                        trans_id,
                    );
                    let _ = send(&to_client, ServerMessage::Response(bye)).await;
                    return;
                }
                CommandBody::Poll(_) => Response::new(
                    EppResult::new(ResultCode::SUCCESS_NO_MESSAGES, "Command completed successfully; no messages"),
                    trans_id,
                ),
                CommandBody::Object(_) if self.silent => continue,
                CommandBody::Object(_) => respond_check(&command, trans_id),
            };

            let bytes = match ServerMessage::Response(response).to_bytes() {
                Ok(bytes) => bytes,
                Err(_) => return,
            };

            if self.reorder && matches!(command.body(), CommandBody::Object(_)) {
                match held.take() {
                    None => {
                        held = Some(bytes);
                        continue;
                    }
                    Some(first) => {
                        if to_client.send(bytes).await.is_err() || to_client.send(first).await.is_err() {
                            return;
                        }
                        continue;
                    }
                }
            }

            if to_client.send(bytes).await.is_err() {
                return;
            }
        }
    }
}

/// Builds the answer to an object command
///
/// - names starting with `taken` are unavailable
/// - a name containing `invalid` yields 2005
/// - a name starting with `shutdown` yields 2502
pub fn respond_check(command: &Command, trans_id: TransId) -> Response {
    let Some(check) = command.payload_as::<DomainCheck>() else {
        return Response::new(
            EppResult::new(ResultCode::UNIMPLEMENTED_COMMAND, "Unimplemented command"),
            trans_id,
        );
    };

    if check.names.iter().any(|name| name.contains("invalid")) {
        return Response::new(
            EppResult::new(ResultCode::PARAMETER_VALUE_SYNTAX_ERROR, "Parameter value syntax error"),
            trans_id,
        );
    }
    if check.names.iter().any(|name| name.starts_with("shutdown")) {
        return Response::new(
            EppResult::new(
                ResultCode::SESSION_LIMIT_EXCEEDED_CLOSING,
                "Session limit exceeded; server closing connection",
            ),
            trans_id,
        );
    }

    let results = check
        .names
        .iter()
        .map(|name| {
            let taken = name.starts_with("taken");
            DomainAvailability {
                name: name.clone(),
                available: !taken,
                reason: taken.then(|| "In use".to_owned()),
            }
        })
        .collect();

    let mut response = Response::new(
        EppResult::new(ResultCode::SUCCESS, "Command completed successfully"),
        trans_id,
    )
    .with_data(DomainCheckData { results });
    if let Some(sub_product) = command.extension_of::<SubProduct>() {
        response = response.with_extension(sub_product.clone());
    }
    response
}

async fn notified(notify: Option<&Notify>) {
    match notify {
        Some(notify) => notify.notified().await,
        None => std::future::pending().await,
    }
}

async fn send(to_client: &mpsc::Sender<Bytes>, message: ServerMessage) -> Result<(), ()> {
    let bytes = message.to_bytes().map_err(|_| ())?;
    to_client.send(bytes).await.map_err(|_| ())
}

/// Connects a session to a fresh responder and logs in
pub async fn logged_in_session(responder: Responder) -> Session {
    let mut session = Session::new(Arc::new(registry()), session_config());
    session.connect(responder.spawn()).await.unwrap();
    session.login(&credentials()).await.unwrap();
    session
}

/// Pool factory over in-memory responders
pub struct MemorySessionFactory {
    pub responder: Responder,
    pub registry: Arc<Registry>,
    pub created: AtomicUsize,
}

impl MemorySessionFactory {
    pub fn new(responder: Responder) -> Self {
        Self {
            responder,
            registry: Arc::new(registry()),
            created: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for MemorySessionFactory {
    async fn create(&self) -> Result<Session, SessionError> {
        let mut session = Session::new(Arc::clone(&self.registry), session_config());
        session.connect(self.responder.clone().spawn()).await?;
        session.login(&credentials()).await?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(session)
    }
}
