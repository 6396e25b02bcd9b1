//! Command and response envelopes
//!
//! Wire shape of a command:
//! ```text
//! <epp xmlns="urn:ietf:params:xml:ns:epp-1.0">
//!   <command>
//!     <check>                       verb (EPP namespace, optional op attribute)
//!       <domain:check ...>          payload (object mapping namespace)
//!     </check>
//!     <extension>...</extension>    zero or more extension elements
//!     <clTRID>ABC-12345</clTRID>
//!   </command>
//! </epp>
//! ```
//!
//! and of a response:
//! ```text
//! <epp xmlns="urn:ietf:params:xml:ns:epp-1.0">
//!   <response>
//!     <result code="1000"><msg>...</msg></result>   one or more
//!     <msgQ count="5" id="12345">...</msgQ>          optional
//!     <resData><domain:chkData>...</resData>         optional
//!     <extension>...</extension>                     optional
//!     <trID><clTRID/><svTRID/></trID>
//!   </response>
//! </epp>
//! ```

use bytes::Bytes;

use crate::codec::{parse_value, AnyElement, Element, EppCodec};
use crate::error::{CommandError, DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::extension::ExtensionList;
use crate::messages::{Greeting, Hello, Login, Logout, Poll};
use crate::node::CodecNode;
use crate::registry::{Registry, Side};
use crate::service::{epp_element, EPP};

/// Longest client transaction id (RFC 5730 `trIDStringType`)
///
/// Shorter ids than the RFC minimum are left for the server to reject.
pub const MAX_TRANS_ID_LEN: usize = 64;

/// EPP result code
///
/// `1xxx` codes are success, `2xxx` codes are failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultCode(u16);

impl ResultCode {
    pub const SUCCESS: Self = Self(1000);
    pub const SUCCESS_ACTION_PENDING: Self = Self(1001);
    pub const SUCCESS_NO_MESSAGES: Self = Self(1300);
    pub const SUCCESS_ACK_TO_DEQUEUE: Self = Self(1301);
    pub const SUCCESS_ENDING_SESSION: Self = Self(1500);

    pub const UNKNOWN_COMMAND: Self = Self(2000);
    pub const COMMAND_SYNTAX_ERROR: Self = Self(2001);
    pub const COMMAND_USE_ERROR: Self = Self(2002);
    pub const REQUIRED_PARAMETER_MISSING: Self = Self(2003);
    pub const PARAMETER_VALUE_RANGE_ERROR: Self = Self(2004);
    pub const PARAMETER_VALUE_SYNTAX_ERROR: Self = Self(2005);
    pub const UNIMPLEMENTED_PROTOCOL_VERSION: Self = Self(2100);
    pub const UNIMPLEMENTED_COMMAND: Self = Self(2101);
    pub const UNIMPLEMENTED_OPTION: Self = Self(2102);
    pub const UNIMPLEMENTED_EXTENSION: Self = Self(2103);
    pub const BILLING_FAILURE: Self = Self(2104);
    pub const NOT_ELIGIBLE_FOR_RENEWAL: Self = Self(2105);
    pub const NOT_ELIGIBLE_FOR_TRANSFER: Self = Self(2106);
    pub const AUTHENTICATION_ERROR: Self = Self(2200);
    pub const AUTHORIZATION_ERROR: Self = Self(2201);
    pub const INVALID_AUTHORIZATION_INFO: Self = Self(2202);
    pub const OBJECT_PENDING_TRANSFER: Self = Self(2300);
    pub const OBJECT_NOT_PENDING_TRANSFER: Self = Self(2301);
    pub const OBJECT_EXISTS: Self = Self(2302);
    pub const OBJECT_DOES_NOT_EXIST: Self = Self(2303);
    pub const STATUS_PROHIBITS_OPERATION: Self = Self(2304);
    pub const ASSOCIATION_PROHIBITS_OPERATION: Self = Self(2305);
    pub const PARAMETER_VALUE_POLICY_ERROR: Self = Self(2306);
    pub const UNIMPLEMENTED_OBJECT_SERVICE: Self = Self(2307);
    pub const DATA_MANAGEMENT_POLICY_VIOLATION: Self = Self(2308);
    pub const COMMAND_FAILED: Self = Self(2400);
    pub const COMMAND_FAILED_CLOSING: Self = Self(2500);
    pub const AUTHENTICATION_ERROR_CLOSING: Self = Self(2501);
    pub const SESSION_LIMIT_EXCEEDED_CLOSING: Self = Self(2502);

    #[inline]
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    #[inline]
    pub const fn value(&self) -> u16 {
        self.0
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (1000..2000).contains(&self.0)
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// The server ends the session after sending this code
    pub fn closes_session(&self) -> bool {
        *self == Self::SUCCESS_ENDING_SESSION || (2500..=2502).contains(&self.0)
    }
}

impl From<u16> for ResultCode {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `<extValue>`: the offending value plus a server explanation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtValue {
    /// The `<value>` element as received
    pub value: CodecNode,
    pub reason: String,
}

/// One `<result>` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EppResult {
    pub code: ResultCode,
    pub message: String,
    pub language: Option<String>,
    /// `<value>` elements as received
    pub values: Vec<CodecNode>,
    pub ext_values: Vec<ExtValue>,
}

impl EppResult {
    pub fn new(code: impl Into<ResultCode>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            language: None,
            values: Vec::new(),
            ext_values: Vec::new(),
        }
    }

    /// Wraps `node` in a `<value>` element
    pub fn with_value(mut self, node: CodecNode) -> Self {
        self.values.push(epp_element("value").with_child(node));
        self
    }

    pub fn with_ext_value(mut self, node: CodecNode, reason: impl Into<String>) -> Self {
        self.ext_values.push(ExtValue {
            value: epp_element("value").with_child(node),
            reason: reason.into(),
        });
        self
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

impl EppCodec for EppResult {
    fn encode(&self) -> EncodeResult<CodecNode> {
        let mut msg = epp_element("msg").with_text(&self.message);
        if let Some(lang) = &self.language {
            msg.set_attribute("lang", lang.as_str());
        }

        let mut node = epp_element("result")
            .with_attribute("code", self.code.to_string())
            .with_child(msg);
        for value in &self.values {
            node.push(value.clone());
        }
        for ext in &self.ext_values {
            node.push(
                epp_element("extValue")
                    .with_child(ext.value.clone())
                    .with_child(epp_element("reason").with_text(&ext.reason)),
            );
        }
        Ok(node)
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        node.expect(EPP.uri(), "result")?;
        let ns = EPP.uri();
        let msg = node.required_child(ns, "msg")?;

        let ext_values = node
            .children_named(ns, "extValue")
            .map(|ext| -> DecodeResult<ExtValue> {
                Ok(ExtValue {
                    value: ext.required_child(ns, "value")?.clone(),
                    reason: ext.required_text(ns, "reason")?.to_owned(),
                })
            })
            .collect::<DecodeResult<Vec<_>>>()?;

        Ok(Self {
            code: ResultCode(parse_value("result@code", node.required_attribute("code")?)?),
            message: msg.text().unwrap_or("").to_owned(),
            language: msg.attribute("lang").map(str::to_owned),
            values: node.children_named(ns, "value").cloned().collect(),
            ext_values,
        })
    }
}

/// Transaction identifier pair
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransId {
    /// Absent on server-initiated or template responses
    pub client_id: Option<String>,
    pub server_id: String,
}

impl TransId {
    pub fn new(client_id: Option<String>, server_id: impl Into<String>) -> Self {
        Self {
            client_id,
            server_id: server_id.into(),
        }
    }
}

impl EppCodec for TransId {
    fn encode(&self) -> EncodeResult<CodecNode> {
        if self.server_id.is_empty() {
            return Err(EncodeError::MissingField("svTRID"));
        }
        Ok(epp_element("trID")
            .with_optional_child(
                self.client_id
                    .as_ref()
                    .map(|id| epp_element("clTRID").with_text(id)),
            )
            .with_child(epp_element("svTRID").with_text(&self.server_id)))
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        node.expect(EPP.uri(), "trID")?;
        Ok(Self {
            client_id: node.child_text(EPP.uri(), "clTRID").map(str::to_owned),
            server_id: node.required_text(EPP.uri(), "svTRID")?.to_owned(),
        })
    }
}

/// `<msgQ>` block of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQueue {
    pub count: u32,
    pub id: String,
    pub queue_date: Option<String>,
    pub message: Option<String>,
}

impl EppCodec for MessageQueue {
    fn encode(&self) -> EncodeResult<CodecNode> {
        if self.id.is_empty() {
            return Err(EncodeError::MissingField("msgQ@id"));
        }
        Ok(epp_element("msgQ")
            .with_attribute("count", self.count.to_string())
            .with_attribute("id", self.id.as_str())
            .with_optional_child(
                self.queue_date
                    .as_ref()
                    .map(|date| epp_element("qDate").with_text(date)),
            )
            .with_optional_child(self.message.as_ref().map(|msg| epp_element("msg").with_text(msg))))
    }

    fn decode(node: &CodecNode) -> DecodeResult<Self> {
        node.expect(EPP.uri(), "msgQ")?;
        Ok(Self {
            count: parse_value("msgQ@count", node.required_attribute("count")?)?,
            id: node.required_attribute("id")?.to_owned(),
            queue_date: node.child_text(EPP.uri(), "qDate").map(str::to_owned),
            message: node.child_text(EPP.uri(), "msg").map(str::to_owned),
        })
    }
}

/// An object-mapping command inside its verb element
#[derive(Debug, Clone)]
pub struct ObjectCommand {
    /// `op` attribute of the verb element (`transfer op="request"`)
    pub op: Option<String>,
    pub payload: Box<dyn AnyElement>,
}

impl PartialEq for ObjectCommand {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.payload.eq_dyn(other.payload.as_ref())
    }
}

/// What a command carries
#[derive(Debug, Clone, PartialEq)]
pub enum CommandBody {
    Login(Login),
    Logout,
    Poll(Poll),
    Object(ObjectCommand),
}

/// Outgoing command envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    client_trans_id: Option<String>,
    body: CommandBody,
    extensions: ExtensionList,
}

impl Command {
    /// Wraps an object-mapping payload; the verb is the payload's tag
    pub fn new<T: Element>(payload: T) -> Self {
        Self::from_boxed(Box::new(payload))
    }

    pub fn from_boxed(payload: Box<dyn AnyElement>) -> Self {
        Self::with_body(CommandBody::Object(ObjectCommand { op: None, payload }))
    }

    pub fn login(login: Login) -> Self {
        Self::with_body(CommandBody::Login(login))
    }

    pub fn logout() -> Self {
        Self::with_body(CommandBody::Logout)
    }

    pub fn poll(poll: Poll) -> Self {
        Self::with_body(CommandBody::Poll(poll))
    }

    fn with_body(body: CommandBody) -> Self {
        Self {
            client_trans_id: None,
            body,
            extensions: ExtensionList::new(),
        }
    }

    pub fn with_client_trans_id(mut self, id: impl Into<String>) -> Self {
        self.client_trans_id = Some(id.into());
        self
    }

    /// Sets the verb `op` attribute; ignored for session commands
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        if let CommandBody::Object(object) = &mut self.body {
            object.op = Some(op.into());
        }
        self
    }

    /// Attaches an extension, replacing any previous one of the same type
    pub fn with_extension<T: Element>(mut self, extension: T) -> Self {
        self.extensions.insert(extension);
        self
    }

    #[inline]
    pub fn client_trans_id(&self) -> Option<&str> {
        self.client_trans_id.as_deref()
    }

    pub fn set_client_trans_id(&mut self, id: impl Into<String>) {
        self.client_trans_id = Some(id.into());
    }

    #[inline]
    pub fn body(&self) -> &CommandBody {
        &self.body
    }

    #[inline]
    pub fn extensions(&self) -> &ExtensionList {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut ExtensionList {
        &mut self.extensions
    }

    pub fn extension_of<T: Element>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Object payload, `None` for session commands
    pub fn payload(&self) -> Option<&(dyn AnyElement + 'static)> {
        match &self.body {
            CommandBody::Object(object) => Some(object.payload.as_ref()),
            _ => None,
        }
    }

    pub fn payload_as<T: Element>(&self) -> Option<&T> {
        self.payload().and_then(|p| p.downcast_ref::<T>())
    }

    /// Operation verb, e.g. `check` or `login`
    pub fn verb(&self) -> &'static str {
        match &self.body {
            CommandBody::Login(_) => Login::TAG,
            CommandBody::Logout => Logout::TAG,
            CommandBody::Poll(_) => Poll::TAG,
            CommandBody::Object(object) => object.payload.tag(),
        }
    }

    /// Namespace of the payload; the EPP namespace for session commands
    pub fn target_namespace(&self) -> &'static str {
        match &self.body {
            CommandBody::Object(object) => object.payload.service().uri(),
            _ => EPP.uri(),
        }
    }

    /// Returns true for `<login>` and `<logout>`
    pub fn is_session_command(&self) -> bool {
        matches!(self.body, CommandBody::Login(_) | CommandBody::Logout)
    }

    /// Encodes the full `<epp>` document tree
    pub fn encode(&self) -> EncodeResult<CodecNode> {
        if let Some(id) = &self.client_trans_id {
            let len = id.chars().count();
            if !(1..=MAX_TRANS_ID_LEN).contains(&len) {
                return Err(EncodeError::InvalidValue {
                    field: "clTRID",
                    reason: format!("length {} outside 1..={}", len, MAX_TRANS_ID_LEN),
                });
            }
        }

        let verb = match &self.body {
            CommandBody::Login(login) => login.encode()?,
            CommandBody::Logout => Logout.encode()?,
            CommandBody::Poll(poll) => poll.encode()?,
            CommandBody::Object(object) => {
                let payload = object.payload.encode_node()?;
                let mut verb = epp_element(object.payload.tag()).with_child(payload);
                if let Some(op) = &object.op {
                    verb.set_attribute("op", op.as_str());
                }
                verb
            }
        };

        let command = epp_element("command")
            .with_child(verb)
            .with_optional_child(self.extensions.encode()?)
            .with_optional_child(
                self.client_trans_id
                    .as_ref()
                    .map(|id| epp_element("clTRID").with_text(id)),
            );

        Ok(epp_element("epp").with_child(command))
    }

    /// Decodes an `<epp><command>` document, dispatching through `registry`
    pub fn decode(node: &CodecNode, registry: &Registry) -> DecodeResult<Self> {
        let ns = EPP.uri();
        node.expect(ns, "epp")?;
        Self::decode_inner(node.required_child(ns, "command")?, registry)
    }

    fn decode_inner(command: &CodecNode, registry: &Registry) -> DecodeResult<Self> {
        let ns = EPP.uri();
        let verb = command
            .children()
            .iter()
            .find(|c| c.namespace() == Some(ns) && !matches!(c.local_name(), "extension" | "clTRID"))
            .ok_or_else(|| DecodeError::MissingElement("command verb".to_owned()))?;

        let body = match verb.local_name() {
            Login::TAG => CommandBody::Login(Login::decode(verb)?),
            Logout::TAG => CommandBody::Logout,
            Poll::TAG => CommandBody::Poll(Poll::decode(verb)?),
            _ => {
                let payload_node = verb
                    .first_child()
                    .ok_or_else(|| DecodeError::MissingElement(format!("{} payload", verb.local_name())))?;
                CommandBody::Object(ObjectCommand {
                    op: verb.attribute("op").map(str::to_owned),
                    payload: registry.mappings().decode_command(payload_node)?,
                })
            }
        };

        let extensions = command
            .child(ns, "extension")
            .map(|block| registry.extensions().decode_block(Side::Command, block))
            .unwrap_or_default();

        Ok(Self {
            client_trans_id: command.child_text(ns, "clTRID").map(str::to_owned),
            body,
            extensions,
        })
    }

    /// Serializes to a standalone XML document
    pub fn to_document(&self) -> EncodeResult<String> {
        Ok(self.encode()?.to_document())
    }
}

/// Incoming response envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    results: Vec<EppResult>,
    message_queue: Option<MessageQueue>,
    data: Option<Box<dyn AnyElement>>,
    extensions: ExtensionList,
    trans_id: TransId,
}

impl Response {
    pub fn new(result: EppResult, trans_id: TransId) -> Self {
        Self {
            results: vec![result],
            message_queue: None,
            data: None,
            extensions: ExtensionList::new(),
            trans_id,
        }
    }

    pub fn with_result(mut self, result: EppResult) -> Self {
        self.results.push(result);
        self
    }

    pub fn with_data<T: Element>(mut self, data: T) -> Self {
        self.data = Some(Box::new(data));
        self
    }

    pub fn with_extension<T: Element>(mut self, extension: T) -> Self {
        self.extensions.insert(extension);
        self
    }

    pub fn with_message_queue(mut self, queue: MessageQueue) -> Self {
        self.message_queue = Some(queue);
        self
    }

    pub fn extensions_mut(&mut self) -> &mut ExtensionList {
        &mut self.extensions
    }

    /// Derived from the first result only
    pub fn is_success(&self) -> bool {
        self.results.first().is_some_and(EppResult::is_success)
    }

    pub fn code(&self) -> Option<ResultCode> {
        self.results.first().map(|r| r.code)
    }

    pub fn message(&self) -> Option<&str> {
        self.results.first().map(|r| r.message.as_str())
    }

    /// Returns true if the server closes the session after this response
    pub fn closes_session(&self) -> bool {
        self.results.iter().any(|r| r.code.closes_session())
    }

    #[inline]
    pub fn results(&self) -> &[EppResult] {
        &self.results
    }

    #[inline]
    pub fn message_queue(&self) -> Option<&MessageQueue> {
        self.message_queue.as_ref()
    }

    pub fn data(&self) -> Option<&(dyn AnyElement + 'static)> {
        self.data.as_deref()
    }

    pub fn data_as<T: Element>(&self) -> Option<&T> {
        self.data().and_then(|d| d.downcast_ref::<T>())
    }

    #[inline]
    pub fn extensions(&self) -> &ExtensionList {
        &self.extensions
    }

    /// Extension of type `T`; absence is not an error
    pub fn extension_of<T: Element>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    #[inline]
    pub fn trans_id(&self) -> &TransId {
        &self.trans_id
    }

    pub fn client_trans_id(&self) -> Option<&str> {
        self.trans_id.client_id.as_deref()
    }

    pub fn server_trans_id(&self) -> &str {
        &self.trans_id.server_id
    }

    /// Splits server rejections off into [`CommandError`]
    pub fn into_result(self) -> Result<Response, CommandError> {
        if self.is_success() {
            return Ok(self);
        }
        let (code, message) = self
            .results
            .first()
            .map(|r| (r.code, r.message.clone()))
            .unwrap_or((ResultCode::COMMAND_FAILED, String::new()));
        Err(CommandError {
            code,
            message,
            response: Box::new(self),
        })
    }

    pub fn encode(&self) -> EncodeResult<CodecNode> {
        if self.results.is_empty() {
            return Err(EncodeError::MissingField("result"));
        }

        let mut response = epp_element("response");
        for result in &self.results {
            response.push(result.encode()?);
        }
        if let Some(queue) = &self.message_queue {
            response.push(queue.encode()?);
        }
        if let Some(data) = &self.data {
            response.push(epp_element("resData").with_child(data.encode_node()?));
        }
        if let Some(block) = self.extensions.encode()? {
            response.push(block);
        }
        response.push(self.trans_id.encode()?);

        Ok(epp_element("epp").with_child(response))
    }

    /// Decodes an `<epp><response>` document, dispatching through `registry`
    pub fn decode(node: &CodecNode, registry: &Registry) -> DecodeResult<Self> {
        let ns = EPP.uri();
        node.expect(ns, "epp")?;
        Self::decode_inner(node.required_child(ns, "response")?, registry)
    }

    fn decode_inner(response: &CodecNode, registry: &Registry) -> DecodeResult<Self> {
        let ns = EPP.uri();

        let results = response
            .children_named(ns, "result")
            .map(EppResult::decode)
            .collect::<DecodeResult<Vec<_>>>()?;
        if results.is_empty() {
            return Err(DecodeError::MissingElement("response result".to_owned()));
        }

        let trans_id = TransId::decode(response.required_child(ns, "trID")?)?;

        let message_queue = response
            .child(ns, "msgQ")
            .map(MessageQueue::decode)
            .transpose()?;

        // Payload is only meaningful on success
        let data = match response.child(ns, "resData").and_then(CodecNode::first_child) {
            Some(payload) if results[0].is_success() => {
                Some(registry.mappings().decode_response(payload)?)
            }
            _ => None,
        };

        let extensions = response
            .child(ns, "extension")
            .map(|block| registry.extensions().decode_block(Side::Response, block))
            .unwrap_or_default();

        Ok(Self {
            results,
            message_queue,
            data,
            extensions,
            trans_id,
        })
    }

    pub fn to_document(&self) -> EncodeResult<String> {
        Ok(self.encode()?.to_document())
    }
}

/// Any document a server sends
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Greeting(Greeting),
    Response(Response),
}

impl ServerMessage {
    pub fn decode(node: &CodecNode, registry: &Registry) -> DecodeResult<Self> {
        let ns = EPP.uri();
        node.expect(ns, "epp")?;
        let inner = node
            .first_child()
            .ok_or_else(|| DecodeError::MissingElement("epp content".to_owned()))?;

        if inner.is(ns, Greeting::TAG) {
            Ok(ServerMessage::Greeting(Greeting::decode(inner)?))
        } else if inner.is(ns, "response") {
            Ok(ServerMessage::Response(Response::decode_inner(inner, registry)?))
        } else {
            Err(DecodeError::UnexpectedElement {
                expected: "greeting or response".to_owned(),
                found: inner.name().to_string(),
            })
        }
    }

    /// Parses and decodes one framed document
    pub fn from_bytes(bytes: &[u8], registry: &Registry) -> DecodeResult<Self> {
        Self::decode(&CodecNode::from_bytes(bytes)?, registry)
    }

    pub fn encode(&self) -> EncodeResult<CodecNode> {
        match self {
            ServerMessage::Greeting(greeting) => Ok(epp_element("epp").with_child(greeting.encode()?)),
            ServerMessage::Response(response) => response.encode(),
        }
    }

    pub fn to_bytes(&self) -> EncodeResult<Bytes> {
        Ok(Bytes::from(self.encode()?.to_document()))
    }
}

/// Any document a client sends
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Hello,
    Command(Command),
}

impl ClientMessage {
    pub fn decode(node: &CodecNode, registry: &Registry) -> DecodeResult<Self> {
        let ns = EPP.uri();
        node.expect(ns, "epp")?;
        let inner = node
            .first_child()
            .ok_or_else(|| DecodeError::MissingElement("epp content".to_owned()))?;

        if inner.is(ns, Hello::TAG) {
            Ok(ClientMessage::Hello)
        } else if inner.is(ns, "command") {
            Ok(ClientMessage::Command(Command::decode_inner(inner, registry)?))
        } else {
            Err(DecodeError::UnexpectedElement {
                expected: "hello or command".to_owned(),
                found: inner.name().to_string(),
            })
        }
    }

    pub fn from_bytes(bytes: &[u8], registry: &Registry) -> DecodeResult<Self> {
        Self::decode(&CodecNode::from_bytes(bytes)?, registry)
    }

    pub fn encode(&self) -> EncodeResult<CodecNode> {
        match self {
            ClientMessage::Hello => Ok(epp_element("epp").with_child(Hello.encode()?)),
            ClientMessage::Command(command) => command.encode(),
        }
    }

    pub fn to_bytes(&self) -> EncodeResult<Bytes> {
        Ok(Bytes::from(self.encode()?.to_document()))
    }
}
