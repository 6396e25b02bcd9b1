//! One logical EPP connection
//!
//! A [`Session`] owns the transport task, the protocol state and the queue
//! of client transaction ids still waiting for a response.
//!
//! State transitions:
//! ```text
//! Disconnected ──connect──→ Greeted ──login──→ LoggedIn ──logout──→ Disconnected
//!
//! any I/O failure, timeout, ordering violation or closing result code
//!   ──→ Failed (terminal; every further call fails with SessionInvalid)
//! ```
//!
//! In [`SessionMode::Sync`] at most one command is outstanding at a time.
//! In [`SessionMode::Async`] several commands may be sent before their
//! responses are read; responses must come back in send order and
//! [`Session::read_response`] verifies that they do.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use eppkit_protocol::{
    negotiate, ClientMessage, Command, Greeting, Login, Registry, Response, ServerMessage,
    SessionId, SessionState, FRAME_HEADER_SIZE,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::{Credentials, SessionConfig, SessionMode};
use crate::error::{ReceiveError, SendError, SessionError};
use crate::transport::Transport;

/// Channels to the running transport task
struct Channel {
    incoming_rx: mpsc::Receiver<Bytes>,
    outgoing_tx: mpsc::Sender<Bytes>,
    task: JoinHandle<()>,
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// One EPP session over one transport
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    registry: Arc<Registry>,
    state: SessionState,
    mode: SessionMode,
    /// Client transaction ids awaiting a response, in send order
    pending: VecDeque<String>,
    channel: Option<Channel>,
    greeting: Option<Greeting>,
    next_cltrid: u64,
    created_at: Instant,
    last_used: Instant,
}

impl Session {
    /// Creates a disconnected session
    pub fn new(registry: Arc<Registry>, config: SessionConfig) -> Self {
        let now = Instant::now();
        Self {
            id: SessionId::new_v4(),
            mode: config.mode,
            config,
            registry,
            state: SessionState::Disconnected,
            pending: VecDeque::new(),
            channel: None,
            greeting: None,
            next_cltrid: 1,
            created_at: now,
            last_used: now,
        }
    }

    #[inline]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Mode the session was configured with
    #[inline]
    pub fn default_mode(&self) -> SessionMode {
        self.config.mode
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Most recent greeting from the server
    pub fn greeting(&self) -> Option<&Greeting> {
        self.greeting.as_ref()
    }

    /// Number of commands sent whose responses were not read yet
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> + '_ {
        self.pending.iter().map(String::as_str)
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since the last completed exchange
    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    /// Logged in, nothing outstanding and the transport still running
    pub fn is_healthy(&self) -> bool {
        self.state.is_logged_in()
            && self.pending.is_empty()
            && self
                .channel
                .as_ref()
                .is_some_and(|channel| !channel.task.is_finished())
    }

    /// Attaches a transport and waits for the server greeting
    pub async fn connect<T: Transport>(&mut self, transport: T) -> Result<&Greeting, SessionError> {
        self.ensure_usable()?;
        if !self.state.is_disconnected() {
            return Err(SessionError::InvalidState {
                operation: "connect",
                state: self.state,
            });
        }

        let (incoming_tx, incoming_rx) = mpsc::channel(self.config.channel_capacity);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(self.config.channel_capacity);
        let session_id = self.id;
        let task = tokio::spawn(async move {
            if let Err(e) = transport.run(incoming_tx, outgoing_rx).await {
                tracing::warn!(%session_id, error = %e, "Transport stopped with error");
            }
        });
        self.channel = Some(Channel {
            incoming_rx,
            outgoing_tx,
            task,
        });
        self.pending.clear();

        let greeting = self.receive_greeting().await?;
        self.state.transition_to(SessionState::Greeted)?;

        tracing::info!(
            session_id = %self.id,
            server = %greeting.server_id,
            objects = greeting.object_uris.len(),
            extensions = greeting.extension_uris.len(),
            "Session greeted"
        );

        Ok(&*self.greeting.insert(greeting))
    }

    /// Sends `<hello>` and waits for a fresh greeting
    ///
    /// Used as a keepalive and as the pool's validation probe.
    pub async fn hello(&mut self) -> Result<&Greeting, SessionError> {
        self.ensure_usable()?;
        self.ensure_connected("hello")?;
        self.ensure_idle()?;

        self.write(ClientMessage::Hello).await?;
        let greeting = self.receive_greeting().await?;
        tracing::debug!(session_id = %self.id, "Hello answered");

        Ok(&*self.greeting.insert(greeting))
    }

    /// Logs in with the services both sides support
    ///
    /// A rejected login is returned as [`SessionError::Command`] and leaves
    /// the session greeted.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<Response, SessionError> {
        self.ensure_usable()?;
        if !self.state.is_greeted() {
            return Err(SessionError::InvalidState {
                operation: "login",
                state: self.state,
            });
        }
        self.ensure_idle()?;

        let greeting = self
            .greeting
            .as_ref()
            .ok_or(SessionError::UnexpectedMessage("login before greeting"))?;
        let services = negotiate(
            greeting,
            &self.registry.object_uris(),
            &self.registry.extension_uris(),
        )?;

        let mut login = Login::new(credentials.client_id.as_str(), credentials.password.as_str())
            .with_language(services.language)
            .with_services(services.object_uris, services.extension_uris);
        login.new_password = credentials.new_password.clone();

        self.dispatch(Command::login(login)).await?;
        let response = self.read_response().await?.into_result()?;

        self.state.transition_to(SessionState::LoggedIn)?;
        tracing::info!(
            session_id = %self.id,
            client_id = %credentials.client_id,
            "Logged in"
        );
        Ok(response)
    }

    /// Ends the session and detaches the transport
    pub async fn logout(&mut self) -> Result<Response, SessionError> {
        self.ensure_usable()?;
        if !self.state.is_logged_in() {
            return Err(SessionError::InvalidState {
                operation: "logout",
                state: self.state,
            });
        }
        self.ensure_idle()?;

        self.dispatch(Command::logout()).await?;
        let response = self.next_response(true).await?.into_result()?;

        self.state.transition_to(SessionState::Disconnected)?;
        self.channel = None;
        tracing::info!(session_id = %self.id, "Logged out");
        Ok(response)
    }

    /// Encodes and writes `command`, returning its client transaction id
    ///
    /// A command without a client transaction id gets a generated one. In
    /// sync mode only one command may be outstanding; in async mode any
    /// number may be, and their ids queue up in send order.
    pub async fn send(&mut self, command: Command) -> Result<String, SessionError> {
        self.ensure_usable()?;
        if !self.state.is_logged_in() {
            return Err(SessionError::InvalidState {
                operation: "send",
                state: self.state,
            });
        }
        if command.is_session_command() {
            return Err(SessionError::Usage("use login/logout for session commands"));
        }
        if self.mode == SessionMode::Sync {
            self.ensure_idle()?;
        }

        self.dispatch(command).await
    }

    /// Reads the next response and matches it to the oldest pending command
    ///
    /// Failed result codes come back as `Ok`; check
    /// [`Response::is_success`]. A response echoing an unexpected client
    /// transaction id fails the session.
    pub async fn read_response(&mut self) -> Result<Response, SessionError> {
        self.next_response(false).await
    }

    /// Reads and verifies one response; `ending` is set while logging out
    async fn next_response(&mut self, ending: bool) -> Result<Response, SessionError> {
        self.ensure_usable()?;
        if self.pending.is_empty() {
            return Err(SessionError::NoPendingCommand);
        }

        let message = self.receive().await;
        // The frame for the oldest command has arrived, whatever its content
        let expected = self.pending.pop_front().unwrap_or_default();

        let response = match message? {
            ServerMessage::Response(response) => response,
            ServerMessage::Greeting(_) => {
                return Err(self.fail(SessionError::UnexpectedMessage("greeting instead of response")))
            }
        };

        if response.client_trans_id() != Some(expected.as_str()) {
            let actual = response.client_trans_id().map(str::to_owned);
            tracing::error!(
                session_id = %self.id,
                expected = %expected,
                actual = ?actual,
                "Response ordering violated"
            );
            return Err(self.fail(SessionError::OrderingViolation { expected, actual }));
        }

        tracing::debug!(
            session_id = %self.id,
            cltrid = %expected,
            code = ?response.code(),
            "Response received"
        );

        if response.closes_session() && !ending {
            tracing::warn!(session_id = %self.id, code = ?response.code(), "Server is closing the session");
            self.fail_quietly();
        }

        self.last_used = Instant::now();
        Ok(response)
    }

    /// Sends one command and waits for its response
    ///
    /// A server rejection is returned as [`SessionError::Command`], with
    /// the full response inside.
    pub async fn send_and_receive(&mut self, command: Command) -> Result<Response, SessionError> {
        self.ensure_usable()?;
        self.ensure_idle()?;
        self.send(command).await?;
        Ok(self.read_response().await?.into_result()?)
    }

    /// Switches between sync and async operation
    ///
    /// Only allowed with no responses outstanding.
    pub fn set_mode(&mut self, mode: SessionMode) -> Result<(), SessionError> {
        self.ensure_usable()?;
        self.ensure_idle()?;
        if self.mode != mode {
            tracing::debug!(session_id = %self.id, from = %self.mode, to = %mode, "Session mode changed");
            self.mode = mode;
        }
        Ok(())
    }

    /// Best-effort logout, then detaches the transport
    pub async fn close(&mut self) {
        if self.state.is_logged_in() && self.pending.is_empty() {
            if let Err(e) = self.logout().await {
                tracing::warn!(session_id = %self.id, error = %e, "Logout during close failed");
            }
        }
        self.disconnect();
    }

    /// Detaches the transport without talking to the server
    pub fn disconnect(&mut self) {
        self.channel = None;
        self.pending.clear();
        if !self.state.is_failed() && !self.state.is_disconnected() {
            self.state = SessionState::Disconnected;
            tracing::debug!(session_id = %self.id, "Session disconnected");
        }
    }

    fn ensure_usable(&self) -> Result<(), SessionError> {
        if self.state.is_failed() {
            Err(SessionError::SessionInvalid)
        } else {
            Ok(())
        }
    }

    fn ensure_connected(&self, operation: &'static str) -> Result<(), SessionError> {
        if self.state.is_connected() {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(SessionError::PendingResponses(self.pending.len()))
        }
    }

    fn next_client_trans_id(&mut self) -> String {
        let id = format!("{}-{}", self.config.cltrid_prefix, self.next_cltrid);
        self.next_cltrid += 1;
        id
    }

    /// Assigns a client transaction id, writes, and queues the id
    async fn dispatch(&mut self, mut command: Command) -> Result<String, SessionError> {
        let cltrid = match command.client_trans_id() {
            Some(id) => id.to_owned(),
            None => {
                let id = self.next_client_trans_id();
                command.set_client_trans_id(id.as_str());
                id
            }
        };

        tracing::debug!(
            session_id = %self.id,
            cltrid = %cltrid,
            verb = command.verb(),
            namespace = command.target_namespace(),
            "Sending command"
        );

        self.write(ClientMessage::Command(command)).await?;
        self.pending.push_back(cltrid.clone());
        Ok(cltrid)
    }

    async fn write(&mut self, message: ClientMessage) -> Result<(), SessionError> {
        let document = message.to_bytes()?;
        let size = document.len() + FRAME_HEADER_SIZE;
        if size > self.config.max_frame_size {
            return Err(SendError::FrameTooLarge {
                size,
                max: self.config.max_frame_size,
            }
            .into());
        }

        let timeout = self.config.read_timeout();
        let sent = match &self.channel {
            Some(channel) => tokio::time::timeout(timeout, channel.outgoing_tx.send(document)).await,
            None => Ok(Err(mpsc::error::SendError(document))),
        };
        match sent {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(self.fail(SendError::ChannelClosed.into())),
            Err(_) => Err(self.fail(SendError::Timeout(timeout).into())),
        }
    }

    async fn receive(&mut self) -> Result<ServerMessage, SessionError> {
        let timeout = self.config.read_timeout();
        let received = match self.channel.as_mut() {
            Some(channel) => tokio::time::timeout(timeout, channel.incoming_rx.recv()).await,
            None => Ok(None),
        };

        let document = match received {
            Ok(Some(document)) => document,
            Ok(None) => return Err(self.fail(ReceiveError::ConnectionClosed.into())),
            // A late response could still arrive; the stream cannot be trusted anymore
            Err(_) => return Err(self.fail(ReceiveError::Timeout(timeout).into())),
        };

        Ok(ServerMessage::from_bytes(&document, &self.registry)?)
    }

    async fn receive_greeting(&mut self) -> Result<Greeting, SessionError> {
        match self.receive().await? {
            ServerMessage::Greeting(greeting) => {
                self.last_used = Instant::now();
                Ok(greeting)
            }
            ServerMessage::Response(_) => {
                Err(self.fail(SessionError::UnexpectedMessage("response instead of greeting")))
            }
        }
    }

    /// Marks the session failed and passes `error` through
    fn fail(&mut self, error: SessionError) -> SessionError {
        tracing::warn!(session_id = %self.id, state = %self.state, error = %error, "Session failed");
        self.fail_quietly();
        error
    }

    fn fail_quietly(&mut self) {
        self.state = SessionState::Failed;
        self.channel = None;
        self.pending.clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use eppkit_protocol::{EppResult, ResultCode, TransId};

    fn session() -> Session {
        Session::new(
            Arc::new(Registry::new()),
            SessionConfig::default().with_read_timeout(Duration::from_millis(200)),
        )
    }

    fn greeting_bytes() -> Bytes {
        ServerMessage::Greeting(Greeting::new("test server"))
            .to_bytes()
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_session_is_disconnected() {
        let session = session();
        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.mode(), SessionMode::Sync);
        assert_eq!(session.pending_count(), 0);
        assert!(!session.is_healthy());
        assert!(session.greeting().is_none());
    }

    #[tokio::test]
    async fn test_operations_require_state() {
        let mut session = session();

        assert!(matches!(
            session.send(Command::logout()).await,
            Err(SessionError::InvalidState { operation: "send", .. })
        ));
        assert!(matches!(
            session.read_response().await,
            Err(SessionError::NoPendingCommand)
        ));
        assert!(matches!(
            session.login(&Credentials::new("ClientX", "pw")).await,
            Err(SessionError::InvalidState { operation: "login", .. })
        ));
        assert!(matches!(
            session.hello().await,
            Err(SessionError::InvalidState { operation: "hello", .. })
        ));
        // Nothing was marked failed
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_reads_greeting() {
        let (client, server) = MemoryTransport::create_pair(8);
        let (to_client, _from_client) = server.into_parts();
        to_client.send(greeting_bytes()).await.unwrap();

        let mut session = session();
        let greeting = session.connect(client).await.unwrap();
        assert_eq!(greeting.server_id, "test server");
        assert_eq!(session.state(), SessionState::Greeted);

        // Not reusable for a second connect
        let (again, _peer) = MemoryTransport::create_pair(8);
        assert!(matches!(
            session.connect(again).await,
            Err(SessionError::InvalidState { operation: "connect", .. })
        ));
    }

    #[tokio::test]
    async fn test_hello_refreshes_greeting() {
        let (client, server) = MemoryTransport::create_pair(8);
        let (to_client, mut from_client) = server.into_parts();
        to_client.send(greeting_bytes()).await.unwrap();

        let mut session = session();
        session.connect(client).await.unwrap();

        let responder = tokio::spawn(async move {
            let hello = from_client.recv().await.unwrap();
            assert_eq!(
                ClientMessage::from_bytes(&hello, &Registry::new()).unwrap(),
                ClientMessage::Hello
            );
            let fresh = ServerMessage::Greeting(Greeting::new("refreshed"));
            to_client.send(fresh.to_bytes().unwrap()).await.unwrap();
            (to_client, from_client)
        });

        let greeting = session.hello().await.unwrap();
        assert_eq!(greeting.server_id, "refreshed");
        let _peer = responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_hangup_fails_session() {
        let (client, server) = MemoryTransport::create_pair(8);
        drop(server);

        let mut session = session();
        assert!(matches!(
            session.connect(client).await,
            Err(SessionError::Receive(ReceiveError::ConnectionClosed))
        ));
        assert_eq!(session.state(), SessionState::Failed);

        // Failed sessions refuse everything without I/O
        assert!(matches!(session.hello().await, Err(SessionError::SessionInvalid)));
        assert!(matches!(
            session.set_mode(SessionMode::Async),
            Err(SessionError::SessionInvalid)
        ));
        let (again, _peer) = MemoryTransport::create_pair(8);
        assert!(matches!(session.connect(again).await, Err(SessionError::SessionInvalid)));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let (client, server) = MemoryTransport::create_pair(8);
        let _peer = server.into_parts();

        let mut session = session();
        let result = session.connect(client).await;
        assert!(matches!(
            result,
            Err(SessionError::Receive(ReceiveError::Timeout(_)))
        ));
        assert!(session.state().is_failed());
    }

    #[tokio::test]
    async fn test_response_instead_of_greeting_fails_session() {
        let (client, server) = MemoryTransport::create_pair(8);
        let (to_client, _from_client) = server.into_parts();
        let response = Response::new(
            EppResult::new(ResultCode::SUCCESS, "ok"),
            TransId::new(None, "SV-1"),
        );
        to_client
            .send(Bytes::from(response.to_document().unwrap()))
            .await
            .unwrap();

        let mut session = session();
        assert!(matches!(
            session.connect(client).await,
            Err(SessionError::UnexpectedMessage(_))
        ));
        assert!(session.state().is_failed());
    }

    #[tokio::test]
    async fn test_malformed_greeting_is_decode_error() {
        let (client, server) = MemoryTransport::create_pair(8);
        let (to_client, _from_client) = server.into_parts();
        to_client.send(Bytes::from_static(b"<epp>")).await.unwrap();

        let mut session = session();
        assert!(matches!(
            session.connect(client).await,
            Err(SessionError::Decode(_))
        ));
    }

    /// Greets, then never takes another document from the session
    struct StalledTransport;

    #[async_trait::async_trait]
    impl Transport for StalledTransport {
        type Error = std::io::Error;

        async fn run(
            self,
            incoming_tx: mpsc::Sender<Bytes>,
            _outgoing_rx: mpsc::Receiver<Bytes>,
        ) -> Result<(), Self::Error> {
            let _ = incoming_tx.send(greeting_bytes()).await;
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stalled_transport_times_out_writes() {
        let mut session = Session::new(
            Arc::new(Registry::new()),
            SessionConfig {
                channel_capacity: 1,
                ..SessionConfig::default().with_read_timeout(Duration::from_millis(100))
            },
        );
        session.connect(StalledTransport).await.unwrap();

        // The first document fills the channel, the second cannot get in
        session.write(ClientMessage::Hello).await.unwrap();
        let err = session.write(ClientMessage::Hello).await.unwrap_err();
        assert!(matches!(err, SessionError::Send(SendError::Timeout(_))));
        assert!(err.is_fatal());
        assert!(session.state().is_failed());
    }

    #[tokio::test]
    async fn test_set_mode_when_idle() {
        let mut session = session();
        session.set_mode(SessionMode::Async).unwrap();
        assert_eq!(session.mode(), SessionMode::Async);
        session.set_mode(SessionMode::Sync).unwrap();
        assert_eq!(session.mode(), SessionMode::Sync);
    }

    #[tokio::test]
    async fn test_generated_trans_ids() {
        let mut session = Session::new(
            Arc::new(Registry::new()),
            SessionConfig::default().with_cltrid_prefix("REG"),
        );
        assert_eq!(session.next_client_trans_id(), "REG-1");
        assert_eq!(session.next_client_trans_id(), "REG-2");
    }
}
