//! Session creation
//!
//! The pool does not know how connections are made. A [`SessionFactory`]
//! hands it sessions that are already connected and logged in.

use std::sync::Arc;

use async_trait::async_trait;
use eppkit_protocol::Registry;

use crate::config::{ClientConfig, Credentials, SessionConfig};
use crate::error::SessionError;
use crate::session::Session;
use crate::transport::TcpTransport;

/// Produces logged-in sessions
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    /// Connects, reads the greeting and logs in
    async fn create(&self) -> Result<Session, SessionError>;
}

/// Opens plain TCP sessions to one server
pub struct TcpSessionFactory {
    address: String,
    credentials: Credentials,
    session_config: SessionConfig,
    registry: Arc<Registry>,
}

impl TcpSessionFactory {
    pub fn new(
        address: impl Into<String>,
        credentials: Credentials,
        session_config: SessionConfig,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            address: address.into(),
            credentials,
            session_config,
            registry,
        }
    }

    pub fn from_config(config: &ClientConfig, registry: Arc<Registry>) -> Self {
        Self::new(
            config.address.clone(),
            config.credentials.clone(),
            config.session.clone(),
            registry,
        )
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl SessionFactory for TcpSessionFactory {
    async fn create(&self) -> Result<Session, SessionError> {
        let transport =
            TcpTransport::connect(self.address.as_str(), self.session_config.max_frame_size).await?;

        let mut session = Session::new(Arc::clone(&self.registry), self.session_config.clone());
        session.connect(transport).await?;
        if let Err(e) = session.login(&self.credentials).await {
            session.disconnect();
            return Err(e);
        }

        tracing::debug!(
            session_id = %session.id(),
            address = %self.address,
            "Session created"
        );
        Ok(session)
    }
}

impl std::fmt::Debug for TcpSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpSessionFactory")
            .field("address", &self.address)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
