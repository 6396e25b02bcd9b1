//! # eppkit client
//!
//! Session runtime and session pool for EPP.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use eppkit_client::{ClientConfig, PoolConfig, SessionPool, TcpSessionFactory};
//! use eppkit_protocol::{Command, Registry};
//!
//! # async fn run(registry: Registry, command: Command) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let factory = TcpSessionFactory::from_config(&config, Arc::new(registry));
//! let pool = SessionPool::new(factory, PoolConfig::default());
//!
//! let mut session = pool.borrow().await?;
//! match session.send_and_receive(command).await {
//!     Ok(response) => println!("{:?}", response.code()),
//!     Err(e) if e.is_fatal() => {
//!         pool.invalidate(session);
//!         return Err(e.into());
//!     }
//!     Err(e) => println!("rejected: {e}"),
//! }
//! pool.return_session(session).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod pool;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, Credentials, PoolConfig, SessionConfig, SessionMode};
pub use error::{PoolError, ReceiveError, SendError, SessionError};
pub use factory::{SessionFactory, TcpSessionFactory};
pub use pool::{PoolStatus, SessionPool};
pub use session::Session;
pub use transport::{MemoryTransport, TcpTransport, Transport};
