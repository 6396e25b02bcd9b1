//! Session pool
//!
//! Keeps logged-in sessions around between callers. A borrowed
//! [`Session`] belongs to the borrower until it comes back through
//! [`SessionPool::return_session`] or [`SessionPool::invalidate`]; the pool
//! only tracks its id.
//!
//! Capacity rule: borrowed sessions, sessions being created or validated
//! and idle sessions together never exceed `max_active`.
//!
//! The bookkeeping mutex is never held across an `.await`.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use eppkit_protocol::SessionId;

use crate::config::PoolConfig;
use crate::error::{PoolError, SessionError};
use crate::factory::SessionFactory;
use crate::session::Session;

/// Idle and active counts at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStatus {
    /// Sessions waiting in the idle set
    pub idle: usize,
    /// Sessions borrowed, being created, or being validated
    pub active: usize,
}

struct PoolInner {
    idle: VecDeque<Session>,
    borrowed: HashSet<SessionId>,
    /// Slots taken by creation or validation in progress
    reserved: usize,
    closed: bool,
}

impl PoolInner {
    fn occupied(&self) -> usize {
        self.idle.len() + self.borrowed.len() + self.reserved
    }
}

/// Gives a reserved slot back if the owning future is dropped early
struct Reservation<'a, F: SessionFactory> {
    pool: &'a SessionPool<F>,
    released: bool,
}

impl<F: SessionFactory> Reservation<'_, F> {
    /// Turns the reservation into a borrowed session
    fn commit(mut self, id: SessionId) {
        let mut inner = self.pool.lock();
        inner.reserved -= 1;
        inner.borrowed.insert(id);
        self.released = true;
    }

    /// Turns the reservation into an idle session
    fn park(mut self, session: Session) {
        let mut inner = self.pool.lock();
        inner.reserved -= 1;
        inner.idle.push_back(session);
        self.released = true;
    }
}

impl<F: SessionFactory> Drop for Reservation<'_, F> {
    fn drop(&mut self) {
        if !self.released {
            self.pool.lock().reserved -= 1;
        }
    }
}

/// Pool of logged-in sessions produced by a [`SessionFactory`]
pub struct SessionPool<F: SessionFactory> {
    factory: F,
    config: PoolConfig,
    inner: Mutex<PoolInner>,
}

impl<F: SessionFactory> SessionPool<F> {
    pub fn new(factory: F, config: PoolConfig) -> Self {
        Self {
            factory,
            config,
            inner: Mutex::new(PoolInner {
                idle: VecDeque::new(),
                borrowed: HashSet::new(),
                reserved: 0,
                closed: false,
            }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn status(&self) -> PoolStatus {
        let inner = self.lock();
        PoolStatus {
            idle: inner.idle.len(),
            active: inner.borrowed.len() + inner.reserved,
        }
    }

    /// Hands out an idle session, or creates one if there is room
    ///
    /// Idle sessions are probed with `<hello>` first when
    /// `validate_on_borrow` is set; sessions that fail the probe or have
    /// expired are torn down and the next one is tried.
    pub async fn borrow(&self) -> Result<Session, PoolError> {
        let mut probe_failure: Option<SessionError> = None;

        loop {
            let candidate = {
                let mut inner = self.lock();
                if inner.closed {
                    return Err(PoolError::Closed);
                }
                match inner.idle.pop_back() {
                    Some(session) => {
                        inner.reserved += 1;
                        Some(session)
                    }
                    None if inner.occupied() < self.config.max_active => {
                        inner.reserved += 1;
                        None
                    }
                    None => {
                        return Err(match probe_failure {
                            Some(e) => PoolError::ValidationFailed(e),
                            None => PoolError::PoolExhausted {
                                max_active: self.config.max_active,
                            },
                        });
                    }
                }
            };
            let reservation = Reservation {
                pool: self,
                released: false,
            };

            let Some(mut session) = candidate else {
                let session = self.factory.create().await?;
                reservation.commit(session.id());
                tracing::info!(session_id = %session.id(), "Pool created session");
                return Ok(session);
            };

            if self.is_expired(&session) {
                tracing::debug!(session_id = %session.id(), "Discarding expired session");
                session.close().await;
                continue;
            }

            if self.config.validate_on_borrow {
                if let Err(e) = self.validate(&mut session).await {
                    tracing::warn!(session_id = %session.id(), error = %e, "Idle session failed validation");
                    session.disconnect();
                    probe_failure = Some(e);
                    continue;
                }
            } else if !session.is_healthy() {
                tracing::debug!(session_id = %session.id(), "Discarding idle session with stopped transport");
                session.disconnect();
                continue;
            }

            reservation.commit(session.id());
            tracing::debug!(session_id = %session.id(), "Borrowed idle session");
            return Ok(session);
        }
    }

    /// Gives a session back
    ///
    /// Healthy sessions go to the idle set while it has room, back in their
    /// configured mode; anything else is torn down.
    pub async fn return_session(&self, mut session: Session) {
        if session.is_healthy() {
            let mode = session.default_mode();
            if let Err(e) = session.set_mode(mode) {
                tracing::warn!(session_id = %session.id(), error = %e, "Could not restore session mode");
            }
        }

        let reason = {
            let mut inner = self.lock();
            if !inner.borrowed.remove(&session.id()) {
                tracing::warn!(session_id = %session.id(), "Returned session was not borrowed from this pool");
            }

            if inner.closed {
                "pool closed"
            } else if !session.is_healthy() {
                "unhealthy"
            } else if inner.idle.len() >= self.config.max_idle {
                "idle set full"
            } else if inner.occupied() >= self.config.max_active {
                "pool full"
            } else {
                inner.idle.push_back(session);
                return;
            }
        };

        tracing::info!(
            session_id = %session.id(),
            state = %session.state(),
            pending = session.pending_count(),
            reason,
            "Pool discarding session"
        );
        session.close().await;
    }

    /// Tears a session down without returning it
    pub fn invalidate(&self, mut session: Session) {
        self.lock().borrowed.remove(&session.id());
        tracing::info!(session_id = %session.id(), state = %session.state(), "Session invalidated");
        session.disconnect();
    }

    /// Opens sessions until `min_idle` are waiting
    ///
    /// Returns how many sessions were created.
    pub async fn prewarm(&self) -> Result<usize, PoolError> {
        let mut created = 0;

        loop {
            {
                let mut inner = self.lock();
                if inner.closed {
                    return Err(PoolError::Closed);
                }
                if inner.idle.len() + inner.reserved >= self.config.min_idle
                    || inner.occupied() >= self.config.max_active
                {
                    break;
                }
                inner.reserved += 1;
            }
            let reservation = Reservation {
                pool: self,
                released: false,
            };

            let session = self.factory.create().await?;
            reservation.park(session);
            created += 1;
        }

        if created > 0 {
            tracing::info!(created, "Pool prewarmed");
        }
        Ok(created)
    }

    /// Tears down idle sessions past their idle timeout or maximum age
    ///
    /// Returns how many were evicted.
    pub async fn evict_expired(&self) -> usize {
        let expired: Vec<Session> = {
            let mut inner = self.lock();
            let (expired, kept): (Vec<Session>, Vec<Session>) = std::mem::take(&mut inner.idle)
                .into_iter()
                .partition(|session| self.is_expired(session));
            inner.idle = kept.into();
            expired
        };

        let count = expired.len();
        for mut session in expired {
            tracing::warn!(
                session_id = %session.id(),
                age_ms = session.age().as_millis() as u64,
                idle_ms = session.idle_for().as_millis() as u64,
                "Evicting idle session"
            );
            session.close().await;
        }
        count
    }

    /// Stops handing out sessions and logs out every idle one
    ///
    /// Borrowed sessions are torn down as they come back.
    pub async fn close(&self) {
        let idle: Vec<Session> = {
            let mut inner = self.lock();
            inner.closed = true;
            inner.idle.drain(..).collect()
        };

        tracing::info!(idle = idle.len(), "Closing pool");
        for mut session in idle {
            session.close().await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    async fn validate(&self, session: &mut Session) -> Result<(), SessionError> {
        if !session.is_healthy() {
            return Err(SessionError::SessionInvalid);
        }
        session.hello().await?;
        Ok(())
    }

    fn is_expired(&self, session: &Session) -> bool {
        let too_old = self
            .config
            .max_session_age()
            .is_some_and(|max| session.age() >= max);
        let idle_too_long = self
            .config
            .idle_timeout()
            .is_some_and(|max| session.idle_for() >= max);
        too_old || idle_too_long
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F: SessionFactory> std::fmt::Debug for SessionPool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
