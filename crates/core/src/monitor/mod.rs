//! Session expiration monitor: one task owning the poll, the countdown and
//! the extend/logout resolution

pub mod actor;
pub mod rpc;

use self::actor::MonitorActor;
use self::rpc::MonitorRequest;
use crate::clock::{Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::session::AuthSession;
use crate::token::TokenStore;
use crate::types::{ExtendOutcome, MonitorStatus};
use crate::warning::WarningState;
use crate::watcher::{Decision, ExpirationWatcher};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const REQUEST_BUFFER: usize = 32;

/// Builder for a [`SessionMonitor`]
pub struct SessionMonitorBuilder {
    config: MonitorConfig,
    store: Option<Arc<dyn TokenStore>>,
    session: Option<Arc<dyn AuthSession>>,
    clock: Arc<dyn Clock>,
}

impl Default for SessionMonitorBuilder {
    fn default() -> Self {
        Self {
            config: MonitorConfig::default(),
            store: None,
            session: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl SessionMonitorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_session(mut self, session: Arc<dyn AuthSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Spawn the monitor task. The first expiration check runs immediately.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidConfig`] if the policy is invalid or a
    /// collaborator is missing
    pub fn spawn(self) -> Result<SessionMonitor> {
        self.config.validate()?;
        let store = self
            .store
            .ok_or_else(|| MonitorError::InvalidConfig("token store not set".to_string()))?;
        let session = self
            .session
            .ok_or_else(|| MonitorError::InvalidConfig("auth session not set".to_string()))?;

        let watcher = ExpirationWatcher::new(store, self.clock, self.config.warning_threshold_secs);
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let (warning_tx, warning_rx) = watch::channel(WarningState::default());

        let actor = MonitorActor::new(self.config, watcher, session, rx, warning_tx);
        let task = tokio::spawn(actor.run());

        Ok(SessionMonitor {
            handle: MonitorHandle { tx, warning_rx },
            task,
        })
    }
}

/// A running monitor. Dropping it aborts the monitor task; use
/// [`SessionMonitor::shutdown`] for an orderly stop.
pub struct SessionMonitor {
    handle: MonitorHandle,
    task: JoinHandle<()>,
}

impl SessionMonitor {
    pub fn builder() -> SessionMonitorBuilder {
        SessionMonitorBuilder::new()
    }

    /// Get a cloneable handle for the rendering layer
    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Whether the monitor task has ended
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop polling and counting down, let in-flight logouts finish, and
    /// wait for the task to end
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor task already ended
    pub async fn shutdown(mut self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.handle
            .tx
            .send(MonitorRequest::Shutdown { reply })
            .await?;
        rx.await?;
        // The actor returns right after replying
        let _ = (&mut self.task).await;
        Ok(())
    }
}

impl std::ops::Deref for SessionMonitor {
    type Target = MonitorHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Client side of a running monitor
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<MonitorRequest>,
    warning_rx: watch::Receiver<WarningState>,
}

impl MonitorHandle {
    /// Current warning state
    pub fn warning(&self) -> WarningState {
        *self.warning_rx.borrow()
    }

    /// Subscribe to warning changes
    pub fn subscribe(&self) -> watch::Receiver<WarningState> {
        self.warning_rx.clone()
    }

    /// The user asked to stay logged in. Resolves once the refresh settles;
    /// the countdown keeps running meanwhile.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor is no longer running
    pub async fn extend(&self) -> Result<ExtendOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(MonitorRequest::Extend { reply }).await?;
        Ok(rx.await?)
    }

    /// The user asked to log out
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor is no longer running
    pub async fn logout_now(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(MonitorRequest::LogoutNow { reply }).await?;
        Ok(rx.await?)
    }

    /// Run an expiration check outside the poll cadence
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor is no longer running
    pub async fn check_now(&self) -> Result<Decision> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(MonitorRequest::CheckNow { reply }).await?;
        Ok(rx.await?)
    }

    /// A fresh login happened: leave the logged-out state and resume polling.
    ///
    /// Resolves once logouts of the previous session have finished. Store the
    /// new token after this returns, otherwise a pending logout may clear it.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor is no longer running
    pub async fn restart(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(MonitorRequest::Restart { reply }).await?;
        Ok(rx.await?)
    }

    /// # Errors
    ///
    /// Returns an error if the monitor is no longer running
    pub async fn status(&self) -> Result<MonitorStatus> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(MonitorRequest::GetStatus { reply }).await?;
        Ok(rx.await?)
    }
}
