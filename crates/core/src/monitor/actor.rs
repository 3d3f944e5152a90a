use crate::config::MonitorConfig;
use crate::countdown::{Countdown, Tick};
use crate::error::SessionError;
use crate::monitor::rpc::MonitorRequest;
use crate::session::AuthSession;
use crate::types::{ExtendOutcome, MonitorStatus, PhaseKind, SessionEndReason};
use crate::warning::WarningState;
use crate::watcher::{Decision, ExpirationWatcher};
use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use std::future::pending;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

type SessionCall = BoxFuture<'static, Result<(), SessionError>>;

/// Monitor state machine. The countdown timer only exists inside `Armed`.
enum Phase {
    Unarmed,
    Armed(Countdown),
    /// Sticky until a restart: nothing may re-arm the warning
    LoggedOut(SessionEndReason),
}

impl Phase {
    fn kind(&self) -> PhaseKind {
        match self {
            Self::Unarmed => PhaseKind::Unarmed,
            Self::Armed(countdown) => PhaseKind::Armed {
                seconds_remaining: countdown.seconds_remaining(),
            },
            Self::LoggedOut(reason) => PhaseKind::LoggedOut(reason.clone()),
        }
    }
}

/// A refresh call in flight, plus every `extend()` caller waiting on it
struct PendingRefresh {
    call: SessionCall,
    waiters: Vec<oneshot::Sender<ExtendOutcome>>,
}

pub struct MonitorActor {
    config: MonitorConfig,
    watcher: ExpirationWatcher,
    session: Arc<dyn AuthSession>,
    rx: mpsc::Receiver<MonitorRequest>,
    warning_tx: watch::Sender<WarningState>,
    phase: Phase,
    /// Last countdown value shown to the user
    seconds_left: u64,
    poll: Option<Interval>,
    refresh: Option<PendingRefresh>,
    logouts_in_flight: FuturesUnordered<SessionCall>,
    checks: u64,
    logouts: u64,
}

impl MonitorActor {
    pub fn new(
        config: MonitorConfig,
        watcher: ExpirationWatcher,
        session: Arc<dyn AuthSession>,
        rx: mpsc::Receiver<MonitorRequest>,
        warning_tx: watch::Sender<WarningState>,
    ) -> Self {
        Self {
            config,
            watcher,
            session,
            rx,
            warning_tx,
            phase: Phase::Unarmed,
            seconds_left: 0,
            poll: None,
            refresh: None,
            logouts_in_flight: FuturesUnordered::new(),
            checks: 0,
            logouts: 0,
        }
    }

    pub async fn run(mut self) {
        info!(
            "Session monitor started (threshold {}s, poll every {}s)",
            self.config.warning_threshold_secs, self.config.poll_interval_secs
        );
        self.start_polling();
        self.run_check();

        loop {
            // Countdown before poll, so a poll landing on the same instant
            // reads the already decremented value.
            tokio::select! {
                biased;

                tick = next_tick(&mut self.phase) => self.on_tick(tick),
                () = next_poll(&mut self.poll) => {
                    self.run_check();
                }
                (result, waiters) = refresh_done(&mut self.refresh) => {
                    self.on_refresh_done(result, waiters);
                }
                Some(result) = self.logouts_in_flight.next(), if !self.logouts_in_flight.is_empty() => {
                    if let Err(e) = result {
                        warn!("Remote logout failed, local session already cleared: {}", e);
                    }
                }
                req = self.rx.recv() => match req {
                    Some(MonitorRequest::Shutdown { reply }) => {
                        self.finish().await;
                        let _ = reply.send(());
                        return;
                    }
                    Some(MonitorRequest::Restart { reply }) => {
                        // A late logout would clear the next session's token
                        self.drain_logouts().await;
                        self.restart();
                        let _ = reply.send(());
                    }
                    Some(req) => self.handle_request(req),
                    None => break,
                },
            }
        }

        debug!("All monitor handles dropped");
        self.finish().await;
    }

    fn handle_request(&mut self, req: MonitorRequest) {
        match req {
            MonitorRequest::Extend { reply } => self.extend(reply),
            MonitorRequest::LogoutNow { reply } => {
                self.force_logout(SessionEndReason::UserLogout);
                let _ = reply.send(());
            }
            MonitorRequest::CheckNow { reply } => {
                let _ = reply.send(self.run_check());
            }
            MonitorRequest::GetStatus { reply } => {
                let _ = reply.send(self.status());
            }
            // Handled by the run loop
            MonitorRequest::Restart { .. } | MonitorRequest::Shutdown { .. } => {}
        }
    }

    fn run_check(&mut self) -> Decision {
        self.checks += 1;
        let decision = self.watcher.check_expiration();
        debug!("Expiration check #{}: {}", self.checks, decision);

        match decision {
            Decision::NoToken | Decision::NotExpiring => {}
            Decision::Armed(seconds) => self.arm(seconds),
            Decision::ExpiredForceLogout => self.force_logout(SessionEndReason::AlreadyExpired),
        }
        decision
    }

    fn arm(&mut self, seconds: u64) {
        match &mut self.phase {
            Phase::LoggedOut(reason) => {
                debug!("Not arming warning, session already ended ({})", reason);
                return;
            }
            Phase::Armed(countdown) => countdown.resync(seconds),
            Phase::Unarmed => {
                info!("Session expires in {}s, showing warning", seconds);
                self.phase = Phase::Armed(Countdown::start(seconds, self.config.tick_interval()));
            }
        }
        self.seconds_left = seconds;
        self.publish();
    }

    fn on_tick(&mut self, tick: Tick) {
        match tick {
            Tick::Remaining(seconds) => {
                self.seconds_left = seconds;
                self.publish();
            }
            Tick::Elapsed => {
                self.seconds_left = 0;
                info!("Session warning elapsed without a response");
                self.force_logout(SessionEndReason::CountdownElapsed);
            }
        }
    }

    fn extend(&mut self, reply: oneshot::Sender<ExtendOutcome>) {
        if let Phase::LoggedOut(reason) = &self.phase {
            let _ = reply.send(ExtendOutcome::LoggedOut(reason.clone()));
            return;
        }

        if let Some(pending) = self.refresh.as_mut() {
            debug!("Refresh already in flight, joining it");
            pending.waiters.push(reply);
            return;
        }

        info!("Extending session");
        let session = self.session.clone();
        self.refresh = Some(PendingRefresh {
            call: Box::pin(async move { session.refresh_auth().await }),
            waiters: vec![reply],
        });
    }

    fn on_refresh_done(
        &mut self,
        result: Result<(), SessionError>,
        waiters: Vec<oneshot::Sender<ExtendOutcome>>,
    ) {
        let outcome = match result {
            Ok(()) => {
                info!("Session extended");
                self.phase = Phase::Unarmed;
                self.publish();
                ExtendOutcome::Extended
            }
            Err(e) => {
                warn!("Failed to refresh authentication: {}", e);
                let reason = SessionEndReason::RefreshFailed(e.to_string());
                self.force_logout(reason.clone());
                ExtendOutcome::LoggedOut(reason)
            }
        };

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    /// End the session instance. Only the first call per instance reaches
    /// the session object.
    fn force_logout(&mut self, reason: SessionEndReason) {
        if let Phase::LoggedOut(existing) = &self.phase {
            debug!("Session already ended ({}), ignoring {}", existing, reason);
            return;
        }

        info!("Ending session: {}", reason);
        self.phase = Phase::LoggedOut(reason.clone());
        self.poll = None;
        self.publish();

        if let Some(pending) = self.refresh.take() {
            debug!("Abandoning in-flight refresh");
            for waiter in pending.waiters {
                let _ = waiter.send(ExtendOutcome::LoggedOut(reason.clone()));
            }
        }

        self.logouts += 1;
        let session = self.session.clone();
        self.logouts_in_flight
            .push(Box::pin(async move { session.logout().await }));
    }

    fn restart(&mut self) {
        if let Phase::LoggedOut(reason) = &self.phase {
            info!("New session started after {}", reason);
            self.phase = Phase::Unarmed;
            self.seconds_left = 0;
            self.publish();
        }
        if self.poll.is_none() {
            self.start_polling();
            self.run_check();
        }
    }

    /// Schedule the expiration poll one interval from now. Callers run the
    /// immediate check themselves.
    fn start_polling(&mut self) {
        let period = self.config.poll_interval();
        let mut poll = interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.poll = Some(poll);
    }

    fn publish(&self) {
        let next = match &self.phase {
            Phase::Armed(_) => WarningState::open(self.seconds_left),
            Phase::Unarmed | Phase::LoggedOut(_) => WarningState::closed(self.seconds_left),
        };
        self.warning_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn status(&self) -> MonitorStatus {
        MonitorStatus {
            phase: self.phase.kind(),
            polling: self.poll.is_some(),
            refresh_in_flight: self.refresh.is_some(),
            checks: self.checks,
            logouts: self.logouts,
        }
    }

    async fn drain_logouts(&mut self) {
        if !self.logouts_in_flight.is_empty() {
            debug!("Waiting for {} logout(s) in flight", self.logouts_in_flight.len());
        }
        while let Some(result) = self.logouts_in_flight.next().await {
            if let Err(e) = result {
                warn!("Remote logout failed, local session already cleared: {}", e);
            }
        }
    }

    /// Tear down: timers and any pending refresh are dropped, remote logouts
    /// are allowed to complete.
    async fn finish(&mut self) {
        self.poll = None;
        self.refresh = None;
        if let Phase::Armed(_) = self.phase {
            self.phase = Phase::Unarmed;
            self.publish();
        }

        self.drain_logouts().await;
        info!(
            "Session monitor stopped after {} checks, {} logouts",
            self.checks, self.logouts
        );
    }
}

async fn next_poll(poll: &mut Option<Interval>) {
    match poll {
        Some(poll) => {
            poll.tick().await;
        }
        None => pending().await,
    }
}

async fn next_tick(phase: &mut Phase) -> Tick {
    match phase {
        Phase::Armed(countdown) => countdown.tick().await,
        Phase::Unarmed | Phase::LoggedOut(_) => pending().await,
    }
}

async fn refresh_done(
    slot: &mut Option<PendingRefresh>,
) -> (Result<(), SessionError>, Vec<oneshot::Sender<ExtendOutcome>>) {
    let Some(pending_refresh) = slot.as_mut() else {
        return pending().await;
    };
    let result = pending_refresh.call.as_mut().await;
    let waiters = slot.take().map(|r| r.waiters).unwrap_or_default();
    (result, waiters)
}
