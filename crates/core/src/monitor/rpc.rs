use crate::types::{ExtendOutcome, MonitorStatus};
use crate::watcher::Decision;
use tokio::sync::oneshot;

pub enum MonitorRequest {
    Extend {
        reply: oneshot::Sender<ExtendOutcome>,
    },
    LogoutNow {
        reply: oneshot::Sender<()>,
    },
    CheckNow {
        reply: oneshot::Sender<Decision>,
    },
    Restart {
        reply: oneshot::Sender<()>,
    },
    GetStatus {
        reply: oneshot::Sender<MonitorStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
