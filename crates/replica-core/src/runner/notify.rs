//! Events a run reports to its caller, and the sinks that can receive them.

/// One event emitted by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Status-line text ("downloading 2/5: <url>", final summary).
    Progress(String),
    /// A line for the output console (tool stdout, banners, per-job result).
    OutputLine(String),
    /// Terminal event of a completed run.
    Finished { succeeded: u32, failed: u32 },
    /// Terminal event of a run aborted because the tool could not be launched.
    Error(String),
}

impl Notification {
    /// True for the events after which the run emits nothing more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Notification::Finished { .. } | Notification::Error(_))
    }
}

/// Receiver side of a run. Delivery is fire-and-forget: a receiver that went
/// away must not stop the downloads that are already queued.
pub trait NotificationSink: Send + 'static {
    fn notify(&self, notification: Notification);
}

impl NotificationSink for tokio::sync::mpsc::UnboundedSender<Notification> {
    fn notify(&self, notification: Notification) {
        if self.send(notification).is_err() {
            tracing::trace!("notification receiver closed");
        }
    }
}

impl NotificationSink for std::sync::mpsc::Sender<Notification> {
    fn notify(&self, notification: Notification) {
        if self.send(notification).is_err() {
            tracing::trace!("notification receiver closed");
        }
    }
}
