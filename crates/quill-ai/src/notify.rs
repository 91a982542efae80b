//! User-visible transient notifications
//!
//! Fire-and-forget surface supplied by the host application. The broker
//! emits exactly one notification per failed invocation so a non-awaiting
//! caller still gets feedback.

/// Transient notification primitive
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Default notifier that routes messages to the log
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::warn!(target: "quill_ai::notice", "{message}");
    }
}
