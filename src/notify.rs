use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// outbound messaging collaborator, fire-and-forget text delivery
pub trait Notifier: Send + Sync {
    fn send(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

/// send without surfacing delivery failures; they are logged and dropped
pub fn best_effort(notifier: &dyn Notifier, to: &str, body: &str) {
    if let Err(e) = notifier.send(to, body) {
        tracing::warn!(to, error = %e, "dropping failed notification");
    }
}

/// discards every message
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, _to: &str, _body: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// records messages for assertions in tests
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn sent_to(&self, to: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(dest, _)| dest == to)
            .map(|(_, body)| body)
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|e| NotifyError(e.to_string()))?;
        sent.push((to.to_string(), body.to_string()));
        Ok(())
    }
}
