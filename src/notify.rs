//! Outbound mail seam. Delivery is fire-and-forget: the service commits
//! state first and logs, never propagates, a failed send.

use std::sync::Mutex;

use log::info;

/// Mail delivery collaborator injected into the service.
pub trait Notifier: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Writes deliveries to the log instead of a mailbox. The default choice
/// for demos and local runs.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!("mail to {to}: {subject} ({body})");
        Ok(())
    }
}

/// A delivery captured by [`MemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Collects deliveries in memory so tests can assert on them.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Delivery>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        self.sent.lock().expect("notifier mutex poisoned").push(Delivery {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
