use huddle_client::CallEvent;
use std::time::Duration;
use tokio::sync::mpsc;

/// Collects [`CallEvent`]s from a subscription.
pub struct EventLog {
    rx: mpsc::UnboundedReceiver<CallEvent>,
    seen: Vec<CallEvent>,
}

impl EventLog {
    pub fn new(rx: mpsc::UnboundedReceiver<CallEvent>) -> Self {
        Self {
            rx,
            seen: Vec::new(),
        }
    }

    /// Events that are already queued, without waiting.
    pub fn drain(&mut self) -> Vec<CallEvent> {
        let mut fresh = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            fresh.push(event);
        }
        self.seen.extend(fresh.iter().cloned());
        fresh
    }

    /// Receive until an event matches `pred`. Uses tokio time, so it also
    /// works with a paused clock.
    pub async fn wait_for<F>(&mut self, timeout_ms: u64, pred: F) -> Option<CallEvent>
    where
        F: Fn(&CallEvent) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let event = tokio::time::timeout_at(deadline, self.rx.recv())
                .await
                .ok()??;
            self.seen.push(event.clone());
            if pred(&event) {
                return Some(event);
            }
        }
    }

    /// Everything received so far.
    pub fn seen(&self) -> &[CallEvent] {
        &self.seen
    }

    pub fn count<F>(&self, pred: F) -> usize
    where
        F: Fn(&CallEvent) -> bool,
    {
        self.seen.iter().filter(|e| pred(e)).count()
    }
}
