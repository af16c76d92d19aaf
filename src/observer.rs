// ABOUTME: Per-request progress sink: a correlation id plus an append-only list of lines.
// ABOUTME: DeploymentLog stores every line and streams it to subscribers in write order.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::RequestId;

/// Errors from binding or writing to an observer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ObserverError {
    #[error("observer already bound to request {current}, cannot rebind to {requested}")]
    AlreadyBound { current: String, requested: String },

    #[error("observer has no request id bound yet")]
    Unbound,

    #[error("observer is closed")]
    Closed,
}

/// Sink the pipeline reports progress to.
///
/// Shared by reference between the orchestrator, the facade and any backend
/// callback, so every method takes `&self`. Implementations must keep lines in
/// the order the calls arrive in.
pub trait DeploymentObserver: Send + Sync {
    /// Bind the correlation id. Binding the same id twice is a no-op.
    fn set_request_id(&self, id: &RequestId) -> Result<(), ObserverError>;

    /// Append lines in order. Fails if no request id is bound yet.
    fn write(&self, lines: Vec<String>) -> Result<(), ObserverError>;

    fn request_id(&self) -> Option<RequestId>;

    /// Whether the observer still accepts writes.
    fn is_usable(&self) -> bool {
        true
    }

    fn write_line(&self, line: &str) -> Result<(), ObserverError> {
        self.write(vec![line.to_string()])
    }
}

/// One stored line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// Position in the log, starting at zero with no gaps.
    pub seq: usize,
    pub at: DateTime<Utc>,
    pub text: String,
}

/// What subscribers receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    Bound { request_id: RequestId },
    Line(LogLine),
}

#[derive(Default)]
struct LogState {
    request_id: Option<RequestId>,
    lines: Vec<LogLine>,
    subscribers: Vec<mpsc::UnboundedSender<ObserverEvent>>,
    closed: bool,
}

impl LogState {
    fn publish(&mut self, event: &ObserverEvent) {
        // Dropped receivers are pruned; everyone else sees events in lock order.
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// In-memory observer used by the agent for one deployment request.
#[derive(Default)]
pub struct DeploymentLog {
    state: Mutex<LogState>,
}

impl DeploymentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream events from now on, after replaying what was already recorded.
    ///
    /// The replay and the registration happen under one lock, so a subscriber
    /// never misses or duplicates a line.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ObserverEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();

        if let Some(ref id) = state.request_id {
            let _ = tx.send(ObserverEvent::Bound {
                request_id: id.clone(),
            });
        }
        for line in &state.lines {
            let _ = tx.send(ObserverEvent::Line(line.clone()));
        }

        if !state.closed {
            state.subscribers.push(tx);
        }
        rx
    }

    /// Stop accepting writes and end every subscription.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.subscribers.clear();
    }

    /// Text of every line so far.
    pub fn lines(&self) -> Vec<String> {
        self.state
            .lock()
            .lines
            .iter()
            .map(|l| l.text.clone())
            .collect()
    }

    pub fn entries(&self) -> Vec<LogLine> {
        self.state.lock().lines.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DeploymentObserver for DeploymentLog {
    fn set_request_id(&self, id: &RequestId) -> Result<(), ObserverError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ObserverError::Closed);
        }

        if let Some(ref current) = state.request_id {
            if current == id {
                return Ok(());
            }
            return Err(ObserverError::AlreadyBound {
                current: current.to_string(),
                requested: id.to_string(),
            });
        }

        state.request_id = Some(id.clone());
        tracing::debug!(request_id = %id, "observer bound");
        state.publish(&ObserverEvent::Bound {
            request_id: id.clone(),
        });
        Ok(())
    }

    fn write(&self, lines: Vec<String>) -> Result<(), ObserverError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ObserverError::Closed);
        }
        let request_id = state.request_id.clone().ok_or(ObserverError::Unbound)?;

        for text in lines {
            tracing::info!(request_id = %request_id, "{}", text);
            let line = LogLine {
                seq: state.lines.len(),
                at: Utc::now(),
                text,
            };
            state.lines.push(line.clone());
            state.publish(&ObserverEvent::Line(line));
        }
        Ok(())
    }

    fn request_id(&self) -> Option<RequestId> {
        self.state.lock().request_id.clone()
    }

    fn is_usable(&self) -> bool {
        !self.state.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> RequestId {
        RequestId::new(value).unwrap()
    }

    #[test]
    fn write_before_bind_is_rejected() {
        let log = DeploymentLog::new();
        assert_eq!(
            log.write(vec!["early".to_string()]),
            Err(ObserverError::Unbound)
        );
        assert!(log.is_empty());
    }

    #[test]
    fn rebinding_same_id_is_allowed() {
        let log = DeploymentLog::new();
        log.set_request_id(&id("a")).unwrap();
        log.set_request_id(&id("a")).unwrap();
        assert_eq!(log.request_id(), Some(id("a")));
    }

    #[test]
    fn rebinding_other_id_is_rejected() {
        let log = DeploymentLog::new();
        log.set_request_id(&id("a")).unwrap();
        let err = log.set_request_id(&id("b")).unwrap_err();
        assert!(matches!(err, ObserverError::AlreadyBound { .. }));
        assert_eq!(log.request_id(), Some(id("a")));
    }

    #[test]
    fn lines_keep_write_order_and_sequence() {
        let log = DeploymentLog::new();
        log.set_request_id(&id("a")).unwrap();
        log.write(vec!["one".to_string(), "two".to_string()]).unwrap();
        log.write_line("three").unwrap();

        assert_eq!(log.lines(), vec!["one", "two", "three"]);
        let seqs: Vec<_> = log.entries().iter().map(|l| l.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn closed_log_rejects_writes() {
        let log = DeploymentLog::new();
        log.set_request_id(&id("a")).unwrap();
        log.close();
        assert!(!log.is_usable());
        assert_eq!(log.write_line("late"), Err(ObserverError::Closed));
    }

    #[tokio::test]
    async fn late_subscriber_gets_replay_then_live_lines() {
        let log = DeploymentLog::new();
        log.set_request_id(&id("a")).unwrap();
        log.write_line("before").unwrap();

        let mut rx = log.subscribe();
        log.write_line("after").unwrap();
        log.close();

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(event);
        }

        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0], ObserverEvent::Bound { .. }));
        assert!(matches!(&seen[1], ObserverEvent::Line(l) if l.text == "before"));
        assert!(matches!(&seen[2], ObserverEvent::Line(l) if l.text == "after" && l.seq == 1));
    }
}
