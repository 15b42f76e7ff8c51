use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use drawbridge_common::{BridgeError, Result};
use drawbridge_protocol::ResponseFrame;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;

#[cfg(feature = "metrics")]
use drawbridge_observability::CommandOutcome;

/// Receives the outcome of one pending request
pub type Completion = oneshot::Receiver<Result<Value>>;

/// One outstanding command
#[derive(Debug)]
pub struct PendingRequest {
    pub command: String,
    /// Generation of the connection the command was sent on
    pub generation: u64,
    pub sent_at: Instant,
    completion: oneshot::Sender<Result<Value>>,
    /// Counted in the pending gauge when registered
    #[cfg(feature = "metrics")]
    metered: bool,
}

impl PendingRequest {
    #[cfg(feature = "metrics")]
    fn record_completed(&self, outcome: CommandOutcome) {
        // Requests registered before metrics were enabled never touched the gauge
        if !self.metered {
            return;
        }
        if let Some(m) = drawbridge_observability::bridge_metrics() {
            m.record_completed(outcome, self.sent_at.elapsed());
        }
    }
}

/// Outstanding commands keyed by request id
///
/// Every entry leaves the table exactly once: through [`resolve`](Self::resolve),
/// [`expire`](Self::expire), [`cancel`](Self::cancel) or one of the bulk
/// rejections.
#[derive(Debug, Clone, Default)]
pub struct PendingTable {
    entries: Arc<DashMap<String, PendingRequest>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request; fails if the id is already pending.
    pub fn register(
        &self,
        id: &str,
        command: impl Into<String>,
        generation: u64,
    ) -> Result<Completion> {
        let (tx, rx) = oneshot::channel();
        match self.entries.entry(id.to_string()) {
            Entry::Occupied(_) => Err(BridgeError::InvalidState(format!(
                "request id {id} is already pending"
            ))),
            Entry::Vacant(slot) => {
                #[cfg(feature = "metrics")]
                let metered = match drawbridge_observability::bridge_metrics() {
                    Some(m) => {
                        m.record_sent();
                        true
                    }
                    None => false,
                };
                slot.insert(PendingRequest {
                    command: command.into(),
                    generation,
                    sent_at: Instant::now(),
                    completion: tx,
                    #[cfg(feature = "metrics")]
                    metered,
                });
                Ok(rx)
            }
        }
    }

    /// Complete the request matching `response.id`.
    ///
    /// Returns `false` when no request is pending under that id.
    pub fn resolve(&self, response: ResponseFrame) -> bool {
        let Some((_, request)) = self.entries.remove(&response.id) else {
            return false;
        };
        #[cfg(feature = "metrics")]
        request.record_completed(if response.success {
            CommandOutcome::Success
        } else {
            CommandOutcome::Failure
        });
        // Receiver gone means the caller stopped waiting; nothing to notify
        let _ = request.completion.send(response.into_result());
        true
    }

    /// Remove a request whose deadline elapsed. The caller reports the timeout.
    pub fn expire(&self, id: &str) -> Option<PendingRequest> {
        let (_, request) = self.entries.remove(id)?;
        #[cfg(feature = "metrics")]
        request.record_completed(CommandOutcome::Timeout);
        Some(request)
    }

    /// Drop a request without completing it (send failure, abandoned caller).
    pub fn cancel(&self, id: &str) -> bool {
        #[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
        let Some((_, request)) = self.entries.remove(id) else {
            return false;
        };
        #[cfg(feature = "metrics")]
        request.record_completed(CommandOutcome::Disconnected);
        true
    }

    /// Fail every request sent on `generation` with `ClientDisconnected`.
    pub fn reject_generation(&self, generation: u64) -> usize {
        let ids: Vec<String> = self
            .entries
            .iter()
            .filter(|r| r.generation == generation)
            .map(|r| r.key().clone())
            .collect();
        self.reject(ids)
    }

    /// Fail every pending request with `ClientDisconnected`.
    pub fn reject_all(&self) -> usize {
        let ids: Vec<String> = self.entries.iter().map(|r| r.key().clone()).collect();
        self.reject(ids)
    }

    fn reject(&self, ids: Vec<String>) -> usize {
        let mut count = 0;
        for id in ids {
            if let Some((_, request)) = self.entries.remove(&id) {
                #[cfg(feature = "metrics")]
                request.record_completed(CommandOutcome::Disconnected);
                let _ = request
                    .completion
                    .send(Err(BridgeError::ClientDisconnected));
                count += 1;
            }
        }
        count
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_completes_once() {
        let table = PendingTable::new();
        let rx = table.register("cmd_1", "getDiagram", 1).unwrap();
        assert_eq!(table.len(), 1);

        let response = ResponseFrame::ok("cmd_1", Some(json!({"tables": []})), None);
        assert!(table.resolve(response.clone()));
        assert!(!table.resolve(response));
        assert!(table.is_empty());

        assert_eq!(rx.await.unwrap().unwrap(), json!({"tables": []}));
    }

    #[tokio::test]
    async fn test_failed_response_rejects() {
        let table = PendingTable::new();
        let rx = table.register("cmd_1", "deleteField", 1).unwrap();
        table.resolve(ResponseFrame::failure("cmd_1", "Field f1 not found"));

        let err = rx.await.unwrap().unwrap_err();
        assert!(matches!(err, BridgeError::CommandFailed(ref m) if m == "Field f1 not found"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let table = PendingTable::new();
        let _rx = table.register("cmd_1", "getTables", 1).unwrap();
        assert!(table.register("cmd_1", "getTables", 1).is_err());
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_reject_generation_leaves_others() {
        let table = PendingTable::new();
        let old = table.register("a", "getTables", 1).unwrap();
        let new = table.register("b", "getTables", 2).unwrap();

        assert_eq!(table.reject_generation(1), 1);
        assert!(matches!(
            old.await.unwrap(),
            Err(BridgeError::ClientDisconnected)
        ));
        assert!(table.contains("b"));

        assert_eq!(table.reject_all(), 1);
        assert!(matches!(
            new.await.unwrap(),
            Err(BridgeError::ClientDisconnected)
        ));
    }

    #[test]
    fn test_expire_then_late_response_is_unmatched() {
        let table = PendingTable::new();
        let _rx = table.register("cmd_9", "getNotes", 1).unwrap();

        let expired = table.expire("cmd_9").unwrap();
        assert_eq!(expired.command, "getNotes");
        assert!(!table.resolve(ResponseFrame::ok("cmd_9", None, None)));
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_only_metered_requests_leave_the_gauge() {
        let table = PendingTable::new();
        let enabled_before = drawbridge_observability::metrics_enabled();
        let _early = table.register("early", "getTables", 1).unwrap();
        drawbridge_observability::init_metrics();
        let _late = table.register("late", "getTables", 1).unwrap();

        assert_eq!(table.entries.get("early").unwrap().metered, enabled_before);
        assert!(table.entries.get("late").unwrap().metered);

        let early = table.expire("early").unwrap();
        assert_eq!(early.metered, enabled_before);
        assert_eq!(table.reject_all(), 1);
        assert!(table.is_empty());
    }
}
