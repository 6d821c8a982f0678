use crate::model::{Alert, EscalationAction};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use tokio::task::JoinHandle;

/// Sink for escalation actions.
///
/// Each action of a step runs as its own task. An error or panic is
/// contained to that action, so handlers must not rely on running in order.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, action: EscalationAction, alert: &Alert, step: usize)
        -> anyhow::Result<()>;
}

/// Default handler: writes every action to the log.
pub struct LoggingActionHandler;

#[async_trait]
impl ActionHandler for LoggingActionHandler {
    async fn handle(
        &self,
        action: EscalationAction,
        alert: &Alert,
        step: usize,
    ) -> anyhow::Result<()> {
        match action {
            EscalationAction::EscalateToAdmin => tracing::error!(
                alert_id = %alert.id,
                rule_id = %alert.rule_id,
                severity = %alert.severity,
                step,
                "Alert escalated to administrator: {}",
                alert.message
            ),
            _ => tracing::warn!(
                alert_id = %alert.id,
                rule_id = %alert.rule_id,
                severity = %alert.severity,
                step,
                %action,
                "{}",
                alert.message
            ),
        }
        Ok(())
    }
}

/// Running escalation tasks, one per alert, and the steps still pending.
#[derive(Default)]
pub struct EscalationTasks {
    handles: Mutex<HashMap<String, JoinHandle<()>>>,
    pending: Mutex<BTreeSet<(String, usize)>>,
}

impl EscalationTasks {
    /// Spawn the escalation task of `alert_id` with `steps` pending steps.
    ///
    /// Without a tokio runtime nothing is scheduled and `false` is returned.
    pub fn spawn<F>(&self, alert_id: &str, steps: usize, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(alert_id, "No runtime available, escalation not scheduled");
            return false;
        };
        {
            let mut pending = self.pending.lock();
            for step in 0..steps {
                pending.insert((alert_id.to_string(), step));
            }
        }
        // Held across the spawn so the task cannot finish before its
        // handle is registered.
        let mut handles = self.handles.lock();
        let handle = runtime.spawn(task);
        if let Some(previous) = handles.insert(alert_id.to_string(), handle) {
            previous.abort();
        }
        true
    }

    pub fn step_done(&self, alert_id: &str, step: usize) {
        self.pending.lock().remove(&(alert_id.to_string(), step));
    }

    /// Called by the task itself once its last step has run.
    pub fn finished(&self, alert_id: &str) {
        self.handles.lock().remove(alert_id);
        self.clear_pending(alert_id);
    }

    /// Abort the alert's task and forget its pending steps. Returns how many
    /// steps were cancelled.
    pub fn cancel(&self, alert_id: &str) -> usize {
        if let Some(handle) = self.handles.lock().remove(alert_id) {
            handle.abort();
        }
        self.clear_pending(alert_id)
    }

    fn clear_pending(&self, alert_id: &str) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|(id, _)| id != alert_id);
        before - pending.len()
    }

    /// `(alert_id, step_index)` pairs not yet fired.
    pub fn pending(&self) -> Vec<(String, usize)> {
        self.pending.lock().iter().cloned().collect()
    }

    pub fn abort_all(&self) {
        for (_, handle) in self.handles.lock().drain() {
            handle.abort();
        }
        self.pending.lock().clear();
    }
}
