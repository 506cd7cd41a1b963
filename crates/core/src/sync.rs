//! Best-effort forwarding of local mutations to the remote service.
//!
//! Operations are one-shot and fire-and-forget: nothing is queued, retried, ordered or
//! cancelled. Completed calls come back as [`SyncOutcome`] values that the owner of the
//! board folds back in, the same way view loads come back as messages in an update loop.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::model::Task;
use crate::remote::{RemoteError, RemoteTasks};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOp {
    Create(Task),
    Update(Task),
    Delete(String),
}

impl SyncOp {
    pub fn task_id(&self) -> &str {
        match self {
            SyncOp::Create(task) | SyncOp::Update(task) => task.id.as_str(),
            SyncOp::Delete(id) => id.as_str(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SyncOp::Create(_) => "create",
            SyncOp::Update(_) => "update",
            SyncOp::Delete(_) => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Created { local_id: String, task: Task },
    Updated(String),
    Deleted(String),
    Failed { op: SyncOp, error: RemoteError },
}

/// The seam between the CRUD layer and whatever carries operations to the server.
#[async_trait]
pub trait SyncDispatcher: Send {
    /// Starts `op` without waiting for it.
    fn dispatch(&mut self, op: SyncOp);

    /// Waits for the next completed operation. `None` once nothing is in flight.
    async fn next_outcome(&mut self) -> Option<SyncOutcome>;
}

/// Performs a single operation. Failures are logged and reported, never raised.
pub async fn perform(remote: &dyn RemoteTasks, op: SyncOp) -> SyncOutcome {
    let result = match &op {
        SyncOp::Create(task) => remote
            .create_task(task)
            .await
            .map(|created| SyncOutcome::Created {
                local_id: task.id.clone(),
                task: created,
            }),
        SyncOp::Update(task) => remote
            .update_task(task)
            .await
            .map(|_| SyncOutcome::Updated(task.id.clone())),
        SyncOp::Delete(id) => remote
            .delete_task(id)
            .await
            .map(|_| SyncOutcome::Deleted(id.clone())),
    };
    match result {
        Ok(outcome) => {
            debug!(op = op.label(), task_id = op.task_id(), "remote sync applied");
            outcome
        }
        Err(error) => {
            warn!(
                op = op.label(),
                task_id = op.task_id(),
                error = %error,
                "remote sync failed; keeping local state"
            );
            SyncOutcome::Failed { op, error }
        }
    }
}

/// Spawns each operation on the tokio runtime and collects the outcomes.
pub struct BestEffortSync {
    remote: Arc<dyn RemoteTasks>,
    runtime: Handle,
    sender: mpsc::UnboundedSender<SyncOutcome>,
    receiver: mpsc::UnboundedReceiver<SyncOutcome>,
    in_flight: usize,
}

impl BestEffortSync {
    pub fn new(remote: Arc<dyn RemoteTasks>, runtime: Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            remote,
            runtime,
            sender,
            receiver,
            in_flight: 0,
        }
    }
}

#[async_trait]
impl SyncDispatcher for BestEffortSync {
    fn dispatch(&mut self, op: SyncOp) {
        let remote = self.remote.clone();
        let sender = self.sender.clone();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let mut report = Report {
                sender,
                pending: Some(op.clone()),
            };
            let outcome = perform(remote.as_ref(), op).await;
            report.pending = None;
            let _ = report.sender.send(outcome);
        });
    }

    async fn next_outcome(&mut self) -> Option<SyncOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.receiver.recv().await;
        self.in_flight -= 1;
        outcome
    }
}

/// Sends a failure for the operation if its task ends without producing an outcome, so
/// `in_flight` always drains back to zero.
struct Report {
    sender: mpsc::UnboundedSender<SyncOutcome>,
    pending: Option<SyncOp>,
}

impl Drop for Report {
    fn drop(&mut self) {
        if let Some(op) = self.pending.take() {
            warn!(op = op.label(), task_id = op.task_id(), "remote sync task ended early");
            let _ = self.sender.send(SyncOutcome::Failed {
                op,
                error: RemoteError::Transport("sync task ended without a result".into()),
            });
        }
    }
}

/// Dispatcher for a service with no remote configured. Nothing is ever dispatched to it
/// while the session is anonymous; anything that does arrive is dropped.
#[derive(Debug, Default)]
pub struct DetachedSync;

#[async_trait]
impl SyncDispatcher for DetachedSync {
    fn dispatch(&mut self, op: SyncOp) {
        debug!(op = op.label(), task_id = op.task_id(), "no remote configured; dropping");
    }

    async fn next_outcome(&mut self) -> Option<SyncOutcome> {
        None
    }
}
