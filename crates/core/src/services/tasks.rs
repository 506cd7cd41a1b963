//! Local-first task mutations with best-effort forwarding to the remote service.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info};

use crate::board::Board;
use crate::database::Database;
use crate::drag::{DropApplied, DropEvent};
use crate::model::{Bucket, SortOption, Task, TaskPatch, User};
use crate::remote::RemoteTasks;
use crate::services::merge::MergeState;
use crate::sync::{DetachedSync, SyncDispatcher, SyncOp, SyncOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Authenticated(User),
}

impl Session {
    pub fn user(&self) -> Option<&User> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated(user) => Some(user),
        }
    }
}

/// Something the user should be told about, outside the normal flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Tasks created while signed out only live on this device.
    LocalOnlyWarning,
    /// The server rejected a create; the task is kept locally.
    RemoteCreateFailed { task_id: String },
}

/// Result of a local mutation plus whatever was sent to the server because of it.
///
/// Operations on a task whose create has not come back yet are held and sent once the
/// server has confirmed the task's id; they are still listed in `dispatched`.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<T> {
    pub value: T,
    pub dispatched: Vec<SyncOp>,
    pub notice: Option<Notice>,
}

pub struct TasksService {
    pub(crate) board: Board,
    pub(crate) store: Database,
    pub(crate) session: Session,
    pub(crate) merge: MergeState,
    pub(crate) remote: Option<Arc<dyn RemoteTasks>>,
    sync: Box<dyn SyncDispatcher>,
    /// Follow-up operations keyed by the local id of a create still in flight.
    awaiting_id: HashMap<String, Vec<SyncOp>>,
    warned_local_only: bool,
}

impl TasksService {
    /// An anonymous service working from the device cache.
    pub fn open(store: Database) -> Result<Self> {
        let mut board = Board::from_tasks(store.load_local_tasks()?);
        board.set_sort_options(store.load_sort_options()?);
        Ok(Self {
            board,
            store,
            session: Session::Anonymous,
            merge: MergeState::Anonymous,
            remote: None,
            sync: Box::new(DetachedSync),
            awaiting_id: HashMap::new(),
            warned_local_only: false,
        })
    }

    pub fn with_remote(
        mut self,
        remote: Arc<dyn RemoteTasks>,
        sync: Box<dyn SyncDispatcher>,
    ) -> Self {
        self.remote = Some(remote);
        self.sync = sync;
        self
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn merge_state(&self) -> MergeState {
        self.merge
    }

    /// True when mutations are forwarded to the server rather than cached on the device.
    pub fn is_synced(&self) -> bool {
        matches!(self.session, Session::Authenticated(_)) && self.merge == MergeState::Reconciled
    }

    pub fn create(&mut self, title: &str, patch: &TaskPatch) -> Result<Applied<Task>> {
        let mut task = self.board.insert_new(title, Utc::now());
        if !patch.is_empty() {
            if let Some(patched) = self.board.update(&task.id, patch) {
                task = patched;
            }
        }

        let notice = if !self.is_synced() && !self.warned_local_only {
            self.warned_local_only = true;
            Some(Notice::LocalOnlyWarning)
        } else {
            None
        };

        let dispatched = self.commit(vec![SyncOp::Create(task.clone())])?;
        Ok(Applied {
            value: task,
            dispatched,
            notice,
        })
    }

    /// Applies `patch` and forwards the complete resulting record.
    pub fn update(&mut self, id: &str, patch: &TaskPatch) -> Result<Option<Applied<Task>>> {
        let Some(task) = self.board.update(id, patch) else {
            return Ok(None);
        };
        let dispatched = self.commit(vec![SyncOp::Update(task.clone())])?;
        Ok(Some(Applied {
            value: task,
            dispatched,
            notice: None,
        }))
    }

    pub fn delete(&mut self, id: &str) -> Result<Option<Applied<Task>>> {
        let Some((removed, shifted)) = self.board.remove(id) else {
            return Ok(None);
        };
        let mut ops = vec![SyncOp::Delete(removed.id.clone())];
        ops.extend(shifted.into_iter().map(SyncOp::Update));
        let dispatched = self.commit(ops)?;
        Ok(Some(Applied {
            value: removed,
            dispatched,
            notice: None,
        }))
    }

    /// Handles a completed drag. `Ok(None)` when the drop changed nothing.
    pub fn move_task(&mut self, event: &DropEvent) -> Result<Option<Applied<DropApplied>>> {
        let Some(applied) = self.board.apply_drop(event)? else {
            return Ok(None);
        };
        self.store.save_sort_options(self.board.sort_options())?;
        let ops = applied.touched.iter().cloned().map(SyncOp::Update).collect();
        let dispatched = self.commit(ops)?;
        Ok(Some(Applied {
            value: applied,
            dispatched,
            notice: None,
        }))
    }

    /// Sorts a bucket and keeps the result as its manual order.
    pub fn sort(&mut self, bucket: Bucket, option: SortOption) -> Result<Applied<Vec<Task>>> {
        let changed = self.board.apply_sort(bucket, option);
        self.store.save_sort_options(self.board.sort_options())?;
        let ops = changed.iter().cloned().map(SyncOp::Update).collect();
        let dispatched = self.commit(ops)?;
        Ok(Applied {
            value: changed,
            dispatched,
            notice: None,
        })
    }

    /// Folds a finished remote call back into local state.
    pub fn apply_outcome(&mut self, outcome: SyncOutcome) -> Option<Notice> {
        match outcome {
            SyncOutcome::Created { local_id, task } => {
                if self.board.adopt_remote_id(&local_id, &task.id) {
                    debug!(
                        local_id = local_id.as_str(),
                        remote_id = task.id.as_str(),
                        "adopted server id"
                    );
                }
                for op in self.awaiting_id.remove(&local_id).unwrap_or_default() {
                    self.sync.dispatch(with_task_id(op, &task.id));
                }
                None
            }
            SyncOutcome::Updated(_) | SyncOutcome::Deleted(_) => None,
            SyncOutcome::Failed {
                op: SyncOp::Create(task),
                ..
            } => {
                if let Some(held) = self.awaiting_id.remove(&task.id) {
                    debug!(
                        task_id = task.id.as_str(),
                        count = held.len(),
                        "create failed; dropping held operations"
                    );
                }
                Some(Notice::RemoteCreateFailed { task_id: task.id })
            }
            SyncOutcome::Failed { .. } => None,
        }
    }

    /// Waits for every in-flight remote call and folds the results in.
    pub async fn settle(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Some(outcome) = self.sync.next_outcome().await {
            if let Some(notice) = self.apply_outcome(outcome) {
                notices.push(notice);
            }
        }
        notices
    }

    // Local state is already updated; either forward or cache.
    fn commit(&mut self, ops: Vec<SyncOp>) -> Result<Vec<SyncOp>> {
        if ops.is_empty() {
            return Ok(ops);
        }
        if self.is_synced() {
            for op in &ops {
                match op {
                    SyncOp::Create(task) => {
                        self.awaiting_id.insert(task.id.clone(), Vec::new());
                    }
                    _ => {
                        if let Some(held) = self.awaiting_id.get_mut(op.task_id()) {
                            held.push(op.clone());
                            continue;
                        }
                    }
                }
                self.sync.dispatch(op.clone());
            }
            return Ok(ops);
        }
        self.store.save_local_tasks(self.board.tasks())?;
        info!(count = self.board.len(), "saved tasks to device cache");
        Ok(Vec::new())
    }
}

fn with_task_id(op: SyncOp, id: &str) -> SyncOp {
    match op {
        SyncOp::Create(mut task) => {
            task.id = id.to_string();
            SyncOp::Create(task)
        }
        SyncOp::Update(mut task) => {
            task.id = id.to_string();
            SyncOp::Update(task)
        }
        SyncOp::Delete(_) => SyncOp::Delete(id.to_string()),
    }
}
