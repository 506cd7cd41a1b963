//! Session transitions: loading the remote board on sign-in, and the one-time negotiation
//! over tasks that were created on this device before signing in.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::tasks::{Session, TasksService};
use crate::model::{Bucket, Task, User};
use crate::ordering::{bucket_members, max_index};
use crate::remote::{RemoteError, RemoteTasks};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    Anonymous,
    SessionAcquired,
    DirectLoad,
    /// Device-only tasks are waiting for the user to merge or discard them.
    MergePrompt,
    Reconciled,
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no remote service is configured")]
    Offline,
    #[error("no merge is pending")]
    NotPending,
    #[error("the remote board is not loaded for this session")]
    NotReconciled,
    #[error("could not fetch remote tasks: {0}")]
    Fetch(RemoteError),
    #[error("could not upload local task '{task_id}': {error}")]
    Upload { task_id: String, error: RemoteError },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Appends device tasks after the remote ones, bucket by bucket, keeping their relative order.
pub fn plan_merge(remote: &[Task], local: &[Task]) -> Vec<Task> {
    let mut next: BTreeMap<Bucket, u32> = Bucket::ALL
        .iter()
        .map(|bucket| {
            let start = max_index(remote, *bucket).map(|max| max + 1).unwrap_or(0);
            (*bucket, start)
        })
        .collect();

    let mut planned = Vec::new();
    for bucket in Bucket::ALL {
        for mut task in bucket_members(local, bucket) {
            let slot = next.entry(bucket).or_insert(0);
            task.order_index = *slot;
            *slot += 1;
            planned.push(task);
        }
    }
    planned
}

impl TasksService {
    /// Asks the server who is signed in and enters the session if someone is.
    pub async fn detect_session(&mut self) -> Result<MergeState, MergeError> {
        let remote = self.remote_client()?;
        let user = remote.current_user().await.map_err(MergeError::Fetch)?;
        match user {
            Some(user) => self.on_session(user).await,
            None => Ok(self.merge),
        }
    }

    /// Entry point for a fresh session. Never merges on its own.
    pub async fn on_session(&mut self, user: User) -> Result<MergeState, MergeError> {
        let remote = self.remote_client()?;
        let prior = (self.session.clone(), self.merge);
        info!(user = user.display_name(), "session acquired");
        self.session = Session::Authenticated(user);
        self.merge = MergeState::SessionAcquired;

        let pending = match self.store.load_local_tasks() {
            Ok(pending) => pending,
            Err(err) => {
                (self.session, self.merge) = prior;
                return Err(MergeError::Store(err));
            }
        };
        if !pending.is_empty() {
            info!(count = pending.len(), "device tasks waiting for merge decision");
            self.board.replace(pending);
            self.merge = MergeState::MergePrompt;
            return Ok(self.merge);
        }

        self.merge = MergeState::DirectLoad;
        match remote.list_tasks().await {
            Ok(tasks) => {
                self.board.replace(tasks);
                self.merge = MergeState::Reconciled;
                Ok(self.merge)
            }
            Err(error) => {
                warn!(error = %error, "loading remote tasks failed");
                (self.session, self.merge) = prior;
                Err(MergeError::Fetch(error))
            }
        }
    }

    /// Uploads the device tasks after the remote ones and switches to the remote board.
    /// Returns the uploaded records.
    pub async fn confirm_merge(&mut self) -> Result<Vec<Task>, MergeError> {
        if self.merge != MergeState::MergePrompt {
            return Err(MergeError::NotPending);
        }
        let remote = self.remote_client()?;
        let local = self.store.load_local_tasks()?;
        let existing = remote.list_tasks().await.map_err(MergeError::Fetch)?;
        let planned = plan_merge(&existing, &local);

        for (uploaded, task) in planned.iter().enumerate() {
            if let Err(error) = remote.create_task(task).await {
                // Keep only what has not reached the server, so a retry does not duplicate.
                let remaining: Vec<Task> = local
                    .iter()
                    .filter(|candidate| {
                        !planned[..uploaded]
                            .iter()
                            .any(|done| done.id == candidate.id)
                    })
                    .cloned()
                    .collect();
                self.store.save_local_tasks(&remaining)?;
                self.board.replace(remaining);
                warn!(task_id = task.id.as_str(), error = %error, "merge upload failed");
                return Err(MergeError::Upload {
                    task_id: task.id.clone(),
                    error,
                });
            }
        }

        self.store.clear_local_tasks()?;
        self.merge = MergeState::Reconciled;
        info!(count = planned.len(), "merged device tasks into remote board");

        match remote.list_tasks().await {
            Ok(tasks) => self.board.replace(tasks),
            Err(error) => {
                warn!(error = %error, "reload after merge failed; showing merged view");
                let mut merged = existing;
                merged.extend(planned.iter().cloned());
                self.board.replace(merged);
            }
        }
        Ok(planned)
    }

    /// Discards the device tasks for good and switches to the remote board.
    pub async fn skip_merge(&mut self) -> Result<usize, MergeError> {
        if self.merge != MergeState::MergePrompt {
            return Err(MergeError::NotPending);
        }
        let remote = self.remote_client()?;
        let tasks = remote.list_tasks().await.map_err(MergeError::Fetch)?;
        let discarded = self.store.load_local_tasks()?.len();
        self.store.clear_local_tasks()?;
        self.board.replace(tasks);
        self.merge = MergeState::Reconciled;
        info!(count = discarded, "discarded device tasks");
        Ok(discarded)
    }

    /// Replaces the board with the canonical remote list.
    pub async fn reload(&mut self) -> Result<usize, MergeError> {
        if self.merge != MergeState::Reconciled {
            return Err(MergeError::NotReconciled);
        }
        let remote = self.remote_client()?;
        let tasks = remote.list_tasks().await.map_err(MergeError::Fetch)?;
        self.board.replace(tasks);
        Ok(self.board.len())
    }

    /// Ends the session locally even if the server call fails.
    pub async fn logout(&mut self) -> Result<(), MergeError> {
        let remote = self.remote_client()?;
        if let Err(error) = remote.logout().await {
            warn!(error = %error, "remote logout failed");
        }
        self.session = Session::Anonymous;
        self.merge = MergeState::Anonymous;
        self.board.replace(self.store.load_local_tasks()?);
        Ok(())
    }

    fn remote_client(&self) -> Result<Arc<dyn RemoteTasks>, MergeError> {
        self.remote.clone().ok_or(MergeError::Offline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn task(id: &str, bucket: Bucket, order_index: u32) -> Task {
        let mut task = Task::new(id, order_index, Utc::now());
        task.id = id.to_string();
        task.set_bucket(bucket);
        task
    }

    fn placed(tasks: &[Task]) -> Vec<(String, Bucket, u32)> {
        tasks
            .iter()
            .map(|task| (task.id.clone(), task.bucket(), task.order_index))
            .collect()
    }

    #[test]
    fn plan_continues_after_remote_maximum() {
        let remote = vec![
            task("r0", Bucket::ImportantUrgent, 0),
            task("r2", Bucket::ImportantUrgent, 2),
        ];
        let local = vec![task("l0", Bucket::ImportantUrgent, 0)];
        assert_eq!(
            placed(&plan_merge(&remote, &local)),
            vec![("l0".to_string(), Bucket::ImportantUrgent, 3)]
        );
    }

    #[test]
    fn plan_keeps_relative_order_per_bucket() {
        let remote = vec![task("r", Bucket::Inbox, 0)];
        let local = vec![
            task("second", Bucket::Inbox, 1),
            task("nn", Bucket::NotImportantNotUrgent, 0),
            task("first", Bucket::Inbox, 0),
        ];
        assert_eq!(
            placed(&plan_merge(&remote, &local)),
            vec![
                ("first".to_string(), Bucket::Inbox, 1),
                ("second".to_string(), Bucket::Inbox, 2),
                ("nn".to_string(), Bucket::NotImportantNotUrgent, 0),
            ]
        );
    }

    #[test]
    fn empty_local_plan_is_empty() {
        assert!(plan_merge(&[task("r", Bucket::Inbox, 0)], &[]).is_empty());
    }
}
