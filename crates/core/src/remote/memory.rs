use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{RemoteCall, RemoteError, RemoteTasks};
use crate::model::{Task, User};

/// In-process task service. Backs tests and lets the engine run without a server.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    user: Option<User>,
    tasks: Vec<Task>,
    failing: HashSet<RemoteCall>,
    allowances: HashMap<RemoteCall, usize>,
    calls: Vec<RemoteCall>,
    server_ids: bool,
    next_id: u64,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: User) -> Self {
        let remote = Self::default();
        remote.state.lock().user = Some(user);
        remote
    }

    /// Makes `create_task` assign its own ids instead of keeping the client's.
    pub fn with_server_ids(self) -> Self {
        self.state.lock().server_ids = true;
        self
    }

    pub fn seed(&self, tasks: Vec<Task>) {
        self.state.lock().tasks = tasks;
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().tasks.clone()
    }

    pub fn set_user(&self, user: Option<User>) {
        self.state.lock().user = user;
    }

    pub fn fail(&self, call: RemoteCall) {
        self.state.lock().failing.insert(call);
    }

    /// Lets `allowed` more calls of this kind succeed, then fails the rest.
    pub fn fail_after(&self, call: RemoteCall, allowed: usize) {
        self.state.lock().allowances.insert(call, allowed);
    }

    pub fn recover(&self, call: RemoteCall) {
        let mut state = self.state.lock();
        state.failing.remove(&call);
        state.allowances.remove(&call);
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().calls.clone()
    }

    fn enter(&self, call: RemoteCall) -> Result<parking_lot::MutexGuard<'_, MemoryState>, RemoteError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        let exhausted = match state.allowances.get_mut(&call) {
            Some(0) => true,
            Some(left) => {
                *left -= 1;
                false
            }
            None => false,
        };
        if exhausted || state.failing.contains(&call) {
            return Err(RemoteError::Transport(format!("{call:?} unavailable")));
        }
        Ok(state)
    }

    fn require_user(state: &MemoryState) -> Result<(), RemoteError> {
        if state.user.is_none() {
            return Err(RemoteError::Unauthenticated);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTasks for MemoryRemote {
    async fn current_user(&self) -> Result<Option<User>, RemoteError> {
        let state = self.enter(RemoteCall::CurrentUser)?;
        Ok(state.user.clone())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        let state = self.enter(RemoteCall::ListTasks)?;
        Self::require_user(&state)?;
        Ok(state.tasks.clone())
    }

    async fn create_task(&self, task: &Task) -> Result<Task, RemoteError> {
        let mut state = self.enter(RemoteCall::CreateTask)?;
        Self::require_user(&state)?;
        let mut stored = task.clone();
        if state.server_ids {
            state.next_id += 1;
            stored.id = format!("srv-{}", state.next_id);
        }
        state.tasks.push(stored.clone());
        Ok(stored)
    }

    async fn update_task(&self, task: &Task) -> Result<(), RemoteError> {
        let mut state = self.enter(RemoteCall::UpdateTask)?;
        Self::require_user(&state)?;
        match state.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => {
                *existing = task.clone();
                Ok(())
            }
            None => Err(RemoteError::Http {
                status: 404,
                body: format!("task {} not found", task.id),
            }),
        }
    }

    async fn delete_task(&self, id: &str) -> Result<(), RemoteError> {
        let mut state = self.enter(RemoteCall::DeleteTask)?;
        Self::require_user(&state)?;
        let before = state.tasks.len();
        state.tasks.retain(|task| task.id != id);
        if state.tasks.len() == before {
            return Err(RemoteError::Http {
                status: 404,
                body: format!("task {id} not found"),
            });
        }
        Ok(())
    }

    async fn logout(&self) -> Result<(), RemoteError> {
        let mut state = self.enter(RemoteCall::Logout)?;
        state.user = None;
        Ok(())
    }
}
