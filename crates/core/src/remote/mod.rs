//! The remote persistence service as seen by the engine.

mod http;
mod memory;

pub use http::HttpRemote;
pub use memory::MemoryRemote;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Task, User};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("no active session")]
    Unauthenticated,
    #[error("server responded with {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

/// Calls the engine makes against the task service. Implementations must be safe to call
/// concurrently; no ordering between calls is assumed.
#[async_trait]
pub trait RemoteTasks: Send + Sync {
    /// `Ok(None)` when nobody is signed in.
    async fn current_user(&self) -> Result<Option<User>, RemoteError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, RemoteError>;

    /// Returns the stored record, which may carry a server-assigned id.
    async fn create_task(&self, task: &Task) -> Result<Task, RemoteError>;

    async fn update_task(&self, task: &Task) -> Result<(), RemoteError>;

    async fn delete_task(&self, id: &str) -> Result<(), RemoteError>;

    async fn logout(&self) -> Result<(), RemoteError>;
}

/// Names a remote call, for failure injection and call logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCall {
    CurrentUser,
    ListTasks,
    CreateTask,
    UpdateTask,
    DeleteTask,
    Logout,
}
