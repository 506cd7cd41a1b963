pub mod board;
pub mod capture;
pub mod config;
pub mod database;
pub mod drag;
pub mod model;
pub mod ordering;
pub mod parser;
pub mod quadrant;
pub mod remote;
pub mod services;
pub mod sort;
pub mod sync;

pub use board::Board;
pub use capture::TaskInput;
pub use config::{AppConfig, RemoteConfig};
pub use database::Database;
pub use drag::{DropApplied, DropEvent};
pub use model::*;
pub use services::{Applied, MergeState, Notice, Session, TasksService};
pub use sync::{BestEffortSync, SyncOp, SyncOutcome};
