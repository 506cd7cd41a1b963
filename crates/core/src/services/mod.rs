pub mod merge;
pub mod tasks;

pub use merge::{plan_merge, MergeError, MergeState};
pub use tasks::{Applied, Notice, Session, TasksService};
