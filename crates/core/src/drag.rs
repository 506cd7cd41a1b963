//! Applies a completed drag: reclassifies the task, splices it into the destination and
//! compacts both affected buckets.

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::model::{Bucket, Task};
use crate::ordering::{bucket_members, replace_bucket};

/// A finished drop as reported by the drag recognizer. `destination` is `None` when the drag
/// was cancelled. `index` is the insertion point in the destination's displayed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropEvent {
    pub task_id: String,
    pub source: Bucket,
    pub destination: Option<Bucket>,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DragError {
    #[error("task '{0}' does not exist")]
    UnknownTask(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropApplied {
    /// The full collection after the move.
    pub tasks: Vec<Task>,
    pub task: Task,
    pub source: Bucket,
    pub destination: Bucket,
    /// Every record whose flags or `order_index` changed, the dragged task included.
    pub touched: Vec<Task>,
}

impl DropApplied {
    pub fn crossed_buckets(&self) -> bool {
        self.source != self.destination
    }
}

/// Computes the collection after `event`. `Ok(None)` means nothing moved.
pub fn apply_drop(tasks: &[Task], event: &DropEvent) -> Result<Option<DropApplied>, DragError> {
    let dragged = tasks
        .iter()
        .find(|task| task.id == event.task_id)
        .ok_or_else(|| DragError::UnknownTask(event.task_id.clone()))?;

    let Some(destination) = event.destination else {
        return Ok(None);
    };

    let source = dragged.bucket();
    if source != event.source {
        warn!(
            task_id = dragged.id.as_str(),
            reported = %event.source,
            actual = %source,
            "drop source does not match task bucket"
        );
    }

    if source == destination {
        let members = bucket_members(tasks, source);
        let current = members.iter().position(|task| task.id == dragged.id);
        let target = event.index.min(members.len().saturating_sub(1));
        if current == Some(target) {
            return Ok(None);
        }
    }

    let remaining: Vec<Task> = tasks
        .iter()
        .filter(|task| task.id != dragged.id)
        .cloned()
        .collect();

    let mut moved = dragged.clone();
    if source != destination {
        moved.set_bucket(destination);
    }

    let mut destination_members = bucket_members(&remaining, destination);
    let at = event.index.min(destination_members.len());
    destination_members.insert(at, moved);
    let mut next = replace_bucket(&remaining, destination, destination_members);

    if source != destination {
        let source_members = bucket_members(&next, source);
        next = replace_bucket(&next, source, source_members);
    }

    let before: HashMap<&str, &Task> = tasks.iter().map(|task| (task.id.as_str(), task)).collect();
    let touched: Vec<Task> = next
        .iter()
        .filter(|task| match before.get(task.id.as_str()) {
            Some(previous) => {
                previous.order_index != task.order_index
                    || previous.important != task.important
                    || previous.urgent != task.urgent
                    || task.id == event.task_id
            }
            None => true,
        })
        .cloned()
        .collect();

    let task = next
        .iter()
        .find(|task| task.id == event.task_id)
        .cloned()
        .ok_or_else(|| DragError::UnknownTask(event.task_id.clone()))?;

    Ok(Some(DropApplied {
        tasks: next,
        task,
        source,
        destination,
        touched,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::is_dense;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn task(title: &str, bucket: Bucket, order_index: u32) -> Task {
        let mut task = Task::new(title, order_index, Utc::now());
        task.id = title.to_string();
        task.set_bucket(bucket);
        task
    }

    fn ids(tasks: &[Task], bucket: Bucket) -> Vec<String> {
        bucket_members(tasks, bucket)
            .into_iter()
            .map(|task| task.id)
            .collect()
    }

    fn board() -> Vec<Task> {
        vec![
            task("t1", Bucket::Inbox, 0),
            task("t2", Bucket::Inbox, 1),
            task("t3", Bucket::Inbox, 2),
            task("a", Bucket::ImportantUrgent, 0),
            task("b", Bucket::ImportantUrgent, 1),
        ]
    }

    fn drop_event(id: &str, source: Bucket, destination: Bucket, index: usize) -> DropEvent {
        DropEvent {
            task_id: id.into(),
            source,
            destination: Some(destination),
            index,
        }
    }

    #[test]
    fn moving_across_buckets_reclassifies_and_compacts_both() {
        let event = drop_event("t1", Bucket::Inbox, Bucket::ImportantUrgent, 1);
        let applied = apply_drop(&board(), &event).unwrap().expect("moved");

        assert_eq!(applied.task.important, Some(true));
        assert_eq!(applied.task.urgent, Some(true));
        assert_eq!(applied.task.order_index, 1);
        assert_eq!(ids(&applied.tasks, Bucket::ImportantUrgent), vec!["a", "t1", "b"]);
        assert_eq!(ids(&applied.tasks, Bucket::Inbox), vec!["t2", "t3"]);
        for bucket in Bucket::ALL {
            assert!(is_dense(&applied.tasks, bucket));
        }

        let mut touched: Vec<&str> = applied.touched.iter().map(|t| t.id.as_str()).collect();
        touched.sort_unstable();
        assert_eq!(touched, vec!["b", "t1", "t2", "t3"]);
    }

    #[test]
    fn moving_back_to_inbox_unsets_flags() {
        let event = drop_event("b", Bucket::ImportantUrgent, Bucket::Inbox, 0);
        let applied = apply_drop(&board(), &event).unwrap().expect("moved");
        assert_eq!((applied.task.important, applied.task.urgent), (None, None));
        assert_eq!(ids(&applied.tasks, Bucket::Inbox), vec!["b", "t1", "t2", "t3"]);
        assert_eq!(ids(&applied.tasks, Bucket::ImportantUrgent), vec!["a"]);
    }

    #[test]
    fn index_past_the_end_is_clamped() {
        let event = drop_event("t2", Bucket::Inbox, Bucket::ImportantUrgent, 99);
        let applied = apply_drop(&board(), &event).unwrap().expect("moved");
        assert_eq!(ids(&applied.tasks, Bucket::ImportantUrgent), vec!["a", "b", "t2"]);
        assert_eq!(applied.task.order_index, 2);
    }

    #[test]
    fn reorder_within_bucket_keeps_flags() {
        let event = drop_event("t3", Bucket::Inbox, Bucket::Inbox, 0);
        let applied = apply_drop(&board(), &event).unwrap().expect("moved");
        assert_eq!(ids(&applied.tasks, Bucket::Inbox), vec!["t3", "t1", "t2"]);
        assert_eq!((applied.task.important, applied.task.urgent), (None, None));
        assert!(!applied.crossed_buckets());
    }

    #[test]
    fn same_position_and_cancelled_drops_are_noops() {
        let same = drop_event("t2", Bucket::Inbox, Bucket::Inbox, 1);
        assert_eq!(apply_drop(&board(), &same).unwrap(), None);

        let last_past_end = drop_event("t3", Bucket::Inbox, Bucket::Inbox, 42);
        assert_eq!(apply_drop(&board(), &last_past_end).unwrap(), None);

        let cancelled = DropEvent {
            task_id: "t1".into(),
            source: Bucket::Inbox,
            destination: None,
            index: 0,
        };
        assert_eq!(apply_drop(&board(), &cancelled).unwrap(), None);
    }

    #[test]
    fn unknown_task_is_rejected() {
        let event = drop_event("ghost", Bucket::Inbox, Bucket::Inbox, 0);
        assert_eq!(
            apply_drop(&board(), &event),
            Err(DragError::UnknownTask("ghost".into()))
        );
    }

    #[test]
    fn mismatched_source_uses_actual_bucket() {
        let event = drop_event("a", Bucket::NotImportantNotUrgent, Bucket::Inbox, 0);
        let applied = apply_drop(&board(), &event).unwrap().expect("moved");
        assert_eq!(applied.source, Bucket::ImportantUrgent);
        assert_eq!(ids(&applied.tasks, Bucket::ImportantUrgent), vec!["b"]);
    }
}
