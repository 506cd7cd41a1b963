//! Dense per-bucket manual ordering.

use std::collections::BTreeMap;

use crate::model::{Bucket, Task};

/// Assigns `order_index` from position. Never reorders.
pub fn reindex(tasks: Vec<Task>) -> Vec<Task> {
    tasks
        .into_iter()
        .enumerate()
        .map(|(position, mut task)| {
            task.order_index = position as u32;
            task
        })
        .collect()
}

/// Members of `bucket` in manual order. The sort is stable, so ties keep collection order.
pub fn bucket_members(tasks: &[Task], bucket: Bucket) -> Vec<Task> {
    let mut members: Vec<Task> = tasks
        .iter()
        .filter(|task| task.bucket() == bucket)
        .cloned()
        .collect();
    members.sort_by_key(|task| task.order_index);
    members
}

pub fn next_index(tasks: &[Task], bucket: Bucket) -> u32 {
    tasks.iter().filter(|task| task.bucket() == bucket).count() as u32
}

pub fn max_index(tasks: &[Task], bucket: Bucket) -> Option<u32> {
    tasks
        .iter()
        .filter(|task| task.bucket() == bucket)
        .map(|task| task.order_index)
        .max()
}

/// Rebuilds the collection with `bucket` replaced by `members`, reindexed in the given order.
pub fn replace_bucket(tasks: &[Task], bucket: Bucket, members: Vec<Task>) -> Vec<Task> {
    let mut next: Vec<Task> = tasks
        .iter()
        .filter(|task| task.bucket() != bucket)
        .cloned()
        .collect();
    next.extend(reindex(members));
    next
}

/// Repairs flags and compacts every bucket. Applied to anything loaded from outside.
pub fn normalize(tasks: Vec<Task>) -> Vec<Task> {
    let mut grouped: BTreeMap<Bucket, Vec<Task>> = BTreeMap::new();
    for mut task in tasks {
        task.normalize_flags();
        grouped.entry(task.bucket()).or_default().push(task);
    }
    grouped
        .into_values()
        .flat_map(|mut members| {
            members.sort_by_key(|task| task.order_index);
            reindex(members)
        })
        .collect()
}

pub fn is_dense(tasks: &[Task], bucket: Bucket) -> bool {
    let mut indices: Vec<u32> = tasks
        .iter()
        .filter(|task| task.bucket() == bucket)
        .map(|task| task.order_index)
        .collect();
    indices.sort_unstable();
    indices
        .iter()
        .enumerate()
        .all(|(position, index)| *index == position as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn task(title: &str, bucket: Bucket, order_index: u32) -> Task {
        let mut task = Task::new(title, order_index, Utc::now());
        task.set_bucket(bucket);
        task
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.title.as_str()).collect()
    }

    #[test]
    fn reindex_assigns_positions_without_reordering() {
        let input = vec![
            task("a", Bucket::Inbox, 9),
            task("b", Bucket::Inbox, 4),
            task("c", Bucket::Inbox, 4),
        ];
        let output = reindex(input);
        assert_eq!(titles(&output), vec!["a", "b", "c"]);
        let indices: Vec<u32> = output.iter().map(|task| task.order_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn reindex_is_idempotent() {
        let input = vec![
            task("a", Bucket::ImportantUrgent, 5),
            task("b", Bucket::ImportantUrgent, 1),
        ];
        let once = reindex(input);
        let twice = reindex(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn members_follow_manual_order() {
        let tasks = vec![
            task("late", Bucket::ImportantUrgent, 2),
            task("other", Bucket::Inbox, 0),
            task("first", Bucket::ImportantUrgent, 0),
            task("middle", Bucket::ImportantUrgent, 1),
        ];
        let members = bucket_members(&tasks, Bucket::ImportantUrgent);
        assert_eq!(titles(&members), vec!["first", "middle", "late"]);
        assert_eq!(next_index(&tasks, Bucket::ImportantUrgent), 3);
        assert_eq!(max_index(&tasks, Bucket::ImportantUrgent), Some(2));
        assert_eq!(max_index(&tasks, Bucket::NotImportantUrgent), None);
    }

    #[test]
    fn normalize_compacts_gaps_and_repairs_flags() {
        let mut broken = task("broken", Bucket::ImportantUrgent, 0);
        broken.urgent = None;
        let tasks = vec![
            task("x", Bucket::Inbox, 4),
            broken,
            task("y", Bucket::NotImportantNotUrgent, 10),
            task("z", Bucket::NotImportantNotUrgent, 3),
        ];
        let normalized = normalize(tasks);
        for bucket in Bucket::ALL {
            assert!(is_dense(&normalized, bucket), "{bucket} not dense");
        }
        let inbox = bucket_members(&normalized, Bucket::Inbox);
        assert_eq!(titles(&inbox), vec!["broken", "x"]);
        let nn = bucket_members(&normalized, Bucket::NotImportantNotUrgent);
        assert_eq!(titles(&nn), vec!["z", "y"]);
    }
}
