//! The central task collection together with the per-bucket sort selections.
//!
//! Every mutation computes the complete next collection and swaps it in, so observers never
//! see a half-applied change.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::drag::{apply_drop, DragError, DropApplied, DropEvent};
use crate::model::{Bucket, SortOption, Task, TaskFilter, TaskPatch};
use crate::ordering::{bucket_members, next_index, normalize, replace_bucket};
use crate::sort::{sorted, SortOptions};

#[derive(Debug, Clone, Default)]
pub struct Board {
    tasks: Vec<Task>,
    sort_options: SortOptions,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: normalize(tasks),
            sort_options: SortOptions::default(),
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Installs an externally loaded collection, repairing flags and order along the way.
    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = normalize(tasks);
    }

    pub fn sort_options(&self) -> &SortOptions {
        &self.sort_options
    }

    pub fn set_sort_options(&mut self, options: SortOptions) {
        self.sort_options = options;
    }

    pub fn sort_option(&self, bucket: Bucket) -> Option<SortOption> {
        self.sort_options.get(bucket)
    }

    /// Members of `bucket` in manual order.
    pub fn members(&self, bucket: Bucket) -> Vec<Task> {
        bucket_members(&self.tasks, bucket)
    }

    /// Displayed list for `bucket`: manual order narrowed by `filter`.
    pub fn view(&self, bucket: Bucket, filter: &TaskFilter, now: DateTime<Utc>) -> Vec<Task> {
        self.members(bucket)
            .into_iter()
            .filter(|task| filter.matches(task, now))
            .collect()
    }

    /// Translates a position in a filtered view into a position in the bucket's manual order.
    /// Dropping after the last visible task lands right after it.
    pub fn manual_index(
        &self,
        bucket: Bucket,
        filter: &TaskFilter,
        now: DateTime<Utc>,
        view_index: usize,
    ) -> usize {
        let members = self.members(bucket);
        if !filter.is_active() {
            return view_index.min(members.len());
        }
        let visible: Vec<usize> = members
            .iter()
            .enumerate()
            .filter(|(_, task)| filter.matches(task, now))
            .map(|(position, _)| position)
            .collect();
        match visible.get(view_index) {
            Some(position) => *position,
            None => visible.last().map(|last| last + 1).unwrap_or(members.len()),
        }
    }

    /// Appends a new task to the end of the inbox.
    pub fn insert_new(&mut self, title: &str, now: DateTime<Utc>) -> Task {
        let task = Task::new(title, next_index(&self.tasks, Bucket::Inbox), now);
        let mut next = self.tasks.clone();
        next.push(task.clone());
        self.tasks = next;
        debug!(task_id = task.id.as_str(), "task created");
        task
    }

    pub fn update(&mut self, id: &str, patch: &TaskPatch) -> Option<Task> {
        let mut updated = None;
        let next: Vec<Task> = self
            .tasks
            .iter()
            .map(|task| {
                if task.id == id {
                    let mut task = task.clone();
                    task.apply_patch(patch);
                    updated = Some(task.clone());
                    task
                } else {
                    task.clone()
                }
            })
            .collect();
        if updated.is_some() {
            self.tasks = next;
            debug!(task_id = id, "task updated");
        }
        updated
    }

    /// Removes a task and compacts its former bucket. Returns the removed task and the
    /// siblings whose index shifted.
    pub fn remove(&mut self, id: &str) -> Option<(Task, Vec<Task>)> {
        let removed = self.get(id)?.clone();
        let bucket = removed.bucket();
        let remaining: Vec<Task> = self
            .tasks
            .iter()
            .filter(|task| task.id != id)
            .cloned()
            .collect();
        let before = bucket_members(&remaining, bucket);
        let next = replace_bucket(&remaining, bucket, before.clone());
        let shifted = bucket_members(&next, bucket)
            .into_iter()
            .zip(before)
            .filter(|(after, before)| after.order_index != before.order_index)
            .map(|(after, _)| after)
            .collect();
        self.tasks = next;
        debug!(task_id = id, bucket = %bucket, "task deleted");
        Some((removed, shifted))
    }

    /// Applies a completed drag. A real move forgets the remembered sort of both buckets.
    pub fn apply_drop(&mut self, event: &DropEvent) -> Result<Option<DropApplied>, DragError> {
        let Some(applied) = apply_drop(&self.tasks, event)? else {
            return Ok(None);
        };
        self.tasks = applied.tasks.clone();
        self.sort_options.clear(applied.source);
        self.sort_options.clear(applied.destination);
        debug!(
            task_id = applied.task.id.as_str(),
            from = %applied.source,
            to = %applied.destination,
            index = applied.task.order_index,
            "task moved"
        );
        Ok(Some(applied))
    }

    /// Sorts `bucket` and commits the result as its new manual order. Returns the tasks whose
    /// index changed.
    pub fn apply_sort(&mut self, bucket: Bucket, option: SortOption) -> Vec<Task> {
        let before = self.members(bucket);
        let ordered = sorted(before.clone(), option);
        let next = replace_bucket(&self.tasks, bucket, ordered);
        let changed = bucket_members(&next, bucket)
            .into_iter()
            .filter(|after| {
                before
                    .iter()
                    .any(|prior| prior.id == after.id && prior.order_index != after.order_index)
            })
            .collect();
        self.tasks = next;
        self.sort_options.set(bucket, option);
        debug!(bucket = %bucket, option = %option, "bucket sorted");
        changed
    }

    /// Swaps a local id for the canonical one assigned by the server.
    pub fn adopt_remote_id(&mut self, local_id: &str, remote_id: &str) -> bool {
        if local_id == remote_id || self.get(local_id).is_none() {
            return false;
        }
        self.tasks = self
            .tasks
            .iter()
            .map(|task| {
                let mut task = task.clone();
                if task.id == local_id {
                    task.id = remote_id.to_string();
                }
                task
            })
            .collect();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CompletionFilter, DueFilter};
    use crate::ordering::is_dense;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn titles(tasks: &[Task]) -> Vec<String> {
        tasks.iter().map(|task| task.title.clone()).collect()
    }

    fn assert_dense(board: &Board) {
        for bucket in Bucket::ALL {
            assert!(is_dense(board.tasks(), bucket), "{bucket} is not dense");
        }
    }

    #[test]
    fn new_tasks_append_to_inbox() {
        let mut board = Board::new();
        let now = Utc::now();
        let t1 = board.insert_new("T1", now);
        let t2 = board.insert_new("T2", now);
        assert_eq!(t1.order_index, 0);
        assert_eq!(t2.order_index, 1);
        assert_eq!(board.get(&t1.id).map(|t| t.order_index), Some(0));
        assert_dense(&board);
    }

    #[test]
    fn delete_compacts_remaining_members() {
        let mut board = Board::new();
        let now = Utc::now();
        let a = board.insert_new("A", now);
        let b = board.insert_new("B", now);
        let c = board.insert_new("C", now);

        let (removed, shifted) = board.remove(&a.id).expect("removed");
        assert_eq!(removed.id, a.id);
        assert_eq!(titles(&shifted), vec!["B", "C"]);
        assert_eq!(board.get(&b.id).map(|t| t.order_index), Some(0));
        assert_eq!(board.get(&c.id).map(|t| t.order_index), Some(1));
        assert!(board.remove(&a.id).is_none());
        assert_dense(&board);
    }

    #[test]
    fn sort_commits_to_manual_order_and_is_remembered() {
        let mut board = Board::new();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let a = board.insert_new("A", now);
        let b = board.insert_new("B", now + Duration::minutes(1));
        let c = board.insert_new("C", now + Duration::minutes(2));

        let changed = board.apply_sort(Bucket::Inbox, SortOption::CreatedNewFirst);
        assert_eq!(titles(&board.members(Bucket::Inbox)), vec!["C", "B", "A"]);
        assert_eq!(titles(&changed), vec!["C", "A"]);
        assert_eq!(
            board.sort_option(Bucket::Inbox),
            Some(SortOption::CreatedNewFirst)
        );
        assert_eq!(board.get(&c.id).map(|t| t.order_index), Some(0));
        assert_eq!(board.get(&b.id).map(|t| t.order_index), Some(1));
        assert_eq!(board.get(&a.id).map(|t| t.order_index), Some(2));
    }

    #[test]
    fn drag_clears_remembered_sort_for_both_buckets() {
        let mut board = Board::new();
        let now = Utc::now();
        let a = board.insert_new("A", now);
        board.insert_new("B", now);
        board.apply_sort(Bucket::Inbox, SortOption::CreatedOldFirst);
        board.apply_sort(Bucket::ImportantUrgent, SortOption::DueSoonFirst);

        let event = DropEvent {
            task_id: a.id.clone(),
            source: Bucket::Inbox,
            destination: Some(Bucket::ImportantUrgent),
            index: 0,
        };
        board.apply_drop(&event).unwrap().expect("moved");
        assert_eq!(board.sort_option(Bucket::Inbox), None);
        assert_eq!(board.sort_option(Bucket::ImportantUrgent), None);
        assert_dense(&board);
    }

    #[test]
    fn noop_drag_keeps_sort_selection() {
        let mut board = Board::new();
        let a = board.insert_new("A", Utc::now());
        board.apply_sort(Bucket::Inbox, SortOption::CreatedOldFirst);
        let event = DropEvent {
            task_id: a.id,
            source: Bucket::Inbox,
            destination: Some(Bucket::Inbox),
            index: 0,
        };
        assert_eq!(board.apply_drop(&event).unwrap(), None);
        assert_eq!(
            board.sort_option(Bucket::Inbox),
            Some(SortOption::CreatedOldFirst)
        );
    }

    #[test]
    fn filtered_view_maps_back_to_manual_positions() {
        let mut board = Board::new();
        let now = Utc::now();
        let a = board.insert_new("A", now);
        board.insert_new("B", now);
        board.insert_new("C", now);
        board.update(
            &a.id,
            &TaskPatch {
                completed: Some(true),
                ..TaskPatch::default()
            },
        );

        let incomplete = TaskFilter {
            completion: CompletionFilter::Incomplete,
            due: DueFilter::All,
        };
        assert_eq!(titles(&board.view(Bucket::Inbox, &incomplete, now)), vec!["B", "C"]);
        assert_eq!(board.manual_index(Bucket::Inbox, &incomplete, now, 0), 1);
        assert_eq!(board.manual_index(Bucket::Inbox, &incomplete, now, 5), 3);
        assert_eq!(
            board.manual_index(Bucket::Inbox, &TaskFilter::default(), now, 5),
            3
        );
    }

    #[test]
    fn adopting_remote_id_keeps_position() {
        let mut board = Board::new();
        let task = board.insert_new("A", Utc::now());
        assert!(board.adopt_remote_id(&task.id, "srv-1"));
        assert!(board.get(&task.id).is_none());
        assert_eq!(board.get("srv-1").map(|t| t.order_index), Some(0));
        assert!(!board.adopt_remote_id("missing", "srv-2"));
    }
}
