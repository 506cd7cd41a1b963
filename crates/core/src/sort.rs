//! Per-bucket sort criteria, remembered sort options and view filters.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Bucket, CompletionFilter, DueFilter, SortOption, Task, TaskFilter};

/// Orders `members` by `option`. Stable, so pass them in manual order to break ties by it.
pub fn sorted(mut members: Vec<Task>, option: SortOption) -> Vec<Task> {
    match option {
        SortOption::Manual => members.sort_by_key(|task| task.order_index),
        SortOption::CreatedNewFirst => members.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOption::CreatedOldFirst => members.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortOption::DueSoonFirst => members.sort_by(|a, b| by_due(a, b, false)),
        SortOption::DueLaterFirst => members.sort_by(|a, b| by_due(a, b, true)),
    }
    members
}

// Tasks without a due date go last in both directions.
fn by_due(a: &Task, b: &Task, latest_first: bool) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(left), Some(right)) if latest_first => right.cmp(&left),
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Remembered non-manual sort per bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortOptions {
    selected: BTreeMap<Bucket, SortOption>,
}

impl SortOptions {
    pub fn get(&self, bucket: Bucket) -> Option<SortOption> {
        self.selected.get(&bucket).copied()
    }

    pub fn set(&mut self, bucket: Bucket, option: SortOption) {
        if option == SortOption::Manual {
            self.selected.remove(&bucket);
        } else {
            self.selected.insert(bucket, option);
        }
    }

    pub fn clear(&mut self, bucket: Bucket) {
        self.selected.remove(&bucket);
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

impl TaskFilter {
    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        let completion = match self.completion {
            CompletionFilter::All => true,
            CompletionFilter::Completed => task.completed,
            CompletionFilter::Incomplete => !task.completed,
        };
        let due = match self.due {
            DueFilter::All => true,
            DueFilter::Overdue => task.is_overdue(now),
            DueFilter::NotOverdue => !task.is_overdue(now),
        };
        completion && due
    }
}
