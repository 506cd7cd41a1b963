//! Maps the importance/urgency flag pair to a bucket and back.

use thiserror::Error;
use tracing::warn;

use crate::model::{Bucket, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("mixed classification flags (important: {important:?}, urgent: {urgent:?})")]
pub struct ClassificationError {
    pub important: Option<bool>,
    pub urgent: Option<bool>,
}

/// Pure classification. Fails only when exactly one flag is set.
pub fn classify(
    important: Option<bool>,
    urgent: Option<bool>,
) -> Result<Bucket, ClassificationError> {
    match (important, urgent) {
        (None, None) => Ok(Bucket::Inbox),
        (Some(true), Some(true)) => Ok(Bucket::ImportantUrgent),
        (Some(true), Some(false)) => Ok(Bucket::ImportantNotUrgent),
        (Some(false), Some(true)) => Ok(Bucket::NotImportantUrgent),
        (Some(false), Some(false)) => Ok(Bucket::NotImportantNotUrgent),
        (important, urgent) => Err(ClassificationError { important, urgent }),
    }
}

impl Bucket {
    /// The `(important, urgent)` pair a task takes when it lands in this bucket.
    pub fn flags(self) -> (Option<bool>, Option<bool>) {
        match self {
            Bucket::Inbox => (None, None),
            Bucket::ImportantUrgent => (Some(true), Some(true)),
            Bucket::ImportantNotUrgent => (Some(true), Some(false)),
            Bucket::NotImportantUrgent => (Some(false), Some(true)),
            Bucket::NotImportantNotUrgent => (Some(false), Some(false)),
        }
    }
}

impl Task {
    /// Bucket membership derived from the flags. Mixed flags read as the inbox.
    pub fn bucket(&self) -> Bucket {
        classify(self.important, self.urgent).unwrap_or(Bucket::Inbox)
    }

    pub fn set_bucket(&mut self, bucket: Bucket) {
        let (important, urgent) = bucket.flags();
        self.important = important;
        self.urgent = urgent;
    }

    /// Coerces a mixed flag pair back to the inbox. Returns true when the task was repaired.
    pub fn normalize_flags(&mut self) -> bool {
        match classify(self.important, self.urgent) {
            Ok(_) => false,
            Err(err) => {
                warn!(task_id = self.id.as_str(), error = %err, "normalizing task to inbox");
                self.set_bucket(Bucket::Inbox);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, Bucket::Inbox)]
    #[case(Some(true), Some(true), Bucket::ImportantUrgent)]
    #[case(Some(true), Some(false), Bucket::ImportantNotUrgent)]
    #[case(Some(false), Some(true), Bucket::NotImportantUrgent)]
    #[case(Some(false), Some(false), Bucket::NotImportantNotUrgent)]
    fn classifies_flag_pairs(
        #[case] important: Option<bool>,
        #[case] urgent: Option<bool>,
        #[case] expected: Bucket,
    ) {
        assert_eq!(classify(important, urgent), Ok(expected));
        assert_eq!(expected.flags(), (important, urgent));
    }

    #[rstest]
    #[case(Some(true), None)]
    #[case(None, Some(false))]
    fn rejects_mixed_flags(#[case] important: Option<bool>, #[case] urgent: Option<bool>) {
        assert!(classify(important, urgent).is_err());
    }

    #[test]
    fn bucket_ignores_every_other_field() {
        let mut a = Task::new("a", 0, Utc::now());
        let mut b = Task::new("b", 7, Utc::now());
        b.completed = true;
        b.due_date = Some(Utc::now());
        b.description = "details".into();
        a.set_bucket(Bucket::NotImportantUrgent);
        b.set_bucket(Bucket::NotImportantUrgent);
        assert_eq!(a.bucket(), b.bucket());
    }

    #[test]
    fn normalize_repairs_mixed_state() {
        let mut task = Task::new("broken", 0, Utc::now());
        task.important = Some(true);
        assert!(task.normalize_flags());
        assert_eq!((task.important, task.urgent), (None, None));
        assert!(!task.normalize_flags());
    }
}
