use std::fmt;

use crate::model::TaskPatch;
use crate::parser::parse_date_spec;

/// Normalized input for creating or editing a task from any client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    pub title: Vec<String>,
    pub description: Option<String>,
    pub due: Option<String>,
    pub clear_due: bool,
    pub completed: Option<bool>,
}

impl TaskInput {
    /// The title words joined, or `None` when no words were given.
    pub fn title_text(&self) -> Option<String> {
        let joined = self
            .title
            .iter()
            .map(|word| word.trim())
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }

    pub fn to_patch(&self) -> Result<TaskPatch, CaptureError> {
        if self.clear_due && self.due.is_some() {
            return Err(CaptureError::ConflictingDue);
        }
        let due_date = match (&self.due, self.clear_due) {
            (Some(spec), _) => Some(Some(
                parse_date_spec(spec).map_err(|err| CaptureError::InvalidDue(err.to_string()))?,
            )),
            (None, true) => Some(None),
            (None, false) => None,
        };
        Ok(TaskPatch {
            title: self.title_text(),
            description: self.description.clone(),
            completed: self.completed,
            due_date,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    ConflictingDue,
    InvalidDue(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::ConflictingDue => {
                write!(f, "Cannot set and clear the due date at the same time")
            }
            CaptureError::InvalidDue(reason) => write!(f, "Invalid due date: {}", reason),
        }
    }
}

impl std::error::Error for CaptureError {}
