use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

pub const DEFAULT_TITLE: &str = "New Task";

/// One of the five containers a task can live in: the inbox or a quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Bucket {
    #[serde(rename = "inbox")]
    Inbox,
    #[serde(rename = "IU")]
    ImportantUrgent,
    #[serde(rename = "IN")]
    ImportantNotUrgent,
    #[serde(rename = "NU")]
    NotImportantUrgent,
    #[serde(rename = "NN")]
    NotImportantNotUrgent,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [
        Bucket::Inbox,
        Bucket::ImportantUrgent,
        Bucket::ImportantNotUrgent,
        Bucket::NotImportantUrgent,
        Bucket::NotImportantNotUrgent,
    ];

    pub fn as_code(&self) -> &'static str {
        match self {
            Bucket::Inbox => "inbox",
            Bucket::ImportantUrgent => "IU",
            Bucket::ImportantNotUrgent => "IN",
            Bucket::NotImportantUrgent => "NU",
            Bucket::NotImportantNotUrgent => "NN",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Bucket::Inbox => "Todo List",
            Bucket::ImportantUrgent => "Urgent & Important",
            Bucket::ImportantNotUrgent => "Important & Not Urgent",
            Bucket::NotImportantUrgent => "Urgent & Not Important",
            Bucket::NotImportantNotUrgent => "Not Important & Not Urgent",
        }
    }

    /// Short action hint shown under each quadrant heading.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Bucket::Inbox => None,
            Bucket::ImportantUrgent => Some("Prioritize First"),
            Bucket::ImportantNotUrgent => Some("Make a Plan"),
            Bucket::NotImportantUrgent => Some("Delegate to Others"),
            Bucket::NotImportantNotUrgent => Some("Do When Free"),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

impl FromStr for Bucket {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inbox" | "todo" => Ok(Bucket::Inbox),
            "iu" | "important-urgent" => Ok(Bucket::ImportantUrgent),
            "in" | "important-not-urgent" => Ok(Bucket::ImportantNotUrgent),
            "nu" | "not-important-urgent" => Ok(Bucket::NotImportantUrgent),
            "nn" | "not-important-not-urgent" => Ok(Bucket::NotImportantNotUrgent),
            other => Err(anyhow!(
                "Unknown bucket '{}': expected inbox|IU|IN|NU|NN",
                other
            )),
        }
    }
}

impl ValueEnum for Bucket {
    fn value_variants<'a>() -> &'a [Self] {
        &Bucket::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        let value = clap::builder::PossibleValue::new(self.as_code());
        let value = match self {
            Bucket::Inbox => value.alias("todo"),
            Bucket::ImportantUrgent => value.alias("iu").alias("important-urgent"),
            Bucket::ImportantNotUrgent => value.alias("in").alias("important-not-urgent"),
            Bucket::NotImportantUrgent => value.alias("nu").alias("not-important-urgent"),
            Bucket::NotImportantNotUrgent => value.alias("nn").alias("not-important-not-urgent"),
        };
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub important: Option<bool>,
    #[serde(default)]
    pub urgent: Option<bool>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub order_index: u32,
}

impl Task {
    /// A fresh inbox task with a new ULID.
    pub fn new(title: impl Into<String>, order_index: u32, created_at: DateTime<Utc>) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            title.trim().to_string()
        };
        Self {
            id: Ulid::new().to_string(),
            title,
            description: String::new(),
            important: None,
            urgent: None,
            completed: false,
            created_at,
            due_date: None,
            order_index,
        }
    }

    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date.map(|due| due < now).unwrap_or(false)
    }
}

/// Field-level edit applied by the CRUD layer. Flags and order are never patched directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.due_date.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
#[clap(rename_all = "kebab-case")]
pub enum SortOption {
    Manual,
    #[value(alias = "new")]
    CreatedNewFirst,
    #[value(alias = "old")]
    CreatedOldFirst,
    #[value(alias = "due-soon")]
    DueSoonFirst,
    #[value(alias = "due-later")]
    DueLaterFirst,
}

impl SortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Manual => "manual",
            SortOption::CreatedNewFirst => "createdNewFirst",
            SortOption::CreatedOldFirst => "createdOldFirst",
            SortOption::DueSoonFirst => "dueSoonFirst",
            SortOption::DueLaterFirst => "dueLaterFirst",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOption::Manual => "Manual",
            SortOption::CreatedNewFirst => "Joined: New → Old",
            SortOption::CreatedOldFirst => "Joined: Old → New",
            SortOption::DueSoonFirst => "Due Date: Soon → Later",
            SortOption::DueLaterFirst => "Due Date: Later → Soon",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "manual" => Ok(SortOption::Manual),
            "creatednewfirst" | "new" => Ok(SortOption::CreatedNewFirst),
            "createdoldfirst" | "old" => Ok(SortOption::CreatedOldFirst),
            "duesoonfirst" | "duesoon" => Ok(SortOption::DueSoonFirst),
            "duelaterfirst" | "duelater" => Ok(SortOption::DueLaterFirst),
            other => Err(anyhow!(
                "Unknown sort option '{}': expected manual|createdNewFirst|createdOldFirst|dueSoonFirst|dueLaterFirst",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum CompletionFilter {
    #[default]
    All,
    Completed,
    Incomplete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum DueFilter {
    #[default]
    All,
    Overdue,
    NotOverdue,
}

/// View-level filter for a single bucket. Never touches `order_index`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub completion: CompletionFilter,
    pub due: DueFilter,
}

impl TaskFilter {
    pub fn is_active(&self) -> bool {
        self.completion != CompletionFilter::All || self.due != DueFilter::All
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("inbox", Bucket::Inbox)]
    #[case("IU", Bucket::ImportantUrgent)]
    #[case("in", Bucket::ImportantNotUrgent)]
    #[case("not-important-urgent", Bucket::NotImportantUrgent)]
    #[case(" NN ", Bucket::NotImportantNotUrgent)]
    fn parses_bucket_codes(#[case] raw: &str, #[case] expected: Bucket) {
        assert_eq!(raw.parse::<Bucket>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_bucket() {
        assert!("someday".parse::<Bucket>().is_err());
    }

    #[rstest]
    #[case("dueSoon", SortOption::DueSoonFirst)]
    #[case("due-later-first", SortOption::DueLaterFirst)]
    #[case("createdNewFirst", SortOption::CreatedNewFirst)]
    #[case("MANUAL", SortOption::Manual)]
    fn parses_sort_options(#[case] raw: &str, #[case] expected: SortOption) {
        assert_eq!(raw.parse::<SortOption>().unwrap(), expected);
    }

    #[test]
    fn new_task_defaults_to_placeholder_title_in_inbox() {
        let task = Task::new("   ", 3, Utc::now());
        assert_eq!(task.title, DEFAULT_TITLE);
        assert_eq!(task.important, None);
        assert_eq!(task.urgent, None);
        assert_eq!(task.order_index, 3);
        assert!(!task.completed);
    }

    #[test]
    fn patch_can_clear_due_date() {
        let mut task = Task::new("Pay rent", 0, Utc::now());
        task.due_date = Some(Utc::now());
        task.apply_patch(&TaskPatch {
            due_date: Some(None),
            completed: Some(true),
            ..TaskPatch::default()
        });
        assert_eq!(task.due_date, None);
        assert!(task.completed);
        assert_eq!(task.title, "Pay rent");
    }

    #[test]
    fn task_json_uses_camel_case_and_ignores_legacy_list() {
        let raw = r#"{
            "id": "t1",
            "title": "Call bank",
            "description": "",
            "important": true,
            "urgent": false,
            "completed": false,
            "createdAt": "2025-03-01T08:00:00Z",
            "dueDate": null,
            "list": "NU",
            "orderIndex": 2
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.important, Some(true));
        assert_eq!(task.urgent, Some(false));
        assert_eq!(task.order_index, 2);

        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("list").is_none());
        assert_eq!(value["createdAt"], "2025-03-01T08:00:00Z");
        assert_eq!(value["orderIndex"], 2);
    }

    #[test]
    fn user_display_name_falls_back_to_email_then_id() {
        let user = User {
            id: "u1".into(),
            name: None,
            email: Some("a@example.com".into()),
        };
        assert_eq!(user.display_name(), "a@example.com");
    }
}
