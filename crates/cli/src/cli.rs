use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use eisen_core::capture::TaskInput;
use eisen_core::model::{Bucket, CompletionFilter, DueFilter, SortOption, TaskFilter};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "eisen",
    version,
    about = "A local-first Eisenhower matrix: sort tasks by importance and urgency.",
    after_help = "Examples:\n  eisen                      Print the board (same as `eisen board`)\n  eisen add Renew passport --due +2w\n  eisen move 01HV... IU --index 0\n  eisen sort NU due-soon\n  eisen show IN --completion incomplete"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the task service (falls back to EISEN_API_URL)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Session cookie presented to the task service (falls back to EISEN_SESSION)
    #[arg(long, value_name = "COOKIE", global = true)]
    pub session: Option<String>,

    /// Tracing filter written to stderr (e.g. "warn", "eisen_core=debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Print the inbox and the four quadrants (default command)
    Board,
    /// Capture a new task into the inbox
    Add(AddArgs),
    /// Change the title, description, due date or completion of a task
    Edit(EditArgs),
    /// Delete one or more tasks by id
    Delete(DeleteArgs),
    /// Move a task into a bucket, reclassifying it when the bucket changes
    Move(MoveArgs),
    /// Reorder a bucket by a criterion and keep the result as its manual order
    Sort(SortArgs),
    /// Print a single bucket, optionally filtered
    Show(ShowArgs),
    /// Reload the board from the task service
    Sync,
    /// Decide what happens to tasks created on this device before signing in
    Merge(MergeArgs),
    /// End the session and return to the device board
    Logout,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title; an empty title becomes "New Task"
    #[arg(value_name = "TITLE")]
    pub title: Vec<String>,

    /// Optional detailed notes
    #[arg(long)]
    pub description: Option<String>,

    /// Set due date (ISO e.g. 2025-12-24, today, +3d, mon)
    #[arg(long = "due", value_name = "DATE")]
    pub due: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    /// Id of the task to edit
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Set due date (ISO, today, +Nd, weekday)
    #[arg(long = "due", value_name = "DATE", conflicts_with = "clear_due")]
    pub due: Option<String>,

    /// Remove the due date
    #[arg(long = "clear-due")]
    pub clear_due: bool,

    /// Mark the task completed
    #[arg(long, conflicts_with = "undone")]
    pub done: bool,

    /// Mark the task not completed
    #[arg(long)]
    pub undone: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more task ids to delete
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    /// Destination bucket (inbox, IU, IN, NU, NN)
    #[arg(value_name = "BUCKET", value_enum)]
    pub bucket: Bucket,

    /// Zero-based position in the destination; defaults to the end
    #[arg(long, value_name = "N")]
    pub index: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct SortArgs {
    #[arg(value_name = "BUCKET", value_enum)]
    pub bucket: Bucket,

    #[arg(value_name = "OPTION", value_enum)]
    pub option: SortOption,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[arg(value_name = "BUCKET", value_enum)]
    pub bucket: Bucket,

    #[arg(long, value_enum, default_value_t = CompletionFilter::All)]
    pub completion: CompletionFilter,

    #[arg(long = "due-status", value_enum, default_value_t = DueFilter::All)]
    pub due_status: DueFilter,
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct MergeArgs {
    /// Upload the device tasks after the ones already on the server
    #[arg(long)]
    pub confirm: bool,

    /// Discard the device tasks
    #[arg(long)]
    pub skip: bool,
}

impl From<&AddArgs> for TaskInput {
    fn from(args: &AddArgs) -> Self {
        TaskInput {
            title: args.title.clone(),
            description: args.description.clone(),
            due: args.due.clone(),
            clear_due: false,
            completed: None,
        }
    }
}

impl From<&EditArgs> for TaskInput {
    fn from(args: &EditArgs) -> Self {
        let completed = match (args.done, args.undone) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        TaskInput {
            title: args.title.iter().cloned().collect(),
            description: args.description.clone(),
            due: args.due.clone(),
            clear_due: args.clear_due,
            completed,
        }
    }
}

impl ShowArgs {
    pub fn filter(&self) -> TaskFilter {
        TaskFilter {
            completion: self.completion,
            due: self.due_status,
        }
    }
}
