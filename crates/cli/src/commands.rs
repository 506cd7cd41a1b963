use std::fmt;
use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use eisen_core::capture::TaskInput;
use eisen_core::drag::DropEvent;
use eisen_core::model::Task;
use eisen_core::remote::{HttpRemote, RemoteTasks};
use eisen_core::services::MergeState;
use eisen_core::sync::BestEffortSync;
use eisen_core::{Board, Database, Notice, TasksService};

use crate::cli::{AddArgs, CliCommand, DeleteArgs, EditArgs, MergeArgs, MoveArgs, ShowArgs, SortArgs};
use crate::config::AppConfig;
use crate::render;

/// Runs one command to completion, including any remote calls it triggered.
pub fn execute<W: Write>(config: &AppConfig, command: CliCommand, writer: W) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(async {
        let mut service = open_service(config).await?;
        run(&mut service, command, writer).await
    })
}

/// Opens the device store and, when a task service is configured, joins its session.
/// An unreachable service leaves the board anonymous rather than failing the command.
pub async fn open_service(config: &AppConfig) -> Result<TasksService> {
    let store = Database::initialize(config).context("failed to open task store")?;
    let service = TasksService::open(store)?;
    let Some(remote_config) = config.remote() else {
        return Ok(service);
    };

    let remote: Arc<dyn RemoteTasks> = Arc::new(HttpRemote::new(
        &remote_config.base_url,
        remote_config.session.clone(),
    )?);
    let sync = BestEffortSync::new(remote.clone(), Handle::current());
    let mut service = service.with_remote(remote, Box::new(sync));
    match service.detect_session().await {
        Ok(state) => debug!(?state, "session detected"),
        Err(err) => warn!(error = %err, "task service unavailable; working offline"),
    }
    Ok(service)
}

pub async fn run<W: Write>(
    service: &mut TasksService,
    command: CliCommand,
    mut writer: W,
) -> Result<()> {
    let merge_pending = service.merge_state() == MergeState::MergePrompt;
    if merge_pending && !matches!(command, CliCommand::Merge(_) | CliCommand::Logout) {
        writeln!(
            writer,
            "Tasks created on this device are waiting: run `eisen merge --confirm` to upload them or `eisen merge --skip` to discard them."
        )?;
    }

    match command {
        CliCommand::Board => render::write_board(service.board(), Utc::now(), &mut writer)?,
        CliCommand::Add(args) => handle_add(service, &args, &mut writer).await?,
        CliCommand::Edit(args) => handle_edit(service, &args, &mut writer)?,
        CliCommand::Delete(args) => handle_delete(service, &args, &mut writer)?,
        CliCommand::Move(args) => handle_move(service, &args, &mut writer)?,
        CliCommand::Sort(args) => handle_sort(service, &args, &mut writer)?,
        CliCommand::Show(args) => handle_show(service.board(), &args, &mut writer)?,
        CliCommand::Sync => {
            if !service.is_synced() {
                bail!("Not signed in to the task service");
            }
            let count = service.reload().await?;
            writeln!(writer, "Loaded {} from the server", plural(count, "task"))?;
        }
        CliCommand::Merge(args) => handle_merge(service, &args, &mut writer).await?,
        CliCommand::Logout => {
            service.logout().await?;
            writeln!(writer, "Signed out; showing tasks stored on this device")?;
        }
    }

    let notices = service.settle().await;
    write_notices(&notices, &mut writer)
}

async fn handle_add<W: Write>(
    service: &mut TasksService,
    args: &AddArgs,
    mut writer: W,
) -> Result<()> {
    let mut patch = TaskInput::from(args).to_patch()?;
    let title = patch.title.take().unwrap_or_default();
    let applied = service.create(&title, &patch)?;
    if let Some(notice) = &applied.notice {
        writeln!(writer, "{}", NoticeLine(notice))?;
    }

    // A server may assign its own id once the create lands.
    let notices = service.settle().await;
    let created = find_created(service.board(), &applied.value).unwrap_or(&applied.value);
    writeln!(writer, "Added '{}' to the inbox ({})", created.title, created.id)?;
    write_notices(&notices, writer)
}

fn find_created<'a>(board: &'a Board, task: &Task) -> Option<&'a Task> {
    board.get(&task.id).or_else(|| {
        board
            .tasks()
            .iter()
            .find(|candidate| candidate.created_at == task.created_at && candidate.title == task.title)
    })
}

fn handle_edit<W: Write>(service: &mut TasksService, args: &EditArgs, mut writer: W) -> Result<()> {
    let patch = TaskInput::from(args).to_patch()?;
    if patch.is_empty() {
        bail!("Nothing to change: pass --title, --description, --due, --clear-due, --done or --undone");
    }
    let applied = service
        .update(&args.id, &patch)?
        .ok_or_else(|| anyhow!("Task '{}' not found", args.id))?;
    writeln!(writer, "Updated '{}'", applied.value.title)?;
    Ok(())
}

fn handle_delete<W: Write>(
    service: &mut TasksService,
    args: &DeleteArgs,
    mut writer: W,
) -> Result<()> {
    let mut summary = DeleteSummary::default();
    for id in &args.ids {
        match service.delete(id)? {
            Some(_) => summary.deleted += 1,
            None => summary.missing.push(id.clone()),
        }
    }
    summary.write_to(&mut writer)
}

fn handle_move<W: Write>(service: &mut TasksService, args: &MoveArgs, mut writer: W) -> Result<()> {
    let task = service
        .board()
        .get(&args.id)
        .cloned()
        .ok_or_else(|| anyhow!("Task '{}' not found", args.id))?;
    let event = DropEvent {
        task_id: task.id.clone(),
        source: task.bucket(),
        destination: Some(args.bucket),
        index: args.index.unwrap_or(usize::MAX),
    };
    match service.move_task(&event)? {
        Some(applied) => writeln!(
            writer,
            "Moved '{}' to {} at position {}",
            applied.value.task.title,
            args.bucket.title(),
            applied.value.task.order_index
        )?,
        None => writeln!(writer, "'{}' is already there", task.title)?,
    }
    Ok(())
}

fn handle_sort<W: Write>(service: &mut TasksService, args: &SortArgs, mut writer: W) -> Result<()> {
    let applied = service.sort(args.bucket, args.option)?;
    writeln!(
        writer,
        "Sorted {} by {}: {} reordered",
        args.bucket.title(),
        args.option.label(),
        plural(applied.value.len(), "task")
    )?;
    Ok(())
}

fn handle_show<W: Write>(board: &Board, args: &ShowArgs, writer: W) -> Result<()> {
    render::write_bucket(board, args.bucket, &args.filter(), Utc::now(), writer)
}

async fn handle_merge<W: Write>(
    service: &mut TasksService,
    args: &MergeArgs,
    mut writer: W,
) -> Result<()> {
    if args.confirm {
        let uploaded = service.confirm_merge().await?;
        writeln!(writer, "Merged {} into your account", plural(uploaded.len(), "device task"))?;
    } else {
        let discarded = service.skip_merge().await?;
        writeln!(writer, "Discarded {}", plural(discarded, "device task"))?;
    }
    Ok(())
}

fn write_notices<W: Write>(notices: &[Notice], mut writer: W) -> Result<()> {
    for notice in notices {
        writeln!(writer, "{}", NoticeLine(notice))?;
    }
    Ok(())
}

struct NoticeLine<'a>(&'a Notice);

impl fmt::Display for NoticeLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Notice::LocalOnlyWarning => write!(
                f,
                "Not signed in: new tasks are stored on this device only until you sign in and merge them."
            ),
            Notice::RemoteCreateFailed { task_id } => write!(
                f,
                "Could not save task {} to the server; it is kept on this device for now.",
                task_id
            ),
        }
    }
}

#[derive(Default)]
struct DeleteSummary {
    deleted: usize,
    missing: Vec<String>,
}

impl DeleteSummary {
    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.deleted > 0 {
            writeln!(writer, "Deleted {}", plural(self.deleted, "task"))?;
        } else {
            writeln!(writer, "No tasks deleted")?;
        }
        if !self.missing.is_empty() {
            writeln!(writer, "Not found: {}", self.missing.join(", "))?;
        }
        Ok(())
    }
}

fn plural(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, if count == 1 { "" } else { "s" })
}
