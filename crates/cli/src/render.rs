//! Plain-text rendering of buckets for the terminal.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};

use eisen_core::model::{Bucket, Task, TaskFilter};
use eisen_core::Board;

pub fn write_board<W: Write>(board: &Board, now: DateTime<Utc>, mut writer: W) -> Result<()> {
    for (position, bucket) in Bucket::ALL.into_iter().enumerate() {
        if position > 0 {
            writeln!(writer)?;
        }
        write_bucket(board, bucket, &TaskFilter::default(), now, &mut writer)?;
    }
    Ok(())
}

pub fn write_bucket<W: Write>(
    board: &Board,
    bucket: Bucket,
    filter: &TaskFilter,
    now: DateTime<Utc>,
    mut writer: W,
) -> Result<()> {
    writeln!(writer, "{}", heading(board, bucket))?;
    let tasks = board.view(bucket, filter, now);
    if tasks.is_empty() {
        let empty = if filter.is_active() {
            "(no matching tasks)"
        } else {
            "(empty)"
        };
        writeln!(writer, "  {empty}")?;
    }
    for task in &tasks {
        writeln!(writer, "{}", task_line(task, now))?;
    }
    Ok(())
}

fn heading(board: &Board, bucket: Bucket) -> String {
    let mut line = format!("{} [{}]", bucket.title(), bucket.as_code());
    if let Some(hint) = bucket.hint() {
        line.push_str(&format!(" - {hint}"));
    }
    if let Some(option) = board.sort_option(bucket) {
        line.push_str(&format!(" (sorted: {})", option.label()));
    }
    line
}

fn task_line(task: &Task, now: DateTime<Utc>) -> String {
    let check = if task.completed { "x" } else { " " };
    let mut line = format!("  {:>2}. [{check}] {}", task.order_index, task.title);
    if let Some(due) = task.due_date {
        let local = due.with_timezone(&Local);
        line.push_str(&format!("  due {}", local.format("%Y-%m-%d %H:%M")));
        if task.is_overdue(now) {
            line.push_str(" (overdue)");
        }
    }
    line.push_str(&format!("  {}", task.id));
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use eisen_core::model::CompletionFilter;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
    }

    fn task(id: &str, title: &str, order_index: u32) -> Task {
        let mut task = Task::new(title, order_index, now());
        task.id = id.to_string();
        task
    }

    #[test]
    fn board_lists_every_bucket_with_hints() {
        let board = Board::from_tasks(vec![task("a", "Pay rent", 0)]);
        let mut out = Vec::new();
        write_board(&board, now(), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Todo List [inbox]"));
        assert!(out.contains("   0. [ ] Pay rent  a"));
        assert!(out.contains("Urgent & Important [IU] - Prioritize First"));
        assert!(out.contains("Not Important & Not Urgent [NN] - Do When Free"));
        assert_eq!(out.matches("(empty)").count(), 4);
    }

    #[test]
    fn overdue_and_completed_are_marked() {
        let mut late = task("late", "Late", 0);
        late.due_date = Some(now() - Duration::days(1));
        let mut done = task("done", "Done", 1);
        done.completed = true;
        let board = Board::from_tasks(vec![late, done]);

        let mut out = Vec::new();
        write_bucket(&board, Bucket::Inbox, &TaskFilter::default(), now(), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("(overdue)"));
        assert!(out.contains("[x] Done"));
    }

    #[test]
    fn filtered_view_reports_no_matches() {
        let board = Board::from_tasks(vec![task("a", "Open", 0)]);
        let filter = TaskFilter {
            completion: CompletionFilter::Completed,
            ..TaskFilter::default()
        };
        let mut out = Vec::new();
        write_bucket(&board, Bucket::Inbox, &filter, now(), &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("(no matching tasks)"));
    }
}
