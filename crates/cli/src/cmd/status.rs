//! Status command implementation.

use std::path::Path;

use chrono::Local;
use searchdb_core::jobs::QueuedTask;
use serde::Serialize;

use super::output::TaskOutput;
use super::{Session, fail};
use crate::StatusArgs;

#[derive(Debug, Serialize)]
struct StatusOutput {
    profile: String,
    queue_file: String,
    tasks: Vec<TaskOutput>,
    pending_descriptors: usize,
}

pub fn run(config: Option<&Path>, profile: Option<&str>, args: StatusArgs) {
    let session = Session::open(config, profile);
    let tasks = session.queue.pending();
    let pending = match session.descriptors.list() {
        Ok(refs) => refs.len(),
        Err(e) => fail("Error listing descriptors", e),
    };

    if args.json {
        let output = StatusOutput {
            profile: session.rc.active_profile.clone(),
            queue_file: session.rc.queue_file.display().to_string(),
            tasks: tasks.iter().map(TaskOutput::from).collect(),
            pending_descriptors: pending,
        };
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        return;
    }

    println!("profile: {}", session.rc.active_profile);
    println!("queue: {}", session.rc.queue_file.display());
    print_tasks(&tasks);
    println!("pending descriptors: {}", pending);
}

fn print_tasks(tasks: &[QueuedTask]) {
    if tasks.is_empty() {
        println!("(no queued jobs)");
        return;
    }

    println!("{:>4}  {:<6}  {:<16}  {:>5}  {:>8}  {:<4}  QUEUED", "ID", "ACTION", "INDEX", "ITEMS", "ATTEMPTS", "HELD");
    for task in tasks {
        let row = TaskOutput::from(task);
        let queued = task.enqueued_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        println!(
            "{:>4}  {:<6}  {:<16}  {:>5}  {:>8}  {:<4}  {}",
            row.id,
            row.action,
            super::output::truncate(&row.index, 16),
            row.items,
            row.attempts,
            if row.held { "yes" } else { "no" },
            queued,
        );
    }
    println!("-- {} jobs --", tasks.len());
}
