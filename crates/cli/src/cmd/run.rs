//! Run command implementation.

use std::path::Path;
use std::sync::Arc;

use searchdb_core::jobs::{CancellationToken, CompletionSink, QueueRunStats};

use super::{Session, fail};
use crate::RunArgs;

/// Logs every batch of newly indexed items.
struct LogCompletions;

impl CompletionSink for LogCompletions {
    fn notify(&self, collection_ids: &[String], item_ids: &[String]) {
        for (collection_id, item_id) in collection_ids.iter().zip(item_ids) {
            tracing::info!(%collection_id, %item_id, "Indexed");
        }
    }
}

pub fn run(config: Option<&Path>, profile: Option<&str>, args: RunArgs) {
    let session = Session::open(config, profile);

    if args.release_held {
        match session.queue.release_held() {
            Ok(n) => println!("Released {} held task(s)", n),
            Err(e) => fail("Error releasing held tasks", e),
        }
    }

    let stats = process_queue(&session);
    print_stats(&stats, session.queue.len());
}

/// Execute every runnable task in the session's queue once.
pub fn process_queue(session: &Session) -> QueueRunStats {
    let sink: Arc<dyn CompletionSink> = Arc::new(LogCompletions);
    match session.queue.run_pending(
        &session.registry,
        &session.descriptors,
        Some(sink),
        &CancellationToken::new(),
    ) {
        Ok(stats) => stats,
        Err(e) => fail("Error running jobs", e),
    }
}

pub fn print_stats(stats: &QueueRunStats, remaining: usize) {
    println!("Jobs processed: {}", stats.processed);
    println!("  succeeded:    {}", stats.succeeded);
    if stats.failed > 0 {
        println!("  failed:       {}", stats.failed);
    }
    if stats.held > 0 {
        println!("  held:         {}", stats.held);
    }
    if stats.dropped > 0 {
        println!("  dropped:      {}", stats.dropped);
    }
    println!("Jobs remaining: {}", remaining);
}
