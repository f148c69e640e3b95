//! Remove command implementation.

use std::path::Path;

use super::{Session, fail, run};
use crate::RemoveArgs;

pub fn run(config: Option<&Path>, profile: Option<&str>, args: RemoveArgs) {
    let session = Session::open(config, profile);
    let index = session.index_name(args.index.as_deref());

    if let Err(e) = session.manager.enqueue_remove(&args.collection_id, &args.item_id, &index) {
        fail("Error queueing removal", e);
    }
    println!("Queued removal of {}/{} from index '{}'", args.collection_id, args.item_id, index);

    if args.now {
        let stats = run::process_queue(&session);
        run::print_stats(&stats, session.queue.len());
    }
}
