//! Index command implementation.

use std::path::Path;

use searchdb_core::descriptor::{ItemMetadata, WeightSlot, WorkDescriptor};

use super::{Session, fail, run};
use crate::IndexArgs;

pub fn run(config: Option<&Path>, profile: Option<&str>, args: IndexArgs) {
    let session = Session::open(config, profile);
    let index = session.index_name(args.index.as_deref());
    let descriptor = build_descriptor(&args);

    let reference = match session.manager.enqueue_index(&descriptor, &index) {
        Ok(r) => r,
        Err(e) => fail("Error queueing item", e),
    };
    println!(
        "Queued {}/{} for index '{}' ({})",
        descriptor.collection_id, descriptor.item_id, index, reference
    );

    if args.now {
        let stats = run::process_queue(&session);
        run::print_stats(&stats, session.queue.len());
    }
}

fn build_descriptor(args: &IndexArgs) -> WorkDescriptor {
    let texts = [
        (WeightSlot::Weight0, &args.weight0),
        (WeightSlot::Weight1, &args.weight1),
        (WeightSlot::Weight2, &args.weight2),
        (WeightSlot::Weight3, &args.weight3),
        (WeightSlot::Weight4, &args.weight4),
    ];

    let metadata = ItemMetadata {
        title: args.title.clone(),
        subtitle: args.subtitle.clone(),
        uri: args.uri.clone(),
        display_type: args.display_type.clone(),
        image_uri: args.image_uri.clone(),
    };

    texts
        .into_iter()
        .filter_map(|(slot, text)| text.as_ref().map(|t| (slot, t)))
        .fold(
            WorkDescriptor::new(&args.collection_id, &args.item_id, &args.language, args.boost),
            |d, (slot, text)| d.with_text(slot, text.as_str()),
        )
        .with_metadata(metadata)
}
