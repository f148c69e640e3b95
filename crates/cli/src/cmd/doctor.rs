use searchdb_core::config::loader::{ConfigLoader, default_config_path};
use std::path::Path;

pub fn run(config: Option<&Path>, profile: Option<&str>) {
    match ConfigLoader::load(config, profile) {
        Ok(rc) => {
            crate::logging::init(&rc);
            tracing::debug!(profile = %rc.active_profile, "Configuration loaded");

            println!("OK   sdb doctor");
            println!(
                "path: {}",
                config.map_or_else(
                    || default_config_path().display().to_string(),
                    |p| p.display().to_string()
                )
            );
            println!("profile: {}", rc.active_profile);
            println!("storage_root: {}", rc.storage_root.display());
            println!("index_info_dir: {}", rc.descriptor_store().info_dir().display());
            println!("queue_file: {}", rc.queue_file.display());
            println!("default_index: {}", rc.default_index);
            println!("search.worker_threads: {}", rc.search.worker_threads);
            println!("search.suggestion_limit: {}", rc.search.suggestion_limit);
            println!("queue.max_retries: {}", rc.queue.max_retries);
        }
        Err(e) => {
            println!("FAIL sdb doctor");
            println!("{e}");
            if config.is_none() {
                println!("looked for: {}", default_config_path().display());
            }
            std::process::exit(1);
        }
    }
}
