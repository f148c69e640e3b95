//! Search command implementation.

use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use searchdb_core::index::SearchResult;
use searchdb_core::search::SearchResponse;
use serde::Serialize;

use super::output::{ResultOutput, truncate};
use super::{Session, fail};
use crate::{OutputFormat, SearchArgs};

const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct SearchOutput {
    results: Vec<ResultOutput>,
    suggestions: Vec<String>,
}

pub fn run(config: Option<&Path>, profile: Option<&str>, args: SearchArgs) {
    let session = Session::open(config, profile);
    let index = session.index_name(args.index.as_deref());

    // Unknown names are reported by the search, not created.
    let exists = session.registry.index_path(&index).is_some_and(|p| p.exists());
    if exists {
        if let Err(e) = session.manager.register_index(&index) {
            fail("Error opening index", e);
        }
    }

    let (tx, rx) = mpsc::channel();
    session.manager.search(&args.query, args.limit, args.offset, &index, move |response| {
        let _ = tx.send(response);
    });

    if !session.main_loop.run_one(RESPONSE_TIMEOUT) {
        fail("Error searching", "timed out waiting for results");
    }
    let response: SearchResponse = match rx.try_recv() {
        Ok(r) => r,
        Err(e) => fail("Error searching", e),
    };
    if let Some(err) = response.error {
        fail("Error searching", err);
    }

    let suggestions: Vec<String> = response.suggestions.collect();
    match resolve_format(args.output, args.json, args.quiet) {
        OutputFormat::Table => print_results_table(&response.results, &suggestions),
        OutputFormat::Json => print_results_json(&response.results, suggestions),
        OutputFormat::Quiet => print_results_quiet(&response.results),
    }
}

/// Print search results as a table.
fn print_results_table(results: &[SearchResult], suggestions: &[String]) {
    if results.is_empty() {
        println!("(no results found)");
    } else {
        let key_width = results
            .iter()
            .map(|r| r.collection_id.len() + r.item_id.len() + 1)
            .max()
            .unwrap_or(3)
            .clamp(3, 40);
        let title_width = results
            .iter()
            .map(|r| r.title.as_deref().unwrap_or("").len())
            .max()
            .unwrap_or(5)
            .clamp(5, 40);

        println!(
            "{:<key_width$}  {:<title_width$}  SCORE",
            "KEY",
            "TITLE",
            key_width = key_width,
            title_width = title_width,
        );
        println!(
            "{:-<key_width$}  {:-<title_width$}  {:-<7}",
            "",
            "",
            "",
            key_width = key_width,
            title_width = title_width,
        );

        for result in results {
            let key = truncate(&format!("{}/{}", result.collection_id, result.item_id), key_width);
            let title = truncate(result.title.as_deref().unwrap_or(""), title_width);
            println!(
                "{:<key_width$}  {:<title_width$}  {:7.3}",
                key,
                title,
                result.score,
                key_width = key_width,
                title_width = title_width,
            );
        }

        println!();
        println!("-- {} results --", results.len());
    }

    if !suggestions.is_empty() {
        println!("suggestions: {}", suggestions.join(", "));
    }
}

/// Print search results as JSON.
fn print_results_json(results: &[SearchResult], suggestions: Vec<String>) {
    let output = SearchOutput { results: results.iter().map(ResultOutput::from).collect(), suggestions };
    println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
}

/// Print only result keys.
fn print_results_quiet(results: &[SearchResult]) {
    for result in results {
        println!("{}/{}", result.collection_id, result.item_id);
    }
}

/// Resolve the output format from flags.
fn resolve_format(output: OutputFormat, json: bool, quiet: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else if quiet {
        OutputFormat::Quiet
    } else {
        output
    }
}
