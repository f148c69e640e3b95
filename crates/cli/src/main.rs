mod cmd;
mod logging;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sdb", version, about = "Queue, build and query weighted full-text search indexes")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate configuration and print resolved paths
    Doctor,

    /// Queue an item for indexing
    Index(IndexArgs),

    /// Queue removal of an item from an index
    Remove(RemoveArgs),

    /// Process queued index jobs
    Run(RunArgs),

    /// Query an index
    Search(SearchArgs),

    /// Show queued jobs and pending descriptors
    Status(StatusArgs),
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Quiet,
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Collection (module) the item belongs to
    pub collection_id: String,

    /// Item (file) id, unique within the collection
    pub item_id: String,

    #[arg(long, default_value = "en")]
    pub language: String,

    /// Relevance multiplier for this item
    #[arg(long, default_value_t = 1.0)]
    pub boost: f64,

    /// Highest-weighted text (usually the title)
    #[arg(long)]
    pub weight0: Option<String>,

    #[arg(long)]
    pub weight1: Option<String>,

    #[arg(long)]
    pub weight2: Option<String>,

    #[arg(long)]
    pub weight3: Option<String>,

    /// Lowest-weighted text (usually the body)
    #[arg(long)]
    pub weight4: Option<String>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub subtitle: Option<String>,

    #[arg(long)]
    pub uri: Option<String>,

    /// Display type shown with results
    #[arg(long = "type")]
    pub display_type: Option<String>,

    #[arg(long)]
    pub image_uri: Option<String>,

    /// Target index (defaults to the profile's default_index)
    #[arg(long)]
    pub index: Option<String>,

    /// Process the queue right after queueing
    #[arg(long)]
    pub now: bool,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    pub collection_id: String,

    pub item_id: String,

    #[arg(long)]
    pub index: Option<String>,

    /// Process the queue right after queueing
    #[arg(long)]
    pub now: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Retry tasks that were held after too many failures
    #[arg(long)]
    pub release_held: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Query text
    pub query: String,

    #[arg(long)]
    pub index: Option<String>,

    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: i64,

    #[arg(long, default_value_t = 0)]
    pub offset: i64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Shorthand for --output json
    #[arg(long)]
    pub json: bool,

    /// Print only collection/item keys
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(long)]
    pub json: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Doctor => cmd::doctor::run(config, profile),
        Commands::Index(args) => cmd::index::run(config, profile, args),
        Commands::Remove(args) => cmd::remove::run(config, profile, args),
        Commands::Run(args) => cmd::run::run(config, profile, args),
        Commands::Search(args) => cmd::search::run(config, profile, args),
        Commands::Status(args) => cmd::status::run(config, profile, args),
    }

    Ok(())
}
