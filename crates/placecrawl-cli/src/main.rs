mod consolidate;
mod crawl;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "placecrawl")]
#[command(about = "Map-site business listing crawler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve and extract listings, writing partial artifacts as it goes.
    Crawl(CrawlArgs),
    /// Merge every partial artifact into a fresh master snapshot.
    Consolidate {
        /// Output root in local storage mode; defaults to `PLACECRAWL_OUTPUT_DIR`.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct CrawlArgs {
    /// YAML target list; defaults to `PLACECRAWL_TARGETS_PATH`.
    #[arg(long, conflicts_with = "query")]
    targets: Option<PathBuf>,

    /// Crawl a single business instead of a target file.
    #[arg(long)]
    query: Option<String>,

    /// Area hint for `--query`.
    #[arg(long, requires = "query")]
    location: Option<String>,

    /// Street address for `--query`; used to pick between same-name
    /// listings when no `--location` is given.
    #[arg(long, requires = "query")]
    address: Option<String>,

    /// Concurrent browser sessions (1-3); defaults to `PLACECRAWL_WORKERS`.
    #[arg(long)]
    workers: Option<usize>,

    /// Run the browser with a visible window.
    #[arg(long)]
    show_browser: bool,

    /// Print the targets and exit without starting a browser.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // Loads `.env` before reading the environment.
    let config = placecrawl_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Crawl(args) => crawl::run(config, args).await,
        Commands::Consolidate { output_dir } => consolidate::run(config, output_dir).await,
    }
}
