//! valo - search recorded matches for agent states.
//!
//! Usage:
//!   valo search --query query.json
//!   valo versus --team1 attackers.json --team2 defenders.json
//!   valo match --id <game_uuid>
//!   valo config [--save valo.toml]
//!
//! Output: an HTML table (or JSON with `--format json`) on stdout.

mod render;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::EnvFilter;
use valo_core::{
    FilterCompiler, SearchOutcome, ValoConfig, ValoStore, VersusOutcome, VodLinks, parse_request,
};
use valo_types::SearchRequest;

const NO_MATCHES: &str = "Nothing found matching your query.";

#[derive(Parser)]
#[command(version, about = "Search recorded matches for agent states")]
struct Cli {
    /// Config file (defaults to the confy-managed location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the directory holding the parquet tables
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = Format::Html)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Html,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Rounds where every filter in the query held on the same frame
    Search {
        #[arg(short, long)]
        query: PathBuf,
    },
    /// Overlapping engagements between two opposing sides
    Versus {
        #[arg(long)]
        team1: PathBuf,
        #[arg(long)]
        team2: PathBuf,
    },
    /// Every round of one match
    Match {
        #[arg(long)]
        id: String,
    },
    /// Print the resolved configuration, optionally writing it to a file
    Config {
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

/// Initialize logging, writing to VALO_LOG_PATH if set, otherwise stderr.
fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Ok(path) = std::env::var("VALO_LOG_PATH") {
        if let Ok(file) = fs::OpenOptions::new().create(true).append(true).open(&path) {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(file)
                .init();
            return;
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn read_request(path: &Path) -> Result<SearchRequest, String> {
    let json = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    parse_request(&json).map_err(|e| e.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}

/// Open the store for one request; it is dropped when the command returns
async fn open_store(config: &ValoConfig) -> Result<ValoStore, String> {
    ValoStore::open(config, FilterCompiler::default())
        .await
        .map_err(|e| e.to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), String> {
    init_logging();
    let cli = Cli::parse();

    let mut config = ValoConfig::load(cli.config.as_deref()).map_err(|e| e.to_string())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let links = VodLinks::new(config.frame_rates.clone());

    let output = match cli.command {
        Commands::Search { query } => {
            let request = read_request(&query)?;
            let store = open_store(&config).await?;
            match store.search(&request, false).await.map_err(|e| e.to_string())? {
                SearchOutcome::NoMatches => NO_MATCHES.to_string(),
                SearchOutcome::Matches(rows) => match cli.format {
                    Format::Html => render::search_table(&rows, &links),
                    Format::Json => to_json(&rows)?,
                },
            }
        }
        Commands::Versus { team1, team2 } => {
            let team_1 = read_request(&team1)?;
            let team_2 = read_request(&team2)?;
            let store = open_store(&config).await?;
            match store.versus(&team_1, &team_2).await.map_err(|e| e.to_string())? {
                VersusOutcome::NoMatches => NO_MATCHES.to_string(),
                VersusOutcome::Matches(report) => match cli.format {
                    Format::Html => render::versus_table(&report, &links),
                    Format::Json => to_json(&report)?,
                },
            }
        }
        Commands::Match { id } => {
            let store = open_store(&config).await?;
            let overview = store.match_overview(&id).await.map_err(|e| e.to_string())?;
            match cli.format {
                Format::Html => render::match_page(&overview, &links),
                Format::Json => to_json(&overview)?,
            }
        }
        Commands::Config { save } => {
            if let Some(path) = save {
                config.save(Some(path.as_path())).map_err(|e| e.to_string())?;
                tracing::info!(path = %path.display(), "Saved configuration");
            }
            toml::to_string_pretty(&config).map_err(|e| e.to_string())?
        }
    };

    println!("{output}");
    Ok(())
}
