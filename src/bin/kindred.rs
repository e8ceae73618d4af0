//! kindred command-line entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use kindred::{
    list_titles, Catalog, IndexBuilder, IndexHandle, LoaderChain, QueryError, ResolveError,
    Settings,
};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kindred")]
#[command(about = "Build and query a tag-similarity neighbor index")]
#[command(version)]
struct Cli {
    /// TOML settings file (optional; KINDRED_* environment variables override it)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Index artifact path (overrides serve.index_path)
    #[arg(long, short = 'i', global = true)]
    index: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an index from a catalog file and write it
    Build {
        /// JSON array or JSON Lines catalog
        #[arg(long)]
        catalog: PathBuf,
        /// Output path (defaults to the index path)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Neighbors kept per item
        #[arg(long, short = 'k')]
        neighbors: Option<usize>,
        /// Vocabulary size bound
        #[arg(long)]
        max_features: Option<usize>,
    },
    /// Recommend items similar to the first title containing QUERY
    Recommend {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// List titles, optionally filtered by substring
    Titles {
        #[arg(long, short = 's')]
        search: Option<String>,
    },
    /// Report whether an index loads and how many items it has
    Status,
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kindred=info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, BoxError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(index) = cli.index {
        settings.serve.index_path = index;
    }

    match cli.command {
        Command::Build {
            catalog,
            output,
            neighbors,
            max_features,
        } => {
            if let Some(k) = neighbors {
                settings.build.neighbors = k;
            }
            if let Some(v) = max_features {
                settings.build.max_features = v;
            }
            let output = output.unwrap_or_else(|| settings.serve.index_path.clone());

            let catalog = Catalog::from_path(&catalog, &settings.catalog)?;
            let index = IndexBuilder::new(settings.build.clone()).build(&catalog)?;
            let bytes = index.save(&output)?;
            info!(path = %output.display(), bytes, "index saved");

            let stats = index.stats();
            print_json(&json!({
                "output": output.display().to_string(),
                "items": stats.items,
                "entries": stats.entries,
                "file_bytes": bytes,
                "dense_bytes": stats.dense_bytes,
                "compression_ratio": stats.compression_ratio(),
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Recommend { query } => {
            let handle = open(&settings);
            let query = query.join(" ");
            match handle.resolve(&query) {
                Ok(rec) => {
                    print_json(&rec)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(QueryError::Resolve(ResolveError::NotFound(q))) => {
                    print_json(&json!({
                        "error": format!("'{q}' not found"),
                        "suggestion": "search the catalog with `kindred titles --search`",
                    }))?;
                    Ok(ExitCode::from(1))
                }
                Err(QueryError::Resolve(ResolveError::EmptyQuery)) => {
                    print_json(&json!({ "error": "query cannot be empty" }))?;
                    Ok(ExitCode::from(2))
                }
                Err(e) => {
                    print_json(&json!({ "error": e.to_string() }))?;
                    Ok(ExitCode::from(3))
                }
            }
        }
        Command::Titles { search } => {
            let handle = open(&settings);
            let Some(index) = handle.current() else {
                print_json(&json!({ "error": "index not loaded" }))?;
                return Ok(ExitCode::from(3));
            };
            let movies = list_titles(&index, search.as_deref());
            print_json(&json!({ "count": movies.len(), "movies": movies }))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            print_json(&open(&settings).status())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load through the configured sources. Failure leaves the handle not ready.
fn open(settings: &Settings) -> IndexHandle {
    let handle = IndexHandle::new();
    let _ = handle.load_from(&LoaderChain::from_sources(&settings.serve.sources()));
    handle
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), BoxError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
