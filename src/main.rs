//! spotify-etl - Load Spotify artist and album exports into relational tables

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use spotify_etl::config::{ConnectionParams, OutputFormat, PipelineConfig, DEFAULT_DATABASE};
use spotify_etl::loader::DEFAULT_CHUNK_SIZE;
use spotify_etl::sink::{Engine, MemoryEngine, SqliteEngine};
use spotify_etl::{Pipeline, RunSummary};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Terminal,
    Json,
    None,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Terminal => OutputFormat::Terminal,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::None => OutputFormat::None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEngine {
    /// SQLite database file under --host
    Sqlite,
    /// In-process tables, discarded on exit
    Memory,
}

/// Load Spotify artists and albums CSV exports into relational tables
#[derive(Parser, Debug)]
#[command(name = "spotify-etl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Artists CSV file
    #[arg(long, default_value = "artists.csv")]
    artists: PathBuf,

    /// Albums CSV file
    #[arg(long, default_value = "albums.csv")]
    albums: PathBuf,

    /// Database host (for sqlite: directory holding the database file)
    #[arg(long, default_value = ".")]
    host: String,

    /// Database user
    #[arg(long, default_value = "")]
    user: String,

    /// Database password
    #[arg(long, env = "SPOTIFY_DB_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Database name
    #[arg(long, default_value = DEFAULT_DATABASE)]
    database: String,

    /// Storage engine
    #[arg(long, value_enum, default_value = "sqlite")]
    engine: CliEngine,

    /// Drop the artists and albums tables before creating them
    #[arg(long)]
    drop_first: bool,

    /// Rows per append batch
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Preview output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    preview: CliOutputFormat,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "spotify_etl=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(summary) => {
            eprintln!(
                "Loaded {} artists ({} batches) and {} albums ({} batches)",
                summary.artists.rows,
                summary.artists.batches,
                summary.albums.rows,
                summary.albums.batches
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<RunSummary> {
    let cli = Cli::parse();

    if cli.chunk_size == 0 {
        anyhow::bail!("--chunk-size must be at least 1");
    }

    let connection = ConnectionParams::new(cli.host, cli.user, cli.password)
        .with_database(cli.database);
    let config = PipelineConfig::new(cli.artists, cli.albums)
        .with_connection(connection)
        .with_drop_first(cli.drop_first)
        .with_chunk_size(cli.chunk_size)
        .with_preview_format(cli.preview.into());

    let engine: Box<dyn Engine> = match cli.engine {
        CliEngine::Sqlite => Box::new(SqliteEngine::new()),
        CliEngine::Memory => Box::new(MemoryEngine::new()),
    };

    let sources = format!(
        "{} and {}",
        config.artists_file.display(),
        config.albums_file.display()
    );
    let pipeline = Pipeline::new(config, engine.as_ref());
    let mut stdout = std::io::stdout();
    let summary = pipeline
        .run(&mut stdout)
        .with_context(|| format!("Failed to load {}", sources))?;

    Ok(summary)
}
