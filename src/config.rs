//! Configuration handling for spotify-etl

use std::path::PathBuf;

use crate::loader::DEFAULT_CHUNK_SIZE;

/// Default database name for [`ConnectionParams`]
pub const DEFAULT_DATABASE: &str = "spotify";

/// Output format for dataset previews
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
    /// Skip previews entirely
    None,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(OutputFormat::Terminal),
            "json" => Ok(OutputFormat::Json),
            "none" => Ok(OutputFormat::None),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Parameters for connecting to the relational sink
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionParams {
    /// Connection parameters for the default `spotify` database
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Connection URL for the given scheme with the password redacted
    pub fn redacted_url(&self, scheme: &str) -> String {
        if self.user.is_empty() {
            format!("{}://{}/{}", scheme, self.host, self.database)
        } else {
            format!("{}://{}:***@{}/{}", scheme, self.user, self.host, self.database)
        }
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self::new("localhost", "", "")
    }
}

// Keeps the password out of logs and panic messages
impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Path to the artists CSV
    pub artists_file: PathBuf,
    /// Path to the albums CSV
    pub albums_file: PathBuf,
    /// Sink connection parameters
    pub connection: ConnectionParams,
    /// Drop both tables before creating them
    pub drop_first: bool,
    /// Rows per append batch
    pub chunk_size: usize,
    /// How previews are printed
    pub preview_format: OutputFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artists_file: PathBuf::from("artists.csv"),
            albums_file: PathBuf::from("albums.csv"),
            connection: ConnectionParams::default(),
            drop_first: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            preview_format: OutputFormat::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new PipelineConfig with source paths
    pub fn new(artists_file: PathBuf, albums_file: PathBuf) -> Self {
        Self {
            artists_file,
            albums_file,
            ..Default::default()
        }
    }

    /// Set sink connection parameters
    pub fn with_connection(mut self, connection: ConnectionParams) -> Self {
        self.connection = connection;
        self
    }

    /// Drop existing tables before creating them
    pub fn with_drop_first(mut self, drop_first: bool) -> Self {
        self.drop_first = drop_first;
        self
    }

    /// Set rows per append batch
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set preview output format
    pub fn with_preview_format(mut self, format: OutputFormat) -> Self {
        self.preview_format = format;
        self
    }
}
