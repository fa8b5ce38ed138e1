//! End-to-end run: load both datasets, index, sort, and write them

use std::io::Write;

use thiserror::Error;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{EtlError, Result};
use crate::loader::{Loader, WriteSummary};
use crate::output::formatter_for;
use crate::registry::{albums_schema, artists_schema, create_schema};
use crate::sink::Engine;

/// Index column derived for artists
pub const ARTISTS_INDEX: &str = "artist_key";
/// Index column derived for albums
pub const ALBUMS_INDEX: &str = "album_key";
pub const ARTISTS_INDEX_COLUMNS: [&str; 1] = ["id"];
pub const ALBUMS_INDEX_COLUMNS: [&str; 3] = ["artist_id", "id", "release_date"];
pub const ARTISTS_SORT_COLUMN: &str = "name";

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadArtists,
    LoadAlbums,
    Preview,
    IndexArtists,
    IndexAlbums,
    SortArtists,
    Connect,
    CreateSchema,
    WriteArtists,
    WriteAlbums,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::LoadArtists => write!(f, "load(artists)"),
            Stage::LoadAlbums => write!(f, "load(albums)"),
            Stage::Preview => write!(f, "preview"),
            Stage::IndexArtists => write!(f, "index(artists)"),
            Stage::IndexAlbums => write!(f, "index(albums)"),
            Stage::SortArtists => write!(f, "sort(artists)"),
            Stage::Connect => write!(f, "connect"),
            Stage::CreateSchema => write!(f, "create_schema"),
            Stage::WriteArtists => write!(f, "write(artists)"),
            Stage::WriteAlbums => write!(f, "write(albums)"),
        }
    }
}

/// The first failure of a run, tagged with the stage it happened in
#[derive(Debug, Error)]
#[error("{stage} failed")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: EtlError,
}

trait StageExt<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, PipelineError>;
}

impl<T> StageExt<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, PipelineError> {
        self.map_err(|source| PipelineError { stage, source })
    }
}

/// Rows and batches written per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub artists: WriteSummary,
    pub albums: WriteSummary,
}

/// Sequences one run against an engine
pub struct Pipeline<'a> {
    config: PipelineConfig,
    engine: &'a dyn Engine,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: PipelineConfig, engine: &'a dyn Engine) -> Self {
        Self { config, engine }
    }

    /// Run every stage in order, stopping at the first failure. Previews
    /// go to `preview_out`. Rows already appended are left in place on
    /// failure.
    pub fn run(&self, preview_out: &mut dyn Write) -> std::result::Result<RunSummary, PipelineError> {
        let config = &self.config;

        info!(stage = %Stage::LoadArtists, path = %config.artists_file.display());
        let mut artists = Loader::load(&config.artists_file).at(Stage::LoadArtists)?;
        info!(stage = %Stage::LoadAlbums, path = %config.albums_file.display());
        let mut albums = Loader::load(&config.albums_file).at(Stage::LoadAlbums)?;

        self.preview(&artists, &albums, preview_out)
            .at(Stage::Preview)?;

        info!(stage = %Stage::IndexArtists, index = ARTISTS_INDEX);
        artists
            .add_index(ARTISTS_INDEX, &owned_names(&ARTISTS_INDEX_COLUMNS))
            .at(Stage::IndexArtists)?;
        info!(stage = %Stage::IndexAlbums, index = ALBUMS_INDEX);
        albums
            .add_index(ALBUMS_INDEX, &owned_names(&ALBUMS_INDEX_COLUMNS))
            .at(Stage::IndexAlbums)?;

        info!(stage = %Stage::SortArtists, column = ARTISTS_SORT_COLUMN);
        artists.sort(ARTISTS_SORT_COLUMN).at(Stage::SortArtists)?;

        info!(stage = %Stage::Connect, engine = self.engine.name());
        // Held through both writes; dropped on every return path
        let mut conn = self.engine.connect(&config.connection).at(Stage::Connect)?;

        info!(stage = %Stage::CreateSchema, drop_first = config.drop_first);
        create_schema(conn.as_mut(), config.drop_first).at(Stage::CreateSchema)?;

        info!(stage = %Stage::WriteArtists, chunk_size = config.chunk_size);
        let artists_written = artists
            .write_to(conn.as_mut(), &artists_schema(), config.chunk_size)
            .at(Stage::WriteArtists)?;
        info!(stage = %Stage::WriteAlbums, chunk_size = config.chunk_size);
        let albums_written = albums
            .write_to(conn.as_mut(), &albums_schema(), config.chunk_size)
            .at(Stage::WriteAlbums)?;

        Ok(RunSummary {
            artists: artists_written,
            albums: albums_written,
        })
    }

    fn preview(&self, artists: &Loader, albums: &Loader, out: &mut dyn Write) -> Result<()> {
        let Some(formatter) = formatter_for(self.config.preview_format) else {
            return Ok(());
        };
        info!(stage = %Stage::Preview);
        for (title, loader) in [("artists", artists), ("albums", albums)] {
            formatter
                .render(title, &loader.preview(), out)
                .map_err(|e| EtlError::Preview(format!("{:#}", e)))?;
        }
        Ok(())
    }
}

fn owned_names(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}
