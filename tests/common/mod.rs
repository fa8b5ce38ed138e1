#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const ARTISTS_HEADER: &str =
    "id,artist_popularity,followers,genres,name,track_id,track_name_prev,type";

pub const ALBUMS_HEADER: &str = ",album_type,artist_id,available_markets,external_urls,href,id,images,name,release_date,release_date_precision,total_tracks,track_id,track_name_prev,uri,type";

pub fn artist_line(id: &str, name: &str) -> String {
    format!(
        "{id},44,23230,\"['sertanejo', 'pop']\",{name},t{id},track_1,artist",
        id = id,
        name = name
    )
}

pub fn album_line(row: usize, artist_id: &str, id: &str, release_date: &str, precision: &str) -> String {
    format!(
        "{row},album,{artist_id},\"['AD', 'AE']\",{{'spotify': 'https://open.spotify.com/album/{id}'}},https://api.spotify.com/v1/albums/{id},{id},[],Album {id},{release_date},{precision},12,t{row},track_{row},spotify:album:{id},album",
        row = row,
        artist_id = artist_id,
        id = id,
        release_date = release_date,
        precision = precision
    )
}

pub fn write_file(dir: &Path, name: &str, header: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut body = String::from(header);
    body.push('\n');
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }
    fs::write(&path, body).unwrap();
    path
}

/// artists.csv with ids 1/B and 2/A, albums.csv with two albums of artist a1
pub fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
    let artists = write_file(
        dir,
        "artists.csv",
        ARTISTS_HEADER,
        &[artist_line("1", "B"), artist_line("2", "A")],
    );
    let albums = write_file(
        dir,
        "albums.csv",
        ALBUMS_HEADER,
        &[
            album_line(0, "a1", "al1", "2020-01-01", "day"),
            album_line(1, "a1", "al2", "1998", "year"),
        ],
    );
    (artists, albums)
}
