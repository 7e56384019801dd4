use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::{ScrobbleSource, TopAlbum, TopArtist};

pub const DEFAULT_BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";

#[derive(Debug, Error)]
pub enum ScrobbleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("Last.fm API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("Deserialization error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Cliente HTTP para la API de Last.fm
pub struct LastFmHttp {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl LastFmHttp {
    pub fn new(client: reqwest::Client, base_url: Url, api_key: String) -> Self {
        debug!(base_url = %base_url, "Cliente Last.fm inicializado");
        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// Parámetros comunes: método, usuario, credencial y formato fijo
    fn build_query(&self, method: &str, username: &str, limit: Option<usize>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("method", method.to_string()),
            ("user", username.to_string()),
        ];
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        params.push(("api_key", self.api_key.clone()));
        params.push(("format", "json".to_string()));
        params
    }
}

#[async_trait]
impl ScrobbleSource for LastFmHttp {
    async fn call(&self, method: &str, username: &str, limit: Option<usize>) -> Result<Value, ScrobbleError> {
        let response = self
            .client
            .get(self.base_url.clone())
            .query(&self.build_query(method, username, limit))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_lastfm_body(status, &body)
    }
}

/// Last.fm también responde `{"error": N, "message": ...}` con estado 2xx
fn parse_lastfm_body(status: StatusCode, body: &str) -> Result<Value, ScrobbleError> {
    if !status.is_success() {
        return Err(ScrobbleError::HttpStatus {
            status,
            body: body.to_string(),
        });
    }

    let value: Value = serde_json::from_str(body)?;
    if let Some(code) = value.get("error").and_then(Value::as_i64) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown Last.fm error")
            .to_string();
        return Err(ScrobbleError::Api { code, message });
    }

    Ok(value)
}

// Formas de respuesta por método

/// Un contenedor con una sola entrada llega como objeto, no como lista
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct TrackList<T> {
    track: OneOrMany<T>,
}

#[derive(Debug, Deserialize)]
struct RecentTracksResponse {
    recenttracks: TrackList<RecentTrack>,
}

#[derive(Debug, Deserialize)]
struct RecentTrack {
    name: String,
    artist: TextArtist,
}

#[derive(Debug, Deserialize)]
struct TextArtist {
    #[serde(rename = "#text")]
    text: String,
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    toptracks: TrackList<NamedTrack>,
}

#[derive(Debug, Deserialize)]
struct LovedTracksResponse {
    lovedtracks: TrackList<NamedTrack>,
}

#[derive(Debug, Deserialize)]
struct NamedTrack {
    name: String,
    artist: NamedArtist,
}

#[derive(Debug, Deserialize)]
struct NamedArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TopArtistsResponse {
    topartists: ArtistList,
}

#[derive(Debug, Deserialize)]
struct ArtistList {
    artist: OneOrMany<ArtistEntry>,
}

#[derive(Debug, Deserialize)]
struct ArtistEntry {
    name: String,
    #[serde(default, deserialize_with = "play_count")]
    playcount: u64,
}

#[derive(Debug, Deserialize)]
struct TopAlbumsResponse {
    topalbums: AlbumList,
}

#[derive(Debug, Deserialize)]
struct AlbumList {
    album: OneOrMany<AlbumEntry>,
}

#[derive(Debug, Deserialize)]
struct AlbumEntry {
    name: String,
    artist: NamedArtist,
    #[serde(default, deserialize_with = "play_count")]
    playcount: u64,
}

/// Last.fm envía los contadores como texto ("123"); se aceptan ambos formatos
fn play_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(count) => count,
        Raw::Text(text) => text.trim().parse().unwrap_or(0),
    })
}

pub(super) fn parse_recent_tracks(value: Value, limit: usize) -> Result<Vec<String>, ScrobbleError> {
    let response: RecentTracksResponse = serde_json::from_value(value)?;
    Ok(response
        .recenttracks
        .track
        .into_vec()
        .into_iter()
        .take(limit)
        .map(|track| format!("{} - {}", track.artist.text, track.name))
        .collect())
}

pub(super) fn parse_top_tracks(value: Value, limit: usize) -> Result<Vec<String>, ScrobbleError> {
    let response: TopTracksResponse = serde_json::from_value(value)?;
    Ok(display_named_tracks(response.toptracks, limit))
}

pub(super) fn parse_loved_tracks(value: Value, limit: usize) -> Result<Vec<String>, ScrobbleError> {
    let response: LovedTracksResponse = serde_json::from_value(value)?;
    Ok(display_named_tracks(response.lovedtracks, limit))
}

fn display_named_tracks(list: TrackList<NamedTrack>, limit: usize) -> Vec<String> {
    list.track
        .into_vec()
        .into_iter()
        .take(limit)
        .map(|track| format!("{} - {}", track.artist.name, track.name))
        .collect()
}

pub(super) fn parse_top_artists(value: Value, limit: usize) -> Result<Vec<TopArtist>, ScrobbleError> {
    let response: TopArtistsResponse = serde_json::from_value(value)?;
    Ok(response
        .topartists
        .artist
        .into_vec()
        .into_iter()
        .take(limit)
        .map(|artist| TopArtist {
            name: artist.name,
            play_count: artist.playcount,
        })
        .collect())
}

pub(super) fn parse_top_albums(value: Value, limit: usize) -> Result<Vec<TopAlbum>, ScrobbleError> {
    let response: TopAlbumsResponse = serde_json::from_value(value)?;
    Ok(response
        .topalbums
        .album
        .into_vec()
        .into_iter()
        .take(limit)
        .map(|album| TopAlbum {
            name: album.name,
            artist_name: album.artist.name,
            play_count: album.playcount,
        })
        .collect())
}
