//! # Scrobbler Module
//!
//! Best-effort access to a user's listening statistics on Last.fm.
//!
//! Five categories are fetched (recent tracks, top tracks, top artists,
//! top albums and loved tracks). Each category is optional: a failure,
//! including a privacy setting that hides the data, yields an empty
//! collection and never fails the others. Nothing here is retried.

pub mod lastfm;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub use lastfm::{LastFmHttp, ScrobbleError};

/// Elementos por categoría si no se indica otro valor
pub const DEFAULT_LIMIT: usize = 15;

/// Fuente cruda de la API de scrobbling: un método, un usuario, un JSON.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScrobbleSource: Send + Sync {
    async fn call(&self, method: &str, username: &str, limit: Option<usize>) -> Result<Value, ScrobbleError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopArtist {
    pub name: String,
    pub play_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopAlbum {
    pub name: String,
    pub artist_name: String,
    pub play_count: u64,
}

/// Estadísticas normalizadas de un usuario, serializadas dentro del prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsBundle {
    pub username: String,
    pub recent_tracks: Vec<String>,
    pub top_tracks: Vec<String>,
    pub top_artists: Vec<TopArtist>,
    pub top_albums: Vec<TopAlbum>,
    pub loved_tracks: Vec<String>,
}

/// Cliente de estadísticas que absorbe los fallos por categoría
#[derive(Clone)]
pub struct StatsClient {
    source: Arc<dyn ScrobbleSource>,
    max_limit: usize,
}

impl StatsClient {
    pub fn new(source: Arc<dyn ScrobbleSource>, max_limit: usize) -> Self {
        Self {
            source,
            max_limit: max_limit.max(1),
        }
    }

    fn clamp_limit(&self, limit: usize) -> usize {
        limit.clamp(1, self.max_limit)
    }

    /// Cualquier fallo (red, 404, cuerpo inválido) cuenta como "no existe".
    pub async fn user_exists(&self, username: &str) -> bool {
        match self.source.call("user.getInfo", username, None).await {
            Ok(_) => true,
            Err(e) => {
                debug!("[user_exists] {}: {}", username, e);
                false
            }
        }
    }

    pub async fn get_recent_tracks(&self, username: &str, limit: usize) -> Vec<String> {
        let limit = self.clamp_limit(limit);
        let result = self
            .source
            .call("user.getRecentTracks", username, Some(limit))
            .await
            .and_then(|value| lastfm::parse_recent_tracks(value, limit));

        result.unwrap_or_else(|e| {
            debug!(
                "[get_recent_tracks] {} - the user probably hides the recent tracks [PRIVACY]",
                e
            );
            Vec::new()
        })
    }

    pub async fn get_top_tracks(&self, username: &str, limit: usize) -> Vec<String> {
        let limit = self.clamp_limit(limit);
        let result = self
            .source
            .call("user.getTopTracks", username, Some(limit))
            .await
            .and_then(|value| lastfm::parse_top_tracks(value, limit));

        result.unwrap_or_else(|e| {
            debug!("[get_top_tracks] {}", e);
            Vec::new()
        })
    }

    pub async fn get_top_artists(&self, username: &str, limit: usize) -> Vec<TopArtist> {
        let limit = self.clamp_limit(limit);
        let result = self
            .source
            .call("user.getTopArtists", username, Some(limit))
            .await
            .and_then(|value| lastfm::parse_top_artists(value, limit));

        result.unwrap_or_else(|e| {
            debug!("[get_top_artists] {}", e);
            Vec::new()
        })
    }

    pub async fn get_top_albums(&self, username: &str, limit: usize) -> Vec<TopAlbum> {
        let limit = self.clamp_limit(limit);
        let result = self
            .source
            .call("user.getTopAlbums", username, Some(limit))
            .await
            .and_then(|value| lastfm::parse_top_albums(value, limit));

        result.unwrap_or_else(|e| {
            debug!("[get_top_albums] {}", e);
            Vec::new()
        })
    }

    pub async fn get_loved_tracks(&self, username: &str, limit: usize) -> Vec<String> {
        let limit = self.clamp_limit(limit);
        let result = self
            .source
            .call("user.getLovedTracks", username, Some(limit))
            .await
            .and_then(|value| lastfm::parse_loved_tracks(value, limit));

        result.unwrap_or_else(|e| {
            debug!("[get_loved_tracks] {}", e);
            Vec::new()
        })
    }

    /// Lanza las cinco categorías a la vez y espera a que todas terminen.
    pub async fn collect(&self, username: &str, limit: usize) -> StatsBundle {
        let start_time = Instant::now();

        let (recent_tracks, top_tracks, top_artists, top_albums, loved_tracks) = tokio::join!(
            self.get_recent_tracks(username, limit),
            self.get_top_tracks(username, limit),
            self.get_top_artists(username, limit),
            self.get_top_albums(username, limit),
            self.get_loved_tracks(username, limit),
        );

        info!("📊 Estadísticas de Last.fm obtenidas en {:?}", start_time.elapsed());

        StatsBundle {
            username: username.to_string(),
            recent_tracks,
            top_tracks,
            top_artists,
            top_albums,
            loved_tracks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    fn privacy_error() -> ScrobbleError {
        ScrobbleError::Api {
            code: 17,
            message: "Login: User required to be logged in".to_string(),
        }
    }

    fn top_artists_body() -> Value {
        json!({
            "topartists": {
                "artist": [
                    {"name": "Radiohead", "playcount": "512"},
                    {"name": "Björk", "playcount": "256"},
                    {"name": "Portishead", "playcount": "128"}
                ]
            }
        })
    }

    #[tokio::test]
    async fn test_user_exists_true_on_success() {
        let mut source = MockScrobbleSource::new();
        source
            .expect_call()
            .with(eq("user.getInfo"), eq("alice"), eq(None::<usize>))
            .times(1)
            .returning(|_, _, _| Ok(json!({"user": {"name": "alice"}})));

        let client = StatsClient::new(Arc::new(source), 50);
        assert!(client.user_exists("alice").await);
    }

    #[tokio::test]
    async fn test_user_exists_false_on_any_error() {
        let mut source = MockScrobbleSource::new();
        source.expect_call().times(1).returning(|_, _, _| {
            Err(ScrobbleError::Api {
                code: 6,
                message: "User not found".to_string(),
            })
        });

        let client = StatsClient::new(Arc::new(source), 50);
        assert!(!client.user_exists("ghost").await);
    }

    #[tokio::test]
    async fn test_get_top_artists_respects_limit() {
        let mut source = MockScrobbleSource::new();
        source
            .expect_call()
            .with(eq("user.getTopArtists"), eq("alice"), eq(Some(2usize)))
            .times(1)
            .returning(|_, _, _| Ok(top_artists_body()));

        let client = StatsClient::new(Arc::new(source), 50);
        let artists = client.get_top_artists("alice", 2).await;

        assert_eq!(
            artists,
            vec![
                TopArtist { name: "Radiohead".to_string(), play_count: 512 },
                TopArtist { name: "Björk".to_string(), play_count: 256 },
            ]
        );
    }

    #[tokio::test]
    async fn test_limit_is_clamped_to_upper_bound() {
        let mut source = MockScrobbleSource::new();
        source
            .expect_call()
            .with(eq("user.getTopTracks"), eq("alice"), eq(Some(20usize)))
            .times(1)
            .returning(|_, _, _| Ok(json!({"toptracks": {"track": []}})));

        let client = StatsClient::new(Arc::new(source), 20);
        assert!(client.get_top_tracks("alice", 500).await.is_empty());
    }

    #[tokio::test]
    async fn test_private_recent_tracks_fall_back_to_empty() {
        let mut source = MockScrobbleSource::new();
        source.expect_call().times(1).returning(|_, _, _| Err(privacy_error()));

        let client = StatsClient::new(Arc::new(source), 50);
        assert!(client.get_recent_tracks("alice", 15).await.is_empty());
    }

    #[tokio::test]
    async fn test_collect_tolerates_failing_category() {
        let mut source = MockScrobbleSource::new();
        source
            .expect_call()
            .returning(|method, _, _| match method {
                "user.getRecentTracks" => Err(privacy_error()),
                "user.getTopTracks" => Ok(json!({
                    "toptracks": {"track": [{"name": "Creep", "artist": {"name": "Radiohead"}}]}
                })),
                "user.getTopArtists" => Ok(top_artists_body()),
                "user.getTopAlbums" => Ok(json!({
                    "topalbums": {"album": [
                        {"name": "Dummy", "artist": {"name": "Portishead"}, "playcount": "99"}
                    ]}
                })),
                "user.getLovedTracks" => Ok(json!({"unexpected": true})),
                other => panic!("unexpected method {}", other),
            });

        let client = StatsClient::new(Arc::new(source), 50);
        let bundle = client.collect("alice", 15).await;

        assert_eq!(bundle.username, "alice");
        assert!(bundle.recent_tracks.is_empty());
        assert_eq!(bundle.top_tracks, vec!["Radiohead - Creep"]);
        assert_eq!(bundle.top_artists.len(), 3);
        assert_eq!(
            bundle.top_albums,
            vec![TopAlbum {
                name: "Dummy".to_string(),
                artist_name: "Portishead".to_string(),
                play_count: 99,
            }]
        );
        assert!(bundle.loved_tracks.is_empty());
    }

    /// Fuente que tarda `delay` por llamada; `stalled` tarda `stall` y falla
    struct DelayedSource {
        delay: Duration,
        stalled: Option<(&'static str, Duration)>,
    }

    #[async_trait]
    impl ScrobbleSource for DelayedSource {
        async fn call(&self, method: &str, _username: &str, _limit: Option<usize>) -> Result<Value, ScrobbleError> {
            if let Some((stalled, stall)) = self.stalled {
                if method == stalled {
                    tokio::time::sleep(stall).await;
                    return Err(privacy_error());
                }
            }

            tokio::time::sleep(self.delay).await;
            Ok(match method {
                "user.getRecentTracks" => json!({
                    "recenttracks": {"track": [{"name": "Teardrop", "artist": {"#text": "Massive Attack"}}]}
                }),
                "user.getTopTracks" => json!({
                    "toptracks": {"track": [{"name": "Creep", "artist": {"name": "Radiohead"}}]}
                }),
                "user.getTopArtists" => top_artists_body(),
                "user.getTopAlbums" => json!({
                    "topalbums": {"album": [
                        {"name": "Dummy", "artist": {"name": "Portishead"}, "playcount": "99"}
                    ]}
                }),
                "user.getLovedTracks" => json!({
                    "lovedtracks": {"track": [{"name": "Roads", "artist": {"name": "Portishead"}}]}
                }),
                other => panic!("unexpected method {}", other),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_fetches_categories_concurrently() {
        let delay = Duration::from_millis(100);
        let client = StatsClient::new(Arc::new(DelayedSource { delay, stalled: None }), 50);

        let start = tokio::time::Instant::now();
        let bundle = client.collect("alice", 15).await;
        let elapsed = start.elapsed();

        // Una sola espera, no cinco seguidas
        assert!(elapsed >= delay);
        assert!(elapsed < delay * 2, "collect took {:?}", elapsed);

        assert_eq!(bundle.recent_tracks, vec!["Massive Attack - Teardrop"]);
        assert_eq!(bundle.top_tracks, vec!["Radiohead - Creep"]);
        assert_eq!(bundle.top_artists.len(), 3);
        assert_eq!(bundle.top_albums.len(), 1);
        assert_eq!(bundle.loved_tracks, vec!["Portishead - Roads"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_category_does_not_hold_back_the_others() {
        let delay = Duration::from_millis(100);
        let stall = Duration::from_secs(30);
        let source = DelayedSource {
            delay,
            stalled: Some(("user.getTopAlbums", stall)),
        };
        let client = StatsClient::new(Arc::new(source), 50);

        let start = tokio::time::Instant::now();
        let bundle = client.collect("alice", 15).await;
        let elapsed = start.elapsed();

        assert!(elapsed >= stall);
        assert!(elapsed < stall + delay, "collect took {:?}", elapsed);

        assert!(bundle.top_albums.is_empty());
        assert_eq!(bundle.recent_tracks, vec!["Massive Attack - Teardrop"]);
        assert_eq!(bundle.top_tracks, vec!["Radiohead - Creep"]);
        assert_eq!(bundle.top_artists.len(), 3);
        assert_eq!(bundle.loved_tracks, vec!["Portishead - Roads"]);
    }

    #[test]
    fn test_bundle_serializes_with_snake_case_keys() {
        let bundle = StatsBundle {
            username: "alice".to_string(),
            top_artists: vec![TopArtist { name: "Radiohead".to_string(), play_count: 1 }],
            ..Default::default()
        };
        let value = serde_json::to_value(&bundle).unwrap();

        assert_eq!(
            value,
            json!({
                "username": "alice",
                "recent_tracks": [],
                "top_tracks": [],
                "top_artists": [{"name": "Radiohead", "play_count": 1}],
                "top_albums": [],
                "loved_tracks": []
            })
        );
    }
}
