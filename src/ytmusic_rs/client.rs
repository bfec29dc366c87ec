use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::{OptionExt, Result, WrapErr};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::ports::target::{
    NewPlaylist, SongHit, TargetCatalog, TargetCredential, TargetPlaylist, TargetSessionFactory,
};
use crate::ytmusic_rs::headers::{parse_raw_headers, sapisid_from_cookie, sapisid_hash};
use crate::ytmusic_rs::parse;

const API_BASE: &str = "https://music.youtube.com/youtubei/v1";
const ORIGIN: &str = "https://music.youtube.com";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
/// Search filter restricting results to songs.
const SONGS_FILTER: &str = "EgWKAQIIAWoMEA4QChADEAQQCRAF";
/// Guards against a continuation loop on a misbehaving response.
const MAX_PAGES: usize = 200;

/// YouTube Music web client session, authenticated by the headers it was
/// opened with.
///
/// Cookie sessions get a fresh `SAPISIDHASH` authorization on every request;
/// one copied from the browser expires with its timestamp.
pub struct YtMusicClient {
    http: reqwest::Client,
    headers: HeaderMap,
    sapisid: Option<String>,
}

impl YtMusicClient {
    pub fn new(http: reqwest::Client, mut headers: HeaderMap) -> Self {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ORIGIN, HeaderValue::from_static(ORIGIN));
        headers.insert("x-origin", HeaderValue::from_static(ORIGIN));
        headers
            .entry(header::USER_AGENT)
            .or_insert(HeaderValue::from_static(USER_AGENT));
        let sapisid = headers
            .get(header::COOKIE)
            .and_then(|cookie| cookie.to_str().ok())
            .and_then(sapisid_from_cookie)
            .map(String::from);
        Self {
            http,
            headers,
            sapisid,
        }
    }

    fn request_headers(&self, timestamp: i64) -> Result<HeaderMap> {
        let mut headers = self.headers.clone();
        if let Some(sapisid) = &self.sapisid {
            let authorization = HeaderValue::from_str(&sapisid_hash(timestamp, sapisid, ORIGIN))
                .wrap_err("Invalid SAPISID in session cookie")?;
            headers.insert(header::AUTHORIZATION, authorization);
        }
        Ok(headers)
    }

    async fn post(&self, endpoint: &str, mut body: Value, continuation: Option<&str>) -> Result<Value> {
        body["context"] = json!({
            "client": {
                "clientName": "WEB_REMIX",
                "clientVersion": chrono::Utc::now().format("1.%Y%m%d.01.00").to_string(),
                "hl": "en",
            },
            "user": {},
        });

        let mut request = self
            .http
            .post(format!("{API_BASE}/{endpoint}"))
            .query(&[("alt", "json"), ("prettyPrint", "false")])
            .headers(self.request_headers(chrono::Utc::now().timestamp())?)
            .json(&body)
            .timeout(Duration::from_secs(10));
        if let Some(token) = continuation {
            request = request.query(&[("ctoken", token), ("continuation", token), ("type", "next")]);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Runs a browse request and every continuation after it.
    async fn browse_all(&self, browse_id: &str) -> Result<Vec<Value>> {
        let body = json!({ "browseId": browse_id });
        let mut pages = vec![self.post("browse", body.clone(), None).await?];

        while pages.len() < MAX_PAGES {
            let Some(token) = pages.last().and_then(parse::next_continuation) else {
                break;
            };
            pages.push(self.post("browse", body.clone(), Some(&token)).await?);
        }

        Ok(pages)
    }
}

#[async_trait::async_trait]
impl TargetCatalog for YtMusicClient {
    async fn list_library_playlists(&self) -> Result<Vec<TargetPlaylist>> {
        let pages = self
            .browse_all("FEmusic_liked_playlists")
            .await
            .wrap_err("Failed to list library playlists")?;
        Ok(pages.iter().flat_map(parse::library_playlists).collect())
    }

    async fn search_songs(&self, query: &str) -> Result<Vec<SongHit>> {
        let response = self
            .post("search", json!({ "query": query, "params": SONGS_FILTER }), None)
            .await
            .wrap_err_with(|| format!("Failed to search for `{query}`"))?;
        Ok(parse::search_hits(&response))
    }

    async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<String>> {
        let browse_id = format!("VL{}", parse::strip_browse_prefix(playlist_id));
        let pages = self
            .browse_all(&browse_id)
            .await
            .wrap_err_with(|| format!("Failed to get tracks of playlist {playlist_id}"))?;
        Ok(pages.iter().flat_map(parse::playlist_video_ids).collect())
    }

    async fn create_playlist(&self, playlist: &NewPlaylist) -> Result<String> {
        let body = json!({
            "title": playlist.name,
            "description": playlist.description,
            "privacyStatus": playlist.visibility.as_str(),
            "videoIds": playlist.track_ids,
        });
        let response = self
            .post("playlist/create", body, None)
            .await
            .wrap_err_with(|| format!("Failed to create playlist `{}`", playlist.name))?;

        response
            .get("playlistId")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_eyre("Playlist creation response has no playlist id")
    }

    async fn delete_playlist(&self, playlist_id: &str) -> Result<()> {
        let body = json!({ "playlistId": parse::strip_browse_prefix(playlist_id) });
        self.post("playlist/delete", body, None)
            .await
            .wrap_err_with(|| format!("Failed to delete playlist {playlist_id}"))?;
        Ok(())
    }
}

/// Opens [`YtMusicClient`] sessions over a shared connection pool.
#[derive(Clone, Default)]
pub struct YtMusicSessions {
    http: reqwest::Client,
}

impl YtMusicSessions {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl TargetSessionFactory for YtMusicSessions {
    async fn open(&self, credential: &TargetCredential) -> Result<Arc<dyn TargetCatalog>> {
        let headers = match credential {
            TargetCredential::Headers(raw) => {
                parse_raw_headers(raw).wrap_err("Invalid target catalog headers")?
            }
            TargetCredential::OAuth { access_token, .. } => {
                let mut headers = HeaderMap::new();
                headers.insert(
                    header::AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {access_token}"))
                        .wrap_err("Invalid target catalog access token")?,
                );
                headers
            }
        };
        Ok(Arc::new(YtMusicClient::new(self.http.clone(), headers)))
    }
}
