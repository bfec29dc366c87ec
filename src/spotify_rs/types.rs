use serde::Deserialize;

use crate::ports::source::{SourcePlaylist, SourceTrack};

/// Spotify OAuth token response
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Spotify user profile
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotifyExternalUrls {
    pub spotify: Option<String>,
}

/// Spotify playlist from API
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: Option<SpotifyExternalUrls>,
    #[serde(default)]
    pub owner: Option<SpotifyUser>,
    #[serde(default)]
    pub images: Option<Vec<SpotifyImage>>,
    #[serde(default)]
    pub tracks: Option<SpotifyPlaylistTracks>,
}

impl SpotifyPlaylist {
    /// Spotify lists the largest image first.
    pub fn cover(&self) -> Option<String> {
        self.images.as_ref()?.first().map(|i| i.url.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylistTracks {
    pub total: u32,
}

/// Spotify track from API
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    #[serde(default)]
    pub album: Option<SpotifyAlbum>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub restrictions: Option<SpotifyRestrictions>,
}

impl SpotifyTrack {
    /// Local files and tracks restricted in the requested market cannot be
    /// matched on another service.
    pub fn is_transferable(&self) -> bool {
        !self.is_local
            && self
                .restrictions
                .as_ref()
                .is_none_or(|r| r.reason.is_none())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Option<Vec<SpotifyImage>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyRestrictions {
    #[serde(default)]
    pub reason: Option<String>,
}

/// One page of a paged Spotify listing.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistTrackObject {
    pub track: Option<SpotifyTrack>,
}

impl From<SpotifyPlaylist> for SourcePlaylist {
    fn from(playlist: SpotifyPlaylist) -> Self {
        let image = playlist.cover();
        SourcePlaylist {
            id: playlist.id,
            name: playlist.name,
            link: playlist.external_urls.and_then(|urls| urls.spotify),
            total_tracks: playlist.tracks.map_or(0, |t| t.total),
            owner: playlist.owner.and_then(|owner| owner.display_name),
            image,
        }
    }
}

impl From<SpotifyTrack> for SourceTrack {
    fn from(track: SpotifyTrack) -> Self {
        let (album, image) = match track.album {
            Some(album) => {
                // The smallest album image is listed last.
                let image = album.images.and_then(|images| images.last().map(|i| i.url.clone()));
                (Some(album.name), image)
            }
            None => (None, None),
        };
        SourceTrack {
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album,
            image,
            duration_ms: track.duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_playlist_conversion() {
        let playlist: SpotifyPlaylist = serde_json::from_value(json!({
            "id": "37i9dQZF1DX0XUsuxWHRQd",
            "name": "RapCaviar",
            "external_urls": { "spotify": "https://open.spotify.com/playlist/37i9dQZF1DX0XUsuxWHRQd" },
            "owner": { "id": "spotify", "display_name": "Spotify" },
            "images": [{ "url": "https://i.scdn.co/large" }, { "url": "https://i.scdn.co/small" }],
            "tracks": { "href": "ignored", "total": 50 },
            "snapshot_id": "abc"
        }))
        .unwrap();

        let playlist = SourcePlaylist::from(playlist);
        assert_eq!(playlist.name, "RapCaviar");
        assert_eq!(playlist.total_tracks, 50);
        assert_eq!(playlist.owner.as_deref(), Some("Spotify"));
        assert_eq!(playlist.image.as_deref(), Some("https://i.scdn.co/large"));
        assert_eq!(
            playlist.link.as_deref(),
            Some("https://open.spotify.com/playlist/37i9dQZF1DX0XUsuxWHRQd")
        );
    }

    #[test]
    fn test_playlist_without_images() {
        let playlist: SpotifyPlaylist = serde_json::from_value(json!({
            "id": "p",
            "name": "Bare",
            "images": null
        }))
        .unwrap();

        let playlist = SourcePlaylist::from(playlist);
        assert_eq!(playlist.image, None);
        assert_eq!(playlist.total_tracks, 0);
    }

    #[test]
    fn test_track_conversion_uses_smallest_album_image() {
        let track: SpotifyTrack = serde_json::from_value(json!({
            "id": "t1",
            "name": "Song",
            "artists": [{ "name": "First" }, { "name": "Second" }],
            "album": {
                "name": "Album",
                "images": [{ "url": "big" }, { "url": "medium" }, { "url": "small" }]
            },
            "duration_ms": 180000,
            "is_local": false
        }))
        .unwrap();

        assert!(track.is_transferable());
        let track = SourceTrack::from(track);
        assert_eq!(track.artists, vec!["First", "Second"]);
        assert_eq!(track.album.as_deref(), Some("Album"));
        assert_eq!(track.image.as_deref(), Some("small"));
        assert_eq!(track.duration_ms, Some(180000));
    }

    #[test]
    fn test_local_and_restricted_tracks_are_not_transferable() {
        let local: SpotifyTrack = serde_json::from_value(json!({
            "name": "Home recording",
            "is_local": true
        }))
        .unwrap();
        let restricted: SpotifyTrack = serde_json::from_value(json!({
            "name": "Blocked",
            "restrictions": { "reason": "market" }
        }))
        .unwrap();
        let empty_restrictions: SpotifyTrack = serde_json::from_value(json!({
            "name": "Fine",
            "restrictions": {}
        }))
        .unwrap();

        assert!(!local.is_transferable());
        assert!(!restricted.is_transferable());
        assert!(empty_restrictions.is_transferable());
    }
}
