use std::time::Instant;

use color_eyre::eyre::{OptionExt, Result};
use serde::Serialize;

use crate::error::MigrationError;
use crate::ports::source::SourceTrack;
use crate::ports::target::TargetCatalog;

/// Tracks that could not be found on the target catalog, by search query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MissedTracks {
    pub count: usize,
    pub tracks: Vec<String>,
}

impl MissedTracks {
    fn push(&mut self, query: String) {
        self.count += 1;
        self.tracks.push(query);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Target identifiers, in source order, one per track that was found.
    pub track_ids: Vec<String>,
    pub missed: MissedTracks,
}

/// `"<name> <primary artist>"`, or just the name when no artist is known.
pub fn search_query(track: &SourceTrack) -> String {
    match track.artists.first() {
        Some(artist) => format!("{} {}", track.name, artist),
        None => track.name.clone(),
    }
}

/// Resolves every track to the first matching song on the target catalog.
///
/// A failed lookup only adds the track to the miss list; it never stops the
/// remaining lookups. Fails with [`MigrationError::NoMatches`] when nothing at
/// all could be resolved.
pub async fn resolve_tracks(
    target: &dyn TargetCatalog,
    tracks: &[SourceTrack],
) -> Result<Resolution, MigrationError> {
    let started = Instant::now();
    let mut track_ids = Vec::with_capacity(tracks.len());
    let mut missed = MissedTracks::default();

    for (index, track) in tracks.iter().enumerate() {
        let query = search_query(track);
        tracing::debug!("Searching for song {}/{}: {}", index + 1, tracks.len(), query);

        match first_song_id(target, &query).await {
            Ok(id) => track_ids.push(id),
            Err(e) => {
                tracing::debug!("{query} not found on target catalog: {e:#}");
                missed.push(query);
            }
        }
    }

    tracing::info!(
        "Found {}/{} songs in {:.2?}, {} not found",
        track_ids.len(),
        tracks.len(),
        started.elapsed(),
        missed.count
    );

    if track_ids.is_empty() {
        return Err(MigrationError::NoMatches {
            attempted: tracks.len(),
        });
    }

    Ok(Resolution { track_ids, missed })
}

async fn first_song_id(target: &dyn TargetCatalog, query: &str) -> Result<String> {
    let hit = target
        .search_songs(query)
        .await?
        .into_iter()
        .next()
        .ok_or_eyre("No search results")?;
    if let Some(title) = &hit.title {
        tracing::trace!("{query} matched {title}");
    }
    hit.video_id.ok_or_eyre("First result has no identifier")
}
