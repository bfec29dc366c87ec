//! Extraction of the few fields we need from YouTube Music's renderer JSON.
//!
//! The response layout shifts between initial pages and continuations, so
//! instead of fixed paths we search for the renderer objects by key.

use serde_json::Value;

use crate::ports::target::{SongHit, TargetPlaylist};

/// Every value stored under `key`, in document order. Matched values are not
/// searched further.
pub fn find_all<'a>(root: &'a Value, key: &str) -> Vec<&'a Value> {
    let mut found = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        match node {
            Value::Object(map) => {
                if let Some(value) = map.get(key) {
                    found.push(value);
                }
                stack.extend(
                    map.iter()
                        .filter(|(k, _)| k.as_str() != key)
                        .map(|(_, v)| v)
                        .rev(),
                );
            }
            Value::Array(items) => stack.extend(items.iter().rev()),
            _ => {}
        }
    }

    found
}

/// Token for the next page, if the response has one.
pub fn next_continuation(response: &Value) -> Option<String> {
    find_all(response, "nextContinuationData")
        .into_iter()
        .chain(find_all(response, "continuationCommand"))
        .find_map(|data| data.get("continuation").or_else(|| data.get("token")))
        .and_then(Value::as_str)
        .map(String::from)
}

fn first_run_text(value: &Value) -> Option<String> {
    value
        .pointer("/runs/0/text")
        .and_then(Value::as_str)
        .map(String::from)
}

pub fn search_hits(response: &Value) -> Vec<SongHit> {
    find_all(response, "musicResponsiveListItemRenderer")
        .into_iter()
        .map(|item| {
            let video_id = item
                .pointer("/playlistItemData/videoId")
                .or_else(|| {
                    item.pointer(
                        "/overlay/musicItemThumbnailOverlayRenderer/content/musicPlayButtonRenderer/playNavigationEndpoint/watchEndpoint/videoId",
                    )
                })
                .and_then(Value::as_str)
                .map(String::from);
            let title = item
                .pointer("/flexColumns/0/musicResponsiveListItemFlexColumnRenderer/text")
                .and_then(first_run_text);
            SongHit { video_id, title }
        })
        .collect()
}

/// Playlists on a library page. Grid entries without a browse target (the
/// "New playlist" tile) are skipped.
pub fn library_playlists(response: &Value) -> Vec<TargetPlaylist> {
    find_all(response, "musicTwoRowItemRenderer")
        .into_iter()
        .filter_map(|item| {
            let browse_id = item
                .pointer("/navigationEndpoint/browseEndpoint/browseId")
                .and_then(Value::as_str)?;
            let title = item.get("title").and_then(first_run_text)?;
            let thumbnails = item
                .pointer("/thumbnailRenderer/musicThumbnailRenderer/thumbnail/thumbnails")
                .and_then(Value::as_array)
                .map(|thumbs| {
                    thumbs
                        .iter()
                        .filter_map(|t| t.get("url").and_then(Value::as_str))
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();

            Some(TargetPlaylist {
                id: strip_browse_prefix(browse_id).to_string(),
                title,
                count: item.get("subtitle").and_then(song_count),
                thumbnails,
            })
        })
        .collect()
}

/// Video ids of a playlist page, in playlist order.
pub fn playlist_video_ids(response: &Value) -> Vec<String> {
    find_all(response, "playlistItemData")
        .into_iter()
        .filter_map(|data| data.get("videoId").and_then(Value::as_str))
        .map(String::from)
        .collect()
}

/// Library browse ids are the playlist id prefixed with `VL`.
pub fn strip_browse_prefix(id: &str) -> &str {
    id.strip_prefix("VL").unwrap_or(id)
}

/// Parses the "N songs" run of a playlist subtitle.
fn song_count(subtitle: &Value) -> Option<u32> {
    subtitle
        .get("runs")?
        .as_array()?
        .iter()
        .filter_map(|run| run.get("text").and_then(Value::as_str))
        .find(|text| text.contains("song") || text.contains("track"))
        .and_then(|text| {
            let digits: String = text.chars().filter(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
}
