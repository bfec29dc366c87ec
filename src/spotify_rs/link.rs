use url::Url;

/// Extracts the playlist id from a share link such as
/// `https://open.spotify.com/playlist/<id>?si=...` (optionally with a locale
/// segment like `/intl-de/`) or a `spotify:playlist:<id>` URI.
pub fn playlist_id_from_link(link: &str) -> Option<String> {
    let link = link.trim();

    if let Some(id) = link.strip_prefix("spotify:playlist:") {
        return valid_id(id);
    }

    let url = Url::parse(link).ok()?;
    if !url
        .host_str()
        .is_some_and(|host| host == "open.spotify.com" || host == "play.spotify.com")
    {
        return None;
    }

    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == "playlist")?;
    valid_id(segments.next()?)
}

fn valid_id(id: &str) -> Option<String> {
    Some(id)
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(String::from)
}
