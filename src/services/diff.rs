use std::collections::HashSet;

/// Whether an existing target playlist needs replacing.
///
/// Both sides are compared as sets of track identifiers: order and
/// duplicates are ignored, so a reordered copy of the same tracks is not a
/// change.
pub fn playlists_differ<A, B>(existing_ids: &[A], new_ids: &[B]) -> bool
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let existing: HashSet<&str> = existing_ids.iter().map(AsRef::as_ref).collect();
    let new: HashSet<&str> = new_ids.iter().map(AsRef::as_ref).collect();

    if existing.len() != new.len() {
        tracing::debug!(
            "Playlist size changed: {} -> {}",
            existing.len(),
            new.len()
        );
        return true;
    }

    if existing != new {
        let added = new.difference(&existing).count();
        let removed = existing.difference(&new).count();
        tracing::debug!("Playlist content changed: {added} added, {removed} removed");
        return true;
    }

    false
}
