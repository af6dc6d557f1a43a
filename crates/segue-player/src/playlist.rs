//! Ordered source list with current-position tracking.

use std::collections::HashSet;

use segue_core::{AudioSource, Error, Result};

/// The playlist owned by the playback controller.
///
/// Insertion order defines next/previous. Ids are unique at all times.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    /// All sources in playback order.
    items: Vec<AudioSource>,
    /// Position of the current (bound or last bound) source.
    current_index: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all sources in order.
    pub fn items(&self) -> &[AudioSource] {
        &self.items
    }

    /// Get the current source.
    pub fn current(&self) -> Option<&AudioSource> {
        self.current_index.and_then(|i| self.items.get(i))
    }

    /// Get the current index.
    pub const fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Position of the source with the given id.
    pub fn position(&self, audio_id: &str) -> Option<usize> {
        self.items.iter().position(|s| s.audio_id == audio_id)
    }

    pub fn get(&self, audio_id: &str) -> Option<&AudioSource> {
        self.items.iter().find(|s| s.audio_id == audio_id)
    }

    pub fn contains(&self, audio_id: &str) -> bool {
        self.position(audio_id).is_some()
    }

    /// Append a source. Fails if the id is already present.
    pub fn push(&mut self, source: AudioSource) -> Result<()> {
        if self.contains(&source.audio_id) {
            return Err(Error::DuplicateId(source.audio_id));
        }
        self.items.push(source);
        Ok(())
    }

    /// Append sources one by one.
    ///
    /// Not transactional: when element `k` fails, elements `0..k` stay in the
    /// playlist and the error for `k` is returned.
    pub fn extend(&mut self, sources: impl IntoIterator<Item = AudioSource>) -> Result<()> {
        for source in sources {
            self.push(source)?;
        }
        Ok(())
    }

    /// Replace the whole playlist. The current position is cleared.
    ///
    /// Fails without touching the playlist if `sources` repeats an id.
    pub fn set(&mut self, sources: Vec<AudioSource>) -> Result<()> {
        ensure_unique(&sources)?;
        self.items = sources;
        self.current_index = None;
        Ok(())
    }

    /// Substitute the source with `audio_id` in place.
    ///
    /// Returns the position and the previous source.
    pub fn replace(&mut self, audio_id: &str, source: AudioSource) -> Result<(usize, AudioSource)> {
        let index = self
            .position(audio_id)
            .ok_or_else(|| Error::NotFound(audio_id.to_string()))?;

        if source.audio_id != audio_id && self.contains(&source.audio_id) {
            return Err(Error::DuplicateId(source.audio_id));
        }

        let previous = std::mem::replace(&mut self.items[index], source);
        Ok((index, previous))
    }

    /// Remove a source by id, keeping the current index on the same logical item.
    pub fn remove(&mut self, audio_id: &str) -> Result<AudioSource> {
        let index = self
            .position(audio_id)
            .ok_or_else(|| Error::NotFound(audio_id.to_string()))?;

        let source = self.items.remove(index);

        if let Some(current) = self.current_index {
            if self.items.is_empty() {
                self.current_index = None;
            } else if index < current {
                self.current_index = Some(current - 1);
            } else if index == current && current >= self.items.len() {
                self.current_index = Some(self.items.len() - 1);
            }
        }

        Ok(source)
    }

    /// Make `index` the current position.
    pub fn select(&mut self, index: usize) -> Option<&AudioSource> {
        if index < self.items.len() {
            self.current_index = Some(index);
            self.items.get(index)
        } else {
            None
        }
    }

    /// The source following `audio_id`, if any.
    pub fn next_after(&self, audio_id: &str) -> Option<&AudioSource> {
        self.position(audio_id).and_then(|i| self.items.get(i + 1))
    }
}

fn ensure_unique(sources: &[AudioSource]) -> Result<()> {
    let mut seen = HashSet::with_capacity(sources.len());
    for source in sources {
        if !seen.insert(source.audio_id.as_str()) {
            return Err(Error::DuplicateId(source.audio_id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use proptest::prelude::*;

    fn source(id: &str) -> AudioSource {
        AudioSource::new(id, format!("/music/{id}.mp3"), format!("Track {id}"), "Artist")
    }

    fn ids(playlist: &Playlist) -> Vec<&str> {
        playlist.items().iter().map(|s| s.audio_id.as_str()).collect()
    }

    #[test]
    fn test_push_rejects_duplicate() {
        let mut playlist = Playlist::new();
        playlist.push(source("a")).unwrap();
        let err = playlist.push(source("a")).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(id) if id == "a"));
        assert_eq!(playlist.len(), 1);
    }

    #[test]
    fn test_extend_is_partial() {
        let mut playlist = Playlist::new();
        playlist.push(source("b")).unwrap();

        let result = playlist.extend(vec![source("a"), source("b"), source("c")]);
        assert!(matches!(result, Err(Error::DuplicateId(_))));
        assert_eq!(ids(&playlist), ["b", "a"]);
    }

    #[test]
    fn test_set_resets_current_and_rejects_internal_duplicates() {
        let mut playlist = Playlist::new();
        playlist.extend(vec![source("x"), source("y")]).unwrap();
        playlist.select(1);

        let err = playlist
            .set(vec![source("a"), source("b"), source("a")])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
        assert_eq!(ids(&playlist), ["x", "y"]);

        playlist.set(vec![source("a"), source("b")]).unwrap();
        assert_eq!(ids(&playlist), ["a", "b"]);
        assert!(playlist.current().is_none());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut playlist = Playlist::new();
        playlist
            .extend(vec![source("a"), source("b"), source("c")])
            .unwrap();

        let replacement = AudioSource::new("b2", "/music/new.mp3", "New", "Artist");
        let (index, previous) = playlist.replace("b", replacement).unwrap();
        assert_eq!(index, 1);
        assert_eq!(previous.audio_id, "b");
        assert_eq!(ids(&playlist), ["a", "b2", "c"]);

        assert!(matches!(
            playlist.replace("missing", source("z")),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            playlist.replace("a", source("c")),
            Err(Error::DuplicateId(_))
        ));
    }

    #[test]
    fn test_remove_before_current_shifts_index() {
        let mut playlist = Playlist::new();
        playlist
            .extend(vec![source("a"), source("b"), source("c")])
            .unwrap();
        playlist.select(2);

        playlist.remove("a").unwrap();
        assert_eq!(playlist.current_index(), Some(1));
        assert_eq!(playlist.current().unwrap().audio_id, "c");

        playlist.remove("c").unwrap();
        assert_eq!(playlist.current_index(), Some(0));

        playlist.remove("b").unwrap();
        assert_eq!(playlist.current_index(), None);
        assert!(matches!(playlist.remove("b"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_next_after() {
        let mut playlist = Playlist::new();
        playlist.extend(vec![source("a"), source("b")]).unwrap();
        assert_eq!(playlist.next_after("a").unwrap().audio_id, "b");
        assert!(playlist.next_after("b").is_none());
        assert!(playlist.next_after("zz").is_none());
    }

    proptest! {
        #[test]
        fn prop_distinct_pushes_preserve_order(count in 0usize..40) {
            let mut playlist = Playlist::new();
            let expected: Vec<String> = (0..count).map(|i| format!("id-{i}")).collect();
            for id in &expected {
                playlist.push(source(id)).unwrap();
            }
            prop_assert_eq!(playlist.len(), count);
            let actual: Vec<String> = playlist.items().iter().map(|s| s.audio_id.clone()).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn prop_repeated_id_leaves_playlist_unchanged(count in 1usize..20, pick in 0usize..20) {
            let mut playlist = Playlist::new();
            for i in 0..count {
                playlist.push(source(&format!("id-{i}"))).unwrap();
            }
            let before: Vec<String> = playlist.items().iter().map(|s| s.audio_id.clone()).collect();
            let repeated = format!("id-{}", pick % count);

            let result = playlist.push(source(&repeated));
            prop_assert!(matches!(result, Err(Error::DuplicateId(_))));
            let after: Vec<String> = playlist.items().iter().map(|s| s.audio_id.clone()).collect();
            prop_assert_eq!(before, after);
        }
    }
}
