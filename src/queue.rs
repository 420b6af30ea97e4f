use std::collections::VecDeque;
use rand::seq::SliceRandom;
use crate::model::track::Track;

/// Upcoming tracks of a player plus the one playing and the last one played.
///
/// `current` and `previous` are only moved by the player while it reacts to
/// playback events.
#[derive(Clone, Debug, Default)]
pub struct Queue {
    tracks: VecDeque<Track>,
    pub current: Option<Track>,
    pub previous: Option<Track>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a track to the back.
    pub fn push(&mut self, track: Track) {
        self.tracks.push_back(track);
    }

    pub fn extend(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.tracks.extend(tracks);
    }

    /// Removes the track at the front.
    pub fn shift(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Inserts a track at the front.
    pub fn unshift(&mut self, track: Track) {
        self.tracks.push_front(track);
    }

    /// Clears the upcoming tracks, `current` and `previous` are kept.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn remove(&mut self, index: usize) -> Option<Track> {
        self.tracks.remove(index)
    }

    pub fn shuffle(&mut self) {
        self.tracks.make_contiguous().shuffle(&mut rand::thread_rng());
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Upcoming tracks plus the one playing.
    pub fn total_size(&self) -> usize {
        self.tracks.len() + usize::from(self.current.is_some())
    }

    /// Combined length of every upcoming track in milliseconds.
    pub fn duration(&self) -> u64 {
        self.tracks.iter().map(|t| t.info.length).sum()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Track {
        Track::unresolved("artist", title, 1000, None)
    }

    #[test]
    fn push_shift_unshift_keep_order() {
        let mut queue = Queue::new();
        queue.push(track("b"));
        queue.push(track("c"));
        queue.unshift(track("a"));

        let titles = queue.iter().map(|t| t.info.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, ["a", "b", "c"]);

        assert_eq!(queue.shift().unwrap().info.title, "a");
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.duration(), 2000);
    }

    #[test]
    fn total_size_counts_current() {
        let mut queue = Queue::new();
        assert_eq!(queue.total_size(), 0);

        queue.current = Some(track("playing"));
        assert!(queue.is_empty());
        assert_eq!(queue.total_size(), 1);
    }

    #[test]
    fn clear_keeps_history_slots() {
        let mut queue = Queue::new();
        queue.extend(vec![track("a"), track("b")]);
        queue.previous = Some(track("old"));
        queue.clear();

        assert!(queue.is_empty());
        assert!(queue.previous.is_some());
    }

    #[test]
    fn shuffle_keeps_every_track() {
        let mut queue = Queue::new();
        queue.extend((0..20).map(|i| track(&i.to_string())));
        queue.shuffle();

        assert_eq!(queue.len(), 20);
        let mut titles = queue.iter().map(|t| t.info.title.parse::<u32>().unwrap()).collect::<Vec<_>>();
        titles.sort_unstable();
        assert_eq!(titles, (0..20).collect::<Vec<_>>());
    }
}
