//! Input history for the console.

use std::collections::VecDeque;

/// Bounded history of executed input, newest first.
///
/// Re-entering a previous input moves it back to the front instead of
/// storing it twice.
#[derive(Debug)]
pub struct InputHistory {
    entries: VecDeque<String>,
    max_entries: usize,
}

impl InputHistory {
    /// Creates a new empty input history.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Adds an entry to the front of the history.
    /// Skips empty entries.
    pub fn push(&mut self, entry: &str) {
        let entry = entry.trim();
        if entry.is_empty() {
            return;
        }

        if let Some(pos) = self.entries.iter().position(|e| e == entry) {
            self.entries.remove(pos);
        }
        self.entries.push_front(entry.to_string());
        self.entries.truncate(self.max_entries);
    }

    /// Returns the entry `index` steps back (0 = most recent).
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Iterates over entries, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Returns the number of entries in history.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the history is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears all history entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for InputHistory {
    fn default() -> Self {
        Self::new(50)
    }
}
