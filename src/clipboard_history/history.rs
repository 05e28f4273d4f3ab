//! History store
//!
//! The authoritative, newest-first sequence of entries. Deduplication only
//! compares a candidate against the current head: clipboard notifications
//! often fire several times for one copy, and a head check catches that in
//! O(payload count).

use tracing::{debug, info};

use super::types::Entry;

/// Which entries a filtered view should include
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub favorites_only: bool,
    pub search: Option<String>,
}

impl ViewFilter {
    pub fn new(favorites_only: bool, search: Option<&str>) -> Self {
        Self {
            favorites_only,
            search: search.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    entries: Vec<Entry>,
    max_entries: Option<usize>,
}

impl HistoryStore {
    /// Empty store. `max_entries` of `None` means unbounded.
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: Vec::new(),
            max_entries,
        }
    }

    /// Store seeded with already-ordered entries (newest first), e.g. from disk
    pub fn with_entries(entries: Vec<Entry>, max_entries: Option<usize>) -> Self {
        let mut store = Self {
            entries,
            max_entries,
        };
        store.enforce_cap();
        store
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent entry
    pub fn head(&self) -> Option<&Entry> {
        self.entries.first()
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// Resolve a full id or a unique id prefix
    pub fn resolve_id(&self, id_or_prefix: &str) -> Option<&str> {
        if let Some(entry) = self.get(id_or_prefix) {
            return Some(entry.id());
        }
        if id_or_prefix.is_empty() {
            return None;
        }
        let mut matches = self
            .entries
            .iter()
            .filter(|e| e.id().starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Some(entry.id()),
            _ => None,
        }
    }

    /// Insert `candidate` at the head unless it is equivalent to the current head.
    ///
    /// Returns `true` if the candidate was inserted.
    pub fn try_insert(&mut self, candidate: Entry) -> bool {
        if let Some(head) = self.head() {
            if head.is_equivalent(&candidate) {
                debug!(head_id = %head.id(), "Candidate matches history head, skipping");
                return false;
            }
        }

        debug!(
            entry_id = %candidate.id(),
            payloads = candidate.payloads().len(),
            "Inserting clipboard entry"
        );
        self.entries.insert(0, candidate);
        self.enforce_cap();
        true
    }

    /// Remove an entry by id. Absent ids are a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id() != id);
        let removed = self.entries.len() != before;
        if removed {
            debug!(entry_id = %id, "Removed clipboard entry");
        }
        removed
    }

    /// Flip the favorite flag in place, returning the new value.
    ///
    /// `None` when the id is not present.
    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|e| e.id() == id)?;
        let favorite = entry.toggle_favorite();
        debug!(entry_id = %id, favorite, "Toggled favorite");
        Some(favorite)
    }

    /// Set the favorite flag explicitly. Returns `false` if the id is absent.
    pub fn set_favorite(&mut self, id: &str, favorite: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.id() == id) {
            Some(entry) => {
                entry.set_favorite(favorite);
                true
            }
            None => false,
        }
    }

    /// Replace the text content of an entry in place
    pub fn edit_text(&mut self, id: &str, text: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.id() == id) {
            Some(entry) => {
                entry.replace_text(text);
                debug!(entry_id = %id, text_len = text.len(), "Edited entry text");
                true
            }
            None => false,
        }
    }

    /// Drop every entry, favorites included. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        if count > 0 {
            info!(count, "Cleared clipboard history");
        }
        count
    }

    /// Entries matching the favorite filter and (if non-empty) a
    /// case-insensitive text search, in history order.
    pub fn get_filtered_view(&self, favorites_only: bool, search: Option<&str>) -> Vec<Entry> {
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        self.entries
            .iter()
            .filter(|e| !favorites_only || e.is_favorite())
            .filter(|e| needle.as_deref().is_none_or(|n| e.text_contains(n)))
            .cloned()
            .collect()
    }

    pub fn filtered_view(&self, filter: &ViewFilter) -> Vec<Entry> {
        self.get_filtered_view(filter.favorites_only, filter.search.as_deref())
    }

    /// Evict the oldest non-favorite entries until the cap holds.
    ///
    /// The head is the newest capture and is never evicted, so the cap can
    /// be exceeded when everything behind the head is a favorite.
    fn enforce_cap(&mut self) {
        let Some(max) = self.max_entries else {
            return;
        };

        let mut evicted = 0;
        while self.entries.len() > max {
            let Some(index) = self.entries[1..]
                .iter()
                .rposition(|e| !e.is_favorite())
                .map(|i| i + 1)
            else {
                break;
            };
            self.entries.remove(index);
            evicted += 1;
            self.merge_with_newer_neighbor(index);
        }

        if evicted > 0 {
            debug!(evicted, max_entries = max, "Evicted oldest clipboard entries");
        }
    }

    /// Removing an entry can bring two equivalent entries next to each
    /// other. The older one is folded into the newer, keeping its favorite flag.
    fn merge_with_newer_neighbor(&mut self, index: usize) {
        if index == 0 || index >= self.entries.len() {
            return;
        }
        if !self.entries[index - 1].is_equivalent(&self.entries[index]) {
            return;
        }

        let older = self.entries.remove(index);
        if older.is_favorite() {
            self.entries[index - 1].set_favorite(true);
        }
        debug!(
            kept_id = %self.entries[index - 1].id(),
            merged_id = %older.id(),
            "Merged equivalent neighbors after eviction"
        );
    }
}
