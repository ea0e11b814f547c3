//! Turn reconciliation: merging chunked, out-of-order deltas into entries.

use parley_types::{ConversationEntry, Role, TranscriptChunk};
use std::collections::{BTreeMap, HashMap};

/// Builds the displayed transcript from a stream of per-turn fragments.
///
/// The reconciler keeps two pieces of state:
///
/// - the ordered entry list shown to the user, unique per `(role, turn_id)`;
/// - a chunk map per active turn, keyed by delta counter.
///
/// A turn's text is always rebuilt from its chunk map in ascending counter
/// order, so fragments may arrive in any order and the result is the same.
/// Entries keep their first-insertion position for as long as they exist.
#[derive(Debug, Default)]
pub struct TurnReconciler {
    entries: Vec<ConversationEntry>,
    chunks: HashMap<String, BTreeMap<u64, String>>,
}

impl TurnReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a transcript fragment and rewrites the turn's entry.
    ///
    /// With both a `turn_id` and a `counter`, the fragment is stored at
    /// `counter` (overwriting a previous fragment at the same key) and the
    /// entry's text becomes the concatenation of all stored fragments.
    ///
    /// Without a counter the fragment is a whole replacement: the turn's
    /// partial chunks are dropped and the entry text is set to `fragment`.
    /// Without a turn id a new entry is always appended.
    pub fn apply_delta(
        &mut self,
        role: Role,
        turn_id: Option<&str>,
        counter: Option<u64>,
        fragment: &str,
    ) {
        let (Some(turn_id), Some(counter)) = (turn_id, counter) else {
            if let Some(turn_id) = turn_id {
                self.chunks.remove(turn_id);
            }
            tracing::trace!(%role, ?turn_id, "whole-replacement transcript");
            self.upsert(
                ConversationEntry::new(role, turn_id.map(str::to_string), fragment),
                true,
            );
            return;
        };

        let turn = self.chunks.entry(turn_id.to_string()).or_default();
        turn.insert(counter, fragment.to_string());

        let chunks: Vec<TranscriptChunk> = turn
            .iter()
            .map(|(counter, text)| TranscriptChunk {
                counter: *counter,
                text: text.clone(),
            })
            .collect();
        let text: String = chunks.iter().map(|c| c.text.as_str()).collect();

        self.upsert(
            ConversationEntry::new(role, Some(turn_id.to_string()), text).with_chunks(chunks),
            true,
        );
    }

    /// Appends a single-shot block of text to the turn's entry, creating it
    /// if needed.
    pub fn append_whole(&mut self, role: Role, turn_id: Option<&str>, text: &str) {
        self.upsert(
            ConversationEntry::new(role, turn_id.map(str::to_string), text),
            false,
        );
    }

    /// Inserts `entry` or merges it into the existing row for its
    /// `(role, turn_id)`. Returns the index of the affected row.
    ///
    /// When merging, `replace` selects between overwriting and appending the
    /// text. Either way the row's chunks become the incoming entry's, since
    /// only the latest call knows the current reconstruction. The row keeps
    /// its position and original timestamp. Entries without a turn id are
    /// always appended.
    pub fn upsert(&mut self, entry: ConversationEntry, replace: bool) -> usize {
        let existing = entry.turn_id.as_deref().and_then(|turn_id| {
            self.entries
                .iter()
                .position(|e| e.is_turn(entry.role, turn_id))
        });

        let Some(index) = existing else {
            self.entries.push(entry);
            return self.entries.len() - 1;
        };

        let current = &mut self.entries[index];
        if replace {
            current.text = entry.text;
        } else {
            current.text.push_str(&entry.text);
        }
        current.chunks = entry.chunks;
        index
    }

    /// Drops the chunk map for `turn_id`. The turn's entry is left as is.
    pub fn clear_turn(&mut self, turn_id: &str) {
        if self.chunks.remove(turn_id).is_some() {
            tracing::trace!(turn_id, "cleared turn chunks");
        }
    }

    /// Drops every chunk map, keeping the entries.
    pub fn clear_all_turns(&mut self) {
        self.chunks.clear();
    }

    /// Drops all chunk maps and all entries.
    pub fn reset_session(&mut self) {
        self.chunks.clear();
        self.entries.clear();
    }

    /// Appends a `system` status line.
    pub fn push_status(&mut self, text: impl Into<String>) {
        self.entries.push(ConversationEntry::system(text));
    }

    /// Appends an entry without attempting to merge it.
    pub fn push(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    /// The displayed entries in insertion order.
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// Returns the row for `(role, turn_id)`, if one exists.
    pub fn entry_for(&self, role: Role, turn_id: &str) -> Option<&ConversationEntry> {
        self.entries.iter().find(|e| e.is_turn(role, turn_id))
    }

    /// Returns `true` if `turn_id` has a chunk map.
    pub fn is_accumulating(&self, turn_id: &str) -> bool {
        self.chunks.contains_key(turn_id)
    }

    /// Number of turns currently holding chunk maps.
    pub fn active_turns(&self) -> usize {
        self.chunks.len()
    }
}
