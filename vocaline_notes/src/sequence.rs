// The owning sequence of notes.
//
// `NoteSequence` stores the notes of one voice part in timeline order
// (position, then id) and is the only place neighbor links are computed.
// Each note's `prev`/`next` are `NoteId` handles into this sequence,
// rebuilt by `relink` whenever notes are inserted, removed or reordered.
// Nothing owns a neighbor; removing a note just relinks the rest.
//
// Validation is explicit. `validate_all` walks the whole sequence in order;
// `validate_around` re-validates one note together with its immediate
// neighbors, which is the set an edit to that note can invalidate. Editing
// goes through `NoteSequence::apply` in `command.rs`, which calls these.
//
// Not synchronized: the sequence expects one editor at a time.
//
// Serialized form is just the note list. Ids, links, and error flags are
// transient and restored by `rebuild_transient_state` (called by
// `from_json`), following the save/load split the notes themselves use.

use crate::expression::ExpressionRegistry;
use crate::note::{Note, NoteId};
use crate::phoneme::{Phoneme, PhonemeContext};
use serde::{Deserialize, Serialize};

/// Lyric given to the tail half of a split note (a held continuation).
pub const CONTINUATION_LYRIC: &str = "+";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NoteSequence {
    notes: Vec<Note>,
    #[serde(skip)]
    next_id: u64,
}

impl NoteSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Notes in timeline order.
    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    /// Add a note, assigning it a fresh id. The note is not validated; call
    /// `validate_around` with the returned id.
    pub fn insert(&mut self, mut note: Note) -> NoteId {
        let id = NoteId(self.next_id);
        self.next_id += 1;
        note.id = id;
        // The new id is the largest, so it sorts after every note at the
        // same position.
        let idx = self.notes.partition_point(|n| n.position <= note.position);
        self.notes.insert(idx, note);
        self.relink();
        id
    }

    /// Take a note out of the sequence. Its neighbor links are cleared.
    pub fn remove(&mut self, id: NoteId) -> Option<Note> {
        let idx = self.index_of(id)?;
        let mut note = self.notes.remove(idx);
        note.prev = None;
        note.next = None;
        self.relink();
        Some(note)
    }

    pub fn index_of(&self, id: NoteId) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// Mutable access to a note. Changing `position` leaves the sequence
    /// unsorted until `resort` is called.
    pub fn get_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|n| n.id == id)
    }

    /// The note before `id` in timeline order.
    pub fn prev_of(&self, id: NoteId) -> Option<&Note> {
        let prev = self.get(id)?.prev?;
        self.get(prev)
    }

    /// The note after `id` in timeline order.
    pub fn next_of(&self, id: NoteId) -> Option<&Note> {
        let next = self.get(id)?.next?;
        self.get(next)
    }

    /// Recompute every note's `prev`/`next` from storage order.
    pub fn relink(&mut self) {
        let ids: Vec<NoteId> = self.notes.iter().map(|n| n.id).collect();
        for (i, note) in self.notes.iter_mut().enumerate() {
            note.prev = i.checked_sub(1).map(|p| ids[p]);
            note.next = ids.get(i + 1).copied();
        }
    }

    /// Restore timeline order after positions changed, then relink.
    pub fn resort(&mut self) {
        self.notes.sort_by(|a, b| a.order(b));
        self.relink();
    }

    /// Validate every note in timeline order.
    pub fn validate_all<C: PhonemeContext + ?Sized>(&mut self, ctx: &C) {
        for idx in 0..self.notes.len() {
            self.validate_index(idx, ctx);
        }
    }

    /// Validate a note and its immediate neighbors.
    pub fn validate_around<C: PhonemeContext + ?Sized>(&mut self, id: NoteId, ctx: &C) {
        let Some(idx) = self.index_of(id) else {
            return;
        };
        let first = idx.saturating_sub(1);
        let last = (idx + 1).min(self.notes.len() - 1);
        for i in first..=last {
            self.validate_index(i, ctx);
        }
    }

    /// Validate the given notes (ignoring unknown ids) in timeline order.
    pub fn validate_notes<C: PhonemeContext + ?Sized>(&mut self, ids: &[NoteId], ctx: &C) {
        let mut indices: Vec<usize> = ids.iter().filter_map(|&id| self.index_of(id)).collect();
        indices.sort_unstable();
        indices.dedup();
        for idx in indices {
            self.validate_index(idx, ctx);
        }
    }

    fn validate_index<C: PhonemeContext + ?Sized>(&mut self, idx: usize, ctx: &C) {
        let (head, tail) = self.notes.split_at_mut(idx);
        if let Some(note) = tail.first_mut() {
            note.validate(head.last(), ctx);
        }
    }

    /// Number of notes currently flagged in error.
    pub fn error_count(&self) -> usize {
        self.notes.iter().filter(|n| n.error).count()
    }

    /// Divide a note at `offset` ticks from its start.
    ///
    /// The head keeps the original id and ends at the split point. The tail
    /// gets a new id, the pitch points and phonemes at or after the offset
    /// (rebased to its own start), a copy of the vibrato, the same tone and
    /// expressions, and the continuation lyric. Both halves always keep at
    /// least one phoneme. Returns `None` if the note is unknown or the
    /// offset is not strictly inside it.
    pub fn split_note<C: PhonemeContext + ?Sized>(
        &mut self,
        id: NoteId,
        offset: i32,
        ctx: &C,
    ) -> Option<NoteId> {
        let head = self.get_mut(id)?;
        if offset <= 0 || offset >= head.duration {
            return None;
        }

        let mut tail = Note::create();
        tail.position = head.position.saturating_add(offset);
        tail.duration = head.duration - offset;
        tail.tone = head.tone;
        tail.lyric = CONTINUATION_LYRIC.to_string();
        tail.expressions = head.expressions.clone();
        tail.pitch = head.pitch.split(offset);
        tail.pitch.translate(-(offset as f32));
        tail.vibrato = head.vibrato.split(offset);

        let (kept, moved): (Vec<Phoneme>, Vec<Phoneme>) = head
            .phonemes
            .drain(..)
            .partition(|p| p.position < offset);
        head.phonemes = kept;
        if head.phonemes.is_empty() {
            head.phonemes.push(Phoneme::new(0));
        }
        if !moved.is_empty() {
            tail.phonemes = moved
                .into_iter()
                .map(|mut p| {
                    p.position -= offset;
                    p
                })
                .collect();
        }
        head.duration = offset;

        let tail_id = self.insert(tail);
        self.validate_notes(&[id, tail_id], ctx);
        if let Some(after) = self.get(tail_id).and_then(|t| t.next) {
            self.validate_notes(&[after], ctx);
        }
        Some(tail_id)
    }

    /// Reconcile every note's expressions with the registry.
    pub fn after_load(&mut self, registry: &ExpressionRegistry) {
        for note in &mut self.notes {
            note.after_load(registry);
        }
    }

    /// Rebuild ids, order, and links after deserialization.
    pub fn rebuild_transient_state(&mut self) {
        for (i, note) in self.notes.iter_mut().enumerate() {
            note.id = NoteId(i as u64);
            note.pitch.normalize();
        }
        self.next_id = self.notes.len() as u64;
        self.resort();
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a sequence and rebuild transient state. Notes are not
    /// validated.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut seq: NoteSequence = serde_json::from_str(json)?;
        seq.rebuild_transient_state();
        Ok(seq)
    }
}
