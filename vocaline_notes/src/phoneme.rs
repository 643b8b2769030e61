// Phoneme segments within a note.
//
// A note is sung as one or more phonemes, each starting at a tick offset
// relative to the note start. The phoneme text itself comes from an
// external phonemizer; this crate only tracks timing, the owning note, and
// the validation outcome.
//
// `parent` is a non-owning back-reference (a `NoteId`), repaired on every
// validation pass by `Note::validate`. It is not serialized.
//
// Whether a phoneme is valid depends on project/track/part context this
// crate does not model (voicebank lookups, oto entries). `PhonemeContext`
// is the seam: it answers "is this phoneme in error?" and nothing else.

use crate::note::{Note, NoteId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phoneme {
    /// Ticks relative to the owning note's start.
    pub position: i32,
    /// Phoneme text as produced by the phonemizer. Empty until assigned.
    #[serde(default)]
    pub phoneme: String,
    #[serde(skip)]
    pub parent: Option<NoteId>,
    #[serde(skip)]
    pub error: bool,
}

impl Phoneme {
    pub fn new(position: i32) -> Self {
        Phoneme {
            position,
            phoneme: String::new(),
            parent: None,
            error: false,
        }
    }

    /// Absolute tick where this phoneme starts, given its note.
    pub fn start(&self, note: &Note) -> i32 {
        note.position + self.position
    }
}

/// Equality is by content; the back-reference and error flag are derived.
impl PartialEq for Phoneme {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position && self.phoneme == other.phoneme
    }
}

/// Decides whether a phoneme is in error within its note.
pub trait PhonemeContext {
    fn phoneme_error(&self, note: &Note, phoneme: &Phoneme) -> bool;
}

/// No context: every phoneme is accepted.
impl PhonemeContext for () {
    fn phoneme_error(&self, _note: &Note, _phoneme: &Phoneme) -> bool {
        false
    }
}

/// Flags phonemes that start outside their note's span.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanCheck;

impl PhonemeContext for SpanCheck {
    fn phoneme_error(&self, note: &Note, phoneme: &Phoneme) -> bool {
        phoneme.position < 0 || phoneme.position >= note.duration
    }
}
