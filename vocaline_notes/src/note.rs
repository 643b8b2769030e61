// Notes: the timing and pitch anchor of the vocal timeline.
//
// A `Note` is one sung syllable: a tick position and duration, a tone
// (semitone number), a lyric, the phoneme segments it is sung as, its own
// pitch-bend curve and vibrato envelope, and per-note expression values.
// The note owns all of these; cloning a note deep-copies them.
//
// Notes live in a `NoteSequence` (see `sequence.rs`), which assigns each
// note a `NoteId` and keeps the `prev`/`next` neighbor handles current.
// Those handles are derived state: they are never serialized and never
// copied by `clone`.
//
// Validation (`Note::validate`) is the only place a note's derived state
// changes:
// 1. duration is raised to `MIN_DURATION`;
// 2. overlapping the previous note marks the note in error and stops;
// 3. otherwise a snap-first pitch curve has its first point rewritten to
//    bend in from the previous note's tone (or flattened to 0 when the
//    notes are not contiguous);
// 4. phonemes are re-parented to this note and checked against a
//    `PhonemeContext`; any phoneme error puts the note in error.
// Validation never fails. Callers read `error` and decide what to do.
//
// Ordering between notes is by position, ties broken by id. Value equality
// (`PartialEq`) compares content only, so a clone compares equal to its
// source.

use crate::expression::{Expression, ExpressionRegistry};
use crate::phoneme::{Phoneme, PhonemeContext};
use crate::pitch::PitchCurve;
use crate::vibrato::Vibrato;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Shortest allowed note, in ticks.
pub const MIN_DURATION: i32 = 10;

/// Identity of a note within its sequence. Assigned by `NoteSequence`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Note {
    #[serde(skip)]
    pub id: NoteId,
    /// Start tick, timeline-absolute.
    pub position: i32,
    /// Length in ticks. At least `MIN_DURATION` after validation.
    pub duration: i32,
    /// Semitone number (MIDI numbering).
    pub tone: i32,
    #[serde(default = "default_lyric")]
    pub lyric: String,
    #[serde(default)]
    pub phonemes: Vec<Phoneme>,
    #[serde(default)]
    pub pitch: PitchCurve,
    #[serde(default)]
    pub vibrato: Vibrato,
    #[serde(default)]
    pub expressions: BTreeMap<String, Expression>,
    #[serde(skip)]
    pub selected: bool,
    #[serde(skip)]
    pub error: bool,
    #[serde(skip)]
    pub prev: Option<NoteId>,
    #[serde(skip)]
    pub next: Option<NoteId>,
}

fn default_lyric() -> String {
    "a".to_string()
}

impl Note {
    /// A new note with one phoneme at its start, an empty snap-first pitch
    /// curve and a default vibrato.
    pub fn create() -> Self {
        Note {
            id: NoteId::default(),
            position: 0,
            duration: 0,
            tone: 0,
            lyric: default_lyric(),
            phonemes: vec![Phoneme::new(0)],
            pitch: PitchCurve::new(),
            vibrato: Vibrato::default(),
            expressions: BTreeMap::new(),
            selected: false,
            error: false,
            prev: None,
            next: None,
        }
    }

    /// Tick just past the end of the note.
    pub fn end(&self) -> i32 {
        self.position.saturating_add(self.duration)
    }

    /// Recompute the error flag and snap-derived pitch against `prev`, the
    /// note immediately before this one in its sequence.
    pub fn validate<C: PhonemeContext + ?Sized>(&mut self, prev: Option<&Note>, ctx: &C) {
        self.duration = self.duration.max(MIN_DURATION);

        if let Some(p) = prev.filter(|p| p.end() > self.position) {
            self.error = true;
            debug!(note = %self.id, prev = %p.id, overlap = p.end() - self.position, "note overlaps predecessor");
            return;
        }
        self.error = false;

        if self.pitch.snap_first {
            let y = match prev {
                Some(p) if p.end() == self.position => ((p.tone - self.tone) * 10) as f32,
                _ => 0.0,
            };
            self.pitch.set_first_y(y);
        }

        let id = self.id;
        for phoneme in &mut self.phonemes {
            phoneme.parent = Some(id);
        }
        let errors: Vec<bool> = self
            .phonemes
            .iter()
            .map(|phoneme| ctx.phoneme_error(self, phoneme))
            .collect();
        for (phoneme, failed) in self.phonemes.iter_mut().zip(errors) {
            phoneme.error = failed;
            self.error |= failed;
        }
        if self.error {
            debug!(note = %self.id, "phoneme validation failed");
        }
    }

    /// Reconcile expressions with the project's registry after loading:
    /// clamp known values, add defaults for missing descriptors, drop
    /// entries whose descriptor is gone unless the user overrode them.
    pub fn after_load(&mut self, registry: &ExpressionRegistry) {
        for (key, expression) in self.expressions.iter_mut() {
            if let Some(descriptor) = registry.get(key) {
                expression.value = descriptor.clamp(expression.value);
            }
        }
        for (key, descriptor) in registry {
            self.expressions
                .entry(key.clone())
                .or_insert_with(|| Expression::from_descriptor(descriptor));
        }
        let id = self.id;
        self.expressions.retain(|key, expression| {
            let keep = registry.contains_key(key) || expression.overridden;
            if !keep {
                debug!(note = %id, expression = %key, "dropping stale expression");
            }
            keep
        });
        self.pitch.normalize();
    }

    /// The resampler flag string: each expression whose descriptor carries
    /// a flag contributes the flag followed by its truncated value.
    pub fn resampler_flags(&self, registry: &ExpressionRegistry) -> String {
        let mut flags = String::new();
        for (key, expression) in &self.expressions {
            let Some(descriptor) = registry.get(key) else {
                continue;
            };
            if descriptor.flag.is_empty() {
                continue;
            }
            flags.push_str(&descriptor.flag);
            flags.push_str(&(expression.value as i32).to_string());
        }
        flags
    }

    /// Total order for sorted containers: position, then id.
    pub fn order(&self, other: &Note) -> Ordering {
        self.position
            .cmp(&other.position)
            .then(self.id.cmp(&other.id))
    }
}

impl Clone for Note {
    /// Deep copy of the note's content. Neighbor links and the selection
    /// and error flags are not carried over.
    fn clone(&self) -> Self {
        Note {
            id: self.id,
            position: self.position,
            duration: self.duration,
            tone: self.tone,
            lyric: self.lyric.clone(),
            phonemes: self.phonemes.clone(),
            pitch: self.pitch.clone(),
            vibrato: self.vibrato.clone(),
            expressions: self.expressions.clone(),
            selected: false,
            error: false,
            prev: None,
            next: None,
        }
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
            && self.duration == other.duration
            && self.tone == other.tone
            && self.lyric == other.lyric
            && self.phonemes == other.phonemes
            && self.pitch == other.pitch
            && self.vibrato == other.vibrato
            && self.expressions == other.expressions
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" Pos:{} Dur:{} Note:{}",
            self.lyric, self.position, self.duration, self.tone
        )?;
        if self.error {
            write!(f, " Error")?;
        }
        if self.selected {
            write!(f, " Selected")?;
        }
        Ok(())
    }
}
