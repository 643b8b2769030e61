// Editing operations on a note sequence.
//
// Every change an editor makes to notes goes through a `NoteEdit`, applied
// by `NoteSequence::apply`. Applying an edit mutates the target note,
// restores timeline order if the position changed, and then explicitly
// re-validates the notes whose derived state the edit can touch: the
// edited note plus its neighbors before and after the edit. Since a note's
// validation only looks at its predecessor, that set is sufficient, and
// the order of re-validation is always timeline order.
//
// Current edits:
// - `Move`: shift position and/or tone (saturating).
// - `Resize`: change duration (saturating; clamped on validation).
// - `SetLyric`
// - `AddPitchPoint` / `RemovePitchPoint` / `SetSnapFirst`: pitch curve.
// - `SetVibrato`: one vibrato parameter, clamped by its setter.
// - `SetExpression`: per-note expression value, clamped by its registry
//   descriptor and marked overridden.
// - `Remove`: take the note out of the sequence.
//
// See also: `sequence.rs` for `validate_notes`, `note.rs` for validation.

use crate::expression::{Expression, ExpressionRegistry};
use crate::note::{Note, NoteId};
use crate::phoneme::PhonemeContext;
use crate::pitch::PitchPoint;
use crate::sequence::NoteSequence;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NoteEdit {
    Move {
        id: NoteId,
        delta_position: i32,
        delta_tone: i32,
    },
    Resize {
        id: NoteId,
        delta_duration: i32,
    },
    SetLyric {
        id: NoteId,
        lyric: String,
    },
    AddPitchPoint {
        id: NoteId,
        point: PitchPoint,
    },
    RemovePitchPoint {
        id: NoteId,
        point: PitchPoint,
    },
    SetSnapFirst {
        id: NoteId,
        snap_first: bool,
    },
    SetVibrato {
        id: NoteId,
        param: VibratoParam,
        value: f32,
    },
    SetExpression {
        id: NoteId,
        abbr: String,
        value: f32,
    },
    Remove {
        id: NoteId,
    },
}

impl NoteEdit {
    /// The note this edit targets.
    pub fn target(&self) -> NoteId {
        match self {
            NoteEdit::Move { id, .. }
            | NoteEdit::Resize { id, .. }
            | NoteEdit::SetLyric { id, .. }
            | NoteEdit::AddPitchPoint { id, .. }
            | NoteEdit::RemovePitchPoint { id, .. }
            | NoteEdit::SetSnapFirst { id, .. }
            | NoteEdit::SetVibrato { id, .. }
            | NoteEdit::SetExpression { id, .. }
            | NoteEdit::Remove { id } => *id,
        }
    }
}

/// Which vibrato field a `SetVibrato` edit writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VibratoParam {
    Length,
    Period,
    Depth,
    FadeIn,
    FadeOut,
    Shift,
    Drift,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditError {
    /// The edit targets a note that is not in the sequence.
    UnknownNote(NoteId),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::UnknownNote(id) => write!(f, "no note {id} in sequence"),
        }
    }
}

impl std::error::Error for EditError {}

impl NoteSequence {
    /// Apply an edit and re-validate the affected notes. Expression values
    /// are clamped by their descriptor in `registry`; values for unknown
    /// abbreviations are stored as given.
    pub fn apply<C: PhonemeContext + ?Sized>(
        &mut self,
        edit: NoteEdit,
        registry: &ExpressionRegistry,
        ctx: &C,
    ) -> Result<(), EditError> {
        let id = edit.target();
        let (old_prev, old_next) = self
            .get(id)
            .map(|n| (n.prev, n.next))
            .ok_or(EditError::UnknownNote(id))?;

        let mut reorder = false;
        let mut removed = false;
        match edit {
            NoteEdit::Move {
                delta_position,
                delta_tone,
                ..
            } => {
                let note = self.note_mut(id)?;
                note.position = note.position.saturating_add(delta_position);
                note.tone = note.tone.saturating_add(delta_tone);
                reorder = delta_position != 0;
            }
            NoteEdit::Resize { delta_duration, .. } => {
                let note = self.note_mut(id)?;
                note.duration = note.duration.saturating_add(delta_duration);
            }
            NoteEdit::SetLyric { lyric, .. } => {
                self.note_mut(id)?.lyric = lyric;
            }
            NoteEdit::AddPitchPoint { point, .. } => {
                self.note_mut(id)?.pitch.add_point(point);
            }
            NoteEdit::RemovePitchPoint { point, .. } => {
                self.note_mut(id)?.pitch.remove_point(&point);
            }
            NoteEdit::SetSnapFirst { snap_first, .. } => {
                self.note_mut(id)?.pitch.snap_first = snap_first;
            }
            NoteEdit::SetVibrato { param, value, .. } => {
                let vibrato = &mut self.note_mut(id)?.vibrato;
                match param {
                    VibratoParam::Length => vibrato.set_length(value),
                    VibratoParam::Period => vibrato.set_period(value),
                    VibratoParam::Depth => vibrato.set_depth(value),
                    VibratoParam::FadeIn => vibrato.set_fade_in(value),
                    VibratoParam::FadeOut => vibrato.set_fade_out(value),
                    VibratoParam::Shift => vibrato.set_shift(value),
                    VibratoParam::Drift => vibrato.set_drift(value),
                }
            }
            NoteEdit::SetExpression { abbr, value, .. } => {
                let value = match registry.get(&abbr) {
                    Some(descriptor) => descriptor.clamp(value),
                    None => value,
                };
                self.note_mut(id)?.expressions.insert(
                    abbr,
                    Expression {
                        value,
                        overridden: true,
                    },
                );
            }
            NoteEdit::Remove { .. } => {
                self.remove(id);
                removed = true;
            }
        }

        if reorder {
            self.resort();
        }
        let mut affected: Vec<NoteId> = [old_prev, old_next].into_iter().flatten().collect();
        if !removed {
            affected.push(id);
            if let Some(note) = self.get(id) {
                affected.extend(note.prev);
                affected.extend(note.next);
            }
        }
        self.validate_notes(&affected, ctx);
        Ok(())
    }

    fn note_mut(&mut self, id: NoteId) -> Result<&mut Note, EditError> {
        self.get_mut(id).ok_or(EditError::UnknownNote(id))
    }
}
