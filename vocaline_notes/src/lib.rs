// Vocaline note model and pitch synthesis.
//
// Models the notes of a singing-voice sequencing timeline and synthesizes
// the pitch-deviation curve that drives a vocal synthesizer's pitch bend,
// including vibrato. Phonemization, audio rendering, and UI are outside
// this crate and reached through narrow traits.
//
// Architecture:
// - pitch.rs: `PitchPoint`/`PitchCurve`, sorted control points with
//   split and shaped interpolation
// - vibrato.rs: `Vibrato` envelope (clamped parameters, oscillator
//   evaluation, curve-editor handle geometry)
// - phoneme.rs: phoneme segments and the `PhonemeContext` validation seam
// - expression.rs: per-note expressions and the descriptor registry
// - note.rs: `Note` (validation, cloning, ordering, resampler flags)
// - sequence.rs: `NoteSequence`, the owning sequence that assigns ids,
//   maintains neighbor links, validates, and splits notes
// - command.rs: `NoteEdit` editing operations with explicit re-validation
// - tempo.rs: `TickTimeline` millisecond/tick mapping, constant `Tempo`
// - render.rs: sampled `(tick, tone)` pitch for valid notes
// - config.rs: `ProjectConfig` loaded from JSON
//
// Single-threaded: nothing here locks. Callers serialize edits.

pub mod command;
pub mod config;
pub mod expression;
pub mod note;
pub mod phoneme;
pub mod pitch;
pub mod render;
pub mod sequence;
pub mod tempo;
pub mod vibrato;
