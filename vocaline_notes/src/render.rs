// Sampling the final pitch of notes.
//
// The renderer turns a validated note into a list of absolute
// `(tick, tone)` samples at a fixed tick step: the note's base tone, plus
// the pitch-bend curve (tenths of a semitone), plus the vibrato deviation
// (cents). This is what an exporter hands to a resampler as pitch bend.
//
// Notes flagged in error are not rendered. `render_note` returns `None`
// for them; `render_sequence` skips them and logs a warning.

use crate::note::{Note, NoteId};
use crate::sequence::NoteSequence;
use crate::tempo::TickTimeline;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One rendered pitch sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchSample {
    /// Absolute tick.
    pub tick: f32,
    /// Fractional semitone number.
    pub tone: f32,
}

/// Sample a note's pitch from its start to its end (inclusive) every
/// `step_ticks` ticks. A zero step is treated as one tick.
pub fn render_note(
    note: &Note,
    timeline: &impl TickTimeline,
    step_ticks: u32,
) -> Option<Vec<PitchSample>> {
    if note.error {
        return None;
    }
    let step = step_ticks.max(1) as usize;
    let duration = note.duration.max(1);
    let n_period = note.vibrato.normalized_period(note, timeline);

    let mut offsets: Vec<i32> = (0..duration).step_by(step).collect();
    offsets.push(duration);

    let samples = offsets
        .into_iter()
        .map(|x| {
            let n_pos = x as f32 / duration as f32;
            let bend = note.pitch.interpolate(x as f32) / 10.0;
            let vibrato = note.vibrato.deviation(n_pos, n_period) / 100.0;
            PitchSample {
                tick: (note.position + x) as f32,
                tone: note.tone as f32 + bend + vibrato,
            }
        })
        .collect();
    Some(samples)
}

/// Render every note not in error, in timeline order.
pub fn render_sequence(
    seq: &NoteSequence,
    timeline: &impl TickTimeline,
    step_ticks: u32,
) -> Vec<(NoteId, Vec<PitchSample>)> {
    let mut rendered = Vec::with_capacity(seq.len());
    for note in seq.iter() {
        match render_note(note, timeline, step_ticks) {
            Some(samples) => rendered.push((note.id, samples)),
            None => warn!(id = %note.id, "skipping note in error: {note}"),
        }
    }
    rendered
}
