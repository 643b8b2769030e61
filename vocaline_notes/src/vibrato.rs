// Vibrato envelope: a parametric oscillator attached to each note.
//
// The oscillator runs over the tail of the note. `length` is the share of
// the note (measured back from its end) where vibrato is active, so the
// envelope starts at the normalized note position `1 - length/100`. Inside
// that span a sine of period `period` (milliseconds) and amplitude `depth`
// (cents) is ramped up linearly over the first `fade_in` percent of the
// span and down over the last `fade_out` percent. `shift` offsets the
// phase by a fraction of one period. `drift` is stored and serialized but
// not yet consumed.
//
// Every setter clamps to the field's valid range on each write. The two
// fades are coupled: writing one shrinks the other so that
// `fade_in + fade_out <= 100` always holds. Deserialization goes through
// the same setters.
//
// Besides the sampled deviation, this module exposes the handle geometry a
// curve editor draws for the envelope: start/fade-in/fade-out/end corners
// on a baseline three semitones below the note, a toggle at the note end,
// and the first period's extent. Handle heights scale `depth` by 1/50.
//
// See also: `note.rs` which owns a `Vibrato` per note, `render.rs` which
// samples `deviation`, `tempo.rs` for the millisecond/tick mapping.

use crate::note::Note;
use crate::tempo::TickTimeline;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Editor coordinates: absolute tick and tone (fractional semitone).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EditorPoint {
    pub tick: f32,
    pub tone: f32,
}

impl EditorPoint {
    pub fn new(tick: f32, tone: f32) -> Self {
        EditorPoint { tick, tone }
    }
}

/// Semitones between the note and the envelope handle baseline.
const HANDLE_BASELINE: f32 = 3.0;

/// Depth (cents) per semitone of handle height.
const DEPTH_PER_TONE: f32 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VibratoFields")]
pub struct Vibrato {
    length: f32,
    period: f32,
    depth: f32,
    #[serde(rename = "in")]
    fade_in: f32,
    #[serde(rename = "out")]
    fade_out: f32,
    shift: f32,
    drift: f32,
}

/// Unclamped on-disk form; converted through the setters.
#[derive(Deserialize)]
#[serde(default)]
struct VibratoFields {
    length: f32,
    period: f32,
    depth: f32,
    #[serde(rename = "in")]
    fade_in: f32,
    #[serde(rename = "out")]
    fade_out: f32,
    shift: f32,
    drift: f32,
}

impl Default for VibratoFields {
    fn default() -> Self {
        let v = Vibrato::default();
        VibratoFields {
            length: v.length,
            period: v.period,
            depth: v.depth,
            fade_in: v.fade_in,
            fade_out: v.fade_out,
            shift: v.shift,
            drift: v.drift,
        }
    }
}

impl From<VibratoFields> for Vibrato {
    fn from(raw: VibratoFields) -> Self {
        let mut v = Vibrato::default();
        v.set_length(raw.length);
        v.set_period(raw.period);
        v.set_depth(raw.depth);
        v.set_fade_in(raw.fade_in);
        v.set_fade_out(raw.fade_out);
        v.set_shift(raw.shift);
        v.set_drift(raw.drift);
        v
    }
}

impl Default for Vibrato {
    fn default() -> Self {
        Vibrato {
            length: 0.0,
            period: 100.0,
            depth: 32.0,
            fade_in: 10.0,
            fade_out: 10.0,
            shift: 0.0,
            drift: 0.0,
        }
    }
}

impl Vibrato {
    /// Percentage of the note, from its end, where vibrato is active.
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn set_length(&mut self, value: f32) {
        self.length = value.clamp(0.0, 100.0);
    }

    /// Oscillation period in milliseconds.
    pub fn period(&self) -> f32 {
        self.period
    }

    pub fn set_period(&mut self, value: f32) {
        self.period = value.clamp(20.0, 500.0);
    }

    /// Peak amplitude in cents.
    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn set_depth(&mut self, value: f32) {
        self.depth = value.clamp(5.0, 200.0);
    }

    /// Fade-in as a percentage of the vibrato span.
    pub fn fade_in(&self) -> f32 {
        self.fade_in
    }

    /// Set the fade-in; the fade-out is reduced if the two exceed 100.
    pub fn set_fade_in(&mut self, value: f32) {
        self.fade_in = value.clamp(0.0, 100.0);
        self.fade_out = self.fade_out.min(100.0 - self.fade_in);
    }

    /// Fade-out as a percentage of the vibrato span.
    pub fn fade_out(&self) -> f32 {
        self.fade_out
    }

    /// Set the fade-out; the fade-in is reduced if the two exceed 100.
    pub fn set_fade_out(&mut self, value: f32) {
        self.fade_out = value.clamp(0.0, 100.0);
        self.fade_in = self.fade_in.min(100.0 - self.fade_out);
    }

    /// Phase shift as a percentage of one period.
    pub fn shift(&self) -> f32 {
        self.shift
    }

    pub fn set_shift(&mut self, value: f32) {
        self.shift = value.clamp(0.0, 100.0);
    }

    pub fn drift(&self) -> f32 {
        self.drift
    }

    pub fn set_drift(&mut self, value: f32) {
        self.drift = value.clamp(-100.0, 100.0);
    }

    /// Normalized note position (0 = start, 1 = end) where vibrato begins.
    pub fn normalized_start(&self) -> f32 {
        1.0 - self.length / 100.0
    }

    /// Fade-in span in normalized note positions.
    fn normalized_fade_in(&self) -> f32 {
        self.length / 100.0 * self.fade_in / 100.0
    }

    /// Fade-out span in normalized note positions.
    fn normalized_fade_out(&self) -> f32 {
        self.length / 100.0 * self.fade_out / 100.0
    }

    /// The period expressed as a fraction of the note's duration.
    pub fn normalized_period(&self, note: &Note, timeline: &impl TickTimeline) -> f32 {
        let period_ticks = timeline.ms_to_ticks(self.period as f64) as f32;
        period_ticks / note.duration as f32
    }

    /// Oscillator output in cents at normalized position `n_pos`, with the
    /// fade envelope applied. Zero before the envelope starts.
    pub fn deviation(&self, n_pos: f32, n_period: f32) -> f32 {
        let n_start = self.normalized_start();
        if n_pos < n_start || n_period.is_nan() || n_period <= 0.0 {
            return 0.0;
        }
        let n_in = self.normalized_fade_in();
        let n_in_pos = n_start + n_in;
        let n_out = self.normalized_fade_out();
        let n_out_pos = 1.0 - n_out;

        let t = (n_pos - n_start) / n_period + self.shift / 100.0;
        let mut y = (TAU * t).sin() * self.depth;
        if n_pos < n_in_pos {
            if n_in > 0.0 {
                y *= (n_pos - n_start) / n_in;
            }
        } else if n_pos > n_out_pos && n_out > 0.0 {
            y *= (1.0 - n_pos) / n_out;
        }
        y
    }

    /// A point on the vibrato curve in editor coordinates.
    ///
    /// The tone sits half a semitone below the note line (where the editor
    /// draws the note's center) plus the deviation in semitones.
    pub fn evaluate(&self, n_pos: f32, n_period: f32, note: &Note) -> EditorPoint {
        let y = self.deviation(n_pos, n_period);
        EditorPoint::new(
            note_tick(note, n_pos),
            note.tone as f32 - 0.5 + y / 100.0,
        )
    }

    pub fn envelope_start(&self, note: &Note) -> EditorPoint {
        EditorPoint::new(note_tick(note, self.normalized_start()), baseline(note))
    }

    pub fn fade_in_handle(&self, note: &Note) -> EditorPoint {
        EditorPoint::new(
            note_tick(note, self.normalized_start() + self.normalized_fade_in()),
            baseline(note) + self.depth / DEPTH_PER_TONE,
        )
    }

    pub fn fade_out_handle(&self, note: &Note) -> EditorPoint {
        EditorPoint::new(
            note_tick(note, 1.0 - self.normalized_fade_out()),
            baseline(note) + self.depth / DEPTH_PER_TONE,
        )
    }

    pub fn envelope_end(&self, note: &Note) -> EditorPoint {
        EditorPoint::new(note.end() as f32, baseline(note))
    }

    pub fn toggle_handle(&self, note: &Note) -> EditorPoint {
        EditorPoint::new(note.end() as f32, note.tone as f32 - 1.5)
    }

    /// Start and end of the first full period after the (shifted) envelope
    /// start, drawn half a semitone under the handle baseline.
    pub fn period_start_end(
        &self,
        note: &Note,
        timeline: &impl TickTimeline,
    ) -> (EditorPoint, EditorPoint) {
        let period_ticks = timeline.ms_to_ticks(self.period as f64) as f32;
        let shift_ticks = period_ticks * self.shift / 100.0;
        let start_tick = note_tick(note, self.normalized_start()) + shift_ticks;
        let tone = baseline(note) - 0.5;
        (
            EditorPoint::new(start_tick, tone),
            EditorPoint::new(start_tick + period_ticks, tone),
        )
    }

    /// Depth implied by dragging a handle to `tone`. Not clamped; pass the
    /// result to `set_depth`.
    pub fn tone_to_depth(&self, note: &Note, tone: f32) -> f32 {
        (tone - baseline(note)) * DEPTH_PER_TONE
    }

    /// Vibrato for the tail of a note split at `_offset`.
    // TODO: partition length and phase at the split point; currently the
    // tail gets a full copy of the envelope.
    pub fn split(&self, _offset: i32) -> Vibrato {
        self.clone()
    }
}

fn note_tick(note: &Note, n_pos: f32) -> f32 {
    note.position as f32 + note.duration as f32 * n_pos
}

fn baseline(note: &Note) -> f32 {
    note.tone as f32 - HANDLE_BASELINE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tempo::Tempo;

    fn note_at(position: i32, duration: i32, tone: i32) -> Note {
        let mut note = Note::create();
        note.position = position;
        note.duration = duration;
        note.tone = tone;
        note
    }

    fn active_vibrato() -> Vibrato {
        let mut v = Vibrato::default();
        v.set_length(50.0);
        v.set_depth(40.0);
        v.set_fade_in(20.0);
        v.set_fade_out(20.0);
        v
    }

    #[test]
    fn defaults() {
        let v = Vibrato::default();
        assert_eq!(v.length(), 0.0);
        assert_eq!(v.period(), 100.0);
        assert_eq!(v.depth(), 32.0);
        assert_eq!(v.fade_in(), 10.0);
        assert_eq!(v.fade_out(), 10.0);
        assert_eq!(v.normalized_start(), 1.0);
    }

    #[test]
    fn setters_clamp_every_field() {
        let mut v = Vibrato::default();
        v.set_depth(9999.0);
        assert_eq!(v.depth(), 200.0);
        v.set_depth(-50.0);
        assert_eq!(v.depth(), 5.0);
        v.set_length(150.0);
        assert_eq!(v.length(), 100.0);
        v.set_period(1.0);
        assert_eq!(v.period(), 20.0);
        v.set_period(1000.0);
        assert_eq!(v.period(), 500.0);
        v.set_shift(-1.0);
        assert_eq!(v.shift(), 0.0);
        v.set_drift(-300.0);
        assert_eq!(v.drift(), -100.0);
        v.set_drift(300.0);
        assert_eq!(v.drift(), 100.0);
    }

    #[test]
    fn fades_never_exceed_one_hundred() {
        let mut v = Vibrato::default();
        let writes: [(bool, f32); 8] = [
            (true, 80.0),
            (false, 70.0),
            (true, 150.0),
            (false, 30.0),
            (true, -10.0),
            (false, 100.0),
            (true, 55.5),
            (false, 45.0),
        ];
        for (is_in, value) in writes {
            if is_in {
                v.set_fade_in(value);
            } else {
                v.set_fade_out(value);
            }
            assert!(v.fade_in() + v.fade_out() <= 100.0);
            assert!((0.0..=100.0).contains(&v.fade_in()));
            assert!((0.0..=100.0).contains(&v.fade_out()));
        }
    }

    #[test]
    fn setting_fade_in_shrinks_fade_out() {
        let mut v = Vibrato::default();
        v.set_fade_out(60.0);
        v.set_fade_in(70.0);
        assert_eq!(v.fade_in(), 70.0);
        assert_eq!(v.fade_out(), 30.0);
    }

    #[test]
    fn zero_before_envelope_start() {
        let v = active_vibrato();
        for n_pos in [0.0, 0.1, 0.3, 0.49] {
            assert_eq!(v.deviation(n_pos, 0.1), 0.0);
        }
    }

    #[test]
    fn fade_in_ramp_is_partial() {
        let v = active_vibrato();
        let n_start = v.normalized_start();
        let n_in = v.normalized_fade_in();
        let n_pos = n_start + n_in / 2.0;
        // Pick a period so the raw sine is not at a zero crossing.
        let n_period = 0.37;
        let t = (n_pos - n_start) / n_period;
        let peak = ((TAU * t).sin() * v.depth()).abs();
        let y = v.deviation(n_pos, n_period).abs();
        assert!(y > 0.0 && y < peak, "y = {y}, peak = {peak}");
        assert!((y - peak / 2.0).abs() < 1e-3);
    }

    #[test]
    fn zero_fade_in_skips_ramp() {
        let mut v = active_vibrato();
        v.set_fade_in(0.0);
        let n_start = v.normalized_start();
        let n_pos = n_start + 0.01;
        let n_period = 0.37;
        let t = (n_pos - n_start) / n_period;
        let raw = (TAU * t).sin() * v.depth();
        let y = v.deviation(n_pos, n_period);
        assert!(y.is_finite());
        assert!((y - raw).abs() < 1e-4);
    }

    #[test]
    fn zero_fade_out_skips_ramp() {
        let mut v = active_vibrato();
        v.set_fade_out(0.0);
        let n_start = v.normalized_start();
        let n_period = 0.37;
        for n_pos in [0.99, 0.999, 1.0] {
            let t = (n_pos - n_start) / n_period;
            let raw = (TAU * t).sin() * v.depth();
            let y = v.deviation(n_pos, n_period);
            assert!(y.is_finite());
            assert!((y - raw).abs() < 1e-4, "{n_pos}: {y} vs {raw}");
        }
    }

    #[test]
    fn degenerate_period_is_silent() {
        let v = active_vibrato();
        let n_pos = v.normalized_start() + 0.2;
        assert_eq!(v.deviation(n_pos, 0.0), 0.0);
        assert_eq!(v.deviation(n_pos, f32::NAN), 0.0);
    }

    #[test]
    fn plateau_is_full_amplitude_and_fade_out_reaches_zero() {
        let v = active_vibrato();
        let n_period = 0.1;
        // Plateau: between 0.6 and 0.9. A quarter period after the start
        // is a sine peak.
        let n_pos = v.normalized_start() + 0.125;
        assert!((v.deviation(n_pos, n_period) - v.depth()).abs() < 1e-3);
        assert!(v.deviation(1.0, n_period).abs() < 1e-4);
    }

    #[test]
    fn shift_moves_phase() {
        let mut v = active_vibrato();
        v.set_fade_in(0.0);
        v.set_shift(25.0);
        // Quarter-period shift turns sin into cos at the envelope start.
        let y = v.deviation(v.normalized_start(), 0.1);
        assert!((y - v.depth()).abs() < 1e-3);
    }

    #[test]
    fn evaluate_uses_editor_baseline() {
        let v = active_vibrato();
        let note = note_at(480, 960, 60);
        let p = v.evaluate(0.25, 0.1, &note);
        assert_eq!(p.tick, 480.0 + 240.0);
        assert_eq!(p.tone, 59.5);
    }

    #[test]
    fn handle_geometry() {
        let v = active_vibrato();
        let note = note_at(0, 1000, 60);
        assert_eq!(v.envelope_start(&note), EditorPoint::new(500.0, 57.0));
        let fade_in = v.fade_in_handle(&note);
        assert!((fade_in.tick - 600.0).abs() < 1e-3);
        assert!((fade_in.tone - 57.8).abs() < 1e-5);
        let fade_out = v.fade_out_handle(&note);
        assert!((fade_out.tick - 900.0).abs() < 1e-3);
        assert!((fade_out.tone - 57.8).abs() < 1e-5);
        assert_eq!(v.envelope_end(&note), EditorPoint::new(1000.0, 57.0));
        assert_eq!(v.toggle_handle(&note), EditorPoint::new(1000.0, 58.5));
    }

    #[test]
    fn period_handles_follow_tempo_and_shift() {
        let mut v = active_vibrato();
        v.set_period(125.0);
        v.set_shift(50.0);
        let note = note_at(0, 1000, 60);
        // 120 BPM at 480 ticks/quarter: 125 ms = 120 ticks.
        let (start, end) = v.period_start_end(&note, &Tempo::default());
        assert!((start.tick - 560.0).abs() < 1e-3);
        assert!((end.tick - 680.0).abs() < 1e-3);
        assert_eq!(start.tone, 56.5);
        assert_eq!(end.tone, 56.5);
    }

    #[test]
    fn tone_to_depth_inverts_handle_height() {
        let v = active_vibrato();
        let note = note_at(0, 1000, 60);
        let handle = v.fade_in_handle(&note);
        assert!((v.tone_to_depth(&note, handle.tone) - v.depth()).abs() < 1e-3);
    }

    #[test]
    fn normalized_period_scales_by_duration() {
        let v = Vibrato::default();
        let note = note_at(0, 960, 60);
        // 100 ms at 120 BPM = 96 ticks.
        assert!((v.normalized_period(&note, &Tempo::default()) - 0.1).abs() < 1e-5);
    }

    #[test]
    fn split_returns_whole_copy() {
        let v = active_vibrato();
        assert_eq!(v.split(240), v);
    }

    #[test]
    fn deserialize_clamps() {
        let v: Vibrato =
            serde_json::from_str(r#"{"length": 300, "depth": 9999, "in": 80, "out": 60}"#).unwrap();
        assert_eq!(v.length(), 100.0);
        assert_eq!(v.depth(), 200.0);
        assert_eq!(v.fade_in(), 40.0);
        assert_eq!(v.fade_out(), 60.0);
        assert_eq!(v.period(), 100.0);
    }
}
