// Per-note pitch-bend curves.
//
// A `PitchCurve` is an ordered list of `PitchPoint` control points local to
// one note: `x` is in ticks relative to the note start, `y` is the bend in
// tenths of a semitone (10 cents per unit). Each point's `shape` governs
// how the curve moves from that point to the next one.
//
// The point list is kept sorted by `x` at all times. `add_point` re-sorts
// after every insertion (stable, so equal-`x` points keep insertion order);
// `split` partitions the list at a tick offset when a note is divided.
//
// `snap_first` marks curves whose first point is rewritten on every
// validation pass to bend in from the previous note's pitch (see
// `Note::validate` in `note.rs`).

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

/// Interpolation shape from a point to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PitchPointShape {
    /// Sine ease-in-out.
    #[default]
    #[serde(rename = "io")]
    SineInOut,
    #[serde(rename = "l")]
    Linear,
    /// Sine ease-in (slow start).
    #[serde(rename = "i")]
    SineIn,
    /// Sine ease-out (slow finish).
    #[serde(rename = "o")]
    SineOut,
}

impl PitchPointShape {
    /// Map a normalized progress `t` in [0, 1] through this shape.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            PitchPointShape::SineInOut => (1.0 - (PI * t).cos()) / 2.0,
            PitchPointShape::Linear => t,
            PitchPointShape::SineIn => 1.0 - (FRAC_PI_2 * t).cos(),
            PitchPointShape::SineOut => (FRAC_PI_2 * t).sin(),
        }
    }
}

/// One control point of a pitch-bend curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchPoint {
    /// Ticks relative to the note start. May be negative (bend starts
    /// before the note).
    pub x: f32,
    /// Bend in tenths of a semitone.
    pub y: f32,
    #[serde(default)]
    pub shape: PitchPointShape,
}

impl PitchPoint {
    pub fn new(x: f32, y: f32, shape: PitchPointShape) -> Self {
        PitchPoint { x, y, shape }
    }
}

/// Ordered control points plus the snap-first flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchCurve {
    #[serde(default)]
    points: Vec<PitchPoint>,
    #[serde(default = "default_snap_first")]
    pub snap_first: bool,
}

fn default_snap_first() -> bool {
    true
}

impl Default for PitchCurve {
    fn default() -> Self {
        Self::new()
    }
}

impl PitchCurve {
    /// An empty curve with snap-first enabled.
    pub fn new() -> Self {
        PitchCurve {
            points: Vec::new(),
            snap_first: true,
        }
    }

    /// A flat two-point curve spanning `width` ticks either side of the note
    /// start. Its first point is what snap-first rewrites into a bend from
    /// the previous note.
    pub fn portamento(width: f32) -> Self {
        PitchCurve {
            points: vec![
                PitchPoint::new(-width, 0.0, PitchPointShape::SineInOut),
                PitchPoint::new(width, 0.0, PitchPointShape::SineInOut),
            ],
            snap_first: true,
        }
    }

    /// The control points, ascending by `x`.
    pub fn points(&self) -> &[PitchPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Insert a point and restore ordering. Duplicate `x` values are allowed.
    pub fn add_point(&mut self, point: PitchPoint) {
        self.points.push(point);
        self.sort();
    }

    /// Remove the first point equal to `point`. No-op if none matches.
    pub fn remove_point(&mut self, point: &PitchPoint) {
        if let Some(idx) = self.points.iter().position(|p| p == point) {
            self.points.remove(idx);
        }
    }

    /// Overwrite the first point's `y`. Does nothing on an empty curve.
    pub fn set_first_y(&mut self, y: f32) {
        if let Some(first) = self.points.first_mut() {
            first.y = y;
        }
    }

    /// Move every point with `x >= offset` into a new curve and return it.
    ///
    /// The returned curve is ascending by `x` and has snap-first enabled;
    /// this curve keeps the points with `x < offset`. Point coordinates are
    /// not rebased.
    pub fn split(&mut self, offset: i32) -> PitchCurve {
        let offset = offset as f32;
        let mut tail = Vec::new();
        while self.points.last().is_some_and(|p| p.x >= offset) {
            if let Some(p) = self.points.pop() {
                tail.push(p);
            }
        }
        tail.reverse();
        PitchCurve {
            points: tail,
            snap_first: true,
        }
    }

    /// Move every point by `dx` ticks. Ordering is unaffected.
    pub fn translate(&mut self, dx: f32) {
        for point in &mut self.points {
            point.x += dx;
        }
    }

    /// Sample the curve at tick offset `x`, in tenths of a semitone.
    ///
    /// Flat before the first and after the last point; between two points
    /// the left point's shape decides the easing. An empty curve is 0.
    pub fn interpolate(&self, x: f32) -> f32 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 0.0,
        };
        if x <= first.x {
            return first.y;
        }
        if x >= last.x {
            return last.y;
        }
        for pair in self.points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if x >= a.x && x < b.x {
                let span = b.x - a.x;
                if span <= 0.0 {
                    return b.y;
                }
                let t = (x - a.x) / span;
                return a.y + (b.y - a.y) * a.shape.apply(t);
            }
        }
        last.y
    }

    fn sort(&mut self) {
        self.points.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    /// Re-establish ordering after deserializing hand-edited data.
    pub(crate) fn normalize(&mut self) {
        self.sort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xs(curve: &PitchCurve) -> Vec<f32> {
        curve.points().iter().map(|p| p.x).collect()
    }

    fn curve_with(xs: &[f32]) -> PitchCurve {
        let mut curve = PitchCurve::new();
        for &x in xs {
            curve.add_point(PitchPoint::new(x, 0.0, PitchPointShape::Linear));
        }
        curve
    }

    #[test]
    fn add_point_keeps_points_sorted() {
        let curve = curve_with(&[7.0, -3.0, 5.0, 1.0, 5.0, 0.0]);
        assert_eq!(xs(&curve), vec![-3.0, 0.0, 1.0, 5.0, 5.0, 7.0]);
    }

    #[test]
    fn equal_x_keeps_insertion_order() {
        let mut curve = PitchCurve::new();
        curve.add_point(PitchPoint::new(4.0, 1.0, PitchPointShape::Linear));
        curve.add_point(PitchPoint::new(4.0, 2.0, PitchPointShape::Linear));
        curve.add_point(PitchPoint::new(0.0, 3.0, PitchPointShape::Linear));
        let ys: Vec<f32> = curve.points().iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn remove_point_removes_first_match_only() {
        let mut curve = curve_with(&[1.0, 3.0, 3.0]);
        let target = PitchPoint::new(3.0, 0.0, PitchPointShape::Linear);
        curve.remove_point(&target);
        assert_eq!(xs(&curve), vec![1.0, 3.0]);

        let absent = PitchPoint::new(9.0, 0.0, PitchPointShape::Linear);
        curve.remove_point(&absent);
        assert_eq!(curve.len(), 2);
    }

    #[test]
    fn split_partitions_at_offset() {
        let mut curve = curve_with(&[1.0, 3.0, 5.0, 7.0]);
        curve.snap_first = false;
        let tail = curve.split(4);
        assert_eq!(xs(&curve), vec![1.0, 3.0]);
        assert_eq!(xs(&tail), vec![5.0, 7.0]);
        assert!(tail.snap_first);
        assert!(!curve.snap_first);
    }

    #[test]
    fn split_includes_points_at_offset() {
        let mut curve = curve_with(&[2.0, 4.0, 4.0, 6.0]);
        let tail = curve.split(4);
        assert_eq!(xs(&curve), vec![2.0]);
        assert_eq!(xs(&tail), vec![4.0, 4.0, 6.0]);
    }

    #[test]
    fn split_past_end_is_empty() {
        let mut curve = curve_with(&[1.0, 2.0]);
        let tail = curve.split(100);
        assert!(tail.is_empty());
        assert_eq!(curve.len(), 2);
    }

    #[test]
    fn clone_is_independent() {
        let original = curve_with(&[1.0, 2.0]);
        let mut copy = original.clone();
        copy.set_first_y(42.0);
        copy.add_point(PitchPoint::new(3.0, 0.0, PitchPointShape::Linear));
        assert_eq!(original.points()[0].y, 0.0);
        assert_eq!(original.len(), 2);
    }

    #[test]
    fn set_first_y_on_empty_curve_is_noop() {
        let mut curve = PitchCurve::new();
        curve.set_first_y(5.0);
        assert!(curve.is_empty());
    }

    #[test]
    fn shapes_hit_endpoints_and_midpoints() {
        for shape in [
            PitchPointShape::SineInOut,
            PitchPointShape::Linear,
            PitchPointShape::SineIn,
            PitchPointShape::SineOut,
        ] {
            assert!(shape.apply(0.0).abs() < 1e-6, "{shape:?}");
            assert!((shape.apply(1.0) - 1.0).abs() < 1e-6, "{shape:?}");
        }
        assert!((PitchPointShape::SineInOut.apply(0.5) - 0.5).abs() < 1e-6);
        assert!(PitchPointShape::SineIn.apply(0.5) < 0.5);
        assert!(PitchPointShape::SineOut.apply(0.5) > 0.5);
    }

    #[test]
    fn interpolate_holds_ends_and_eases_between() {
        let mut curve = PitchCurve::new();
        curve.add_point(PitchPoint::new(0.0, -20.0, PitchPointShape::Linear));
        curve.add_point(PitchPoint::new(100.0, 0.0, PitchPointShape::SineInOut));
        assert_eq!(curve.interpolate(-50.0), -20.0);
        assert_eq!(curve.interpolate(500.0), 0.0);
        assert!((curve.interpolate(50.0) - -10.0).abs() < 1e-4);
        assert_eq!(PitchCurve::new().interpolate(10.0), 0.0);
    }

    #[test]
    fn shape_serializes_with_short_tags() {
        let point = PitchPoint::new(1.0, 2.0, PitchPointShape::SineOut);
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("\"o\""), "{json}");
    }
}
