// Tick/time conversion.
//
// Note positions and durations are measured in ticks, which are independent
// of tempo. Vibrato period is specified in milliseconds, so sampling the
// oscillator needs a way to turn milliseconds into ticks. `TickTimeline` is
// that seam; `Tempo` is the constant-tempo implementation used by the CLI,
// the renderer, and tests.
//
// See also: `vibrato.rs` (`normalized_period`, `period_start_end`),
// `config.rs` which builds a `Tempo` from `ProjectConfig`.

use serde::{Deserialize, Serialize};

/// Ticks per quarter note used when no resolution is configured.
pub const DEFAULT_RESOLUTION: u32 = 480;

/// Tempo used when none is configured.
pub const DEFAULT_BPM: f64 = 120.0;

/// Maps wall-clock milliseconds onto the tick axis.
pub trait TickTimeline {
    /// Convert a duration in milliseconds into (fractional) ticks.
    fn ms_to_ticks(&self, ms: f64) -> f64;

    /// Convert a duration in ticks into milliseconds.
    fn ticks_to_ms(&self, ticks: f64) -> f64;
}

/// A single fixed tempo over the whole timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    /// Quarter notes per minute.
    pub bpm: f64,
    /// Ticks per quarter note.
    pub resolution: u32,
}

impl Tempo {
    pub fn new(bpm: f64, resolution: u32) -> Self {
        Tempo { bpm, resolution }
    }

    /// Milliseconds per tick at this tempo.
    fn ms_per_tick(&self) -> f64 {
        60_000.0 / (self.bpm * self.resolution as f64)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo::new(DEFAULT_BPM, DEFAULT_RESOLUTION)
    }
}

impl TickTimeline for Tempo {
    fn ms_to_ticks(&self, ms: f64) -> f64 {
        ms / self.ms_per_tick()
    }

    fn ticks_to_ms(&self, ticks: f64) -> f64 {
        ticks * self.ms_per_tick()
    }
}
