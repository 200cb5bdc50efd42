//! Tempo-synced note divisions for LFO rates and delay times.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const MIN_TEMPO: f32 = 20.0;
pub const MAX_TEMPO: f32 = 300.0;
pub const DEFAULT_TEMPO: f32 = 120.0;

/// Note length as an exact fraction of a whole note.
/// Conversions to seconds happen only at the edge, against a tempo.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteDivision {
    /// Numerator: how many parts
    pub numerator: u32,
    /// Denominator: of what size (4 = quarter, 8 = eighth, etc.)
    pub denominator: u32,
}

impl NoteDivision {
    pub const WHOLE: NoteDivision = NoteDivision::new(1, 1);
    pub const HALF: NoteDivision = NoteDivision::new(1, 2);
    pub const QUARTER: NoteDivision = NoteDivision::new(1, 4);
    pub const EIGHTH: NoteDivision = NoteDivision::new(1, 8);
    pub const SIXTEENTH: NoteDivision = NoteDivision::new(1, 16);
    pub const THIRTY_SECOND: NoteDivision = NoteDivision::new(1, 32);

    pub const DOTTED_HALF: NoteDivision = NoteDivision::HALF.dotted();
    pub const DOTTED_QUARTER: NoteDivision = NoteDivision::QUARTER.dotted();
    pub const DOTTED_EIGHTH: NoteDivision = NoteDivision::EIGHTH.dotted();
    pub const DOTTED_SIXTEENTH: NoteDivision = NoteDivision::SIXTEENTH.dotted();

    pub const HALF_TRIPLET: NoteDivision = NoteDivision::HALF.triplet();
    pub const QUARTER_TRIPLET: NoteDivision = NoteDivision::QUARTER.triplet();
    pub const EIGHTH_TRIPLET: NoteDivision = NoteDivision::EIGHTH.triplet();
    pub const SIXTEENTH_TRIPLET: NoteDivision = NoteDivision::SIXTEENTH.triplet();

    /// Parameter index order, longest first.
    pub const ALL: [NoteDivision; 14] = [
        NoteDivision::WHOLE,
        NoteDivision::DOTTED_HALF,
        NoteDivision::HALF,
        NoteDivision::HALF_TRIPLET,
        NoteDivision::DOTTED_QUARTER,
        NoteDivision::QUARTER,
        NoteDivision::QUARTER_TRIPLET,
        NoteDivision::DOTTED_EIGHTH,
        NoteDivision::EIGHTH,
        NoteDivision::EIGHTH_TRIPLET,
        NoteDivision::DOTTED_SIXTEENTH,
        NoteDivision::SIXTEENTH,
        NoteDivision::SIXTEENTH_TRIPLET,
        NoteDivision::THIRTY_SECOND,
    ];

    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Apply a dot: multiply duration by 3/2
    pub const fn dotted(self) -> Self {
        NoteDivision::new(self.numerator * 3, self.denominator * 2)
    }

    /// Three in the time of two: multiply duration by 2/3
    pub const fn triplet(self) -> Self {
        NoteDivision::new(self.numerator * 2, self.denominator * 3)
    }

    /// Look up a division by parameter index. `None` for negative indices,
    /// which mean "free running"; large indices clamp to the shortest.
    pub fn from_index(index: i32) -> Option<Self> {
        if index < 0 {
            return None;
        }
        let last = Self::ALL.len() - 1;
        Some(Self::ALL[(index as usize).min(last)])
    }

    pub fn index(self) -> i32 {
        Self::ALL
            .iter()
            .position(|&d| d == self)
            .map_or(-1, |i| i as i32)
    }

    /// Length in quarter-note beats.
    pub fn beats(self) -> f32 {
        4.0 * self.numerator as f32 / self.denominator.max(1) as f32
    }

    /// Length in seconds at `bpm`.
    pub fn seconds(self, bpm: f32) -> f32 {
        self.beats() * 60.0 / clamp_tempo(bpm)
    }

    /// Repetition rate in Hz at `bpm`.
    pub fn hz(self, bpm: f32) -> f32 {
        1.0 / self.seconds(bpm)
    }
}

#[inline]
pub fn clamp_tempo(bpm: f32) -> f32 {
    if bpm.is_nan() {
        DEFAULT_TEMPO
    } else {
        bpm.clamp(MIN_TEMPO, MAX_TEMPO)
    }
}
