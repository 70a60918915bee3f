//! Drop positions and row-band geometry.
//!
//! A pointer hovering over a candidate row lands in one of three vertical
//! bands: the top band reorders above the row, the bottom band reorders
//! below it, and the middle band nests inside it. The band edges are
//! fractions of the row height and can be tuned, subject to
//! `0 < above < below < 1`. Top-level insertion (`Root`) is reached through
//! a dedicated hover call, never through band classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default upper edge of the "insert above" band.
pub const ABOVE_BAND: f32 = 0.25;
/// Default lower edge of the "insert below" band.
pub const BELOW_BAND: f32 = 0.75;

/// Where a dragged node lands relative to the candidate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPosition {
    /// Insert as the previous sibling of the target.
    Above,
    /// Insert as the next sibling of the target.
    Below,
    /// Nest as the target's last child.
    Inside,
    /// Append at the top level; no sibling context.
    Root,
}

impl DropPosition {
    /// Classifies a pointer's vertical fraction within a row (0.0 at the
    /// top edge, 1.0 at the bottom) using the default bands.
    #[must_use]
    pub fn from_row_fraction(fraction: f32) -> Self {
        DropBands::default().classify(fraction)
    }
}

impl fmt::Display for DropPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Above => "above",
            Self::Below => "below",
            Self::Inside => "inside",
            Self::Root => "root",
        };
        f.write_str(name)
    }
}

/// Vertical hit bands mapping a row fraction to a [`DropPosition`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropBands {
    above: f32,
    below: f32,
}

impl Default for DropBands {
    fn default() -> Self {
        Self {
            above: ABOVE_BAND,
            below: BELOW_BAND,
        }
    }
}

impl DropBands {
    /// Custom band edges. Fails unless `0 < above < below < 1`.
    pub fn new(above: f32, below: f32) -> Result<Self, InvalidBands> {
        let ordered = above > 0.0 && above < below && below < 1.0;
        if ordered && above.is_finite() && below.is_finite() {
            Ok(Self { above, below })
        } else {
            Err(InvalidBands { above, below })
        }
    }

    #[must_use]
    pub fn above(self) -> f32 {
        self.above
    }

    #[must_use]
    pub fn below(self) -> f32 {
        self.below
    }

    /// Maps a row fraction to a position. Out-of-range fractions clamp to
    /// the nearest band, so jittery pointer coordinates never panic.
    #[must_use]
    pub fn classify(self, fraction: f32) -> DropPosition {
        if fraction < self.above {
            DropPosition::Above
        } else if fraction > self.below {
            DropPosition::Below
        } else {
            DropPosition::Inside
        }
    }
}

/// Rejected band geometry; edges must satisfy `0 < above < below < 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidBands {
    pub above: f32,
    pub below: f32,
}

impl fmt::Display for InvalidBands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "drop bands must satisfy 0 < above < below < 1, got above={} below={}",
            self.above, self.below
        )
    }
}

impl std::error::Error for InvalidBands {}
