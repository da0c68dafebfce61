//! Bounding-box computation over a stitch sequence.

use serde::{Deserialize, Serialize};

use super::{Command, Stitch};

/// Which commands contribute to a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsPolicy {
    /// Needle penetrations only (stitches and sequins).
    #[default]
    Sewn,
    /// Needle penetrations plus jump and trim positions.
    Traversed,
}

impl BoundsPolicy {
    /// Whether a command's position is part of the box.
    pub fn includes(self, command: Command) -> bool {
        match self {
            BoundsPolicy::Sewn => command.is_stitch_class(),
            BoundsPolicy::Traversed => command.is_stitch_class() || command.is_travel(),
        }
    }
}

/// Axis-aligned box in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Degenerate box around a single point.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Box over the stitches admitted by `policy`.
    pub fn of(stitches: &[Stitch], policy: BoundsPolicy) -> Option<Bounds> {
        let mut iter = stitches.iter().filter(|s| policy.includes(s.command));
        let first = iter.next()?;
        let mut bounds = Bounds::point(first.x, first.y);
        for s in iter {
            bounds.include(s.x, s.y);
        }
        Some(bounds)
    }

    /// Grow the box to contain a point.
    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}
