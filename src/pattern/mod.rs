//! Unified in-memory embroidery pattern.
//!
//! Every codec decodes into a [`Pattern`] and encodes from one. Coordinates are
//! millimetres with +X to the right and +Y pointing down; codecs convert from
//! their native units and axis conventions at the boundary.

mod bounds;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bounds::{Bounds, BoundsPolicy};

// ============================================================================
// Commands and Stitches
// ============================================================================

/// What the machine does at a stitch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Needle penetration at the position.
    Stitch,
    /// Move the frame without sewing.
    Jump,
    /// Cut the thread.
    Trim,
    /// Switch to the next thread in the table.
    ColorChange,
    /// Pause the machine.
    Stop,
    /// End of design. Exactly one, always last.
    End,
    /// Sequin eject at the position.
    Sequin,
}

impl Command {
    /// Whether the needle penetrates the fabric (stitch or sequin).
    pub fn is_stitch_class(self) -> bool {
        matches!(self, Command::Stitch | Command::Sequin)
    }

    /// Whether the frame travels to the position without sewing.
    pub fn is_travel(self) -> bool {
        matches!(self, Command::Jump | Command::Trim)
    }

    /// Lowercase name used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Command::Stitch => "stitch",
            Command::Jump => "jump",
            Command::Trim => "trim",
            Command::ColorChange => "color change",
            Command::Stop => "stop",
            Command::End => "end",
            Command::Sequin => "sequin",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single positioned command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stitch {
    /// X position in millimetres.
    pub x: f64,
    /// Y position in millimetres (+Y down).
    pub y: f64,
    pub command: Command,
}

impl Stitch {
    pub fn new(x: f64, y: f64, command: Command) -> Self {
        Self { x, y, command }
    }

    /// Shorthand for a needle penetration.
    pub fn stitch(x: f64, y: f64) -> Self {
        Self::new(x, y, Command::Stitch)
    }

    /// Shorthand for a jump.
    pub fn jump(x: f64, y: f64) -> Self {
        Self::new(x, y, Command::Jump)
    }
}

// ============================================================================
// Threads
// ============================================================================

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Color as a `#RRGGBB` string.
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Squared euclidean distance in RGB space.
    pub fn distance_sq(&self, other: &Rgb) -> u32 {
        let dr = i32::from(self.r) - i32::from(other.r);
        let dg = i32::from(self.g) - i32::from(other.g);
        let db = i32::from(self.b) - i32::from(other.b);
        (dr * dr + dg * dg + db * db) as u32
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(c: [u8; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

/// A thread used by one or more color blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub color: Rgb,
    /// Vendor color name, when the format carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Vendor catalog number, when the format carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_number: Option<String>,
}

impl Thread {
    pub fn new(color: Rgb) -> Self {
        Self {
            color,
            description: None,
            catalog_number: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_catalog_number(mut self, catalog_number: impl Into<String>) -> Self {
        self.catalog_number = Some(catalog_number.into());
        self
    }
}

impl Default for Thread {
    fn default() -> Self {
        Thread::new(Rgb::BLACK).with_description("Black")
    }
}

// ============================================================================
// Pattern
// ============================================================================

/// Violations of the single-trailing-End invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The last stitch is not an End command.
    #[error("pattern does not end with an end command")]
    MissingEnd,

    /// An End command appears before the last position.
    #[error("end command at index {index} is not the last entry")]
    MisplacedEnd {
        /// Index of the offending End.
        index: usize,
    },
}

/// Ordered stitches plus the ordered thread table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Design label stored in formats that carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    stitches: Vec<Stitch>,
    threads: Vec<Thread>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pattern with room for `capacity` stitches.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            label: None,
            stitches: Vec::with_capacity(capacity),
            threads: Vec::new(),
        }
    }

    /// Append a command at an absolute position in millimetres.
    pub fn add(&mut self, x: f64, y: f64, command: Command) {
        self.stitches.push(Stitch::new(x, y, command));
    }

    /// Append a prepared stitch.
    pub fn push(&mut self, stitch: Stitch) {
        self.stitches.push(stitch);
    }

    /// Append a thread to the table.
    pub fn add_thread(&mut self, thread: Thread) {
        self.threads.push(thread);
    }

    pub fn stitches(&self) -> &[Stitch] {
        &self.stitches
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Whether the pattern holds no stitches at all (not even an End).
    pub fn is_empty(&self) -> bool {
        self.stitches.is_empty()
    }

    /// Position of the last recorded entry, or the origin.
    pub fn last_position(&self) -> (f64, f64) {
        self.stitches.last().map_or((0.0, 0.0), |s| (s.x, s.y))
    }

    /// Append the trailing End if it is missing.
    pub fn finish(&mut self) {
        if self.stitches.last().map(|s| s.command) != Some(Command::End) {
            let (x, y) = self.last_position();
            self.add(x, y, Command::End);
        }
    }

    /// Check that exactly one End is present and that it is last.
    pub fn validate(&self) -> Result<(), PatternError> {
        let last = self.stitches.len().checked_sub(1);
        for (index, stitch) in self.stitches.iter().enumerate() {
            if stitch.command == Command::End && Some(index) != last {
                return Err(PatternError::MisplacedEnd { index });
            }
        }
        match self.stitches.last() {
            Some(s) if s.command == Command::End => Ok(()),
            _ => Err(PatternError::MissingEnd),
        }
    }

    /// Install `thread` as the whole table when the decoder found none.
    ///
    /// Returns true when the default was applied.
    pub fn ensure_threads(&mut self, thread: &Thread) -> bool {
        if self.threads.is_empty() {
            self.threads.push(thread.clone());
            true
        } else {
            false
        }
    }

    /// Number of entries carrying `command`.
    pub fn count(&self, command: Command) -> usize {
        self.stitches.iter().filter(|s| s.command == command).count()
    }

    /// Number of needle penetrations recorded as [`Command::Stitch`].
    pub fn stitch_count(&self) -> usize {
        self.count(Command::Stitch)
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Number of color blocks: color changes plus one, or zero for a design
    /// with nothing but its End.
    pub fn color_block_count(&self) -> usize {
        let has_content = self.stitches.iter().any(|s| s.command != Command::End);
        if has_content {
            self.count(Command::ColorChange) + 1
        } else {
            0
        }
    }

    /// Thread assigned to color block `block`.
    ///
    /// Tables shorter than the block count are reused cyclically.
    pub fn thread_for_block(&self, block: usize) -> Option<&Thread> {
        if self.threads.is_empty() {
            return None;
        }
        self.threads.get(block % self.threads.len())
    }

    /// Bounding box under `policy`, or `None` when no entry qualifies.
    pub fn bounds(&self, policy: BoundsPolicy) -> Option<Bounds> {
        Bounds::of(&self.stitches, policy)
    }
}
