//! # Timeline Renderer
//!
//! Maps a validated [`Profile`] to rectangle primitives on a fixed-size canvas.
//! Two layouts are available:
//!
//! - [`LayoutMode::Timeline`]: every segment is placed on the time axis in
//!   proportion to its duration, in a lane chosen by its category.
//! - [`LayoutMode::BarChart`]: one equal-width column per segment, heights
//!   normalized against the longest segment.
//!
//! Both layouts are pure and deterministic. Degenerate profiles (empty, or all
//! durations zero) never divide by zero.
//!
//! ## Example
//!
//! ```rust
//! use pulse_core::segment::{Profile, Segment};
//! use pulse_core::timeline::{layout_timeline, Fill, LaneLayout};
//!
//! let profile = Profile::new(vec![
//!     Segment::positive(100.0).unwrap(),
//!     Segment::negative(300.0).unwrap(),
//!     Segment::other("Rest", 100.0).unwrap(),
//! ]);
//!
//! let rects = layout_timeline(&profile, 800.0, &LaneLayout::default());
//! assert_eq!(rects[1].x, 160.0);
//! assert_eq!(rects[1].width, 480.0);
//! assert_eq!(rects[1].fill, Fill::Red);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::segment::{Profile, SegmentKind};

/// Default canvas width, matching the operator display
pub const DEFAULT_WIDTH: f64 = 800.0;

/// Default canvas height
pub const DEFAULT_HEIGHT: f64 = 200.0;

/// Fill color of a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fill {
    Blue,
    Red,
    Gray,
}

impl Fill {
    /// CSS/SVG color keyword
    pub fn css_name(&self) -> &'static str {
        match self {
            Fill::Blue => "blue",
            Fill::Red => "red",
            Fill::Gray => "gray",
        }
    }
}

impl fmt::Display for Fill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_name())
    }
}

/// Horizontal band of the timeline reserved for one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lane {
    Positive,
    Negative,
    Neutral,
}

impl Lane {
    /// 1-based lane number, top to bottom
    pub fn number(&self) -> u8 {
        match self {
            Lane::Positive => 1,
            Lane::Negative => 2,
            Lane::Neutral => 3,
        }
    }

    pub fn fill(&self) -> Fill {
        match self {
            Lane::Positive => Fill::Blue,
            Lane::Negative => Fill::Red,
            Lane::Neutral => Fill::Gray,
        }
    }
}

impl From<&SegmentKind> for Lane {
    fn from(kind: &SegmentKind) -> Self {
        match kind {
            SegmentKind::PositivePulse => Lane::Positive,
            SegmentKind::NegativePulse => Lane::Negative,
            SegmentKind::Other(_) => Lane::Neutral,
        }
    }
}

/// Color used for a segment category in both layouts
pub fn fill_for(kind: &SegmentKind) -> Fill {
    Lane::from(kind).fill()
}

/// Vertical placement of the three lanes in timeline mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneLayout {
    /// Top edge of lanes 1, 2 and 3
    pub lane_tops: [f64; 3],
    /// Height of every lane
    pub lane_height: f64,
}

impl LaneLayout {
    pub fn top_of(&self, lane: Lane) -> f64 {
        self.lane_tops[usize::from(lane.number() - 1)]
    }
}

impl Default for LaneLayout {
    fn default() -> Self {
        LaneLayout {
            lane_tops: [50.0, 100.0, 150.0],
            lane_height: 30.0,
        }
    }
}

/// Canvas dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Canvas { width, height }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Canvas::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

/// Axis-aligned filled rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Fill,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Which layout strategy to draw with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LayoutMode {
    /// Proportional-duration placement in category lanes
    Timeline(LaneLayout),
    /// Max-normalized bar chart, one bar per segment
    BarChart,
}

impl Default for LayoutMode {
    fn default() -> Self {
        LayoutMode::Timeline(LaneLayout::default())
    }
}

/// Lay a profile out with the given mode.
pub fn layout(profile: &Profile, canvas: Canvas, mode: LayoutMode) -> Vec<Rect> {
    match mode {
        LayoutMode::Timeline(lanes) => layout_timeline(profile, canvas.width, &lanes),
        LayoutMode::BarChart => layout_bars(profile, canvas),
    }
}

/// Proportional timeline layout.
///
/// Each segment starts where the previous one ended; widths sum to `width`.
/// Returns nothing when the total duration is zero.
pub fn layout_timeline(profile: &Profile, width: f64, lanes: &LaneLayout) -> Vec<Rect> {
    let (scale, total) = timeline_scale(profile);
    if total <= 0.0 {
        log::debug!("Timeline layout skipped: degenerate profile ({} segments)", profile.len());
        return Vec::new();
    }

    let mut elapsed = 0.0;
    profile
        .segments()
        .iter()
        .map(|segment| {
            let lane = Lane::from(&segment.kind);
            let x = elapsed / total * width;
            elapsed += segment.duration / scale;
            // Derive the right edge from the running sum so neighbours share it exactly
            let right = elapsed / total * width;
            Rect {
                x,
                y: lanes.top_of(lane),
                width: right - x,
                height: lanes.lane_height,
                fill: lane.fill(),
            }
        })
        .collect()
}

/// Divisor applied to every duration, and the scaled total.
///
/// Durations are used as-is unless their sum overflows, in which case they
/// are measured in units of the longest segment instead.
fn timeline_scale(profile: &Profile) -> (f64, f64) {
    let total = profile.total_duration();
    if total.is_finite() {
        return (1.0, total);
    }
    let max = profile.max_duration();
    log::warn!("Total duration overflows; scaling {} segments by {}", profile.len(), max);
    let scaled: f64 = profile.segments().iter().map(|s| s.duration / max).sum();
    (max, scaled)
}

/// Duration-normalized bar chart layout.
///
/// The longest segment spans the full canvas height. When every duration is
/// zero the bars are drawn with zero height on the baseline.
pub fn layout_bars(profile: &Profile, canvas: Canvas) -> Vec<Rect> {
    let count = profile.len();
    if count == 0 {
        return Vec::new();
    }

    let bar_width = canvas.width / count as f64;
    let max = profile.max_duration();

    profile
        .segments()
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            // Ratio first so the longest bar lands on exactly `canvas.height`
            let bar_height = if max > 0.0 {
                segment.duration / max * canvas.height
            } else {
                0.0
            };
            Rect {
                x: i as f64 * bar_width,
                y: canvas.height - bar_height,
                width: bar_width,
                height: bar_height,
                fill: fill_for(&segment.kind),
            }
        })
        .collect()
}
