//! # Profile Segments
//!
//! The generator answers with a JSON array of `{ "type": ..., "duration": ... }`
//! objects. That payload is untrusted: it is validated here, once, into
//! [`Segment`] values. Everything downstream (the renderer in particular) only
//! ever sees validated segments.
//!
//! ## Parse policy
//!
//! - A top-level value that is not an array fails with
//!   [`PulseError::MalformedProfile`].
//! - An element that is not an object, or whose `duration` is missing,
//!   non-numeric or negative, is skipped and recorded as a [`SegmentIssue`].
//! - A missing or non-string `type` is not an error: the segment is neutral.
//!
//! ## Example
//!
//! ```rust
//! use pulse_core::segment::{ParsedProfile, SegmentKind};
//!
//! let parsed = ParsedProfile::from_json(
//!     r#"[{"type":"Positive Pulse","duration":100},{"duration":"oops"}]"#,
//! ).unwrap();
//!
//! assert_eq!(parsed.profile.len(), 1);
//! assert_eq!(parsed.profile.segments()[0].kind, SegmentKind::PositivePulse);
//! assert_eq!(parsed.issues.len(), 1);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{PulseError, PulseResult};

/// Wire label for positive pulses
pub const POSITIVE_PULSE: &str = "Positive Pulse";

/// Wire label for negative pulses
pub const NEGATIVE_PULSE: &str = "Negative Pulse";

/// Segment category.
///
/// Only the two pulse labels are recognised; any other label (including an
/// empty one for a missing `type`) is kept verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SegmentKind {
    PositivePulse,
    NegativePulse,
    Other(String),
}

impl SegmentKind {
    /// Classify a wire label. Matching is exact, as the generator emits it.
    pub fn from_label(label: &str) -> Self {
        match label {
            POSITIVE_PULSE => SegmentKind::PositivePulse,
            NEGATIVE_PULSE => SegmentKind::NegativePulse,
            other => SegmentKind::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            SegmentKind::PositivePulse => POSITIVE_PULSE,
            SegmentKind::NegativePulse => NEGATIVE_PULSE,
            SegmentKind::Other(label) => label,
        }
    }

    /// True for anything that is not a pulse (rests, gaps, unknown labels)
    pub fn is_neutral(&self) -> bool {
        matches!(self, SegmentKind::Other(_))
    }
}

impl From<String> for SegmentKind {
    fn from(label: String) -> Self {
        SegmentKind::from_label(&label)
    }
}

impl From<SegmentKind> for String {
    fn from(kind: SegmentKind) -> Self {
        kind.label().to_string()
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One validated, timed unit of a pulse profile.
///
/// `duration` is in milliseconds, finite and never negative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub duration: f64,
}

impl Segment {
    /// Build a segment from trusted values, rejecting negative or non-finite durations.
    pub fn new(kind: SegmentKind, duration: f64) -> PulseResult<Self> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(PulseError::invalid_input(
                "duration",
                duration.to_string(),
                "Duration must be a finite, non-negative number of milliseconds",
            ));
        }
        Ok(Segment { kind, duration })
    }

    pub fn positive(duration: f64) -> PulseResult<Self> {
        Segment::new(SegmentKind::PositivePulse, duration)
    }

    pub fn negative(duration: f64) -> PulseResult<Self> {
        Segment::new(SegmentKind::NegativePulse, duration)
    }

    pub fn other(label: impl Into<String>, duration: f64) -> PulseResult<Self> {
        Segment::new(SegmentKind::Other(label.into()), duration)
    }
}

/// Ordered sequence of segments. Insertion order is time order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Profile {
    segments: Vec<Segment>,
}

impl Profile {
    pub fn new(segments: Vec<Segment>) -> Self {
        Profile { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of all segment durations (ms)
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Longest single segment (ms), or 0 for an empty profile
    pub fn max_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).fold(0.0, f64::max)
    }

    /// Empty, or every duration is zero. Nothing meaningful can be scaled.
    pub fn is_degenerate(&self) -> bool {
        self.total_duration() <= 0.0
    }
}

impl FromIterator<Segment> for Profile {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Profile::new(iter.into_iter().collect())
    }
}

/// Why an element of the generator payload was skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason")]
pub enum IssueReason {
    NotAnObject,
    MissingDuration,
    NonNumericDuration { found: String },
    NegativeDuration { duration: f64 },
}

impl fmt::Display for IssueReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueReason::NotAnObject => write!(f, "element is not an object"),
            IssueReason::MissingDuration => write!(f, "missing 'duration'"),
            IssueReason::NonNumericDuration { found } => {
                write!(f, "'duration' is not a number: {}", found)
            }
            IssueReason::NegativeDuration { duration } => {
                write!(f, "'duration' is negative: {}", duration)
            }
        }
    }
}

/// A malformed element that was skipped during parsing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentIssue {
    /// Position in the original payload
    pub index: usize,
    #[serde(flatten)]
    pub reason: IssueReason,
}

/// Result of validating a generator payload: the usable profile plus
/// whatever had to be dropped on the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedProfile {
    pub profile: Profile,
    pub issues: Vec<SegmentIssue>,
}

impl ParsedProfile {
    /// Parse raw generator output.
    pub fn from_json(raw: &str) -> PulseResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| PulseError::malformed_profile(format!("Invalid JSON: {}", e)))?;
        ParsedProfile::from_value(&value)
    }

    /// Validate an already-decoded JSON value.
    pub fn from_value(value: &Value) -> PulseResult<Self> {
        let items = value.as_array().ok_or_else(|| {
            PulseError::malformed_profile(format!(
                "expected an array of segments, found {}",
                json_type_name(value)
            ))
        })?;

        let mut segments = Vec::with_capacity(items.len());
        let mut issues = Vec::new();

        for (index, item) in items.iter().enumerate() {
            match parse_segment(item) {
                Ok(segment) => segments.push(segment),
                Err(reason) => {
                    log::warn!("Skipping segment {}: {}", index, reason);
                    issues.push(SegmentIssue { index, reason });
                }
            }
        }

        Ok(ParsedProfile {
            profile: Profile::new(segments),
            issues,
        })
    }

    /// True when every element of the payload was usable
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

fn parse_segment(item: &Value) -> Result<Segment, IssueReason> {
    let object = item.as_object().ok_or(IssueReason::NotAnObject)?;

    let duration = match object.get("duration") {
        None | Some(Value::Null) => return Err(IssueReason::MissingDuration),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| IssueReason::NonNumericDuration {
            found: n.to_string(),
        })?,
        Some(other) => {
            return Err(IssueReason::NonNumericDuration {
                found: other.to_string(),
            })
        }
    };
    if duration < 0.0 {
        return Err(IssueReason::NegativeDuration { duration });
    }

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .map(SegmentKind::from_label)
        .unwrap_or_else(|| SegmentKind::Other(String::new()));

    Ok(Segment { kind, duration })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
