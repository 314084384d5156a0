//! # pulse_core - Pulse Profile Rendering and Storage
//!
//! `pulse_core` is the heart of Pulsetrace. It turns a pulse profile computed
//! by an external generator into drawable geometry, and keeps the operator's
//! named parameter sets in a local store.
//!
//! ## Design Philosophy
//!
//! - **Validated at the edge**: generator output is parsed once into typed
//!   segments; malformed elements are skipped, never trusted
//! - **Pure rendering**: layouts are deterministic functions of their inputs
//! - **Loud storage**: every store failure reaches the caller as a [`PulseError`]
//! - **JSON-First**: profiles, primitives and errors all serialize
//!
//! ## Quick Start
//!
//! ```rust
//! use pulse_core::segment::ParsedProfile;
//! use pulse_core::scene::Scene;
//! use pulse_core::timeline::LayoutMode;
//!
//! let parsed = ParsedProfile::from_json(
//!     r#"[{"type":"Positive Pulse","duration":100},{"type":"Rest","duration":100}]"#,
//! ).unwrap();
//!
//! let mut scene = Scene::default();
//! scene.draw(&parsed.profile, LayoutMode::default());
//! assert_eq!(scene.rects().count(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`segment`] - Generator output validation and the profile model
//! - [`timeline`] - Timeline and bar chart layouts
//! - [`scene`] - Canvas state and SVG output
//! - [`profile`] - Saved parameter sets and generator request bodies
//! - [`store`] - Profile store over a durable slot
//! - [`file_io`] - Atomic writes and store locking
//! - [`errors`] - Structured error types

pub mod errors;
pub mod file_io;
pub mod profile;
pub mod scene;
pub mod segment;
pub mod store;
pub mod timeline;

// Re-export commonly used types at crate root for convenience
pub use errors::{PulseError, PulseResult};
pub use profile::{GeneratorParams, ParamValue, Polarity, ProfileEdit, ProfileId, StoredProfile};
pub use scene::Scene;
pub use segment::{ParsedProfile, Profile, Segment, SegmentKind};
pub use store::{FileSlot, MemorySlot, ProfileStore, StorageSlot};
pub use timeline::{Canvas, Fill, LaneLayout, LayoutMode, Rect};
