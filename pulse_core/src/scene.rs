//! # Scene
//!
//! A [`Scene`] is everything currently drawn on one canvas. Redrawing a
//! profile always starts from a blank scene, so nothing from a previous,
//! possibly longer profile (or an old label) survives.
//!
//! ```rust
//! use pulse_core::scene::Scene;
//! use pulse_core::segment::{Profile, Segment};
//! use pulse_core::timeline::{Canvas, LayoutMode};
//!
//! let mut scene = Scene::new(Canvas::default());
//! let profile = Profile::new(vec![Segment::positive(5.0).unwrap()]);
//! scene.draw(&profile, LayoutMode::default());
//!
//! let svg = scene.to_svg();
//! assert!(svg.contains(r#"fill="blue""#));
//! ```

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::segment::Profile;
use crate::timeline::{layout, Canvas, LayoutMode, Rect};

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
const LABEL_FONT: &str = "sans-serif";

/// Text placed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// One drawable element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Primitive {
    Rect(Rect),
    Label(Label),
}

/// Primitives drawn on a fixed-size canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    canvas: Canvas,
    primitives: Vec<Primitive>,
}

impl Scene {
    pub fn new(canvas: Canvas) -> Self {
        Scene {
            canvas,
            primitives: Vec::new(),
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Rectangles only, in drawing order
    pub fn rects(&self) -> impl Iterator<Item = &Rect> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Rect(r) => Some(r),
            Primitive::Label(_) => None,
        })
    }

    pub fn is_blank(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Remove every primitive, labels included.
    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    /// Clear the canvas, then draw `profile` with `mode`.
    pub fn draw(&mut self, profile: &Profile, mode: LayoutMode) {
        self.clear();
        let rects = layout(profile, self.canvas, mode);
        log::debug!("Drawing {} rectangles for {} segments", rects.len(), profile.len());
        self.primitives.extend(rects.into_iter().map(Primitive::Rect));
    }

    /// Add a text label on top of whatever is drawn.
    pub fn annotate(&mut self, x: f64, y: f64, text: impl Into<String>) {
        self.primitives.push(Primitive::Label(Label {
            x,
            y,
            text: text.into(),
        }));
    }

    /// Standalone SVG document for the current scene.
    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        // Writing into a String cannot fail
        let _ = writeln!(
            svg,
            r#"<svg xmlns="{}" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            SVG_NAMESPACE,
            self.canvas.width, self.canvas.height, self.canvas.width, self.canvas.height
        );
        for primitive in &self.primitives {
            match primitive {
                Primitive::Rect(r) => {
                    let _ = writeln!(
                        svg,
                        r#"  <rect x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
                        r.x, r.y, r.width, r.height, r.fill
                    );
                }
                Primitive::Label(l) => {
                    let _ = writeln!(
                        svg,
                        r#"  <text x="{}" y="{}" font-family="{}" font-size="12">{}</text>"#,
                        l.x,
                        l.y,
                        LABEL_FONT,
                        escape_xml(&l.text)
                    );
                }
            }
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new(Canvas::default())
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
