//! Host events and geometry types used throughout scrubline.
//!
//! This module defines the vocabulary shared by every component:
//! [`HostEvent`] describes every input the host environment feeds in, and
//! [`ElementRef`] / [`Rect`] / [`Viewport`] describe the visual nodes the
//! engine animates without owning them.
//!
//! # Wire format
//!
//! Host events are JSON-encoded one per line:
//!
//! ```json
//! {"Resize":{"width":1280,"height":720}}
//! {"Scroll":{"y":640}}
//! {"Frame":{"time":0.016}}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-owning reference to a visual node supplied by the host.
///
/// The engine only ever mutates presentation properties through a
/// [`Surface`](crate::traits::Surface); the node itself belongs to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementRef(pub u32);

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An axis-aligned box in pixels.
///
/// [`Layout::element_rect`](crate::traits::Layout::element_rect) reports
/// rects in **document** coordinates (independent of the current scroll
/// offset); letter snapshots use viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Size of the visible viewport in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Every input the host environment delivers.
///
/// Events are processed one at a time on a single thread; no handler ever
/// re-enters another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostEvent {
    /// The document scrolled to vertical offset `y` (pixels).
    Scroll { y: f64 },
    /// The viewport changed size.
    Resize { width: f64, height: f64 },
    /// An animation frame is due; `time` is monotonic wall-clock seconds.
    Frame { time: f64 },
}

/// The three listener kinds a mounted component may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Scroll,
    Resize,
    Frame,
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerKind::Scroll => write!(f, "scroll"),
            ListenerKind::Resize => write!(f, "resize"),
            ListenerKind::Frame => write!(f, "frame"),
        }
    }
}
