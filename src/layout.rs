//! A [`Layout`] backed by a fixed table of rects.
//!
//! Hosts without a layout engine of their own (the CLI, the GTK preview)
//! describe the document up front, either computed or loaded from JSON:
//!
//! ```json
//! {
//!   "viewport": { "width": 1280, "height": 720 },
//!   "rects": { "hero": { "x": 0, "y": 0, "width": 1280, "height": 720 } }
//! }
//! ```

use crate::event::{ElementRef, Rect, Viewport};
use crate::scenes::ElementTable;
use crate::traits::Layout;
use log::warn;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticLayout {
    viewport: Viewport,
    rects: HashMap<ElementRef, Rect>,
}

#[derive(Debug, Deserialize)]
struct NamedLayout {
    #[serde(default)]
    viewport: Viewport,
    #[serde(default)]
    rects: BTreeMap<String, Rect>,
}

impl StaticLayout {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            rects: HashMap::new(),
        }
    }

    /// Parse a layout whose rects are keyed by element name.  Unknown names
    /// are skipped with a warning.
    pub fn from_named_json(json: &str, elements: &ElementTable) -> Result<Self, serde_json::Error> {
        let named: NamedLayout = serde_json::from_str(json)?;
        let mut layout = Self::new(named.viewport);
        for (name, rect) in named.rects {
            match elements.get(&name) {
                Some(el) => layout.insert(el, rect),
                None => warn!("layout names unknown element {:?}", name),
            }
        }
        Ok(layout)
    }

    pub fn insert(&mut self, element: ElementRef, rect: Rect) {
        self.rects.insert(element, rect);
    }

    pub fn remove(&mut self, element: ElementRef) -> Option<Rect> {
        self.rects.remove(&element)
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Lowest bottom edge of any rect, at least one viewport tall.
    pub fn extent(&self) -> f64 {
        self.rects
            .values()
            .map(Rect::bottom)
            .fold(self.viewport.height, f64::max)
    }
}

impl Layout for StaticLayout {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn element_rect(&self, element: ElementRef) -> Option<Rect> {
        self.rects.get(&element).copied()
    }
}
