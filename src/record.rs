//! A [`Surface`] that records every write instead of applying it.
//!
//! The CLI prints the recorded writes as JSON lines, and the tests of every
//! component that writes to a surface assert against the log.

use crate::binder::StyleUpdate;
use crate::event::ElementRef;
use crate::scroll::PinPlacement;
use crate::traits::Surface;
use serde::Serialize;
use std::collections::BTreeSet;

/// One call made against a [`Surface`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SurfaceWrite {
    Style {
        target: ElementRef,
        #[serde(flatten)]
        style: StyleUpdate,
        /// CSS form of the transform, for readability of recorded output.
        #[serde(skip_serializing_if = "Option::is_none")]
        css: Option<String>,
    },
    Clear {
        target: ElementRef,
    },
    Hint {
        target: ElementRef,
        enabled: bool,
    },
    Pin {
        target: ElementRef,
        placement: PinPlacement,
    },
    Text {
        target: ElementRef,
        text: String,
    },
    Scroll {
        y: f64,
    },
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub writes: Vec<SurfaceWrite>,
    hints: BTreeSet<ElementRef>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Elements that currently carry a compositing hint.
    pub fn hinted(&self) -> Vec<ElementRef> {
        self.hints.iter().copied().collect()
    }

    pub fn styles_for(&self, target: ElementRef) -> Vec<StyleUpdate> {
        self.writes
            .iter()
            .filter_map(|w| match w {
                SurfaceWrite::Style { target: t, style, .. } if *t == target => Some(*style),
                _ => None,
            })
            .collect()
    }

    pub fn last_style(&self, target: ElementRef) -> Option<StyleUpdate> {
        self.styles_for(target).pop()
    }

    pub fn texts_for(&self, target: ElementRef) -> Vec<String> {
        self.writes
            .iter()
            .filter_map(|w| match w {
                SurfaceWrite::Text { target: t, text } if *t == target => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Hand out the recorded writes and start a fresh log.
    pub fn drain(&mut self) -> Vec<SurfaceWrite> {
        std::mem::take(&mut self.writes)
    }
}

impl Surface for RecordingSurface {
    fn apply_style(&mut self, target: ElementRef, style: &StyleUpdate) {
        self.writes.push(SurfaceWrite::Style {
            target,
            style: *style,
            css: style.transform.map(|t| t.to_css()),
        });
    }

    fn clear_style(&mut self, target: ElementRef) {
        self.writes.push(SurfaceWrite::Clear { target });
    }

    fn set_compositing_hint(&mut self, target: ElementRef, enabled: bool) {
        if enabled {
            self.hints.insert(target);
        } else {
            self.hints.remove(&target);
        }
        self.writes.push(SurfaceWrite::Hint { target, enabled });
    }

    fn place_pinned(&mut self, target: ElementRef, placement: &PinPlacement) {
        self.writes.push(SurfaceWrite::Pin {
            target,
            placement: *placement,
        });
    }

    fn set_text(&mut self, target: ElementRef, text: &str) {
        self.writes.push(SurfaceWrite::Text {
            target,
            text: text.to_string(),
        });
    }

    fn request_scroll(&mut self, y: f64) {
        self.writes.push(SurfaceWrite::Scroll { y });
    }
}
