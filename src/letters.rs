//! Hero letter dispersion.
//!
//! The hero title is split into one node per character.  Each text line
//! reports its character nodes once it has rendered; when every expected
//! line has reported, the effect takes a one-shot snapshot of each
//! character's target rotation from its position relative to the viewport
//! center.  Scrolling through the configured progress sub-range then fades,
//! shrinks and rotates every character towards its snapshot.
//!
//! ```text
//! Collecting ──all lines reported──▶ Ready ◀──▶ AnimatingOut
//!      │                               │            │
//!      └───────────────dispose─────────┴────────────┴──▶ Disposed
//! ```
//!
//! The snapshot never changes afterwards: resizes and late reports do not
//! touch the rotations already computed.

use crate::binder::RenderBinder;
use crate::easing::{lerp, EaseDir, Easing};
use crate::event::{ElementRef, Rect, Viewport};
use crate::property::{Property, Value};
use crate::traits::Surface;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Tuning of the dispersion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterParams {
    /// Rotation of a character at a viewport corner, in degrees.
    pub max_rotation_deg: f64,
    /// Scale a character shrinks to at the end of the range.
    pub scale_to: f64,
    /// Driving progress at which dispersion begins.
    pub range_start: f64,
    /// Driving progress at which every character is gone.
    pub range_end: f64,
    pub easing: Easing,
}

impl Default for LetterParams {
    fn default() -> Self {
        Self {
            max_rotation_deg: 90.0,
            scale_to: 0.5,
            range_start: 0.0,
            range_end: 0.18,
            easing: Easing::power(2, EaseDir::InOut),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterState {
    Collecting,
    Ready,
    AnimatingOut,
    Disposed,
}

/// Target rotation of one character, degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Rotation {
    /// Rotation for a character centered at `center` (viewport coordinates).
    pub fn for_position(center: (f64, f64), viewport: Viewport, max: f64) -> Self {
        let half_w = viewport.width / 2.0;
        let half_h = viewport.height / 2.0;
        let norm = |v: f64, half: f64| {
            if half > 0.0 {
                ((v - half) / half).clamp(-1.0, 1.0)
            } else {
                0.0
            }
        };
        let nx = norm(center.0, half_w);
        let ny = norm(center.1, half_h);
        Self {
            x: -ny * max,
            y: nx * max,
            z: nx * ny * max / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Letter {
    element: ElementRef,
    rotation: Rotation,
}

/// The letter dispersion state machine.
#[derive(Debug)]
pub struct LetterDispersion {
    params: LetterParams,
    state: LetterState,
    expected_lines: usize,
    reported_lines: BTreeSet<u32>,
    /// Characters reported while collecting, with their viewport rects.
    pending: Vec<(ElementRef, Rect)>,
    letters: Vec<Letter>,
    seen: HashSet<ElementRef>,
    binder: RenderBinder,
}

impl LetterDispersion {
    pub fn new(params: LetterParams, expected_lines: usize) -> Self {
        Self {
            params,
            state: LetterState::Collecting,
            expected_lines,
            reported_lines: BTreeSet::new(),
            pending: Vec::new(),
            letters: Vec::new(),
            seen: HashSet::new(),
            binder: RenderBinder::new(),
        }
    }

    pub fn state(&self) -> LetterState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.letters.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot rotation of `element`, once ready.
    pub fn rotation_of(&self, element: ElementRef) -> Option<Rotation> {
        self.letters
            .iter()
            .find(|l| l.element == element)
            .map(|l| l.rotation)
    }

    /// A text line reports its rendered characters with their rects in
    /// viewport coordinates.  Characters already known are ignored.
    pub fn report<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        line: u32,
        chars: &[(ElementRef, Rect)],
        viewport: Viewport,
    ) {
        if self.state == LetterState::Disposed {
            debug!("letter report for line {} after dispose ignored", line);
            return;
        }
        let fresh: Vec<(ElementRef, Rect)> = chars
            .iter()
            .copied()
            .filter(|(el, _)| self.seen.insert(*el))
            .collect();
        self.reported_lines.insert(line);

        match self.state {
            LetterState::Collecting => {
                self.pending.extend(fresh);
                if self.reported_lines.len() >= self.expected_lines {
                    let pending = std::mem::take(&mut self.pending);
                    self.capture(surface, &pending, viewport);
                    self.state = LetterState::Ready;
                    info!("letter snapshot taken for {} characters", self.letters.len());
                }
            }
            LetterState::Ready | LetterState::AnimatingOut => {
                if !fresh.is_empty() {
                    debug!("merging {} late characters from line {}", fresh.len(), line);
                    self.capture(surface, &fresh, viewport);
                }
            }
            LetterState::Disposed => {}
        }
    }

    fn capture<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        chars: &[(ElementRef, Rect)],
        viewport: Viewport,
    ) {
        let elements: Vec<ElementRef> = chars.iter().map(|(el, _)| *el).collect();
        self.binder.attach(surface, &elements);
        for &(element, rect) in chars {
            self.letters.push(Letter {
                element,
                rotation: Rotation::for_position(
                    rect.center(),
                    viewport,
                    self.params.max_rotation_deg,
                ),
            });
        }
    }

    /// Local progress of the dispersion for driving progress `progress`.
    fn local(&self, progress: f64) -> f64 {
        let span = self.params.range_end - self.params.range_start;
        if !(span > 0.0) {
            return if progress >= self.params.range_start { 1.0 } else { 0.0 };
        }
        ((progress - self.params.range_start) / span).clamp(0.0, 1.0)
    }

    /// Stage every character's style for driving progress `progress`.
    pub fn update(&mut self, progress: f64) {
        if !matches!(self.state, LetterState::Ready | LetterState::AnimatingOut) {
            return;
        }
        let t = self.params.easing.apply(self.local(progress));
        self.state = if t > 0.0 {
            LetterState::AnimatingOut
        } else {
            LetterState::Ready
        };
        let scale = lerp(1.0, self.params.scale_to, t);
        for letter in &self.letters {
            let el = letter.element;
            let r = letter.rotation;
            self.binder.stage_value(el, Property::Opacity, Value::Number(1.0 - t));
            self.binder.stage_value(el, Property::Scale, Value::Number(scale));
            self.binder.stage_value(el, Property::RotateX, Value::Number(r.x * t));
            self.binder.stage_value(el, Property::RotateY, Value::Number(r.y * t));
            self.binder.stage_value(el, Property::RotateZ, Value::Number(r.z * t));
        }
    }

    pub fn flush<S: Surface + ?Sized>(&mut self, surface: &mut S) -> usize {
        self.binder.flush(surface)
    }

    /// Clear every per-character override and forget the captured set.
    pub fn dispose<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        if self.state == LetterState::Disposed {
            return;
        }
        self.binder.detach(surface);
        self.letters.clear();
        self.pending.clear();
        self.seen.clear();
        self.reported_lines.clear();
        self.state = LetterState::Disposed;
    }
}
