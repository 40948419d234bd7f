//! The render target binder.
//!
//! A [`RenderBinder`] sits between resolved timeline values and a
//! [`Surface`].  Values are staged as often as the caller likes; only
//! [`flush`](RenderBinder::flush) writes, once per animation frame, and only
//! the parts of a style that actually changed since the previous write.
//!
//! Transform-like properties compose into one [`Transform`] per element, so
//! an animated `yPercent` and a static base rotation coexist instead of
//! overwriting each other.  Opacity and clip regions are assigned directly.

use crate::event::ElementRef;
use crate::property::{ClipInset, Property, Value};
use crate::timeline::ResolvedFrame;
use crate::traits::Surface;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

//  Transform

/// One element's composed transform.  Every channel is independent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub x_percent: f64,
    pub y_percent: f64,
    pub rotate_x: f64,
    pub rotate_y: f64,
    pub rotate_z: f64,
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        x_percent: 0.0,
        y_percent: 0.0,
        rotate_x: 0.0,
        rotate_y: 0.0,
        rotate_z: 0.0,
        scale: 1.0,
    };

    /// A pure z rotation, the usual static base transform.
    pub fn rotated(degrees: f64) -> Self {
        Self {
            rotate_z: degrees,
            ..Self::IDENTITY
        }
    }

    fn channel_mut(&mut self, property: Property) -> Option<&mut f64> {
        Some(match property {
            Property::TranslateX => &mut self.x,
            Property::TranslateY => &mut self.y,
            Property::TranslateZ => &mut self.z,
            Property::XPercent => &mut self.x_percent,
            Property::YPercent => &mut self.y_percent,
            Property::RotateX => &mut self.rotate_x,
            Property::RotateY => &mut self.rotate_y,
            Property::RotateZ => &mut self.rotate_z,
            Property::Scale => &mut self.scale,
            Property::Opacity | Property::ClipPath => return None,
        })
    }

    /// Replace one channel.  Returns `false` for non-transform properties.
    pub fn set(&mut self, property: Property, value: f64) -> bool {
        match self.channel_mut(property) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// CSS `transform` value.  Identity components are omitted.
    pub fn to_css(&self) -> String {
        if self.is_identity() {
            return "none".to_string();
        }
        let mut parts = Vec::new();
        if self.x_percent != 0.0 || self.y_percent != 0.0 {
            parts.push(format!("translate({}%, {}%)", self.x_percent, self.y_percent));
        }
        if self.x != 0.0 || self.y != 0.0 || self.z != 0.0 {
            parts.push(format!("translate3d({}px, {}px, {}px)", self.x, self.y, self.z));
        }
        for (name, deg) in [
            ("rotateX", self.rotate_x),
            ("rotateY", self.rotate_y),
            ("rotateZ", self.rotate_z),
        ] {
            if deg != 0.0 {
                parts.push(format!("{}({}deg)", name, deg));
            }
        }
        if self.scale != 1.0 {
            parts.push(format!("scale({})", self.scale));
        }
        parts.join(" ")
    }

    /// Column-major 4x4 matrix for an element of the given size, composed in
    /// the same order as [`to_css`](Self::to_css).
    pub fn to_matrix(&self, width: f64, height: f64) -> [f64; 16] {
        let tx = self.x + self.x_percent / 100.0 * width;
        let ty = self.y + self.y_percent / 100.0 * height;
        let mut m = translation(tx, ty, self.z);
        m = mul(&m, &rotation_x(self.rotate_x.to_radians()));
        m = mul(&m, &rotation_y(self.rotate_y.to_radians()));
        m = mul(&m, &rotation_z(self.rotate_z.to_radians()));
        mul(&m, &scaling(self.scale))
    }
}

type Mat4 = [f64; 16];

fn identity() -> Mat4 {
    let mut m = [0.0; 16];
    m[0] = 1.0;
    m[5] = 1.0;
    m[10] = 1.0;
    m[15] = 1.0;
    m
}

fn translation(x: f64, y: f64, z: f64) -> Mat4 {
    let mut m = identity();
    m[12] = x;
    m[13] = y;
    m[14] = z;
    m
}

fn scaling(s: f64) -> Mat4 {
    let mut m = identity();
    m[0] = s;
    m[5] = s;
    m[10] = s;
    m
}

fn rotation_x(a: f64) -> Mat4 {
    let (s, c) = a.sin_cos();
    let mut m = identity();
    m[5] = c;
    m[6] = s;
    m[9] = -s;
    m[10] = c;
    m
}

fn rotation_y(a: f64) -> Mat4 {
    let (s, c) = a.sin_cos();
    let mut m = identity();
    m[0] = c;
    m[2] = -s;
    m[8] = s;
    m[10] = c;
    m
}

fn rotation_z(a: f64) -> Mat4 {
    let (s, c) = a.sin_cos();
    let mut m = identity();
    m[0] = c;
    m[1] = s;
    m[4] = -s;
    m[5] = c;
    m
}

/// `a * b`, both column-major.
fn mul(a: &Mat4, b: &Mat4) -> Mat4 {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}

//  Styles

/// The changed parts of one element's presentation.  `None` means "leave
/// as is".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StyleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip: Option<ClipInset>,
}

impl StyleUpdate {
    pub fn is_empty(&self) -> bool {
        self.transform.is_none() && self.opacity.is_none() && self.clip.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Style {
    transform: Transform,
    opacity: Option<f64>,
    clip: Option<ClipInset>,
}

impl Style {
    fn diff(&self, previous: Option<&Style>) -> StyleUpdate {
        let Some(prev) = previous else {
            return StyleUpdate {
                transform: Some(self.transform),
                opacity: self.opacity,
                clip: self.clip,
            };
        };
        StyleUpdate {
            transform: (self.transform != prev.transform).then_some(self.transform),
            opacity: self.opacity.filter(|_| self.opacity != prev.opacity),
            clip: self.clip.filter(|_| self.clip != prev.clip),
        }
    }
}

//  RenderBinder

/// Batches resolved values and writes them to a [`Surface`] once per frame.
#[derive(Debug, Default)]
pub struct RenderBinder {
    hinted: BTreeSet<ElementRef>,
    absent: BTreeSet<ElementRef>,
    bases: BTreeMap<ElementRef, Transform>,
    current: BTreeMap<ElementRef, Style>,
    written: BTreeMap<ElementRef, Style>,
    dirty: BTreeSet<ElementRef>,
}

impl RenderBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `targets` for GPU compositing until [`detach`](Self::detach).
    pub fn attach<S: Surface + ?Sized>(&mut self, surface: &mut S, targets: &[ElementRef]) {
        for &t in targets {
            if self.hinted.insert(t) {
                surface.set_compositing_hint(t, true);
            }
        }
    }

    /// Elements the host has not rendered.  Values staged for them are
    /// dropped until the next call.
    pub fn set_absent(&mut self, targets: impl IntoIterator<Item = ElementRef>) {
        self.absent = targets.into_iter().collect();
        for target in &self.absent {
            self.current.remove(target);
            self.dirty.remove(target);
        }
    }

    /// Whether a style has been written to `target` since the last detach.
    pub fn wrote(&self, target: ElementRef) -> bool {
        self.written.contains_key(&target)
    }

    /// The element's static transform.  Animated channels replace only
    /// their own channel of it.
    pub fn set_base(&mut self, target: ElementRef, base: Transform) {
        if self.absent.contains(&target) {
            return;
        }
        self.bases.insert(target, base);
        let style = self.current.entry(target).or_default();
        style.transform = base;
        self.dirty.insert(target);
    }

    /// Stage one value for the next flush.
    pub fn stage_value(&mut self, target: ElementRef, property: Property, value: Value) {
        if self.absent.contains(&target) {
            return;
        }
        let base = self.bases.get(&target).copied().unwrap_or_default();
        let style = self.current.entry(target).or_insert_with(|| Style {
            transform: base,
            ..Style::default()
        });
        match (property, value) {
            (Property::Opacity, Value::Number(n)) => style.opacity = Some(n),
            (Property::ClipPath, Value::Clip(c)) => style.clip = Some(c),
            (p, Value::Number(n)) if p.is_transform() => {
                style.transform.set(p, n);
            }
            (p, v) => {
                debug!("ignoring {:?} for {} on {}", v, p, target);
                return;
            }
        }
        self.dirty.insert(target);
    }

    /// Stage every value of a resolved frame.  Staging twice before a flush
    /// keeps only the latest values.
    pub fn stage(&mut self, frame: &ResolvedFrame) {
        for v in &frame.values {
            self.stage_value(v.target, v.property, v.value);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Write every changed style.  Returns the number of elements written.
    pub fn flush<S: Surface + ?Sized>(&mut self, surface: &mut S) -> usize {
        let mut writes = 0;
        for target in std::mem::take(&mut self.dirty) {
            let Some(style) = self.current.get(&target).copied() else {
                continue;
            };
            let update = style.diff(self.written.get(&target));
            if update.is_empty() {
                continue;
            }
            surface.apply_style(target, &update);
            self.written.insert(target, style);
            writes += 1;
        }
        writes
    }

    /// Clear every override this binder wrote and drop the compositing
    /// hints.  The binder can be attached again afterwards.
    pub fn detach<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        for target in std::mem::take(&mut self.written).into_keys() {
            surface.clear_style(target);
        }
        for target in std::mem::take(&mut self.hinted) {
            surface.set_compositing_hint(target, false);
        }
        self.current.clear();
        self.dirty.clear();
        for (&target, &base) in &self.bases {
            self.current.insert(
                target,
                Style {
                    transform: base,
                    ..Style::default()
                },
            );
            self.dirty.insert(target);
        }
    }

    pub fn hinted(&self) -> impl Iterator<Item = ElementRef> + '_ {
        self.hinted.iter().copied()
    }
}
