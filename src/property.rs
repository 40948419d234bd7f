//! Animatable presentation properties and their values.
//!
//! [`Property`] is a closed set so interpolation and composition are checked
//! exhaustively; there is no free-form property bag.

use crate::easing::lerp;
use crate::event::ElementRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every presentation property a timeline can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Property {
    /// Horizontal translation in pixels.
    TranslateX,
    /// Vertical translation in pixels.
    TranslateY,
    /// Depth translation in pixels.
    TranslateZ,
    /// Horizontal translation in percent of the element's own width.
    XPercent,
    /// Vertical translation in percent of the element's own height.
    YPercent,
    /// Degrees.
    RotateX,
    /// Degrees.
    RotateY,
    /// Degrees.
    RotateZ,
    /// Uniform scale factor.
    Scale,
    /// `0.0` (transparent) to `1.0` (opaque).
    Opacity,
    /// Rectangular clip region, see [`ClipInset`].
    ClipPath,
}

impl Property {
    /// Transform-like properties compose into one transform per element.
    pub fn is_transform(&self) -> bool {
        !matches!(self, Property::Opacity | Property::ClipPath)
    }

    /// The value a property has when nothing animates it.
    pub fn identity(&self) -> Value {
        match self {
            Property::Scale | Property::Opacity => Value::Number(1.0),
            Property::ClipPath => Value::Clip(ClipInset::NONE),
            _ => Value::Number(0.0),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            Property::ClipPath => matches!(value, Value::Clip(_)),
            _ => matches!(value, Value::Number(_)),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Property::TranslateX => "translateX",
            Property::TranslateY => "translateY",
            Property::TranslateZ => "translateZ",
            Property::XPercent => "xPercent",
            Property::YPercent => "yPercent",
            Property::RotateX => "rotateX",
            Property::RotateY => "rotateY",
            Property::RotateZ => "rotateZ",
            Property::Scale => "scale",
            Property::Opacity => "opacity",
            Property::ClipPath => "clipPath",
        };
        f.write_str(name)
    }
}

/// Clip region as percentage insets from each edge, i.e. CSS
/// `inset(top right bottom left)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClipInset {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl ClipInset {
    pub const NONE: ClipInset = ClipInset {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self { top, right, bottom, left }
    }

    /// The upper half of the box.
    pub fn top_half() -> Self {
        Self::new(0.0, 0.0, 50.0, 0.0)
    }

    /// The lower half of the box.
    pub fn bottom_half() -> Self {
        Self::new(50.0, 0.0, 0.0, 0.0)
    }

    fn lerp(&self, other: &ClipInset, t: f64) -> ClipInset {
        ClipInset {
            top: lerp(self.top, other.top, t),
            right: lerp(self.right, other.right, t),
            bottom: lerp(self.bottom, other.bottom, t),
            left: lerp(self.left, other.left, t),
        }
    }

    pub fn to_css(&self) -> String {
        format!(
            "inset({}% {}% {}% {}%)",
            self.top, self.right, self.bottom, self.left
        )
    }
}

/// A property value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Clip(ClipInset),
}

impl Value {
    /// Interpolate towards `to`.  Mismatched kinds snap to `to` once `t`
    /// reaches one and otherwise keep `self`; [`PropertyChange::new`] rejects
    /// such pairs before they reach a timeline.
    pub fn lerp(&self, to: &Value, t: f64) -> Value {
        match (self, to) {
            (Value::Number(a), Value::Number(b)) => Value::Number(lerp(*a, *b, t)),
            (Value::Clip(a), Value::Clip(b)) => Value::Clip(a.lerp(b, t)),
            _ if t >= 1.0 => *to,
            _ => *self,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Clip(_) => None,
        }
    }

    pub fn as_clip(&self) -> Option<ClipInset> {
        match self {
            Value::Clip(c) => Some(*c),
            Value::Number(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<ClipInset> for Value {
    fn from(c: ClipInset) -> Self {
        Value::Clip(c)
    }
}

/// One property of one element moving from `from` to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub target: ElementRef,
    pub property: Property,
    pub from: Value,
    pub to: Value,
}

/// A value kind that does not fit its property.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{property} on {target} cannot take a {kind} value")]
pub struct ValueKindMismatch {
    pub target: ElementRef,
    pub property: Property,
    pub kind: &'static str,
}

impl PropertyChange {
    pub fn new(
        target: ElementRef,
        property: Property,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Result<Self, ValueKindMismatch> {
        let from = from.into();
        let to = to.into();
        for v in [&from, &to] {
            if !property.accepts(v) {
                return Err(ValueKindMismatch {
                    target,
                    property,
                    kind: match v {
                        Value::Number(_) => "number",
                        Value::Clip(_) => "clip",
                    },
                });
            }
        }
        Ok(Self { target, property, from, to })
    }

    /// Value at eased local progress `eased`.
    pub fn value_at(&self, eased: f64) -> Value {
        self.from.lerp(&self.to, eased)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_classification() {
        assert!(Property::RotateZ.is_transform());
        assert!(Property::YPercent.is_transform());
        assert!(!Property::Opacity.is_transform());
        assert!(!Property::ClipPath.is_transform());
    }

    #[test]
    fn identities() {
        assert_eq!(Property::Scale.identity(), Value::Number(1.0));
        assert_eq!(Property::Opacity.identity(), Value::Number(1.0));
        assert_eq!(Property::TranslateX.identity(), Value::Number(0.0));
        assert_eq!(Property::ClipPath.identity(), Value::Clip(ClipInset::NONE));
    }

    #[test]
    fn clip_requires_clip_values() {
        let el = ElementRef(1);
        assert!(PropertyChange::new(el, Property::ClipPath, 0.0, 1.0).is_err());
        assert!(PropertyChange::new(el, Property::Opacity, ClipInset::NONE, 1.0).is_err());
        assert!(PropertyChange::new(
            el,
            Property::ClipPath,
            ClipInset::top_half(),
            ClipInset::NONE
        )
        .is_ok());
        assert!(PropertyChange::new(el, Property::Opacity, 0.0, 1.0).is_ok());
    }

    #[test]
    fn mismatch_message_names_the_property() {
        let err = PropertyChange::new(ElementRef(3), Property::ClipPath, 0.0, 1.0).unwrap_err();
        assert_eq!(err.to_string(), "clipPath on #3 cannot take a number value");
    }

    #[test]
    fn clip_interpolates_per_edge() {
        let c = PropertyChange::new(
            ElementRef(1),
            Property::ClipPath,
            ClipInset::new(0.0, 0.0, 50.0, 0.0),
            ClipInset::new(10.0, 20.0, 0.0, 40.0),
        )
        .unwrap();
        assert_eq!(
            c.value_at(0.5),
            Value::Clip(ClipInset::new(5.0, 10.0, 25.0, 20.0))
        );
    }

    #[test]
    fn clip_css() {
        assert_eq!(ClipInset::top_half().to_css(), "inset(0% 0% 50% 0%)");
    }

    #[test]
    fn property_names_round_trip_through_serde() {
        let p: Property = serde_json::from_str(r#""yPercent""#).unwrap();
        assert_eq!(p, Property::YPercent);
        assert_eq!(p.to_string(), "yPercent");
    }
}
