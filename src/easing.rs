//! Easing curves and scalar interpolation.
//!
//! Every curve maps normalized progress in `[0, 1]` to eased progress.  The
//! endpoints are exact (`0 → 0`, `1 → 1`) for every curve; in between,
//! [`Easing::Back`] and [`Easing::Elastic`] deliberately leave `[0, 1]`.
//!
//! Curves are named the way animation authors write them, as
//! `family.direction` strings:
//!
//! | Name                       | Curve                                |
//! |----------------------------|--------------------------------------|
//! | `none`, `linear`           | identity                             |
//! | `power0` … `power4`        | polynomial, exponent `n + 1`         |
//! | `quad`, `cubic`, `quart`, `quint` | aliases for `power1` … `power4` |
//! | `sine`, `expo`, `back`, `elastic`, `bounce` | the usual families  |
//! | `cubic-bezier(x1,y1,x2,y2)` | CSS timing curve                    |
//!
//! The direction suffix is `.in`, `.out` or `.inOut`; without one the curve
//! eases out.

use crate::bezier::CubicBezier;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::f64::consts::PI;
use std::fmt;

/// Which end of the curve is slow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EaseDir {
    In,
    #[default]
    Out,
    InOut,
}

/// A closed set of easing curves.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// `t^(degree + 1)`; degree 0 is linear.
    Power { degree: u8, dir: EaseDir },
    Sine(EaseDir),
    Expo(EaseDir),
    Back(EaseDir),
    Elastic(EaseDir),
    Bounce(EaseDir),
    Bezier(CubicBezier),
}

impl Easing {
    pub const fn power(degree: u8, dir: EaseDir) -> Self {
        Easing::Power { degree, dir }
    }

    /// Apply the curve to `t`, clamped to `[0, 1]` first.
    pub fn apply(&self, t: f64) -> f64 {
        if t.is_nan() || t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        match *self {
            Easing::Linear => t,
            Easing::Power { degree, dir } => {
                let exp = i32::from(degree) + 1;
                directed(dir, t, |s| s.powi(exp))
            }
            Easing::Sine(dir) => directed(dir, t, |s| 1.0 - (s * PI / 2.0).cos()),
            Easing::Expo(dir) => directed(dir, t, |s| 2.0_f64.powf(10.0 * s - 10.0)),
            Easing::Back(dir) => directed(dir, t, |s| {
                const C1: f64 = 1.70158;
                const C3: f64 = C1 + 1.0;
                C3 * s * s * s - C1 * s * s
            }),
            Easing::Elastic(dir) => directed(dir, t, elastic_in),
            Easing::Bounce(dir) => directed(dir, t, |s| 1.0 - bounce_out(1.0 - s)),
            Easing::Bezier(curve) => curve.sample(t),
        }
    }

    /// Parse an easing name such as `"power2.inOut"` or `"none"`.
    pub fn parse(name: &str) -> Option<Easing> {
        let name = name.trim();
        if let Some(args) = name
            .strip_prefix("cubic-bezier(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let nums: Vec<f64> = args
                .split(',')
                .map(|p| p.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .ok()?;
            return match nums.as_slice() {
                [x1, y1, x2, y2] => Some(Easing::Bezier(CubicBezier::new(*x1, *y1, *x2, *y2))),
                _ => None,
            };
        }

        let (family, dir) = match name.split_once('.') {
            Some((family, dir)) => (family, parse_dir(dir)?),
            None => (name, EaseDir::Out),
        };
        let family = family.to_ascii_lowercase();
        Some(match family.as_str() {
            "none" | "linear" | "power0" => Easing::Linear,
            "power1" | "quad" => Easing::power(1, dir),
            "power2" | "cubic" => Easing::power(2, dir),
            "power3" | "quart" => Easing::power(3, dir),
            "power4" | "quint" => Easing::power(4, dir),
            "sine" => Easing::Sine(dir),
            "expo" => Easing::Expo(dir),
            "back" => Easing::Back(dir),
            "elastic" => Easing::Elastic(dir),
            "bounce" => Easing::Bounce(dir),
            "ease" => Easing::Bezier(CubicBezier::ease()),
            _ => return None,
        })
    }
}

fn parse_dir(s: &str) -> Option<EaseDir> {
    match s.to_ascii_lowercase().as_str() {
        "in" => Some(EaseDir::In),
        "out" => Some(EaseDir::Out),
        "inout" => Some(EaseDir::InOut),
        _ => None,
    }
}

/// Build the directed variant of an ease-in curve.
#[inline]
fn directed(dir: EaseDir, t: f64, ease_in: impl Fn(f64) -> f64) -> f64 {
    match dir {
        EaseDir::In => ease_in(t),
        EaseDir::Out => 1.0 - ease_in(1.0 - t),
        EaseDir::InOut => {
            if t < 0.5 {
                ease_in(2.0 * t) / 2.0
            } else {
                1.0 - ease_in(2.0 - 2.0 * t) / 2.0
            }
        }
    }
}

fn elastic_in(t: f64) -> f64 {
    const C4: f64 = (2.0 * PI) / 3.0;
    -(2.0_f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * C4).sin()
}

fn bounce_out(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// Linear interpolation.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// The counter and cursor-style ease used for time-driven tweens.
pub fn ease_out_cubic(t: f64) -> f64 {
    Easing::power(2, EaseDir::Out).apply(t)
}

//  Names

impl fmt::Display for EaseDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EaseDir::In => write!(f, "in"),
            EaseDir::Out => write!(f, "out"),
            EaseDir::InOut => write!(f, "inOut"),
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => write!(f, "none"),
            Easing::Power { degree, dir } => write!(f, "power{}.{}", degree, dir),
            Easing::Sine(dir) => write!(f, "sine.{}", dir),
            Easing::Expo(dir) => write!(f, "expo.{}", dir),
            Easing::Back(dir) => write!(f, "back.{}", dir),
            Easing::Elastic(dir) => write!(f, "elastic.{}", dir),
            Easing::Bounce(dir) => write!(f, "bounce.{}", dir),
            Easing::Bezier(c) => write!(f, "cubic-bezier({},{},{},{})", c.x1, c.y1, c.x2, c.y2),
        }
    }
}

impl Serialize for Easing {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Easing {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Easing::parse(&s).ok_or_else(|| DeError::custom(format!("invalid easing: {:?}", s)))
    }
}
