//! CSS-like cubic Bézier timing curves.

use serde::{Deserialize, Serialize};

/// A `cubic-bezier(x1, y1, x2, y2)` timing curve.
///
/// Control points are (0,0), (x1,y1), (x2,y2), (1,1).  `x1` and `x2` must
/// lie in `[0, 1]` for the curve to be a function of time; values outside
/// that range are clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CubicBezier {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.clamp(0.0, 1.0),
            y1,
            x2: x2.clamp(0.0, 1.0),
            y2,
        }
    }

    /// CSS `ease` == cubic-bezier(0.25, 0.1, 0.25, 1.0)
    pub fn ease() -> Self {
        Self::new(0.25, 0.10, 0.25, 1.00)
    }

    /// Eased output for normalized time `u` in [0,1].
    pub fn sample(&self, u: f64) -> f64 {
        let u = u.clamp(0.0, 1.0);
        if u == 0.0 || u == 1.0 {
            return u;
        }
        let (ax, bx, cx) = coefficients(self.x1, self.x2);
        let (ay, by, cy) = coefficients(self.y1, self.y2);
        let t = solve_t_for_x(u, ax, bx, cx);
        sample_curve(ay, by, cy, t)
    }
}

/// Polynomial coefficients of one axis with endpoints fixed at 0 and 1:
/// B(t) = ((a*t + b)*t + c)*t
fn coefficients(p1: f64, p2: f64) -> (f64, f64, f64) {
    let c = 3.0 * p1;
    let b = 3.0 * (p2 - p1) - c;
    let a = 1.0 - c - b;
    (a, b, c)
}

#[inline]
fn sample_curve(a: f64, b: f64, c: f64, t: f64) -> f64 {
    ((a * t + b) * t + c) * t
}

/// Solve x(t) = u for t in [0,1].
fn solve_t_for_x(u: f64, ax: f64, bx: f64, cx: f64) -> f64 {
    // Newton-Raphson
    let mut t = u;
    for _ in 0..8 {
        let x = sample_curve(ax, bx, cx, t) - u;
        if x.abs() < 1e-9 {
            return t;
        }
        let dx = (3.0 * ax * t + 2.0 * bx) * t + cx;
        if dx.abs() < 1e-9 {
            break;
        }
        t -= x / dx;
        if !(0.0..=1.0).contains(&t) {
            break;
        }
    }

    // Bisection fallback
    let mut lo = 0.0;
    let mut hi = 1.0;
    t = u;
    for _ in 0..40 {
        let x = sample_curve(ax, bx, cx, t);
        if (x - u).abs() < 1e-10 {
            return t;
        }
        if x < u {
            lo = t;
        } else {
            hi = t;
        }
        t = 0.5 * (lo + hi);
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_exact() {
        let c = CubicBezier::ease();
        assert_eq!(c.sample(0.0), 0.0);
        assert_eq!(c.sample(1.0), 1.0);
    }

    #[test]
    fn linear_control_points_are_identity() {
        let c = CubicBezier::new(1.0 / 3.0, 1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0);
        for i in 0..=10 {
            let u = i as f64 / 10.0;
            assert!((c.sample(u) - u).abs() < 1e-6, "u={u}");
        }
    }

    #[test]
    fn ease_is_ahead_of_linear_in_the_middle() {
        let c = CubicBezier::ease();
        assert!(c.sample(0.5) > 0.5);
    }

    #[test]
    fn control_x_is_clamped() {
        let c = CubicBezier::new(-1.0, 0.0, 2.0, 1.0);
        assert_eq!(c.x1, 0.0);
        assert_eq!(c.x2, 1.0);
    }
}
