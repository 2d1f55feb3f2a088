//! Timing curves for transition phases and theme reveals.

use serde::{Deserialize, Serialize};

/// Linear interpolation of scalars.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * u * p0 + 3.0 * u * u * t * p1 + 3.0 * u * t * t * p2 + t * t * t * p3
}

/// CSS-style cubic-bezier timing function with fixed endpoints (0,0) and (1,1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl CubicBezier {
    pub const LINEAR: CubicBezier = CubicBezier::new(0.0, 0.0, 1.0, 1.0);
    pub const STANDARD: CubicBezier = CubicBezier::new(0.4, 0.0, 0.2, 1.0);

    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Eased progress for linear progress `t` in [0, 1].
    ///
    /// The x curve is inverted by binary search; y may overshoot [0, 1] for
    /// back-style curves, endpoints are always exact.
    pub fn ease(&self, t: f32) -> f32 {
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        let mut lo = 0.0f32;
        let mut hi = 1.0f32;
        let mut mid = t;
        for _ in 0..24 {
            mid = 0.5 * (lo + hi);
            let x = cubic_bezier(0.0, self.x1, self.x2, 1.0, mid);
            if (x - t).abs() < 1e-5 {
                break;
            }
            if x < t {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        cubic_bezier(0.0, self.y1, self.y2, 1.0, mid)
    }

    /// The curve as a CSS `easing` value.
    pub fn css(&self) -> String {
        format!(
            "cubic-bezier({}, {}, {}, {})",
            self.x1, self.y1, self.x2, self.y2
        )
    }
}

impl Default for CubicBezier {
    fn default() -> Self {
        Self::STANDARD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_exact() {
        let back = CubicBezier::new(0.34, 1.56, 0.64, 1.0);
        assert_eq!(back.ease(0.0), 0.0);
        assert_eq!(back.ease(1.0), 1.0);
        assert_eq!(back.ease(-3.0), 0.0);
        assert_eq!(back.ease(7.0), 1.0);
    }

    #[test]
    fn linear_curve_is_identity() {
        for i in 1..10 {
            let t = i as f32 / 10.0;
            assert!((CubicBezier::LINEAR.ease(t) - t).abs() < 1e-3);
        }
    }

    #[test]
    fn standard_curve_is_monotonic() {
        let mut prev = 0.0;
        for i in 1..=20 {
            let y = CubicBezier::STANDARD.ease(i as f32 / 20.0);
            assert!(y >= prev);
            prev = y;
        }
    }

    #[test]
    fn css_rendering() {
        assert_eq!(
            CubicBezier::new(0.4, 0.0, 0.2, 1.0).css(),
            "cubic-bezier(0.4, 0, 0.2, 1)"
        );
    }
}
