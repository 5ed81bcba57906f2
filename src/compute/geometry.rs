//! Planar vector arithmetic and the small set of angle/segment helpers used by
//! the topology operators.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 2D point or displacement, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Cartesian vector for a polar `(radius, angle)` pair, angle in radians.
    #[inline]
    pub fn from_polar(radius: f64, angle: f64) -> Self {
        Self {
            x: radius * angle.cos(),
            y: radius * angle.sin(),
        }
    }

    /// Euclidean norm.
    #[inline]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Direction in radians, in `(-PI, PI]`.
    #[inline]
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    #[inline]
    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }

    #[inline]
    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Foot of the normal from `self` onto segment `v..w`, clamped to the
    /// segment ends. A degenerate segment returns `v`.
    pub fn closest_point_on_segment(self, v: Vec2, w: Vec2) -> Vec2 {
        let wv = w - v;
        let len_sq = wv.dot(wv);
        if len_sq == 0.0 {
            return v;
        }
        let t = (self - v).dot(wv) / len_sq;
        if t < 0.0 {
            v
        } else if t > 1.0 {
            w
        } else {
            v + wv * t
        }
    }

    /// Shortest distance from `self` to segment `v..w`.
    #[inline]
    pub fn distance_to_segment(self, v: Vec2, w: Vec2) -> f64 {
        self.distance(self.closest_point_on_segment(v, w))
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Absolute angular difference in `[0, PI]`, accounting for wraparound.
pub fn delta_angle(a: f64, b: f64) -> f64 {
    let d = a - b;
    d.sin().atan2(d.cos()).abs()
}

/// Mean of two directions along the shorter arc between them.
pub fn average_angle(a: f64, b: f64) -> f64 {
    (a.sin() + b.sin()).atan2(a.cos() + b.cos())
}
