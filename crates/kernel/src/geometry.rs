//! Geometry primitives shared by the quadtree and the worker protocols.

use std::ops::{Add, AddAssign, Mul, Sub};

use bytemuck::{Pod, Zeroable};

/// Sentinel coordinate for bounds that contain no points yet.
///
/// Kept finite (rather than `f32::INFINITY`) so that distances computed
/// against an empty rectangle stay free of NaN.
const BOUNDS_SENTINEL: f32 = 1.0e30;

/// 2D vector of 32-bit floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vec2 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Construct a vector from components.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    #[inline]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Squared Euclidean length.
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
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

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Closed axis-aligned rectangle, `min` corner to `max` corner.
///
/// An empty rectangle is represented by the inverted sentinel corners of
/// [`Bounds::EMPTY`]; expanding it with the first point produces a
/// zero-area rectangle at that point.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Bounds {
    /// Minimum corner.
    pub min: Vec2,
    /// Maximum corner.
    pub max: Vec2,
}

impl Bounds {
    /// The empty rectangle (inverted sentinel corners).
    pub const EMPTY: Bounds = Bounds {
        min: Vec2::new(BOUNDS_SENTINEL, BOUNDS_SENTINEL),
        max: Vec2::new(-BOUNDS_SENTINEL, -BOUNDS_SENTINEL),
    };

    /// Construct a rectangle from corners.
    #[inline]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Smallest rectangle enclosing every position in `points`.
    pub fn enclosing(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut bounds = Bounds::EMPTY;
        for p in points {
            bounds.expand(p);
        }
        bounds
    }

    /// Grow the rectangle to include `p`.
    #[inline]
    pub fn expand(&mut self, p: Vec2) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// True if no point has been added yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Midpoint of the rectangle.
    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Shortest distance from `p` to the rectangle, zero if `p` is inside.
    #[inline]
    pub fn distance_to_point(&self, p: Vec2) -> f32 {
        let dx = (self.min.x - p.x).max(p.x - self.max.x).max(0.0);
        let dy = (self.min.y - p.y).max(p.y - self.max.y).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }

    /// Minimum point-to-point distance between two rectangles, zero when
    /// they overlap.
    #[inline]
    pub fn distance_to(&self, other: &Bounds) -> f32 {
        let dx = (self.min.x - other.max.x).max(other.min.x - self.max.x).max(0.0);
        let dy = (self.min.y - other.max.y).max(other.min.y - self.max.y).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }
}
