use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use bitflags::bitflags;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product; positive when `other` is clockwise
    /// from `self` in screen coordinates (y grows downwards).
    pub fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn distance_squared(self, other: Vec2) -> f32 {
        (other - self).length_squared()
    }

    /// Scales the vector down so its length does not exceed `max`.
    pub fn clamp_length(self, max: f32) -> Vec2 {
        let len = self.length();
        if len > max && len > 0.0 {
            self * (max / len)
        } else {
            self
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Touch surface bounds, used by edge pans.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Edges of this rect lying within `margin` of `p`.
    pub fn edges_near(&self, p: Vec2, margin: f32) -> Edges {
        let mut edges = Edges::empty();
        if !self.contains(p) {
            return edges;
        }
        if p.x - self.x <= margin {
            edges |= Edges::LEFT;
        }
        if self.right() - p.x <= margin {
            edges |= Edges::RIGHT;
        }
        if p.y - self.y <= margin {
            edges |= Edges::TOP;
        }
        if self.bottom() - p.y <= margin {
            edges |= Edges::BOTTOM;
        }
        edges
    }
}

bitflags! {
    /// Movement directions, in screen coordinates (y grows downwards).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct Directions: u8 {
        const RIGHT = 1 << 0;
        const LEFT = 1 << 1;
        const UP = 1 << 2;
        const DOWN = 1 << 3;
    }
}

impl Directions {
    pub const HORIZONTAL: Directions = Directions::RIGHT.union(Directions::LEFT);
    pub const VERTICAL: Directions = Directions::UP.union(Directions::DOWN);

    /// Dominant direction of `delta`. Ties go to the horizontal axis.
    pub fn dominant(delta: Vec2) -> Directions {
        if delta.x.abs() >= delta.y.abs() {
            if delta.x >= 0.0 {
                Directions::RIGHT
            } else {
                Directions::LEFT
            }
        } else if delta.y >= 0.0 {
            Directions::DOWN
        } else {
            Directions::UP
        }
    }
}

bitflags! {
    /// Surface edges an edge pan may start from.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct Edges: u8 {
        const LEFT = 1 << 0;
        const TOP = 1 << 1;
        const RIGHT = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

impl Edges {
    /// Directions pointing away from these edges, into the surface.
    pub fn inward(self) -> Directions {
        let mut dirs = Directions::empty();
        if self.contains(Edges::LEFT) {
            dirs |= Directions::RIGHT;
        }
        if self.contains(Edges::RIGHT) {
            dirs |= Directions::LEFT;
        }
        if self.contains(Edges::TOP) {
            dirs |= Directions::DOWN;
        }
        if self.contains(Edges::BOTTOM) {
            dirs |= Directions::UP;
        }
        dirs
    }
}

/// Signed angle in radians rotating `from` onto `to`, in `[-PI, PI]`.
pub fn angle_between(from: Vec2, to: Vec2) -> f32 {
    from.cross(to).atan2(from.dot(to))
}

/// Wraps an angle in degrees into `[-180, 180]`.
pub fn normalize_degrees(degrees: f32) -> f32 {
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && degrees > 0.0 {
        180.0
    } else {
        wrapped
    }
}
