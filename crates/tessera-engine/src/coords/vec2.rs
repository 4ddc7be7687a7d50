use core::ops::{Add, Div, Mul, Sub};

/// Point or offset in world units.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2::new(0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Direction of `angle` radians. Zero points along +X; with +Y down, positive angles turn
    /// clockwise on screen.
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(cos, sin)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// `self` scaled to unit length. Degenerate input yields [`Vec2::ZERO`].
    pub fn normalized(self) -> Self {
        match self.length() {
            len if len > f32::EPSILON => self / len,
            _ => Self::ZERO,
        }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline]
    pub const fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }
}

macro_rules! componentwise {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for Vec2 {
            type Output = Vec2;
            #[inline]
            fn $method(self, rhs: Vec2) -> Vec2 {
                Vec2::new(self.x $op rhs.x, self.y $op rhs.y)
            }
        }
    };
}

macro_rules! scalar {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<f32> for Vec2 {
            type Output = Vec2;
            #[inline]
            fn $method(self, k: f32) -> Vec2 {
                Vec2::new(self.x $op k, self.y $op k)
            }
        }
    };
}

componentwise!(Add, add, +);
componentwise!(Sub, sub, -);
scalar!(Mul, mul, *);
scalar!(Div, div, /);
