//! Float vector and plane primitives shared by the lump tables and the
//! winding engine.

use binrw::{BinRead, BinWrite};
use cgmath::{Deg, Quaternion, Rotation, Rotation3};
use std::ops::{Add, Mul, Neg, Sub};

/// Three component float vector in map units.
#[derive(Debug, Clone, Copy, Default, PartialEq, BinRead, BinWrite)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector {
    pub const ZERO: Vector = Vector::new(0.0, 0.0, 0.0);
    pub const X: Vector = Vector::new(1.0, 0.0, 0.0);
    pub const Y: Vector = Vector::new(0.0, 1.0, 0.0);
    pub const Z: Vector = Vector::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vector { x, y, z }
    }

    pub fn dot(self, other: Vector) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vector) -> Vector {
        Vector {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn normalized(self) -> Vector {
        let length = self.length();
        if length < f32::EPSILON {
            Vector::ZERO
        } else {
            self * (1.0 / length)
        }
    }

    pub fn min(self, other: Vector) -> Vector {
        Vector {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            z: self.z.min(other.z),
        }
    }

    pub fn max(self, other: Vector) -> Vector {
        Vector {
            x: self.x.max(other.x),
            y: self.y.max(other.y),
            z: self.z.max(other.z),
        }
    }

    /// Round every component to the nearest multiple of the grid size.
    pub fn snap(self, grid: f32) -> Vector {
        Vector {
            x: (self.x / grid).round() * grid,
            y: (self.y / grid).round() * grid,
            z: (self.z / grid).round() * grid,
        }
    }

    pub fn is_valid(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Rotate by euler `(pitch, yaw, roll)` degrees. The angles are applied
    /// in roll, pitch, yaw order.
    pub fn rotated(self, angles: Vector) -> Vector {
        let rotation = Quaternion::from_angle_z(Deg(angles.y))
            * Quaternion::from_angle_y(Deg(angles.x))
            * Quaternion::from_angle_x(Deg(angles.z));
        let out = rotation.rotate_vector(cgmath::Vector3::new(self.x, self.y, self.z));
        Vector::new(out.x, out.y, out.z)
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, other: Vector) -> Vector {
        Vector::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, other: Vector) -> Vector {
        Vector::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vector {
    type Output = Vector;

    fn mul(self, scale: f32) -> Vector {
        Vector::new(self.x * scale, self.y * scale, self.z * scale)
    }
}

impl Mul<Vector> for Vector {
    type Output = Vector;

    fn mul(self, scale: Vector) -> Vector {
        Vector::new(self.x * scale.x, self.y * scale.y, self.z * scale.z)
    }
}

/// Four component float vector, the shape texture axes are stored in.
#[derive(Debug, Clone, Copy, Default, PartialEq, BinRead, BinWrite)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vector4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Vector4 { x, y, z, w }
    }

    pub fn dot(self, other: Vector4) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// The spatial part.
    pub fn xyz(self) -> Vector {
        Vector::new(self.x, self.y, self.z)
    }
}

impl Add for Vector4 {
    type Output = Vector4;

    fn add(self, other: Vector4) -> Vector4 {
        Vector4::new(
            self.x + other.x,
            self.y + other.y,
            self.z + other.z,
            self.w + other.w,
        )
    }
}

impl Sub for Vector4 {
    type Output = Vector4;

    fn sub(self, other: Vector4) -> Vector4 {
        Vector4::new(
            self.x - other.x,
            self.y - other.y,
            self.z - other.z,
            self.w - other.w,
        )
    }
}

impl Mul<f32> for Vector4 {
    type Output = Vector4;

    fn mul(self, scale: f32) -> Vector4 {
        Vector4::new(
            self.x * scale,
            self.y * scale,
            self.z * scale,
            self.w * scale,
        )
    }
}

/// Oriented plane, the half space `{p : normal · p <= dist}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector,
    pub dist: f32,
}

impl Plane {
    pub const fn new(normal: Vector, dist: f32) -> Self {
        Plane { normal, dist }
    }

    pub fn flipped(self) -> Plane {
        Plane {
            normal: -self.normal,
            dist: -self.dist,
        }
    }

    /// Signed distance of the point to the plane, positive in front.
    pub fn distance_to(self, point: Vector) -> f32 {
        self.normal.dot(point) - self.dist
    }

    pub fn is_valid(self) -> bool {
        self.normal.is_valid() && self.dist.is_finite()
    }
}
