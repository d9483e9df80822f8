//! Vector and rotation primitives shared by every layer of the pipeline.
//!
//! All geometry is expressed in Unreal Units. Conversions to human units
//! happen at the analytics boundary: distances divide by 100 to meters,
//! speeds multiply by [`UU_S_TO_KPH`].

use serde::{Deserialize, Serialize};

/// 1 UU/s expressed in km/h (1 UU ~ 1.9 cm).
pub const UU_S_TO_KPH: f64 = 0.019 * 3.6;

/// 3D vector with x, y, z components.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn horizontal_magnitude(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn distance(self, other: Vec3) -> f32 {
        (self - other).magnitude()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Car orientation as Euler angles in radians.
///
/// Parser outputs arrive either in this shape or as a legacy three-component
/// vector (x=pitch, y=yaw, z=roll); the normalization layer translates the
/// legacy shape at ingress so nothing downstream has to care.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotation {
    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Magnitude of the relative velocity between two bodies.
pub fn relative_speed(a: Vec3, b: Vec3) -> f32 {
    (a - b).magnitude()
}

/// Normalize an angle to the [-pi, pi] range.
pub fn normalize_angle(mut angle: f32) -> f32 {
    while angle > std::f32::consts::PI {
        angle -= 2.0 * std::f32::consts::PI;
    }
    while angle < -std::f32::consts::PI {
        angle += 2.0 * std::f32::consts::PI;
    }
    angle
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_ops() {
        let a = Vec3::new(3.0, 4.0, 0.0);
        assert_eq!(a.magnitude(), 5.0);
        assert_eq!(a.dot(Vec3::new(1.0, 0.0, 0.0)), 3.0);
        assert_eq!((a * 2.0).y, 8.0);
        assert_eq!(a.distance(Vec3::new(3.0, 0.0, 0.0)), 4.0);
    }

    #[test]
    fn angle_normalization_wraps() {
        let wrapped = normalize_angle(3.0 * std::f32::consts::PI);
        assert!((wrapped.abs() - std::f32::consts::PI).abs() < 1e-5);
    }

    #[test]
    fn rounding_resolution() {
        assert_eq!(round2(171.00432), 171.0);
        assert_eq!(round3(0.12349), 0.123);
    }
}
