use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A point in world space. `x` and `y` are the lateral axes, `z` is depth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(self, other: Self) -> f64 {
        let d = self - other;
        (d.x * d.x + d.y * d.y + d.z * d.z).sqrt()
    }

    /// Same lateral offset, different depth.
    pub fn with_depth(self, z: f64) -> Self {
        Self { z, ..self }
    }

    pub fn offset_depth(self, dz: f64) -> Self {
        Self {
            z: self.z + dz,
            ..self
        }
    }
}

impl Add for Point3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// What the renderer is told to draw for one cartridge body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3,
    /// Euler angles in radians. Fixed per slot.
    pub rotation: Point3,
    pub scale: f64,
}

/// Machine-wide constants shared by every slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineGeometry {
    /// The single "inserted" location.
    pub active_position: Point3,
    /// Depth a cartridge is lifted to before it moves sideways.
    pub clearance_depth: f64,
}

impl Default for MachineGeometry {
    fn default() -> Self {
        Self {
            active_position: Point3::new(0.0, 40.0, -10.0),
            clearance_depth: 60.0,
        }
    }
}
