//! Scanned point and packed color

use bytemuck::{Pod, Zeroable};

use crate::core::types::Vec3;

/// 32-bit RGBA color, red in the low byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PackedColor(pub u32);

impl PackedColor {
    pub const BLACK: PackedColor = PackedColor::rgba(0, 0, 0, 255);

    /// Pack four 8-bit channels
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(r as u32 | (g as u32) << 8 | (b as u32) << 16 | (a as u32) << 24)
    }

    pub fn r(self) -> u8 {
        self.0 as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }
}

/// A sampled surface location with color. Immutable once created.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    position: Vec3,
    color: PackedColor,
}

impl Point {
    pub fn new(position: Vec3, color: PackedColor) -> Self {
        Self { position, color }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn color(&self) -> PackedColor {
        self.color
    }
}

/// GPU layout of a point (must match the point shader's struct)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuPoint {
    /// World position (12 bytes, offset 0)
    pub position: [f32; 3],
    /// Packed RGBA (4 bytes, offset 12)
    pub color: u32,
}

impl From<Point> for GpuPoint {
    fn from(point: Point) -> Self {
        Self {
            position: point.position.to_array(),
            color: point.color.0,
        }
    }
}
