//! Wire records for the session log files
//!
//! Point:  `-x y z r g b t`
//! Camera: `-x y z 0 0 0 rx ry rz t`
//!
//! Numbers use Rust's `Display` for floats, which always writes `.` as the
//! decimal separator and never switches to exponent notation. x is negated
//! for the consumer's left-handed coordinate system.

use std::fmt::Write;

use crate::core::camera::CameraPose;
use crate::core::error::Error;
use crate::core::types::{Result, Vec3};
use crate::scan::point::{PackedColor, Point};

/// A parsed point record, converted back to scanner coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointRecord {
    pub position: Vec3,
    pub rgb: [u8; 3],
    pub time: f64,
}

impl PointRecord {
    pub fn color(&self) -> PackedColor {
        PackedColor::rgba(self.rgb[0], self.rgb[1], self.rgb[2], 255)
    }
}

/// A parsed camera record, converted back to scanner coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraRecord {
    pub position: Vec3,
    /// Euler angles in degrees (pitch, yaw, roll)
    pub euler: Vec3,
    pub time: f64,
}

/// Flip x, folding -0 into 0 so it prints without a sign
fn mirror_x(x: f32) -> f32 {
    -x + 0.0
}

/// Append one point record line to `out`
pub fn write_point_record(out: &mut String, point: &Point, time: f64) {
    let p = point.position();
    let c = point.color();
    // Writing into a String cannot fail
    let _ = writeln!(
        out,
        "{} {} {} {} {} {} {}",
        mirror_x(p.x),
        p.y + 0.0,
        p.z + 0.0,
        c.r(),
        c.g(),
        c.b(),
        time + 0.0
    );
}

/// Append one camera record line to `out`
pub fn write_camera_record(out: &mut String, pose: &CameraPose, time: f64) {
    let p = pose.position;
    let (rx, ry, rz) = pose.euler_degrees();
    let _ = writeln!(
        out,
        "{} {} {} 0 0 0 {} {} {} {}",
        mirror_x(p.x),
        p.y + 0.0,
        p.z + 0.0,
        rx + 0.0,
        ry + 0.0,
        rz + 0.0,
        time + 0.0
    );
}

/// Single point record without the trailing newline
pub fn format_point_record(point: &Point, time: f64) -> String {
    let mut line = String::new();
    write_point_record(&mut line, point, time);
    line.truncate(line.trim_end().len());
    line
}

fn fields<'a, const N: usize>(line: &'a str, kind: &str) -> Result<[&'a str; N]> {
    let parts: Vec<&'a str> = line.split_ascii_whitespace().collect();
    parts.try_into().map_err(|parts: Vec<&'a str>| {
        Error::Record(format!("{} record needs {} fields, got {}: {:?}", kind, N, parts.len(), line))
    })
}

fn number<T: std::str::FromStr>(field: &str, line: &str) -> Result<T> {
    field
        .parse()
        .map_err(|_| Error::Record(format!("bad number {:?} in {:?}", field, line)))
}

/// Parse a point record line
pub fn parse_point_record(line: &str) -> Result<PointRecord> {
    let [x, y, z, r, g, b, t] = fields::<7>(line, "point")?;
    Ok(PointRecord {
        position: Vec3::new(mirror_x(number(x, line)?), number(y, line)?, number(z, line)?),
        rgb: [number(r, line)?, number(g, line)?, number(b, line)?],
        time: number(t, line)?,
    })
}

/// Parse a camera record line
pub fn parse_camera_record(line: &str) -> Result<CameraRecord> {
    let [x, y, z, z0, z1, z2, rx, ry, rz, t] = fields::<10>(line, "camera")?;
    if [z0, z1, z2].iter().any(|f| *f != "0") {
        return Err(Error::Record(format!("camera record reserved fields must be 0: {:?}", line)));
    }
    Ok(CameraRecord {
        position: Vec3::new(mirror_x(number(x, line)?), number(y, line)?, number(z, line)?),
        euler: Vec3::new(number(rx, line)?, number(ry, line)?, number(rz, line)?),
        time: number(t, line)?,
    })
}
