//! Auxiliary forward-rendered color frame used to color scanned points

use image::RgbaImage;

use super::point::PackedColor;

/// Small RGBA frame rendered from the scanning viewpoint.
///
/// Row 0 of the image is the top of the viewport.
pub struct ColorFrame {
    image: RgbaImage,
}

impl ColorFrame {
    /// Wrap a rendered frame. Returns None for an empty image.
    pub fn new(image: RgbaImage) -> Option<Self> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some(Self { image })
    }

    /// Frame filled with a single color
    pub fn solid(width: u32, height: u32, color: PackedColor) -> Option<Self> {
        let pixel = image::Rgba([color.r(), color.g(), color.b(), color.a()]);
        Self::new(RgbaImage::from_pixel(width, height, pixel))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Bilinear lookup at viewport coordinate (u, v), (0, 0) bottom-left.
    pub fn sample(&self, u: f32, v: f32) -> PackedColor {
        let max_x = (self.image.width() - 1) as f32;
        let max_y = (self.image.height() - 1) as f32;
        let x = (u.clamp(0.0, 1.0) * max_x).clamp(0.0, max_x);
        let y = ((1.0 - v.clamp(0.0, 1.0)) * max_y).clamp(0.0, max_y);

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.image.width() - 1);
        let y1 = (y0 + 1).min(self.image.height() - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let p00 = self.image.get_pixel(x0, y0).0;
        let p10 = self.image.get_pixel(x1, y0).0;
        let p01 = self.image.get_pixel(x0, y1).0;
        let p11 = self.image.get_pixel(x1, y1).0;

        let mut out = [0u8; 4];
        for c in 0..4 {
            let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
            let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
            out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
        }

        PackedColor::rgba(out[0], out[1], out[2], out[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> ColorFrame {
        // Top row red/green, bottom row blue/white
        let mut image = RgbaImage::new(2, 2);
        image.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 0, image::Rgba([0, 255, 0, 255]));
        image.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        image.put_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        ColorFrame::new(image).unwrap()
    }

    #[test]
    fn test_corners() {
        let frame = two_by_two();
        assert_eq!(frame.sample(0.0, 1.0), PackedColor::rgba(255, 0, 0, 255));
        assert_eq!(frame.sample(1.0, 1.0), PackedColor::rgba(0, 255, 0, 255));
        assert_eq!(frame.sample(0.0, 0.0), PackedColor::rgba(0, 0, 255, 255));
        assert_eq!(frame.sample(1.0, 0.0), PackedColor::rgba(255, 255, 255, 255));
    }

    #[test]
    fn test_bilinear_center() {
        let frame = two_by_two();
        let c = frame.sample(0.5, 0.5);
        // Average of the four corners
        assert_eq!((c.r(), c.g(), c.b(), c.a()), (128, 128, 128, 255));
    }

    #[test]
    fn test_empty_image_rejected() {
        assert!(ColorFrame::new(RgbaImage::new(0, 4)).is_none());
    }

    #[test]
    fn test_solid() {
        let frame = ColorFrame::solid(4, 3, PackedColor::rgba(10, 20, 30, 255)).unwrap();
        assert_eq!(frame.sample(0.3, 0.7), PackedColor::rgba(10, 20, 30, 255));
    }
}
