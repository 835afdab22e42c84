//! Images added to the style sprite.

use crate::error::ImageError;
use crate::style::Color;

/// An RGBA image that can be added to the style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    scale: f32,
    sdf: bool,
}

impl StyleImage {
    /// Creates an image from raw RGBA bytes.
    pub fn from_rgba(bytes: Vec<u8>, width: u32, height: u32) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * 4;
        if bytes.len() != expected {
            return Err(ImageError::InvalidSize {
                expected,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            bytes,
            width,
            height,
            scale: 1.0,
            sdf: false,
        })
    }

    /// Decode an image from a byte slice.
    ///
    /// Attempts to guess the format of the image from the data. Non-RGBA images
    /// will be converted to RGBA.
    #[cfg(feature = "image")]
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        use image::GenericImageView;
        let decoded = image::load_from_memory(bytes)?;
        let (width, height) = decoded.dimensions();
        Self::from_rgba(decoded.to_rgba8().into_vec(), width, height)
    }

    /// Sets the pixel ratio of the image.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Marks the image as a signed distance field, so it can be recolored with `icon-color`.
    pub fn with_sdf(mut self, sdf: bool) -> Self {
        self.sdf = sdf;
        self
    }

    /// RGBA bytes of the image.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel ratio.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Whether the image is a signed distance field.
    pub fn sdf(&self) -> bool {
        self.sdf
    }

    /// The built-in marker: a red pin with a white dot, 20x32 pixels, pointing down at the bottom center.
    pub fn default_marker() -> Self {
        const WIDTH: u32 = 20;
        const HEIGHT: u32 = 32;
        const HEAD_RADIUS: f64 = 10.0;
        const DOT_RADIUS: f64 = 3.5;

        let pin = Color::rgba(229, 57, 53, 255).to_u8_array();
        let dot = Color::WHITE.to_u8_array();
        let mut bytes = vec![0u8; (WIDTH * HEIGHT * 4) as usize];

        let center_x = WIDTH as f64 / 2.0;
        let center_y = HEAD_RADIUS;

        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let px = x as f64 + 0.5;
                let py = y as f64 + 0.5;
                let distance = ((px - center_x).powi(2) + (py - center_y).powi(2)).sqrt();

                let in_head = distance <= HEAD_RADIUS;
                // The tail narrows linearly from the full head width at its center to a point at the bottom.
                let in_tail = py > center_y && {
                    let half_width = HEAD_RADIUS * (HEIGHT as f64 - py) / (HEIGHT as f64 - center_y);
                    (px - center_x).abs() <= half_width
                };

                let color = if distance <= DOT_RADIUS {
                    dot
                } else if in_head || in_tail {
                    pin
                } else {
                    continue;
                };

                let offset = ((y * WIDTH + x) * 4) as usize;
                bytes[offset..offset + 4].copy_from_slice(&color);
            }
        }

        Self {
            bytes,
            width: WIDTH,
            height: HEIGHT,
            scale: 1.0,
            sdf: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn pixel(image: &StyleImage, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * image.width() + x) * 4) as usize;
        let mut pixel = [0; 4];
        pixel.copy_from_slice(&image.bytes()[offset..offset + 4]);
        pixel
    }

    #[test]
    fn rgba_length_is_validated() {
        assert!(StyleImage::from_rgba(vec![0; 16], 2, 2).is_ok());
        assert_matches!(
            StyleImage::from_rgba(vec![0; 15], 2, 2),
            Err(ImageError::InvalidSize {
                expected: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn default_marker_shape() {
        let marker = StyleImage::default_marker();
        assert_eq!(marker.width(), 20);
        assert_eq!(marker.height(), 32);

        assert_eq!(pixel(&marker, 10, 10), [255, 255, 255, 255]);
        assert_eq!(pixel(&marker, 10, 2)[3], 255);
        assert_eq!(pixel(&marker, 10, 29)[3], 255);
        assert_eq!(pixel(&marker, 0, 31)[3], 0);
        assert_eq!(pixel(&marker, 19, 0)[3], 0);
    }
}
