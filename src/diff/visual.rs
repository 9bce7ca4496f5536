//! Pixel-level visual diff between two raster captures.
//!
//! Pixels are compared with a perceptual YIQ colour distance (the metric
//! popularised by pixelmatch). Differing pixels are painted red in the
//! difference image, anti-aliasing artefacts yellow, and matching pixels as
//! a faded greyscale copy of the previous image.
//!
//! Images of different sizes are compared over their overlapping top-left
//! rectangle only; the mismatch is logged as a warning.

use std::io::Cursor;

use image::RgbaImage;
use thiserror::Error;
use tracing::warn;

/// Default matching threshold (0 = exact, 1 = anything matches)
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Maximum possible squared YIQ distance between two colours
const MAX_YIQ_DELTA: f64 = 35215.0;

/// Errors raised by the visual engine
#[derive(Debug, Error)]
pub enum VisualDiffError {
    /// An input was missing, empty or could not be decoded
    #[error("comparison precondition failed: {0}")]
    Precondition(String),

    /// The difference image could not be encoded
    #[error("failed to encode difference image: {0}")]
    Encode(String),
}

/// An RGBA raster, row-major, 4 bytes per pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Wrap raw RGBA bytes, checking the buffer matches the dimensions
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, VisualDiffError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(VisualDiffError::Precondition(format!(
                "Buffer size mismatch: expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A single-colour image
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Decode an encoded image (PNG or any format `image` recognises)
    pub fn from_png(data: &[u8]) -> Result<Self, VisualDiffError> {
        if data.is_empty() {
            return Err(VisualDiffError::Precondition(
                "image buffer is empty".to_string(),
            ));
        }
        let img = image::load_from_memory(data)
            .map_err(|e| VisualDiffError::Precondition(format!("Failed to decode image: {}", e)))?
            .to_rgba8();
        Ok(Self {
            width: img.width(),
            height: img.height(),
            pixels: img.into_raw(),
        })
    }

    /// Encode as PNG bytes
    pub fn to_png(&self) -> Result<Vec<u8>, VisualDiffError> {
        if self.is_empty() {
            return Err(VisualDiffError::Encode(
                "cannot encode a zero-size image".to_string(),
            ));
        }
        let img = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| VisualDiffError::Encode("buffer does not match dimensions".to_string()))?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| VisualDiffError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGBA value at (x, y); transparent black outside the image
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Number of pixels with exactly the given colour
    pub fn count_pixels(&self, color: [u8; 4]) -> usize {
        self.pixels
            .chunks_exact(4)
            .filter(|px| *px == color.as_slice())
            .count()
    }

    /// Copy of the top-left `width` x `height` region
    fn crop(&self, width: u32, height: u32) -> Vec<u8> {
        let row = width as usize * 4;
        let stride = self.width as usize * 4;
        let mut out = Vec::with_capacity(row * height as usize);
        for y in 0..height as usize {
            let start = y * stride;
            out.extend_from_slice(&self.pixels[start..start + row]);
        }
        out
    }
}

/// Tuning for a visual comparison
#[derive(Debug, Clone)]
pub struct VisualDiffOptions {
    /// Matching threshold in 0..=1; smaller is more sensitive
    pub threshold: f64,
    /// Count anti-aliased pixels as differences
    pub include_anti_aliasing: bool,
    /// Opacity of the greyscale background in the difference image
    pub alpha: f64,
    /// Colour marking differing pixels
    pub diff_color: [u8; 3],
    /// Colour marking anti-aliased pixels
    pub aa_color: [u8; 3],
}

impl Default for VisualDiffOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            include_anti_aliasing: false,
            alpha: 0.1,
            diff_color: [255, 0, 0],
            aa_color: [255, 255, 0],
        }
    }
}

impl VisualDiffOptions {
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn include_anti_aliasing(mut self, include: bool) -> Self {
        self.include_anti_aliasing = include;
        self
    }
}

/// Outcome of a visual comparison
#[derive(Debug, Clone)]
pub struct VisualDiffResult {
    /// Difference raster over the compared region; absent when it is empty
    pub difference_image: Option<RasterImage>,
    /// Number of pixels whose distance exceeds the threshold
    pub pixel_count: u64,
    /// Width of the compared region
    pub compared_width: u32,
    /// Height of the compared region
    pub compared_height: u32,
    /// Whether the inputs had different dimensions and were cropped
    pub cropped: bool,
}

/// Visual diff computation engine
pub struct VisualDiff;

impl VisualDiff {
    /// Compare two rasters over their overlapping region
    pub fn compute(
        before: &RasterImage,
        after: &RasterImage,
        options: &VisualDiffOptions,
    ) -> VisualDiffResult {
        if before.is_empty() && after.is_empty() {
            return VisualDiffResult {
                difference_image: None,
                pixel_count: 0,
                compared_width: 0,
                compared_height: 0,
                cropped: false,
            };
        }

        let width = before.width.min(after.width);
        let height = before.height.min(after.height);
        let cropped = before.width != after.width || before.height != after.height;

        if cropped {
            warn!(
                old = %format!("{}x{}", before.width, before.height),
                new = %format!("{}x{}", after.width, after.height),
                compared = %format!("{}x{}", width, height),
                "Image dimensions mismatch, cropping to the overlapping region"
            );
        }

        if width == 0 || height == 0 {
            return VisualDiffResult {
                difference_image: None,
                pixel_count: 0,
                compared_width: width,
                compared_height: height,
                cropped,
            };
        }

        let (a, b) = if cropped {
            (before.crop(width, height), after.crop(width, height))
        } else {
            (before.pixels.clone(), after.pixels.clone())
        };

        let (pixel_count, output) = pixel_match(&a, &b, width as usize, height as usize, options);

        VisualDiffResult {
            difference_image: Some(RasterImage {
                width,
                height,
                pixels: output,
            }),
            pixel_count,
            compared_width: width,
            compared_height: height,
            cropped,
        }
    }
}

/// Compare two rasters with the default options
pub fn compare_images(before: &RasterImage, after: &RasterImage) -> VisualDiffResult {
    VisualDiff::compute(before, after, &VisualDiffOptions::default())
}

/// Decode two encoded captures and compare them.
///
/// An empty or undecodable buffer is a precondition failure.
pub fn compare_png(
    before: &[u8],
    after: &[u8],
    options: &VisualDiffOptions,
) -> Result<VisualDiffResult, VisualDiffError> {
    let before = RasterImage::from_png(before)?;
    let after = RasterImage::from_png(after)?;
    Ok(VisualDiff::compute(&before, &after, options))
}

fn pixel_match(
    a: &[u8],
    b: &[u8],
    width: usize,
    height: usize,
    options: &VisualDiffOptions,
) -> (u64, Vec<u8>) {
    let max_delta = MAX_YIQ_DELTA * options.threshold * options.threshold;
    let mut output = vec![0u8; a.len()];
    let mut count = 0u64;

    for y in 0..height {
        for x in 0..width {
            let pos = (y * width + x) * 4;
            let delta = color_delta(a, b, pos, pos, false);

            if delta.abs() > max_delta {
                let anti_aliased = !options.include_anti_aliasing
                    && (antialiased(a, x, y, width, height, b)
                        || antialiased(b, x, y, width, height, a));
                if anti_aliased {
                    draw_pixel(&mut output, pos, options.aa_color);
                } else {
                    draw_pixel(&mut output, pos, options.diff_color);
                    count += 1;
                }
            } else {
                draw_gray_pixel(a, pos, options.alpha, &mut output);
            }
        }
    }

    (count, output)
}

fn rgb2y(r: f64, g: f64, b: f64) -> f64 {
    r * 0.29889531 + g * 0.58662247 + b * 0.11448223
}

fn rgb2i(r: f64, g: f64, b: f64) -> f64 {
    r * 0.59597799 - g * 0.27417610 - b * 0.32180189
}

fn rgb2q(r: f64, g: f64, b: f64) -> f64 {
    r * 0.21147017 - g * 0.52261711 + b * 0.31114694
}

/// Blend a channel with a white background
fn blend(c: f64, a: f64) -> f64 {
    255.0 + (c - 255.0) * a
}

fn channels(img: &[u8], pos: usize) -> (f64, f64, f64, f64) {
    (
        f64::from(img[pos]),
        f64::from(img[pos + 1]),
        f64::from(img[pos + 2]),
        f64::from(img[pos + 3]),
    )
}

/// Squared YIQ distance, negative when the first pixel is brighter.
///
/// With `y_only` only the signed brightness difference is returned.
fn color_delta(img1: &[u8], img2: &[u8], k: usize, m: usize, y_only: bool) -> f64 {
    let (mut r1, mut g1, mut b1, a1) = channels(img1, k);
    let (mut r2, mut g2, mut b2, a2) = channels(img2, m);

    if a1 == a2 && r1 == r2 && g1 == g2 && b1 == b2 {
        return 0.0;
    }

    if a1 < 255.0 {
        let a = a1 / 255.0;
        r1 = blend(r1, a);
        g1 = blend(g1, a);
        b1 = blend(b1, a);
    }
    if a2 < 255.0 {
        let a = a2 / 255.0;
        r2 = blend(r2, a);
        g2 = blend(g2, a);
        b2 = blend(b2, a);
    }

    let y1 = rgb2y(r1, g1, b1);
    let y2 = rgb2y(r2, g2, b2);
    let y = y1 - y2;
    if y_only {
        return y;
    }

    let i = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let q = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);
    let delta = 0.5053 * y * y + 0.299 * i * i + 0.1957 * q * q;

    if y1 > y2 { -delta } else { delta }
}

/// Neighbourhood bounds of (x, y), clamped to the image
fn neighbourhood(x: usize, y: usize, width: usize, height: usize) -> (usize, usize, usize, usize) {
    (
        x.saturating_sub(1),
        y.saturating_sub(1),
        (x + 1).min(width - 1),
        (y + 1).min(height - 1),
    )
}

/// Whether the pixel at (x1, y1) looks like an anti-aliasing artefact
fn antialiased(img: &[u8], x1: usize, y1: usize, width: usize, height: usize, other: &[u8]) -> bool {
    let (x0, y0, x2, y2) = neighbourhood(x1, y1, width, height);
    let pos = (y1 * width + x1) * 4;
    let mut zeroes = usize::from(x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2);

    let mut min = 0.0;
    let mut max = 0.0;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (0, 0, 0, 0);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }
            let delta = color_delta(img, img, pos, (y * width + x) * 4, true);
            if delta == 0.0 {
                zeroes += 1;
                if zeroes > 2 {
                    return false;
                }
            } else if delta < min {
                min = delta;
                min_x = x;
                min_y = y;
            } else if delta > max {
                max = delta;
                max_x = x;
                max_y = y;
            }
        }
    }

    // No darker or no brighter neighbour: not a gradient edge
    if min == 0.0 || max == 0.0 {
        return false;
    }

    (has_many_siblings(img, min_x, min_y, width, height)
        && has_many_siblings(other, min_x, min_y, width, height))
        || (has_many_siblings(img, max_x, max_y, width, height)
            && has_many_siblings(other, max_x, max_y, width, height))
}

/// Whether at least three neighbours share the exact colour of (x1, y1)
fn has_many_siblings(img: &[u8], x1: usize, y1: usize, width: usize, height: usize) -> bool {
    let (x0, y0, x2, y2) = neighbourhood(x1, y1, width, height);
    let pos = (y1 * width + x1) * 4;
    let mut zeroes = usize::from(x1 == x0 || x1 == x2 || y1 == y0 || y1 == y2);

    for x in x0..=x2 {
        for y in y0..=y2 {
            if x == x1 && y == y1 {
                continue;
            }
            let other = (y * width + x) * 4;
            if img[pos..pos + 4] == img[other..other + 4] {
                zeroes += 1;
            }
            if zeroes > 2 {
                return true;
            }
        }
    }
    false
}

fn draw_pixel(output: &mut [u8], pos: usize, [r, g, b]: [u8; 3]) {
    output[pos] = r;
    output[pos + 1] = g;
    output[pos + 2] = b;
    output[pos + 3] = 255;
}

fn draw_gray_pixel(img: &[u8], pos: usize, alpha: f64, output: &mut [u8]) {
    let (r, g, b, a) = channels(img, pos);
    let value = blend(rgb2y(r, g, b), alpha * a / 255.0).clamp(0.0, 255.0) as u8;
    draw_pixel(output, pos, [value, value, value]);
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const RED: [u8; 4] = [255, 0, 0, 255];

    fn with_rect(mut img: RasterImage, x: u32, y: u32, w: u32, h: u32, color: [u8; 4]) -> RasterImage {
        for py in y..y + h {
            for px in x..x + w {
                let idx = (py as usize * img.width as usize + px as usize) * 4;
                img.pixels[idx..idx + 4].copy_from_slice(&color);
            }
        }
        img
    }

    #[test]
    fn test_identical_images() {
        let img = RasterImage::solid(64, 48, [30, 120, 200, 255]);
        let result = compare_images(&img, &img.clone());

        assert_eq!(result.pixel_count, 0);
        assert!(!result.cropped);
        let diff = result.difference_image.unwrap();
        assert_eq!((diff.width(), diff.height()), (64, 48));
        assert_eq!(diff.count_pixels(RED), 0);
    }

    #[test]
    fn test_rectangle_change_is_counted() {
        let before = RasterImage::solid(50, 50, WHITE);
        let after = with_rect(before.clone(), 10, 10, 8, 5, [0, 0, 0, 255]);
        let result = compare_images(&before, &after);

        assert_eq!(result.pixel_count, 40);
        assert_eq!(result.difference_image.unwrap().count_pixels(RED), 40);
    }

    #[test]
    fn test_subtle_change_is_below_threshold() {
        let before = RasterImage::solid(10, 10, [200, 200, 200, 255]);
        let after = RasterImage::solid(10, 10, [201, 200, 200, 255]);
        assert_eq!(compare_images(&before, &after).pixel_count, 0);
    }

    #[test]
    fn test_zero_threshold_is_exact() {
        let before = RasterImage::solid(4, 4, [200, 200, 200, 255]);
        let after = RasterImage::solid(4, 4, [201, 200, 200, 255]);
        let options = VisualDiffOptions::default().threshold(0.0).include_anti_aliasing(true);
        assert_eq!(VisualDiff::compute(&before, &after, &options).pixel_count, 16);
    }

    #[test]
    fn test_dimension_mismatch_crops_to_overlap() {
        let before = RasterImage::solid(100, 60, WHITE);
        let after = with_rect(RasterImage::solid(80, 90, WHITE), 0, 70, 10, 10, RED);
        let result = compare_images(&before, &after);

        assert!(result.cropped);
        assert_eq!((result.compared_width, result.compared_height), (80, 60));
        // The red block lies outside the overlap
        assert_eq!(result.pixel_count, 0);
    }

    #[test]
    fn test_both_empty_short_circuits() {
        let empty = RasterImage::solid(0, 0, WHITE);
        let result = compare_images(&empty, &empty);
        assert_eq!(result.pixel_count, 0);
        assert!(result.difference_image.is_none());
    }

    #[test]
    fn test_one_empty_has_no_overlap() {
        let empty = RasterImage::solid(0, 10, WHITE);
        let full = RasterImage::solid(10, 10, WHITE);
        let result = compare_images(&empty, &full);
        assert_eq!(result.pixel_count, 0);
        assert!(result.cropped);
        assert!(result.difference_image.is_none());
    }

    #[test]
    fn test_undecodable_buffer_is_precondition_failure() {
        let png = RasterImage::solid(2, 2, WHITE).to_png().unwrap();
        let err = compare_png(b"not an image", &png, &VisualDiffOptions::default()).unwrap_err();
        assert!(matches!(err, VisualDiffError::Precondition(_)));

        let err = compare_png(&png, &[], &VisualDiffOptions::default()).unwrap_err();
        assert!(matches!(err, VisualDiffError::Precondition(_)));
    }

    #[test]
    fn test_png_roundtrip_preserves_pixels() {
        let img = with_rect(RasterImage::solid(8, 8, WHITE), 2, 2, 3, 3, RED);
        let decoded = RasterImage::from_png(&img.to_png().unwrap()).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn test_raw_buffer_size_is_checked() {
        assert!(RasterImage::new(2, 2, vec![0; 15]).is_err());
        assert!(RasterImage::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_transparent_pixels_blend_with_white() {
        let before = RasterImage::solid(4, 4, [0, 0, 0, 0]);
        let after = RasterImage::solid(4, 4, WHITE);
        assert_eq!(compare_images(&before, &after).pixel_count, 0);
    }
}
