//! Programmatic framebuffer used as a stand-in for a real page capture.

use async_trait::async_trait;
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbImage};
use std::io::Cursor;

use super::{CaptureError, CaptureResult, VisualCapturer};

/// A virtual framebuffer for testing and programmatic drawing
///
/// Provides a drawing API for building capture fixtures:
/// - `fill()` - Fill entire buffer with a color
/// - `draw_rect()` - Draw a filled rectangle
/// - `draw_text()` - Draw text using font8x8 glyphs
/// - `get_pixel()` / `set_pixel()` - Direct pixel access
///
/// As a [`VisualCapturer`] it returns its current contents as PNG,
/// whatever URL is requested.
#[derive(Debug, Clone)]
pub struct MockFramebuffer {
    width: u32,
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl MockFramebuffer {
    /// Create a new framebuffer with the given dimensions, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffer: vec![0u8; width as usize * height as usize * 3],
        }
    }

    /// Create a framebuffer initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    /// Load a framebuffer from encoded image bytes
    pub fn from_png_bytes(data: &[u8]) -> CaptureResult<Self> {
        let img = image::load_from_memory(data)
            .map_err(|e| CaptureError::Encode(format!("Failed to load PNG: {}", e)))?;
        let rgb = img.to_rgb8();
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            buffer: rgb.into_raw(),
        })
    }

    /// Fill the entire framebuffer with a color
    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle, clipped to the buffer
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..y.saturating_add(h).min(self.height) {
            for px in x..x.saturating_add(w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Draw text using font8x8 glyphs
    ///
    /// Each character is 8x8 pixels. Text does not wrap.
    pub fn draw_text(&mut self, x: u32, y: u32, text: &str, fg: [u8; 3], bg: [u8; 3]) {
        let mut cursor_x = x;
        for ch in text.chars() {
            if cursor_x >= self.width {
                break;
            }
            self.draw_char(cursor_x, y, ch, fg, bg);
            cursor_x += 8;
        }
    }

    fn draw_char(&mut self, x: u32, y: u32, ch: char, fg: [u8; 3], bg: [u8; 3]) {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            let py = y + row_idx as u32;
            if py >= self.height {
                break;
            }
            for bit in 0..8 {
                let px = x + bit;
                if px >= self.width {
                    break;
                }
                // font8x8 stores LSB as leftmost pixel
                let color = if (row >> bit) & 1 == 1 { fg } else { bg };
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Get the color of a pixel; black outside the buffer
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    /// Set the color of a pixel; ignored outside the buffer
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn to_image(&self) -> CaptureResult<RgbImage> {
        ImageBuffer::from_raw(self.width, self.height, self.buffer.clone())
            .ok_or_else(|| CaptureError::Encode("buffer size does not match dimensions".to_string()))
    }

    /// Encode the framebuffer as PNG bytes
    pub fn to_png(&self) -> CaptureResult<Vec<u8>> {
        let img = self.to_image()?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| CaptureError::Encode(format!("Failed to encode PNG: {}", e)))?;
        Ok(bytes)
    }
}

#[async_trait]
impl VisualCapturer for MockFramebuffer {
    async fn capture(&self, _url: &str) -> CaptureResult<Vec<u8>> {
        self.to_png()
    }

    fn source_type(&self) -> &str {
        "mock"
    }
}
