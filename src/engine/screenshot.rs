use std::path::Path;

use image::RgbaImage;

use super::error::{EngineError, EngineResult};

/// Where row 0 of a captured frame sits. Framebuffer reads start at the bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowOrigin {
    BottomLeft,
    TopLeft,
}

/// RGBA8 pixels read back from the rendering surface.
#[derive(Clone, Debug)]
pub struct FrameCapture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub origin: RowOrigin,
}

impl FrameCapture {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>, origin: RowOrigin) -> EngineResult<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(EngineError::InvalidCapture {
                width,
                height,
                len: rgba.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
            origin,
        })
    }

    /// Reorders rows so row 0 is the top of the image.
    pub fn into_top_left(mut self) -> Self {
        if self.origin == RowOrigin::BottomLeft {
            let stride = self.width as usize * 4;
            if stride > 0 {
                let rows = self.rgba.chunks_exact(stride).rev();
                self.rgba = rows.flatten().copied().collect();
            }
            self.origin = RowOrigin::TopLeft;
        }
        self
    }

    pub fn into_image(self) -> EngineResult<RgbaImage> {
        let top_left = self.into_top_left();
        let (width, height, len) = (top_left.width, top_left.height, top_left.rgba.len());
        RgbaImage::from_raw(width, height, top_left.rgba).ok_or(EngineError::InvalidCapture {
            width,
            height,
            len,
        })
    }
}

/// Writes the capture as an image; the format follows the file extension.
pub fn save_capture(capture: FrameCapture, path: &Path) -> EngineResult<()> {
    let image = capture.into_image()?;
    image.save(path)?;
    log::info!("screenshot saved to {}", path.display());
    Ok(())
}
