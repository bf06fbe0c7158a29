use anyhow::{anyhow, Context, Result};

/// Decoded RGBA8 image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Decodes PNG or JPEG bytes, expanding to four channels.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .context("unsupported or corrupt image data")?
            .to_rgba8();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(anyhow!("image has zero area"));
        }
        Ok(Self {
            width,
            height,
            pixels: image.into_raw(),
        })
    }

    /// Single-pixel image of one colour.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    /// Stand-in diffuse map: full white, so the material colour shows through.
    pub fn fallback_diffuse() -> Self {
        Self::solid([255, 255, 255, 255])
    }

    /// Stand-in specular map: no highlights.
    pub fn fallback_specular() -> Self {
        Self::solid([0, 0, 0, 255])
    }

    pub fn bytes_per_row(&self) -> u32 {
        4 * self.width
    }
}
