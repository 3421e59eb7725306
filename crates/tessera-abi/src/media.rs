//! Decoded media buffers attached to a sequence before prompt evaluation.

use serde::{Deserialize, Serialize};

/// One decoded image, RGB8, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Caller-chosen identifier, used by engines that cache image embeddings.
    pub id: Option<String>,
}

impl Bitmap {
    /// Wrap an RGB buffer. Returns `None` when `data` does not hold exactly
    /// `width * height * 3` bytes.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(3)?;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
            id: None,
        })
    }

    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        self.id = Some(id.into());
        self
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}
