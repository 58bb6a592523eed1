//! Converted frame types
//!
//! [`RgbView`] borrows the converter's scratch buffer; [`PresentedFrame`]
//! is the owned copy that crosses over to the presentation side.

use std::fmt;

use image::RgbImage;

use super::error::PlayerError;

/// Identifier of one playback session, unique per player
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Borrowed packed RGB24 picture, possibly with row padding
#[derive(Debug, Clone, Copy)]
pub struct RgbView<'a> {
    pub width: u32,
    pub height: u32,
    /// Bytes per row, at least `width * 3`
    pub stride: usize,
    pub data: &'a [u8],
}

/// Independently owned RGB24 frame handed to the presentation sink
#[derive(Debug, Clone, PartialEq)]
pub struct PresentedFrame {
    session: SessionId,
    sequence: u64,
    packet_index: u64,
    image: RgbImage,
}

impl PresentedFrame {
    /// Copy a converted picture out of the conversion buffer
    ///
    /// Row padding is dropped so the image is tightly packed.
    pub fn copy_from(
        view: RgbView<'_>,
        session: SessionId,
        sequence: u64,
        packet_index: u64,
    ) -> Result<Self, PlayerError> {
        let width = view.width as usize;
        let height = view.height as usize;
        let row = width * 3;

        if view.stride < row || view.data.len() < view.stride * height.saturating_sub(1) + row {
            return Err(PlayerError::decode(format!(
                "converted buffer too small: {} bytes, stride {} for {}x{}",
                view.data.len(),
                view.stride,
                view.width,
                view.height
            )));
        }

        // If stride matches width*3, we can copy in one go
        let pixels = if view.stride == row {
            view.data[..row * height].to_vec()
        } else {
            let mut pixels = Vec::with_capacity(row * height);
            for y in 0..height {
                let start = y * view.stride;
                pixels.extend_from_slice(&view.data[start..start + row]);
            }
            pixels
        };

        let image = RgbImage::from_raw(view.width, view.height, pixels)
            .ok_or_else(|| PlayerError::decode("converted frame has inconsistent size"))?;

        Ok(Self {
            session,
            sequence,
            packet_index,
            image,
        })
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// 0-based emit order within the session
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Read index of the packet whose decode produced this frame
    pub fn packet_index(&self) -> u64 {
        self.packet_index
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Tightly packed RGB24 bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }
}
