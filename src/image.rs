//
// filter-engine - a persistent thread pool for invert/grayscale/sepia image filters
// image.rs - the non-owning image view and the filter kind enumeration
//
// Copyright (c) 2018 Brion Vibber
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.
//

use super::error::{EngineError, EngineResult};

/// A borrowed, read-only view onto a packed pixel buffer.
///
/// `bytes.len()` must equal `width * height * channels`; this is checked wherever a view is
/// paired with another one (see [`validate_shapes`]), not at construction time.
#[derive(Copy, Clone)]
pub struct ImageView<'a> {
    pub bytes: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl<'a> ImageView<'a> {
    pub fn new(bytes: &'a [u8], width: u32, height: u32, channels: u32) -> ImageView<'a> {
        ImageView {
            bytes,
            width,
            height,
            channels,
        }
    }

    fn stride(&self) -> usize {
        self.width as usize * self.channels as usize
    }
}

/// A borrowed, mutable view onto a packed pixel buffer.
pub struct ImageViewMut<'a> {
    pub bytes: &'a mut [u8],
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl<'a> ImageViewMut<'a> {
    pub fn new(bytes: &'a mut [u8], width: u32, height: u32, channels: u32) -> ImageViewMut<'a> {
        ImageViewMut {
            bytes,
            width,
            height,
            channels,
        }
    }
}

/// Checks the shared invariants §3 places on an `(input, output)` pair before any work is
/// built: equal dimensions, equal channel count, and `channels ∈ {3, 4}`.
pub(crate) fn validate_shapes(input: &ImageView, output: &ImageViewMut) -> EngineResult<()> {
    if input.width != output.width
        || input.height != output.height
        || input.channels != output.channels
    {
        return Err(EngineError::ShapeMismatch);
    }
    if input.channels != 3 && input.channels != 4 {
        return Err(EngineError::ShapeMismatch);
    }
    let expected = input.stride() * input.height as usize;
    if input.bytes.len() != expected || output.bytes.len() != expected {
        return Err(EngineError::ShapeMismatch);
    }
    Ok(())
}

/// Wire-stable filter kind codes. Clients may select a filter by this numeric code, so the
/// discriminants are part of the engine's external contract and must never be reordered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FilterKind {
    Grayscale = 0,
    Invert = 1,
    Sepia = 2,
    BoxBlur = 3,
    GaussianBlur = 4,
    Edge = 5,
    ScaleUp = 6,
    ScaleDown = 7,
}

impl FilterKind {
    pub fn from_code(code: u8) -> Option<FilterKind> {
        match code {
            0 => Some(FilterKind::Grayscale),
            1 => Some(FilterKind::Invert),
            2 => Some(FilterKind::Sepia),
            3 => Some(FilterKind::BoxBlur),
            4 => Some(FilterKind::GaussianBlur),
            5 => Some(FilterKind::Edge),
            6 => Some(FilterKind::ScaleUp),
            7 => Some(FilterKind::ScaleDown),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_dimension_mismatch() {
        let a = [0u8; 12];
        let mut b = [0u8; 12];
        let input = ImageView::new(&a, 2, 2, 3);
        let output = ImageViewMut::new(&mut b, 2, 1, 3);
        assert_eq!(validate_shapes(&input, &output), Err(EngineError::ShapeMismatch));
    }

    #[test]
    fn rejects_bad_channel_count() {
        let a = [0u8; 8];
        let mut b = [0u8; 8];
        let input = ImageView::new(&a, 2, 2, 2);
        let output = ImageViewMut::new(&mut b, 2, 2, 2);
        assert_eq!(validate_shapes(&input, &output), Err(EngineError::ShapeMismatch));
    }

    #[test]
    fn accepts_matching_rgb() {
        let a = [0u8; 12];
        let mut b = [0u8; 12];
        let input = ImageView::new(&a, 2, 2, 3);
        let output = ImageViewMut::new(&mut b, 2, 2, 3);
        assert_eq!(validate_shapes(&input, &output), Ok(()));
    }

    #[test]
    fn wire_codes_are_stable() {
        assert_eq!(FilterKind::from_code(0), Some(FilterKind::Grayscale));
        assert_eq!(FilterKind::from_code(1), Some(FilterKind::Invert));
        assert_eq!(FilterKind::from_code(2), Some(FilterKind::Sepia));
        assert_eq!(FilterKind::from_code(7), Some(FilterKind::ScaleDown));
        assert_eq!(FilterKind::from_code(8), None);
    }
}
