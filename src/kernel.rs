//
// filter-engine - a persistent thread pool for invert/grayscale/sepia image filters
// kernel.rs - pure per-pixel filter kernels
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
// Each kernel maps a run of `width * rows` tightly-packed pixels from `input` to the same
// span of `output`. Kernels never allocate and never see anything outside their assigned
// byte range.
//

use super::image::FilterKind;

pub(crate) type KernelFn = fn(input: &[u8], output: &mut [u8], channels: usize);

pub(crate) fn kernel_for(kind: FilterKind) -> Option<KernelFn> {
    match kind {
        FilterKind::Grayscale => Some(grayscale),
        FilterKind::Invert => Some(invert),
        FilterKind::Sepia => Some(sepia),
        FilterKind::BoxBlur
        | FilterKind::GaussianBlur
        | FilterKind::Edge
        | FilterKind::ScaleUp
        | FilterKind::ScaleDown => None,
    }
}

fn invert(input: &[u8], output: &mut [u8], channels: usize) {
    for (src, dst) in input.chunks_exact(channels).zip(output.chunks_exact_mut(channels)) {
        dst[0] = 255 - src[0];
        dst[1] = 255 - src[1];
        dst[2] = 255 - src[2];
        if channels == 4 {
            dst[3] = src[3];
        }
    }
}

fn grayscale(input: &[u8], output: &mut [u8], channels: usize) {
    for (src, dst) in input.chunks_exact(channels).zip(output.chunks_exact_mut(channels)) {
        let r = src[0] as f32;
        let g = src[1] as f32;
        let b = src[2] as f32;
        let y = (0.299 * r + 0.587 * g + 0.114 * b) as u8;
        dst[0] = y;
        dst[1] = y;
        dst[2] = y;
        if channels == 4 {
            dst[3] = src[3];
        }
    }
}

fn sepia(input: &[u8], output: &mut [u8], channels: usize) {
    for (src, dst) in input.chunks_exact(channels).zip(output.chunks_exact_mut(channels)) {
        let r = src[0] as f32;
        let g = src[1] as f32;
        let b = src[2] as f32;
        dst[0] = clamp_u8(0.393 * r + 0.769 * g + 0.189 * b);
        dst[1] = clamp_u8(0.349 * r + 0.686 * g + 0.168 * b);
        dst[2] = clamp_u8(0.272 * r + 0.534 * g + 0.131 * b);
        if channels == 4 {
            dst[3] = src[3];
        }
    }
}

fn clamp_u8(value: f32) -> u8 {
    if value > 255.0 {
        255
    } else {
        value as u8
    }
}
