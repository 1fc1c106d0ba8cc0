//
// filter-engine - a persistent thread pool for invert/grayscale/sepia image filters
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

//! An in-process engine that applies pixel filters (invert, grayscale, sepia) to raster
//! images using a fixed pool of worker threads.
//!
//! Small images run inline on the calling thread; larger ones are partitioned into row
//! slabs, queued on an intrusive FIFO of work contexts backed by a fixed-capacity node
//! arena, and picked up by whichever worker is free. [`Engine::wait`] is the barrier that
//! guarantees every submission made before the call has finished before it returns.
//!
//! ```no_run
//! use filter_engine::{Engine, ImageView, ImageViewMut};
//!
//! let engine = Engine::create().unwrap();
//! let input = vec![0u8; 3 * 4 * 3];
//! let mut output = vec![0u8; input.len()];
//! engine.invert(ImageView::new(&input, 4, 3, 3), ImageViewMut::new(&mut output, 4, 3, 3)).unwrap();
//! engine.wait();
//! engine.destroy();
//! ```

mod arena;
mod engine;
mod error;
mod image;
mod kernel;
mod pool;
mod queue;
mod work;

pub use engine::{Engine, DEFAULT_ARENA_SIZE, THRESHOLD};
pub use error::{EngineError, EngineResult};
pub use image::{FilterKind, ImageView, ImageViewMut};
