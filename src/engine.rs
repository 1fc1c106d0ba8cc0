//
// filter-engine - a persistent thread pool for invert/grayscale/sepia image filters
// engine.rs - lifecycle and per-filter submission entry points
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

use std::sync::Arc;

use log::debug;

use super::error::{EngineError, EngineResult};
use super::image::{validate_shapes, FilterKind, ImageView, ImageViewMut};
use super::kernel::kernel_for;
use super::pool::WorkerPool;
use super::queue::Controller;
use super::work::build_context;

/// Default node arena capacity used when `initialize` is called with `arena_size == 0`.
pub const DEFAULT_ARENA_SIZE: u32 = 64;

/// Images with `height <= THRESHOLD` rows run synchronously on the calling thread instead of
/// being handed to the worker pool.
pub const THRESHOLD: u32 = 100;

/// The long-lived worker pool and its work queue.
///
/// Multiple engines may coexist; nothing in this type is global/process-wide state (§9).
pub struct Engine {
    controller: Arc<Controller>,
    pool: Option<WorkerPool>,
}

impl Engine {
    /// Creates and initializes an engine with default arena size and thread count.
    pub fn create() -> EngineResult<Engine> {
        Engine::initialize(0, 0)
    }

    /// Creates an engine with an explicit arena size and thread count. Passing `0` for
    /// either selects the default (`DEFAULT_ARENA_SIZE`, or the detected CPU count).
    pub fn initialize(arena_size: u32, thread_count: u32) -> EngineResult<Engine> {
        let arena_size = if arena_size == 0 {
            DEFAULT_ARENA_SIZE
        } else {
            arena_size
        } as usize;

        let thread_count = if thread_count == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            thread_count as usize
        };

        debug!(
            "initializing engine: arena_size={}, thread_count={}",
            arena_size, thread_count
        );

        let controller = Arc::new(Controller::new(arena_size));
        let pool = spawn_pool(Arc::clone(&controller), thread_count)?;

        Ok(Engine {
            controller,
            pool: Some(pool),
        })
    }

    /// Applies the invert filter; see `kernel::invert` for the per-pixel math.
    pub fn invert(&self, input: ImageView<'_>, output: ImageViewMut<'_>) -> EngineResult<()> {
        self.submit(input, output, FilterKind::Invert)
    }

    /// Applies the grayscale filter; see `kernel::grayscale` for the per-pixel math.
    pub fn grayscale(&self, input: ImageView<'_>, output: ImageViewMut<'_>) -> EngineResult<()> {
        self.submit(input, output, FilterKind::Grayscale)
    }

    /// Applies the sepia filter; see `kernel::sepia` for the per-pixel math.
    pub fn sepia(&self, input: ImageView<'_>, output: ImageViewMut<'_>) -> EngineResult<()> {
        self.submit(input, output, FilterKind::Sepia)
    }

    /// Applies the filter named by a wire-stable `FilterKind` code (§6). Lets a client pick a
    /// filter at runtime instead of calling `invert`/`grayscale`/`sepia` directly; an unknown
    /// code or a reserved kind with no kernel both fail with `EngineError::UnsupportedKind`.
    pub fn apply_by_code(
        &self,
        code: u8,
        input: ImageView<'_>,
        output: ImageViewMut<'_>,
    ) -> EngineResult<()> {
        let kind = FilterKind::from_code(code).ok_or(EngineError::UnsupportedKind)?;
        self.submit(input, output, kind)
    }

    // Shared submission path for every implemented filter kind: validate shape, pick sync vs.
    // async based on `THRESHOLD`, and either run inline or hand a context to the queue.
    //
    // SAFETY (engine-wide contract, not checked by the type system): on the asynchronous
    // path the returned context outlives this call's borrow of `input`/`output`. The caller
    // must not read `output` or mutate `input` again until the next `Engine::wait()` call
    // returns — the same discipline `emuell-phonic`'s thread pool documents for its own
    // cross-thread buffer pointers (see `src/work.rs`).
    fn submit(
        &self,
        input: ImageView<'_>,
        output: ImageViewMut<'_>,
        kind: FilterKind,
    ) -> EngineResult<()> {
        if self.controller.is_shutdown() {
            return Err(EngineError::Shutdown);
        }
        validate_shapes(&input, &output)?;
        let kernel = kernel_for(kind).ok_or(EngineError::UnsupportedKind)?;

        let width = input.width;
        let height = input.height;
        let channels = input.channels;

        if height <= THRESHOLD {
            log::trace!("submitting {:?} synchronously ({}x{})", kind, width, height);
            // Single work item spanning the whole image, run inline.
            let context =
                build_context(input.bytes, output.bytes, width, height, channels, kernel);
            while context.try_run_one().is_some() {}
            return Ok(());
        }

        log::trace!("submitting {:?} asynchronously ({}x{})", kind, width, height);
        let context = build_context(input.bytes, output.bytes, width, height, channels, kernel);
        match self.controller.acquire(context) {
            Some(index) => {
                self.controller.enqueue(index);
                Ok(())
            }
            None => Err(EngineError::Shutdown),
        }
    }

    /// Blocks until every context enqueued before this call has run to completion.
    /// Level-triggered: a second call with nothing newly enqueued returns immediately.
    pub fn wait(&self) {
        self.controller.wait_drained();
    }

    /// Waits for outstanding work, then shuts the engine down and joins every worker thread.
    /// Submissions observed after shutdown begins fail with `EngineError::Shutdown`.
    pub fn destroy(mut self) {
        self.controller.wait_drained();
        self.controller.begin_shutdown();
        if let Some(pool) = self.pool.take() {
            debug!("joining worker threads");
            pool.join_all();
        }
    }
}

fn spawn_pool(controller: Arc<Controller>, thread_count: usize) -> EngineResult<WorkerPool> {
    if thread_count == 0 {
        return Err(EngineError::ResourceExhausted);
    }
    Ok(WorkerPool::spawn(controller, thread_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(width: u32, height: u32, fill: u8) -> Vec<u8> {
        vec![fill; (width * height * 3) as usize]
    }

    #[test]
    fn create_uses_defaults() {
        let engine = Engine::create().unwrap();
        assert_eq!(engine.controller.arena_capacity(), DEFAULT_ARENA_SIZE as usize);
        engine.destroy();
    }

    // S1: sync path
    #[test]
    fn invert_sync_matches_scenario() {
        let engine = Engine::initialize(4, 2).unwrap();
        let input = [10u8, 20, 30, 200, 100, 50];
        let mut output = [0u8; 6];
        engine
            .invert(
                ImageView::new(&input, 2, 1, 3),
                ImageViewMut::new(&mut output, 2, 1, 3),
            )
            .unwrap();
        assert_eq!(output, [245, 235, 225, 55, 155, 205]);
        engine.destroy();
    }

    #[test]
    fn grayscale_sync_matches_scenario() {
        let engine = Engine::initialize(4, 2).unwrap();
        let input = [100u8, 150, 200];
        let mut output = [0u8; 3];
        engine
            .grayscale(
                ImageView::new(&input, 1, 1, 3),
                ImageViewMut::new(&mut output, 1, 1, 3),
            )
            .unwrap();
        assert_eq!(output, [140, 140, 140]);
        engine.destroy();
    }

    #[test]
    fn sepia_sync_matches_scenario() {
        let engine = Engine::initialize(4, 2).unwrap();
        let input = [100u8, 50, 25];
        let mut output = [0u8; 3];
        engine
            .sepia(
                ImageView::new(&input, 1, 1, 3),
                ImageViewMut::new(&mut output, 1, 1, 3),
            )
            .unwrap();
        assert_eq!(output, [82, 73, 57]);
        engine.destroy();
    }

    #[test]
    fn async_path_matches_single_threaded_reference() {
        let engine = Engine::initialize(4, 2).unwrap();
        let width = 8;
        let height = 201;
        let input = rgb(width, height, 7);
        let mut output = vec![0u8; input.len()];
        engine
            .invert(
                ImageView::new(&input, width, height, 3),
                ImageViewMut::new(&mut output, width, height, 3),
            )
            .unwrap();
        engine.wait();
        assert!(output.iter().all(|&b| b == 255 - 7));
        engine.destroy();
    }

    // §6: clients may select a filter by its wire-stable code instead of calling
    // invert/grayscale/sepia directly.
    #[test]
    fn apply_by_code_matches_the_named_method() {
        let engine = Engine::initialize(4, 2).unwrap();
        let input = [10u8, 20, 30, 200, 100, 50];
        let mut by_code = [0u8; 6];
        let mut by_name = [0u8; 6];
        engine
            .apply_by_code(
                FilterKind::Invert as u8,
                ImageView::new(&input, 2, 1, 3),
                ImageViewMut::new(&mut by_code, 2, 1, 3),
            )
            .unwrap();
        engine
            .invert(
                ImageView::new(&input, 2, 1, 3),
                ImageViewMut::new(&mut by_name, 2, 1, 3),
            )
            .unwrap();
        assert_eq!(by_code, by_name);
        engine.destroy();
    }

    #[test]
    fn apply_by_code_rejects_unknown_codes() {
        let engine = Engine::initialize(4, 2).unwrap();
        let input = [0u8; 12];
        let mut output = [0u8; 12];
        let result = engine.apply_by_code(
            42,
            ImageView::new(&input, 2, 2, 3),
            ImageViewMut::new(&mut output, 2, 2, 3),
        );
        assert_eq!(result, Err(EngineError::UnsupportedKind));
        engine.destroy();
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let engine = Engine::initialize(4, 2).unwrap();
        let input = [0u8; 12];
        let mut output = [0u8; 9];
        let result = engine.invert(
            ImageView::new(&input, 2, 2, 3),
            ImageViewMut::new(&mut output, 1, 3, 3),
        );
        assert_eq!(result, Err(EngineError::ShapeMismatch));
        engine.destroy();
    }

    #[test]
    fn unsupported_kind_is_rejected() {
        let engine = Engine::initialize(4, 2).unwrap();
        let input = [0u8; 12];
        let mut output = [0u8; 12];
        let result = engine.submit(
            ImageView::new(&input, 2, 2, 3),
            ImageViewMut::new(&mut output, 2, 2, 3),
            FilterKind::BoxBlur,
        );
        assert_eq!(result, Err(EngineError::UnsupportedKind));
        engine.destroy();
    }

    // S6: 10 grayscale jobs back to back on a 2-worker engine, then one wait().
    #[test]
    fn many_submissions_then_single_wait_drains_everything() {
        let engine = Engine::initialize(64, 2).unwrap();
        let width = 8;
        let height = 150;
        let mut outputs: Vec<Vec<u8>> = (0..10).map(|_| vec![0u8; (width * height * 3) as usize]).collect();
        let inputs: Vec<Vec<u8>> = (0..10)
            .map(|i| vec![(i * 10) as u8; (width * height * 3) as usize])
            .collect();

        for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
            engine
                .grayscale(
                    ImageView::new(input, width, height, 3),
                    ImageViewMut::new(output, width, height, 3),
                )
                .unwrap();
        }
        engine.wait();

        for (input, output) in inputs.iter().zip(outputs.iter()) {
            let expected_gray =
                (0.299 * input[0] as f32 + 0.587 * input[0] as f32 + 0.114 * input[0] as f32) as u8;
            assert!(output.iter().all(|&b| b == expected_gray));
        }
        assert_eq!(engine.controller.arena_capacity(), 64);
        engine.destroy();
    }

    #[test]
    fn wait_after_drain_is_a_no_op() {
        let engine = Engine::initialize(4, 2).unwrap();
        engine.wait();
        engine.wait();
        engine.destroy();
    }

    #[test]
    fn destroy_joins_every_worker() {
        let engine = Engine::initialize(4, 3).unwrap();
        engine.destroy();
    }
}
