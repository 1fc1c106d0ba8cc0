//
// filter-engine - a persistent thread pool for invert/grayscale/sepia image filters
// work.rs - work items and work contexts
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
// A work context is the batch of work items created for one client submission. Its two
// progress counters (`next_index`, `done_count`) are the only state workers touch without
// holding the queue lock; see `src/queue.rs` for how a context travels through the arena
// and the FIFO.
//

use std::slice;
use std::sync::atomic::{AtomicU32, Ordering};

use super::kernel::KernelFn;

/// Partition granularity: rows handed to a single work item.
pub(crate) const ROWS_PER_ITEM: u32 = 50;

// A raw, non-owning byte range used to let a `WorkItem` outlive the borrow that created it.
//
// SAFETY: the pointer is derived from a caller-owned buffer that the engine's contract
// requires to stay valid and untouched by the caller until the matching `Engine::wait()`
// call returns. This is the same pattern `emuell-phonic`'s thread pool uses for its
// `WorkerProcessingTask` (`NonNull` pointers wrapped in `unsafe impl Send`, justified by "the
// main thread creates these pointers from `&mut` references and waits for all workers to
// complete before accessing the referenced data again") — the engine's `wait()` barrier is
// exactly that guarantee.
#[derive(Copy, Clone)]
struct RawSlice {
    ptr: *const u8,
    len: usize,
}

unsafe impl Send for RawSlice {}
unsafe impl Sync for RawSlice {}

impl RawSlice {
    fn new(bytes: &[u8]) -> RawSlice {
        RawSlice {
            ptr: bytes.as_ptr(),
            len: bytes.len(),
        }
    }

    unsafe fn as_slice(&self) -> &[u8] {
        slice::from_raw_parts(self.ptr, self.len)
    }
}

#[derive(Copy, Clone)]
struct RawSliceMut {
    ptr: *mut u8,
    len: usize,
}

unsafe impl Send for RawSliceMut {}
unsafe impl Sync for RawSliceMut {}

impl RawSliceMut {
    fn new(bytes: &mut [u8]) -> RawSliceMut {
        RawSliceMut {
            ptr: bytes.as_mut_ptr(),
            len: bytes.len(),
        }
    }

    #[allow(clippy::mut_from_ref)]
    unsafe fn as_slice_mut(&self) -> &mut [u8] {
        slice::from_raw_parts_mut(self.ptr, self.len)
    }
}

/// A descriptor pairing a kernel with disjoint input/output byte ranges.
pub(crate) struct WorkItem {
    input: RawSlice,
    output: RawSliceMut,
    channels: usize,
    kernel: KernelFn,
}

impl WorkItem {
    // SAFETY: caller (`build_context`) guarantees `input`/`output` cover exactly the same
    // number of bytes and that no other `WorkItem` in the same context aliases this range.
    fn run(&self) {
        let input = unsafe { self.input.as_slice() };
        let output = unsafe { self.output.as_slice_mut() };
        (self.kernel)(input, output, self.channels);
    }
}

/// The full batch of work items for one client submission, plus its progress counters.
pub(crate) struct WorkContext {
    items: Box<[WorkItem]>,
    count: u32,
    next_index: AtomicU32,
    done_count: AtomicU32,
    // Workers currently probing this context; see the module doc in `src/arena.rs` for why
    // the arena must not recycle a node until this reaches zero.
    inflight: AtomicU32,
}

impl WorkContext {
    pub(crate) fn count(&self) -> u32 {
        self.count
    }

    pub(crate) fn inflight_enter(&self) {
        self.inflight.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn inflight_exit(&self) {
        self.inflight.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn inflight(&self) -> u32 {
        self.inflight.load(Ordering::Acquire)
    }

    /// Runs exactly one item if the queue of work still has one to claim, returning
    /// `Some(done_count_after)` when this call was the one that claimed and ran an item, or
    /// `None` once the context has no more items to hand out.
    pub(crate) fn try_run_one(&self) -> Option<u32> {
        if self.next_index.load(Ordering::Acquire) >= self.count {
            return None;
        }
        let index = self.next_index.fetch_add(1, Ordering::AcqRel);
        if index >= self.count {
            return None;
        }
        self.items[index as usize].run();
        Some(self.done_count.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub(crate) fn has_more(&self) -> bool {
        self.next_index.load(Ordering::Acquire) < self.count
    }
}

/// Builds the work context for one submission: partitions `input`/`output` into
/// `ROWS_PER_ITEM`-row slabs, with the last slab absorbing the remainder, per §4.C.
pub(crate) fn build_context(
    input_bytes: &[u8],
    output_bytes: &mut [u8],
    width: u32,
    height: u32,
    channels: u32,
    kernel: KernelFn,
) -> WorkContext {
    let stride = width as usize * channels as usize;
    let count = std::cmp::max(1, height / ROWS_PER_ITEM);

    let input_ptr = RawSlice::new(input_bytes);
    let output_ptr = RawSliceMut::new(output_bytes);

    let mut items = Vec::with_capacity(count as usize);
    let mut row = 0u32;
    for i in 0..count {
        let rows = if i == count - 1 {
            height - row
        } else {
            ROWS_PER_ITEM
        };
        let start = row as usize * stride;
        let len = rows as usize * stride;
        items.push(WorkItem {
            input: RawSlice {
                ptr: unsafe { input_ptr.ptr.add(start) },
                len,
            },
            output: RawSliceMut {
                ptr: unsafe { output_ptr.ptr.add(start) },
                len,
            },
            channels: channels as usize,
            kernel,
        });
        row += rows;
    }
    debug_assert_eq!(row, height);

    WorkContext {
        items: items.into_boxed_slice(),
        count,
        next_index: AtomicU32::new(0),
        done_count: AtomicU32::new(0),
        inflight: AtomicU32::new(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::kernel_for;
    use crate::image::FilterKind;

    // S5: 201 rows, ROWS_PER_ITEM=50 -> 4 items with row spans {50,50,50,51}
    #[test]
    fn partition_completeness_and_remainder_absorption() {
        let width = 8u32;
        let height = 201u32;
        let channels = 3u32;
        let input = vec![0u8; (width * height * channels) as usize];
        let mut output = vec![0u8; input.len()];
        let kernel = kernel_for(FilterKind::Invert).unwrap();
        let ctx = build_context(&input, &mut output, width, height, channels, kernel);
        assert_eq!(ctx.count(), 4);
        let mut rows_seen = 0u32;
        for (i, item) in ctx.items.iter().enumerate() {
            let rows = item.input.len / (width as usize * channels as usize);
            rows_seen += rows as u32;
            if i < 3 {
                assert_eq!(rows, 50);
            } else {
                assert_eq!(rows, 51);
            }
        }
        assert_eq!(rows_seen, height);
    }

    #[test]
    fn try_run_one_drains_exactly_count_times() {
        let width = 4u32;
        let height = 4u32;
        let channels = 3u32;
        let input = vec![1u8; (width * height * channels) as usize];
        let mut output = vec![0u8; input.len()];
        let kernel = kernel_for(FilterKind::Invert).unwrap();
        let ctx = build_context(&input, &mut output, width, height, channels, kernel);
        let mut runs = 0;
        while ctx.try_run_one().is_some() {
            runs += 1;
        }
        assert_eq!(runs, ctx.count());
        assert!(!ctx.has_more());
        assert_eq!(output, vec![254u8; input.len()]);
    }
}
