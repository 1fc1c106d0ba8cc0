//
// filter-engine - a persistent thread pool for invert/grayscale/sepia image filters
// arena.rs - fixed-capacity, allocator-free storage for queued work contexts
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
// The arena is a plain data structure; it has no lock of its own. `src/queue.rs`'s
// `Controller` holds the single `Mutex` that guards the free-list head and the FIFO
// head/tail pointers, exactly as §5 requires ("head, tail, shutdown, and arena free-list
// pointers are modified only under the queue lock"). What the arena buys on its own is O(1),
// allocation-free storage indexed by a small integer instead of the original's raw
// `Work_Context_Node*` — the index-linked alternative §9 calls out explicitly.
//
// A context is not freed the instant its `done_count` reaches `count`: a sibling worker may
// still be mid-iteration of its own claim loop on the same context (an over-increment past
// `count` that does no work but still reads `count`/`next_index`). `release` is only called
// once the finisher has observed `WorkContext::inflight() == 0`, which the controller
// enforces before calling it — see `Controller::dequeue` in `src/queue.rs`.
//

use std::cell::UnsafeCell;

use super::work::WorkContext;

struct Node {
    context: Option<WorkContext>,
    next: Option<usize>,
}

pub(crate) struct Arena {
    nodes: Box<[UnsafeCell<Node>]>,
}

// SAFETY: every field access to a `Node` happens either (a) while the controller's `Mutex`
// is held (free-list and queue-link mutation), or (b) through `context()`, whose caller
// contract guarantees the node is enqueued and not concurrently mutated (see that method).
unsafe impl Sync for Arena {}

impl Arena {
    pub(crate) fn new(capacity: usize) -> Arena {
        assert!(capacity > 0, "arena capacity must be positive");
        let mut nodes = Vec::with_capacity(capacity);
        for i in 0..capacity {
            let next = if i + 1 < capacity { Some(i + 1) } else { None };
            nodes.push(UnsafeCell::new(Node {
                context: None,
                next,
            }));
        }
        Arena {
            nodes: nodes.into_boxed_slice(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.nodes.len()
    }

    // Caller must hold the controller lock.
    pub(crate) fn free_next(&self, index: usize) -> Option<usize> {
        unsafe { (*self.nodes[index].get()).next }
    }

    // Caller must hold the controller lock.
    pub(crate) fn install(&self, index: usize, context: WorkContext, next: Option<usize>) {
        let node = unsafe { &mut *self.nodes[index].get() };
        node.context = Some(context);
        node.next = next;
    }

    // Caller must hold the controller lock.
    pub(crate) fn link_next(&self, index: usize, next: Option<usize>) {
        unsafe { (*self.nodes[index].get()).next = next };
    }

    // Caller must hold the controller lock.
    pub(crate) fn queue_next(&self, index: usize) -> Option<usize> {
        unsafe { (*self.nodes[index].get()).next }
    }

    // Caller must hold the controller lock. Tears the context down and returns the node to
    // whatever free-list the controller links it into.
    pub(crate) fn clear(&self, index: usize) {
        unsafe { (*self.nodes[index].get()).context = None };
    }

    /// Borrows the context stored at `index`.
    ///
    /// SAFETY (caller contract, upheld by `Controller`): `index` was observed as the queue
    /// head (or a node a worker is already processing) under the controller lock, and it
    /// will not be torn down (`clear`) until every worker that has seen it as head has
    /// exited its claim loop, tracked by `WorkContext::inflight`. No code path mutates
    /// `Node::context` for an index that's reachable this way, so this shared borrow never
    /// aliases a write.
    pub(crate) fn context(&self, index: usize) -> &WorkContext {
        let node = unsafe { &*self.nodes[index].get() };
        node.context
            .as_ref()
            .expect("arena: context missing for a queued node")
    }
}
