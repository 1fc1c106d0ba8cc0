//
// filter-engine - a persistent thread pool for invert/grayscale/sepia image filters
// queue.rs - the FIFO of work-context nodes and its two condition variables
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
// Two waits are kept on separate condition variables on purpose: workers wait on `cv_start`
// for new work, clients wait on `cv_done` for the queue to drain. Keeping them apart avoids
// waking every idle worker whenever a client is merely draining (§9).
//

use std::sync::{Condvar, Mutex};

use log::trace;

use super::arena::Arena;
use super::work::WorkContext;

struct State {
    head: Option<usize>,
    tail: Option<usize>,
    free_head: Option<usize>,
    shutdown: bool,
}

pub(crate) struct Controller {
    arena: Arena,
    state: Mutex<State>,
    cv_start: Condvar,
    cv_done: Condvar,
}

impl Controller {
    pub(crate) fn new(arena_size: usize) -> Controller {
        let arena = Arena::new(arena_size);
        let state = State {
            head: None,
            tail: None,
            free_head: Some(0),
            shutdown: false,
        };
        Controller {
            arena,
            state: Mutex::new(state),
            cv_start: Condvar::new(),
            cv_done: Condvar::new(),
        }
    }

    pub(crate) fn arena_capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Acquires a free node and links `context` into it, blocking the caller while the arena
    /// is exhausted rather than failing fast. Returns `None` if shutdown began while waiting.
    pub(crate) fn acquire(&self, context: WorkContext) -> Option<usize> {
        let mut guard = self.state.lock().unwrap();
        loop {
            if guard.shutdown {
                return None;
            }
            if let Some(index) = guard.free_head {
                let next = self.arena.free_next(index);
                guard.free_head = next;
                self.arena.install(index, context, None);
                return Some(index);
            }
            trace!("arena exhausted, blocking submitter on cv_done");
            guard = self.cv_done.wait(guard).unwrap();
        }
    }

    /// Links an already-acquired node onto the tail of the FIFO and wakes every worker.
    pub(crate) fn enqueue(&self, index: usize) {
        let mut guard = self.state.lock().unwrap();
        self.arena.link_next(index, None);
        match guard.tail {
            Some(tail) => self.arena.link_next(tail, Some(index)),
            None => guard.head = Some(index),
        }
        guard.tail = Some(index);
        trace!("enqueued node {}", index);
        self.cv_start.notify_all();
    }

    /// Returns the current head, waiting on `cv_start` while the queue is empty and the
    /// engine hasn't been shut down. Returns `None` only once shutdown has been observed.
    pub(crate) fn wait_for_head(&self) -> Option<usize> {
        let mut guard = self.state.lock().unwrap();
        loop {
            if guard.shutdown {
                return None;
            }
            if let Some(index) = guard.head {
                return Some(index);
            }
            guard = self.cv_start.wait(guard).unwrap();
        }
    }

    /// Borrows the work context stored at `index`. See `Arena::context` for the safety
    /// contract this relies on.
    pub(crate) fn context(&self, index: usize) -> &WorkContext {
        self.arena.context(index)
    }

    /// Detaches `index` from the head of the FIFO and returns its node to the free list.
    /// Must only be called by the single finisher for that context, after observing
    /// `WorkContext::inflight() == 0` (see `src/pool.rs`).
    pub(crate) fn dequeue(&self, index: usize) {
        let mut guard = self.state.lock().unwrap();
        let next = self.arena.queue_next(index);
        guard.head = next;
        if guard.head.is_none() {
            guard.tail = None;
        }
        self.arena.clear(index);
        self.arena.link_next(index, guard.free_head);
        guard.free_head = Some(index);
        self.cv_done.notify_all();
        if guard.head.is_some() {
            trace!("node {} dequeued, {} remains head", index, guard.head.unwrap());
            self.cv_start.notify_all();
        } else {
            trace!("node {} dequeued, queue now empty", index);
        }
    }

    /// Blocks until the queue has been observed empty at least once. Level-triggered: if the
    /// queue is already empty when called, returns immediately.
    pub(crate) fn wait_drained(&self) {
        let mut guard = self.state.lock().unwrap();
        while guard.head.is_some() {
            guard = self.cv_done.wait(guard).unwrap();
        }
    }

    /// Marks the controller as shut down and wakes every worker so it can observe the flag
    /// and exit. Idempotent.
    pub(crate) fn begin_shutdown(&self) {
        let mut guard = self.state.lock().unwrap();
        guard.shutdown = true;
        self.cv_start.notify_all();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.state.lock().unwrap().shutdown
    }
}
