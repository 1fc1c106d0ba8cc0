//
// filter-engine - a persistent thread pool for invert/grayscale/sepia image filters
// pool.rs - the fixed set of worker threads draining the queue
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
use std::thread;
use std::thread::JoinHandle;

use log::trace;

use super::queue::Controller;

pub(crate) struct WorkerPool {
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn spawn(controller: Arc<Controller>, thread_count: usize) -> WorkerPool {
        let mut threads = Vec::with_capacity(thread_count);
        for id in 0..thread_count {
            let controller = Arc::clone(&controller);
            threads.push(
                thread::Builder::new()
                    .name(format!("filter-engine-worker-{}", id))
                    .spawn(move || worker_loop(&controller))
                    .expect("failed to spawn filter engine worker thread"),
            );
        }
        WorkerPool { threads }
    }

    pub(crate) fn join_all(self) {
        for handle in self.threads {
            let _ = handle.join();
        }
    }
}

// One worker's cooperative loop, implementing §4.E step by step:
//
// 1. Sleep on `cv_start` while the queue is empty (handled inside `wait_for_head`).
// 2. Race every other worker already on the same head context for items via
//    `WorkContext::try_run_one`, tracked by `inflight` so the context can't be recycled out
//    from under a sibling still mid-claim.
// 3. Whoever's own claim pushes `done_count` to `count` is the finisher: it waits for any
//    sibling still inflight to finish, then dequeues and stays eligible to pick up the next
//    head immediately, without sleeping on `cv_start` again.
fn worker_loop(controller: &Controller) {
    loop {
        let index = match controller.wait_for_head() {
            Some(index) => index,
            None => {
                trace!("worker observed shutdown, exiting");
                return;
            }
        };

        let context = controller.context(index);
        context.inflight_enter();
        let mut finisher = false;
        while context.has_more() {
            if let Some(done) = context.try_run_one() {
                if done == context.count() {
                    finisher = true;
                }
            }
        }
        context.inflight_exit();

        if finisher {
            while context.inflight() != 0 {
                std::hint::spin_loop();
            }
            trace!("worker finished node {}, dequeuing", index);
            controller.dequeue(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::FilterKind;
    use crate::kernel::kernel_for;
    use crate::work::build_context;

    #[test]
    fn pool_drains_a_submitted_context() {
        let controller = Arc::new(Controller::new(4));
        let pool = WorkerPool::spawn(Arc::clone(&controller), 2);

        let input = vec![9u8; 64 * 64 * 3];
        let mut output = vec![0u8; input.len()];
        let kernel = kernel_for(FilterKind::Invert).unwrap();
        let context = build_context(&input, &mut output, 64, 64, 3, kernel);
        let index = controller.acquire(context).unwrap();
        controller.enqueue(index);

        controller.wait_drained();
        assert!(output.iter().all(|&b| b == 255 - 9));

        controller.begin_shutdown();
        pool.join_all();
    }
}
