//
// filter-engine - a persistent thread pool for invert/grayscale/sepia image filters
// error.rs - the engine's error taxonomy
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

use std::error;
use std::fmt;

pub type EngineResult<T> = Result<T, EngineError>;

/// Everything that can go wrong at an initialization or submission call site.
///
/// Worker threads never produce errors of their own; a violated invariant inside a kernel
/// is a programmer error and aborts the process rather than surfacing here.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// Input/output dimension or channel mismatch, or `channels` not in `{3, 4}`.
    ShapeMismatch,
    /// The requested filter kind has no implemented kernel.
    UnsupportedKind,
    /// The node arena is exhausted and the engine is configured to fail rather than block.
    QueueFull,
    /// Thread creation or allocation failed during `initialize`.
    ResourceExhausted,
    /// Submission was attempted after `destroy` began.
    Shutdown,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            EngineError::ShapeMismatch => "input/output image shapes do not match",
            EngineError::UnsupportedKind => "filter kind has no implemented kernel",
            EngineError::QueueFull => "node arena exhausted",
            EngineError::ResourceExhausted => "failed to allocate engine resources",
            EngineError::Shutdown => "engine is shutting down",
        };
        f.write_str(msg)
    }
}

impl error::Error for EngineError {}
