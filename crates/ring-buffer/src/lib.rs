//! Fixed-Capacity Ring Buffer
//!
//! Bounded history storage for per-frame measurements such as lane
//! polynomial fits. The oldest entry is dropped once the buffer is full.

mod buffer;

pub use buffer::{RingBuffer, DEFAULT_CAPACITY};
