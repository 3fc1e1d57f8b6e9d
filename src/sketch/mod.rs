//! Probabilistic frequency estimation
//!
//! Count-Min-Log sketch: fixed-memory per-key frequency estimates with
//! logarithmic 16-bit counters, plus a checksummed snapshot format so the
//! full cell table can be persisted and restored.
//!
//! # Usage
//!
//! ```rust
//! # use cml_domain::sketch::CountMinLogSketch;
//! let mut sketch = CountMinLogSketch::with_seed(0.001, 0.01, 42).unwrap();
//! sketch.increase_count(b"apple");
//! sketch.increase_count(b"apple");
//! assert!(sketch.get_count(b"apple") >= 1);
//! assert_eq!(sketch.get_count(b"pear"), 0);
//! assert_eq!(sketch.count(), 2);
//! ```

mod count_min_log;
mod error;
mod snapshot;

pub use count_min_log::{CountMinLogSketch, CELLS_MAX, CELL_MAX, LOG_BASE};
pub use error::{SketchError, SnapshotError};
