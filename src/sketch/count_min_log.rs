//! Count-Min-Log Sketch
//!
//! A count-min sketch whose cells store the logarithm of a count rather than
//! the count itself. Each cell is a 16-bit Morris-style counter: it advances
//! from `c` to `c + 1` with probability `b^-c`, so a cell holding `c`
//! represents roughly `(b^c - 1) / (b - 1)` events.
//!
//! ## Update rule (conservative, probabilistic)
//!
//! ```text
//! key → fnv1a64 → (h1, h2) → column_i = (h1 + i*h2) mod width
//!                                  ↓
//!                c = min(row_i[column_i])
//!                                  ↓
//!          with probability b^-c: every row_i[column_i] == c  →  c + 1
//! ```
//!
//! Only the cells sitting at the minimum move, which keeps collisions from
//! compounding across rows. Point queries return the minimum across rows.

use super::SketchError;
use fnv::FnvHasher;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::hash::Hasher;

/// Base of the logarithmic cell encoding
pub const LOG_BASE: f64 = 1.00026;

/// Largest value a cell can hold; saturated cells stop advancing
pub const CELL_MAX: u16 = u16::MAX;

/// Upper bound on width * depth (256 MiB of 16-bit cells)
pub const CELLS_MAX: usize = 1 << 27;

/// Count-Min-Log sketch with 16-bit logarithmic counters
///
/// TigerStyle Invariants:
/// - `table.len() == width * depth`
/// - cells never decrease except through `reset`
/// - `total_count` == number of `increase_count` calls since the last reset
#[derive(Clone)]
pub struct CountMinLogSketch {
    width: usize,
    depth: usize,
    epsilon: f64,
    delta: f64,
    /// Row-major: row `i` occupies `table[i * width..(i + 1) * width]`
    table: Vec<u16>,
    total_count: u64,
    rng: ChaCha8Rng,
}

impl std::fmt::Debug for CountMinLogSketch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountMinLogSketch")
            .field("width", &self.width)
            .field("depth", &self.depth)
            .field("epsilon", &self.epsilon)
            .field("delta", &self.delta)
            .field("total_count", &self.total_count)
            .finish()
    }
}

impl CountMinLogSketch {
    /// Creates a sketch sized for relative error `epsilon` and failure
    /// probability `delta`, seeded from OS entropy.
    pub fn new(epsilon: f64, delta: f64) -> Result<Self, SketchError> {
        let (width, depth) = Self::dimensions_for(epsilon, delta)?;
        Ok(Self::build(
            width,
            depth,
            epsilon,
            delta,
            ChaCha8Rng::from_entropy(),
        ))
    }

    /// Same as [`new`](Self::new) but with a fixed RNG seed, so the sequence of
    /// probabilistic increments is reproducible.
    pub fn with_seed(epsilon: f64, delta: f64, seed: u64) -> Result<Self, SketchError> {
        let (width, depth) = Self::dimensions_for(epsilon, delta)?;
        Ok(Self::build(
            width,
            depth,
            epsilon,
            delta,
            ChaCha8Rng::seed_from_u64(seed),
        ))
    }

    /// Creates a sketch with explicit dimensions.
    ///
    /// epsilon and delta are back-derived from the dimensions
    /// (`e / width` and `e^-depth`).
    pub fn with_dimensions(width: usize, depth: usize, seed: u64) -> Result<Self, SketchError> {
        Self::check_dimensions(width, depth)?;
        let epsilon = std::f64::consts::E / width as f64;
        let delta = (-(depth as f64)).exp();
        Ok(Self::build(
            width,
            depth,
            epsilon,
            delta,
            ChaCha8Rng::seed_from_u64(seed),
        ))
    }

    /// Computes `(width, depth)` for the given accuracy targets.
    ///
    /// width = ceil(e / epsilon), depth = max(1, ceil(ln(1 / delta)))
    pub fn dimensions_for(epsilon: f64, delta: f64) -> Result<(usize, usize), SketchError> {
        // NaN fails both comparisons
        if !(epsilon > 0.0 && epsilon < 1.0) {
            return Err(SketchError::InvalidParameters(format!(
                "epsilon must be in (0, 1), got {}",
                epsilon
            )));
        }
        if !(delta > 0.0 && delta < 1.0) {
            return Err(SketchError::InvalidParameters(format!(
                "delta must be in (0, 1), got {}",
                delta
            )));
        }

        let width = (std::f64::consts::E / epsilon).ceil();
        let depth = (1.0 / delta).ln().ceil().max(1.0);
        if width > CELLS_MAX as f64 || depth > CELLS_MAX as f64 {
            return Err(SketchError::InvalidParameters(format!(
                "epsilon {} / delta {} need more than {} cells",
                epsilon, delta, CELLS_MAX
            )));
        }

        let (width, depth) = (width as usize, depth as usize);
        Self::check_dimensions(width, depth)?;
        Ok((width, depth))
    }

    fn check_dimensions(width: usize, depth: usize) -> Result<(), SketchError> {
        if width == 0 || depth == 0 {
            return Err(SketchError::InvalidParameters(format!(
                "width and depth must be positive, got {}x{}",
                width, depth
            )));
        }
        match width.checked_mul(depth) {
            Some(cells) if cells <= CELLS_MAX => Ok(()),
            _ => Err(SketchError::InvalidParameters(format!(
                "{}x{} exceeds {} cells",
                width, depth, CELLS_MAX
            ))),
        }
    }

    fn build(width: usize, depth: usize, epsilon: f64, delta: f64, rng: ChaCha8Rng) -> Self {
        let sketch = CountMinLogSketch {
            width,
            depth,
            epsilon,
            delta,
            table: vec![0; width * depth],
            total_count: 0,
            rng,
        };
        sketch.verify_invariants();
        sketch
    }

    /// Rebuilds a sketch from decoded snapshot parts.
    pub(crate) fn from_parts(
        width: usize,
        depth: usize,
        epsilon: f64,
        delta: f64,
        table: Vec<u16>,
        total_count: u64,
        seed: u64,
    ) -> Self {
        let sketch = CountMinLogSketch {
            width,
            depth,
            epsilon,
            delta,
            table,
            total_count,
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        sketch.verify_invariants();
        sketch
    }

    /// Verify all invariants hold for this sketch
    #[cfg(debug_assertions)]
    pub fn verify_invariants(&self) {
        debug_assert!(self.width > 0, "Invariant violated: width must be > 0");
        debug_assert!(self.depth > 0, "Invariant violated: depth must be > 0");
        debug_assert_eq!(
            self.table.len(),
            self.width * self.depth,
            "Invariant violated: table holds {} cells, expected {}x{}",
            self.table.len(),
            self.width,
            self.depth
        );
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    pub fn verify_invariants(&self) {}

    /// Records one occurrence of `key`.
    pub fn increase_count(&mut self, key: &[u8]) {
        self.total_count = self.total_count.saturating_add(1);

        let (h1, h2) = hash_key(key);
        let mut min = CELL_MAX;
        for row in 0..self.depth {
            min = min.min(self.table[self.cell_index(row, h1, h2)]);
        }

        if min == CELL_MAX || !self.increase_decision(min) {
            return;
        }

        for row in 0..self.depth {
            let idx = self.cell_index(row, h1, h2);
            if self.table[idx] == min {
                self.table[idx] = min + 1;
            }
        }
    }

    /// Estimated number of occurrences of `key`.
    ///
    /// Keys never inserted return 0.
    pub fn get_count(&self, key: &[u8]) -> u64 {
        let (h1, h2) = hash_key(key);
        let min = (0..self.depth)
            .map(|row| self.table[self.cell_index(row, h1, h2)])
            .min()
            .unwrap_or(0);
        cell_value(min) as u64
    }

    /// Exact number of `increase_count` calls since the last reset.
    pub fn count(&self) -> u64 {
        self.total_count
    }

    /// Zeroes every cell and the total count.
    pub fn reset(&mut self) {
        self.table.fill(0);
        self.total_count = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Overrides the exact total with a count cached outside the table, used
    /// when the info record is newer than the stored cells.
    pub(crate) fn set_count(&mut self, total_count: u64) {
        self.total_count = total_count;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub(crate) fn cells(&self) -> &[u16] {
        &self.table
    }

    #[inline]
    fn cell_index(&self, row: usize, h1: u32, h2: u32) -> usize {
        let combined = (h1 as u64).wrapping_add((row as u64).wrapping_mul(h2 as u64));
        row * self.width + (combined % self.width as u64) as usize
    }

    #[inline]
    fn increase_decision(&mut self, c: u16) -> bool {
        if c == 0 {
            return true;
        }
        self.rng.gen::<f64>() < LOG_BASE.powi(-(c as i32))
    }
}

/// FNV-1a over the key, split into the two halves used for double hashing.
/// FNV is fixed across platforms, so persisted tables stay addressable.
#[inline]
fn hash_key(key: &[u8]) -> (u32, u32) {
    let mut hasher = FnvHasher::default();
    hasher.write(key);
    let hash = hasher.finish();
    (hash as u32, (hash >> 32) as u32)
}

/// Linear estimate represented by a raw cell value
#[inline]
fn cell_value(c: u16) -> f64 {
    match c {
        0 => 0.0,
        1 => 1.0,
        c => (LOG_BASE.powi(c as i32) - 1.0) / (LOG_BASE - 1.0),
    }
}
