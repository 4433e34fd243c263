//! Sparse interval-overlap mapping.
//!
//! For every (time-row, target-interval) pair, the map records which source
//! intervals overlap the target interval and the fraction of each source
//! interval's span covered by the intersection. Complexity is
//! O(time × targets × sources); interval counts are small relative to the
//! time dimension, so the quadratic scan is acceptable.

use crate::error::Result;
use crate::variable::Variable;

/// Per-(time-row, target-interval) list of (source-index, weight) pairs,
/// stored as offset/length slots into two parallel flat arrays.
///
/// Built fresh per rebin call and discarded after use.
#[derive(Debug)]
pub struct OverlapMap {
    num_time_rows: usize,
    num_targets: usize,
    offset: Vec<usize>,
    length: Vec<usize>,
    source_index: Vec<usize>,
    weight: Vec<f64>,
}

impl OverlapMap {
    /// Build the overlap map for the given target and source bounds.
    ///
    /// Both bounds variables hold double [lower, upper] pairs in their last
    /// axis (not assumed sorted) and the grid intervals in their
    /// second-to-last axis; a leading time axis marks a per-time-step grid.
    /// `num_time_rows` is 1 for fully time-independent grids and the time
    /// dimension length when either grid is time-dependent.
    ///
    /// A source interval with zero span carries no integrable mass and is
    /// skipped, so it never contributes a weight.
    pub fn build(
        target_bounds: &Variable,
        source_bounds: &Variable,
        num_time_rows: usize,
    ) -> Result<OverlapMap> {
        let target = target_bounds.as_double_slice()?;
        let source = source_bounds.as_double_slice()?;
        let target_rank = target_bounds.num_dimensions();
        let source_rank = source_bounds.num_dimensions();
        let num_targets = target_bounds.shape()[target_rank - 2];
        let num_sources = source_bounds.shape()[source_rank - 2];

        let mut map = OverlapMap {
            num_time_rows,
            num_targets,
            offset: vec![0; num_time_rows * num_targets],
            length: vec![0; num_time_rows * num_targets],
            source_index: Vec::new(),
            weight: Vec::new(),
        };

        for i in 0..num_time_rows {
            let source_offset = if source_rank == 3 { i * num_sources * 2 } else { 0 };
            let target_offset = if target_rank == 3 { i * num_targets * 2 } else { 0 };

            for j in 0..num_targets {
                let slot = i * num_targets + j;
                let (target_min, target_max) =
                    ordered(target[target_offset + 2 * j], target[target_offset + 2 * j + 1]);

                map.offset[slot] = map.source_index.len();
                for k in 0..num_sources {
                    let (source_min, source_max) =
                        ordered(source[source_offset + 2 * k], source[source_offset + 2 * k + 1]);

                    if source_min == source_max {
                        // degenerate interval, no mass to distribute
                        continue;
                    }
                    if source_min >= target_max || target_min >= source_max {
                        continue;
                    }

                    let overlap_min = source_min.max(target_min);
                    let overlap_max = source_max.min(target_max);
                    map.source_index.push(k);
                    map.weight
                        .push((overlap_max - overlap_min) / (source_max - source_min));
                    map.length[slot] += 1;
                }
            }
        }

        Ok(map)
    }

    /// Number of time rows the map was built with
    pub fn num_time_rows(&self) -> usize {
        self.num_time_rows
    }

    /// Number of target intervals per time row
    pub fn num_targets(&self) -> usize {
        self.num_targets
    }

    /// The overlapping source indices and weights for one target interval.
    ///
    /// Empty slices mean no source interval overlaps the target; the caller
    /// renders such intervals as the fill value.
    pub fn entries(&self, time_row: usize, target: usize) -> (&[usize], &[f64]) {
        let slot = time_row * self.num_targets + target;
        let offset = self.offset[slot];
        let length = self.length[slot];
        (
            &self.source_index[offset..offset + length],
            &self.weight[offset..offset + length],
        )
    }
}

/// Normalize an interval pair to (min, max)
fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
