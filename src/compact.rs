//! Top-K compaction of similarity rows.
//!
//! A similarity row has `N` entries; a [`NeighborList`] keeps at most `K` of
//! them, with scores stored as IEEE half floats. That turns `4 * N^2` bytes
//! of dense matrix into roughly `6 * K * N` bytes.
//!
//! # Quantization
//!
//! Scores are rounded to `f16` *before* ranking. Rounding to nearest is
//! monotone, so it never reverses two scores; it can only merge scores closer
//! than [`QUANTIZATION_EPSILON`] into a tie, and ties rank by ascending
//! neighbor index. Ranking on the stored value keeps every persisted list
//! non-increasing with a well-defined tie order.
//!
//! For `s` in `[0, 1]` the rounding error is at most half an `f16` ulp at 1.0,
//! i.e. `2^-12`; [`QUANTIZATION_EPSILON`] is the full ulp `2^-11`.

use half::f16;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Upper bound on `|dequantize(quantize(s)) - s|` for `s` in `[-1, 1]`.
pub const QUANTIZATION_EPSILON: f32 = 1.0 / 2048.0;

/// Round a similarity to stored precision.
///
/// Input is clamped to `[-1, 1]`; NaN and negative zero map to `+0`.
#[inline]
#[must_use]
pub fn quantize(score: f32) -> f16 {
    if score.is_nan() || score == 0.0 {
        return f16::ZERO;
    }
    f16::from_f32(score.clamp(-1.0, 1.0))
}

/// Widen a stored score.
#[inline]
#[must_use]
pub fn dequantize(score: f16) -> f32 {
    score.to_f32()
}

/// One retained neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Item index of the neighbor.
    pub index: u32,
    /// Quantized cosine similarity.
    pub score: f16,
}

impl Neighbor {
    /// Ranking order: higher score first, then lower index.
    #[inline]
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .to_f32()
            .total_cmp(&self.score.to_f32())
            .then(self.index.cmp(&other.index))
    }
}

/// Up to `K` neighbors of one item, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeighborList(Vec<Neighbor>);

impl NeighborList {
    /// Wrap neighbors that are already ranked. Use [`NeighborList::validate`]
    /// on untrusted input.
    #[must_use]
    pub fn from_ranked(neighbors: Vec<Neighbor>) -> Self {
        Self(neighbors)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Neighbor] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Neighbor> {
        self.0.iter()
    }

    /// Neighbor indices, best first.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().map(|n| n.index as usize)
    }

    /// Check the list for `item` in an index of `n` items.
    ///
    /// Rejects self references, out-of-range indices, out-of-range or
    /// non-finite scores, duplicates, and any order other than ranked order.
    /// Runs in `O(K)`.
    pub fn validate(&self, item: usize, n: usize) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.0.len());
        for (pos, nb) in self.0.iter().enumerate() {
            let idx = nb.index as usize;
            if idx >= n {
                return Err(format!(
                    "item {item}: neighbor index {idx} out of range for {n} items"
                ));
            }
            if idx == item {
                return Err(format!("item {item}: lists itself as a neighbor"));
            }
            if !seen.insert(nb.index) {
                return Err(format!("item {item}: neighbor {idx} listed twice"));
            }
            let s = nb.score.to_f32();
            if !s.is_finite() || !(-1.0..=1.0).contains(&s) {
                return Err(format!("item {item}: score {s} outside [-1, 1]"));
            }
            if pos > 0 && self.0[pos - 1].rank(nb) != Ordering::Less {
                return Err(format!("item {item}: neighbors not in ranked order at {pos}"));
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a NeighborList {
    type Item = &'a Neighbor;
    type IntoIter = std::slice::Iter<'a, Neighbor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Keep the `k` best neighbors of `item` from its similarity `row`.
///
/// The self entry is skipped. Fewer than `k` neighbors are returned only when
/// the row has fewer than `k + 1` entries; `k == 0` or a row of length `<= 1`
/// yields an empty list. `row` must have at most `u32::MAX` entries;
/// [`IndexBuilder`](crate::IndexBuilder) rejects larger catalogs.
#[must_use]
pub fn compact(item: usize, row: &[f32], k: usize) -> NeighborList {
    let mut candidates: Vec<Neighbor> = row
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != item)
        .map(|(j, &s)| Neighbor {
            index: j as u32,
            score: quantize(s),
        })
        .collect();

    if k == 0 || candidates.is_empty() {
        return NeighborList::default();
    }

    if candidates.len() > k {
        candidates.select_nth_unstable_by(k - 1, Neighbor::rank);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(Neighbor::rank);

    NeighborList(candidates)
}
