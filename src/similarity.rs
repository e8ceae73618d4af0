//! Cosine similarity over term-count vectors.
//!
//! [`similarity`] compares two vectors directly. [`SimilarityEngine`] computes
//! whole rows of the `N x N` similarity relation as one sparse matrix product:
//! every vector is L2-normalized once, an inverted index maps each column to
//! the items that use it, and row `i` is `x_i * X^T` accumulated over the
//! columns of `x_i` only. Items sharing no term with `i` are never touched.
//!
//! Rows are produced one at a time and handed to the caller. The full matrix
//! is never held in memory.
//!
//! ## Symmetry
//!
//! Row `i` sums `w_it * w_jt` over shared columns `t` in ascending column
//! order, and row `j` sums the same products in the same order, so
//! `row(i)[j] == row(j)[i]` holds bit for bit, not just within tolerance.

use crate::simd;
use crate::text::TermVector;

/// Cosine similarity of two count vectors.
///
/// Defined as 0 when either vector has zero norm. Result is clamped to
/// `[-1, 1]`; for count vectors it lies in `[0, 1]`.
#[must_use]
pub fn similarity(a: &TermVector, b: &TermVector) -> f32 {
    let na = a.norm();
    let nb = b.norm();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let dot = simd::sparse_dot(a.indices(), a.counts(), b.indices(), b.counts());
    (dot / (na * nb)).clamp(-1.0, 1.0)
}

/// Row-at-a-time cosine similarity over a fixed set of vectors.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    /// Normalized `(column, weight)` pairs per item, columns ascending.
    rows: Vec<Vec<(u32, f32)>>,
    /// `(item, weight)` pairs per column, items ascending.
    postings: Vec<Vec<(u32, f32)>>,
}

impl SimilarityEngine {
    /// Index `vectors`. All vectors must share one vocabulary.
    pub fn new(vectors: &[TermVector]) -> Self {
        let dim = vectors.iter().map(TermVector::dim).max().unwrap_or(0);
        let mut postings: Vec<Vec<(u32, f32)>> = vec![Vec::new(); dim];

        let rows: Vec<Vec<(u32, f32)>> = vectors
            .iter()
            .map(|v| {
                let n = v.norm();
                if n == 0.0 {
                    return Vec::new();
                }
                v.indices()
                    .iter()
                    .zip(v.counts())
                    .map(|(&col, &c)| (col, c / n))
                    .collect()
            })
            .collect();

        for (item, row) in rows.iter().enumerate() {
            for &(col, w) in row {
                postings[col as usize].push((item as u32, w));
            }
        }

        Self { rows, postings }
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `true` if item `i` has no vocabulary terms.
    #[must_use]
    pub fn is_zero(&self, i: usize) -> bool {
        self.rows[i].is_empty()
    }

    /// Similarities of item `i` to every item, self included.
    ///
    /// # Panics
    ///
    /// If `i >= self.len()`.
    #[must_use]
    pub fn row(&self, i: usize) -> Vec<f32> {
        let mut out = Vec::new();
        self.row_into(i, &mut out);
        out
    }

    /// Like [`Self::row`], reusing `out`'s allocation.
    pub fn row_into(&self, i: usize, out: &mut Vec<f32>) {
        out.clear();
        out.resize(self.rows.len(), 0.0);

        for &(col, wi) in &self.rows[i] {
            for &(j, wj) in &self.postings[col as usize] {
                out[j as usize] += wi * wj;
            }
        }

        for s in out.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
        if !self.rows[i].is_empty() {
            out[i] = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv(dense: &[f32]) -> TermVector {
        TermVector::from_dense(dense)
    }

    #[test]
    fn identical_vectors_score_one() {
        let a = tv(&[1.0, 2.0, 0.0]);
        assert!((similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero() {
        let a = tv(&[0.0, 0.0]);
        let b = tv(&[1.0, 1.0]);
        assert_eq!(similarity(&a, &b), 0.0);
        assert_eq!(similarity(&a, &a), 0.0);
    }

    #[test]
    fn matches_dense_cosine() {
        let a = [3.0_f32, 0.0, 1.0, 2.0];
        let b = [1.0_f32, 1.0, 0.0, 4.0];
        let expected = simd::dot(&a, &b) / (simd::norm(&a) * simd::norm(&b));
        assert!((similarity(&tv(&a), &tv(&b)) - expected).abs() < 1e-6);
    }

    #[test]
    fn engine_rows_match_pairwise() {
        let vectors = vec![
            tv(&[1.0, 0.0, 2.0, 0.0]),
            tv(&[0.0, 1.0, 1.0, 0.0]),
            tv(&[0.0, 0.0, 0.0, 0.0]),
            tv(&[2.0, 1.0, 0.0, 3.0]),
        ];
        let engine = SimilarityEngine::new(&vectors);
        for i in 0..vectors.len() {
            let row = engine.row(i);
            for j in 0..vectors.len() {
                if i == j {
                    continue;
                }
                let direct = similarity(&vectors[i], &vectors[j]);
                assert!((row[j] - direct).abs() < 1e-6, "({i},{j}): {} vs {direct}", row[j]);
            }
        }
    }

    #[test]
    fn engine_rows_are_exactly_symmetric() {
        let vectors = vec![
            tv(&[1.0, 3.0, 2.0, 0.0, 1.0]),
            tv(&[0.0, 1.0, 1.0, 5.0, 1.0]),
            tv(&[4.0, 0.0, 1.0, 1.0, 0.0]),
        ];
        let engine = SimilarityEngine::new(&vectors);
        let rows: Vec<Vec<f32>> = (0..3).map(|i| engine.row(i)).collect();
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(rows[i][j].to_bits(), rows[j][i].to_bits());
            }
        }
    }

    #[test]
    fn self_similarity() {
        let vectors = vec![tv(&[1.0, 1.0]), tv(&[0.0, 0.0])];
        let engine = SimilarityEngine::new(&vectors);
        assert_eq!(engine.row(0)[0], 1.0);
        assert_eq!(engine.row(1)[1], 0.0);
        assert!(engine.is_zero(1));
    }
}
