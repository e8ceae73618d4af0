//! Vector kernels.
//!
//! Portable loops written so the compiler can auto-vectorize them. Term
//! vectors are sparse (sorted column indices plus counts), so the sparse dot
//! product is the one on the build's hot path; [`norm`] runs once per vector
//! over its stored counts.
//!
//! ```rust
//! use kindred::simd::{norm, sparse_dot};
//!
//! let n = norm(&[3.0_f32, 4.0]);
//! assert!((n - 5.0).abs() < 1e-6);
//!
//! let d = sparse_dot(&[0, 2], &[1.0, 2.0], &[2, 3], &[4.0, 1.0]);
//! assert!((d - 8.0).abs() < 1e-6);
//! ```

/// Dot product of two vectors.
#[inline]
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm of a vector.
#[inline]
#[must_use]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Sparse dot product using sorted index arrays.
///
/// Computes the inner product of two sparse vectors represented as
/// parallel arrays of indices and values. Indices must be sorted.
#[inline]
#[must_use]
pub fn sparse_dot(a_indices: &[u32], a_values: &[f32], b_indices: &[u32], b_values: &[f32]) -> f32 {
    let mut i = 0;
    let mut j = 0;
    let mut result = 0.0;

    while i < a_indices.len() && j < b_indices.len() {
        if a_indices[i] < b_indices[j] {
            i += 1;
        } else if a_indices[i] > b_indices[j] {
            j += 1;
        } else {
            result += a_values[i] * b_values[j];
            i += 1;
            j += 1;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_basic() {
        let a = [1.0_f32, 2.0, 3.0];
        let b = [4.0_f32, 5.0, 6.0];
        let result = dot(&a, &b);
        assert!((result - 32.0).abs() < 1e-6);
    }

    #[test]
    fn test_norm() {
        let v = [3.0_f32, 4.0];
        assert!((norm(&v) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_sparse_dot() {
        let a_idx = [0, 2, 5];
        let a_val = [1.0, 2.0, 3.0];
        let b_idx = [1, 2, 5];
        let b_val = [1.0, 4.0, 2.0];
        // Matches at indices 2 (2.0*4.0=8.0) and 5 (3.0*2.0=6.0)
        let result = sparse_dot(&a_idx, &a_val, &b_idx, &b_val);
        assert!((result - 14.0).abs() < 1e-6);
    }
}
