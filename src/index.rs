// Exact nearest-neighbor index over embedding vectors.
//
// Corpora here are hundreds to low thousands of short texts, so a brute
// force scan with exact Euclidean distance is both fast enough and free of
// recall loss. The index is built once per analysis call and never updated;
// rebuilding is the only way to change its contents.

use tracing::debug;

use crate::error::{AttributionError, Result};

/// One search hit: the position of the vector in build order and its
/// Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Flat (brute force) L2 index. Vectors are stored contiguously.
#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dim: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Build an index over `vectors`.
    ///
    /// All vectors must share one non-zero dimension, and there must be at
    /// least one of them.
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        let first = vectors
            .first()
            .ok_or_else(|| AttributionError::Index("cannot build an index over zero vectors".to_string()))?;

        let dim = first.len();
        if dim == 0 {
            return Err(AttributionError::Index(
                "vectors must have at least one dimension".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(vectors.len() * dim);
        for (i, v) in vectors.iter().enumerate() {
            if v.len() != dim {
                return Err(AttributionError::Index(format!(
                    "vector {i} has dimension {}, expected {dim}",
                    v.len()
                )));
            }
            data.extend_from_slice(v);
        }

        debug!(count = vectors.len(), dim = dim, "Built flat L2 index");

        Ok(Self { dim, data })
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the `k` nearest vectors to `query`, nearest first.
    ///
    /// `k` larger than the index is clamped; `k == 0` is rejected. Equal
    /// distances keep build order, so results are deterministic.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(AttributionError::InvalidQuery(
                "k must be at least 1".to_string(),
            ));
        }
        if query.len() != self.dim {
            return Err(AttributionError::Index(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dim
            )));
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(position, v)| Neighbor {
                position,
                distance: l2_distance(query, v),
            })
            .collect();

        // sort_by is stable, so ties stay in build order.
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);

        Ok(neighbors)
    }
}

/// Euclidean distance between two equal-length vectors.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_distance_basic() {
        assert!((l2_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);
        assert_eq!(l2_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_build_rejects_empty() {
        let err = FlatL2Index::build(&[]).unwrap_err();
        assert!(matches!(err, AttributionError::Index(_)));
    }

    #[test]
    fn test_build_rejects_zero_dimension() {
        let err = FlatL2Index::build(&[vec![]]).unwrap_err();
        assert!(matches!(err, AttributionError::Index(_)));
    }

    #[test]
    fn test_build_rejects_mixed_dimensions() {
        let err = FlatL2Index::build(&[vec![1.0, 0.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, AttributionError::Index(_)));
    }

    #[test]
    fn test_len_and_dimension() {
        let index = FlatL2Index::build(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.dimension(), 3);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_search_zero_k_is_invalid_query() {
        let index = FlatL2Index::build(&[vec![1.0]]).unwrap();
        let err = index.search(&[1.0], 0).unwrap_err();
        assert!(matches!(err, AttributionError::InvalidQuery(_)));
    }

    #[test]
    fn test_search_wrong_query_dimension() {
        let index = FlatL2Index::build(&[vec![1.0, 2.0]]).unwrap();
        let err = index.search(&[1.0], 1).unwrap_err();
        assert!(matches!(err, AttributionError::Index(_)));
    }

    #[test]
    fn test_ties_keep_build_order() {
        let index =
            FlatL2Index::build(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]]).unwrap();
        let hits = index.search(&[0.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }
}
