use crate::error::{Error, Result};
use crate::models::ChunkMetadata;

/// In-memory flat inner-product index over unit-normalized vectors.
///
/// Inner product of L2-normalized vectors is cosine similarity. Metadata is
/// kept in a parallel list whose position is the vector's internal id.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dim: Option<usize>,
    vectors: Vec<Vec<f32>>,
    metadatas: Vec<ChunkMetadata>,
}

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub metadata: ChunkMetadata,
    pub score: f32,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index with its dimensionality fixed up front.
    pub fn with_dim(dim: usize) -> Self {
        Self {
            dim: Some(dim),
            ..Self::default()
        }
    }

    /// Add vectors with their metadata. `vectors` must be parallel with `metadatas`.
    ///
    /// The first non-empty batch fixes the dimensionality; later vectors must match.
    /// Nothing is inserted if any vector in the batch is rejected.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>, metadatas: Vec<ChunkMetadata>) -> Result<()> {
        if vectors.len() != metadatas.len() {
            return Err(Error::Configuration(format!(
                "{} vectors but {} metadata entries",
                vectors.len(),
                metadatas.len()
            )));
        }
        let Some(first) = vectors.first() else {
            return Ok(());
        };

        let dim = self.dim.unwrap_or(first.len());
        if dim == 0 {
            return Err(Error::Configuration(
                "embedding vectors must not be empty".to_string(),
            ));
        }
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
            return Err(Error::Configuration(format!(
                "vector {i} has dimension {} but the index expects {dim}",
                v.len()
            )));
        }
        if let Some(i) = vectors.iter().position(|v| !is_finite(v)) {
            return Err(Error::Configuration(format!(
                "vector {i} has a NaN or infinite component"
            )));
        }

        self.dim = Some(dim);
        self.vectors.reserve(vectors.len());
        for mut v in vectors {
            normalize(&mut v);
            self.vectors.push(v);
        }
        self.metadatas.extend(metadatas);

        Ok(())
    }

    /// Top `top_k` matches by cosine similarity, best first.
    ///
    /// Equal scores keep insertion order. An empty index yields no hits.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<VectorHit>> {
        let Some(dim) = self.dim else {
            return Ok(Vec::new());
        };
        if query.len() != dim {
            return Err(Error::Configuration(format!(
                "query has dimension {} but the index expects {dim}",
                query.len()
            )));
        }
        if !is_finite(query) {
            return Err(Error::Configuration(
                "query vector has a NaN or infinite component".to_string(),
            ));
        }
        if top_k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let mut q = query.to_vec();
        normalize(&mut q);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot(&q, v)))
            .collect();

        // Stable sort: ties stay in insertion order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| VectorHit {
                metadata: self.metadatas[i].clone(),
                score,
            })
            .collect())
    }

    pub fn size(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn metadatas(&self) -> &[ChunkMetadata] {
        &self.metadatas
    }
}

fn is_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

/// Scale `v` to unit L2 norm in place. Zero vectors are left untouched.
fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
