//! Document chunking: overlapping fixed-size character windows.

pub mod window;

pub use window::chunk_text;

use crate::error::{Error, Result};

/// Default window width in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Chunking policy shared by the corpus builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Chunk `text` with this policy.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>> {
        chunk_text(text, self.chunk_size, self.overlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.overlap, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_new_rejects_non_advancing_window() {
        assert!(ChunkingConfig::new(50, 50).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());
        assert!(ChunkingConfig::new(51, 50).is_ok());
    }
}
