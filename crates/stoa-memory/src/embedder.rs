// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic feature-hashing embedder.
//!
//! Each lowercased alphanumeric token is hashed with SHA-256 into one bucket
//! of the output vector with a sign taken from the same digest. Adjacent
//! token pairs are hashed too, at half weight. The accumulated vector is
//! L2-normalized, so cosine similarity reduces to vocabulary overlap.
//!
//! The hash is stable across processes and platforms, which keeps persisted
//! embeddings comparable with fresh query embeddings after a restart.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use stoa_core::error::StoaError;
use stoa_core::traits::{EmbeddingAdapter, PluginAdapter};
use stoa_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};

use crate::vector::l2_normalize;

/// Default embedding dimension.
pub const DEFAULT_DIMENSIONS: usize = 384;

const BIGRAM_WEIGHT: f32 = 0.5;

/// Local embedder with no model files and no network access.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Creates an embedder producing `dimensions`-long vectors.
    pub fn new(dimensions: usize) -> Result<Self, StoaError> {
        if dimensions == 0 {
            return Err(StoaError::Config(
                "embedding dimensions must be greater than 0".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a single text. Text without any token yields a zero vector.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut vec = vec![0.0f32; self.dimensions];

        for token in &tokens {
            self.accumulate(&mut vec, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vec, bigram.as_bytes(), BIGRAM_WEIGHT);
        }

        l2_normalize(&mut vec);
        vec
    }

    fn accumulate(&self, vec: &mut [f32], feature: &[u8], weight: f32) {
        let digest = Sha256::digest(feature);
        let bucket = u64::from_le_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]);
        let index = (bucket % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vec[index] += sign * weight;
    }
}

/// Lowercased runs of alphanumeric characters.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl PluginAdapter for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, StoaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StoaError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for HashingEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, StoaError> {
        let embeddings = input.texts.iter().map(|t| self.embed_text(t)).collect();
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }
}
