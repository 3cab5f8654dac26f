use rand::{distributions::WeightedIndex, prelude::*};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("No moves are registered, cannot select one")]
    Empty,
    #[error("Invalid move weight {weight} at position {index}; weights must be finite and >= 0")]
    InvalidWeight { index: usize, weight: f64 },
    #[error("Failed to create weighted distribution: {source}")]
    DistributionError {
        #[from]
        source: rand::distributions::WeightedError,
    },
}

/// Picks move indices at random with probability proportional to their weights.
#[derive(Debug, Clone)]
pub struct WeightedSelector {
    dist: WeightedIndex<f64>,
    len: usize,
}

impl WeightedSelector {
    pub fn new(weights: &[f64]) -> Result<Self, SamplingError> {
        if weights.is_empty() {
            return Err(SamplingError::Empty);
        }
        if let Some((index, &weight)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(SamplingError::InvalidWeight { index, weight });
        }
        let dist = WeightedIndex::new(weights)?;
        Ok(Self {
            dist,
            len: weights.len(),
        })
    }

    #[inline]
    pub fn select(&self, rng: &mut impl Rng) -> usize {
        if self.len == 1 {
            return 0;
        }
        self.dist.sample(rng)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
