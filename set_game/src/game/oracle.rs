//! Set legality.

use super::entities::Card;

/// Decides whether a combination of cards is a legal set.
pub trait SetOracle: Send + Sync {
    fn is_legal_set(&self, cards: &[Card]) -> bool;

    /// Up to `limit` legal sets drawn from `pool`. `limit == 1` is an existence probe.
    fn find_sets(&self, pool: &[Card], limit: usize) -> Vec<Vec<Card>>;
}

/// The classic rule: a set is `feature_size` distinct cards where every
/// feature is either all the same or all different.
#[derive(Clone, Copy, Debug)]
pub struct FeatureOracle {
    feature_size: usize,
    feature_count: usize,
}

impl FeatureOracle {
    pub fn new(feature_size: usize, feature_count: usize) -> Self {
        Self {
            feature_size,
            feature_count,
        }
    }

    fn feature_matches(&self, features: &[Vec<u32>], feature: usize) -> bool {
        let mut seen: Vec<u32> = features.iter().map(|f| f[feature]).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len() == 1 || seen.len() == features.len()
    }
}

impl SetOracle for FeatureOracle {
    fn is_legal_set(&self, cards: &[Card]) -> bool {
        if cards.len() != self.feature_size {
            return false;
        }

        let mut distinct = cards.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() != cards.len() {
            return false;
        }

        let features: Vec<Vec<u32>> = cards
            .iter()
            .map(|card| card.features(self.feature_size, self.feature_count))
            .collect();

        (0..self.feature_count).all(|feature| self.feature_matches(&features, feature))
    }

    fn find_sets(&self, pool: &[Card], limit: usize) -> Vec<Vec<Card>> {
        let k = self.feature_size;
        let mut found = Vec::new();
        if limit == 0 || k == 0 || pool.len() < k {
            return found;
        }

        // Lexicographic walk over k-combinations of pool indices
        let mut idx: Vec<usize> = (0..k).collect();
        loop {
            let candidate: Vec<Card> = idx.iter().map(|&i| pool[i]).collect();
            if self.is_legal_set(&candidate) {
                found.push(candidate);
                if found.len() >= limit {
                    return found;
                }
            }

            let Some(pos) = (0..k).rev().find(|&i| idx[i] != i + pool.len() - k) else {
                return found;
            };
            idx[pos] += 1;
            for i in pos + 1..k {
                idx[i] = idx[i - 1] + 1;
            }
        }
    }
}
