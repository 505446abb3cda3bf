use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::gallery::FilterKey;
use crate::models::MediaItem;

/// Returns a uniformly random permutation of `items` (Fisher-Yates).
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ShuffleKey {
    filter: FilterKey,
    len: usize,
}

/// Holds the shuffled order for the current filter selection.
///
/// The order is recomputed only when the filter key or the number of filtered
/// items changes. A filtered set whose membership changes while its size stays
/// the same keeps the previous order.
pub struct ShuffleCache {
    rng: StdRng,
    key: Option<ShuffleKey>,
    order: Vec<MediaItem>,
}

impl ShuffleCache {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_rng(&mut rand::rng()))
    }

    /// Deterministic orderings for tests and reproducible sessions.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            key: None,
            order: Vec::new(),
        }
    }

    /// Returns the shuffled order for `filtered`, reshuffling only on a key change.
    pub fn order(&mut self, filter: &FilterKey, filtered: &[MediaItem]) -> &[MediaItem] {
        let key = ShuffleKey {
            filter: filter.clone(),
            len: filtered.len(),
        };
        if self.key.as_ref() != Some(&key) {
            debug!(filter = %filter, len = filtered.len(), "Reshuffling");
            self.order = shuffle(filtered, &mut self.rng);
            self.key = Some(key);
        }
        &self.order
    }

    /// Last computed order, empty before the first call to [`order`](Self::order).
    pub fn current(&self) -> &[MediaItem] {
        &self.order
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.order.clear();
    }
}

impl Default for ShuffleCache {
    fn default() -> Self {
        Self::new()
    }
}
