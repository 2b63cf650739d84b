//! ID generation utilities.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use ulid::{Generator, Ulid};

/// ID generator for ideas, polls, responses and reactions.
///
/// Clones share one monotonic generator, so IDs from the same generator sort
/// in the order they were issued even within a single millisecond.
#[derive(Clone, Default)]
pub struct IdGenerator {
    inner: Arc<Mutex<Generator>>,
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new ULID-based ID.
    ///
    /// Falls back to a random ULID if the millisecond's random part is
    /// exhausted, which loses ordering for that one ID only.
    #[must_use]
    pub fn generate(&self) -> String {
        let ulid = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate()
            .unwrap_or_else(|_| Ulid::new());
        ulid.to_string().to_lowercase()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_eq!(id2.len(), 26);
        assert_ne!(id1, id2);
        assert_eq!(id1, id1.to_lowercase());
    }

    #[test]
    fn test_ids_sort_in_issue_order() {
        let id_gen = IdGenerator::new();
        let shared = id_gen.clone();

        let ids: Vec<String> = (0..1000)
            .map(|i| if i % 2 == 0 { id_gen.generate() } else { shared.generate() })
            .collect();

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
