use crate::config::GAP_COUNT;

/// Distance between two consecutive primes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapRecord {
    pub small: usize,
    pub large: usize,
    pub distance: usize,
}

impl GapRecord {
    pub fn new(small: usize, large: usize) -> Self {
        debug_assert!(large > small);
        GapRecord {
            small,
            large,
            distance: large - small,
        }
    }
}

/// Bounded, insertion-sorted list of the K largest gaps seen so far.
///
/// Entries are kept in descending distance order. Equal distances stay in
/// insertion order, so when the tracker is full a candidate that only ties
/// the smallest entry is turned away: the first gap found keeps its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapTracker<const K: usize> {
    records: Vec<GapRecord>,
}

/// The tracker every worker and the final merge use.
pub type TopFive = GapTracker<GAP_COUNT>;

impl<const K: usize> GapTracker<K> {
    pub fn new() -> Self {
        GapTracker {
            records: Vec::with_capacity(K),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.records.len() == K
    }

    pub fn records(&self) -> &[GapRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &GapRecord> {
        self.records.iter()
    }

    pub fn largest(&self) -> Option<&GapRecord> {
        self.records.first()
    }

    /// Smallest distance that is still tracked, once the tracker is full.
    pub fn threshold(&self) -> Option<usize> {
        if self.is_full() {
            self.records.last().map(|r| r.distance)
        } else {
            None
        }
    }

    /// Returns true when the gap was kept.
    pub fn insert(&mut self, distance: usize, small: usize, large: usize) -> bool {
        if K == 0 {
            return false;
        }

        if let Some(threshold) = self.threshold() {
            if distance <= threshold {
                return false;
            }
            self.records.pop();
        }

        // Shift-down insert: walk back from the tail past every smaller entry.
        let mut pos = self.records.len();
        while pos > 0 && self.records[pos - 1].distance < distance {
            pos -= 1;
        }

        self.records.insert(
            pos,
            GapRecord {
                small,
                large,
                distance,
            },
        );
        true
    }

    pub fn insert_record(&mut self, record: GapRecord) -> bool {
        self.insert(record.distance, record.small, record.large)
    }

    /// Pops the head entry, moving the rest up.
    pub fn remove_largest(&mut self) -> Option<GapRecord> {
        if self.records.is_empty() {
            None
        } else {
            Some(self.records.remove(0))
        }
    }
}

impl<const K: usize> Default for GapTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}
