/// Visited-node tracker for graph traversal.
///
/// `clear()` bumps a generation stamp instead of zeroing the array, so one
/// set can be reused across every layer of an insert or search.
#[derive(Debug)]
pub struct VisitedSet {
    stamps: Vec<u16>,
    generation: u16,
}

impl VisitedSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            stamps: vec![0; capacity],
            generation: 1,
        }
    }

    pub fn clear(&mut self) {
        if self.generation == u16::MAX {
            self.stamps.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    /// Mark `id` as visited. Returns `true` if it was not visited yet.
    ///
    /// Ids beyond the current capacity grow the set.
    #[inline]
    pub fn insert(&mut self, id: u32) -> bool {
        let idx = id as usize;
        if idx >= self.stamps.len() {
            self.stamps.resize(idx + 1, 0);
        }
        if self.stamps[idx] == self.generation {
            false
        } else {
            self.stamps[idx] = self.generation;
            true
        }
    }
}
