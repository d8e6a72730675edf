//! Fixed-capacity circular history over a slice of shared point storage
//!
//! Every particle owns `capacity` consecutive slots starting at `base` in one flat
//! point array. The header stores absolute indices into that array, so the GPU
//! update kernel can address any particle's history with a single multiply and no
//! bounds bookkeeping. `update.wgsl` implements the same arithmetic as
//! [`RingBufferHeader::append`]; keep the two in sync.

use crate::Point;
use anyhow::{ensure, Result};
use bytemuck::{Pod, Zeroable};

/// Per-particle ring buffer header (matches WGSL `RingHeader`)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RingBufferHeader {
    /// First slot of this particle's slice. Never changes.
    pub base: u32,
    /// Number of slots in the slice. Identical for every particle.
    pub capacity: u32,
    /// Absolute index of the newest sample
    pub write_index: u32,
    /// Absolute index of the oldest retained sample
    pub read_index: u32,
    /// Live samples, saturating at `capacity`
    pub count: u32,
    pub _padding: [u32; 3],
}

impl RingBufferHeader {
    /// Header for the `particle`-th slice with no samples yet.
    ///
    /// `write_index` sits on the last slot so the first append lands on `base`.
    pub fn empty(particle: u32, capacity: u32) -> Self {
        debug_assert!(capacity > 0);
        let base = particle * capacity;
        Self {
            base,
            capacity,
            write_index: base + capacity - 1,
            read_index: base,
            count: 0,
            _padding: [0; 3],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    /// Absolute index of the slot following `index` within this slice
    fn next_slot(&self, index: u32) -> u32 {
        self.base + (index - self.base + 1) % self.capacity
    }

    /// Absolute index of the `k`-th most recent sample (`k = 0` is newest)
    pub fn slot(&self, k: u32) -> Option<u32> {
        if k >= self.count {
            return None;
        }
        let offset = self.write_index - self.base;
        Some(self.base + (offset + self.capacity - k) % self.capacity)
    }

    /// Whether `index` falls inside this particle's slice
    pub fn contains(&self, index: u32) -> bool {
        index >= self.base && index < self.base + self.capacity
    }

    /// Write `value` into the next slot, evicting the oldest sample when full.
    pub fn append(&mut self, storage: &mut [Point], value: Point) {
        let slot = self.next_slot(self.write_index);
        storage[slot as usize] = value;
        self.write_index = slot;

        if self.count == 0 {
            self.read_index = slot;
            self.count = 1;
        } else if self.count == self.capacity {
            self.read_index = self.next_slot(self.read_index);
        } else {
            self.count += 1;
        }
    }

    /// The `k`-th most recent sample, or `None` when `k >= count`
    pub fn read(&self, storage: &[Point], k: u32) -> Option<Point> {
        self.slot(k).map(|slot| storage[slot as usize])
    }

    /// Live samples, newest first
    pub fn iter_newest_first<'a>(&'a self, storage: &'a [Point]) -> impl Iterator<Item = Point> + 'a {
        (0..self.count).filter_map(move |k| self.read(storage, k))
    }

    pub fn check_invariants(&self) -> Result<()> {
        ensure!(self.capacity > 0, "ring buffer at {} has zero capacity", self.base);
        ensure!(
            self.contains(self.read_index),
            "read index {} outside slice [{}, {})",
            self.read_index,
            self.base,
            self.base + self.capacity
        );
        ensure!(
            self.contains(self.write_index),
            "write index {} outside slice [{}, {})",
            self.write_index,
            self.base,
            self.base + self.capacity
        );
        ensure!(
            self.count <= self.capacity,
            "count {} exceeds capacity {}",
            self.count,
            self.capacity
        );
        if self.count > 0 {
            // The oldest live sample is count-1 steps behind the newest
            let expected = self.slot(self.count - 1);
            ensure!(
                expected == Some(self.read_index),
                "read index {} disagrees with write index {} and count {}",
                self.read_index,
                self.write_index,
                self.count
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: u32) -> Point {
        Point::new(i as f32, 0.0, -(i as f32))
    }

    #[test]
    fn test_header_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<RingBufferHeader>(), 32);
    }

    #[test]
    fn test_first_append_lands_on_base_without_eviction() {
        let mut storage = vec![Point::ZERO; 8];
        let mut header = RingBufferHeader::empty(1, 4);
        header.append(&mut storage, sample(1));

        assert_eq!(header.write_index, 4);
        assert_eq!(header.read_index, 4);
        assert_eq!(header.count, 1);
        assert_eq!(storage[4], sample(1));
        header.check_invariants().unwrap();
    }

    #[test]
    fn test_fill_to_capacity_then_evict_one() {
        let capacity = 5;
        let mut storage = vec![Point::ZERO; (capacity * 3) as usize];
        let mut header = RingBufferHeader::empty(2, capacity);

        for i in 0..capacity {
            header.append(&mut storage, sample(i));
            header.check_invariants().unwrap();
        }
        assert_eq!(header.count, capacity);
        assert_eq!(header.read_index, header.base);
        assert!(header.is_full());

        header.append(&mut storage, sample(capacity));
        assert_eq!(header.count, capacity);
        assert_eq!(header.read_index, header.base + 1);
        assert_eq!(header.write_index, header.base);
        header.check_invariants().unwrap();
    }

    #[test]
    fn test_read_is_newest_first_across_wraparound() {
        let capacity = 4;
        let mut storage = vec![Point::ZERO; capacity as usize];
        let mut header = RingBufferHeader::empty(0, capacity);

        for i in 0..11 {
            header.append(&mut storage, sample(i));
            let expected: Vec<Point> = (0..=i).rev().take(capacity as usize).map(sample).collect();
            let actual: Vec<Point> = header.iter_newest_first(&storage).collect();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn test_read_out_of_range_is_none() {
        let mut storage = vec![Point::ZERO; 3];
        let mut header = RingBufferHeader::empty(0, 3);
        assert_eq!(header.read(&storage, 0), None);

        header.append(&mut storage, sample(9));
        assert_eq!(header.read(&storage, 0), Some(sample(9)));
        assert_eq!(header.read(&storage, 1), None);
        assert_eq!(header.read(&storage, 3), None);
    }

    #[test]
    fn test_append_never_touches_other_slices() {
        let capacity = 3;
        let mut storage = vec![Point::new(-1.0, -1.0, -1.0); (capacity * 3) as usize];
        let mut header = RingBufferHeader::empty(1, capacity);
        for i in 0..10 {
            header.append(&mut storage, sample(i));
        }
        for (i, p) in storage.iter().enumerate() {
            if !header.contains(i as u32) {
                assert_eq!(*p, Point::new(-1.0, -1.0, -1.0));
            }
        }
    }

    #[test]
    fn test_capacity_one_keeps_only_newest() {
        let mut storage = vec![Point::ZERO; 1];
        let mut header = RingBufferHeader::empty(0, 1);
        for i in 0..3 {
            header.append(&mut storage, sample(i));
            assert_eq!(header.count, 1);
            assert_eq!(header.read(&storage, 0), Some(sample(i)));
            header.check_invariants().unwrap();
        }
    }

    #[test]
    fn test_invariant_check_reports_corruption() {
        let mut header = RingBufferHeader::empty(0, 4);
        header.count = 5;
        assert!(header.check_invariants().is_err());

        let mut header = RingBufferHeader::empty(0, 4);
        header.write_index = 9;
        assert!(header.check_invariants().is_err());
    }
}
