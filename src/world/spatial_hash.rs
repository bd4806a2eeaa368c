//! Open-addressed spatial hash over integer grid cells
//!
//! Each occupied table slot holds one cell and the keys of the colliders
//! whose bounds touch it. Keys are collider slot indices; the hash knows
//! nothing else about colliders.
//!
//! Linear probing with backward-shift deletion, so there are no tombstones
//! and a cell left empty by `remove` is dropped from the table.

use std::ops::ControlFlow;

use crate::geom::Aabb;
use glam::Vec2;

/// Table occupancy that triggers growth, as numerator / denominator
const MAX_LOAD_NUM: usize = 7;
const MAX_LOAD_DEN: usize = 10;

/// Inclusive rectangle of cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl CellRange {
    #[inline]
    pub fn contains(&self, cx: i32, cy: i32) -> bool {
        cx >= self.min_x && cx <= self.max_x && cy >= self.min_y && cy <= self.max_y
    }

    /// Number of cells covered
    pub fn cell_count(&self) -> u64 {
        let w = (self.max_x as i64 - self.min_x as i64 + 1).max(0) as u64;
        let h = (self.max_y as i64 - self.min_y as i64 + 1).max(0) as u64;
        w.saturating_mul(h)
    }

    /// Row-major walk over every covered cell
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> + use<> {
        let range = *self;
        (range.min_y..=range.max_y)
            .flat_map(move |cy| (range.min_x..=range.max_x).map(move |cx| (cx, cy)))
    }
}

#[derive(Debug, Clone)]
struct Cell {
    x: i32,
    y: i32,
    keys: Vec<u32>,
}

/// FNV-1a over the little-endian bytes of both coordinates
#[inline]
fn hash_cell(cx: i32, cy: i32) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in cx.to_le_bytes().into_iter().chain(cy.to_le_bytes()) {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Grid-cell hash used as the broad phase
#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f32,
    table: Vec<Option<Cell>>,
    occupied: usize,
}

impl SpatialHash {
    /// Table sized to the next power of two at or above `initial_capacity`
    pub fn new(cell_size: f32, initial_capacity: usize) -> Self {
        let capacity = initial_capacity.max(2).next_power_of_two();
        Self {
            cell_size,
            table: vec![None; capacity],
            occupied: 0,
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of table slots
    #[inline]
    pub fn capacity(&self) -> usize {
        self.table.len()
    }

    /// Number of cells currently stored
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.occupied
    }

    /// Cell containing a world point
    #[inline]
    pub fn cell_of(&self, point: Vec2) -> (i32, i32) {
        (
            (point.x / self.cell_size).floor() as i32,
            (point.y / self.cell_size).floor() as i32,
        )
    }

    /// Cells touched by `aabb`, inclusive on both ends
    pub fn cells_overlapping(&self, aabb: &Aabb) -> CellRange {
        let (min_x, min_y) = self.cell_of(aabb.min);
        let (max_x, max_y) = self.cell_of(aabb.max);
        CellRange {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[inline]
    fn mask(&self) -> usize {
        self.table.len() - 1
    }

    #[inline]
    fn home(&self, cx: i32, cy: i32) -> usize {
        hash_cell(cx, cy) as usize & self.mask()
    }

    /// Table index holding the cell, or the empty index where it would go
    fn probe(&self, cx: i32, cy: i32) -> Result<usize, usize> {
        let mask = self.mask();
        let mut idx = self.home(cx, cy);
        loop {
            match &self.table[idx] {
                Some(cell) if cell.x == cx && cell.y == cy => return Ok(idx),
                Some(_) => idx = (idx + 1) & mask,
                None => return Err(idx),
            }
        }
    }

    fn needs_growth(&self) -> bool {
        (self.occupied + 1) * MAX_LOAD_DEN > self.table.len() * MAX_LOAD_NUM
    }

    /// Table index of the cell, creating it when asked
    fn locate(&mut self, cx: i32, cy: i32, create: bool) -> Option<usize> {
        if let Ok(idx) = self.probe(cx, cy) {
            return Some(idx);
        }
        if !create {
            return None;
        }

        // A failed grow is tolerable while at least one empty slot remains
        // after the insert, since probes stop on empty slots
        if self.needs_growth() && !self.grow() && self.occupied + 2 > self.table.len() {
            log::warn!("Spatial hash full, cell ({cx}, {cy}) not created");
            return None;
        }

        let idx = match self.probe(cx, cy) {
            Ok(idx) | Err(idx) => idx,
        };
        self.table[idx] = Some(Cell {
            x: cx,
            y: cy,
            keys: Vec::new(),
        });
        self.occupied += 1;
        Some(idx)
    }

    /// Keys stored in a cell, optionally creating the cell
    pub fn find_cell(&mut self, cx: i32, cy: i32, create: bool) -> Option<&[u32]> {
        let idx = self.locate(cx, cy, create)?;
        self.table[idx].as_ref().map(|cell| cell.keys.as_slice())
    }

    /// Keys stored in a cell (empty when the cell does not exist)
    pub fn cell(&self, cx: i32, cy: i32) -> &[u32] {
        match self.probe(cx, cy) {
            Ok(idx) => self.table[idx]
                .as_ref()
                .map_or(&[][..], |cell| cell.keys.as_slice()),
            Err(_) => &[],
        }
    }

    /// Every stored cell with its keys, in table order
    pub fn cells(&self) -> impl Iterator<Item = ((i32, i32), &[u32])> {
        self.table
            .iter()
            .flatten()
            .map(|cell| ((cell.x, cell.y), cell.keys.as_slice()))
    }

    /// Add `key` to a cell. Returns false if memory for the cell or key
    /// could not be obtained, in which case nothing changed.
    pub fn add(&mut self, cx: i32, cy: i32, key: u32) -> bool {
        let Some(idx) = self.locate(cx, cy, true) else {
            return false;
        };
        let Some(cell) = self.table[idx].as_mut() else {
            return false;
        };
        debug_assert!(!cell.keys.contains(&key), "key {key} already in cell");

        if cell.keys.len() == cell.keys.capacity() {
            let additional = cell.keys.capacity().max(4);
            if cell.keys.try_reserve(additional).is_err() {
                log::warn!("Spatial hash cell ({cx}, {cy}) could not grow, key {key} dropped");
                if cell.keys.is_empty() {
                    self.delete_at(idx);
                }
                return false;
            }
        }
        cell.keys.push(key);
        true
    }

    /// Remove `key` from a cell; empty cells leave the table
    pub fn remove(&mut self, cx: i32, cy: i32, key: u32) -> bool {
        let Ok(idx) = self.probe(cx, cy) else {
            return false;
        };
        let Some(cell) = self.table[idx].as_mut() else {
            return false;
        };
        let Some(pos) = cell.keys.iter().position(|&k| k == key) else {
            return false;
        };
        cell.keys.swap_remove(pos);
        if cell.keys.is_empty() {
            self.delete_at(idx);
        }
        true
    }

    /// Vacate `idx` and pull later entries of the probe run back into the gap
    fn delete_at(&mut self, idx: usize) {
        let mask = self.mask();
        self.table[idx] = None;
        self.occupied -= 1;

        let mut hole = idx;
        let mut next = (idx + 1) & mask;
        while let Some(cell) = &self.table[next] {
            let home = self.home(cell.x, cell.y);
            let dist_to_next = next.wrapping_sub(home) & mask;
            let dist_from_hole = next.wrapping_sub(hole) & mask;
            if dist_to_next >= dist_from_hole {
                self.table[hole] = self.table[next].take();
                hole = next;
            }
            next = (next + 1) & mask;
        }
    }

    /// Double the table and rehash every cell, keeping their key arrays.
    /// Returns false (table untouched) if the new table cannot be allocated.
    pub fn grow(&mut self) -> bool {
        let new_capacity = self.table.len() * 2;
        let mut table: Vec<Option<Cell>> = Vec::new();
        if table.try_reserve_exact(new_capacity).is_err() {
            log::warn!(
                "Spatial hash could not grow to {new_capacity} slots ({} cells stored)",
                self.occupied
            );
            return false;
        }
        table.resize_with(new_capacity, || None);

        let old = std::mem::replace(&mut self.table, table);
        let mask = self.mask();
        for cell in old.into_iter().flatten() {
            let mut idx = hash_cell(cell.x, cell.y) as usize & mask;
            while self.table[idx].is_some() {
                idx = (idx + 1) & mask;
            }
            self.table[idx] = Some(cell);
        }
        log::debug!("Spatial hash grew to {new_capacity} slots");
        true
    }

    /// Drop every cell, keeping the table size
    pub fn clear(&mut self) {
        self.table.iter_mut().for_each(|slot| *slot = None);
        self.occupied = 0;
    }

    /// Visit the key list of every stored cell inside `range`
    ///
    /// Walks the range directly when it is small, otherwise scans the table,
    /// so huge ranges cost no more than the number of stored cells.
    pub fn visit_range<F>(&self, range: CellRange, mut f: F) -> ControlFlow<()>
    where
        F: FnMut(&[u32]) -> ControlFlow<()>,
    {
        if range.cell_count() <= self.occupied as u64 {
            for (cx, cy) in range.iter() {
                let keys = self.cell(cx, cy);
                if !keys.is_empty() {
                    f(keys)?;
                }
            }
        } else {
            for cell in self.table.iter().flatten() {
                if range.contains(cell.x, cell.y) {
                    f(&cell.keys)?;
                }
            }
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_overlapping_floors_negative() {
        let hash = SpatialHash::new(64.0, 16);
        let range = hash.cells_overlapping(&Aabb::new(Vec2::new(-1.0, 0.0), Vec2::new(64.0, 63.9)));
        assert_eq!(
            range,
            CellRange {
                min_x: -1,
                min_y: 0,
                max_x: 1,
                max_y: 0
            }
        );
        assert_eq!(range.cell_count(), 3);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![(-1, 0), (0, 0), (1, 0)]);
    }

    #[test]
    fn test_add_remove_drops_empty_cells() {
        let mut hash = SpatialHash::new(10.0, 4);
        assert!(hash.add(1, 2, 7));
        assert!(hash.add(1, 2, 9));
        assert_eq!(hash.cell(1, 2), &[7, 9]);
        assert_eq!(hash.cell_count(), 1);

        assert!(hash.remove(1, 2, 7));
        assert_eq!(hash.cell(1, 2), &[9]);
        assert!(!hash.remove(1, 2, 7));
        assert!(hash.remove(1, 2, 9));
        assert_eq!(hash.cell_count(), 0);
        assert!(hash.cell(1, 2).is_empty());
        assert!(!hash.remove(5, 5, 1));
    }

    #[test]
    fn test_grow_keeps_load_below_threshold() {
        let mut hash = SpatialHash::new(1.0, 4);
        for i in 0..200 {
            assert!(hash.add(i, -i, i as u32));
            assert!(hash.cell_count() * MAX_LOAD_DEN <= hash.capacity() * MAX_LOAD_NUM);
        }
        assert!(hash.capacity().is_power_of_two());
        for i in 0..200 {
            assert_eq!(hash.cell(i, -i), &[i as u32]);
        }
    }

    #[test]
    fn test_find_cell_create() {
        let mut hash = SpatialHash::new(1.0, 8);
        assert!(hash.find_cell(3, 3, false).is_none());
        assert_eq!(hash.find_cell(3, 3, true), Some(&[][..]));
        assert_eq!(hash.cell_count(), 1);
    }

    #[test]
    fn test_delete_keeps_probe_chains_intact() {
        // Dense small table: plenty of collisions, then remove every other cell
        let mut hash = SpatialHash::new(1.0, 64);
        let coords: Vec<(i32, i32)> = (0..40).map(|i| (i % 7, i / 7)).collect();
        for (k, &(x, y)) in coords.iter().enumerate() {
            assert!(hash.add(x, y, k as u32));
        }
        for (k, &(x, y)) in coords.iter().enumerate().step_by(2) {
            assert!(hash.remove(x, y, k as u32));
        }
        for (k, &(x, y)) in coords.iter().enumerate() {
            if k % 2 == 0 {
                assert!(hash.cell(x, y).is_empty());
            } else {
                assert_eq!(hash.cell(x, y), &[k as u32]);
            }
        }
        assert_eq!(hash.cell_count(), 20);
        assert_eq!(hash.cells().count(), 20);
    }

    #[test]
    fn test_clear() {
        let mut hash = SpatialHash::new(1.0, 8);
        hash.add(0, 0, 1);
        hash.add(4, 4, 2);
        let capacity = hash.capacity();
        hash.clear();
        assert_eq!(hash.cell_count(), 0);
        assert_eq!(hash.capacity(), capacity);
        assert!(hash.cell(0, 0).is_empty());
    }

    #[test]
    fn test_visit_range_both_strategies() {
        let mut hash = SpatialHash::new(1.0, 8);
        hash.add(0, 0, 1);
        hash.add(1, 1, 2);
        hash.add(50, 50, 3);

        let collect = |range: CellRange| {
            let mut keys = Vec::new();
            let _ = hash.visit_range(range, |k| {
                keys.extend_from_slice(k);
                ControlFlow::Continue(())
            });
            keys.sort();
            keys
        };

        // Small range walks cells
        let small = CellRange {
            min_x: 0,
            min_y: 0,
            max_x: 1,
            max_y: 1,
        };
        assert_eq!(collect(small), vec![1, 2]);

        // Huge range scans the table
        let huge = CellRange {
            min_x: i32::MIN,
            min_y: i32::MIN,
            max_x: 10,
            max_y: 10,
        };
        assert_eq!(collect(huge), vec![1, 2]);
    }
}
