//! Dense voxel occupancy storage for a single chunk.

/// Cubic boolean occupancy grid. Allocated once per chunk slot and reused
/// across pool cycles; the dimensions never change after construction.
pub struct VoxelGrid {
    cells: Vec<bool>,
    subdivisions: usize,
}

impl VoxelGrid {
    pub fn new(subdivisions: usize) -> Self {
        Self {
            cells: vec![false; subdivisions * subdivisions * subdivisions],
            subdivisions,
        }
    }

    /// Voxels per axis.
    pub fn subdivisions(&self) -> usize {
        self.subdivisions
    }

    /// Reset every cell to empty without releasing the allocation.
    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + z * self.subdivisions + y * self.subdivisions * self.subdivisions
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> bool {
        self.cells[self.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, solid: bool) {
        let i = self.index(x, y, z);
        self.cells[i] = solid;
    }

    /// Solid test with the open-boundary rule: coordinates outside the grid
    /// read as empty, so chunk edges always expose a face.
    #[inline]
    pub fn solid_or_empty(&self, x: i64, y: i64, z: i64) -> bool {
        let n = self.subdivisions as i64;
        if x < 0 || y < 0 || z < 0 || x >= n || y >= n || z >= n {
            return false;
        }
        self.get(x as usize, y as usize, z as usize)
    }

    /// Number of allocated cells.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Count of solid voxels. Used by diagnostics and tests.
    pub fn solid_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut grid = VoxelGrid::new(4);
        grid.set(1, 2, 3, true);
        assert!(grid.get(1, 2, 3));
        assert!(!grid.get(3, 2, 1));
        assert_eq!(grid.solid_count(), 1);
    }

    #[test]
    fn test_out_of_range_reads_empty() {
        let mut grid = VoxelGrid::new(2);
        grid.set(0, 0, 0, true);
        grid.set(1, 1, 1, true);
        assert!(grid.solid_or_empty(0, 0, 0));
        assert!(!grid.solid_or_empty(-1, 0, 0));
        assert!(!grid.solid_or_empty(0, 2, 0));
        assert!(!grid.solid_or_empty(0, 0, 17));
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut grid = VoxelGrid::new(8);
        for i in 0..8 {
            grid.set(i, i, i, true);
        }
        let cap = grid.capacity();
        grid.clear();
        assert_eq!(grid.solid_count(), 0);
        assert_eq!(grid.capacity(), cap);
    }
}
