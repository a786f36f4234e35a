//! Mapping between the physical box and the cell grid.

use crate::params::consts;
use glam::{IVec3, UVec3, Vec3};

/// Shape of the cell grid over the fixed physical box.
///
/// Cell size is at least the smoothing radius per axis, so all interaction
/// partners of a particle live in its own cell or one of the 26 adjacent
/// cells. Position lookup is clamped, so any finite position maps to a valid
/// cell, including positions integrated past a wall.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    /// Cell count per axis.
    pub size: UVec3,
    /// Total cell count, the flat array length.
    pub num_cells: usize,
    /// Physical extent of one cell per axis (meters).
    pub delta: Vec3,
}

impl Domain {
    /// Partition the box into cells no smaller than `h` per axis.
    pub fn new(h: f32) -> Self {
        let range = consts::domain_range();
        let size = UVec3::new(
            ((range.x / h) as u32).max(1),
            ((range.y / h) as u32).max(1),
            ((range.z / h) as u32).max(1),
        );
        let num_cells = (size.x * size.y * size.z) as usize;
        let delta = range / size.as_vec3();
        Self {
            size,
            num_cells,
            delta,
        }
    }

    /// Index of the last cell layer along `axis`.
    pub fn upper_index(&self, axis: usize) -> u32 {
        self.size[axis] - 1
    }

    /// Cell coordinate owning `position`, clamped to the grid.
    pub fn grid_position(&self, position: Vec3) -> UVec3 {
        let raw = ((position - consts::DOMAIN_MIN) / self.delta).as_ivec3();
        raw.clamp(IVec3::ZERO, self.size.as_ivec3() - IVec3::ONE)
            .as_uvec3()
    }

    /// Flat index of a cell coordinate (x fastest, then y, then z).
    pub fn cell_index(&self, coord: UVec3) -> usize {
        (coord.x + self.size.x * (coord.y + self.size.y * coord.z)) as usize
    }

    /// Cell coordinate of a flat index. Inverse of [`Domain::cell_index`].
    pub fn cell_coord(&self, index: usize) -> UVec3 {
        let index = index as u32;
        let x = index % self.size.x;
        let y = (index / self.size.x) % self.size.y;
        let z = index / (self.size.x * self.size.y);
        UVec3::new(x, y, z)
    }

    /// Flat indices of every cell in the plane `coord[axis] == layer`.
    pub fn plane_indices(&self, axis: usize, layer: u32) -> Vec<usize> {
        let mut out = Vec::new();
        for index in 0..self.num_cells {
            if self.cell_coord(index)[axis] == layer {
                out.push(index);
            }
        }
        out
    }
}
