//! Double-buffered cell grid and the five-phase frame pipeline.

use crate::cell::{Cell, CellChecker, NoChecker};
use crate::domain::Domain;
use crate::params::SimParams;
use crate::particle::Particle;
use crate::sync::ExecutionPolicy;
use glam::{UVec3, Vec3};

/// Per-frame cell occupancy statistics. Purely observational.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellStatistics {
    /// Mean particles per cell.
    pub mean: f32,
    /// Population standard deviation of the per-cell particle count.
    pub std_dev: f32,
    /// Number of cells holding no particles.
    pub empty_cells: usize,
}

/// Uniform grid of cells holding the whole particle population.
///
/// Owns two same-shaped flat cell arrays: the active array holds the
/// authoritative particle distribution, the staging array is the write
/// target of the next rebuild. Neighbor references are flat indices into
/// the arrays (arena style); the adjacency is built once and never mutated.
pub struct Grid<P: ExecutionPolicy, C: CellChecker = NoChecker> {
    params: SimParams,
    domain: Domain,
    cells: Vec<Cell<P::Lock, C>>,
    staging: Vec<Cell<P::Lock, C>>,
}

impl<P: ExecutionPolicy, C: CellChecker> Grid<P, C> {
    /// Build an empty grid for the given particle scale.
    pub fn new(ppm: f32) -> Self {
        let params = SimParams::new(ppm);
        let domain = Domain::new(params.h);
        let cells = Self::build_cells(&domain);
        let staging = Self::build_cells(&domain);
        Self {
            params,
            domain,
            cells,
            staging,
        }
    }

    /// Allocate one cell array with the fixed forward-neighbor adjacency.
    fn build_cells(domain: &Domain) -> Vec<Cell<P::Lock, C>> {
        let mut cells: Vec<Cell<P::Lock, C>> = (0..domain.num_cells)
            .map(|i| Cell::new(i as u32))
            .collect();
        for index in 0..domain.num_cells {
            let coord = domain.cell_coord(index);
            cells[index].assign_index(coord);
            for n in Self::forward_neighbours(domain, coord) {
                cells[index].add_neighbour(n as u32);
            }
        }
        cells
    }

    /// Flat indices of the adjacent cells with a greater flat index.
    ///
    /// Registering only this half of the 27-neighborhood records each
    /// unordered pair of adjacent cells exactly once across the grid.
    fn forward_neighbours(domain: &Domain, coord: UVec3) -> Vec<usize> {
        let own = domain.cell_index(coord);
        let mut out = Vec::new();
        for dz in -1i64..=1 {
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    let nx = coord.x as i64 + dx;
                    let ny = coord.y as i64 + dy;
                    let nz = coord.z as i64 + dz;
                    if nx < 0
                        || ny < 0
                        || nz < 0
                        || nx >= domain.size.x as i64
                        || ny >= domain.size.y as i64
                        || nz >= domain.size.z as i64
                    {
                        continue;
                    }
                    let n = domain.cell_index(UVec3::new(nx as u32, ny as u32, nz as u32));
                    if n > own {
                        out.push(n);
                    }
                }
            }
        }
        out
    }

    /// Simulation parameters this grid was built for.
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Domain mapping this grid was built for.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Total number of cells.
    pub fn num_cells(&self) -> usize {
        self.domain.num_cells
    }

    /// Total number of particles across all active cells.
    pub fn num_particles(&self) -> usize {
        self.cells.iter().map(|c| c.num_particles()).sum()
    }

    /// Place a freshly loaded particle into the cell owning its position.
    pub fn insert_particle(&mut self, position: Vec3, hv: Vec3, velocity: Vec3) {
        let index = self.domain.cell_index(self.domain.grid_position(position));
        self.cells[index].add_particle(Particle::new(position, hv, velocity));
    }

    /// Phase 1: reassign every particle to the cell owning its position.
    ///
    /// Swaps the active and staging arrays, clears the new active cells in
    /// parallel, then re-inserts each staged particle under its destination
    /// cell's lock. This is the only phase that changes cell ownership.
    pub fn rebuild_grid(&mut self) {
        std::mem::swap(&mut self.cells, &mut self.staging);

        P::for_each(&self.cells, |c| c.clear_particles());

        let domain = &self.domain;
        let dest = &self.cells;
        P::for_each(&self.staging, |src| {
            src.for_all_particles(|p| {
                let index = p.grid_position(domain);
                src.check_migration(index);
                dest[domain.cell_index(index)].add_particle(p.clone());
            });
        });
    }

    /// Phase 2: density accumulation, density transform, and symmetric
    /// pressure + viscosity acceleration transfer.
    ///
    /// Starts with an explicit per-particle frame reset (density to zero,
    /// acceleration to the external baseline); each pass is a full barrier
    /// before the next.
    pub fn compute_forces(&self) {
        let params = &self.params;
        let cells = &self.cells;

        P::for_each(cells, |c| {
            c.for_all_particles(|p| p.reset_frame());
        });

        P::for_each(cells, |c| {
            c.for_all_near_particles(cells, |a, b| {
                a.increase_densities(b, params.hsq);
            });
        });

        P::for_each(cells, |c| {
            c.for_all_particles(|p| {
                p.transform_density(params.density_coeff, params.h6);
            });
        });

        P::for_each(cells, |c| {
            c.for_all_near_particles(cells, |a, b| {
                a.transfer_acceleration(
                    b,
                    params.h,
                    params.hsq,
                    params.pressure_coeff,
                    params.viscosity_coeff,
                );
            });
        });
    }

    /// Apply `f` to every particle of every cell in the given plane.
    fn for_plane<F>(&self, axis: usize, layer: u32, f: F)
    where
        F: Fn(&mut Particle) + Send + Sync,
    {
        let indices = self.domain.plane_indices(axis, layer);
        let cells = &self.cells;
        P::for_each(&indices, |&i| {
            cells[i].for_all_particles(&f);
        });
    }

    /// Phase 3: wall repulsion for the boundary planes of every axis.
    ///
    /// Examines projected next positions only; adjusts acceleration, never
    /// moves a particle.
    pub fn process_collisions(&self) {
        for axis in 0..3 {
            self.for_plane(axis, 0, |p| p.process_collision_lower(axis));
            self.for_plane(axis, self.domain.upper_index(axis), |p| {
                p.process_collision_upper(axis)
            });
        }
    }

    /// Phase 4: leapfrog integration, independently per particle.
    pub fn advance_particles(&self) {
        P::for_each(&self.cells, |c| {
            c.for_all_particles(|p| p.advance());
        });
    }

    /// Phase 5: hard-wall reflection for particles integrated past a wall.
    ///
    /// Compiled in only with the `impenetrable-wall` feature; by default
    /// out-of-box positions persist and are corrected by the clamped grid
    /// mapping on the next rebuild.
    pub fn reprocess_collisions(&self) {
        #[cfg(feature = "impenetrable-wall")]
        for axis in 0..3 {
            self.for_plane(axis, 0, |p| p.reprocess_collision_lower(axis));
            self.for_plane(axis, self.domain.upper_index(axis), |p| {
                p.reprocess_collision_upper(axis)
            });
        }
    }

    /// Visit every particle in stable flat cell order, read-only.
    pub fn try_for_all_particles_ordered<F, E>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&Particle) -> Result<(), E>,
    {
        for c in &self.cells {
            c.try_for_all_particles(&mut f)?;
        }
        Ok(())
    }

    /// Mean and spread of cell occupancy plus the empty-cell count.
    pub fn statistics(&self) -> CellStatistics {
        let counts: Vec<usize> = self.cells.iter().map(|c| c.num_particles()).collect();
        let total: usize = counts.iter().sum();
        let mean = total as f32 / self.domain.num_cells as f32;

        let mut variance = 0.0f32;
        let mut empty_cells = 0;
        for &count in &counts {
            let d = count as f32 - mean;
            variance += d * d;
            if count == 0 {
                empty_cells += 1;
            }
        }
        let std_dev = (variance / self.domain.num_cells as f32).sqrt();

        CellStatistics {
            mean,
            std_dev,
            empty_cells,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::consts;
    use crate::sync::Serial;

    type SerialGrid = Grid<Serial>;

    const PPM: f32 = 204.0;

    fn spread_positions(n: usize) -> Vec<Vec3> {
        // Deterministic spread across the whole box.
        let range = consts::domain_range();
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                consts::DOMAIN_MIN
                    + Vec3::new(
                        range.x * t,
                        range.y * ((t * 7.3) % 1.0),
                        range.z * ((t * 3.7) % 1.0),
                    )
            })
            .collect()
    }

    #[test]
    fn forward_neighbour_pairs_cover_adjacency_once() {
        let domain = Domain::new(0.02);

        // Sum of forward-neighbour degrees equals the number of unordered
        // adjacent cell pairs in the grid.
        let mut forward_edges = 0usize;
        let mut adjacent_pairs = 0usize;
        for i in 0..domain.num_cells {
            let ci = domain.cell_coord(i);
            forward_edges += Grid::<Serial>::forward_neighbours(&domain, ci).len();
            for j in 0..domain.num_cells {
                if j <= i {
                    continue;
                }
                let cj = domain.cell_coord(j);
                let adjacent = (ci.x as i64 - cj.x as i64).abs() <= 1
                    && (ci.y as i64 - cj.y as i64).abs() <= 1
                    && (ci.z as i64 - cj.z as i64).abs() <= 1;
                if adjacent {
                    adjacent_pairs += 1;
                }
            }
        }
        assert_eq!(forward_edges, adjacent_pairs);
    }

    #[test]
    fn rebuild_preserves_particles_and_relocates_them() {
        let mut grid = SerialGrid::new(PPM);
        let positions = spread_positions(50);
        for &p in &positions {
            grid.insert_particle(p, Vec3::ZERO, Vec3::ZERO);
        }
        assert_eq!(grid.num_particles(), positions.len());

        grid.rebuild_grid();
        assert_eq!(grid.num_particles(), positions.len());

        // Every particle sits in the cell its position maps to.
        let domain = grid.domain().clone();
        for (index, cell) in grid.cells.iter().enumerate() {
            cell.try_for_all_particles::<_, std::convert::Infallible>(|p| {
                assert_eq!(domain.cell_index(p.grid_position(&domain)), index);
                Ok(())
            })
            .unwrap();
        }
    }

    #[test]
    fn rebuild_follows_moved_particles() {
        let mut grid = SerialGrid::new(PPM);
        grid.insert_particle(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);

        // Nudge the particle into the next cell along x, then rebuild.
        let delta_x = grid.domain().delta.x;
        grid.cells.iter().for_each(|c| {
            c.for_all_particles(|p| {
                *p = Particle::new(
                    p.position() + Vec3::new(delta_x, 0.0, 0.0),
                    p.hv(),
                    p.velocity(),
                );
            })
        });
        grid.rebuild_grid();

        assert_eq!(grid.num_particles(), 1);
        let domain = grid.domain().clone();
        let expected = domain.cell_index(domain.grid_position(Vec3::new(delta_x, 0.0, 0.0)));
        assert_eq!(grid.cells[expected].num_particles(), 1);
    }

    #[test]
    fn out_of_box_position_lands_in_boundary_cell() {
        let mut grid = SerialGrid::new(PPM);
        grid.insert_particle(Vec3::new(1000.0, -1000.0, 0.0), Vec3::ZERO, Vec3::ZERO);
        assert_eq!(grid.num_particles(), 1);
    }

    #[test]
    fn statistics_count_empty_cells() {
        let mut grid = SerialGrid::new(PPM);
        let stats = grid.statistics();
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.empty_cells, grid.num_cells());

        grid.insert_particle(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        grid.insert_particle(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        let stats = grid.statistics();
        assert_eq!(stats.empty_cells, grid.num_cells() - 1);
        assert!((stats.mean - 2.0 / grid.num_cells() as f32).abs() < 1e-9);
        assert!(stats.std_dev > 0.0);
    }

    #[test]
    fn density_pass_is_order_invariant_over_pairs() {
        // Two clustered particles plus a distant one; total density must not
        // depend on which cells are visited first, so compare against a
        // straight O(n^2) reference.
        let mut grid = SerialGrid::new(PPM);
        let h = grid.params().h;
        let base = Vec3::new(0.01, 0.01, 0.01);
        let positions = [
            base,
            base + Vec3::new(h * 0.4, 0.0, 0.0),
            base + Vec3::new(0.0, h * 0.9, 0.0),
            consts::DOMAIN_MIN + Vec3::splat(0.001),
        ];
        for &p in &positions {
            grid.insert_particle(p, Vec3::ZERO, Vec3::ZERO);
        }
        grid.rebuild_grid();
        grid.compute_forces();

        let hsq = grid.params().hsq;
        let mut reference = vec![0.0f32; positions.len()];
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let distsq = positions[i].distance_squared(positions[j]);
                if distsq < hsq {
                    let t = (hsq - distsq).powi(3);
                    reference[i] += t;
                    reference[j] += t;
                }
            }
        }
        let params = *grid.params();
        let expected: Vec<f32> = reference
            .iter()
            .map(|d| (d + params.h6) * params.density_coeff)
            .collect();

        let mut got = Vec::new();
        grid.try_for_all_particles_ordered::<_, std::convert::Infallible>(|p| {
            got.push((p.position(), p.density()));
            Ok(())
        })
        .unwrap();
        assert_eq!(got.len(), positions.len());
        for (pos, density) in got {
            let i = positions
                .iter()
                .position(|&q| (q - pos).length() < 1e-9)
                .expect("particle position should match an input");
            assert!(
                (density - expected[i]).abs() <= 1e-3 * expected[i].abs().max(1.0),
                "density mismatch for particle {i}: got {density}, expected {}",
                expected[i]
            );
        }
    }
}
