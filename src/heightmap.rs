//! Standalone island heightfield with finite-difference derivatives.
//!
//! A sibling utility for heightmap-style terrain: a radially attenuated
//! noise field plus its gradient, for consumers that shade or scatter by
//! slope. Not connected to the chunk streaming pipeline.

use glam::DVec2;
use noise::{NoiseFn, Perlin};

/// Island-shaped heightfield over a `width` x `height` grid of cells of
/// `cell_size` world units. The stored grid carries a one-cell border so
/// central differences are defined at every interior sample.
pub struct HeightMap {
    width: usize,
    height: usize,
    cell_size: f64,
    heights: Vec<f64>,
    derivatives: Vec<DVec2>,
}

impl HeightMap {
    pub fn new(width: usize, height: usize, cell_size: f64, depth: f64, seed: u32) -> Self {
        let mut map = Self {
            width,
            height,
            cell_size,
            heights: vec![0.0; (width + 2) * (height + 2)],
            derivatives: vec![DVec2::ZERO; width * height],
        };
        map.generate_island(depth, seed);
        map.compute_derivatives();
        map
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Height at an interior sample.
    pub fn height_at(&self, x: usize, y: usize) -> f64 {
        self.heights[(x + 1) + (y + 1) * (self.width + 2)]
    }

    /// Gradient (dh/dx, dh/dy) at an interior sample.
    pub fn derivative_at(&self, x: usize, y: usize) -> DVec2 {
        self.derivatives[x + y * self.width]
    }

    /// Two noise octaves attenuated by distance from the grid center, so
    /// the field falls off to zero water level at the rim.
    fn generate_island(&mut self, depth: f64, seed: u32) {
        let noise = Perlin::new(seed);
        let padded_w = self.width + 2;
        let padded_h = self.height + 2;
        let half_w = padded_w as f64 * self.cell_size * 0.5;
        let half_h = padded_h as f64 * self.cell_size * 0.5;
        let rim = half_w.min(half_h);

        for y in 0..padded_h {
            let y_world = y as f64 * self.cell_size - half_h;
            for x in 0..padded_w {
                let x_world = x as f64 * self.cell_size - half_w;
                let falloff = 1.0 - (DVec2::new(x_world, y_world).length() / rim).min(1.0);
                // Perlin is zero on its integer lattice, so sample in
                // cell-scaled space rather than at grid indices.
                let base = noise.get([x_world * 0.05, y_world * 0.05]);
                let detail = noise.get([x_world * 0.1, y_world * 0.1]);
                let h = falloff * (depth / 2.0 + base * depth + detail * depth / 2.0);
                self.heights[x + y * padded_w] = h;
            }
        }
    }

    /// Average of the two one-sided differences on each axis.
    fn compute_derivatives(&mut self) {
        let padded_w = self.width + 2;
        for y in 0..self.height {
            for x in 0..self.width {
                let at = |px: usize, py: usize| self.heights[px + py * padded_w];

                let dx_left = (at(x + 1, y + 1) - at(x, y + 1)) / self.cell_size;
                let dx_right = (at(x + 2, y + 1) - at(x + 1, y + 1)) / self.cell_size;

                let dy_up = (at(x + 1, y + 1) - at(x + 1, y)) / self.cell_size;
                let dy_down = (at(x + 1, y + 2) - at(x + 1, y + 1)) / self.cell_size;

                self.derivatives[x + y * self.width] =
                    DVec2::new((dx_left + dx_right) * 0.5, (dy_up + dy_down) * 0.5);
            }
        }
    }
}
