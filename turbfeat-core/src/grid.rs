//! Uniform structured grid discretization.
//!
//! A cell-centred Cartesian grid with constant spacing. Derivatives use
//! second-order central differences in the interior and first-order one-sided
//! differences on the boundary cells; along a direction with a single cell
//! (the empty direction of a 2D case) every derivative is zero.
//!
//! Cells are numbered x-fastest: `idx = i + nx * (j + ny * k)`.

use crate::discretization::Discretization;
use crate::error::{Error, Result};
use crate::types::{Tensor, Vec3};
use rayon::prelude::*;
use std::ops::{Mul, Sub};

/// Boundary planes of the grid that can be declared as walls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    XMin,
    XMax,
    YMin,
    YMax,
    ZMin,
    ZMax,
}

impl Boundary {
    fn axis(self) -> usize {
        match self {
            Boundary::XMin | Boundary::XMax => 0,
            Boundary::YMin | Boundary::YMax => 1,
            Boundary::ZMin | Boundary::ZMax => 2,
        }
    }

    fn is_min(self) -> bool {
        matches!(self, Boundary::XMin | Boundary::YMin | Boundary::ZMin)
    }
}

/// Uniform cell-centred grid.
#[derive(Debug, Clone)]
pub struct UniformGrid {
    /// Cells per direction.
    n: [usize; 3],
    /// Cell size per direction.
    spacing: Vec3,
    /// Lower corner of the domain.
    origin: Vec3,
    /// Wall boundaries used for the wall distance.
    walls: Vec<Boundary>,
}

impl UniformGrid {
    /// Create a grid with `n` cells per direction and the given cell size.
    pub fn new(n: [usize; 3], spacing: Vec3) -> Result<Self> {
        if n.iter().any(|&c| c == 0) {
            return Err(Error::Grid(format!(
                "every direction needs at least one cell, got {:?}",
                n
            )));
        }
        if spacing.iter().any(|&h| !(h > 0.0) || !h.is_finite()) {
            return Err(Error::Grid(format!(
                "cell spacing must be positive and finite, got ({}, {}, {})",
                spacing[0], spacing[1], spacing[2]
            )));
        }
        Ok(Self {
            n,
            spacing,
            origin: Vec3::zeros(),
            walls: Vec::new(),
        })
    }

    /// Move the lower corner of the domain.
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    /// Declare a boundary plane as a wall.
    pub fn with_wall(mut self, wall: Boundary) -> Self {
        if !self.walls.contains(&wall) {
            self.walls.push(wall);
        }
        self
    }

    /// Cells per direction.
    pub fn dims(&self) -> [usize; 3] {
        self.n
    }

    pub fn spacing(&self) -> Vec3 {
        self.spacing
    }

    pub fn n_cells(&self) -> usize {
        self.n[0] * self.n[1] * self.n[2]
    }

    /// Linear index of cell (i, j, k).
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.n[0] * (j + self.n[1] * k)
    }

    /// (i, j, k) of a linear index.
    pub fn ijk(&self, idx: usize) -> [usize; 3] {
        let i = idx % self.n[0];
        let j = (idx / self.n[0]) % self.n[1];
        let k = idx / (self.n[0] * self.n[1]);
        [i, j, k]
    }

    /// Cell centre coordinates.
    pub fn cell_centre(&self, idx: usize) -> Vec3 {
        let ijk = self.ijk(idx);
        Vec3::from_fn(|d, _| self.origin[d] + (ijk[d] as f64 + 0.5) * self.spacing[d])
    }

    /// All cell centres, in index order.
    pub fn cell_centres(&self) -> Vec<Vec3> {
        (0..self.n_cells()).map(|idx| self.cell_centre(idx)).collect()
    }

    /// Domain bounding box (min, max).
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let extent = Vec3::from_fn(|d, _| self.n[d] as f64 * self.spacing[d]);
        (self.origin, self.origin + extent)
    }

    /// Derivative of a field along one axis at one cell.
    ///
    /// Returns `None` along a direction with a single cell.
    fn derivative<T>(&self, field: &[T], idx: usize, axis: usize) -> Option<T>
    where
        T: Copy + Sub<Output = T> + Mul<f64, Output = T>,
    {
        let n = self.n[axis];
        if n == 1 {
            return None;
        }
        let stride = match axis {
            0 => 1,
            1 => self.n[0],
            _ => self.n[0] * self.n[1],
        };
        let pos = self.ijk(idx)[axis];
        let h = self.spacing[axis];

        let d = if pos == 0 {
            (field[idx + stride] - field[idx]) * (1.0 / h)
        } else if pos == n - 1 {
            (field[idx] - field[idx - stride]) * (1.0 / h)
        } else {
            (field[idx + stride] - field[idx - stride]) * (0.5 / h)
        };
        Some(d)
    }
}

impl Discretization for UniformGrid {
    fn n_locations(&self) -> usize {
        self.n_cells()
    }

    fn grad_scalar(&self, field: &[f64]) -> Vec<Vec3> {
        debug_assert_eq!(field.len(), self.n_cells());
        (0..self.n_cells())
            .into_par_iter()
            .map(|idx| {
                Vec3::from_fn(|axis, _| self.derivative(field, idx, axis).unwrap_or(0.0))
            })
            .collect()
    }

    fn grad_vector(&self, field: &[Vec3]) -> Vec<Tensor> {
        debug_assert_eq!(field.len(), self.n_cells());
        (0..self.n_cells())
            .into_par_iter()
            .map(|idx| {
                // Row i holds ∂U/∂x_i
                let mut g = Tensor::zeros();
                for axis in 0..3 {
                    if let Some(d) = self.derivative(field, idx, axis) {
                        g.set_row(axis, &d.transpose());
                    }
                }
                g
            })
            .collect()
    }

    fn div_tensor(&self, field: &[Tensor]) -> Vec<Vec3> {
        debug_assert_eq!(field.len(), self.n_cells());
        (0..self.n_cells())
            .into_par_iter()
            .map(|idx| {
                let mut div = Vec3::zeros();
                for axis in 0..3 {
                    if let Some(d) = self.derivative(field, idx, axis) {
                        div += d.row(axis).transpose();
                    }
                }
                div
            })
            .collect()
    }

    /// Distance from each cell centre to the nearest declared wall plane.
    ///
    /// Without walls every cell gets the domain diagonal, i.e. "far from any
    /// wall".
    fn wall_distance(&self) -> Vec<f64> {
        let (min, max) = self.bounds();
        let far = (max - min).norm();
        (0..self.n_cells())
            .into_par_iter()
            .map(|idx| {
                let c = self.cell_centre(idx);
                self.walls
                    .iter()
                    .map(|wall| {
                        let axis = wall.axis();
                        if wall.is_min() {
                            c[axis] - min[axis]
                        } else {
                            max[axis] - c[axis]
                        }
                    })
                    .fold(far, f64::min)
            })
            .collect()
    }
}
