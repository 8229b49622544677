//! Wall handling on the staggered grid.
//!
//! Vertical faces are numbered `jf = 0..=N` and horizontal faces
//! `if = 0..=M`; the first and last of each are walls whose normal velocity
//! lives in the boundary buffers instead of the unknown vector.

use crate::state::{Dims, FieldView, VelocityFields};

/// A velocity degree of freedom: either part of the `[u; v; p]` unknowns or a
/// prescribed wall value in `[uB; vB]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dof {
    Unknown(usize),
    Wall(usize),
}

/// Index map from grid positions to slots of the Stokes vectors.
#[derive(Debug, Clone, Copy)]
pub struct StaggeredIndex {
    m: usize,
    n: usize,
    u_len: usize,
    v_len: usize,
}

impl StaggeredIndex {
    pub fn new(dims: Dims) -> Self {
        Self {
            m: dims.m,
            n: dims.n,
            u_len: dims.u_len(),
            v_len: dims.v_len(),
        }
    }

    /// Interior u at `(j, i)`, `j < N-1`.
    #[inline]
    pub fn u(&self, j: usize, i: usize) -> usize {
        i * (self.n - 1) + j
    }

    /// Interior v at `(j, i)`, `i < M-1`.
    #[inline]
    pub fn v(&self, j: usize, i: usize) -> usize {
        self.u_len + i * self.n + j
    }

    #[inline]
    pub fn p(&self, j: usize, i: usize) -> usize {
        self.u_len + self.v_len + i * self.n + j
    }

    /// Normal velocity on vertical face `jf` of row `i`.
    #[inline]
    pub fn u_face(&self, jf: usize, i: usize) -> Dof {
        if jf == 0 {
            Dof::Wall(2 * i)
        } else if jf == self.n {
            Dof::Wall(2 * i + 1)
        } else {
            Dof::Unknown(self.u(jf - 1, i))
        }
    }

    /// Normal velocity on horizontal face `iface` of column `j`.
    #[inline]
    pub fn v_face(&self, j: usize, iface: usize) -> Dof {
        if iface == 0 {
            Dof::Wall(2 * self.m + j)
        } else if iface == self.m {
            Dof::Wall(2 * self.m + self.n + j)
        } else {
            Dof::Unknown(self.v(j, iface - 1))
        }
    }
}

/// Velocity through vertical face `jf` (`0..=N`) of row `i`, walls included.
#[inline]
pub fn vertical_face_velocity(vel: &VelocityFields<'_>, jf: usize, i: usize) -> f64 {
    let n = vel.v.cols();
    if jf == 0 {
        vel.u_boundary.at(0, i)
    } else if jf == n {
        vel.u_boundary.at(1, i)
    } else {
        vel.u.at(jf - 1, i)
    }
}

/// Velocity through horizontal face `iface` (`0..=M`) of column `j`, walls included.
#[inline]
pub fn horizontal_face_velocity(vel: &VelocityFields<'_>, j: usize, iface: usize) -> f64 {
    let m = vel.u.rows();
    if iface == 0 {
        vel.v_boundary.at(j, 0)
    } else if iface == m {
        vel.v_boundary.at(j, 1)
    } else {
        vel.v.at(j, iface - 1)
    }
}

/// Temperature at cell `(col, row)` extended one layer past every wall.
///
/// Side walls are zero-gradient (clamped column); bottom and top ghosts take
/// the wall temperature.
pub fn temperature_with_ghosts(
    temperature: FieldView<'_>,
    wall: FieldView<'_>,
    col: isize,
    row: isize,
) -> f64 {
    let n = temperature.cols() as isize;
    let m = temperature.rows() as isize;
    let col = col.clamp(0, n - 1) as usize;
    if row < 0 {
        wall.at(col, 0)
    } else if row >= m {
        wall.at(col, 1)
    } else {
        temperature.at(col, row as usize)
    }
}
