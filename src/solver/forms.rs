//! Sparse operator assembly for the staggered Stokes system.
//!
//! Unknowns are `[u; v; p]`. Momentum uses the stress-divergence form:
//! normal stresses live at cell centers with the viscosity averaged from the
//! four surrounding nodes, shear stresses live at nodes and vanish on the
//! walls (free slip). Wall velocities are moved to the right-hand side
//! through the boundary operator, so the system reads
//! `A x = F f + B b`.

use crate::solver::boundary::{Dof, StaggeredIndex};
use crate::solver::sparse::{CsrBuilder, CsrMatrix};
use crate::state::{Dims, FieldView};

/// The three operators of one assembly.
#[derive(Debug, Clone)]
pub struct StokesOperators {
    pub stokes: CsrMatrix,
    pub forcing: CsrMatrix,
    pub boundary: CsrMatrix,
}

struct RowWriter<'a> {
    row: usize,
    stokes: &'a mut CsrBuilder,
    boundary: &'a mut CsrBuilder,
}

impl RowWriter<'_> {
    #[inline]
    fn add(&mut self, dof: Dof, coefficient: f64) {
        match dof {
            Dof::Unknown(col) => self.stokes.add(self.row, col, coefficient),
            Dof::Wall(col) => self.boundary.add(self.row, col, -coefficient),
        }
    }
}

/// Viscosity at the center of cell `(j, i)`.
#[inline]
fn cell_viscosity(viscosity: &FieldView<'_>, j: usize, i: usize) -> f64 {
    0.25 * (viscosity.at(j, i) + viscosity.at(j + 1, i) + viscosity.at(j, i + 1) + viscosity.at(j + 1, i + 1))
}

/// Build the Stokes, forcing and boundary operators for the current viscosity.
pub fn assemble_stokes(dims: Dims, h: f64, viscosity: FieldView<'_>) -> StokesOperators {
    let (m, n) = (dims.m, dims.n);
    let index = StaggeredIndex::new(dims);
    let size = dims.stokes_len();
    let inv_h = 1.0 / h;
    let inv_h2 = inv_h * inv_h;

    let mut stokes = CsrBuilder::new(size, size);
    let mut boundary = CsrBuilder::new(size, dims.velocity_boundary_len());

    // x-momentum on interior vertical faces.
    for i in 0..m {
        for j in 0..n - 1 {
            let jf = j + 1;
            let mut row = RowWriter {
                row: index.u(j, i),
                stokes: &mut stokes,
                boundary: &mut boundary,
            };

            let eta_right = cell_viscosity(&viscosity, j + 1, i);
            let eta_left = cell_viscosity(&viscosity, j, i);
            row.add(index.u_face(jf + 1, i), -2.0 * eta_right * inv_h2);
            row.add(index.u_face(jf, i), 2.0 * (eta_right + eta_left) * inv_h2);
            row.add(index.u_face(jf - 1, i), -2.0 * eta_left * inv_h2);

            if i + 1 < m {
                let eta = viscosity.at(jf, i + 1) * inv_h2;
                row.add(index.u_face(jf, i + 1), -eta);
                row.add(index.u_face(jf, i), eta);
                row.add(index.v_face(jf, i + 1), -eta);
                row.add(index.v_face(jf - 1, i + 1), eta);
            }
            if i > 0 {
                let eta = viscosity.at(jf, i) * inv_h2;
                row.add(index.u_face(jf, i), eta);
                row.add(index.u_face(jf, i - 1), -eta);
                row.add(index.v_face(jf, i), eta);
                row.add(index.v_face(jf - 1, i), -eta);
            }

            row.add(Dof::Unknown(index.p(j + 1, i)), inv_h);
            row.add(Dof::Unknown(index.p(j, i)), -inv_h);
        }
    }

    // y-momentum on interior horizontal faces.
    for i in 0..m - 1 {
        for j in 0..n {
            let iface = i + 1;
            let mut row = RowWriter {
                row: index.v(j, i),
                stokes: &mut stokes,
                boundary: &mut boundary,
            };

            let eta_top = cell_viscosity(&viscosity, j, i + 1);
            let eta_bottom = cell_viscosity(&viscosity, j, i);
            row.add(index.v_face(j, iface + 1), -2.0 * eta_top * inv_h2);
            row.add(index.v_face(j, iface), 2.0 * (eta_top + eta_bottom) * inv_h2);
            row.add(index.v_face(j, iface - 1), -2.0 * eta_bottom * inv_h2);

            if j + 1 < n {
                let eta = viscosity.at(j + 1, iface) * inv_h2;
                row.add(index.u_face(j + 1, iface), -eta);
                row.add(index.u_face(j + 1, iface - 1), eta);
                row.add(index.v_face(j + 1, iface), -eta);
                row.add(index.v_face(j, iface), eta);
            }
            if j > 0 {
                let eta = viscosity.at(j, iface) * inv_h2;
                row.add(index.u_face(j, iface), eta);
                row.add(index.u_face(j, iface - 1), -eta);
                row.add(index.v_face(j, iface), eta);
                row.add(index.v_face(j - 1, iface), -eta);
            }

            row.add(Dof::Unknown(index.p(j, i + 1)), inv_h);
            row.add(Dof::Unknown(index.p(j, i)), -inv_h);
        }
    }

    // Continuity as the negated divergence; cell (0, 0) pins the pressure.
    for i in 0..m {
        for j in 0..n {
            let p = index.p(j, i);
            if i == 0 && j == 0 {
                stokes.set(p, p, 1.0);
                continue;
            }
            let mut row = RowWriter {
                row: p,
                stokes: &mut stokes,
                boundary: &mut boundary,
            };
            row.add(index.u_face(j + 1, i), -inv_h);
            row.add(index.u_face(j, i), inv_h);
            row.add(index.v_face(j, i + 1), -inv_h);
            row.add(index.v_face(j, i), inv_h);
        }
    }

    let mut forcing = CsrBuilder::new(size, dims.forcing_len());
    for k in 0..dims.forcing_len() {
        forcing.set(k, k, 1.0);
    }

    StokesOperators {
        stokes: stokes.build(),
        forcing: forcing.build(),
        boundary: boundary.build(),
    }
}

/// Cell-major renumbering of `[u; v; p]`: each cell contributes its right
/// u-face, top v-face and pressure, and cells are walked with the shorter
/// grid axis varying fastest. Returns `perm[new] = old`.
pub fn interleaved_ordering(dims: Dims) -> Vec<usize> {
    let (m, n) = (dims.m, dims.n);
    let index = StaggeredIndex::new(dims);
    let mut perm = Vec::with_capacity(dims.stokes_len());
    let mut push_cell = |j: usize, i: usize| {
        if j + 1 < n {
            perm.push(index.u(j, i));
        }
        if i + 1 < m {
            perm.push(index.v(j, i));
        }
        perm.push(index.p(j, i));
    };
    if n <= m {
        for i in 0..m {
            for j in 0..n {
                push_cell(j, i);
            }
        }
    } else {
        for j in 0..n {
            for i in 0..m {
                push_cell(j, i);
            }
        }
    }
    perm
}
