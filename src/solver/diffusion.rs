//! Temperature diffusion on cell centers.
//!
//! The five-point Laplacian uses zero flux through the side walls and a
//! Dirichlet ghost `2 T_wall - T` below the bottom and above the top row. The
//! wall temperatures enter as a separate source vector `g`, so one diffusion
//! step reads `dT/dt = kappa * (L T + g)`.

use log::debug;

use crate::error::{SimError, SolverError};
use crate::solver::lu::BandedLu;
use crate::solver::params::DiffusionMethod;
use crate::solver::sparse::{CsrBuilder, CsrMatrix};
use crate::state::{FieldView, TransportFields};

/// Laplacian on an `n`-column, `m`-row cell grid with spacing `h`.
pub fn laplacian(m: usize, n: usize, h: f64) -> CsrMatrix {
    let inv_h2 = 1.0 / (h * h);
    let mut builder = CsrBuilder::new(m * n, m * n);
    for i in 0..m {
        for j in 0..n {
            let cell = i * n + j;
            let mut couple = |other: usize| {
                builder.add(cell, other, inv_h2);
                builder.add(cell, cell, -inv_h2);
            };
            if j > 0 {
                couple(cell - 1);
            }
            if j + 1 < n {
                couple(cell + 1);
            }
            if i > 0 {
                couple(cell - n);
            }
            if i + 1 < m {
                couple(cell + n);
            }
            if i == 0 {
                builder.add(cell, cell, -2.0 * inv_h2);
            }
            if i + 1 == m {
                builder.add(cell, cell, -2.0 * inv_h2);
            }
        }
    }
    builder.build()
}

/// Wall-temperature source `g` matching [`laplacian`].
pub fn wall_source(walls: FieldView<'_>, m: usize, h: f64) -> Vec<f64> {
    let n = walls.cols();
    let inv_h2 = 1.0 / (h * h);
    let mut g = vec![0.0; m * n];
    for j in 0..n {
        g[j] += 2.0 * walls.at(j, 0) * inv_h2;
        g[(m - 1) * n + j] += 2.0 * walls.at(j, 1) * inv_h2;
    }
    g
}

/// `I + scale * L`
fn shifted_identity(laplacian: &CsrMatrix, scale: f64) -> CsrMatrix {
    let n = laplacian.n_rows();
    let mut builder = CsrBuilder::new(n, n);
    for r in 0..n {
        builder.add(r, r, 1.0);
        for (c, value) in laplacian.row(r) {
            builder.add(r, c, scale * value);
        }
    }
    builder.build()
}

struct ImplicitOperator {
    method: DiffusionMethod,
    scale_bits: u64,
    factorization: BandedLu,
}

/// Diffusion integrator holding the Laplacian and the last implicit
/// factorization, reused while the method and `dt * kappa` are unchanged.
pub struct DiffusionSolver {
    laplacian: CsrMatrix,
    h: f64,
    implicit: Option<ImplicitOperator>,
    factorizations: usize,
}

impl DiffusionSolver {
    pub fn new(m: usize, n: usize, h: f64) -> Self {
        Self {
            laplacian: laplacian(m, n, h),
            h,
            implicit: None,
            factorizations: 0,
        }
    }

    /// Number of implicit factorizations performed so far.
    pub fn factorizations(&self) -> usize {
        self.factorizations
    }

    /// Solve `(I - lhs_scale * L) x = rhs`, refactorizing only when the
    /// method or `lhs_scale` changed since the last call.
    fn implicit_solve(&mut self, method: DiffusionMethod, lhs_scale: f64, rhs: &[f64]) -> Result<Vec<f64>, SimError> {
        let key = lhs_scale.to_bits();
        let operator = match self.implicit.take() {
            Some(op) if op.method == method && op.scale_bits == key => op,
            _ => {
                let matrix = shifted_identity(&self.laplacian, -lhs_scale);
                let factorization =
                    BandedLu::factor(&matrix).map_err(|e| SimError::solver("diffusion factorization", e))?;
                self.factorizations += 1;
                debug!("factorized {} diffusion operator for scale {}", method.name(), lhs_scale);
                ImplicitOperator {
                    method,
                    scale_bits: key,
                    factorization,
                }
            }
        };
        let solution = operator
            .factorization
            .solve(rhs)
            .map_err(|e| SimError::solver("diffusion solve", e))?;
        self.implicit = Some(operator);
        Ok(solution)
    }

    /// Advance the temperature by one diffusive step of length `dt`.
    pub fn diffuse(
        &mut self,
        method: DiffusionMethod,
        dt: f64,
        diffusivity: f64,
        fields: &mut TransportFields<'_>,
    ) -> Result<(), SimError> {
        if method == DiffusionMethod::None {
            return Ok(());
        }
        let (m, n) = (fields.temperature.rows(), fields.temperature.cols());
        if self.laplacian.n_rows() != m * n {
            return Err(SimError::solver(
                "diffusion",
                SolverError::DimensionMismatch {
                    expected: self.laplacian.n_rows(),
                    found: m * n,
                },
            ));
        }
        let g = wall_source(fields.temperature_boundary, m, self.h);
        let scale = dt * diffusivity;
        let t = fields.temperature.as_slice();
        let mut lt = vec![0.0; m * n];

        let updated = match method {
            DiffusionMethod::None => return Ok(()),
            DiffusionMethod::ForwardEuler => {
                self.laplacian.mul_vec(t, &mut lt);
                t.iter()
                    .zip(lt.iter().zip(&g))
                    .map(|(t, (lt, g))| t + scale * (lt + g))
                    .collect::<Vec<f64>>()
            }
            DiffusionMethod::BackwardEuler => {
                let rhs: Vec<f64> = t.iter().zip(&g).map(|(t, g)| t + scale * g).collect();
                self.implicit_solve(method, scale, &rhs)?
            }
            DiffusionMethod::CrankNicolson => {
                self.laplacian.mul_vec(t, &mut lt);
                let rhs: Vec<f64> = t
                    .iter()
                    .zip(lt.iter().zip(&g))
                    .map(|(t, (lt, g))| t + 0.5 * scale * lt + scale * g)
                    .collect();
                self.implicit_solve(method, 0.5 * scale, &rhs)?
            }
        };

        fields.temperature.as_mut_slice().copy_from_slice(&updated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Dims, GridState};
    use approx::assert_relative_eq;

    fn set_walls(grid: &mut GridState, lower: f64, upper: f64) {
        let n = grid.dims().n;
        let mut walls = grid.temperature_boundary_mut();
        for j in 0..n {
            walls.set(j, 0, lower);
            walls.set(j, 1, upper);
        }
    }

    #[test]
    fn test_laplacian_rows() {
        let l = laplacian(3, 3, 0.5);
        // Interior cell: four neighbors.
        assert_eq!(l.get(4, 4), -16.0);
        // Bottom-left corner: two neighbors plus the Dirichlet ghost.
        assert_eq!(l.get(0, 0), -4.0 * 2.0 - 8.0);
        // Side wall only: three neighbors.
        assert_eq!(l.get(3, 3), -12.0);
    }

    #[test]
    fn test_implicit_methods_preserve_wall_temperature() {
        for method in [DiffusionMethod::BackwardEuler, DiffusionMethod::CrankNicolson, DiffusionMethod::ForwardEuler] {
            let mut grid = GridState::new(Dims::new(4, 5));
            grid.temperature_mut().fill(5.0);
            set_walls(&mut grid, 5.0, 5.0);
            let mut solver = DiffusionSolver::new(4, 5, 0.25);
            let mut fields = grid.transport_fields();
            solver.diffuse(method, 0.001, 1.0, &mut fields).unwrap();
            for &t in grid.temperature().as_slice() {
                assert_relative_eq!(t, 5.0, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_backward_euler_relaxes_to_conduction() {
        let m = 8;
        let h = 1.0 / m as f64;
        let mut grid = GridState::new(Dims::new(m, 3));
        set_walls(&mut grid, 1.0, 0.0);
        let mut solver = DiffusionSolver::new(m, 3, h);
        for _ in 0..30 {
            let mut fields = grid.transport_fields();
            solver.diffuse(DiffusionMethod::BackwardEuler, 1.0, 1.0, &mut fields).unwrap();
        }
        let t = grid.temperature();
        for i in 0..m {
            let expected = 1.0 - (i as f64 + 0.5) * h;
            for j in 0..3 {
                assert_relative_eq!(t.at(j, i), expected, epsilon = 1e-8);
            }
        }
        assert_eq!(solver.factorizations(), 1, "constant dt reuses the factorization");
    }

    #[test]
    fn test_forward_euler_single_step() {
        let h = 1.0;
        let mut grid = GridState::new(Dims::new(2, 2));
        grid.temperature_mut().set(0, 0, 1.0);
        let mut solver = DiffusionSolver::new(2, 2, h);
        let mut fields = grid.transport_fields();
        solver.diffuse(DiffusionMethod::ForwardEuler, 0.1, 1.0, &mut fields).unwrap();
        let t = grid.temperature();
        // Cell (0,0): two neighbors at 0 and the bottom ghost at -1.
        assert_relative_eq!(t.at(0, 0), 1.0 + 0.1 * (-2.0 - 2.0), epsilon = 1e-14);
        assert_relative_eq!(t.at(1, 0), 0.1, epsilon = 1e-14);
        assert_relative_eq!(t.at(0, 1), 0.1, epsilon = 1e-14);
        assert_relative_eq!(t.at(1, 1), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_changing_dt_refactorizes() {
        let mut grid = GridState::new(Dims::new(3, 3));
        let mut solver = DiffusionSolver::new(3, 3, 0.5);
        for dt in [0.1, 0.1, 0.2, 0.2] {
            let mut fields = grid.transport_fields();
            solver.diffuse(DiffusionMethod::CrankNicolson, dt, 1.0, &mut fields).unwrap();
        }
        assert_eq!(solver.factorizations(), 2);
    }

    #[test]
    fn test_changing_diffusivity_refactorizes() {
        let m = 4;
        let h = 1.0 / m as f64;
        let mut grid = GridState::new(Dims::new(m, 2));
        grid.temperature_mut().fill(1.0);
        let mut solver = DiffusionSolver::new(m, 2, h);
        solver
            .diffuse(DiffusionMethod::BackwardEuler, 0.1, 1.0, &mut grid.transport_fields())
            .unwrap();
        solver
            .diffuse(DiffusionMethod::BackwardEuler, 0.1, 4.0, &mut grid.transport_fields())
            .unwrap();
        assert_eq!(solver.factorizations(), 2, "new diffusivity needs a new operator");

        // Same dt * kappa as a fresh solver with kappa = 4.
        let mut reference = GridState::new(Dims::new(m, 2));
        reference.temperature_mut().fill(1.0);
        let mut fresh = DiffusionSolver::new(m, 2, h);
        fresh
            .diffuse(DiffusionMethod::BackwardEuler, 0.1, 1.0, &mut reference.transport_fields())
            .unwrap();
        fresh
            .diffuse(DiffusionMethod::BackwardEuler, 0.4, 1.0, &mut reference.transport_fields())
            .unwrap();
        for (a, b) in grid.temperature().as_slice().iter().zip(reference.temperature().as_slice()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_crank_nicolson_matches_backward_euler_at_steady_state() {
        let m = 6;
        let h = 1.0 / m as f64;
        let mut be = GridState::new(Dims::new(m, 2));
        let mut cn = GridState::new(Dims::new(m, 2));
        set_walls(&mut be, 2.0, 1.0);
        set_walls(&mut cn, 2.0, 1.0);
        let mut be_solver = DiffusionSolver::new(m, 2, h);
        let mut cn_solver = DiffusionSolver::new(m, 2, h);
        for _ in 0..400 {
            be_solver
                .diffuse(DiffusionMethod::BackwardEuler, 0.05, 1.0, &mut be.transport_fields())
                .unwrap();
            cn_solver
                .diffuse(DiffusionMethod::CrankNicolson, 0.05, 1.0, &mut cn.transport_fields())
                .unwrap();
        }
        for (a, b) in be.temperature().as_slice().iter().zip(cn.temperature().as_slice()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-8);
        }
    }
}
