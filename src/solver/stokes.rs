//! Cached Stokes solve.
//!
//! The assembled operators and their factorization are kept between steps and
//! reused while the viscosity cannot change. Any viscosity model other than
//! `constant` forces a fresh assembly on every solve.

use log::{debug, trace};

use crate::error::{SimError, SolverError};
use crate::solver::forms::{assemble_stokes, interleaved_ordering, StokesOperators};
use crate::solver::lu::BandedLu;
use crate::solver::params::ViscosityModel;
use crate::state::{Dims, StokesFields};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    Factorized,
}

#[derive(Debug)]
struct CachedSystem {
    operators: StokesOperators,
    factorization: BandedLu,
}

#[derive(Debug, Default)]
pub struct StokesSystem {
    cache: Option<CachedSystem>,
    assemblies: usize,
}

impl StokesSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CacheState {
        if self.cache.is_some() {
            CacheState::Factorized
        } else {
            CacheState::Uninitialized
        }
    }

    /// Number of assemblies performed so far.
    pub fn assemblies(&self) -> usize {
        self.assemblies
    }

    /// Drop the cached operators so the next solve reassembles.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    fn assemble(&mut self, dims: Dims, h: f64, fields: &StokesFields<'_>) -> Result<CachedSystem, SimError> {
        let operators = assemble_stokes(dims, h, fields.viscosity);
        let factorization = BandedLu::factor_ordered(&operators.stokes, interleaved_ordering(dims))
            .map_err(|e| SimError::solver("Stokes factorization", e))?;
        self.assemblies += 1;
        let (kl, ku) = factorization.bandwidth();
        debug!(
            "assembled Stokes system #{}: {} unknowns, {} nonzeros, bandwidth {}/{}",
            self.assemblies,
            operators.stokes.n_rows(),
            operators.stokes.nnz(),
            kl,
            ku
        );
        Ok(CachedSystem {
            operators,
            factorization,
        })
    }

    /// Solve for `[u; v; p]` and write it into `fields.solution`, then shift
    /// the pressure to zero mean.
    pub fn solve(
        &mut self,
        dims: Dims,
        h: f64,
        viscosity_model: ViscosityModel,
        fields: StokesFields<'_>,
    ) -> Result<(), SimError> {
        let cached = match self.cache.take() {
            Some(cached) if viscosity_model == ViscosityModel::Constant => {
                trace!("reusing cached Stokes factorization");
                cached
            }
            _ => self.assemble(dims, h, &fields)?,
        };

        let operators = &cached.operators;
        let mut rhs = vec![0.0; operators.stokes.n_rows()];
        operators.forcing.mul_vec(fields.forcing, &mut rhs);
        operators.boundary.mul_vec_add(fields.velocity_boundary, &mut rhs);

        let solution = cached
            .factorization
            .solve(&rhs)
            .map_err(|e| SimError::solver("Stokes solve", e))?;
        if solution.len() != fields.solution.len() {
            return Err(SimError::solver(
                "Stokes solve",
                SolverError::DimensionMismatch {
                    expected: fields.solution.len(),
                    found: solution.len(),
                },
            ));
        }
        fields.solution.copy_from_slice(&solution);
        self.cache = Some(cached);

        let pressure = &mut fields.solution[dims.forcing_len()..];
        let mean = pressure.iter().sum::<f64>() / pressure.len() as f64;
        pressure.iter_mut().for_each(|p| *p -= mean);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::boundary::horizontal_face_velocity;
    use crate::solver::boundary::vertical_face_velocity;
    use crate::state::GridState;
    use std::f64::consts::PI;

    /// Grid with the analytic Tau-benchmark forcing and walls.
    fn tau_grid(size: usize) -> (GridState, f64) {
        let dims = Dims::new(size, size);
        let h = PI / size as f64;
        let mut grid = GridState::new(dims);
        grid.viscosity_mut().fill(1.0);
        {
            let (mut ub, mut vb) = grid.velocity_boundary_mut();
            for i in 0..size {
                let y = (i as f64 + 0.5) * h;
                ub.set(0, i, y.sin());
                ub.set(1, i, PI.cos() * y.sin());
            }
            for j in 0..size {
                let x = (j as f64 + 0.5) * h;
                vb.set(j, 0, -x.sin());
                vb.set(j, 1, -x.sin() * PI.cos());
            }
        }
        {
            let (mut uf, mut vf, _) = grid.forcing_fields();
            for i in 0..size {
                for j in 0..size - 1 {
                    let x = (j as f64 + 1.0) * h;
                    let y = (i as f64 + 0.5) * h;
                    uf.set(j, i, 3.0 * x.cos() * y.sin());
                }
            }
            for i in 0..size - 1 {
                for j in 0..size {
                    let x = (j as f64 + 0.5) * h;
                    let y = (i as f64 + 1.0) * h;
                    vf.set(j, i, -x.sin() * y.cos());
                }
            }
        }
        (grid, h)
    }

    #[test]
    fn test_tau_benchmark_velocity() {
        let size = 16;
        let (mut grid, h) = tau_grid(size);
        let dims = grid.dims();
        let mut system = StokesSystem::new();
        system
            .solve(dims, h, ViscosityModel::Constant, grid.stokes_fields())
            .unwrap();

        let u = grid.u_velocity();
        let mut err: f64 = 0.0;
        for i in 0..size {
            for j in 0..size - 1 {
                let exact = ((j as f64 + 1.0) * h).cos() * ((i as f64 + 0.5) * h).sin();
                err = err.max((u.at(j, i) - exact).abs());
            }
        }
        assert!(err < 0.05, "u error {} too large", err);

        let v = grid.v_velocity();
        let mut err: f64 = 0.0;
        for i in 0..size - 1 {
            for j in 0..size {
                let exact = -((j as f64 + 0.5) * h).sin() * ((i as f64 + 1.0) * h).cos();
                err = err.max((v.at(j, i) - exact).abs());
            }
        }
        assert!(err < 0.05, "v error {} too large", err);
    }

    #[test]
    fn test_pressure_has_zero_mean() {
        let (mut grid, h) = tau_grid(8);
        let dims = grid.dims();
        StokesSystem::new()
            .solve(dims, h, ViscosityModel::Constant, grid.stokes_fields())
            .unwrap();
        let p = grid.pressure();
        let mean: f64 = p.as_slice().iter().sum::<f64>() / p.as_slice().len() as f64;
        assert!(mean.abs() < 1e-10, "pressure mean {}", mean);
    }

    #[test]
    fn test_continuity_away_from_pin() {
        let size = 8;
        let (mut grid, h) = tau_grid(size);
        let dims = grid.dims();
        StokesSystem::new()
            .solve(dims, h, ViscosityModel::Constant, grid.stokes_fields())
            .unwrap();
        let vel = grid.velocity_fields();
        for i in 0..size {
            for j in 0..size {
                if i == 0 && j == 0 {
                    continue;
                }
                let div = (vertical_face_velocity(&vel, j + 1, i) - vertical_face_velocity(&vel, j, i)
                    + horizontal_face_velocity(&vel, j, i + 1)
                    - horizontal_face_velocity(&vel, j, i))
                    / h;
                assert!(div.abs() < 1e-8, "divergence {} in cell ({}, {})", div, j, i);
            }
        }
    }

    #[test]
    fn test_cache_reuse_for_constant_viscosity() {
        let (mut grid, h) = tau_grid(6);
        let dims = grid.dims();
        let mut system = StokesSystem::new();
        assert_eq!(system.state(), CacheState::Uninitialized);
        for _ in 0..3 {
            system
                .solve(dims, h, ViscosityModel::Constant, grid.stokes_fields())
                .unwrap();
        }
        assert_eq!(system.assemblies(), 1);
        assert_eq!(system.state(), CacheState::Factorized);

        system.invalidate();
        system
            .solve(dims, h, ViscosityModel::Constant, grid.stokes_fields())
            .unwrap();
        assert_eq!(system.assemblies(), 2);
    }

    #[test]
    fn test_variable_viscosity_reassembles_every_solve() {
        let (mut grid, h) = tau_grid(6);
        let dims = grid.dims();
        let mut system = StokesSystem::new();
        for _ in 0..3 {
            system
                .solve(dims, h, ViscosityModel::SolCxBenchmark, grid.stokes_fields())
                .unwrap();
        }
        assert_eq!(system.assemblies(), 3);
    }

    #[test]
    fn test_non_finite_viscosity_is_solver_failure() {
        let (mut grid, h) = tau_grid(4);
        grid.viscosity_mut().fill(f64::NAN);
        let dims = grid.dims();
        let err = StokesSystem::new()
            .solve(dims, h, ViscosityModel::Constant, grid.stokes_fields())
            .unwrap_err();
        assert!(
            matches!(err, SimError::SolverFailure { operation: "Stokes factorization", .. }),
            "got {:?}",
            err
        );
    }
}
