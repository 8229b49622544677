//! Initial conditions: temperature, wall temperature, wall velocity and
//! viscosity, each selected by its model enum.

use std::f64::consts::PI;

use log::{debug, trace};

use crate::error::{ConfigError, SimError};
use crate::solver::params::{BoundaryModel, ProblemParams, TemperatureModel, ViscosityModel};
use crate::state::{FieldViewMut, GridState};

/// Seed every field that must exist before the first Stokes solve.
pub fn initialize_fields(params: &ProblemParams, grid: &mut GridState) -> Result<(), SimError> {
    initialize_temperature(params, grid.temperature_mut())?;
    initialize_temperature_boundary(params, grid.temperature_boundary_mut());
    let (ub, vb) = grid.velocity_boundary_mut();
    initialize_velocity_boundary(params, ub, vb);
    initialize_viscosity(params, grid.viscosity_mut());
    trace!("initial temperature:\n{}", grid.temperature());
    Ok(())
}

pub fn initialize_temperature(params: &ProblemParams, mut temperature: FieldViewMut<'_>) -> Result<(), SimError> {
    let init = &params.initial_temperature;
    let (n, m) = (temperature.cols(), temperature.rows());
    let h = params.h;
    let reference = init.reference_temperature;
    let scale = init.temperature_scale;
    let center = |k: usize| (k as f64 + 0.5) * h;

    match params.temperature_model {
        TemperatureModel::Constant => temperature.fill(reference),
        TemperatureModel::SineWave => {
            let kx = init.x_modes as f64 * PI / params.x_extent;
            let ky = init.y_modes as f64 * PI / params.y_extent;
            for i in 0..m {
                for j in 0..n {
                    let value = reference + scale * (kx * center(j)).sin() * (ky * center(i)).sin();
                    temperature.set(j, i, value);
                }
            }
        }
        TemperatureModel::SquareWave => {
            for i in 0..m {
                for j in 0..n {
                    let inside = n / 4 < j && j < 3 * n / 4 && m / 4 < i && i < 3 * m / 4;
                    temperature.set(j, i, if inside { reference + scale } else { reference });
                }
            }
        }
        TemperatureModel::Circle => {
            let circle = init.circle.ok_or_else(|| ConfigError::MissingKey {
                section: "initialTemperatureParams".to_string(),
                key: "radius".to_string(),
            })?;
            for i in 0..m {
                for j in 0..n {
                    let dx = center(j) - circle.x_center;
                    let dy = center(i) - circle.y_center;
                    let inside = (dx * dx + dy * dy).sqrt() < circle.radius;
                    temperature.set(j, i, if inside { reference + scale } else { reference });
                }
            }
        }
    }
    debug!("temperature initialized with the {} model", params.temperature_model.name());
    Ok(())
}

pub fn initialize_temperature_boundary(params: &ProblemParams, mut walls: FieldViewMut<'_>) {
    for j in 0..walls.cols() {
        walls.set(j, 0, params.temperature_boundary.lower);
        walls.set(j, 1, params.temperature_boundary.upper);
    }
}

/// Normal wall velocities: `ub` is 2 columns (left, right) by M rows, `vb`
/// is N columns by 2 rows (bottom, top).
pub fn initialize_velocity_boundary(params: &ProblemParams, mut ub: FieldViewMut<'_>, mut vb: FieldViewMut<'_>) {
    match params.boundary_model {
        BoundaryModel::TauBenchmark => {
            let h = params.h;
            let (m, n) = (ub.rows(), vb.cols());
            for i in 0..m {
                let y = (i as f64 + 0.5) * h;
                for (wall, x) in [(0, 0.0), (1, n as f64 * h)] {
                    ub.set(wall, i, x.cos() * y.sin());
                }
            }
            for j in 0..n {
                let x = (j as f64 + 0.5) * h;
                for (wall, y) in [(0, 0.0), (1, m as f64 * h)] {
                    vb.set(j, wall, -x.sin() * y.cos());
                }
            }
        }
        BoundaryModel::SolCxBenchmark | BoundaryModel::SolKzBenchmark | BoundaryModel::NoFlux => {
            ub.fill(0.0);
            vb.fill(0.0);
        }
    }
    debug!("wall velocity initialized with the {} model", params.boundary_model.name());
}

/// Node viscosity, `(N+1)` columns by `(M+1)` rows.
pub fn initialize_viscosity(params: &ProblemParams, mut viscosity: FieldViewMut<'_>) {
    let n = viscosity.cols() - 1;
    match params.viscosity_model {
        ViscosityModel::Constant => viscosity.fill(params.viscosity_scale),
        ViscosityModel::TauBenchmark => viscosity.fill(1.0),
        ViscosityModel::SolCxBenchmark => {
            for i in 0..viscosity.rows() {
                for j in 0..=n {
                    viscosity.set(j, i, if j <= n / 2 { 1.0 } else { 1.0e6 });
                }
            }
        }
        ViscosityModel::SolKzBenchmark => {
            for i in 0..viscosity.rows() {
                for j in 0..=n {
                    viscosity.set(j, i, 1.0 + j as f64 * params.h * 1.0e6);
                }
            }
        }
    }
    debug!("viscosity initialized with the {} model", params.viscosity_model.name());
}
