//! Body-force models for the momentum equations.

use std::f64::consts::PI;

use crate::solver::params::{BuoyancyParams, ForcingModel};
use crate::state::{FieldView, FieldViewMut};

/// Fill `u_forcing` / `v_forcing` for the selected model.
///
/// Only `buoyancy` reads the temperature; the analytic models depend on
/// position alone.
pub fn update_forcing(
    model: ForcingModel,
    h: f64,
    buoyancy: &BuoyancyParams,
    mut u_forcing: FieldViewMut<'_>,
    mut v_forcing: FieldViewMut<'_>,
    temperature: FieldView<'_>,
) {
    let (u_cols, u_rows) = (u_forcing.cols(), u_forcing.rows());
    let (v_cols, v_rows) = (v_forcing.cols(), v_forcing.rows());

    match model {
        ForcingModel::TauBenchmark | ForcingModel::VorticalFlow => {
            let amplitude = if model == ForcingModel::TauBenchmark { 3.0 } else { 1.0 };
            for i in 0..u_rows {
                for j in 0..u_cols {
                    let x = (j as f64 + 1.0) * h;
                    let y = (i as f64 + 0.5) * h;
                    u_forcing.set(j, i, amplitude * x.cos() * y.sin());
                }
            }
            for i in 0..v_rows {
                for j in 0..v_cols {
                    let x = (j as f64 + 0.5) * h;
                    let y = (i as f64 + 1.0) * h;
                    v_forcing.set(j, i, -x.sin() * y.cos());
                }
            }
        }
        ForcingModel::SolCxBenchmark | ForcingModel::SolKzBenchmark => {
            u_forcing.fill(0.0);
            for i in 0..v_rows {
                for j in 0..v_cols {
                    let value = -((i as f64 + 0.5) * PI * h).sin() * ((j as f64 + 1.0) * PI * h).cos();
                    v_forcing.set(j, i, value);
                }
            }
        }
        ForcingModel::Buoyancy => {
            u_forcing.fill(0.0);
            for i in 0..v_rows {
                for j in 0..v_cols {
                    let face_temperature = 0.5 * (temperature.at(j, i) + temperature.at(j, i + 1));
                    let value = -buoyancy.density_constant
                        * (1.0 - buoyancy.thermal_expansion * (face_temperature - buoyancy.reference_temperature));
                    v_forcing.set(j, i, value);
                }
            }
        }
    }
}
