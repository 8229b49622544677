use serde::Serialize;

use crate::solver::boundary::{horizontal_face_velocity, vertical_face_velocity};
use crate::state::{GridState, VelocityFields};

/// Scalar summary of the grid, logged every step and stored with snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSummary {
    pub kinetic_energy: f64,
    pub max_velocity: f64,
    pub max_divergence: f64,
    pub mean_temperature: f64,
    /// `None` when both walls share one temperature.
    pub nusselt: Option<f64>,
}

/// Cell-centered velocity `(u, v)` of cell `(j, i)` from its four faces.
fn cell_velocity(vel: &VelocityFields<'_>, j: usize, i: usize) -> (f64, f64) {
    let u = 0.5 * (vertical_face_velocity(vel, j, i) + vertical_face_velocity(vel, j + 1, i));
    let v = 0.5 * (horizontal_face_velocity(vel, j, i) + horizontal_face_velocity(vel, j, i + 1));
    (u, v)
}

/// Volume-averaged kinetic energy: KE = 0.5 * <u² + v²> over cell centers.
pub fn compute_kinetic_energy(vel: &VelocityFields<'_>) -> f64 {
    let (m, n) = (vel.u.rows(), vel.v.cols());
    let mut sum = 0.0;
    for i in 0..m {
        for j in 0..n {
            let (u, v) = cell_velocity(vel, j, i);
            sum += u * u + v * v;
        }
    }
    0.5 * sum / (m * n) as f64
}

/// Largest `|div u|` over all cells, wall fluxes included.
pub fn compute_max_divergence(vel: &VelocityFields<'_>, h: f64) -> f64 {
    let (m, n) = (vel.u.rows(), vel.v.cols());
    let mut worst: f64 = 0.0;
    for i in 0..m {
        for j in 0..n {
            let div = (vertical_face_velocity(vel, j + 1, i) - vertical_face_velocity(vel, j, i)
                + horizontal_face_velocity(vel, j, i + 1)
                - horizontal_face_velocity(vel, j, i))
                / h;
            worst = worst.max(div.abs());
        }
    }
    worst
}

/// Heat flux through the top wall normalized by the conductive flux:
/// Nu = <(T_top_row - T_upper) / (h/2)> / ((T_lower - T_upper) / height).
pub fn compute_nusselt(grid: &GridState, h: f64) -> Option<f64> {
    let t = grid.temperature();
    let walls = grid.temperature_boundary();
    let (m, n) = (t.rows(), t.cols());
    let height = m as f64 * h;
    let mut flux = 0.0;
    let mut drop = 0.0;
    for j in 0..n {
        flux += (t.at(j, m - 1) - walls.at(j, 1)) / (0.5 * h);
        drop += walls.at(j, 0) - walls.at(j, 1);
    }
    if drop == 0.0 {
        return None;
    }
    Some(flux / (drop / height))
}

pub fn summarize(grid: &GridState, h: f64) -> FieldSummary {
    let vel = grid.velocity_fields();
    let t = grid.temperature();
    let max_velocity = vel
        .u
        .max_abs()
        .max(vel.v.max_abs())
        .max(vel.u_boundary.max_abs())
        .max(vel.v_boundary.max_abs());
    FieldSummary {
        kinetic_energy: compute_kinetic_energy(&vel),
        max_velocity,
        max_divergence: compute_max_divergence(&vel, h),
        mean_temperature: t.as_slice().iter().sum::<f64>() / t.as_slice().len() as f64,
        nusselt: compute_nusselt(grid, h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Dims;

    fn conductive_grid(m: usize, n: usize, lower: f64, upper: f64) -> (GridState, f64) {
        let h = 1.0 / m as f64;
        let mut grid = GridState::new(Dims::new(m, n));
        {
            let mut walls = grid.temperature_boundary_mut();
            for j in 0..n {
                walls.set(j, 0, lower);
                walls.set(j, 1, upper);
            }
        }
        {
            let mut t = grid.temperature_mut();
            for i in 0..m {
                let y = (i as f64 + 0.5) * h;
                for j in 0..n {
                    t.set(j, i, lower + (upper - lower) * y);
                }
            }
        }
        (grid, h)
    }

    #[test]
    fn test_nusselt_at_conduction() {
        let (grid, h) = conductive_grid(8, 4, 1.0, 0.0);
        let nu = compute_nusselt(&grid, h).unwrap();
        assert!((nu - 1.0).abs() < 1e-10, "Nu should be 1.0 at conduction, got {}", nu);
    }

    #[test]
    fn test_nusselt_undefined_without_drop() {
        let (grid, h) = conductive_grid(4, 4, 2.0, 2.0);
        assert_eq!(compute_nusselt(&grid, h), None);
    }

    #[test]
    fn test_kinetic_energy_zero() {
        let grid = GridState::new(Dims::new(4, 4));
        let ke = compute_kinetic_energy(&grid.velocity_fields());
        assert!(ke.abs() < 1e-15, "KE should be 0 with no flow, got {}", ke);
    }

    #[test]
    fn test_kinetic_energy_uniform_flow() {
        let mut grid = GridState::new(Dims::new(3, 5));
        grid.velocity_mut().0.fill(1.0);
        grid.velocity_boundary_mut().0.fill(1.0);
        let ke = compute_kinetic_energy(&grid.velocity_fields());
        assert!((ke - 0.5).abs() < 1e-12, "KE should be 0.5, got {}", ke);
    }

    #[test]
    fn test_divergence_of_uniform_flow_is_zero() {
        let mut grid = GridState::new(Dims::new(3, 5));
        grid.velocity_mut().0.fill(2.0);
        grid.velocity_boundary_mut().0.fill(2.0);
        assert_eq!(compute_max_divergence(&grid.velocity_fields(), 0.1), 0.0);

        grid.velocity_boundary_mut().0.set(1, 0, 3.0);
        let div = compute_max_divergence(&grid.velocity_fields(), 0.5);
        assert!((div - 2.0).abs() < 1e-12, "outflow excess should show, got {}", div);
    }

    #[test]
    fn test_summary_fields() {
        let (grid, h) = conductive_grid(4, 4, 1.0, 0.0);
        let summary = summarize(&grid, h);
        assert!((summary.mean_temperature - 0.5).abs() < 1e-12);
        assert_eq!(summary.max_velocity, 0.0);
        assert!(summary.nusselt.is_some());
    }
}
