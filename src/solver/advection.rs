//! Finite-volume temperature advection.
//!
//! Fluxes are evaluated on every cell face, walls included, and the update is
//! written back in conservative form:
//! `T' = T - dt/h * (F_right - F_left + G_top - G_bottom)`.

use crate::solver::boundary::{horizontal_face_velocity, temperature_with_ghosts, vertical_face_velocity};
use crate::solver::params::{AdvectionMethod, FluxLimiter};
use crate::state::TransportFields;

impl FluxLimiter {
    /// Limiter value `phi(r)`.
    pub fn phi(&self, r: f64) -> f64 {
        match self {
            FluxLimiter::VanLeer => (r + r.abs()) / (1.0 + r.abs()),
            FluxLimiter::Minmod => r.min(1.0).max(0.0),
            FluxLimiter::Superbee => 0.0_f64.max((2.0 * r).min(1.0)).max(r.min(2.0)),
            FluxLimiter::MonotonizedCentral => (2.0 * r).min(0.5 * (1.0 + r)).min(2.0).max(0.0),
            FluxLimiter::Unlimited => 0.5 * (1.0 + r),
        }
    }
}

/// Upwind-biased face temperature for a face with Courant number `courant`.
#[inline]
fn face_temperature(
    limiter: Option<FluxLimiter>,
    courant: f64,
    upwind_upwind: f64,
    upwind: f64,
    downwind: f64,
) -> f64 {
    let Some(limiter) = limiter else {
        return upwind;
    };
    let jump = downwind - upwind;
    let r = if jump == 0.0 { 0.0 } else { (upwind - upwind_upwind) / jump };
    upwind + 0.5 * limiter.phi(r) * (1.0 - courant.abs()) * jump
}

/// Advance the temperature by one advective step of length `dt`.
pub fn advect(method: AdvectionMethod, limiter: FluxLimiter, dt: f64, h: f64, fields: &mut TransportFields<'_>) {
    let limiter = match method {
        AdvectionMethod::None => return,
        AdvectionMethod::Upwind => None,
        AdvectionMethod::Fromm => Some(limiter),
    };

    let updated = {
        let t = fields.temperature.as_view();
        let walls = fields.temperature_boundary;
        let vel = &fields.velocity;
        let (m, n) = (t.rows(), t.cols());
        let ghost = |col: isize, row: isize| temperature_with_ghosts(t, walls, col, row);

        let mut flux_x = vec![0.0; m * (n + 1)];
        for i in 0..m {
            let row = i as isize;
            for jf in 0..=n {
                let speed = vertical_face_velocity(vel, jf, i);
                if speed == 0.0 {
                    continue;
                }
                let c = jf as isize;
                let value = if speed > 0.0 {
                    face_temperature(limiter, speed * dt / h, ghost(c - 2, row), ghost(c - 1, row), ghost(c, row))
                } else {
                    face_temperature(limiter, speed * dt / h, ghost(c + 1, row), ghost(c, row), ghost(c - 1, row))
                };
                flux_x[i * (n + 1) + jf] = speed * value;
            }
        }

        let mut flux_y = vec![0.0; (m + 1) * n];
        for iface in 0..=m {
            let r = iface as isize;
            for j in 0..n {
                let speed = horizontal_face_velocity(vel, j, iface);
                if speed == 0.0 {
                    continue;
                }
                let col = j as isize;
                let value = if speed > 0.0 {
                    face_temperature(limiter, speed * dt / h, ghost(col, r - 2), ghost(col, r - 1), ghost(col, r))
                } else {
                    face_temperature(limiter, speed * dt / h, ghost(col, r + 1), ghost(col, r), ghost(col, r - 1))
                };
                flux_y[iface * n + j] = speed * value;
            }
        }

        let scale = dt / h;
        let mut updated = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                let net = flux_x[i * (n + 1) + j + 1] - flux_x[i * (n + 1) + j] + flux_y[(i + 1) * n + j]
                    - flux_y[i * n + j];
                updated[i * n + j] = t.at(j, i) - scale * net;
            }
        }
        updated
    };

    fields.temperature.as_mut_slice().copy_from_slice(&updated);
}
