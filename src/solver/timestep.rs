use log::{debug, warn};

use crate::solver::params::{ProblemParams, UNBOUNDED};
use crate::state::VelocityFields;

/// Simulation time, step counter and adaptive step size.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationClock {
    time: f64,
    step: i64,
    delta_t: f64,
    end_time: f64,
    end_step: i64,
    cfl: f64,
    h: f64,
    diffusivity: f64,
}

impl SimulationClock {
    pub fn new(params: &ProblemParams) -> Self {
        Self {
            time: params.start_time,
            step: 0,
            delta_t: 0.0,
            end_time: params.end_time,
            end_step: params.end_step,
            cfl: params.cfl,
            h: params.h,
            diffusivity: params.diffusivity,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    fn diffusive_limit(&self) -> f64 {
        if self.diffusivity > 0.0 {
            self.cfl * self.h / self.diffusivity
        } else {
            UNBOUNDED
        }
    }

    /// Diffusive step, shrunk so a whole number of steps lands on `end_time`.
    pub fn initialize(&mut self) {
        let mut delta_t = self.diffusive_limit();
        let remaining = self.end_time - self.time;
        let steps = (remaining / delta_t).floor();
        if (steps * delta_t - remaining).abs() > 1e-6 {
            delta_t = remaining / (steps + 1.0);
        }
        self.delta_t = delta_t;
        debug!("time step initialized to {}", self.delta_t);
    }

    /// CFL step from the current velocities, walls included.
    pub fn recalculate(&mut self, velocity: &VelocityFields<'_>) {
        let max_u = velocity.u.max_abs().max(velocity.u_boundary.max_abs());
        let max_v = velocity.v.max_abs().max(velocity.v_boundary.max_abs());
        let advective = if max_u == 0.0 || max_v == 0.0 {
            UNBOUNDED
        } else {
            self.cfl * self.h / (max_u * max_u + max_v * max_v).sqrt()
        };
        let diffusive = self.diffusive_limit();

        if advective < diffusive {
            self.delta_t = advective;
        } else {
            self.delta_t = diffusive;
            warn!(
                "time step {} taken from the diffusive limit; only stable with an implicit diffusion solver",
                self.delta_t
            );
        }

        if self.time + self.delta_t > self.end_time {
            self.delta_t = self.end_time - self.time;
        }
        debug!("time step recalculated as {}", self.delta_t);
    }

    /// Move forward one step; `false` once either end condition is reached.
    pub fn advance(&mut self) -> bool {
        self.time += self.delta_t;
        self.step += 1;
        self.time < self.end_time && self.step < self.end_step
    }
}
