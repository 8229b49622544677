mod advection;
mod boundary;
pub mod diagnostics;
mod diffusion;
mod forcing;
mod forms;
mod init;
mod lu;
mod params;
mod sparse;
mod stokes;
mod timestep;

// Re-export public API
pub use diagnostics::{summarize, FieldSummary};
pub use params::{
    AdvectionMethod, BoundaryModel, BuoyancyParams, CircleParams, DiffusionMethod, FluxLimiter, ForcingModel,
    InitialTemperatureParams, OutputFormat, OutputParams, ProblemParams, TemperatureBoundaryParams,
    TemperatureModel, ViscosityModel, UNBOUNDED,
};
pub use stokes::{CacheState, StokesSystem};
pub use timestep::SimulationClock;

use log::debug;

use crate::config::ParamTree;
use crate::error::SimError;
use crate::state::{Dims, GridState};
use advection::advect;
use diffusion::DiffusionSolver;
use forcing::update_forcing;
use init::initialize_fields;

/// A configured simulation: parameters, field buffers, clock and the
/// cached linear systems.
pub struct Problem {
    params: ProblemParams,
    grid: GridState,
    clock: SimulationClock,
    stokes: StokesSystem,
    diffusion: DiffusionSolver,
}

impl Problem {
    pub fn new(params: ProblemParams, dims: Dims) -> Self {
        let clock = SimulationClock::new(&params);
        let diffusion = DiffusionSolver::new(dims.m, dims.n, params.h);
        Self {
            grid: GridState::new(dims),
            clock,
            stokes: StokesSystem::new(),
            diffusion,
            params,
        }
    }

    /// Read `geometryParams`, `problemParams` and `outputParams`.
    pub fn from_params(tree: &ParamTree) -> Result<Self, SimError> {
        let dims = GridState::from_params(tree)?.dims();
        let params = ProblemParams::from_params(tree, dims)?;
        debug!(
            "problem {}x{} (h = {}), forcing {}, viscosity {}, advection {}, diffusion {}",
            dims.n,
            dims.m,
            params.h,
            params.forcing_model.name(),
            params.viscosity_model.name(),
            params.advection_method.name(),
            params.diffusion_method.name()
        );
        Ok(Self::new(params, dims))
    }

    /// Seed the fields, the initial step size and the forcing terms.
    pub fn initialize(&mut self) -> Result<(), SimError> {
        initialize_fields(&self.params, &mut self.grid)?;
        self.clock.initialize();
        // Forcing is ready before the first Stokes solve, so step 0 already
        // carries the buoyancy / benchmark body force rather than zero forcing.
        self.update_forcing_terms();
        Ok(())
    }

    pub fn solve_stokes(&mut self) -> Result<(), SimError> {
        let dims = self.grid.dims();
        self.stokes
            .solve(dims, self.params.h, self.params.viscosity_model, self.grid.stokes_fields())
    }

    pub fn update_forcing_terms(&mut self) {
        let (uf, vf, temperature) = self.grid.forcing_fields();
        update_forcing(self.params.forcing_model, self.params.h, &self.params.buoyancy, uf, vf, temperature);
    }

    pub fn recalculate_timestep(&mut self) {
        self.clock.recalculate(&self.grid.velocity_fields());
    }

    /// Operator-split transport: advection, then diffusion, over one step.
    pub fn solve_advection_diffusion(&mut self) -> Result<(), SimError> {
        let dt = self.clock.delta_t();
        let mut fields = self.grid.transport_fields();
        advect(self.params.advection_method, self.params.flux_limiter, dt, self.params.h, &mut fields);
        self.diffusion
            .diffuse(self.params.diffusion_method, dt, self.params.diffusivity, &mut fields)
    }

    /// `false` once the end time or end step is reached.
    pub fn advance_timestep(&mut self) -> bool {
        self.clock.advance()
    }

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn params(&self) -> &ProblemParams {
        &self.params
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn stokes_assemblies(&self) -> usize {
        self.stokes.assemblies()
    }

    pub fn diffusion_factorizations(&self) -> usize {
        self.diffusion.factorizations()
    }

    pub fn summary(&self) -> FieldSummary {
        summarize(&self.grid, self.params.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_params;
    use crate::error::ModelFamily;

    #[test]
    fn test_tau_problem_end_to_end() {
        let size = 16;
        let mut problem = Problem::new(ProblemParams::tau_benchmark(Dims::new(size, size)), Dims::new(size, size));
        problem.initialize().unwrap();
        problem.solve_stokes().unwrap();

        let h = problem.params().h;
        let u = problem.grid().u_velocity();
        let mut err: f64 = 0.0;
        for i in 0..size {
            for j in 0..size - 1 {
                let exact = ((j as f64 + 1.0) * h).cos() * ((i as f64 + 0.5) * h).sin();
                err = err.max((u.at(j, i) - exact).abs());
            }
        }
        assert!(err < 0.05, "u error {} too large", err);
        assert!(problem.summary().max_divergence < 1e-8, "flow should be divergence free");
    }

    #[test]
    fn test_initialize_fills_forcing_before_first_solve() {
        let dims = Dims::new(8, 8);
        let mut problem = Problem::new(ProblemParams::tau_benchmark(dims), dims);
        problem.initialize().unwrap();
        assert!(problem.grid().u_forcing().max_abs() > 0.0, "u forcing must be set by initialize");
        assert!(problem.grid().v_forcing().max_abs() > 0.0, "v forcing must be set by initialize");

        problem.solve_stokes().unwrap();
        assert!(problem.summary().max_velocity > 0.0, "step 0 solve must see the body force");
    }

    #[test]
    fn test_constant_viscosity_assembles_once() {
        let dims = Dims::new(6, 6);
        let mut params = ProblemParams::buoyant_box(dims);
        params.end_step = 3;
        let mut problem = Problem::new(params, dims);
        problem.initialize().unwrap();
        loop {
            problem.solve_stokes().unwrap();
            problem.update_forcing_terms();
            problem.recalculate_timestep();
            problem.solve_advection_diffusion().unwrap();
            if !problem.advance_timestep() {
                break;
            }
        }
        assert_eq!(problem.stokes_assemblies(), 1);
        assert!(problem.clock().step() <= 3);
        assert!(problem.diffusion_factorizations() >= 1);
    }

    #[test]
    fn test_buoyant_box_stays_bounded() {
        let dims = Dims::new(8, 8);
        let mut problem = Problem::new(ProblemParams::buoyant_box(dims), dims);
        problem.initialize().unwrap();
        for _ in 0..5 {
            problem.solve_stokes().unwrap();
            problem.update_forcing_terms();
            problem.recalculate_timestep();
            problem.solve_advection_diffusion().unwrap();
            problem.advance_timestep();
        }
        for &t in problem.grid().temperature().as_slice() {
            assert!(t.is_finite(), "temperature must stay finite");
            assert!((272.0..276.0).contains(&t), "temperature {} drifted out of range", t);
        }
    }

    #[test]
    fn test_from_params_rejects_unknown_model() {
        let tree = parse_params(
            "enter geometryParams\n set M=4\n set N=4\nleave\n\
             enter problemParams\n set cfl=0.5\n set startTime=0\n set xExtent=1\n set diffusivity=1\n \
             set forcingModel=magnetic\n\
             enter temperatureBoundaryParams\n set upperBoundaryTemperature=0\n set lowerBoundaryTemperature=1\nleave\n\
             leave\n",
        )
        .unwrap();
        match Problem::from_params(&tree) {
            Err(SimError::InvalidModelSelection { family, name }) => {
                assert_eq!(family, ModelFamily::Forcing);
                assert_eq!(name, "magnetic");
            }
            Err(other) => panic!("unexpected error {}", other),
            Ok(_) => panic!("unknown forcing model must be rejected"),
        }
    }

    #[test]
    fn test_demo_parameter_files() {
        let tau = crate::config::from_yaml_str(include_str!("../../demos/tauBenchmark.yaml")).unwrap();
        let problem = Problem::from_params(&tau).unwrap();
        assert_eq!(problem.grid().dims(), Dims::new(32, 32));
        assert_eq!(problem.params().viscosity_model, ViscosityModel::TauBenchmark);
        assert_eq!(problem.params().output.path, std::path::PathBuf::from("output/tau"));

        let buoyancy = crate::config::from_yaml_str(include_str!("../../demos/buoyancy.yaml")).unwrap();
        let params = Problem::from_params(&buoyancy).unwrap().params().clone();
        assert_eq!(params.advection_method, AdvectionMethod::Fromm);
        assert_eq!(params.diffusion_method, DiffusionMethod::CrankNicolson);
        assert_eq!(params.buoyancy.density_constant, 1000.0);
        assert!((params.x_extent - 2.0).abs() < 1e-12, "x extent follows from yExtent and N/M");

        let sol_cx = parse_params(include_str!("../../demos/solCX.prm")).unwrap();
        let params = Problem::from_params(&sol_cx).unwrap().params().clone();
        assert_eq!(params.forcing_model, ForcingModel::SolCxBenchmark);
        assert_eq!(params.output.format, OutputFormat::None);
    }

    #[test]
    fn test_sol_cx_solve_is_finite() {
        let tree = parse_params(include_str!("../../demos/solCX.prm")).unwrap();
        let mut problem = Problem::from_params(&tree).unwrap();
        problem.initialize().unwrap();
        problem.solve_stokes().unwrap();
        assert!(problem.grid().stokes_solution().iter().all(|x| x.is_finite()));
        assert!(problem.summary().max_velocity > 0.0, "solCX forcing must drive a flow");
    }

    #[test]
    fn test_from_params_reads_geometry() {
        let tree = parse_params(
            "enter geometryParams\n set M=3\n set N=5\nleave\n\
             enter problemParams\n set cfl=0.5\n set startTime=0\n set yExtent=1.5\n set diffusivity=1\n\
             enter temperatureBoundaryParams\n set upperBoundaryTemperature=0\n set lowerBoundaryTemperature=1\nleave\n\
             leave\n",
        )
        .unwrap();
        let problem = Problem::from_params(&tree).unwrap();
        assert_eq!(problem.grid().dims(), Dims::new(3, 5));
        assert!((problem.params().h - 0.5).abs() < 1e-15);
        assert_eq!(problem.clock().step(), 0);
    }
}
