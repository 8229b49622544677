use std::path::PathBuf;

use crate::config::ParamTree;
use crate::error::{ConfigError, ModelFamily, SimError};
use crate::state::Dims;

/// Sentinel used for "no limit" on time, step count and time-step size.
pub const UNBOUNDED: f64 = i32::MAX as f64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForcingModel {
    TauBenchmark,
    SolCxBenchmark,
    SolKzBenchmark,
    VorticalFlow,
    Buoyancy,
}

impl ForcingModel {
    pub fn from_name(name: &str) -> Result<Self, SimError> {
        match name {
            "tauBenchmark" => Ok(Self::TauBenchmark),
            "solCXBenchmark" => Ok(Self::SolCxBenchmark),
            "solKZBenchmark" => Ok(Self::SolKzBenchmark),
            "vorticalFlow" => Ok(Self::VorticalFlow),
            "buoyancy" => Ok(Self::Buoyancy),
            other => Err(SimError::invalid_model(ModelFamily::Forcing, other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TauBenchmark => "tauBenchmark",
            Self::SolCxBenchmark => "solCXBenchmark",
            Self::SolKzBenchmark => "solKZBenchmark",
            Self::VorticalFlow => "vorticalFlow",
            Self::Buoyancy => "buoyancy",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemperatureModel {
    Constant,
    SineWave,
    SquareWave,
    Circle,
}

impl TemperatureModel {
    pub fn from_name(name: &str) -> Result<Self, SimError> {
        match name {
            "constant" => Ok(Self::Constant),
            "sineWave" => Ok(Self::SineWave),
            "squareWave" => Ok(Self::SquareWave),
            "circle" => Ok(Self::Circle),
            other => Err(SimError::invalid_model(ModelFamily::Temperature, other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::SineWave => "sineWave",
            Self::SquareWave => "squareWave",
            Self::Circle => "circle",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViscosityModel {
    Constant,
    TauBenchmark,
    SolCxBenchmark,
    SolKzBenchmark,
}

impl ViscosityModel {
    pub fn from_name(name: &str) -> Result<Self, SimError> {
        match name {
            "constant" => Ok(Self::Constant),
            "tauBenchmark" => Ok(Self::TauBenchmark),
            "solCXBenchmark" => Ok(Self::SolCxBenchmark),
            "solKZBenchmark" => Ok(Self::SolKzBenchmark),
            other => Err(SimError::invalid_model(ModelFamily::Viscosity, other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::TauBenchmark => "tauBenchmark",
            Self::SolCxBenchmark => "solCXBenchmark",
            Self::SolKzBenchmark => "solKZBenchmark",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryModel {
    TauBenchmark,
    SolCxBenchmark,
    SolKzBenchmark,
    NoFlux,
}

impl BoundaryModel {
    pub fn from_name(name: &str) -> Result<Self, SimError> {
        match name {
            "tauBenchmark" => Ok(Self::TauBenchmark),
            "solCXBenchmark" => Ok(Self::SolCxBenchmark),
            "solKZBenchmark" => Ok(Self::SolKzBenchmark),
            "noFlux" => Ok(Self::NoFlux),
            other => Err(SimError::invalid_model(ModelFamily::Boundary, other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TauBenchmark => "tauBenchmark",
            Self::SolCxBenchmark => "solCXBenchmark",
            Self::SolKzBenchmark => "solKZBenchmark",
            Self::NoFlux => "noFlux",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdvectionMethod {
    Upwind,
    Fromm,
    None,
}

impl AdvectionMethod {
    pub fn from_name(name: &str) -> Result<Self, SimError> {
        match name {
            "upwindMethod" => Ok(Self::Upwind),
            "frommMethod" => Ok(Self::Fromm),
            "none" => Ok(Self::None),
            other => Err(SimError::invalid_model(ModelFamily::Advection, other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Upwind => "upwindMethod",
            Self::Fromm => "frommMethod",
            Self::None => "none",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FluxLimiter {
    VanLeer,
    Minmod,
    Superbee,
    MonotonizedCentral,
    Unlimited,
}

impl FluxLimiter {
    pub fn from_name(name: &str) -> Result<Self, SimError> {
        match name {
            "vanLeer" => Ok(Self::VanLeer),
            "minmod" => Ok(Self::Minmod),
            "superbee" => Ok(Self::Superbee),
            "monotonizedCentral" => Ok(Self::MonotonizedCentral),
            "unlimited" => Ok(Self::Unlimited),
            other => Err(SimError::invalid_model(ModelFamily::FluxLimiter, other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::VanLeer => "vanLeer",
            Self::Minmod => "minmod",
            Self::Superbee => "superbee",
            Self::MonotonizedCentral => "monotonizedCentral",
            Self::Unlimited => "unlimited",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiffusionMethod {
    ForwardEuler,
    BackwardEuler,
    CrankNicolson,
    None,
}

impl DiffusionMethod {
    pub fn from_name(name: &str) -> Result<Self, SimError> {
        match name {
            "forwardEuler" => Ok(Self::ForwardEuler),
            "backwardEuler" => Ok(Self::BackwardEuler),
            "crankNicolson" => Ok(Self::CrankNicolson),
            "none" => Ok(Self::None),
            other => Err(SimError::invalid_model(ModelFamily::Diffusion, other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ForwardEuler => "forwardEuler",
            Self::BackwardEuler => "backwardEuler",
            Self::CrankNicolson => "crankNicolson",
            Self::None => "none",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    None,
}

/// Disc used by the `circle` temperature model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleParams {
    pub radius: f64,
    pub x_center: f64,
    pub y_center: f64,
}

/// `problemParams.initialTemperatureParams`
#[derive(Clone, Debug, PartialEq)]
pub struct InitialTemperatureParams {
    pub reference_temperature: f64,
    pub temperature_scale: f64,
    pub x_modes: i32,
    pub y_modes: i32,
    /// Present only for the `circle` model.
    pub circle: Option<CircleParams>,
}

impl Default for InitialTemperatureParams {
    fn default() -> Self {
        Self {
            reference_temperature: 273.15,
            temperature_scale: 100.0,
            x_modes: 2,
            y_modes: 2,
            circle: None,
        }
    }
}

/// `problemParams.temperatureBoundaryParams`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemperatureBoundaryParams {
    pub upper: f64,
    pub lower: f64,
}

/// `problemParams.buoyancyModelParams`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuoyancyParams {
    pub reference_temperature: f64,
    pub density_constant: f64,
    pub thermal_expansion: f64,
}

impl Default for BuoyancyParams {
    fn default() -> Self {
        Self {
            reference_temperature: 273.15,
            density_constant: 100.0,
            thermal_expansion: 1.0,
        }
    }
}

/// `outputParams`
#[derive(Clone, Debug, PartialEq)]
pub struct OutputParams {
    pub format: OutputFormat,
    pub path: PathBuf,
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            path: PathBuf::from("output"),
        }
    }
}

/// Immutable configuration snapshot, read once before the run.
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemParams {
    pub cfl: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub end_step: i64,
    pub diffusivity: f64,
    /// Grid spacing, identical in x and y.
    pub h: f64,
    pub x_extent: f64,
    pub y_extent: f64,
    pub forcing_model: ForcingModel,
    pub temperature_model: TemperatureModel,
    pub viscosity_model: ViscosityModel,
    pub boundary_model: BoundaryModel,
    pub advection_method: AdvectionMethod,
    pub flux_limiter: FluxLimiter,
    pub diffusion_method: DiffusionMethod,
    pub initial_temperature: InitialTemperatureParams,
    pub temperature_boundary: TemperatureBoundaryParams,
    pub buoyancy: BuoyancyParams,
    pub viscosity_scale: f64,
    pub output: OutputParams,
}

/// Spacing and both extents from whichever extent is nonzero.
fn resolve_extents(dims: Dims, x_extent: f64, y_extent: f64) -> Result<(f64, f64, f64), ConfigError> {
    match (x_extent != 0.0, y_extent != 0.0) {
        (true, false) => {
            let h = x_extent / dims.n as f64;
            Ok((h, x_extent, h * dims.m as f64))
        }
        (false, true) => {
            let h = y_extent / dims.m as f64;
            Ok((h, h * dims.n as f64, y_extent))
        }
        _ => Err(ConfigError::InvalidValue {
            key: "xExtent/yExtent".to_string(),
            value: format!("{}/{}", x_extent, y_extent),
            reason: "exactly one of xExtent and yExtent must be nonzero".to_string(),
        }),
    }
}

impl ProblemParams {
    /// Read `problemParams` (required) and `outputParams` (optional).
    pub fn from_params(tree: &ParamTree, dims: Dims) -> Result<Self, SimError> {
        let problem = tree.section("problemParams")?;

        let cfl: f64 = problem.get("cfl")?;
        let start_time: f64 = problem.get("startTime")?;
        let end_time: f64 = problem.query("endTime", UNBOUNDED)?;
        let end_step: i64 = problem.query("endStep", i32::MAX as i64)?;
        let x_extent: f64 = problem.query("xExtent", 0.0)?;
        let y_extent: f64 = problem.query("yExtent", 0.0)?;
        let (h, x_extent, y_extent) = resolve_extents(dims, x_extent, y_extent)?;
        let diffusivity: f64 = problem.get("diffusivity")?;

        let forcing_model =
            ForcingModel::from_name(&problem.query("forcingModel", "tauBenchmark".to_string())?)?;
        let temperature_model =
            TemperatureModel::from_name(&problem.query("temperatureModel", "constant".to_string())?)?;
        let viscosity_model =
            ViscosityModel::from_name(&problem.query("viscosityModel", "constant".to_string())?)?;
        let boundary_model =
            BoundaryModel::from_name(&problem.query("boundaryModel", "tauBenchmark".to_string())?)?;
        let advection_method =
            AdvectionMethod::from_name(&problem.query("advectionMethod", "upwindMethod".to_string())?)?;
        let flux_limiter = match problem.try_section("advectionParams") {
            Some(section) => FluxLimiter::from_name(&section.query("fluxLimiter", "vanLeer".to_string())?)?,
            None => FluxLimiter::VanLeer,
        };
        let diffusion_method =
            DiffusionMethod::from_name(&problem.query("diffusionMethod", "backwardEuler".to_string())?)?;

        let mut initial_temperature = InitialTemperatureParams::default();
        if let Some(section) = problem.try_section("initialTemperatureParams") {
            let defaults = InitialTemperatureParams::default();
            initial_temperature.reference_temperature =
                section.query("referenceTemperature", defaults.reference_temperature)?;
            initial_temperature.temperature_scale = section.query("temperatureScale", defaults.temperature_scale)?;
            initial_temperature.x_modes = section.query("xModes", defaults.x_modes)?;
            initial_temperature.y_modes = section.query("yModes", defaults.y_modes)?;
        }
        if temperature_model == TemperatureModel::Circle {
            let section = problem.section("initialTemperatureParams")?;
            initial_temperature.circle = Some(CircleParams {
                radius: section.get("radius")?,
                x_center: section.get("xCenter")?,
                y_center: section.get("yCenter")?,
            });
        }

        let boundary = problem.section("temperatureBoundaryParams")?;
        let temperature_boundary = TemperatureBoundaryParams {
            upper: boundary.get("upperBoundaryTemperature")?,
            lower: boundary.get("lowerBoundaryTemperature")?,
        };

        let mut buoyancy = BuoyancyParams::default();
        if let Some(section) = problem.try_section("buoyancyModelParams") {
            buoyancy.reference_temperature = section.query("referenceTemperature", buoyancy.reference_temperature)?;
            buoyancy.density_constant = section.query("densityConstant", buoyancy.density_constant)?;
            buoyancy.thermal_expansion = section.query("thermalExpansion", buoyancy.thermal_expansion)?;
        }

        let viscosity_scale = match problem.try_section("initialViscosity") {
            Some(section) => section.query("viscosityScale", 1.0)?,
            None => 1.0,
        };

        let mut output = OutputParams::default();
        if let Some(section) = tree.try_section("outputParams") {
            output.format = match section.query("outputFormat", "json".to_string())?.as_str() {
                "json" => OutputFormat::Json,
                "none" => OutputFormat::None,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "outputFormat".to_string(),
                        value: other.to_string(),
                        reason: "expected 'json' or 'none'".to_string(),
                    }
                    .into())
                }
            };
            output.path = PathBuf::from(section.query("outputPath", "output".to_string())?);
        }

        Ok(Self {
            cfl,
            start_time,
            end_time,
            end_step,
            diffusivity,
            h,
            x_extent,
            y_extent,
            forcing_model,
            temperature_model,
            viscosity_model,
            boundary_model,
            advection_method,
            flux_limiter,
            diffusion_method,
            initial_temperature,
            temperature_boundary,
            buoyancy,
            viscosity_scale,
            output,
        })
    }

    /// Tau benchmark on `[0, π]` in x: analytic forcing and walls, unit
    /// viscosity, no transport.
    pub fn tau_benchmark(dims: Dims) -> Self {
        let x_extent = std::f64::consts::PI;
        let h = x_extent / dims.n as f64;
        Self {
            cfl: 0.5,
            start_time: 0.0,
            end_time: UNBOUNDED,
            end_step: 1,
            diffusivity: 1.0,
            h,
            x_extent,
            y_extent: h * dims.m as f64,
            forcing_model: ForcingModel::TauBenchmark,
            temperature_model: TemperatureModel::Constant,
            viscosity_model: ViscosityModel::TauBenchmark,
            boundary_model: BoundaryModel::TauBenchmark,
            advection_method: AdvectionMethod::None,
            flux_limiter: FluxLimiter::VanLeer,
            diffusion_method: DiffusionMethod::None,
            initial_temperature: InitialTemperatureParams::default(),
            temperature_boundary: TemperatureBoundaryParams {
                upper: 273.15,
                lower: 273.15,
            },
            buoyancy: BuoyancyParams::default(),
            viscosity_scale: 1.0,
            output: OutputParams {
                format: OutputFormat::None,
                ..OutputParams::default()
            },
        }
    }

    /// Unit-square box heated from below with closed walls and buoyancy forcing.
    pub fn buoyant_box(dims: Dims) -> Self {
        let y_extent = 1.0;
        let h = y_extent / dims.m as f64;
        Self {
            cfl: 0.5,
            start_time: 0.0,
            end_time: 1.0,
            end_step: 10,
            diffusivity: 1.0,
            h,
            x_extent: h * dims.n as f64,
            y_extent,
            forcing_model: ForcingModel::Buoyancy,
            temperature_model: TemperatureModel::SineWave,
            viscosity_model: ViscosityModel::Constant,
            boundary_model: BoundaryModel::NoFlux,
            advection_method: AdvectionMethod::Upwind,
            flux_limiter: FluxLimiter::VanLeer,
            diffusion_method: DiffusionMethod::BackwardEuler,
            initial_temperature: InitialTemperatureParams {
                temperature_scale: 1.0,
                x_modes: 1,
                y_modes: 1,
                ..InitialTemperatureParams::default()
            },
            temperature_boundary: TemperatureBoundaryParams {
                upper: 273.15,
                lower: 274.15,
            },
            buoyancy: BuoyancyParams::default(),
            viscosity_scale: 1.0,
            output: OutputParams {
                format: OutputFormat::None,
                ..OutputParams::default()
            },
        }
    }
}
