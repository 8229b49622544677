// JSON snapshot writer and manifest.json, one file per output call.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::error::OutputError;
use crate::solver::{summarize, FieldSummary, OutputFormat, ProblemParams};
use crate::state::GridState;

const MANIFEST_VERSION: u32 = 1;
const FIELD_NAMES: [&str; 5] = ["u", "v", "pressure", "temperature", "viscosity"];

/// Destination for per-step field snapshots.
pub trait OutputSink {
    fn write(&mut self, step: i64, time: f64, grid: &GridState) -> Result<(), OutputError>;

    /// Called once after the final snapshot.
    fn finish(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Discards every snapshot.
#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write(&mut self, _step: i64, _time: f64, _grid: &GridState) -> Result<(), OutputError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridInfo {
    pub m: usize,
    pub n: usize,
    pub h: f64,
    pub x_extent: f64,
    pub y_extent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameEntry {
    pub step: i64,
    pub time: f64,
    pub file: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub version: u32,
    pub model: String,
    pub grid: GridInfo,
    pub fields: Vec<String>,
    pub params: serde_json::Value,
    pub frames: Vec<FrameEntry>,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    step: i64,
    time: f64,
    summary: FieldSummary,
    u: &'a [f64],
    v: &'a [f64],
    pressure: &'a [f64],
    temperature: &'a [f64],
    viscosity: &'a [f64],
}

/// Writes `frame_NNNNNN.json` per call and `manifest.json` on finish.
pub struct JsonSnapshotWriter {
    dir: PathBuf,
    manifest: Manifest,
}

impl JsonSnapshotWriter {
    pub fn create(dir: impl AsRef<Path>, params: &ProblemParams, grid: &GridState) -> Result<Self, OutputError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let dims = grid.dims();
        let manifest = Manifest {
            version: MANIFEST_VERSION,
            model: params.forcing_model.name().to_string(),
            grid: GridInfo {
                m: dims.m,
                n: dims.n,
                h: params.h,
                x_extent: params.x_extent,
                y_extent: params.y_extent,
            },
            fields: FIELD_NAMES.iter().map(|s| s.to_string()).collect(),
            params: serde_json::json!({
                "cfl": params.cfl,
                "diffusivity": params.diffusivity,
                "temperatureModel": params.temperature_model.name(),
                "viscosityModel": params.viscosity_model.name(),
                "boundaryModel": params.boundary_model.name(),
                "advectionMethod": params.advection_method.name(),
                "fluxLimiter": params.flux_limiter.name(),
                "diffusionMethod": params.diffusion_method.name(),
            }),
            frames: Vec::new(),
        };
        info!("writing snapshots to {}", dir.display());
        Ok(Self { dir, manifest })
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), OutputError> {
        let mut w = BufWriter::new(fs::File::create(self.dir.join(file))?);
        serde_json::to_writer(&mut w, value)?;
        w.flush()?;
        Ok(())
    }
}

impl OutputSink for JsonSnapshotWriter {
    fn write(&mut self, step: i64, time: f64, grid: &GridState) -> Result<(), OutputError> {
        let file = format!("frame_{:06}.json", self.manifest.frames.len());
        let snapshot = Snapshot {
            step,
            time,
            summary: summarize(grid, self.manifest.grid.h),
            u: grid.u_velocity().as_slice(),
            v: grid.v_velocity().as_slice(),
            pressure: grid.pressure().as_slice(),
            temperature: grid.temperature().as_slice(),
            viscosity: grid.viscosity().as_slice(),
        };
        self.write_json(&file, &snapshot)?;
        debug!("wrote {} (step {}, t = {})", file, step, time);
        self.manifest.frames.push(FrameEntry { step, time, file });
        Ok(())
    }

    fn finish(&mut self) -> Result<(), OutputError> {
        let mut w = BufWriter::new(fs::File::create(self.dir.join("manifest.json"))?);
        serde_json::to_writer_pretty(&mut w, &self.manifest)?;
        w.flush()?;
        info!("wrote manifest with {} frames", self.manifest.frames.len());
        Ok(())
    }
}

/// Sink selected by `outputParams.outputFormat`.
pub fn create_sink(params: &ProblemParams, grid: &GridState) -> Result<Box<dyn OutputSink>, OutputError> {
    match params.output.format {
        OutputFormat::Json => Ok(Box::new(JsonSnapshotWriter::create(&params.output.path, params, grid)?)),
        OutputFormat::None => Ok(Box::new(NullSink)),
    }
}
