use log::{debug, info, warn};

use crate::error::SimError;
use crate::output::OutputSink;
use crate::solver::{FieldSummary, Problem};

/// What a finished run reports back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: i64,
    pub time: f64,
    pub snapshots: usize,
    pub stokes_assemblies: usize,
    pub diffusion_factorizations: usize,
    pub fields: FieldSummary,
}

fn emit(sink: &mut dyn OutputSink, problem: &Problem, written: &mut usize) {
    let clock = problem.clock();
    match sink.write(clock.step(), clock.time(), problem.grid()) {
        Ok(()) => *written += 1,
        Err(e) => warn!("snapshot for step {} not written: {}", clock.step(), e),
    }
}

/// Run an initialized problem to its end time or end step.
///
/// Each step solves Stokes, refreshes the forcing, picks the next step size,
/// emits a snapshot and then advances the temperature. The flow is solved
/// once more after the last step so the final snapshot is consistent.
pub fn run(problem: &mut Problem, sink: &mut dyn OutputSink) -> Result<RunSummary, SimError> {
    let mut written = 0;
    loop {
        problem.solve_stokes()?;
        problem.update_forcing_terms();
        problem.recalculate_timestep();
        emit(sink, problem, &mut written);
        problem.solve_advection_diffusion()?;

        let clock = problem.clock();
        info!("timestep {}: t={}", clock.step(), clock.time());
        debug!("{:?}", problem.summary());
        if !problem.advance_timestep() {
            break;
        }
    }

    problem.solve_stokes()?;
    problem.update_forcing_terms();
    emit(sink, problem, &mut written);
    if let Err(e) = sink.finish() {
        warn!("output not finalized: {}", e);
    }

    let clock = problem.clock();
    let summary = RunSummary {
        steps: clock.step(),
        time: clock.time(),
        snapshots: written,
        stokes_assemblies: problem.stokes_assemblies(),
        diffusion_factorizations: problem.diffusion_factorizations(),
        fields: problem.summary(),
    };
    info!(
        "run finished after {} steps at t={} ({} snapshots, {} Stokes assemblies, {} diffusion factorizations)",
        summary.steps,
        summary.time,
        summary.snapshots,
        summary.stokes_assemblies,
        summary.diffusion_factorizations
    );
    Ok(summary)
}
