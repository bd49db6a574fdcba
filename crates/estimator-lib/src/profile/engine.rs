//! Stochastic resource simulation
//!
//! Combines a project's baseline range with the ranges of its active
//! pipeline stages, draws a point estimate, then applies build-state
//! modifiers in a fixed order: cold cache, first build, clean build,
//! monorepo, release.

use super::table::{uniform, Interval, ProfileTable, ResourceRange, StageAddition, PROFILE_TABLE};
use crate::models::{BuildState, PipelineConfig, ProjectType, ResourceEstimate};
use rand::Rng;
use tracing::trace;

/// Time share each additional stage adds on top of the running ceiling
const STAGE_TIME_SHARE: f64 = 0.5;

const MAX_CPU_PCT: f64 = 100.0;

/// Computes simulated resource usage from the profile table
#[derive(Debug, Clone, Copy)]
pub struct ResourceProfileEngine<'t> {
    table: &'t ProfileTable,
}

impl Default for ResourceProfileEngine<'static> {
    fn default() -> Self {
        Self::new(&PROFILE_TABLE)
    }
}

impl<'t> ResourceProfileEngine<'t> {
    pub fn new(table: &'t ProfileTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'t ProfileTable {
        self.table
    }

    /// Stage additions enabled by the pipeline and defined by the profile,
    /// in application order
    pub fn active_additions(
        &self,
        project: ProjectType,
        pipeline: &PipelineConfig,
    ) -> Vec<(StageAddition, &'t ResourceRange)> {
        let profile = self.table.profile(project);
        StageAddition::ALL
            .into_iter()
            .filter(|stage| match stage {
                StageAddition::UnitTests => pipeline.has_unit_tests,
                StageAddition::Integration => pipeline.has_integration_tests,
                StageAddition::E2e => pipeline.has_e2e_tests,
                StageAddition::Emulator => pipeline.uses_emulator,
                StageAddition::Docker => pipeline.has_docker_build,
            })
            .filter_map(|stage| profile.addition(stage).map(|r| (stage, r)))
            .collect()
    }

    /// Resource envelope before sampling.
    ///
    /// Memory and CPU endpoints widen by elementwise max. The time floor
    /// widens by max while the ceiling grows by half of each stage's ceiling.
    pub fn envelope(&self, project: ProjectType, pipeline: &PipelineConfig) -> ResourceRange {
        let mut envelope = self.table.profile(project).base;
        for (_, addition) in self.active_additions(project, pipeline) {
            envelope.memory_gb = widen(envelope.memory_gb, addition.memory_gb);
            envelope.cpu_pct = widen(envelope.cpu_pct, addition.cpu_pct);
            envelope.time_min = Interval::new(
                envelope.time_min.min.max(addition.time_min.min),
                envelope.time_min.max + addition.time_min.max * STAGE_TIME_SHARE,
            );
        }
        envelope
    }

    /// Draw one resource estimate
    pub fn estimate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        project: ProjectType,
        pipeline: &PipelineConfig,
        state: &BuildState,
        is_release: bool,
    ) -> ResourceEstimate {
        let profile = self.table.profile(project);
        let envelope = self.envelope(project, pipeline);

        let mut memory = envelope.memory_gb.sample(rng);
        let mut cpu = envelope.cpu_pct.sample(rng);
        let mut time = envelope.time_min.sample(rng);

        if !state.cache_available {
            if let Some(no_cache) = profile.deps_no_cache.as_ref() {
                time = time.max(no_cache.time_min.sample(rng));
            }
            time *= uniform(rng, 1.5, 2.5);
        }

        if state.is_first_build {
            time *= uniform(rng, 1.3, 2.0);
            memory *= uniform(rng, 1.1, 1.3);
        }

        if state.is_clean_build {
            time *= uniform(rng, 1.5, 2.5);
            memory *= uniform(rng, 1.1, 1.2);
            cpu = (cpu * 1.1).min(MAX_CPU_PCT);
        }

        if state.is_monorepo {
            time *= uniform(rng, 1.2, 1.8);
            memory *= uniform(rng, 1.1, 1.4);
        }

        if is_release {
            if let Some(release) = profile.release.as_ref() {
                memory = memory.max(release.memory_gb.sample(rng));
                cpu = cpu.max(release.cpu_pct.sample(rng));
            }
            time *= uniform(rng, 1.3, 1.6);
            cpu = (cpu * 1.15).min(MAX_CPU_PCT);
        }

        trace!(project = %project, memory, cpu, time, "Simulated resource estimate");

        ResourceEstimate {
            cpu_pct: round_to(cpu, 1),
            memory_gb: round_to(memory, 2),
            time_min: round_to(time, 1),
        }
    }
}

fn widen(current: Interval, addition: Interval) -> Interval {
    Interval::new(current.min.max(addition.min), current.max.max(addition.max))
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
