//! Static resource profiles per project type
//!
//! Baseline ranges plus optional per-stage additions for memory (GB),
//! CPU (%) and build time (minutes), and the probability that each
//! optional pipeline stage occurs for a project type.

use crate::models::ProjectType;
use rand::Rng;
use serde::Serialize;

/// Closed interval `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Uniform draw from the interval
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        uniform(rng, self.min, self.max)
    }
}

/// Uniform draw from `[low, high]`
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    low + (high - low) * rng.gen::<f64>()
}

/// Memory, CPU and time ranges for one profile entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceRange {
    pub memory_gb: Interval,
    pub cpu_pct: Interval,
    pub time_min: Interval,
}

const fn range(memory_gb: (f64, f64), cpu_pct: (f64, f64), time_min: (f64, f64)) -> ResourceRange {
    ResourceRange {
        memory_gb: Interval::new(memory_gb.0, memory_gb.1),
        cpu_pct: Interval::new(cpu_pct.0, cpu_pct.1),
        time_min: Interval::new(time_min.0, time_min.1),
    }
}

/// Optional pipeline stages that widen the resource envelope.
///
/// Declaration order is the order additions are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageAddition {
    UnitTests,
    Integration,
    E2e,
    Emulator,
    Docker,
}

impl StageAddition {
    pub const ALL: [StageAddition; 5] = [
        StageAddition::UnitTests,
        StageAddition::Integration,
        StageAddition::E2e,
        StageAddition::Emulator,
        StageAddition::Docker,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StageAddition::UnitTests => "unit_tests",
            StageAddition::Integration => "integration",
            StageAddition::E2e => "e2e",
            StageAddition::Emulator => "emulator",
            StageAddition::Docker => "docker",
        }
    }
}

/// Resource profile of one project type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceProfile {
    pub base: ResourceRange,
    pub unit_tests: Option<ResourceRange>,
    pub integration: Option<ResourceRange>,
    pub e2e: Option<ResourceRange>,
    pub emulator: Option<ResourceRange>,
    pub docker: Option<ResourceRange>,
    /// Dependency install time floor when the cache is cold
    pub deps_no_cache: Option<ResourceRange>,
    /// Floor for memory and CPU of optimized release builds
    pub release: Option<ResourceRange>,
}

impl ResourceProfile {
    pub fn addition(&self, stage: StageAddition) -> Option<&ResourceRange> {
        match stage {
            StageAddition::UnitTests => self.unit_tests.as_ref(),
            StageAddition::Integration => self.integration.as_ref(),
            StageAddition::E2e => self.e2e.as_ref(),
            StageAddition::Emulator => self.emulator.as_ref(),
            StageAddition::Docker => self.docker.as_ref(),
        }
    }

    /// All defined ranges, labelled, in display order
    pub fn entries(&self) -> Vec<(&'static str, &ResourceRange)> {
        let mut entries = vec![("base", &self.base)];
        for stage in StageAddition::ALL {
            if let Some(r) = self.addition(stage) {
                entries.push((stage.name(), r));
            }
        }
        if let Some(r) = self.deps_no_cache.as_ref() {
            entries.push(("deps_no_cache", r));
        }
        if let Some(r) = self.release.as_ref() {
            entries.push(("release", r));
        }
        entries
    }
}

/// Probability that each optional stage occurs in a project's pipeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageProbabilities {
    pub unit_tests: f64,
    pub integration_tests: f64,
    pub e2e_tests: f64,
    pub docker_build: f64,
    pub emulator: f64,
}

/// Process-wide, read-only profile configuration
#[derive(Debug)]
pub struct ProfileTable {
    profiles: [ResourceProfile; 6],
    stage_probabilities: [StageProbabilities; 6],
}

impl ProfileTable {
    pub fn profile(&self, project: ProjectType) -> &ResourceProfile {
        &self.profiles[project.code() as usize]
    }

    pub fn stage_probabilities(&self, project: ProjectType) -> &StageProbabilities {
        &self.stage_probabilities[project.code() as usize]
    }
}

/// Indexed by [`ProjectType::code`]
pub static PROFILE_TABLE: ProfileTable = ProfileTable {
    profiles: [
        // python
        ResourceProfile {
            base: range((0.5, 2.0), (15.0, 40.0), (2.0, 8.0)),
            unit_tests: Some(range((1.0, 3.0), (30.0, 60.0), (3.0, 12.0))),
            integration: Some(range((2.0, 5.0), (40.0, 75.0), (8.0, 25.0))),
            e2e: None,
            emulator: None,
            docker: Some(range((3.0, 6.0), (50.0, 80.0), (10.0, 30.0))),
            deps_no_cache: Some(range((2.0, 4.0), (25.0, 50.0), (5.0, 30.0))),
            release: None,
        },
        // java
        ResourceProfile {
            base: range((2.0, 4.0), (40.0, 70.0), (5.0, 15.0)),
            unit_tests: Some(range((3.0, 6.0), (50.0, 80.0), (10.0, 25.0))),
            integration: Some(range((4.0, 8.0), (60.0, 90.0), (15.0, 45.0))),
            e2e: None,
            emulator: None,
            docker: Some(range((4.0, 8.0), (55.0, 85.0), (15.0, 35.0))),
            deps_no_cache: Some(range((3.0, 5.0), (45.0, 65.0), (8.0, 25.0))),
            release: None,
        },
        // nodejs
        ResourceProfile {
            base: range((1.0, 3.0), (20.0, 50.0), (1.0, 5.0)),
            unit_tests: Some(range((1.5, 4.0), (30.0, 65.0), (3.0, 10.0))),
            integration: Some(range((2.0, 5.0), (40.0, 75.0), (5.0, 20.0))),
            e2e: Some(range((4.0, 8.0), (60.0, 85.0), (15.0, 40.0))),
            emulator: None,
            docker: Some(range((2.0, 5.0), (45.0, 75.0), (5.0, 20.0))),
            deps_no_cache: Some(range((2.0, 4.0), (30.0, 55.0), (3.0, 25.0))),
            release: None,
        },
        // react-native
        ResourceProfile {
            base: range((4.0, 8.0), (50.0, 80.0), (10.0, 25.0)),
            unit_tests: Some(range((5.0, 10.0), (55.0, 85.0), (15.0, 35.0))),
            integration: Some(range((6.0, 12.0), (60.0, 90.0), (20.0, 50.0))),
            e2e: Some(range((8.0, 16.0), (70.0, 95.0), (30.0, 90.0))),
            emulator: Some(range((10.0, 18.0), (75.0, 95.0), (40.0, 100.0))),
            docker: None,
            deps_no_cache: None,
            release: Some(range((8.0, 14.0), (65.0, 90.0), (25.0, 50.0))),
        },
        // android
        ResourceProfile {
            base: range((4.0, 8.0), (55.0, 85.0), (8.0, 20.0)),
            unit_tests: Some(range((5.0, 10.0), (60.0, 88.0), (12.0, 30.0))),
            integration: Some(range((6.0, 12.0), (65.0, 92.0), (18.0, 45.0))),
            e2e: Some(range((10.0, 20.0), (75.0, 98.0), (35.0, 90.0))),
            emulator: Some(range((12.0, 24.0), (80.0, 98.0), (45.0, 120.0))),
            docker: None,
            deps_no_cache: None,
            release: Some(range((8.0, 16.0), (70.0, 95.0), (20.0, 40.0))),
        },
        // ios
        ResourceProfile {
            base: range((4.0, 10.0), (50.0, 80.0), (10.0, 30.0)),
            unit_tests: Some(range((5.0, 12.0), (55.0, 85.0), (15.0, 40.0))),
            integration: Some(range((6.0, 14.0), (60.0, 90.0), (20.0, 55.0))),
            e2e: Some(range((8.0, 18.0), (70.0, 95.0), (30.0, 80.0))),
            emulator: None,
            docker: None,
            deps_no_cache: None,
            release: Some(range((8.0, 16.0), (65.0, 90.0), (20.0, 45.0))),
        },
    ],
    stage_probabilities: [
        // python
        StageProbabilities {
            unit_tests: 0.85,
            integration_tests: 0.45,
            e2e_tests: 0.10,
            docker_build: 0.35,
            emulator: 0.0,
        },
        // java
        StageProbabilities {
            unit_tests: 0.90,
            integration_tests: 0.55,
            e2e_tests: 0.15,
            docker_build: 0.40,
            emulator: 0.0,
        },
        // nodejs
        StageProbabilities {
            unit_tests: 0.80,
            integration_tests: 0.40,
            e2e_tests: 0.25,
            docker_build: 0.30,
            emulator: 0.0,
        },
        // react-native
        StageProbabilities {
            unit_tests: 0.75,
            integration_tests: 0.35,
            e2e_tests: 0.45,
            docker_build: 0.15,
            emulator: 0.55,
        },
        // android
        StageProbabilities {
            unit_tests: 0.85,
            integration_tests: 0.45,
            e2e_tests: 0.50,
            docker_build: 0.10,
            emulator: 0.60,
        },
        // ios (simulator)
        StageProbabilities {
            unit_tests: 0.80,
            integration_tests: 0.40,
            e2e_tests: 0.40,
            docker_build: 0.0,
            emulator: 0.50,
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_all_intervals_ordered() {
        for project in ProjectType::ALL {
            for (name, r) in PROFILE_TABLE.profile(project).entries() {
                for interval in [r.memory_gb, r.cpu_pct, r.time_min] {
                    assert!(
                        interval.min <= interval.max,
                        "{} {} has min > max",
                        project,
                        name
                    );
                }
            }
        }
    }

    #[test]
    fn test_probabilities_in_unit_range() {
        for project in ProjectType::ALL {
            let p = PROFILE_TABLE.stage_probabilities(project);
            for v in [p.unit_tests, p.integration_tests, p.e2e_tests, p.docker_build, p.emulator] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_profile_lookup_by_project() {
        let android = PROFILE_TABLE.profile(ProjectType::Android);
        assert_eq!(android.base.memory_gb, Interval::new(4.0, 8.0));
        assert!(android.emulator.is_some());
        assert!(android.docker.is_none());

        let python = PROFILE_TABLE.profile(ProjectType::Python);
        assert!(python.e2e.is_none());
        assert!(python.deps_no_cache.is_some());
    }

    #[test]
    fn test_sample_within_interval() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let interval = Interval::new(2.0, 8.0);
        for _ in 0..1000 {
            assert!(interval.contains(interval.sample(&mut rng)));
        }
        let point = Interval::new(3.0, 3.0);
        assert_eq!(point.sample(&mut rng), 3.0);
    }
}
