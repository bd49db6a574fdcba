//! Synthetic training data generation
//!
//! Samples plausible build configurations, labels each one with the
//! resource profile engine and projects it onto the feature schema.

use super::record::SyntheticRecord;
use super::tables::{self, GitProfile};
use crate::error::{EstimatorError, Result};
use crate::models::{
    BranchType, BuildState, BuildType, Environment, PipelineConfig, ProjectType,
};
use crate::profile::{round_to, uniform, ResourceProfileEngine};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Default number of records per dataset
pub const DEFAULT_RECORDS: usize = 1000;

/// Default generator seed
pub const DEFAULT_SEED: u64 = 42;

/// Configuration for dataset generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of records to generate
    pub records: usize,
    /// Seed for the generator's random source
    pub seed: u64,
    /// Day of the first synthetic build
    pub start_date: NaiveDate,
    /// Records sharing one calendar day
    pub records_per_day: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            records: DEFAULT_RECORDS,
            seed: DEFAULT_SEED,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid calendar date"),
            records_per_day: 50,
        }
    }
}

/// Empirical distribution of build outcomes
#[derive(Debug, Clone)]
pub struct StatusDistribution {
    labels: Vec<String>,
    weights: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl StatusDistribution {
    pub fn new(entries: Vec<(String, f64)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(EstimatorError::input("status distribution is empty"));
        }
        let (labels, weights): (Vec<String>, Vec<f64>) = entries.into_iter().unzip();
        let index = WeightedIndex::new(&weights)
            .map_err(|e| EstimatorError::input(format!("invalid status weights: {}", e)))?;
        Ok(Self {
            labels,
            weights,
            index,
        })
    }

    /// Parse `success=0.9,failed=0.1`
    pub fn parse(weights: &str) -> Result<Self> {
        let entries = weights
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (label, weight) = part.split_once('=').ok_or_else(|| {
                    EstimatorError::input(format!("expected name=weight, got '{}'", part))
                })?;
                let weight: f64 = weight.trim().parse().map_err(|_| {
                    EstimatorError::input(format!("invalid weight for '{}': '{}'", label, weight))
                })?;
                Ok((label.trim().to_string(), weight))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(entries)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels.iter().map(String::as_str).zip(self.weights.iter().copied())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.labels[self.index.sample(rng)]
    }
}

impl Default for StatusDistribution {
    fn default() -> Self {
        let labels = vec!["success".to_string(), "failed".to_string()];
        let weights = vec![0.88, 0.12];
        let index = WeightedIndex::new(&weights).expect("static status weights are valid");
        Self {
            labels,
            weights,
            index,
        }
    }
}

/// Weighted samplers over the static categorical tables
#[derive(Debug, Clone)]
struct CategorySamplers {
    project: WeightedIndex<f64>,
    branch: WeightedIndex<f64>,
    environment: WeightedIndex<f64>,
    hour: WeightedIndex<f64>,
}

impl CategorySamplers {
    fn new() -> Result<Self> {
        let weighted = |weights: &[f64]| {
            WeightedIndex::new(weights)
                .map_err(|e| EstimatorError::input(format!("invalid sampling weights: {}", e)))
        };
        Ok(Self {
            project: weighted(&tables::PROJECT_TYPE_WEIGHTS)?,
            branch: weighted(&tables::BRANCH_TYPE_WEIGHTS)?,
            environment: weighted(&tables::ENVIRONMENT_WEIGHTS)?,
            hour: weighted(&tables::HOUR_WEIGHTS)?,
        })
    }
}

/// Git change metrics of one synthetic commit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GitMetrics {
    pub files_changed: i64,
    pub lines_added: i64,
    pub lines_deleted: i64,
    pub source_files_pct: f64,
    pub deps_file_changed: bool,
    pub dependency_count: i64,
    pub test_files_changed: i64,
}

/// Generates labelled synthetic build records
pub struct DatasetGenerator<'t> {
    config: GeneratorConfig,
    engine: ResourceProfileEngine<'t>,
    statuses: StatusDistribution,
    samplers: CategorySamplers,
    rng: ChaCha8Rng,
}

impl DatasetGenerator<'static> {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        Self::with_engine(config, ResourceProfileEngine::default())
    }
}

impl<'t> DatasetGenerator<'t> {
    pub fn with_engine(config: GeneratorConfig, engine: ResourceProfileEngine<'t>) -> Result<Self> {
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            engine,
            statuses: StatusDistribution::default(),
            samplers: CategorySamplers::new()?,
        })
    }

    pub fn with_status_distribution(mut self, statuses: StatusDistribution) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the configured number of records, ids starting at 1
    pub fn generate(&mut self) -> Vec<SyntheticRecord> {
        info!(
            records = self.config.records,
            seed = self.config.seed,
            "Generating synthetic dataset"
        );
        let start = self.config.start_date.and_time(NaiveTime::MIN);
        let per_day = self.config.records_per_day.max(1);
        let records: Vec<_> = (0..self.config.records)
            .map(|i| {
                let day = start + Duration::days((i / per_day) as i64);
                let record = self.generate_record(i + 1, day);
                if (i + 1) % 200 == 0 {
                    debug!(generated = i + 1, total = self.config.records, "Generation progress");
                }
                record
            })
            .collect();
        records
    }

    /// Generate one record for the given day
    pub fn generate_record(&mut self, record_id: usize, day: NaiveDateTime) -> SyntheticRecord {
        let project = ProjectType::ALL[self.samplers.project.sample(&mut self.rng)];
        let branch_type = BranchType::ALL[self.samplers.branch.sample(&mut self.rng)];
        let branch = branch_name(&mut self.rng, branch_type);
        let is_release = matches!(branch_type, BranchType::Release | BranchType::Main);

        let environment = Environment::ALL[self.samplers.environment.sample(&mut self.rng)];
        let build_type =
            if is_release || self.rng.gen_bool(tables::BUILD_TYPE_RELEASE_PROBABILITY) {
                BuildType::Release
            } else {
                BuildType::Debug
            };
        let is_release_build = build_type == BuildType::Release;

        let repo_size_mb = tables::repo_size_mb(project).sample(&mut self.rng);
        let is_monorepo = self
            .rng
            .gen_bool(tables::monorepo_probability(repo_size_mb));

        let pipeline = self.pipeline_config(project, is_release);

        let has_artifact_publish = if is_release_build {
            self.rng.gen_bool(0.75)
        } else if pipeline.has_deploy_stage {
            self.rng.gen_bool(0.40)
        } else {
            false
        };

        let is_first_build = self.rng.gen_bool(tables::FIRST_BUILD_PROBABILITY);
        let cache_available =
            !is_first_build && self.rng.gen_bool(tables::CACHE_HIT_PROBABILITY);
        let is_clean_build = self
            .rng
            .gen_bool(tables::clean_build_probability(is_release_build));

        let is_small_change = self.rng.gen_bool(tables::SMALL_CHANGE_PROBABILITY);
        let git = git_metrics(&mut self.rng, project, is_small_change, pipeline.has_tests());

        let state = BuildState {
            cache_available,
            is_first_build,
            is_clean_build,
            is_monorepo,
        };
        let resources =
            self.engine
                .estimate(&mut self.rng, project, &pipeline, &state, is_release_build);

        let status = self.statuses.sample(&mut self.rng).to_string();

        let hour = self.samplers.hour.sample(&mut self.rng) as i64;
        let minute = self.rng.gen_range(0..60);
        let timestamp = day + Duration::hours(hour) + Duration::minutes(minute);

        let pipeline_digest = random_digest(&mut self.rng);
        let commit_digest = random_digest(&mut self.rng);

        SyntheticRecord {
            build_id: format!("build-{:04}", record_id),
            timestamp: timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            pipeline_id: format!("pipe-{}", &pipeline_digest[..5]),
            commit_id: commit_digest[..40].to_string(),
            project_type: project.code(),
            project_type_name: project.name().to_string(),
            repo_size_mb: round_to(repo_size_mb, 1),
            is_monorepo: i64::from(is_monorepo),
            branch,
            branch_type: branch_type.code(),
            build_type: build_type.code(),
            environment: environment.code(),
            files_changed: git.files_changed,
            lines_added: git.lines_added,
            lines_deleted: git.lines_deleted,
            source_files_pct: git.source_files_pct,
            deps_file_changed: i64::from(git.deps_file_changed),
            dependency_count: git.dependency_count,
            test_files_changed: git.test_files_changed,
            has_build_stage: i64::from(pipeline.has_build_stage),
            has_unit_tests: i64::from(pipeline.has_unit_tests),
            has_integration_tests: i64::from(pipeline.has_integration_tests),
            has_e2e_tests: i64::from(pipeline.has_e2e_tests),
            has_deploy_stage: i64::from(pipeline.has_deploy_stage),
            has_docker_build: i64::from(pipeline.has_docker_build),
            uses_emulator: i64::from(pipeline.uses_emulator),
            parallel_stages: i64::from(pipeline.parallel_stages),
            stages_count: i64::from(pipeline.stages_count()),
            has_artifact_publish: i64::from(has_artifact_publish),
            is_first_build: i64::from(is_first_build),
            cache_available: i64::from(cache_available),
            is_clean_build: i64::from(is_clean_build),
            time_of_day_hour: hour,
            memory_gb: resources.memory_gb,
            cpu_avg_pct: resources.cpu_pct,
            build_time_min: resources.time_min,
            status,
        }
    }

    /// Sample which stages a project's pipeline runs
    pub fn pipeline_config(&mut self, project: ProjectType, is_release: bool) -> PipelineConfig {
        let probs = self.engine.table().stage_probabilities(project);
        let multiplier = if is_release {
            tables::RELEASE_STAGE_MULTIPLIER
        } else {
            1.0
        };
        let rng = &mut self.rng;
        let boosted = |p: f64| (p * multiplier).min(1.0);

        let has_unit_tests = rng.gen_bool(boosted(probs.unit_tests));
        let has_integration_tests = rng.gen_bool(boosted(probs.integration_tests));
        let has_e2e_tests = rng.gen_bool(boosted(probs.e2e_tests));
        let has_deploy_stage = is_release || rng.gen_bool(tables::DEPLOY_STAGE_PROBABILITY);
        let has_docker_build = rng.gen_bool(probs.docker_build);
        let uses_emulator = rng.gen_bool(probs.emulator);
        let choices: &[u32] = if is_release {
            &tables::RELEASE_PARALLEL_STAGES
        } else {
            &tables::DEFAULT_PARALLEL_STAGES
        };
        let parallel_stages = choices.choose(rng).copied().unwrap_or(1);

        PipelineConfig {
            has_build_stage: true,
            has_unit_tests,
            has_integration_tests,
            has_e2e_tests,
            has_deploy_stage,
            has_docker_build,
            uses_emulator,
            parallel_stages,
        }
    }
}

/// Realistic branch name for a branch type
pub fn branch_name<R: Rng + ?Sized>(rng: &mut R, branch_type: BranchType) -> String {
    match branch_type {
        BranchType::Feature => format!(
            "feature/{}",
            tables::BRANCH_SUFFIXES.choose(rng).copied().unwrap_or("api")
        ),
        BranchType::Develop => "develop".to_string(),
        BranchType::Main => ["main", "master"]
            .choose(rng)
            .copied()
            .unwrap_or("main")
            .to_string(),
        BranchType::Hotfix => format!(
            "hotfix/{}",
            tables::HOTFIX_SUFFIXES.choose(rng).copied().unwrap_or("fix")
        ),
        BranchType::Release => format!(
            "release/v{}.{}.{}",
            rng.gen_range(1..=5),
            rng.gen_range(0..=9),
            rng.gen_range(0..=20)
        ),
    }
}

/// Sample git change metrics; test files only change when tests exist
pub fn git_metrics<R: Rng + ?Sized>(
    rng: &mut R,
    project: ProjectType,
    is_small_change: bool,
    has_tests: bool,
) -> GitMetrics {
    let profile = tables::git_profile(project);
    let range: GitProfile = if is_small_change {
        tables::SMALL_CHANGE
    } else {
        profile
    };

    let files_changed = rng.gen_range(range.files.0..=range.files.1);
    let lines_added = rng.gen_range(range.lines_added.0..=range.lines_added.1);
    let lines_deleted = (lines_added as f64 * uniform(rng, 0.1, 0.5)) as i64;
    let source_files_pct = round_to(uniform(rng, 0.5, 0.95), 2);
    let deps_file_changed = rng.gen_bool(tables::DEPS_FILE_CHANGED_PROBABILITY);
    let dependency_count = (profile.dependency_baseline * uniform(rng, 0.7, 1.3)) as i64;
    let test_files_changed = if has_tests && files_changed > 1 {
        (files_changed as f64 * uniform(rng, 0.15, 0.45)) as i64
    } else {
        0
    };

    GitMetrics {
        files_changed,
        lines_added,
        lines_deleted,
        source_files_pct,
        deps_file_changed,
        dependency_count,
        test_files_changed,
    }
}

/// Hex digest of a random draw, for synthetic identifiers
fn random_digest<R: Rng + ?Sized>(rng: &mut R) -> String {
    let seed: u64 = rng.gen();
    hex::encode(Sha256::digest(seed.to_le_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::encoding::infer_branch_type;
    use crate::profile::PROFILE_TABLE;

    fn generator(records: usize, seed: u64) -> DatasetGenerator<'static> {
        DatasetGenerator::new(GeneratorConfig {
            records,
            seed,
            ..GeneratorConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_generates_requested_count_with_sequential_ids() {
        let records = generator(120, 42).generate();
        assert_eq!(records.len(), 120);
        assert_eq!(records[0].build_id, "build-0001");
        assert_eq!(records[119].build_id, "build-0120");
    }

    #[test]
    fn test_same_seed_reproduces_dataset() {
        assert_eq!(generator(50, 7).generate(), generator(50, 7).generate());
        assert_ne!(generator(50, 7).generate(), generator(50, 8).generate());
    }

    #[test]
    fn test_record_invariants() {
        for r in generator(500, 11).generate() {
            assert_eq!(r.has_build_stage, 1);
            assert_eq!(
                r.stages_count,
                r.has_build_stage
                    + r.has_unit_tests
                    + r.has_integration_tests
                    + r.has_e2e_tests
                    + r.has_deploy_stage
            );
            if r.is_first_build == 1 {
                assert_eq!(r.cache_available, 0);
            }
            if r.branch_type == 4 || r.branch_type == 2 {
                assert_eq!(r.build_type, 1);
                assert_eq!(r.has_deploy_stage, 1);
            }
            if r.has_unit_tests == 0 && r.has_integration_tests == 0 {
                assert_eq!(r.test_files_changed, 0);
            }
            assert!(r.lines_deleted <= r.lines_added / 2);
            assert!((0..24).contains(&r.time_of_day_hour));
            assert_eq!(r.pipeline_id.len(), "pipe-".len() + 5);
            assert_eq!(r.commit_id.len(), 40);
            assert!(r.status == "success" || r.status == "failed");
            assert_eq!(ProjectType::from_code(r.project_type).unwrap().name(), r.project_type_name);
            assert_eq!(infer_branch_type(&r.branch).code(), r.branch_type);
        }
    }

    #[test]
    fn test_ios_never_builds_docker() {
        let mut generator = generator(1, 3);
        for _ in 0..300 {
            let pipeline = generator.pipeline_config(ProjectType::Ios, true);
            assert!(!pipeline.has_docker_build);
        }
        for _ in 0..300 {
            let pipeline = generator.pipeline_config(ProjectType::Python, false);
            assert!(!pipeline.uses_emulator);
        }
    }

    #[test]
    fn test_timestamps_follow_day_buckets() {
        let records = generator(120, 5).generate();
        assert!(records[0].timestamp.starts_with("2024-01-01T"));
        assert!(records[49].timestamp.starts_with("2024-01-01T"));
        assert!(records[50].timestamp.starts_with("2024-01-02T"));
        assert!(records[119].timestamp.starts_with("2024-01-03T"));
        for r in &records {
            let hour: i64 = r.timestamp[11..13].parse().unwrap();
            assert_eq!(hour, r.time_of_day_hour);
        }
    }

    #[test]
    fn test_labels_stay_within_modified_envelope() {
        for r in generator(300, 21).generate() {
            let project = ProjectType::from_code(r.project_type).unwrap();
            let base = PROFILE_TABLE.profile(project).base;
            assert!(r.memory_gb >= base.memory_gb.min - 0.01);
            assert!(r.cpu_avg_pct <= 100.0);
            assert!(r.build_time_min > 0.0);
        }
    }

    #[test]
    fn test_status_distribution_parse() {
        let dist = StatusDistribution::parse("success=0.9, failed=0.05,skipped=0.05").unwrap();
        let labels: Vec<_> = dist.entries().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["success", "failed", "skipped"]);

        assert!(StatusDistribution::parse("").is_err());
        assert!(StatusDistribution::parse("success").is_err());
        assert!(StatusDistribution::parse("success=abc").is_err());
        assert!(StatusDistribution::parse("success=0,failed=0").is_err());
    }

    #[test]
    fn test_custom_status_distribution_used() {
        let statuses = StatusDistribution::parse("running=1").unwrap();
        let records = generator(20, 1).with_status_distribution(statuses).generate();
        assert!(records.iter().all(|r| r.status == "running"));
    }

    #[test]
    fn test_git_metrics_small_change() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..200 {
            let git = git_metrics(&mut rng, ProjectType::Android, true, true);
            assert!((1..=5).contains(&git.files_changed));
            assert!((5..=100).contains(&git.lines_added));
            assert!((0.5..=0.95).contains(&git.source_files_pct));
            assert!((70..=130).contains(&git.dependency_count));
        }
    }
}
