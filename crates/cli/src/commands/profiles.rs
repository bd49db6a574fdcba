//! Resource profile table display

use anyhow::{bail, Result};
use colored::Colorize;
use estimator_lib::models::ProjectType;
use estimator_lib::profile::{ResourceProfile, StageProbabilities, PROFILE_TABLE};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{format_interval, format_rate, print_json, print_table, OutputFormat};

/// Row for one profile entry
#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Entry")]
    entry: &'static str,
    #[tabled(rename = "Memory (GB)")]
    memory: String,
    #[tabled(rename = "CPU (%)")]
    cpu: String,
    #[tabled(rename = "Time (min)")]
    time: String,
}

/// JSON view of one project type
#[derive(Serialize)]
struct ProfileView {
    project_type: &'static str,
    code: i64,
    profile: &'static ResourceProfile,
    stage_probabilities: &'static StageProbabilities,
}

/// Show the static profile table, optionally for a single project type
pub fn show_profiles(project: Option<&str>, format: OutputFormat) -> Result<()> {
    let projects = select_projects(project)?;

    match format {
        OutputFormat::Json => {
            let views: Vec<ProfileView> = projects
                .iter()
                .map(|&p| ProfileView {
                    project_type: p.name(),
                    code: p.code(),
                    profile: PROFILE_TABLE.profile(p),
                    stage_probabilities: PROFILE_TABLE.stage_probabilities(p),
                })
                .collect();
            print_json(&views)?;
        }
        OutputFormat::Table => {
            for (i, &p) in projects.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                println!("{} {}", p.name().bold().cyan(), format!("(code {})", p.code()).dimmed());
                print_table(&profile_rows(PROFILE_TABLE.profile(p)));

                let probs = PROFILE_TABLE.stage_probabilities(p);
                println!(
                    "Stage odds: unit {}  integration {}  e2e {}  docker {}  emulator {}",
                    format_rate(probs.unit_tests),
                    format_rate(probs.integration_tests),
                    format_rate(probs.e2e_tests),
                    format_rate(probs.docker_build),
                    format_rate(probs.emulator),
                );
            }
        }
    }

    Ok(())
}

fn select_projects(project: Option<&str>) -> Result<Vec<ProjectType>> {
    match project {
        None => Ok(ProjectType::ALL.to_vec()),
        Some(name) => {
            let lowered = name.to_lowercase();
            match ProjectType::ALL.into_iter().find(|p| p.name() == lowered) {
                Some(p) => Ok(vec![p]),
                None => {
                    let known: Vec<&str> = ProjectType::ALL.iter().map(|p| p.name()).collect();
                    bail!("Unknown project type '{}', expected one of: {}", name, known.join(", "))
                }
            }
        }
    }
}

fn profile_rows(profile: &ResourceProfile) -> Vec<ProfileRow> {
    profile
        .entries()
        .into_iter()
        .map(|(entry, range)| ProfileRow {
            entry,
            memory: format_interval(&range.memory_gb),
            cpu: format_interval(&range.cpu_pct),
            time: format_interval(&range.time_min),
        })
        .collect()
}
