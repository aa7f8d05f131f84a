use manpower_core::config::{AppConfig, LoadOptions};
use manpower_core::workflow::PositionRole;
use manpower_db::{connect_with_config, migrations, LookupRepository, SqlLookupRepository};
use serde::Serialize;

use crate::commands::{runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DATABASE_CHECKS: [&str; 3] = ["database_connectivity", "migrations", "org_directory"];

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass(
                "config_validation",
                "configuration loaded and validated",
            ));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.extend(
                DATABASE_CHECKS
                    .into_iter()
                    .map(|name| DoctorCheck::skipped(name, "configuration did not load")),
            );
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Connectivity, migrations and directory resolution, stopping at the first failure.
fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err((_, message, _)) => {
            return vec![
                DoctorCheck::fail("database_connectivity", message),
                DoctorCheck::skipped("migrations", "no runtime was available"),
                DoctorCheck::skipped("org_directory", "no runtime was available"),
            ];
        }
    };

    runtime.block_on(async {
        let mut checks = Vec::new();

        let pool = match connect_with_config(&config.database)
        .await
        {
            Ok(pool) => pool,
            Err(error) => {
                checks.push(DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to connect to database: {error}"),
                ));
                checks.push(DoctorCheck::skipped("migrations", "the database is unreachable"));
                checks.push(DoctorCheck::skipped("org_directory", "the database is unreachable"));
                return checks;
            }
        };
        checks.push(DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        ));

        match migrations::run_pending(&pool).await {
            Ok(()) => {
                let recorded = migrations::applied_versions(&pool)
                    .await
                    .map(|versions| versions.len())
                    .unwrap_or_default();
                checks.push(DoctorCheck::pass(
                    "migrations",
                    format!("schema up to date; {recorded} migrations recorded"),
                ));
            }
            Err(error) => {
                checks.push(DoctorCheck::fail("migrations", error.to_string()));
                checks.push(DoctorCheck::skipped("org_directory", "migrations did not apply"));
                pool.close().await;
                return checks;
            }
        }

        let directory =
            SqlLookupRepository::new(pool.clone()).org_directory(&config.workflow).await;
        checks.push(match directory {
            Ok(directory) => {
                let missing: Vec<String> =
                    [PositionRole::Manager, PositionRole::Director, PositionRole::Recruiter]
                        .into_iter()
                        .filter(|role| directory.positions_with_role(*role).is_empty())
                        .map(|role| format!("{role:?}").to_ascii_lowercase())
                        .collect();

                if missing.is_empty() {
                    DoctorCheck::pass(
                        "org_directory",
                        format!(
                            "HR department id {}, management department id {}",
                            directory.hr_department.0, directory.management_department.0
                        ),
                    )
                } else {
                    DoctorCheck::fail(
                        "org_directory",
                        format!("no position holds role(s): {}", missing.join(", ")),
                    )
                }
            }
            Err(error) => DoctorCheck::fail(
                "org_directory",
                format!("{error}; run `manpower seed` or adjust [workflow]"),
            ),
        });

        pool.close().await;
        checks
    })
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
