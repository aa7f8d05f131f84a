use crate::commands::{
    runtime, CommandFailure, CommandResult, EXIT_CONFIG, EXIT_DB_CONNECT, EXIT_EXECUTION,
    EXIT_VERIFICATION,
};
use manpower_core::config::{AppConfig, LoadOptions};
use manpower_db::{connect_with_config, migrations, DbPool, OrgSeedDataset, SeedTableInfo};

pub fn run() -> CommandResult {
    CommandResult::from_run("seed", load())
}

fn load() -> Result<String, CommandFailure> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        ("config_validation", format!("configuration issue: {error}"), EXIT_CONFIG)
    })?;

    runtime()?.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECT))?;

        let seeded = seed_and_verify(&pool).await;
        pool.close().await;
        seeded.map(|tables| success_message(&tables))
    })
}

async fn seed_and_verify(pool: &DbPool) -> Result<Vec<SeedTableInfo>, CommandFailure> {
    migrations::run_pending(pool)
        .await
        .map_err(|error| ("migration", error.to_string(), EXIT_EXECUTION))?;

    let seed_result = OrgSeedDataset::load(pool)
        .await
        .map_err(|error| ("seed_execution", error.to_string(), EXIT_EXECUTION))?;

    let verification = OrgSeedDataset::verify(pool)
        .await
        .map_err(|error| ("seed_verification", error.to_string(), EXIT_VERIFICATION))?;

    if verification.all_present {
        Ok(seed_result.tables_seeded)
    } else {
        Err((
            "seed_verification",
            verification_failure_message(&verification.checks),
            EXIT_VERIFICATION,
        ))
    }
}

fn success_message(tables: &[SeedTableInfo]) -> String {
    let lines: Vec<String> =
        tables.iter().map(|table| format!("  - {}: {} rows", table.kind, table.rows)).collect();
    format!("organization seed loaded:\n{}", lines.join("\n"))
}

fn verification_failure_message(checks: &[(&'static str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
