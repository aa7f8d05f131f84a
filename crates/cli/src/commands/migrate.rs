use crate::commands::{
    runtime, CommandFailure, CommandResult, EXIT_CONFIG, EXIT_DB_CONNECT, EXIT_EXECUTION,
};
use manpower_core::config::{AppConfig, LoadOptions};
use manpower_db::{connect_with_config, migrations};

pub fn run() -> CommandResult {
    CommandResult::from_run("migrate", apply())
}

fn apply() -> Result<String, CommandFailure> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        ("config_validation", format!("configuration issue: {error}"), EXIT_CONFIG)
    })?;

    runtime()?.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECT))?;

        let applied = async {
            migrations::run_pending(&pool).await.map_err(|error| error.to_string())?;
            migrations::applied_versions(&pool).await.map_err(|error| error.to_string())
        }
        .await
        .map_err(|message| ("migration", message, EXIT_EXECUTION));

        pool.close().await;
        Ok::<_, CommandFailure>(format!("applied pending migrations; {} recorded", applied?.len()))
    })
}
