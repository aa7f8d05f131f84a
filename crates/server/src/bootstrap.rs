use std::sync::Arc;

use axum::Router;
use manpower_core::config::{AppConfig, ConfigError, LoadOptions};
use manpower_core::workflow::{PositionRole, WorkflowEngine};
use manpower_db::{
    connect_with_config, migrations, DbPool, LookupRepository, RepositoryError,
    SqlLookupRepository,
};
use thiserror::Error;
use tracing::info;

use crate::{api, health};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub engine: Arc<WorkflowEngine>,
}

impl Application {
    /// API routes plus the health probe, sharing one pool.
    pub fn router(&self) -> Router {
        let state =
            api::ApiState::sql(self.db_pool.clone(), &self.config.workflow, Arc::clone(&self.engine));
        api::router(state).merge(health::router(self.db_pool.clone()))
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("organization directory could not be resolved: {0}; run `manpower seed` or fix [workflow]")]
    Directory(#[source] RepositoryError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_config(&config.database)
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let directory = SqlLookupRepository::new(db_pool.clone())
        .org_directory(&config.workflow)
        .await
        .map_err(BootstrapError::Directory)?;
    info!(
        event_name = "system.bootstrap.directory_resolved",
        correlation_id = "bootstrap",
        hr_department_id = directory.hr_department.0,
        management_department_id = directory.management_department.0,
        managers = directory.positions_with_role(PositionRole::Manager).len(),
        directors = directory.positions_with_role(PositionRole::Director).len(),
        recruiters = directory.positions_with_role(PositionRole::Recruiter).len(),
        "organization directory resolved"
    );

    Ok(Application { config, db_pool, engine: Arc::new(WorkflowEngine::new(directory)) })
}
