pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{OrgSeedDataset, SeedResult, SeedTableInfo, VerificationResult};
pub use repositories::{
    DecisionRecord, HistoryRepository, InMemoryLedger, LookupKind, LookupRepository,
    RepositoryError, RequestRepository, SqlHistoryRepository, SqlLookupRepository,
    SqlRequestRepository, SubmitPolicy,
};
