pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod poller;
pub mod reports;
pub mod repo;
pub mod routes;
pub mod rpc;
pub mod storage;

// Re-export commonly used items for tests / external users
pub use repo::local::LocalRepo;
pub use repo::remote::RemoteRepo;
pub use repo::{Repo, RepoError, RepoResult};
pub use routes::{config, AppState};
