pub mod config;
pub mod db;
pub mod digest;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod service;
pub mod storage;
pub mod validation;

#[cfg(test)]
pub mod test_helpers;

pub use config::Config;
pub use digest::ContentDigest;
pub use error::{Error, Result};
pub use storage::{AssetStore, StoreOutcome};
