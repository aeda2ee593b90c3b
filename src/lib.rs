pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{MemoryStore, RedbStore};
pub use config::Settings;
pub use core::{
    engine::ParkingEngine, ledger::CapacityLedger, queries::QueryService,
    sessions::SessionManager, ConfigProvider, EntityStore,
};
pub use utils::error::{ErrorKind, ParkingError, Result};
