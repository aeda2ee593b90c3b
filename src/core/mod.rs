pub mod engine;
pub mod ledger;
pub mod queries;
pub mod registry;
pub mod sessions;

pub use crate::domain::model::{Client, Parking, Session};
pub use crate::domain::ports::{ConfigProvider, EntityStore, ParkingTxn};
pub use crate::utils::error::Result;
