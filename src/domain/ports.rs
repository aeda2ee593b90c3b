use crate::domain::model::{
    Client, ClientDraft, ClientId, Parking, ParkingDraft, ParkingId, Session,
};
use crate::utils::error::{Result, StorageResult};
use chrono::{DateTime, Utc};
use std::path::Path;

/// A unit of work scoped to a single parking row.
///
/// Writes become visible only when the closure passed to
/// [`EntityStore::in_parking_txn`] returns `Ok`; an `Err` discards them.
pub trait ParkingTxn {
    fn parking_id(&self) -> ParkingId;

    fn client(&self, id: ClientId) -> StorageResult<Option<Client>>;

    fn parking(&self) -> StorageResult<Option<Parking>>;

    fn put_parking(&mut self, parking: &Parking) -> StorageResult<()>;

    /// Most recent session of `client_id` at this parking whose `time_out` is unset.
    fn latest_open_session(&self, client_id: ClientId) -> StorageResult<Option<Session>>;

    fn insert_session(
        &mut self,
        client_id: ClientId,
        time_in: DateTime<Utc>,
    ) -> StorageResult<Session>;

    fn put_session(&mut self, session: &Session) -> StorageResult<()>;
}

pub trait EntityStore: Send + Sync {
    fn insert_client(&self, draft: &ClientDraft) -> StorageResult<Client>;

    fn client(&self, id: ClientId) -> StorageResult<Option<Client>>;

    /// 依建立順序
    fn clients(&self) -> StorageResult<Vec<Client>>;

    fn insert_parking(&self, draft: &ParkingDraft) -> StorageResult<Parking>;

    fn parking(&self, id: ParkingId) -> StorageResult<Option<Parking>>;

    fn parkings(&self) -> StorageResult<Vec<Parking>>;

    /// Newest first.
    fn sessions_for_client(&self, id: ClientId) -> StorageResult<Vec<Session>>;

    /// Newest first.
    fn sessions_for_parking(&self, id: ParkingId) -> StorageResult<Vec<Session>>;

    /// Runs `f` while holding exclusive access to the parking row `parking_id`.
    /// Concurrent callers on the same parking are serialized; the transaction
    /// commits iff `f` returns `Ok`.
    fn in_parking_txn<T, F>(&self, parking_id: ParkingId, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn ParkingTxn) -> Result<T>;
}

pub trait ConfigProvider: Send + Sync {
    fn database_path(&self) -> &Path;
    fn json_logs(&self) -> bool;
    fn log_level(&self) -> Option<&str>;
    fn concurrent_requests(&self) -> usize;
}
