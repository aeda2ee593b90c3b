//! redb-backed entity store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `client` | `client_id` | `Client` | Registered clients |
//! | `parking` | `parking_id` | `Parking` | Parkings and their available-place counter |
//! | `client_parking` | `session_id` | `Session` | Session history (append-only) |
//! | `open_sessions` | `(parking_id, client_id)` | `session_id` | Index of sessions without `time_out` |
//! | `sequence_counter` | table name | `u64` | Id allocation |
//!
//! Rows are JSON-serialized.
//!
//! # Concurrency
//!
//! redb admits a single write transaction at a time and `begin_write` blocks
//! until the previous writer commits or aborts. Every check-and-decrement on a
//! parking counter therefore runs against the committed state left by the
//! previous writer.

use crate::domain::model::{
    Client, ClientDraft, ClientId, Parking, ParkingDraft, ParkingId, Session, SessionId,
};
use crate::domain::ports::{EntityStore, ParkingTxn};
use crate::utils::error::{Result, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

const CLIENT_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("client");

const PARKING_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("parking");

const SESSION_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("client_parking");

const OPEN_SESSION_TABLE: TableDefinition<(u64, u64), u64> =
    TableDefinition::new("open_sessions");

const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequence_counter");

const CLIENT_SEQ_KEY: &str = "client";
const PARKING_SEQ_KEY: &str = "parking";
const SESSION_SEQ_KEY: &str = "client_parking";

fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn next_id(txn: &WriteTransaction, key: &str) -> StorageResult<u64> {
    let mut table = txn.open_table(SEQUENCE_TABLE)?;
    let current = table.get(key)?.map(|guard| guard.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(key, next)?;
    Ok(next)
}

#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path.as_ref())?;
        tracing::debug!("Opened parking database at {}", path.as_ref().display());
        Self::init(db)
    }

    /// Non-durable database, for tests and demos.
    pub fn in_memory() -> StorageResult<Self> {
        let db =
            Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CLIENT_TABLE)?;
            let _ = write_txn.open_table(PARKING_TABLE)?;
            let _ = write_txn.open_table(SESSION_TABLE)?;
            let _ = write_txn.open_table(OPEN_SESSION_TABLE)?;
            let _ = write_txn.open_table(SEQUENCE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    fn get_row<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<'static, u64, &'static [u8]>,
        id: u64,
    ) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(definition)?;
        let row = table.get(id)?;
        row.map(|value| decode(value.value())).transpose()
    }

    fn all_rows<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<'static, u64, &'static [u8]>,
    ) -> StorageResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(definition)?;

        let mut rows = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            rows.push(decode(value.value())?);
        }
        Ok(rows)
    }

    fn sessions_where(&self, keep: impl Fn(&Session) -> bool) -> StorageResult<Vec<Session>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSION_TABLE)?;

        let mut sessions = Vec::new();
        for result in table.iter()?.rev() {
            let (_key, value) = result?;
            let session: Session = decode(value.value())?;
            if keep(&session) {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }
}

impl EntityStore for RedbStore {
    fn insert_client(&self, draft: &ClientDraft) -> StorageResult<Client> {
        let txn = self.db.begin_write()?;
        let client = Client {
            id: ClientId(next_id(&txn, CLIENT_SEQ_KEY)?),
            name: draft.name.clone(),
            surname: draft.surname.clone(),
            credit_card: draft.credit_card.clone(),
            car_number: draft.car_number.clone(),
        };
        {
            let mut table = txn.open_table(CLIENT_TABLE)?;
            let value = encode(&client)?;
            table.insert(client.id.0, value.as_slice())?;
        }
        txn.commit()?;
        Ok(client)
    }

    fn client(&self, id: ClientId) -> StorageResult<Option<Client>> {
        self.get_row(CLIENT_TABLE, id.0)
    }

    fn clients(&self) -> StorageResult<Vec<Client>> {
        self.all_rows(CLIENT_TABLE)
    }

    fn insert_parking(&self, draft: &ParkingDraft) -> StorageResult<Parking> {
        let txn = self.db.begin_write()?;
        let parking = Parking {
            id: ParkingId(next_id(&txn, PARKING_SEQ_KEY)?),
            address: draft.address.clone(),
            opened: draft.opened,
            count_places: draft.count_places,
            count_available_places: draft.count_available_places,
        };
        {
            let mut table = txn.open_table(PARKING_TABLE)?;
            let value = encode(&parking)?;
            table.insert(parking.id.0, value.as_slice())?;
        }
        txn.commit()?;
        Ok(parking)
    }

    fn parking(&self, id: ParkingId) -> StorageResult<Option<Parking>> {
        self.get_row(PARKING_TABLE, id.0)
    }

    fn parkings(&self) -> StorageResult<Vec<Parking>> {
        self.all_rows(PARKING_TABLE)
    }

    fn sessions_for_client(&self, id: ClientId) -> StorageResult<Vec<Session>> {
        self.sessions_where(|session| session.client_id == id)
    }

    fn sessions_for_parking(&self, id: ParkingId) -> StorageResult<Vec<Session>> {
        self.sessions_where(|session| session.parking_id == id)
    }

    fn in_parking_txn<T, F>(&self, parking_id: ParkingId, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn ParkingTxn) -> Result<T>,
    {
        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let mut scoped = RedbParkingTxn { txn, parking_id };

        match f(&mut scoped) {
            Ok(value) => {
                scoped.txn.commit().map_err(StorageError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = scoped.txn.abort() {
                    tracing::warn!(
                        "Failed to abort parking {} transaction: {}",
                        parking_id,
                        abort_err
                    );
                }
                Err(e)
            }
        }
    }
}

struct RedbParkingTxn {
    txn: WriteTransaction,
    parking_id: ParkingId,
}

impl ParkingTxn for RedbParkingTxn {
    fn parking_id(&self) -> ParkingId {
        self.parking_id
    }

    fn client(&self, id: ClientId) -> StorageResult<Option<Client>> {
        let table = self.txn.open_table(CLIENT_TABLE)?;
        let row = table.get(id.0)?;
        row.map(|value| decode(value.value())).transpose()
    }

    fn parking(&self) -> StorageResult<Option<Parking>> {
        let table = self.txn.open_table(PARKING_TABLE)?;
        let row = table.get(self.parking_id.0)?;
        row.map(|value| decode(value.value())).transpose()
    }

    fn put_parking(&mut self, parking: &Parking) -> StorageResult<()> {
        if parking.id != self.parking_id {
            return Err(StorageError::OutOfScope {
                expected: self.parking_id,
                actual: parking.id,
            });
        }
        let mut table = self.txn.open_table(PARKING_TABLE)?;
        let value = encode(parking)?;
        table.insert(parking.id.0, value.as_slice())?;
        Ok(())
    }

    fn latest_open_session(&self, client_id: ClientId) -> StorageResult<Option<Session>> {
        let session_id = {
            let index = self.txn.open_table(OPEN_SESSION_TABLE)?;
            let found = index
                .get((self.parking_id.0, client_id.0))?
                .map(|guard| guard.value());
            found
        };
        let Some(session_id) = session_id else {
            return Ok(None);
        };

        let table = self.txn.open_table(SESSION_TABLE)?;
        let row = table.get(session_id)?.ok_or(StorageError::MissingRow {
            table: "client_parking",
            id: session_id,
        })?;
        Ok(Some(decode(row.value())?))
    }

    fn insert_session(
        &mut self,
        client_id: ClientId,
        time_in: DateTime<Utc>,
    ) -> StorageResult<Session> {
        let session = Session {
            id: SessionId(next_id(&self.txn, SESSION_SEQ_KEY)?),
            client_id,
            parking_id: self.parking_id,
            time_in,
            time_out: None,
        };
        {
            let mut table = self.txn.open_table(SESSION_TABLE)?;
            let value = encode(&session)?;
            table.insert(session.id.0, value.as_slice())?;
        }
        let mut index = self.txn.open_table(OPEN_SESSION_TABLE)?;
        index.insert((self.parking_id.0, client_id.0), session.id.0)?;
        Ok(session)
    }

    fn put_session(&mut self, session: &Session) -> StorageResult<()> {
        if session.parking_id != self.parking_id {
            return Err(StorageError::OutOfScope {
                expected: self.parking_id,
                actual: session.parking_id,
            });
        }
        {
            let mut table = self.txn.open_table(SESSION_TABLE)?;
            let value = encode(session)?;
            table.insert(session.id.0, value.as_slice())?;
        }
        let mut index = self.txn.open_table(OPEN_SESSION_TABLE)?;
        let key = (self.parking_id.0, session.client_id.0);
        if session.is_open() {
            index.insert(key, session.id.0)?;
        } else {
            // 只移除指向這筆 session 的索引
            let indexed = index.get(key)?.map(|guard| guard.value());
            if indexed == Some(session.id.0) {
                index.remove(key)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ParkingError;

    fn draft_parking(available: u32) -> ParkingDraft {
        ParkingDraft {
            address: "ул.Ленина, 1".to_string(),
            opened: true,
            count_places: 10,
            count_available_places: available,
        }
    }

    fn draft_client(name: &str) -> ClientDraft {
        ClientDraft {
            name: name.to_string(),
            surname: "chelov".to_string(),
            credit_card: Some("2200150511111112".to_string()),
            car_number: Some("A123BC".to_string()),
        }
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let store = RedbStore::in_memory().unwrap();

        let first = store.insert_client(&draft_client("Chel")).unwrap();
        let second = store.insert_client(&draft_client("Pchel")).unwrap();
        assert_eq!(first.id, ClientId(1));
        assert_eq!(second.id, ClientId(2));

        let names: Vec<String> = store
            .clients()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Chel", "Pchel"]);
    }

    #[test]
    fn test_missing_rows_are_none() {
        let store = RedbStore::in_memory().unwrap();
        assert!(store.client(ClientId(42)).unwrap().is_none());
        assert!(store.parking(ParkingId(42)).unwrap().is_none());
    }

    #[test]
    fn test_txn_commits_on_ok() {
        let store = RedbStore::in_memory().unwrap();
        let parking = store.insert_parking(&draft_parking(5)).unwrap();
        let client = store.insert_client(&draft_client("Pchel")).unwrap();

        let session = store
            .in_parking_txn(parking.id, |txn| {
                let mut row = txn.parking()?.unwrap();
                row.count_available_places -= 1;
                txn.put_parking(&row)?;
                Ok(txn.insert_session(client.id, Utc::now())?)
            })
            .unwrap();

        assert_eq!(store.parking(parking.id).unwrap().unwrap().count_available_places, 4);
        assert_eq!(store.sessions_for_parking(parking.id).unwrap(), vec![session.clone()]);

        let open = store
            .in_parking_txn(parking.id, |txn| Ok(txn.latest_open_session(client.id)?))
            .unwrap();
        assert_eq!(open, Some(session));
    }

    #[test]
    fn test_txn_rolls_back_on_err() {
        let store = RedbStore::in_memory().unwrap();
        let parking = store.insert_parking(&draft_parking(5)).unwrap();
        let client = store.insert_client(&draft_client("Pchel")).unwrap();

        let result: Result<()> = store.in_parking_txn(parking.id, |txn| {
            let mut row = txn.parking()?.unwrap();
            row.count_available_places = 0;
            txn.put_parking(&row)?;
            txn.insert_session(client.id, Utc::now())?;
            Err(ParkingError::not_found("abort"))
        });

        assert!(result.is_err());
        assert_eq!(store.parking(parking.id).unwrap().unwrap().count_available_places, 5);
        assert!(store.sessions_for_client(client.id).unwrap().is_empty());
    }

    #[test]
    fn test_closed_session_leaves_open_index() {
        let store = RedbStore::in_memory().unwrap();
        let parking = store.insert_parking(&draft_parking(5)).unwrap();
        let client = store.insert_client(&draft_client("Pchel")).unwrap();

        store
            .in_parking_txn(parking.id, |txn| {
                let mut session = txn.insert_session(client.id, Utc::now())?;
                session.close(Utc::now());
                txn.put_session(&session)?;
                Ok(())
            })
            .unwrap();

        let open = store
            .in_parking_txn(parking.id, |txn| Ok(txn.latest_open_session(client.id)?))
            .unwrap();
        assert!(open.is_none());
        assert_eq!(store.sessions_for_client(client.id).unwrap().len(), 1);
    }

    #[test]
    fn test_write_outside_scope_is_rejected() {
        let store = RedbStore::in_memory().unwrap();
        let first = store.insert_parking(&draft_parking(5)).unwrap();
        let second = store.insert_parking(&draft_parking(5)).unwrap();

        let result = store.in_parking_txn(first.id, |txn| {
            txn.put_parking(&second)?;
            Ok(())
        });
        assert!(matches!(
            result,
            Err(ParkingError::Storage(StorageError::OutOfScope { .. }))
        ));
    }

    #[test]
    fn test_reopen_file_keeps_rows() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("parking.redb");

        {
            let store = RedbStore::open(&path).unwrap();
            store.insert_parking(&draft_parking(3)).unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        let parkings = store.parkings().unwrap();
        assert_eq!(parkings.len(), 1);
        assert_eq!(parkings[0].count_available_places, 3);
        assert_eq!(store.insert_parking(&draft_parking(1)).unwrap().id, ParkingId(2));
    }
}
