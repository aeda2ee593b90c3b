//! In-process entity store.
//!
//! Each parking row, together with its sessions, sits behind its own
//! `parking_lot::Mutex`, so transactions on different parkings never contend.
//! A transaction works on a staged copy of the row and swaps it in on commit.

use crate::domain::model::{
    Client, ClientDraft, ClientId, Parking, ParkingDraft, ParkingId, Session, SessionId,
};
use crate::domain::ports::{EntityStore, ParkingTxn};
use crate::utils::error::{Result, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct ParkingRow {
    parking: Parking,
    sessions: Vec<Session>,
}

#[derive(Default)]
pub struct MemoryStore {
    clients: DashMap<ClientId, Client>,
    parkings: DashMap<ParkingId, Arc<Mutex<ParkingRow>>>,
    client_seq: AtomicU64,
    parking_seq: AtomicU64,
    session_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, id: ParkingId) -> Option<Arc<Mutex<ParkingRow>>> {
        self.parkings.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    fn all_rows(&self) -> Vec<Arc<Mutex<ParkingRow>>> {
        self.parkings
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

fn newest_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.id.cmp(&a.id));
}

impl EntityStore for MemoryStore {
    fn insert_client(&self, draft: &ClientDraft) -> StorageResult<Client> {
        let client = Client {
            id: ClientId(self.client_seq.fetch_add(1, Ordering::SeqCst) + 1),
            name: draft.name.clone(),
            surname: draft.surname.clone(),
            credit_card: draft.credit_card.clone(),
            car_number: draft.car_number.clone(),
        };
        self.clients.insert(client.id, client.clone());
        Ok(client)
    }

    fn client(&self, id: ClientId) -> StorageResult<Option<Client>> {
        Ok(self.clients.get(&id).map(|entry| entry.value().clone()))
    }

    fn clients(&self) -> StorageResult<Vec<Client>> {
        let mut clients: Vec<Client> = self
            .clients
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        clients.sort_by_key(|client| client.id);
        Ok(clients)
    }

    fn insert_parking(&self, draft: &ParkingDraft) -> StorageResult<Parking> {
        let parking = Parking {
            id: ParkingId(self.parking_seq.fetch_add(1, Ordering::SeqCst) + 1),
            address: draft.address.clone(),
            opened: draft.opened,
            count_places: draft.count_places,
            count_available_places: draft.count_available_places,
        };
        let row = ParkingRow {
            parking: parking.clone(),
            sessions: Vec::new(),
        };
        self.parkings.insert(parking.id, Arc::new(Mutex::new(row)));
        Ok(parking)
    }

    fn parking(&self, id: ParkingId) -> StorageResult<Option<Parking>> {
        Ok(self.row(id).map(|row| row.lock().parking.clone()))
    }

    fn parkings(&self) -> StorageResult<Vec<Parking>> {
        let mut parkings: Vec<Parking> = self
            .all_rows()
            .iter()
            .map(|row| row.lock().parking.clone())
            .collect();
        parkings.sort_by_key(|parking| parking.id);
        Ok(parkings)
    }

    fn sessions_for_client(&self, id: ClientId) -> StorageResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .all_rows()
            .iter()
            .flat_map(|row| {
                row.lock()
                    .sessions
                    .iter()
                    .filter(|session| session.client_id == id)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        newest_first(&mut sessions);
        Ok(sessions)
    }

    fn sessions_for_parking(&self, id: ParkingId) -> StorageResult<Vec<Session>> {
        let mut sessions = self
            .row(id)
            .map(|row| row.lock().sessions.clone())
            .unwrap_or_default();
        newest_first(&mut sessions);
        Ok(sessions)
    }

    fn in_parking_txn<T, F>(&self, parking_id: ParkingId, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn ParkingTxn) -> Result<T>,
    {
        let Some(slot) = self.row(parking_id) else {
            // 沒有這一列：交易只能讀，寫入會回報 MissingRow
            let mut txn = MemoryParkingTxn {
                clients: &self.clients,
                session_seq: &self.session_seq,
                parking_id,
                row: None,
            };
            return f(&mut txn);
        };

        let mut guard = slot.lock();
        let mut txn = MemoryParkingTxn {
            clients: &self.clients,
            session_seq: &self.session_seq,
            parking_id,
            row: Some(guard.clone()),
        };

        let value = f(&mut txn)?;
        if let Some(staged) = txn.row {
            *guard = staged;
        }
        Ok(value)
    }
}

struct MemoryParkingTxn<'a> {
    clients: &'a DashMap<ClientId, Client>,
    session_seq: &'a AtomicU64,
    parking_id: ParkingId,
    row: Option<ParkingRow>,
}

impl MemoryParkingTxn<'_> {
    fn staged(&mut self) -> StorageResult<&mut ParkingRow> {
        let parking_id = self.parking_id;
        self.row.as_mut().ok_or(StorageError::MissingRow {
            table: "parking",
            id: parking_id.0,
        })
    }
}

impl ParkingTxn for MemoryParkingTxn<'_> {
    fn parking_id(&self) -> ParkingId {
        self.parking_id
    }

    fn client(&self, id: ClientId) -> StorageResult<Option<Client>> {
        Ok(self.clients.get(&id).map(|entry| entry.value().clone()))
    }

    fn parking(&self) -> StorageResult<Option<Parking>> {
        Ok(self.row.as_ref().map(|row| row.parking.clone()))
    }

    fn put_parking(&mut self, parking: &Parking) -> StorageResult<()> {
        if parking.id != self.parking_id {
            return Err(StorageError::OutOfScope {
                expected: self.parking_id,
                actual: parking.id,
            });
        }
        self.staged()?.parking = parking.clone();
        Ok(())
    }

    fn latest_open_session(&self, client_id: ClientId) -> StorageResult<Option<Session>> {
        Ok(self.row.as_ref().and_then(|row| {
            row.sessions
                .iter()
                .rev()
                .find(|session| session.client_id == client_id && session.is_open())
                .cloned()
        }))
    }

    fn insert_session(
        &mut self,
        client_id: ClientId,
        time_in: DateTime<Utc>,
    ) -> StorageResult<Session> {
        let parking_id = self.parking_id;
        let session_seq = self.session_seq;
        let row = self.staged()?;
        let session = Session {
            id: SessionId(session_seq.fetch_add(1, Ordering::SeqCst) + 1),
            client_id,
            parking_id,
            time_in,
            time_out: None,
        };
        row.sessions.push(session.clone());
        Ok(session)
    }

    fn put_session(&mut self, session: &Session) -> StorageResult<()> {
        if session.parking_id != self.parking_id {
            return Err(StorageError::OutOfScope {
                expected: self.parking_id,
                actual: session.parking_id,
            });
        }
        let row = self.staged()?;
        let slot = row
            .sessions
            .iter_mut()
            .find(|existing| existing.id == session.id)
            .ok_or(StorageError::MissingRow {
                table: "client_parking",
                id: session.id.0,
            })?;
        *slot = session.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ParkingError;

    fn seeded() -> (MemoryStore, ClientId, ParkingId) {
        let store = MemoryStore::new();
        let client = store
            .insert_client(&ClientDraft {
                name: "Pchel".to_string(),
                surname: "chelov".to_string(),
                credit_card: Some("2200150511111112".to_string()),
                car_number: None,
            })
            .unwrap();
        let parking = store
            .insert_parking(&ParkingDraft {
                address: "ул.Ленина, 1".to_string(),
                opened: true,
                count_places: 2,
                count_available_places: 2,
            })
            .unwrap();
        (store, client.id, parking.id)
    }

    #[test]
    fn test_txn_commits_staged_row() {
        let (store, client_id, parking_id) = seeded();

        store
            .in_parking_txn(parking_id, |txn| {
                let mut parking = txn.parking()?.unwrap();
                parking.count_available_places -= 1;
                txn.put_parking(&parking)?;
                txn.insert_session(client_id, Utc::now())?;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.parking(parking_id).unwrap().unwrap().count_available_places, 1);
        assert_eq!(store.sessions_for_client(client_id).unwrap().len(), 1);
    }

    #[test]
    fn test_txn_discards_staged_row_on_err() {
        let (store, client_id, parking_id) = seeded();

        let result: Result<()> = store.in_parking_txn(parking_id, |txn| {
            txn.insert_session(client_id, Utc::now())?;
            Err(ParkingError::not_found("abort"))
        });

        assert!(result.is_err());
        assert!(store.sessions_for_parking(parking_id).unwrap().is_empty());
    }

    #[test]
    fn test_missing_parking_txn_is_read_only() {
        let (store, client_id, _) = seeded();

        let result = store.in_parking_txn(ParkingId(99), |txn| {
            assert!(txn.parking()?.is_none());
            assert!(txn.client(client_id)?.is_some());
            txn.insert_session(client_id, Utc::now())?;
            Ok(())
        });
        assert!(matches!(
            result,
            Err(ParkingError::Storage(StorageError::MissingRow { table: "parking", .. }))
        ));
    }

    #[test]
    fn test_sessions_newest_first() {
        let (store, client_id, parking_id) = seeded();

        for _ in 0..3 {
            store
                .in_parking_txn(parking_id, |txn| {
                    let mut session = txn.insert_session(client_id, Utc::now())?;
                    session.close(Utc::now());
                    txn.put_session(&session)?;
                    Ok(())
                })
                .unwrap();
        }

        let ids: Vec<u64> = store
            .sessions_for_parking(parking_id)
            .unwrap()
            .iter()
            .map(|s| s.id.0)
            .collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
