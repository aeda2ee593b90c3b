use crate::domain::model::{CapacityAudit, Client, ClientId, Parking, ParkingId, Session};
use crate::domain::ports::EntityStore;
use crate::utils::error::{ParkingError, Result};
use std::sync::Arc;

/// Read-only projections over the entity store.
pub struct QueryService<S: EntityStore> {
    store: Arc<S>,
}

impl<S: EntityStore> QueryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        Ok(self.store.clients()?)
    }

    /// Includes credit card and car number.
    pub fn get_client_detail(&self, id: ClientId) -> Result<Client> {
        self.store
            .client(id)?
            .ok_or_else(|| ParkingError::not_found(format!("client {} does not exist", id)))
    }

    pub fn list_parkings(&self) -> Result<Vec<Parking>> {
        Ok(self.store.parkings()?)
    }

    pub fn get_parking_detail(&self, id: ParkingId) -> Result<Parking> {
        self.store
            .parking(id)?
            .ok_or_else(|| ParkingError::not_found(format!("parking {} does not exist", id)))
    }

    pub fn session_history(&self, client_id: ClientId) -> Result<Vec<Session>> {
        self.get_client_detail(client_id)?;
        Ok(self.store.sessions_for_client(client_id)?)
    }

    pub fn parking_sessions(&self, parking_id: ParkingId) -> Result<Vec<Session>> {
        self.get_parking_detail(parking_id)?;
        Ok(self.store.sessions_for_parking(parking_id)?)
    }

    /// Compares the stored counter with `count_places - open sessions`.
    pub fn audit_capacity(&self, parking_id: ParkingId) -> Result<CapacityAudit> {
        let parking = self.get_parking_detail(parking_id)?;
        let open_sessions = self
            .store
            .sessions_for_parking(parking_id)?
            .iter()
            .filter(|session| session.is_open())
            .count() as u32;

        let recomputed = i64::from(parking.count_places) - i64::from(open_sessions);
        let audit = CapacityAudit {
            parking_id,
            count_places: parking.count_places,
            stored_available: parking.count_available_places,
            open_sessions,
            recomputed_available: recomputed,
            drift: i64::from(parking.count_available_places) - recomputed,
        };

        if !audit.is_consistent() {
            tracing::warn!(
                "Parking {} counter drift: stored {} vs recomputed {}",
                parking_id,
                audit.stored_available,
                audit.recomputed_available
            );
        }
        Ok(audit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::domain::model::ParkingDraft;

    #[test]
    fn test_unknown_ids_are_not_found() {
        let queries = QueryService::new(Arc::new(MemoryStore::new()));

        assert!(matches!(
            queries.get_client_detail(ClientId(1)),
            Err(ParkingError::NotFound { .. })
        ));
        assert!(matches!(
            queries.get_parking_detail(ParkingId(1)),
            Err(ParkingError::NotFound { .. })
        ));
        assert!(matches!(
            queries.session_history(ClientId(1)),
            Err(ParkingError::NotFound { .. })
        ));
        assert!(queries.list_clients().unwrap().is_empty());
    }

    #[test]
    fn test_audit_reports_creation_gap() {
        let store = Arc::new(MemoryStore::new());
        let parking = store
            .insert_parking(&ParkingDraft {
                address: "ул.Пушкина, 2".to_string(),
                opened: false,
                count_places: 11,
                count_available_places: 13,
            })
            .unwrap();

        let audit = QueryService::new(store).audit_capacity(parking.id).unwrap();
        assert_eq!(audit.open_sessions, 0);
        assert_eq!(audit.recomputed_available, 11);
        assert_eq!(audit.drift, 2);
        assert!(!audit.is_consistent());
    }
}
