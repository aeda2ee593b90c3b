use crate::core::ledger::CapacityLedger;
use crate::core::queries::QueryService;
use crate::core::registry::Registry;
use crate::core::sessions::SessionManager;
use crate::domain::model::{
    CapacityAudit, CheckoutConfirmation, Client, ClientId, ClientSummary, NewClient, NewParking,
    Parking, ParkingId, ParkingSummary, Session, SessionTicket,
};
use crate::domain::ports::EntityStore;
use crate::utils::error::Result;
use std::sync::Arc;

pub const CHECKOUT_MESSAGE: &str = "client checked out of the parking";

/// Entry point for the boundary layer. Cheap to clone; clones share the store.
pub struct ParkingEngine<S: EntityStore> {
    store: Arc<S>,
    registry: Arc<Registry<S>>,
    sessions: Arc<SessionManager<S>>,
    queries: Arc<QueryService<S>>,
    ledger: Arc<CapacityLedger<S>>,
}

impl<S: EntityStore> Clone for ParkingEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            sessions: Arc::clone(&self.sessions),
            queries: Arc::clone(&self.queries),
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<S: EntityStore> ParkingEngine<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self {
            registry: Arc::new(Registry::new(Arc::clone(&store))),
            sessions: Arc::new(SessionManager::new(Arc::clone(&store))),
            queries: Arc::new(QueryService::new(Arc::clone(&store))),
            ledger: Arc::new(CapacityLedger::new(Arc::clone(&store))),
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn queries(&self) -> &QueryService<S> {
        &self.queries
    }

    pub fn ledger(&self) -> &CapacityLedger<S> {
        &self.ledger
    }

    pub fn sessions(&self) -> &SessionManager<S> {
        &self.sessions
    }

    pub fn create_client(&self, input: NewClient) -> Result<ClientSummary> {
        Ok(self.registry.create_client(input)?.summary())
    }

    pub fn get_client(&self, id: ClientId) -> Result<Client> {
        self.queries.get_client_detail(id)
    }

    pub fn list_clients(&self) -> Result<Vec<ClientSummary>> {
        Ok(self
            .queries
            .list_clients()?
            .iter()
            .map(Client::summary)
            .collect())
    }

    pub fn create_parking(&self, input: NewParking) -> Result<ParkingSummary> {
        Ok(self.registry.create_parking(input)?.summary())
    }

    pub fn get_parking(&self, id: ParkingId) -> Result<Parking> {
        self.queries.get_parking_detail(id)
    }

    pub fn list_parkings(&self) -> Result<Vec<Parking>> {
        self.queries.list_parkings()
    }

    pub fn audit_parking(&self, id: ParkingId) -> Result<CapacityAudit> {
        self.queries.audit_capacity(id)
    }

    pub fn start_session(
        &self,
        client_id: ClientId,
        parking_id: ParkingId,
    ) -> Result<SessionTicket> {
        let session = self.sessions.start_session(client_id, parking_id)?;
        Ok(SessionTicket {
            client_id: session.client_id,
            parking_id: session.parking_id,
        })
    }

    pub fn stop_session(
        &self,
        client_id: ClientId,
        parking_id: ParkingId,
    ) -> Result<CheckoutConfirmation> {
        let session = self.sessions.end_session(client_id, parking_id)?;
        Ok(CheckoutConfirmation {
            message: CHECKOUT_MESSAGE.to_string(),
            session,
        })
    }

    pub fn session_history(&self, client_id: ClientId) -> Result<Vec<Session>> {
        self.queries.session_history(client_id)
    }

    pub fn parking_sessions(&self, parking_id: ParkingId) -> Result<Vec<Session>> {
        self.queries.parking_sessions(parking_id)
    }
}
