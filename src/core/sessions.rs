use crate::core::ledger::{self, Reservation};
use crate::domain::model::{ClientId, ParkingId, Session};
use crate::domain::ports::EntityStore;
use crate::utils::error::{ParkingError, Result};
use chrono::Utc;
use std::sync::Arc;

pub const CLIENT_OR_PARKING_MISSING: &str = "client or parking does not exist";
pub const NO_CREDIT_CARD: &str = "no credit card on file";
pub const NO_ACTIVE_SESSION: &str = "no active session";
pub const PARKING_RECORD_MISSING: &str = "parking record missing";

/// Opens and closes sessions. Each call runs as one transaction scoped to the
/// parking, so the counter write and the session write commit together.
pub struct SessionManager<S: EntityStore> {
    store: Arc<S>,
}

impl<S: EntityStore> SessionManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 檢查順序固定：存在 -> 信用卡 -> 營業中 -> 車位 -> 重複入場
    pub fn start_session(&self, client_id: ClientId, parking_id: ParkingId) -> Result<Session> {
        let result = self.store.in_parking_txn(parking_id, |txn| {
            let client = txn.client(client_id)?;
            let parking = txn.parking()?;
            let (Some(client), Some(parking)) = (client, parking) else {
                return Err(ParkingError::not_found(CLIENT_OR_PARKING_MISSING));
            };

            if !client.has_payment_method() {
                return Err(ParkingError::IneligibleClient {
                    reason: NO_CREDIT_CARD.to_string(),
                });
            }

            if !parking.opened {
                return Err(ParkingError::ParkingClosed { parking_id });
            }

            if let Reservation::Exhausted = ledger::reserve_in(txn)? {
                return Err(ParkingError::CapacityExhausted { parking_id });
            }

            // Rolls back the reservation above together with the transaction.
            if txn.latest_open_session(client_id)?.is_some() {
                return Err(ParkingError::AlreadyParked {
                    client_id,
                    parking_id,
                });
            }

            Ok(txn.insert_session(client_id, Utc::now())?)
        });

        match &result {
            Ok(session) => tracing::info!(
                "🚗 Client {} checked in at parking {} (session {})",
                client_id,
                parking_id,
                session.id
            ),
            Err(e) => tracing::warn!(
                "Check-in of client {} at parking {} rejected: {}",
                client_id,
                parking_id,
                e
            ),
        }
        result
    }

    pub fn end_session(&self, client_id: ClientId, parking_id: ParkingId) -> Result<Session> {
        let result = self.store.in_parking_txn(parking_id, |txn| {
            let mut session = txn
                .latest_open_session(client_id)?
                .ok_or_else(|| ParkingError::not_found(NO_ACTIVE_SESSION))?;
            session.close(Utc::now());

            if txn.parking()?.is_none() {
                return Err(ParkingError::not_found(PARKING_RECORD_MISSING));
            }

            ledger::release_in(txn)?;
            txn.put_session(&session)?;
            Ok(session)
        });

        match &result {
            Ok(session) => tracing::info!(
                "🏁 Client {} checked out of parking {} (session {})",
                client_id,
                parking_id,
                session.id
            ),
            Err(e) => tracing::warn!(
                "Check-out of client {} from parking {} failed: {}",
                client_id,
                parking_id,
                e
            ),
        }
        result
    }
}
