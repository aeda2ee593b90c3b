//! Capacity ledger: the only code that writes `count_available_places`.

use crate::domain::model::ParkingId;
use crate::domain::ports::{EntityStore, ParkingTxn};
use crate::utils::error::{ParkingError, Result};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Reserved { remaining: u32 },
    Exhausted,
}

impl Reservation {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Reservation::Reserved { .. })
    }
}

fn parking_not_found(parking_id: ParkingId) -> ParkingError {
    ParkingError::not_found(format!("parking {} does not exist", parking_id))
}

/// Takes one place inside an open parking transaction. `Exhausted` leaves the
/// row untouched.
pub fn reserve_in(txn: &mut dyn ParkingTxn) -> Result<Reservation> {
    let parking_id = txn.parking_id();
    let mut parking = txn.parking()?.ok_or_else(|| parking_not_found(parking_id))?;

    if parking.count_available_places == 0 {
        return Ok(Reservation::Exhausted);
    }

    parking.count_available_places -= 1;
    txn.put_parking(&parking)?;
    Ok(Reservation::Reserved {
        remaining: parking.count_available_places,
    })
}

/// Gives one place back inside an open parking transaction and returns the new
/// available count.
///
/// There is no cap at `count_places`: a release without a matching reserve
/// pushes the counter above the total.
pub fn release_in(txn: &mut dyn ParkingTxn) -> Result<u32> {
    let parking_id = txn.parking_id();
    let mut parking = txn.parking()?.ok_or_else(|| parking_not_found(parking_id))?;

    parking.count_available_places = parking.count_available_places.saturating_add(1);
    if parking.count_available_places > parking.count_places {
        tracing::warn!(
            "Parking {} now reports {} available of {} places",
            parking_id,
            parking.count_available_places,
            parking.count_places
        );
    }
    txn.put_parking(&parking)?;
    Ok(parking.count_available_places)
}

pub struct CapacityLedger<S: EntityStore> {
    store: Arc<S>,
}

impl<S: EntityStore> CapacityLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn reserve_space(&self, parking_id: ParkingId) -> Result<Reservation> {
        let reservation = self.store.in_parking_txn(parking_id, reserve_in)?;
        tracing::debug!("Reserve on parking {}: {:?}", parking_id, reservation);
        Ok(reservation)
    }

    pub fn release_space(&self, parking_id: ParkingId) -> Result<u32> {
        let available = self.store.in_parking_txn(parking_id, release_in)?;
        tracing::debug!("Release on parking {}: {} available", parking_id, available);
        Ok(available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::domain::model::ParkingDraft;

    fn ledger_with(
        places: u32,
        available: u32,
    ) -> (CapacityLedger<MemoryStore>, Arc<MemoryStore>, ParkingId) {
        let store = Arc::new(MemoryStore::new());
        let parking = store
            .insert_parking(&ParkingDraft {
                address: "ул.Пушкина, 2".to_string(),
                opened: true,
                count_places: places,
                count_available_places: available,
            })
            .unwrap();
        (CapacityLedger::new(Arc::clone(&store)), store, parking.id)
    }

    #[test]
    fn test_reserve_until_exhausted() {
        let (ledger, store, id) = ledger_with(2, 2);

        assert_eq!(ledger.reserve_space(id).unwrap(), Reservation::Reserved { remaining: 1 });
        assert_eq!(ledger.reserve_space(id).unwrap(), Reservation::Reserved { remaining: 0 });
        assert_eq!(ledger.reserve_space(id).unwrap(), Reservation::Exhausted);
        assert_eq!(store.parking(id).unwrap().unwrap().count_available_places, 0);
    }

    #[test]
    fn test_release_is_uncapped() {
        let (ledger, _store, id) = ledger_with(1, 1);

        assert_eq!(ledger.release_space(id).unwrap(), 2);
        assert_eq!(ledger.release_space(id).unwrap(), 3);
    }

    #[test]
    fn test_unknown_parking() {
        let (ledger, _store, _) = ledger_with(1, 1);

        assert!(matches!(
            ledger.reserve_space(ParkingId(7)),
            Err(ParkingError::NotFound { .. })
        ));
        assert!(matches!(
            ledger.release_space(ParkingId(7)),
            Err(ParkingError::NotFound { .. })
        ));
    }
}
