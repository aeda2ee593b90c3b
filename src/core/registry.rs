use crate::domain::model::{Client, ClientDraft, NewClient, NewParking, Parking, ParkingDraft};
use crate::domain::ports::EntityStore;
use crate::utils::error::{ParkingError, Result};
use crate::utils::validation::{required_text, validate_required_field};
use std::sync::Arc;

impl TryFrom<NewClient> for ClientDraft {
    type Error = ParkingError;

    fn try_from(input: NewClient) -> Result<Self> {
        Ok(Self {
            name: required_text("name", &input.name)?,
            surname: required_text("surname", &input.surname)?,
            credit_card: input.credit_card,
            car_number: input.car_number,
        })
    }
}

impl TryFrom<NewParking> for ParkingDraft {
    type Error = ParkingError;

    fn try_from(input: NewParking) -> Result<Self> {
        Ok(Self {
            address: required_text("address", &input.address)?,
            count_places: *validate_required_field("count_places", &input.count_places)?,
            count_available_places: *validate_required_field(
                "count_available_places",
                &input.count_available_places,
            )?,
            opened: input.opened.unwrap_or(true),
        })
    }
}

/// 註冊客戶與停車場，欄位驗證後寫入存儲
pub struct Registry<S: EntityStore> {
    store: Arc<S>,
}

impl<S: EntityStore> Registry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create_client(&self, input: NewClient) -> Result<Client> {
        let draft = ClientDraft::try_from(input)?;
        let client = self.store.insert_client(&draft)?;
        tracing::info!("👤 Registered client {}", client.id);
        Ok(client)
    }

    pub fn create_parking(&self, input: NewParking) -> Result<Parking> {
        let draft = ParkingDraft::try_from(input)?;
        if draft.count_available_places > draft.count_places {
            tracing::warn!(
                "Parking at {} registered with {} available of {} places",
                draft.address,
                draft.count_available_places,
                draft.count_places
            );
        }
        let parking = self.store.insert_parking(&draft)?;
        tracing::info!("🅿️ Registered parking {} ({})", parking.id, parking.address);
        Ok(parking)
    }
}
