use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(ClientId);
record_id!(ParkingId);
record_id!(SessionId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub surname: String,
    /// Opaque payment reference. Only its presence matters.
    pub credit_card: Option<String>,
    pub car_number: Option<String>,
}

impl Client {
    pub fn has_payment_method(&self) -> bool {
        self.credit_card.as_deref().is_some_and(|card| !card.is_empty())
    }

    pub fn summary(&self) -> ClientSummary {
        ClientSummary {
            id: self.id,
            name: self.name.clone(),
            surname: self.surname.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parking {
    pub id: ParkingId,
    pub address: String,
    pub opened: bool,
    pub count_places: u32,
    pub count_available_places: u32,
}

impl Parking {
    pub fn summary(&self) -> ParkingSummary {
        ParkingSummary {
            id: self.id,
            address: self.address.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Open,
    Closed,
}

/// One client's stay at one parking (table `client_parking`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub client_id: ClientId,
    pub parking_id: ParkingId,
    pub time_in: DateTime<Utc>,
    pub time_out: Option<DateTime<Utc>>,
}

impl Session {
    pub fn state(&self) -> SessionState {
        match self.time_out {
            None => SessionState::Open,
            Some(_) => SessionState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.time_out.is_none()
    }

    /// CLOSED 是終態，重複關閉不會覆寫第一次的 time_out
    pub fn close(&mut self, at: DateTime<Utc>) {
        if self.time_out.is_none() {
            self.time_out = Some(at);
        }
    }
}

/// Registration payload for a client. Every field is optional here so that a
/// missing value surfaces as a validation error instead of a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub credit_card: Option<String>,
    pub car_number: Option<String>,
}

/// Registration payload for a parking. `opened` is true when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewParking {
    pub address: Option<String>,
    pub count_places: Option<u32>,
    pub count_available_places: Option<u32>,
    pub opened: Option<bool>,
}

/// Validated client row, ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDraft {
    pub name: String,
    pub surname: String,
    pub credit_card: Option<String>,
    pub car_number: Option<String>,
}

/// Validated parking row, ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkingDraft {
    pub address: String,
    pub opened: bool,
    pub count_places: u32,
    pub count_available_places: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub id: ClientId,
    pub name: String,
    pub surname: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParkingSummary {
    pub id: ParkingId,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionTicket {
    pub client_id: ClientId,
    pub parking_id: ParkingId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutConfirmation {
    pub message: String,
    pub session: Session,
}

/// Stored counter vs. the value recomputed from open sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityAudit {
    pub parking_id: ParkingId,
    pub count_places: u32,
    pub stored_available: u32,
    pub open_sessions: u32,
    pub recomputed_available: i64,
    pub drift: i64,
}

impl CapacityAudit {
    pub fn is_consistent(&self) -> bool {
        self.drift == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_card(card: Option<&str>) -> Client {
        Client {
            id: ClientId(1),
            name: "Pchel".to_string(),
            surname: "chelov".to_string(),
            credit_card: card.map(str::to_string),
            car_number: None,
        }
    }

    #[test]
    fn test_payment_method_presence() {
        assert!(client_with_card(Some("2200150511111112")).has_payment_method());
        assert!(!client_with_card(Some("")).has_payment_method());
        assert!(!client_with_card(None).has_payment_method());
    }

    #[test]
    fn test_session_close_is_terminal() {
        let opened_at = Utc::now();
        let mut session = Session {
            id: SessionId(1),
            client_id: ClientId(1),
            parking_id: ParkingId(1),
            time_in: opened_at,
            time_out: None,
        };
        assert_eq!(session.state(), SessionState::Open);

        let first = opened_at + chrono::Duration::minutes(5);
        session.close(first);
        session.close(first + chrono::Duration::minutes(5));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.time_out, Some(first));
    }

    #[test]
    fn test_new_parking_opened_is_optional() {
        let parsed: NewParking = serde_json::from_value(serde_json::json!({
            "address": "ул.Ленина, 1",
            "count_places": 10,
            "count_available_places": 10
        }))
        .unwrap();
        assert_eq!(parsed.opened, None);
    }

    #[test]
    fn test_ids_serialize_as_numbers() {
        let ticket = SessionTicket {
            client_id: ClientId(4),
            parking_id: ParkingId(2),
        };
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json, serde_json::json!({"client_id": 4, "parking_id": 2}));
    }
}
