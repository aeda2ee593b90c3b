use crate::core::engine::ParkingEngine;
use crate::domain::model::{ClientId, ParkingId};
use crate::domain::ports::EntityStore;
use crate::utils::error::{ErrorKind, ParkingError, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub client_id: ClientId,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub parking_id: ParkingId,
    pub admitted: Vec<ClientId>,
    pub rejected: Vec<Rejection>,
    pub available_after: u32,
}

impl SimulationReport {
    pub fn rejected_with(&self, kind: ErrorKind) -> usize {
        self.rejected.iter().filter(|r| r.kind == kind).count()
    }
}

fn task_failure(e: impl std::fmt::Display) -> ParkingError {
    ParkingError::ProcessingError {
        message: format!("check-in task failed: {}", e),
    }
}

/// Fires one check-in per client at the same parking, at most
/// `concurrent_requests` in flight. Storage calls run on the blocking pool.
pub async fn simulate_arrivals<S: EntityStore + 'static>(
    engine: &ParkingEngine<S>,
    parking_id: ParkingId,
    clients: &[ClientId],
    concurrent_requests: usize,
) -> Result<SimulationReport> {
    tracing::info!(
        "🚦 Simulating {} arrivals at parking {} ({} in flight)",
        clients.len(),
        parking_id,
        concurrent_requests
    );

    let permits = Arc::new(Semaphore::new(concurrent_requests.max(1)));
    let mut tasks = JoinSet::new();

    for &client_id in clients {
        let engine = engine.clone();
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.map_err(task_failure)?;
            let outcome =
                tokio::task::spawn_blocking(move || engine.start_session(client_id, parking_id))
                    .await
                    .map_err(task_failure)?;
            Ok::<_, ParkingError>((client_id, outcome))
        });
    }

    let mut admitted = Vec::new();
    let mut rejected = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (client_id, outcome) = joined.map_err(task_failure)??;
        match outcome {
            Ok(_) => admitted.push(client_id),
            Err(e) => rejected.push(Rejection {
                client_id,
                kind: e.kind(),
                message: e.to_string(),
            }),
        }
    }
    admitted.sort();
    rejected.sort_by_key(|r| r.client_id);

    let available_after = engine.get_parking(parking_id)?.count_available_places;
    tracing::info!(
        "📊 Parking {}: {} admitted, {} rejected, {} places left",
        parking_id,
        admitted.len(),
        rejected.len(),
        available_after
    );

    Ok(SimulationReport {
        parking_id,
        admitted,
        rejected,
        available_after,
    })
}
