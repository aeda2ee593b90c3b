pub mod simulation;

pub use simulation::{simulate_arrivals, Rejection, SimulationReport};
