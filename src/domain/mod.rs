// Domain layer: records, payloads and the storage port. No business rules here.

pub mod model;
pub mod ports;
