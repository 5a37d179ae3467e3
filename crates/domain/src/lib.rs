pub mod entities;
pub mod repositories;
pub mod search;

pub use entities::*;
pub use repositories::*;
pub use search::*;
pub use telemetry_errors::{TelemetryError, TelemetryResult};
