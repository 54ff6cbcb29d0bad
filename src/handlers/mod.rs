pub mod traceability;

// Handler modules import the shared state as crate::handlers::AppState
pub use crate::AppState;
