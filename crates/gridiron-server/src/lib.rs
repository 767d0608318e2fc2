// Web layer: axum router and handlers over the gridiron record store.

pub mod api;

pub use api::{router, ApiError, AppState};
