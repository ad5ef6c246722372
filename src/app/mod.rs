// ==========================================
// College ERP - Application layer
// ==========================================
// State wiring plus the axum HTTP surface.
// ==========================================

pub mod routes;
pub mod server;
pub mod state;

pub use routes::api_router;
pub use server::{build_app, serve};
pub use state::{AppState, SharedState};
