//! # stockhub-api
//!
//! HTTP surface for StockHub's notification subsystem: the server push
//! stream, the control-plane send/list/read endpoints, and the
//! `AppError` → HTTP mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use state::AppState;
