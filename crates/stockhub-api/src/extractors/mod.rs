//! Request extractors.

pub mod auth;
pub mod pagination;

pub use auth::AuthIdentity;
pub use pagination::PaginationParams;
