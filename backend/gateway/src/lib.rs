//! receiptforge HTTP gateway
//!
//! Upload form, upload handling, the receipts table, file retrieval, and a
//! small JSON API.

pub mod api;
pub mod error;
pub mod pages;
pub mod receipts;
pub mod server;
pub mod upload;

pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState};
