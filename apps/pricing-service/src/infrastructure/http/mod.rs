//! HTTP/REST API adapter.
//!
//! Inbound adapter exposing the batch lifecycle and price queries as REST
//! endpoints, plus health and metrics endpoints.

mod controller;
mod error;
mod request;
mod response;
mod server;

pub use controller::{AppState, create_router};
pub use error::{ApiError, BATCH_NOT_FOUND_MESSAGE, PRICE_NOT_FOUND_MESSAGE};
pub use request::{PriceDataChunk, PriceEntryRequest};
pub use response::*;
pub use server::{HttpServer, ServerError};
