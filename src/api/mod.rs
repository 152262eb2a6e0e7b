//! API Module
//!
//! HTTP handlers and routing for the lookup server.
//!
//! # Endpoints
//! - `POST /lookup` - Enrich an event with cached lookup results
//! - `GET /stats` - Get engine and cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
