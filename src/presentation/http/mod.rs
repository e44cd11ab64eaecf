//! HTTP Surface
//!
//! REST routes, their handlers and the system endpoints.

pub mod handlers;
pub mod routes;

pub use routes::create_router;
