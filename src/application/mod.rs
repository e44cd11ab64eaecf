//! Application Layer
//!
//! Contains business logic services, the real-time event port and data
//! transfer objects (DTOs). This layer orchestrates the flow of data between
//! the presentation and domain layers.

pub mod dto;
pub mod events;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
