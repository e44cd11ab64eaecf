//! # Chat App Server Library
//!
//! Real-time chat backend with:
//! - One-to-one and group chats with admin-controlled membership
//! - Messages with file attachments and cascade deletion
//! - A WebSocket gateway fanning chat events out to connected users
//! - PostgreSQL or in-memory entity storage
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities, repository traits and the read projection
//! - **Application Layer**: Chat and message services, events, DTOs
//! - **Infrastructure Layer**: PostgreSQL, in-memory store, file storage, metrics
//! - **Presentation Layer**: HTTP handlers and WebSocket gateway
//!
//! ## Module Structure
//!
//! ```text
//! chat_app_server/
//! +-- config/         Configuration management
//! +-- domain/         Entities, projections, membership rules
//! +-- application/    Services, events and DTOs
//! +-- infrastructure/ Storage backends and metrics
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- shared/         Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
