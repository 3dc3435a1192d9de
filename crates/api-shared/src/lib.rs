//! # API Shared
//!
//! Shared request/response definitions for the rxcheck HTTP API.
//!
//! Contains:
//! - Wire DTOs (`dto` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the `rxcheck` CLI.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
