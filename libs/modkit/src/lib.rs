//! # ModKit - module contracts and REST building blocks
//!
//! Shared pieces used by every module of the users service:
//!
//! - **Contracts**: `RestfulModule` for modules that expose routes and
//!   `RestHostModule` for the module that owns the HTTP server
//! - **Type-safe API**: `OperationBuilder` registers a route and its OpenAPI
//!   description in one go
//! - **Problem Details**: RFC 9457 error bodies via `Problem`/`ProblemResponse`
//!
//! ## Example
//!
//! ```rust,ignore
//! use modkit::{OpenApiRegistry, RestfulModule};
//!
//! impl RestfulModule for UsersInfo {
//!     fn register_rest(&self, router: axum::Router, openapi: &dyn OpenApiRegistry)
//!         -> anyhow::Result<axum::Router> { /* ... */ }
//! }
//! ```

pub use anyhow::Result;

// Core module contracts and traits
pub mod contracts;
pub use crate::contracts::*;

// Type-safe API operation builder
pub mod api;
pub use api::{OpenApiRegistry, OperationBuilder, XRequestId};

pub use api::problem::{Problem, ProblemResponse};
