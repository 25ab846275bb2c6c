//! Users resource: an in-memory CRUD collection of users exposed over REST
//! with OpenAPI descriptions, plus a typed in-process client.

// === PUBLIC CONTRACT ===
pub mod contract;

// Re-export the public contract components
pub use contract::{client, error, model};

// === MODULE DEFINITION ===
pub mod module;
pub use module::UsersInfo;

// === INTERNAL MODULES ===
// Exposed only for tests; other crates should depend on `contract` alone.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
