//! REST building blocks: the documented route builder and RFC 9457 problems.

pub mod operation_builder;
pub mod problem;

pub use operation_builder::{
    ensure_schema, Missing, OpenApiRegistry, OperationBuilder, OperationSpec, ParamSpec, Present,
    RequestBodySpec, ResponseSpec, SchemaCollection,
};

/// Request id assigned by the HTTP host (propagated from or written to `x-request-id`).
///
/// The ingress stores it in request extensions so handlers can attach it to
/// problem responses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XRequestId(pub String);
