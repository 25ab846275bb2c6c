use axum::Router;

pub use crate::api::OpenApiRegistry;

/// Pure wiring; must be sync. Adds the module's routes to the shared router
/// and describes each of them in the OpenAPI registry.
pub trait RestfulModule: Send + Sync {
    fn register_rest(&self, router: Router, openapi: &dyn OpenApiRegistry)
        -> anyhow::Result<Router>;
}

/// REST host module: handles ingress hosting with prepare/finalize phases.
/// Must be sync. Runs during REST phase, but doesn't start the server.
pub trait RestHostModule: Send + Sync + 'static {
    /// Prepare a base Router (e.g., health endpoint) before modules register routes.
    /// Do NOT start the server here.
    fn rest_prepare(&self, router: Router) -> anyhow::Result<Router>;

    /// Finalize before start: attach /openapi.json, the docs page and global middleware.
    /// Do NOT start the server here.
    fn rest_finalize(&self, router: Router) -> anyhow::Result<Router>;

    // Return OpenAPI registry of the module, e.g., to register endpoints
    fn as_registry(&self) -> &dyn OpenApiRegistry;
}
