use std::sync::Arc;

use modkit::api::OpenApiRegistry;
use modkit::RestfulModule;
use tracing::info;

use crate::api::rest::routes;
use crate::contract::client::UsersInfoApi;
use crate::domain::service::Service;
use crate::gateways::local::UsersInfoLocalClient;
use crate::infra::storage::InMemoryUsersRepository;

/// The users resource: wires the in-memory store into the domain service and
/// exposes it over REST and as an in-process client.
#[derive(Clone)]
pub struct UsersInfo {
    service: Arc<Service>,
}

impl Default for UsersInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl UsersInfo {
    /// Module backed by a fresh, empty in-memory store.
    pub fn new() -> Self {
        info!("Initializing users_info module");
        let repo = InMemoryUsersRepository::new();
        Self {
            service: Arc::new(Service::new(Arc::new(repo))),
        }
    }

    /// Local in-process client sharing this module's store.
    pub fn client(&self) -> Arc<dyn UsersInfoApi> {
        Arc::new(UsersInfoLocalClient::new(self.service.clone()))
    }
}

impl RestfulModule for UsersInfo {
    fn register_rest(
        &self,
        router: axum::Router,
        openapi: &dyn OpenApiRegistry,
    ) -> anyhow::Result<axum::Router> {
        info!("Registering users_info REST routes");
        let router = routes::register_routes(router, openapi, self.service.clone())?;
        info!("Users REST routes registered successfully");
        Ok(router)
    }
}
