use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arc_swap::ArcSwap;
use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use axum::{middleware::from_fn, routing::get, Router};
use dashmap::DashMap;
use modkit::api::{OpenApiRegistry, OperationSpec, SchemaCollection};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
mod model;
pub mod openapi;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;
use model::{ComponentsRegistry, SchemaInsert};

/// HTTP host: owns the router middleware and the server, and collects typed
/// operation specs to emit a single OpenAPI document.
pub struct ApiIngress {
    // Lock-free config using arc-swap for read-mostly access
    config: ArcSwap<ApiIngressConfig>,
    // Copy-on-write components registry
    components_registry: ArcSwap<ComponentsRegistry>,
    // Router produced by `rest_finalize`, taken by `serve`
    final_router: Mutex<Option<Router>>,

    // Duplicate detection (per (method, path) and per handler id)
    registered_routes: DashMap<(Method, String), ()>,
    registered_handlers: DashMap<String, ()>,

    // Operation specs for OpenAPI generation, keyed "METHOD:path"
    operation_specs: DashMap<String, OperationSpec>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            components_registry: ArcSwap::from_pointee(ComponentsRegistry::default()),
            final_router: Mutex::new(None),
            registered_routes: DashMap::new(),
            registered_handlers: DashMap::new(),
            operation_specs: DashMap::new(),
        }
    }

    /// Get the current configuration (cheap clone from ArcSwap)
    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    /// Number of operations accepted by the registry.
    pub fn operation_count(&self) -> usize {
        self.operation_specs.len()
    }

    /// Wrap every route registered so far in the global middleware stack.
    ///
    /// `Router::layer` wraps what is already there, so layers are added innermost first:
    /// body limit, CORS, timeout, request id into extensions, trace, propagate, set.
    pub fn apply_middleware(&self, mut router: Router) -> Router {
        let config = self.get_config();
        let x_request_id = request_id::header();

        router = router.layer(RequestBodyLimitLayer::new(config.body_limit_bytes));

        if config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }

        router = router
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.request_timeout_sec),
            ))
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            // Copies x-request-id from the request onto the response
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            // Generates x-request-id when the client sent none
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId));

        router
    }

    /// Build the OpenAPI document from registered operations and components.
    pub fn build_openapi(&self) -> Result<openapi::OpenApi> {
        let config = self.get_config();
        let components = self.components_registry.load();

        let specs: Vec<OperationSpec> = self
            .operation_specs
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tracing::info!(
            operations = specs.len(),
            schemas = components.schemas.len(),
            "Building OpenAPI document"
        );

        let info = openapi::OpenApiInfo {
            title: config.title,
            version: config.version,
            description: Some(config.description).filter(|d| !d.is_empty()),
        };

        Ok(openapi::build_document(info, &specs, &components)?)
    }

    /// Take the router produced by `rest_finalize`; falls back to a bare
    /// host router (health only) when finalize never ran.
    fn take_router(&self) -> Router {
        let stored = { self.final_router.lock().take() };
        match stored {
            Some(router) => router,
            None => {
                tracing::debug!("No finalized router, serving health endpoint only");
                self.apply_middleware(Router::new().route("/health", get(web::health_check)))
            }
        }
    }

    /// Bind `addr` and serve until `cancel` fires.
    pub async fn serve(&self, addr: &str, cancel: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind '{}': {}", addr, e))?;
        self.serve_with_listener(listener, cancel).await
    }

    /// Serve on an already bound listener until `cancel` fires.
    pub async fn serve_with_listener(
        &self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<()> {
        let router = self.take_router();
        tracing::info!("HTTP server bound on {}", listener.local_addr()?);

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}

// REST host role: prepare/finalize the router, but do not start the server here.
impl modkit::contracts::RestHostModule for ApiIngress {
    fn rest_prepare(&self, router: Router) -> Result<Router> {
        let router = router.route("/health", get(web::health_check));
        tracing::debug!("REST host prepared base router with health check");
        Ok(router)
    }

    fn rest_finalize(&self, mut router: Router) -> Result<Router> {
        let config = self.get_config();

        if config.enable_docs {
            config.validate()?;

            // Build once, serve as static JSON (no per-request rebuild)
            let openapi_value = Arc::new(serde_json::to_value(self.build_openapi()?)?);

            router = router
                .route(
                    "/openapi.json",
                    get(move || {
                        let v = openapi_value.clone();
                        async move {
                            (
                                [(header::CACHE_CONTROL, "no-store")],
                                axum::Json((*v).clone()),
                            )
                                .into_response()
                        }
                    }),
                )
                .route(&config.docs_path, get(web::serve_docs));
            tracing::info!(docs_path = %config.docs_path, "API docs enabled");
        }

        let router = self.apply_middleware(router);

        // Keep the finalized router to be used by `serve()`
        *self.final_router.lock() = Some(router.clone());

        tracing::debug!("REST host finalized router");
        Ok(router)
    }

    fn as_registry(&self) -> &dyn OpenApiRegistry {
        self
    }
}

impl OpenApiRegistry for ApiIngress {
    fn register_operation(&self, spec: &OperationSpec) {
        // Reject duplicates with "first wins" policy (second registration = programmer error).
        if self
            .registered_handlers
            .insert(spec.handler_id.clone(), ())
            .is_some()
        {
            tracing::error!(
                handler_id = %spec.handler_id,
                method = %spec.method.as_str(),
                path = %spec.path,
                "Duplicate handler_id detected; ignoring subsequent registration"
            );
            return;
        }

        let route_key = (spec.method.clone(), spec.path.clone());
        if self.registered_routes.insert(route_key, ()).is_some() {
            tracing::error!(
                method = %spec.method.as_str(),
                path = %spec.path,
                "Duplicate (method, path) detected; ignoring subsequent registration"
            );
            return;
        }

        let operation_key = format!("{}:{}", spec.method.as_str(), spec.path);
        self.operation_specs.insert(operation_key, spec.clone());

        tracing::debug!(
            handler_id = %spec.handler_id,
            method = %spec.method.as_str(),
            path = %spec.path,
            total_operations = self.operation_specs.len(),
            "Registered API operation"
        );
    }

    fn ensure_schema_raw(&self, name: &str, schemas: SchemaCollection) -> String {
        // Snapshot current registry, copy-on-write
        let current = self.components_registry.load();
        let mut reg = (**current).clone();

        for (key, schema) in schemas {
            match reg.register_schema(key.clone(), schema) {
                SchemaInsert::Inserted => {
                    tracing::debug!(root = %name, schema = %key, "Registered schema")
                }
                SchemaInsert::Identical => {}
                SchemaInsert::Conflict => tracing::error!(
                    root = %name,
                    schema = %key,
                    "Conflicting schema content under the same component key; keeping the first"
                ),
            }
        }

        self.components_registry.store(Arc::new(reg));
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modkit::api::ResponseSpec;
    use modkit::RestHostModule;

    fn spec(method: Method, path: &str, handler_id: &str) -> OperationSpec {
        OperationSpec {
            method,
            path: path.into(),
            operation_id: None,
            summary: Some("op".into()),
            description: None,
            tags: vec![],
            params: vec![],
            request_body: None,
            responses: vec![ResponseSpec {
                status: 200,
                content_type: Some("application/json"),
                description: "ok".into(),
                schema_name: None,
                is_array: false,
            }],
            handler_id: handler_id.into(),
        }
    }

    #[test]
    fn duplicate_registrations_keep_the_first() {
        let ingress = ApiIngress::default();

        ingress.register_operation(&spec(Method::GET, "/a", "h1"));
        // same handler id
        ingress.register_operation(&spec(Method::POST, "/b", "h1"));
        // same method + path
        ingress.register_operation(&spec(Method::GET, "/a", "h2"));
        ingress.register_operation(&spec(Method::DELETE, "/a", "h3"));

        assert_eq!(ingress.operation_count(), 2);

        let doc = serde_json::to_value(ingress.build_openapi().unwrap()).unwrap();
        assert!(doc["paths"]["/a"]["get"].is_object());
        assert!(doc["paths"]["/a"]["delete"].is_object());
        assert!(doc["paths"].get("/b").is_none());
    }

    #[test]
    fn finalize_rejects_unusable_docs_paths() {
        for bad in ["swagger", "/health", "/openapi.json"] {
            let ingress = ApiIngress::new(ApiIngressConfig {
                docs_path: bad.into(),
                ..Default::default()
            });
            let router = ingress.rest_prepare(Router::new()).unwrap();
            let err = ingress.rest_finalize(router).unwrap_err();
            assert!(err.to_string().contains(bad), "{err}");
        }
    }

    #[test]
    fn docs_path_is_not_checked_when_docs_are_off() {
        let ingress = ApiIngress::new(ApiIngressConfig {
            enable_docs: false,
            docs_path: "swagger".into(),
            ..Default::default()
        });
        let router = ingress.rest_prepare(Router::new()).unwrap();
        assert!(ingress.rest_finalize(router).is_ok());
    }

    #[test]
    fn info_comes_from_config() {
        let ingress = ApiIngress::new(ApiIngressConfig {
            title: "Users".into(),
            version: "2.0".into(),
            description: String::new(),
            ..Default::default()
        });
        let doc = serde_json::to_value(ingress.build_openapi().unwrap()).unwrap();
        assert_eq!(doc["info"]["title"], "Users");
        assert_eq!(doc["info"]["version"], "2.0");
        assert!(doc["info"].get("description").is_none());
    }
}
