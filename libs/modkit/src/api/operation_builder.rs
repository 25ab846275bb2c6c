//! Route registration that keeps the router and the OpenAPI document in sync.
//!
//! An [`OperationBuilder`] describes one `method + path` operation and mounts
//! its handler in a single chain. The type parameters track progress:
//!
//! - `H` is [`Missing`] until [`OperationBuilder::handler`] stores a `MethodRouter<S>`
//! - `R` is [`Missing`] until the first response is declared, then [`Present`]
//!
//! [`OperationBuilder::register`] only exists once both are in place, so an
//! operation without a handler or without documented responses does not compile.

use std::marker::PhantomData;

use axum::handler::Handler;
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use http::Method;
use utoipa::openapi::{schema::Schema, RefOr};

use crate::api::problem::{Problem, APPLICATION_PROBLEM_JSON};

const APPLICATION_JSON: &str = "application/json";

/// Component schemas produced for one root type: `(component name, schema)`.
pub type SchemaCollection = Vec<(String, RefOr<Schema>)>;

/// Progress marker: the part has not been supplied yet.
#[derive(Debug, Clone, Copy)]
pub struct Missing;

/// Progress marker: at least one response has been declared.
#[derive(Debug, Clone, Copy)]
pub struct Present;

/// Path parameter; always required.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub name: String,
    pub description: Option<String>,
    /// JSON Schema type of the value ("integer", "string", ...).
    pub param_type: String,
}

#[derive(Clone, Debug)]
pub struct RequestBodySpec {
    pub content_type: &'static str,
    pub description: Option<String>,
    /// Component referenced with `$ref`.
    pub schema_name: Option<String>,
    pub required: bool,
}

#[derive(Clone, Debug)]
pub struct ResponseSpec {
    pub status: u16,
    /// `None` for responses without a body (204).
    pub content_type: Option<&'static str>,
    pub description: String,
    pub schema_name: Option<String>,
    /// Body is a JSON array of `schema_name` items.
    pub is_array: bool,
}

impl ResponseSpec {
    fn json(status: u16, description: String, schema_name: String, is_array: bool) -> Self {
        Self {
            status,
            content_type: Some(APPLICATION_JSON),
            description,
            schema_name: Some(schema_name),
            is_array,
        }
    }

    fn empty(status: u16, description: String) -> Self {
        Self {
            status,
            content_type: None,
            description,
            schema_name: None,
            is_array: false,
        }
    }

    fn problem(registry: &dyn OpenApiRegistry, status: u16, description: String) -> Self {
        Self {
            content_type: Some(APPLICATION_PROBLEM_JSON),
            schema_name: Some(ensure_schema::<Problem>(registry)),
            ..Self::empty(status, description)
        }
    }
}

/// Everything the OpenAPI generator needs to know about one operation.
#[derive(Clone, Debug)]
pub struct OperationSpec {
    pub method: Method,
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub params: Vec<ParamSpec>,
    pub request_body: Option<RequestBodySpec>,
    pub responses: Vec<ResponseSpec>,
    /// `"{method}:{path}"`; the registry rejects a second operation with the same id.
    pub handler_id: String,
}

/// Collects operations and component schemas for the OpenAPI document.
pub trait OpenApiRegistry {
    fn register_operation(&self, spec: &OperationSpec);

    /// Store `schemas` under components and return the name to `$ref` for `name`.
    fn ensure_schema_raw(&self, name: &str, schemas: SchemaCollection) -> String;
}

/// Register `T` and every schema it references; returns the component name of `T`.
pub fn ensure_schema<T>(registry: &dyn OpenApiRegistry) -> String
where
    T: utoipa::ToSchema + 'static,
{
    let name = T::name().to_string();

    // The root goes first as a full object so it never becomes a self-`$ref`.
    let mut schemas: SchemaCollection = vec![(name.clone(), T::schema())];
    T::schemas(&mut schemas);

    registry.ensure_schema_raw(&name, schemas)
}

/// Builder for a documented route. See the module docs for the type-state rules.
pub struct OperationBuilder<H, R, S> {
    spec: OperationSpec,
    handler: H,
    _response: PhantomData<R>,
    _state: PhantomData<fn() -> S>,
}

impl<S> OperationBuilder<Missing, Missing, S> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            spec: OperationSpec {
                handler_id: format!("{}:{}", method.as_str().to_ascii_lowercase(), path),
                method,
                path,
                operation_id: None,
                summary: None,
                description: None,
                tags: Vec::new(),
                params: Vec::new(),
                request_body: None,
                responses: Vec::new(),
            },
            handler: Missing,
            _response: PhantomData,
            _state: PhantomData,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }
}

impl<H, R, S> OperationBuilder<H, R, S> {
    pub fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.spec.operation_id = Some(id.into());
        self
    }

    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.spec.summary = Some(text.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.spec.description = Some(text.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.spec.tags.push(tag.into());
        self
    }

    /// Path parameter with an explicit JSON Schema type.
    pub fn path_param_typed(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        param_type: impl Into<String>,
    ) -> Self {
        self.spec.params.push(ParamSpec {
            name: name.into(),
            description: Some(description.into()),
            param_type: param_type.into(),
        });
        self
    }

    /// Required JSON request body described by `T`.
    pub fn json_request<T>(mut self, registry: &dyn OpenApiRegistry, desc: impl Into<String>) -> Self
    where
        T: utoipa::ToSchema + 'static,
    {
        self.spec.request_body = Some(RequestBodySpec {
            content_type: APPLICATION_JSON,
            description: Some(desc.into()),
            schema_name: Some(ensure_schema::<T>(registry)),
            required: true,
        });
        self
    }

    fn push_response(mut self, response: ResponseSpec) -> OperationBuilder<H, Present, S> {
        self.spec.responses.push(response);
        OperationBuilder {
            spec: self.spec,
            handler: self.handler,
            _response: PhantomData,
            _state: PhantomData,
        }
    }

    pub fn json_response_with_schema<T>(
        self,
        registry: &dyn OpenApiRegistry,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S>
    where
        T: utoipa::ToSchema + 'static,
    {
        let name = ensure_schema::<T>(registry);
        self.push_response(ResponseSpec::json(status, description.into(), name, false))
    }

    /// JSON response whose body is an array of `T`.
    pub fn json_array_response_with_schema<T>(
        self,
        registry: &dyn OpenApiRegistry,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S>
    where
        T: utoipa::ToSchema + 'static,
    {
        let name = ensure_schema::<T>(registry);
        self.push_response(ResponseSpec::json(status, description.into(), name, true))
    }

    pub fn empty_response(
        self,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S> {
        self.push_response(ResponseSpec::empty(status, description.into()))
    }

    /// `application/problem+json` error response.
    pub fn problem_response(
        self,
        registry: &dyn OpenApiRegistry,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present, S> {
        self.push_response(ResponseSpec::problem(registry, status, description.into()))
    }
}

impl<R, S> OperationBuilder<Missing, R, S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Mount `h` for the operation's method.
    pub fn handler<F, T>(self, h: F) -> OperationBuilder<MethodRouter<S>, R, S>
    where
        F: Handler<T, S>,
        T: 'static,
    {
        // Methods axum cannot filter on get an empty router (405 for everything).
        let handler = match MethodFilter::try_from(self.spec.method.clone()) {
            Ok(filter) => on(filter, h),
            Err(_) => MethodRouter::new(),
        };
        OperationBuilder {
            spec: self.spec,
            handler,
            _response: PhantomData,
            _state: PhantomData,
        }
    }
}

impl<S> OperationBuilder<MethodRouter<S>, Present, S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Describe the operation in `openapi` and mount it on `router`.
    pub fn register(self, router: Router<S>, openapi: &dyn OpenApiRegistry) -> Router<S> {
        openapi.register_operation(&self.spec);
        router.route(&self.spec.path, self.handler)
    }
}
