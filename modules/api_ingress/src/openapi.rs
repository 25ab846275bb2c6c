//! Assembly of the OpenAPI document from registered operation specs and
//! component schemas.

use std::collections::BTreeMap;

use modkit::api::{OperationSpec, ParamSpec, RequestBodySpec, ResponseSpec};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::model::ComponentsRegistry;

/// OpenAPI dialect emitted; utoipa 5 schemas serialize as 3.1 JSON Schema.
pub const OPENAPI_VERSION: &str = "3.1.0";

#[derive(Debug, Serialize)]
pub struct OpenApi {
    pub openapi: &'static str,
    pub info: OpenApiInfo,
    pub paths: BTreeMap<String, BTreeMap<String, Value>>,
    pub components: OpenApiComponents,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenApiInfo {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct OpenApiComponents {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Value>,
}

impl OpenApiComponents {
    pub fn from_registry(registry: &ComponentsRegistry) -> serde_json::Result<Self> {
        let schemas = registry
            .schemas
            .iter()
            .map(|(name, schema)| Ok((name.clone(), serde_json::to_value(schema)?)))
            .collect::<serde_json::Result<_>>()?;
        Ok(Self { schemas })
    }
}

/// Build the full document. Operations are keyed by path, then by lowercase method.
pub fn build_document<'a>(
    info: OpenApiInfo,
    specs: impl IntoIterator<Item = &'a OperationSpec>,
    components: &ComponentsRegistry,
) -> serde_json::Result<OpenApi> {
    let mut paths: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    for spec in specs {
        paths
            .entry(spec.path.clone())
            .or_default()
            .insert(spec.method.as_str().to_lowercase(), operation_object(spec, components));
    }

    Ok(OpenApi {
        openapi: OPENAPI_VERSION,
        info,
        paths,
        components: OpenApiComponents::from_registry(components)?,
    })
}

fn operation_object(spec: &OperationSpec, components: &ComponentsRegistry) -> Value {
    let mut op = Map::new();

    let op_id = spec
        .operation_id
        .clone()
        .unwrap_or_else(|| spec.handler_id.clone());
    op.insert("operationId".into(), Value::String(op_id));

    if let Some(summary) = &spec.summary {
        op.insert("summary".into(), Value::String(summary.clone()));
    }
    if let Some(description) = &spec.description {
        op.insert("description".into(), Value::String(description.clone()));
    }
    if !spec.tags.is_empty() {
        op.insert("tags".into(), json!(spec.tags));
    }
    if !spec.params.is_empty() {
        let params = spec.params.iter().map(parameter_object).collect();
        op.insert("parameters".into(), Value::Array(params));
    }
    if let Some(body) = &spec.request_body {
        op.insert("requestBody".into(), request_body_object(body, components));
    }

    let responses = spec
        .responses
        .iter()
        .map(|r| (r.status.to_string(), response_object(r, components)))
        .collect::<Map<_, _>>();
    op.insert("responses".into(), Value::Object(responses));

    Value::Object(op)
}

fn parameter_object(param: &ParamSpec) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), Value::String(param.name.clone()));
    obj.insert("in".into(), Value::String("path".into()));
    // Path parameters are always required in OpenAPI.
    obj.insert("required".into(), Value::Bool(true));
    if let Some(description) = &param.description {
        obj.insert("description".into(), Value::String(description.clone()));
    }
    obj.insert("schema".into(), json!({ "type": param.param_type }));
    Value::Object(obj)
}

fn request_body_object(body: &RequestBodySpec, components: &ComponentsRegistry) -> Value {
    let mut obj = Map::new();
    if let Some(description) = &body.description {
        obj.insert("description".into(), Value::String(description.clone()));
    }
    obj.insert("required".into(), Value::Bool(body.required));
    obj.insert(
        "content".into(),
        content_object(
            components,
            body.content_type,
            body.schema_name.as_deref(),
            false,
        ),
    );
    Value::Object(obj)
}

fn response_object(resp: &ResponseSpec, components: &ComponentsRegistry) -> Value {
    let mut obj = Map::new();
    obj.insert("description".into(), Value::String(resp.description.clone()));
    // Bodyless responses (e.g. 204) carry no content map.
    if let Some(content_type) = resp.content_type {
        obj.insert(
            "content".into(),
            content_object(
                components,
                content_type,
                resp.schema_name.as_deref(),
                resp.is_array,
            ),
        );
    }
    Value::Object(obj)
}

fn content_object(
    components: &ComponentsRegistry,
    content_type: &str,
    schema_name: Option<&str>,
    is_array: bool,
) -> Value {
    let schema = schema_value(components, content_type, schema_name);
    let schema = if is_array {
        json!({ "type": "array", "items": schema })
    } else {
        schema
    };
    json!({ content_type: { "schema": schema } })
}

/// `$ref` into components when the schema is known, otherwise a minimal inline
/// schema derived from the content type.
fn schema_value(components: &ComponentsRegistry, content_type: &str, schema_name: Option<&str>) -> Value {
    if let Some(name) = schema_name {
        if components.has_schema(name) {
            return json!({ "$ref": format!("#/components/schemas/{name}") });
        }
        tracing::warn!(schema = %name, "schema referenced but not registered; emitting inline schema");
    }
    match content_type {
        "application/json" | "application/problem+json" => json!({ "type": "object" }),
        "text/plain" | "text/html" => json!({ "type": "string" }),
        _ => json!({}),
    }
}
