use std::convert::Infallible;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::{request::Parts, StatusCode};
use axum::Extension;
use modkit::api::problem::{Problem, ProblemResponse};
use modkit::XRequestId;

use crate::domain::error::DomainError;

pub const CODE_NOT_FOUND: &str = "USERS_NOT_FOUND";
pub const CODE_INVALID_BODY: &str = "USERS_INVALID_BODY";
pub const CODE_UNSUPPORTED_MEDIA_TYPE: &str = "USERS_UNSUPPORTED_MEDIA_TYPE";
pub const CODE_INTERNAL: &str = "USERS_INTERNAL";

/// Where a problem occurred: request path plus the id assigned by the HTTP host.
#[derive(Debug, Clone, Default)]
pub struct ProblemCtx {
    pub instance: String,
    pub request_id: Option<String>,
}

impl<S> FromRequestParts<S> for ProblemCtx
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_id =
            <Extension<XRequestId> as OptionalFromRequestParts<S>>::from_request_parts(parts, state)
                .await?
                .map(|Extension(XRequestId(id))| id);

        Ok(Self {
            instance: parts.uri.path().to_string(),
            request_id,
        })
    }
}

/// Helper to create a ProblemResponse with less boilerplate
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    ctx: &ProblemCtx,
) -> ProblemResponse {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.example.com/{}", code))
        .with_code(code)
        .with_instance(ctx.instance.clone());

    let problem = match &ctx.request_id {
        Some(id) => problem.with_request_id(id.clone()),
        None => problem,
    };

    ProblemResponse(problem)
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, ctx: &ProblemCtx) -> ProblemResponse {
    match e {
        DomainError::UserNotFound { .. } => from_parts(
            StatusCode::NOT_FOUND,
            CODE_NOT_FOUND,
            "User not found",
            e.to_string(),
            ctx,
        ),
        DomainError::Storage { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Storage error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                CODE_INTERNAL,
                "Internal error",
                "An internal storage error occurred",
                ctx,
            )
        }
    }
}

/// Map a JSON body rejection: a missing JSON content type is 415, anything
/// else wrong with the body is 400 (oversized bodies keep their own status).
pub fn map_json_rejection(rejection: &JsonRejection, ctx: &ProblemCtx) -> ProblemResponse {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => from_parts(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            CODE_UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type",
            rejection.body_text(),
            ctx,
        ),
        JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => from_parts(
            StatusCode::BAD_REQUEST,
            CODE_INVALID_BODY,
            "Invalid request body",
            rejection.body_text(),
            ctx,
        ),
        _ => {
            let status = match rejection.status() {
                s if s.is_client_error() => s,
                _ => StatusCode::BAD_REQUEST,
            };
            from_parts(
                status,
                CODE_INVALID_BODY,
                "Invalid request body",
                rejection.body_text(),
                ctx,
            )
        }
    }
}

/// A path segment that is not a valid user id addresses no user.
pub fn map_path_rejection(rejection: &PathRejection, ctx: &ProblemCtx) -> ProblemResponse {
    tracing::debug!(error = %rejection.body_text(), "Unparseable user id in path");
    from_parts(
        StatusCode::NOT_FOUND,
        CODE_NOT_FOUND,
        "User not found",
        format!("User {} doesn't exist", raw_id(&ctx.instance)),
        ctx,
    )
}

fn raw_id(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
