use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    http::StatusCode,
    response::Json,
    Extension,
};
use tracing::{error, info};

use crate::api::rest::dto::{CreateUserReq, UpdateUserReq, UserDto};
use crate::api::rest::error::{
    map_domain_error, map_json_rejection, map_path_rejection, ProblemCtx,
};
use crate::domain::service::Service;
use modkit::api::problem::ProblemResponse;

type UserId = Result<Path<u64>, PathRejection>;

fn user_id(id: UserId, ctx: &ProblemCtx) -> Result<u64, ProblemResponse> {
    id.map(|Path(id)| id)
        .map_err(|rejection| map_path_rejection(&rejection, ctx))
}

/// List all users
pub async fn list_users(
    Extension(svc): Extension<Arc<Service>>,
    ctx: ProblemCtx,
) -> Result<Json<Vec<UserDto>>, ProblemResponse> {
    info!("Listing users");

    match svc.list_users().await {
        Ok(users) => Ok(Json(users.into_iter().map(UserDto::from).collect())),
        Err(e) => {
            error!("Failed to list users: {}", e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// Get a specific user by ID
pub async fn get_user(
    Extension(svc): Extension<Arc<Service>>,
    ctx: ProblemCtx,
    id: UserId,
) -> Result<Json<UserDto>, ProblemResponse> {
    let id = user_id(id, &ctx)?;
    info!("Getting user with id: {}", id);

    match svc.get_user(id).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            error!("Failed to get user {}: {}", id, e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// Create a new user
pub async fn create_user(
    Extension(svc): Extension<Arc<Service>>,
    ctx: ProblemCtx,
    body: Result<Json<CreateUserReq>, JsonRejection>,
) -> Result<(StatusCode, Json<UserDto>), ProblemResponse> {
    let Json(req_body) = body.map_err(|r| map_json_rejection(&r, &ctx))?;
    info!("Creating user: {:?}", req_body);

    match svc.create_user(req_body.into()).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserDto::from(user)))),
        Err(e) => {
            error!("Failed to create user: {}", e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// Update an existing user
pub async fn update_user(
    Extension(svc): Extension<Arc<Service>>,
    ctx: ProblemCtx,
    id: UserId,
    body: Result<Json<UpdateUserReq>, JsonRejection>,
) -> Result<Json<UserDto>, ProblemResponse> {
    let id = user_id(id, &ctx)?;
    let Json(req_body) = body.map_err(|r| map_json_rejection(&r, &ctx))?;
    info!("Updating user {} with: {:?}", id, req_body);

    match svc.update_user(id, req_body.into()).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            error!("Failed to update user {}: {}", id, e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// Delete a user by ID
pub async fn delete_user(
    Extension(svc): Extension<Arc<Service>>,
    ctx: ProblemCtx,
    id: UserId,
) -> Result<StatusCode, ProblemResponse> {
    let id = user_id(id, &ctx)?;
    info!("Deleting user: {}", id);

    match svc.delete_user(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete user {}: {}", id, e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}
