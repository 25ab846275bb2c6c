use std::sync::Arc;

use axum::{Extension, Router};
use modkit::api::{OpenApiRegistry, OperationBuilder};

use crate::api::rest::dto::{CreateUserReq, UpdateUserReq, UserDto};
use crate::api::rest::handlers;
use crate::domain::service::Service;

pub const USERS_PATH: &str = "/api/users";
pub const USER_PATH: &str = "/api/users/{id}";

pub fn register_routes(
    mut router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
) -> anyhow::Result<Router> {
    // GET /api/users - List all users
    router = OperationBuilder::get(USERS_PATH)
        .operation_id("users_info.list_users")
        .summary("List all users")
        .description("Get all users profile")
        .tag("users")
        .json_array_response_with_schema::<UserDto>(openapi, 200, "List of users")
        .problem_response(openapi, 500, "Internal server error")
        .handler(handlers::list_users)
        .register(router, openapi);

    // POST /api/users - Create a new user
    router = OperationBuilder::post(USERS_PATH)
        .operation_id("users_info.create_user")
        .summary("Create a new user")
        .description("Create new user")
        .tag("users")
        .json_request::<CreateUserReq>(openapi, "User creation data")
        .json_response_with_schema::<UserDto>(openapi, 201, "Created user")
        .problem_response(openapi, 400, "Malformed body or missing fields")
        .problem_response(openapi, 415, "Content type is not application/json")
        .problem_response(openapi, 500, "Internal server error")
        .handler(handlers::create_user)
        .register(router, openapi);

    // GET /api/users/{id} - Fetch a user by ID
    router = OperationBuilder::get(USER_PATH)
        .operation_id("users_info.get_user")
        .summary("Fetch a user by ID")
        .description("Get a specific user by ID")
        .tag("users")
        .path_param_typed("id", "The user identifier", "integer")
        .json_response_with_schema::<UserDto>(openapi, 200, "User found")
        .problem_response(openapi, 404, "User not found")
        .problem_response(openapi, 500, "Internal server error")
        .handler(handlers::get_user)
        .register(router, openapi);

    // PUT /api/users/{id} - Update a user
    router = OperationBuilder::put(USER_PATH)
        .operation_id("users_info.update_user")
        .summary("Update a user")
        .description("Update user profile by giving updated informations and ID")
        .tag("users")
        .path_param_typed("id", "The user identifier", "integer")
        .json_request::<UpdateUserReq>(openapi, "Fields to change")
        .json_response_with_schema::<UserDto>(openapi, 200, "Updated user")
        .problem_response(openapi, 400, "Malformed body")
        .problem_response(openapi, 404, "User not found")
        .problem_response(openapi, 415, "Content type is not application/json")
        .problem_response(openapi, 500, "Internal server error")
        .handler(handlers::update_user)
        .register(router, openapi);

    // DELETE /api/users/{id} - Delete a user
    router = OperationBuilder::delete(USER_PATH)
        .operation_id("users_info.delete_user")
        .summary("Delete a user")
        .description("Delete a specific user by ID")
        .tag("users")
        .path_param_typed("id", "The user identifier", "integer")
        .empty_response(204, "User deleted")
        .problem_response(openapi, 404, "User not found")
        .problem_response(openapi, 500, "Internal server error")
        .handler(handlers::delete_user)
        .register(router, openapi);

    router = router.layer(Extension(service));

    Ok(router)
}
