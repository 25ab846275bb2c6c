use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::contract::model::{NewUser, User, UserPatch};

/// REST DTO for user representation with serde/utoipa
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(as = User)]
pub struct UserDto {
    /// User identifier
    #[schema(read_only)]
    pub id: u64,
    /// Username
    pub username: String,
    /// User email
    pub email: String,
    /// Creation timestamp
    #[schema(read_only)]
    pub created_at: DateTime<Utc>,
}

/// REST DTO for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserReq {
    /// Username
    pub username: String,
    /// User email
    pub email: String,
}

/// REST DTO for updating a user (partial). Unknown fields such as `id` or
/// `created_at` are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateUserReq {
    /// Username
    #[serde(default)]
    pub username: Option<String>,
    /// User email
    #[serde(default)]
    pub email: Option<String>,
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        Self {
            username: req.username,
            email: req.email,
        }
    }
}

impl From<UpdateUserReq> for UserPatch {
    fn from(req: UpdateUserReq) -> Self {
        Self {
            username: req.username,
            email: req.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_ignores_immutable_fields() {
        let req: UpdateUserReq = serde_json::from_value(serde_json::json!({
            "username": "b",
            "id": 99,
            "created_at": "2000-01-01T00:00:00Z"
        }))
        .unwrap();

        let patch = UserPatch::from(req);
        assert_eq!(patch.username.as_deref(), Some("b"));
        assert!(patch.email.is_none());
    }

    #[test]
    fn user_dto_serializes_rfc3339_timestamp() {
        let created_at = DateTime::parse_from_rfc3339("2024-05-01T12:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let dto = UserDto::from(User {
            id: 1,
            username: "a".into(),
            email: "a@x.com".into(),
            created_at,
        });

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["username"], "a");
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["created_at"], "2024-05-01T12:30:00Z");
    }

    #[test]
    fn user_schema_marks_server_fields_read_only() {
        use utoipa::{PartialSchema, ToSchema};

        assert_eq!(<UserDto as ToSchema>::name(), "User");

        let schema = serde_json::to_value(<UserDto as PartialSchema>::schema()).unwrap();
        assert_eq!(schema["properties"]["id"]["readOnly"], true);
        assert_eq!(schema["properties"]["created_at"]["readOnly"], true);
        assert_eq!(schema["properties"]["created_at"]["format"], "date-time");
        assert_eq!(schema["properties"]["email"]["description"], "User email");

        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "username"));
        assert!(required.iter().any(|r| r == "email"));
    }
}
