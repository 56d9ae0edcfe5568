//! # Error Handling
//!
//! Handlers return [`ApiError`], which maps to a status code and a JSON body of the
//! form `{ "error": "...", "details": [...] }`. Client mistakes (an unknown sort
//! property, an unknown field) are `400 Bad Request`; registration defects and
//! database failures are `500` and their details are logged with `tracing`
//! instead of being sent to the client.
//!
//! ```rust,ignore
//! async fn get_author(
//!     State(state): State<AppState>,
//!     Path(id): Path<Uuid>,
//! ) -> Result<Json<ShapedEntity>, ApiError> {
//!     let author = author::Entity::find_by_id(id)
//!         .one(&state.db)
//!         .await?
//!         .ok_or_else(|| ApiError::not_found("Author", Some(id.to_string())))?;
//!     let dto = AuthorDto::from(author);
//!     Ok(Json(state.engine.item(&state.links, &dto, None)?))
//! }
//! ```

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

use crate::links::LinkError;
use crate::mapping::MappingError;
use crate::shaping::ShapeError;

#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found
    NotFound {
        resource: String,
        id: Option<String>,
    },

    /// 400 Bad Request, with optional per-item details
    BadRequest {
        message: String,
        details: Vec<String>,
    },

    /// 500 Internal Server Error from a mapping registration defect
    Configuration { internal: MappingError },

    /// 500 Internal Server Error from the database (details logged, not exposed)
    Database { message: String, internal: DbErr },

    /// 500 Internal Server Error
    Internal {
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// 400 with the offending names listed under `details`.
    pub fn bad_request_with_details(message: impl Into<String>, details: Vec<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Configuration { .. } | Self::Database { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Sanitized message sent to the client.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{resource} with ID '{id}' not found"),
                None => format!("{resource} not found"),
            },
            Self::BadRequest { message, .. }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::Configuration { .. } => "An internal error occurred".to_string(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Configuration { internal } => {
                tracing::error!(error = %internal, "Property mapping misconfigured");
            }
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error body sent to clients
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let details = match &self {
            Self::BadRequest { details, .. } if !details.is_empty() => Some(details.clone()),
            _ => None,
        };
        let response = ErrorResponse {
            error: self.user_message(),
            details,
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Configuration { internal } => Some(internal),
            Self::Database { internal, .. } => Some(internal),
            _ => None,
        }
    }
}

/// `RecordNotFound` becomes 404; every other database error is a 500.
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::database(err),
        }
    }
}

impl From<MappingError> for ApiError {
    fn from(internal: MappingError) -> Self {
        Self::Configuration { internal }
    }
}

/// Unknown fields are the client's mistake; anything else means the resource type
/// and its declared properties disagree.
impl From<ShapeError> for ApiError {
    fn from(err: ShapeError) -> Self {
        match err {
            ShapeError::UnknownField { field, .. } => Self::bad_request_with_details(
                "Requested fields do not exist on this resource",
                vec![field],
            ),
            other => Self::internal("An internal error occurred", Some(other.to_string())),
        }
    }
}

impl From<LinkError> for ApiError {
    fn from(err: LinkError) -> Self {
        Self::internal("An internal error occurred", Some(err.to_string()))
    }
}
