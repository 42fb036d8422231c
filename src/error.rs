use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::assistant::AssistantError;
use crate::chat::ChatError;
use crate::recipes::RecipeError;
use crate::search::SearchError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Missing x-user-email header")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("An error occurred while searching")]
    SearchUnavailable,

    #[error("Error processing request")]
    Completion,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SearchUnavailable => StatusCode::BAD_GATEWAY,
            AppError::Completion | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        match &self {
            AppError::Internal(e) => log::error!("internal error: {:#}", e),
            other if status.is_server_error() => log::error!("{other}"),
            _ => {}
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyQuery => AppError::BadRequest(err.to_string()),
            SearchError::Upstream(_) => AppError::SearchUnavailable,
        }
    }
}

impl From<AssistantError> for AppError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::EmptyMessage => AppError::BadRequest(err.to_string()),
            AssistantError::Completion(e) => {
                log::error!("assistant completion failed: {:#}", e);
                AppError::Completion
            }
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::NotFound => AppError::NotFound(err.to_string()),
            ChatError::EmptyGroupName
            | ChatError::EmptyMessage
            | ChatError::AlreadyMember
            | ChatError::NotMember => AppError::BadRequest(err.to_string()),
            ChatError::Store(e) => AppError::Internal(e),
        }
    }
}

impl From<RecipeError> for AppError {
    fn from(err: RecipeError) -> Self {
        match err {
            RecipeError::MissingFields(_)
            | RecipeError::AlreadyFavorited => AppError::BadRequest(err.to_string()),
            RecipeError::NotFound | RecipeError::UserNotFound | RecipeError::FavoriteNotFound => {
                AppError::NotFound(err.to_string())
            }
            RecipeError::Forbidden => AppError::Forbidden(err.to_string()),
            RecipeError::Store(e) => AppError::Internal(e),
        }
    }
}
