// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::application::use_cases::import_use_case::ImportUseCaseError;
use crate::domain::repositories::job_repository::RepositoryError;
use crate::domain::services::import_service::ImportError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，提供统一的错误处理接口
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(err) = self.0.downcast_ref::<ImportUseCaseError>() {
            return match err {
                ImportUseCaseError::ValidationError(_) => StatusCode::BAD_REQUEST,
                ImportUseCaseError::NotFound => StatusCode::NOT_FOUND,
                ImportUseCaseError::NotReady { .. } => StatusCode::CONFLICT,
                ImportUseCaseError::Import(ImportError::Schema(_)) => StatusCode::CONFLICT,
                ImportUseCaseError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
                ImportUseCaseError::Repository(_) | ImportUseCaseError::Crm(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
        }
        if self.0.downcast_ref::<validator::ValidationErrors>().is_some() {
            return StatusCode::BAD_REQUEST;
        }
        match self.0.downcast_ref::<RepositoryError>() {
            Some(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.0);
        }

        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
