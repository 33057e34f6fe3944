// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::application::dto::job_request::CreateJobRequestDto;
use crate::presentation::errors::AppError;
use crate::workers::manager::JobManager;

fn job_not_found(id: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("Job {} not found", id) })),
    )
}

/// 创建并启动抓取任务
pub async fn create_job(
    Extension(manager): Extension<Arc<JobManager>>,
    Json(payload): Json<CreateJobRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let job = manager.start(&payload.url, payload.max_pages).await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// 列出所有任务（不含公司列表）
pub async fn list_jobs(
    Extension(manager): Extension<Arc<JobManager>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(manager.list().await?))
}

/// 查询任务状态
///
/// 返回的进度已按实际保存的公司列表校正。
pub async fn get_job(
    Extension(manager): Extension<Arc<JobManager>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(match manager.status(&id).await? {
        Some(job) => (StatusCode::OK, Json(job)).into_response(),
        None => job_not_found(&id).into_response(),
    })
}

/// 取消正在运行的任务
pub async fn cancel_job(
    Extension(manager): Extension<Arc<JobManager>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if manager.cancel(&id) {
        return Ok(StatusCode::ACCEPTED.into_response());
    }

    Ok(match manager.status(&id).await? {
        Some(job) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": format!("Job {} is not running ({})", id, job.status) })),
        )
            .into_response(),
        None => job_not_found(&id).into_response(),
    })
}

/// 取消并删除任务
pub async fn delete_job(
    Extension(manager): Extension<Arc<JobManager>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(if manager.delete(&id).await? {
        StatusCode::NO_CONTENT.into_response()
    } else {
        job_not_found(&id).into_response()
    })
}
