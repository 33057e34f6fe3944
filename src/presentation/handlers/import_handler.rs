// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::application::dto::import_request::{ImportRequestDto, UpdateMatchesRequestDto};
use crate::application::use_cases::import_use_case::ImportUseCase;
use crate::presentation::errors::AppError;

/// 对任务中的公司做重复检查
///
/// 结果中完全匹配在前，模糊匹配按相似度降序。
pub async fn check_duplicates(
    Extension(use_case): Extension<Arc<ImportUseCase>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(use_case.check_duplicates(&id).await?))
}

/// 按注册号查找CRM中的公司
pub async fn find_by_registry_id(
    Extension(use_case): Extension<Arc<ImportUseCase>>,
    Path(registry_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(use_case.find_by_registry_id(&registry_id).await?))
}

/// 将任务中的公司导入CRM
pub async fn import_job(
    Extension(use_case): Extension<Arc<ImportUseCase>>,
    Path(id): Path<String>,
    Json(payload): Json<ImportRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(use_case.import(&id, payload).await?))
}

/// 更新注册号完全匹配的CRM记录
pub async fn update_matches(
    Extension(use_case): Extension<Arc<ImportUseCase>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMatchesRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(use_case.update_matches(&id, payload).await?))
}
