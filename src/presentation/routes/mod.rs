// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::import_use_case::ImportUseCase;
use crate::presentation::handlers::{import_handler, job_handler};
use crate::workers::manager::JobManager;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(manager: Arc<JobManager>, import: Arc<ImportUseCase>) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let api_routes = Router::new()
        .route(
            "/v1/jobs",
            post(job_handler::create_job).get(job_handler::list_jobs),
        )
        .route(
            "/v1/jobs/{id}",
            get(job_handler::get_job).delete(job_handler::delete_job),
        )
        .route("/v1/jobs/{id}/cancel", post(job_handler::cancel_job))
        .route(
            "/v1/jobs/{id}/duplicates",
            post(import_handler::check_duplicates),
        )
        .route("/v1/jobs/{id}/import", post(import_handler::import_job))
        .route(
            "/v1/jobs/{id}/update-matches",
            post(import_handler::update_matches),
        )
        .route(
            "/v1/duplicates/{registry_id}",
            get(import_handler::find_by_registry_id),
        );

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(Extension(manager))
        .layer(Extension(import))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
