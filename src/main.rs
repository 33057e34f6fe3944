// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use leadrs::application::use_cases::import_use_case::ImportUseCase;
use leadrs::config::settings::{JobStoreBackend, Settings};
use leadrs::domain::repositories::job_repository::JobRepository;
use leadrs::domain::services::crm_gateway::CrmGateway;
use leadrs::domain::services::duplicate_service::DuplicateService;
use leadrs::domain::services::import_service::{BatchImporter, ImportOptions};
use leadrs::domain::services::pacing::PacingController;
use leadrs::engines::registry_extractor::{ExtractorSelectors, RegistryHtmlExtractor};
use leadrs::engines::reqwest_engine::RegistryFetcher;
use leadrs::infrastructure::cache::redis_client::RedisClient;
use leadrs::infrastructure::crm::http_gateway::HttpCrmGateway;
use leadrs::infrastructure::repositories::memory_job_repo::MemoryJobRepository;
use leadrs::infrastructure::repositories::redis_job_repo::RedisJobRepository;
use leadrs::presentation::routes;
use leadrs::workers::manager::JobManager;
use leadrs::workers::scrape_worker::ScrapeWorker;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use leadrs::utils::telemetry;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting leadrs...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    leadrs::infrastructure::metrics::init_metrics(settings.metrics.listen_addr.as_deref());

    // 3. Job store
    let repository: Arc<dyn JobRepository> = match settings.job_store.backend {
        JobStoreBackend::Redis => {
            let redis_client = RedisClient::new(&settings.redis.url).await?;
            redis_client.ping().await?;
            info!("Redis job store connected");
            Arc::new(RedisJobRepository::new(
                redis_client,
                settings.redis.key_prefix.clone(),
            ))
        }
        JobStoreBackend::Memory => {
            warn!("Using in-memory job store, jobs are lost on restart");
            Arc::new(MemoryJobRepository::new())
        }
    };

    // 4. Registry fetcher
    let extractor = Arc::new(RegistryHtmlExtractor::new(&ExtractorSelectors::default())?);
    let fetcher = Arc::new(RegistryFetcher::new(&settings.registry, extractor)?);
    let worker = ScrapeWorker::new(
        fetcher,
        repository.clone(),
        PacingController::new(settings.pacing.clone()),
    );
    let manager = Arc::new(JobManager::new(
        worker,
        repository,
        settings.registry.page_size,
    ));

    // 5. CRM
    if settings.crm.api_token.trim().is_empty() {
        warn!("CRM API token is not configured, duplicate checks and imports will fail");
    }
    let gateway: Arc<dyn CrmGateway> = Arc::new(HttpCrmGateway::new(&settings.crm)?);
    let import_use_case = Arc::new(ImportUseCase::new(
        manager.clone(),
        DuplicateService::new(gateway.clone()),
        BatchImporter::new(gateway, ImportOptions::from_settings(&settings.crm)),
        settings.crm.registry_id_field.clone(),
        settings.crm.source_url_field.clone(),
    ));

    // 6. Start HTTP server
    let app = routes::routes(manager.clone(), import_use_case);
    let addr = settings.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 7. Stop running jobs
    manager.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }
}
