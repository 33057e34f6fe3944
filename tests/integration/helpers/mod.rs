// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::Router;
use axum_test::TestServer;
use leadrs::application::use_cases::import_use_case::ImportUseCase;
use leadrs::config::settings::{CrmSettings, RegistrySettings};
use leadrs::domain::services::crm_gateway::CrmGateway;
use leadrs::domain::services::duplicate_service::DuplicateService;
use leadrs::domain::services::import_service::{BatchImporter, ImportOptions};
use leadrs::domain::services::pacing::PacingController;
use leadrs::engines::registry_extractor::{ExtractorSelectors, RegistryHtmlExtractor};
use leadrs::engines::reqwest_engine::RegistryFetcher;
use leadrs::infrastructure::crm::http_gateway::HttpCrmGateway;
use leadrs::infrastructure::repositories::memory_job_repo::MemoryJobRepository;
use leadrs::presentation::routes;
use leadrs::utils::retry_policy::RetryPolicy;
use leadrs::workers::manager::JobManager;
use leadrs::workers::scrape_worker::ScrapeWorker;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub manager: Arc<JobManager>,
    pub repository: MemoryJobRepository,
}

/// 组装完整的路由：内存任务仓库、零延迟节奏、指向模拟服务器的抓取器和CRM网关
pub fn test_router(
    registry: &MockServer,
    crm: &MockServer,
) -> (Router, Arc<JobManager>, MemoryJobRepository) {
    let repository = MemoryJobRepository::new();

    let registry_settings = RegistrySettings {
        base_url: registry.uri(),
        ..RegistrySettings::default()
    };
    let extractor = Arc::new(RegistryHtmlExtractor::new(&ExtractorSelectors::default()).unwrap());
    let fetcher = Arc::new(RegistryFetcher::new(&registry_settings, extractor).unwrap());
    let worker = ScrapeWorker::new(
        fetcher,
        Arc::new(repository.clone()),
        PacingController::disabled(),
    );
    let manager = Arc::new(JobManager::new(
        worker,
        Arc::new(repository.clone()),
        registry_settings.page_size,
    ));

    let crm_settings = CrmSettings {
        base_url: crm.uri(),
        api_token: "test-token".to_string(),
        batch_delay_ms: 0,
        ..CrmSettings::default()
    };
    let retry = RetryPolicy {
        initial_backoff: Duration::from_millis(5),
        enable_jitter: false,
        ..RetryPolicy::with_max_retries(1)
    };
    let gateway: Arc<dyn CrmGateway> = Arc::new(
        HttpCrmGateway::new(&crm_settings)
            .unwrap()
            .with_retry_policy(retry),
    );
    let import = Arc::new(ImportUseCase::new(
        manager.clone(),
        DuplicateService::new(gateway.clone()),
        BatchImporter::new(gateway, ImportOptions::from_settings(&crm_settings)),
        crm_settings.registry_id_field.clone(),
        crm_settings.source_url_field.clone(),
    ));

    (routes::routes(manager.clone(), import), manager, repository)
}

pub fn create_test_app(registry: &MockServer, crm: &MockServer) -> TestApp {
    let (router, manager, repository) = test_router(registry, crm);
    let server = TestServer::new(router).unwrap();
    TestApp {
        server,
        manager,
        repository,
    }
}

/// 一张公司卡片：(名称, 10位注册号, "NNN NN 城市")
pub type Card<'a> = (&'a str, &'a str, &'a str);

/// 生成一页结果列表HTML
pub fn listing_page(total: Option<usize>, cards: &[Card<'_>], max_page_link: Option<u32>) -> String {
    let mut html = String::from("<html><body>");
    if let Some(total) = total {
        html.push_str(&format!(
            r#"<div class="search-result-count">{} företag</div>"#,
            total
        ));
    }
    for (name, digits, location) in cards {
        html.push_str(&format!(
            r#"<div class="search-result"><h2><a href="/foretag/x/-/{}">{}</a></h2><div class="location">{}</div></div>"#,
            digits, name, location
        ));
    }
    if let Some(page) = max_page_link {
        html.push_str(&format!(r#"<a href="/search?page={}">{}</a>"#, page, page));
    }
    html.push_str("</body></html>");
    html
}

/// 轮询任务状态直到抓取结束
pub async fn wait_for_job(app: &TestApp, id: &str) -> Value {
    for _ in 0..200 {
        let job: Value = app.server.get(&format!("/v1/jobs/{}", id)).await.json();
        let finished = job["status"] != "scraping" || !job["cancelled_at"].is_null();
        if finished && !app.manager.is_running(id) {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish", id);
}
