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

use super::helpers::{create_test_app, listing_page, test_router, wait_for_job};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use tower::util::ServiceExt;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_two_pages(registry: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(
            Some(12),
            &[
                ("Falu Plast AB", "5561998484", "791 77 Falun"),
                ("Borlänge Form HB", "9697123456", "784 33 Borlänge"),
            ],
            Some(2),
        )))
        .mount(registry)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(
            None,
            &[("Mora Komposit AB", "5567001234", "792 30 Mora")],
            None,
        )))
        .mount(registry)
        .await;
}

/// 健康检查测试
#[tokio::test]
async fn health_check_works() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    let (router, _, _) = test_router(&registry, &crm);

    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn version_reports_package_version() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    let app = create_test_app(&registry, &crm);

    let response = app.server.get("/v1/version").await;
    response.assert_status_ok();
    response.assert_text(env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn create_job_rejects_invalid_url() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    let app = create_test_app(&registry, &crm);

    let response = app
        .server
        .post("/v1/jobs")
        .json(&json!({ "url": "not a url" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_job_returns_404() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    let app = create_test_app(&registry, &crm);

    let response = app.server.get("/v1/jobs/job-missing").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = app.server.post("/v1/jobs/job-missing/cancel").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = app.server.delete("/v1/jobs/job-missing").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn job_scrapes_all_pages_and_is_listed() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    mount_two_pages(&registry).await;
    let app = create_test_app(&registry, &crm);

    let response = app
        .server
        .post("/v1/jobs")
        .json(&json!({ "url": format!("{}/search?what=plast", registry.uri()) }))
        .await;
    response.assert_status(StatusCode::ACCEPTED);
    let created: Value = response.json();
    assert_eq!(created["status"], "scraping");
    let id = created["id"].as_str().unwrap().to_string();

    let job = wait_for_job(&app, &id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["progress"]["total_pages"], 2);
    assert_eq!(job["progress"]["total_companies"], 12);
    assert_eq!(job["progress"]["companies_scraped"], 3);

    let companies = job["companies"].as_array().unwrap();
    assert_eq!(companies.len(), 3);
    assert_eq!(companies[0]["name"], "Falu Plast AB");
    assert_eq!(companies[0]["registry_id"], "556199-8484");
    assert_eq!(companies[0]["postal_code"], "791 77");
    assert_eq!(companies[0]["city"], "Falun");
    assert_eq!(companies[2]["name"], "Mora Komposit AB");

    let list: Value = app.server.get("/v1/jobs").await.json();
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], id.as_str());
    assert!(list[0].get("companies").is_none());
}

#[tokio::test]
async fn job_on_foreign_site_fails() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    let app = create_test_app(&registry, &crm);

    let response = app
        .server
        .post("/v1/jobs")
        .json(&json!({ "url": "https://other-registry.example/search?what=plast" }))
        .await;
    response.assert_status(StatusCode::ACCEPTED);
    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();

    let job = wait_for_job(&app, &id).await;
    assert_eq!(job["status"], "failed");
    assert!(job["error"].as_str().unwrap().contains("other-registry.example"));
}

#[tokio::test]
async fn cancelling_finished_job_conflicts_and_delete_removes_it() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    mount_two_pages(&registry).await;
    let app = create_test_app(&registry, &crm);

    let created: Value = app
        .server
        .post("/v1/jobs")
        .json(&json!({ "url": format!("{}/search?what=plast", registry.uri()), "max_pages": 1 }))
        .await
        .json();
    let id = created["id"].as_str().unwrap().to_string();
    let job = wait_for_job(&app, &id).await;
    assert_eq!(job["progress"]["total_pages"], 1);

    let response = app.server.post(&format!("/v1/jobs/{}/cancel", id)).await;
    response.assert_status(StatusCode::CONFLICT);

    let response = app.server.delete(&format!("/v1/jobs/{}", id)).await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = app.server.get(&format!("/v1/jobs/{}", id)).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn import_for_missing_job_returns_404() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    let app = create_test_app(&registry, &crm);

    let response = app
        .server
        .post("/v1/jobs/job-missing/import")
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = app.server.post("/v1/jobs/job-missing/duplicates").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn registry_lookup_rejects_malformed_id() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    let app = create_test_app(&registry, &crm);

    let response = app.server.get("/v1/duplicates/abc").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
