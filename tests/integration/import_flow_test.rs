// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, listing_page, wait_for_job, TestApp};
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const SOURCE_FIELD: &str = "registry_import_source";

/// 把请求中的选项列表原样写回字段，模拟CRM整体替换选项
struct EchoOptions;

impl Respond for EchoOptions {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        ResponseTemplate::new(200).set_body_json(json!({
            "name": SOURCE_FIELD,
            "label": "Registry import source",
            "type": "enumeration",
            "fieldType": "select",
            "options": body["options"].clone(),
        }))
    }
}

async fn mount_registry(registry: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(
            Some(3),
            &[
                ("Falu Plast AB", "5561998484", "791 77 Falun"),
                ("Borlänge Form HB", "9697123456", "784 33 Borlänge"),
                ("Mora Komposit AB", "5567001234", "792 30 Mora"),
            ],
            None,
        )))
        .mount(registry)
        .await;
}

async fn mount_source_field(crm: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/crm/v3/properties/companies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "name": SOURCE_FIELD,
                "label": "Registry import source",
                "type": "enumeration",
                "fieldType": "select",
                "options": [
                    { "label": "Web", "value": "web", "displayOrder": 0, "hidden": false }
                ]
            }]
        })))
        .expect(1)
        .mount(crm)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("/crm/v3/properties/companies/{}", SOURCE_FIELD)))
        .respond_with(EchoOptions)
        .expect(1)
        .mount(crm)
        .await;
}

async fn mount_existing_companies(crm: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/crm/v3/objects/companies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "id": "900", "properties": { "name": "Falu Plast Aktiebolag", "orgnr": "556199-8484" } },
                { "id": "901", "properties": { "name": "Mora Komposit", "orgnr": null } }
            ]
        })))
        .mount(crm)
        .await;
}

async fn scraped_job(app: &TestApp, registry: &MockServer) -> String {
    let created: Value = app
        .server
        .post("/v1/jobs")
        .json(&json!({ "url": format!("{}/search?what=plast", registry.uri()) }))
        .await
        .json();
    let id = created["id"].as_str().unwrap().to_string();
    let job = wait_for_job(app, &id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["companies"].as_array().unwrap().len(), 3);
    id
}

async fn requests_to(server: &MockServer, suffix: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path().ends_with(suffix))
        .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
        .collect()
}

#[tokio::test]
async fn duplicates_are_reported_exact_first() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    mount_registry(&registry).await;
    mount_existing_companies(&crm).await;
    let app = create_test_app(&registry, &crm);
    let id = scraped_job(&app, &registry).await;

    let response = app.server.post(&format!("/v1/jobs/{}/duplicates", id)).await;
    response.assert_status_ok();
    let matches: Value = response.json();
    let matches = matches.as_array().unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0]["kind"], "exact_key");
    assert_eq!(matches[0]["existing"]["id"], "900");
    assert_eq!(matches[0]["company"]["name"], "Falu Plast AB");
    assert_eq!(matches[1]["kind"], "fuzzy_name");
    assert_eq!(matches[1]["existing"]["id"], "901");
    assert!(matches[1]["similarity"].as_f64().unwrap() >= 0.85);
}

#[tokio::test]
async fn import_tags_records_and_creates_filtered_view() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    mount_registry(&registry).await;
    mount_source_field(&crm).await;
    Mock::given(method("POST"))
        .and(path("/crm/v3/objects/companies/batch/create"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "status": "COMPLETE",
            "results": [ { "id": "201" }, { "id": "202" } ]
        })))
        .expect(1)
        .mount(&crm)
        .await;
    Mock::given(method("POST"))
        .and(path("/crm/v3/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": { "listId": "77", "name": "Registry import" }
        })))
        .expect(1)
        .mount(&crm)
        .await;

    let app = create_test_app(&registry, &crm);
    let id = scraped_job(&app, &registry).await;

    let response = app
        .server
        .post(&format!("/v1/jobs/{}/import", id))
        .json(&json!({ "skip_registry_ids": ["556199-8484"] }))
        .await;
    response.assert_status_ok();
    let result: Value = response.json();

    assert_eq!(result["created"], 2);
    assert_eq!(result["failed"], 0);
    assert_eq!(result["success"], true);
    assert_eq!(result["created_ids"], json!(["201", "202"]));
    assert_eq!(result["filtered_view"]["id"], "77");

    let tag = format!("registry-import-{}", id);

    let patches = requests_to(&crm, SOURCE_FIELD).await;
    let options = patches[0]["options"].as_array().unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0]["value"], "web");
    assert_eq!(options[1]["value"], tag.as_str());

    let batches = requests_to(&crm, "batch/create").await;
    let inputs = batches[0]["inputs"].as_array().unwrap();
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[1]["objectWriteTraceId"], "1");
    let first = &inputs[0]["properties"];
    assert_eq!(first["name"], "Borlänge Form HB");
    assert_eq!(first["orgnr"], "969712-3456");
    assert_eq!(first["zip"], "784 33");
    assert_eq!(first[SOURCE_FIELD], tag.as_str());
    assert!(first["registry_url"].as_str().unwrap().ends_with("/foretag/x/-/9697123456"));
    assert!(first.get("annualrevenue").is_none());
}

#[tokio::test]
async fn partially_accepted_batch_creates_each_company_once() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    mount_registry(&registry).await;
    mount_source_field(&crm).await;
    Mock::given(method("POST"))
        .and(path("/crm/v3/objects/companies/batch/create"))
        .respond_with(ResponseTemplate::new(207).set_body_json(json!({
            "status": "COMPLETE",
            "results": [
                { "id": "201", "objectWriteTraceId": "0" },
                { "id": "203", "objectWriteTraceId": "2" }
            ],
            "numErrors": 1,
            "errors": [{
                "status": "error",
                "category": "VALIDATION_ERROR",
                "message": "Duplicate value for orgnr",
                "context": { "objectWriteTraceId": ["1"] }
            }]
        })))
        .expect(1)
        .mount(&crm)
        .await;
    Mock::given(method("POST"))
        .and(path("/crm/v3/objects/companies"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "999" })))
        .expect(0)
        .mount(&crm)
        .await;
    Mock::given(method("POST"))
        .and(path("/crm/v3/lists"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&crm)
        .await;

    let app = create_test_app(&registry, &crm);
    let id = scraped_job(&app, &registry).await;

    let response = app
        .server
        .post(&format!("/v1/jobs/{}/import", id))
        .json(&json!({}))
        .await;
    response.assert_status_ok();
    let result: Value = response.json();

    assert_eq!(result["created"], 2);
    assert_eq!(result["failed"], 1);
    assert_eq!(result["success"], false);
    assert_eq!(result["created_ids"], json!(["201", "203"]));
    assert_eq!(result["errors"][0]["company_name"], "Borlänge Form HB");
    assert_eq!(result["errors"][0]["message"], "Duplicate value for orgnr");
}

#[tokio::test]
async fn import_stops_before_batches_when_field_is_forbidden() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    mount_registry(&registry).await;

    Mock::given(method("GET"))
        .and(path("/crm/v3/properties/companies"))
        .respond_with(ResponseTemplate::new(403).set_body_string("missing scope"))
        .mount(&crm)
        .await;
    Mock::given(method("POST"))
        .and(path("/crm/v3/objects/companies/batch/create"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&crm)
        .await;

    let app = create_test_app(&registry, &crm);
    let id = scraped_job(&app, &registry).await;

    let response = app
        .server
        .post(&format!("/v1/jobs/{}/import", id))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Permission denied"));
}

#[tokio::test]
async fn update_matches_touches_exact_matches_only() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    mount_registry(&registry).await;
    mount_existing_companies(&crm).await;
    Mock::given(method("POST"))
        .and(path("/crm/v3/objects/companies/batch/update"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "COMPLETE",
            "results": [ { "id": "900" } ]
        })))
        .expect(1)
        .mount(&crm)
        .await;

    let app = create_test_app(&registry, &crm);
    let id = scraped_job(&app, &registry).await;

    let response = app
        .server
        .post(&format!("/v1/jobs/{}/update-matches", id))
        .json(&json!({ "mapping": { "name": null, "postal_code": "zip", "city": "city" } }))
        .await;
    response.assert_status_ok();
    let result: Value = response.json();
    assert_eq!(result["created_ids"], json!(["900"]));
    assert_eq!(result["success"], true);

    let updates = requests_to(&crm, "batch/update").await;
    let inputs = updates[0]["inputs"].as_array().unwrap();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0]["id"], "900");
    assert_eq!(inputs[0]["properties"]["city"], "Falun");
    assert!(inputs[0]["properties"].get("name").is_none());
}

#[tokio::test]
async fn import_of_running_job_conflicts() {
    let registry = MockServer::start().await;
    let crm = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(Some(1), &[("Falu Plast AB", "5561998484", "791 77 Falun")], None))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&registry)
        .await;

    let app = create_test_app(&registry, &crm);
    let created: Value = app
        .server
        .post("/v1/jobs")
        .json(&json!({ "url": format!("{}/search", registry.uri()) }))
        .await
        .json();
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .server
        .post(&format!("/v1/jobs/{}/import", id))
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    app.server
        .post(&format!("/v1/jobs/{}/cancel", id))
        .await
        .assert_status(StatusCode::ACCEPTED);
    let job = wait_for_job(&app, &id).await;
    assert!(!job["cancelled_at"].is_null());
    assert_eq!(job["status"], "scraping");
}
